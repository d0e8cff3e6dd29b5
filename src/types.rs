//! The C-subset type system: scalars, pointers, arrays, and function types.
//!
//! Types are compared structurally (`#[derive(PartialEq)]`), matching the
//! data model: there is no nominal type identity to preserve since `struct`,
//! `union` and `typedef` are out of scope.

use std::fmt;
use std::rc::Rc;

/// One word on the target machine, used for both array strides and frame
/// slot sizes.
pub const WORD_SIZE: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int { signed: bool },
    Void,
    Pointer(Rc<Type>),
    /// `len` is `None` for an incomplete array (`extern int x[];`), which a
    /// later declaration or initializer must complete before the array is
    /// ever used as a value.
    Array { elem: Rc<Type>, len: Option<u32> },
    Function { ret: Rc<Type>, params: Rc<[Type]>, variadic: bool },
}

impl Type {
    #[must_use]
    pub fn int() -> Type {
        Type::Int { signed: true }
    }

    #[must_use]
    pub fn unsigned() -> Type {
        Type::Int { signed: false }
    }

    #[must_use]
    pub fn pointer_to(ty: Type) -> Type {
        Type::Pointer(Rc::new(ty))
    }

    #[must_use]
    pub fn array_of(elem: Type, len: Option<u32>) -> Type {
        Type::Array { elem: Rc::new(elem), len }
    }

    #[must_use]
    pub fn function(ret: Type, params: Vec<Type>, variadic: bool) -> Type {
        Type::Function { ret: Rc::new(ret), params: params.into(), variadic }
    }

    #[must_use]
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Type::Int { signed: true })
    }

    #[must_use]
    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, Type::Int { signed: false })
    }

    #[must_use]
    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int { .. })
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array { .. })
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function { .. })
    }

    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.is_integer() || self.is_pointer()
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    /// Array-to-pointer / function-to-pointer decay. Every other type is
    /// unchanged. Call sites that must NOT decay (operand of `&`, and a
    /// would-be `sizeof` operand) simply don't call this.
    #[must_use]
    pub fn decay(&self) -> Type {
        match self {
            Type::Array { elem, .. } => Type::pointer_to((**elem).clone()),
            Type::Function { .. } => Type::pointer_to(self.clone()),
            other => other.clone(),
        }
    }

    /// Size in bytes. Panics on an incomplete array or function type --
    /// callers must only ask for the size of a complete object type.
    #[must_use]
    pub fn size_bytes(&self) -> u32 {
        match self {
            Type::Int { .. } | Type::Pointer(_) => WORD_SIZE,
            Type::Array { elem, len } => {
                elem.size_bytes() * len.expect("size of incomplete array type")
            }
            Type::Void => 0,
            Type::Function { .. } => panic!("size of function type"),
        }
    }

    #[must_use]
    pub fn size_words(&self) -> u32 {
        self.size_bytes() / WORD_SIZE
    }

    /// The pointee type scaled for pointer arithmetic (`p + n` adds
    /// `n * pointee_size_words`). Only meaningful on pointer types.
    #[must_use]
    pub fn pointee(&self) -> Option<&Type> {
        match self {
            Type::Pointer(t) => Some(t),
            _ => None,
        }
    }

    /// Structural compatibility used when merging multiple declarations of
    /// the same identifier. An incomplete array is compatible with any array
    /// of the same element type (the later, complete declaration wins), and
    /// a `void` return/pointee is compatible with anything conservative
    /// parameter shapes would otherwise reject -- but this subset never
    /// actually needs that leniency since `void*` is not exercised, so
    /// compatibility here is exact structural equality modulo array length.
    #[must_use]
    pub fn compatible_with(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Int { signed: s1 }, Type::Int { signed: s2 }) => s1 == s2,
            (Type::Void, Type::Void) => true,
            (Type::Pointer(a), Type::Pointer(b)) => a.compatible_with(b),
            (
                Type::Array { elem: e1, len: l1 },
                Type::Array { elem: e2, len: l2 },
            ) => e1.compatible_with(e2) && (l1.is_none() || l2.is_none() || l1 == l2),
            (
                Type::Function { ret: r1, params: p1, variadic: v1 },
                Type::Function { ret: r2, params: p2, variadic: v2 },
            ) => {
                v1 == v2
                    && r1.compatible_with(r2)
                    && p1.len() == p2.len()
                    && p1.iter().zip(p2.iter()).all(|(a, b)| a.compatible_with(b))
            }
            _ => false,
        }
    }

    /// The "more defined" of two compatible types, used when merging
    /// declarations (`int x[3]` completes `extern int x[];`).
    #[must_use]
    pub fn merge(&self, other: &Type) -> Type {
        match (self, other) {
            (Type::Array { elem, len: None }, Type::Array { len: Some(n), .. }) => {
                Type::array_of((**elem).clone(), Some(*n))
            }
            (Type::Array { len: Some(_), .. }, Type::Array { .. }) => self.clone(),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int { signed: true } => write!(f, "int"),
            Type::Int { signed: false } => write!(f, "unsigned"),
            Type::Void => write!(f, "void"),
            Type::Pointer(t) => write!(f, "{t}*"),
            Type::Array { elem, len: Some(n) } => write!(f, "{elem}[{n}]"),
            Type::Array { elem, len: None } => write!(f, "{elem}[]"),
            Type::Function { ret, params, variadic } => {
                write!(f, "{ret}(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                if *variadic {
                    write!(f, ", ...")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decay_array_to_pointer() {
        let arr = Type::array_of(Type::int(), Some(3));
        assert_eq!(arr.decay(), Type::pointer_to(Type::int()));
    }

    #[test]
    fn decay_function_to_pointer() {
        let f = Type::function(Type::int(), vec![Type::int()], false);
        assert_eq!(f.decay(), Type::pointer_to(f.clone()));
    }

    #[test]
    fn incomplete_array_completed_by_merge() {
        let incomplete = Type::array_of(Type::int(), None);
        let complete = Type::array_of(Type::int(), Some(20));
        assert!(incomplete.compatible_with(&complete));
        assert_eq!(incomplete.merge(&complete), complete);
    }

    #[test]
    fn multidim_array_size() {
        let ty = Type::array_of(Type::array_of(Type::int(), Some(4)), Some(3));
        assert_eq!(ty.size_bytes(), 3 * 4 * WORD_SIZE);
    }
}
