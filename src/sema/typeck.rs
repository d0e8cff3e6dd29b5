//! Integer promotion, usual arithmetic conversions, and the handful of
//! constant-expression rules needed for array bounds. Exact signedness
//! rules per the type engine design: mixed `int`/`unsigned` operands both
//! become `unsigned`, reinterpreting the signed operand's bit pattern.

use crate::ast::{BinOp, Declarator, Expr, ExprKind};
use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::types::Type;

/// Resolves a declarator's shape against `base`, const-evaluating any array
/// dimension expressions along the way (`ast::Declarator::resolve_with`
/// cannot do this itself: folding `Expr` needs this module).
pub fn resolve_declarator(base: Type, d: &Declarator) -> Result<(Type, Option<String>, Span), Diagnostic> {
    match d {
        Declarator::Name(name, span) => Ok((base, name.clone(), *span)),
        Declarator::Pointer(inner) => resolve_declarator(Type::pointer_to(base), inner),
        Declarator::Array(inner, dim) => {
            let len = dim.as_ref().map(|e| const_eval_u32(e)).transpose()?;
            resolve_declarator(Type::array_of(base, len), inner)
        }
        Declarator::Function(inner, params, variadic) => {
            let mut param_types = Vec::with_capacity(params.len());
            for p in params {
                let pbase = p.spec.base.to_type();
                let ty = match &p.declarator {
                    Some(pd) => resolve_declarator(pbase, pd)?.0,
                    None => pbase,
                };
                param_types.push(ty.decay());
            }
            resolve_declarator(Type::function(base, param_types, *variadic), inner)
        }
    }
}

/// Integer promotion. Every integer type in this subset is already
/// word-sized (there is no narrower storage class to widen from: `char`
/// declares a word-sized `int`-shaped object, per the declarator lowering
/// in `ast::BaseType::to_type`), so promotion is the identity on `Type::Int`
/// and a type error on anything else.
#[must_use]
pub fn promote(ty: &Type) -> Type {
    match ty {
        Type::Int { .. } => ty.clone(),
        other => other.clone(),
    }
}

/// The usual arithmetic conversions for a binary operator's two
/// already-promoted integer operands: if either is unsigned, both operands
/// (and the result) are unsigned.
#[must_use]
pub fn usual_arith_conversions(a: &Type, b: &Type) -> Type {
    if a.is_unsigned_int() || b.is_unsigned_int() {
        Type::unsigned()
    } else {
        Type::int()
    }
}

/// True for the literal `0`: the one integer expression C lets stand for a
/// null pointer in a comparison against any pointer type without a cast.
#[must_use]
pub fn is_null_pointer_constant(e: &Expr) -> bool {
    matches!(e.kind, ExprKind::IntLiteral { value: 0, .. })
}

/// Result type of a binary operator given its (already decayed) operand
/// types, per the expression engine's pointer-arithmetic and comparison
/// rules. `lhs_null`/`rhs_null` mark an operand that is the literal `0`
/// (see [`is_null_pointer_constant`]), the only case a bare `int` and a
/// pointer compare without a type error. Returns `Err` with a
/// human-readable mismatch description; callers attach span/Kind.
pub fn binary_result_type(
    op: BinOp,
    lhs: &Type,
    rhs: &Type,
    lhs_null: bool,
    rhs_null: bool,
) -> Result<Type, String> {
    use BinOp::{
        Add, BitAnd, BitOr, BitXor, Comma, Div, Eq, Ge, Gt, Le, LogAnd, LogOr, Lt, Mod, Mul, Ne,
        Shl, Shr, Sub,
    };
    match op {
        Add => match (lhs.is_pointer(), rhs.is_pointer()) {
            (true, false) if rhs.is_integer() => Ok(lhs.clone()),
            (false, true) if lhs.is_integer() => Ok(rhs.clone()),
            (false, false) if lhs.is_integer() && rhs.is_integer() => {
                Ok(usual_arith_conversions(lhs, rhs))
            }
            _ => Err(format!("invalid operands to `+`: `{lhs}` and `{rhs}`")),
        },
        Sub => match (lhs.is_pointer(), rhs.is_pointer()) {
            (true, true) => {
                if lhs.compatible_with(rhs) {
                    Ok(Type::int())
                } else {
                    Err(format!("subtracting pointers to incompatible types `{lhs}`, `{rhs}`"))
                }
            }
            (true, false) if rhs.is_integer() => Ok(lhs.clone()),
            (false, false) if lhs.is_integer() && rhs.is_integer() => {
                Ok(usual_arith_conversions(lhs, rhs))
            }
            _ => Err(format!("invalid operands to `-`: `{lhs}` and `{rhs}`")),
        },
        Mul | Div | Mod | BitAnd | BitOr | BitXor => {
            if lhs.is_integer() && rhs.is_integer() {
                Ok(usual_arith_conversions(lhs, rhs))
            } else {
                Err(format!("invalid operands: `{lhs}` and `{rhs}`"))
            }
        }
        Shl | Shr => {
            if lhs.is_integer() && rhs.is_integer() {
                // shift result keeps the left operand's signedness; only its
                // width matters for the rest of this subset
                Ok(lhs.clone())
            } else {
                Err(format!("invalid operands to shift: `{lhs}` and `{rhs}`"))
            }
        }
        Eq | Ne | Lt | Le | Gt | Ge => {
            let null_pointer_mix = (lhs.is_pointer() && rhs.is_integer() && rhs_null)
                || (rhs.is_pointer() && lhs.is_integer() && lhs_null);
            let ok = null_pointer_mix
                || ((lhs.is_scalar() && rhs.is_scalar())
                    && (lhs.is_pointer() == rhs.is_pointer()
                        || lhs.is_integer() && rhs.is_integer()));
            if ok {
                Ok(Type::int())
            } else {
                Err(format!("cannot compare `{lhs}` and `{rhs}`"))
            }
        }
        LogAnd | LogOr => {
            if lhs.is_scalar() && rhs.is_scalar() {
                Ok(Type::int())
            } else {
                Err("operands of `&&`/`||` must be scalar".to_string())
            }
        }
        Comma => Ok(rhs.clone()),
    }
}

/// True when comparing two values of this type must be lowered as an
/// unsigned compare (pointers compare as addresses; see codegen's
/// `compare` lowering).
#[must_use]
pub fn compares_unsigned(ty: &Type) -> bool {
    ty.is_pointer() || ty.is_unsigned_int()
}

/// Folds a constant integer expression (array-bound context: literals and
/// `+ - * / %` combinations of them, plus unary `+`/`-`/`~`). Array bounds
/// in this subset never reference runtime state, so anything else is
/// rejected.
pub fn const_eval_u32(expr: &Expr) -> Result<u32, Diagnostic> {
    const_eval_i64(expr).map(|v| v as u32)
}

/// Same as [`const_eval_u32`] but for contexts (global/static-local
/// initializers) where the value is stored and read back as a signed word.
pub fn const_eval_i32(expr: &Expr) -> Result<i32, Diagnostic> {
    const_eval_i64(expr).map(|v| v as i32)
}

fn const_eval_i64(expr: &Expr) -> Result<i64, Diagnostic> {
    match &expr.kind {
        ExprKind::IntLiteral { value, .. } => Ok(i64::from(*value)),
        ExprKind::Unary(op, inner) => {
            let v = const_eval_i64(inner)?;
            Ok(match op {
                crate::ast::UnOp::Plus => v,
                crate::ast::UnOp::Neg => -v,
                crate::ast::UnOp::BitNot => !v,
                _ => {
                    return Err(Diagnostic::error(
                        Kind::Type,
                        expr.span,
                        "not a constant expression",
                    ))
                }
            })
        }
        ExprKind::Binary(op, l, r) => {
            let a = const_eval_i64(l)?;
            let b = const_eval_i64(r)?;
            Ok(match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mul => a * b,
                BinOp::Div => a.checked_div(b).ok_or_else(|| {
                    Diagnostic::error(Kind::Type, expr.span, "division by zero in constant expression")
                })?,
                BinOp::Mod => a.checked_rem(b).ok_or_else(|| {
                    Diagnostic::error(Kind::Type, expr.span, "division by zero in constant expression")
                })?,
                BinOp::Shl => a << b,
                BinOp::Shr => a >> b,
                BinOp::BitAnd => a & b,
                BinOp::BitOr => a | b,
                BinOp::BitXor => a ^ b,
                _ => {
                    return Err(Diagnostic::error(
                        Kind::Type,
                        expr.span,
                        "not a constant expression",
                    ))
                }
            })
        }
        _ => Err(Diagnostic::error(Kind::Type, expr.span, "not a constant expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_signed_unsigned_becomes_unsigned() {
        assert_eq!(usual_arith_conversions(&Type::int(), &Type::unsigned()), Type::unsigned());
    }

    #[test]
    fn pointer_plus_int_keeps_pointer_type() {
        let p = Type::pointer_to(Type::int());
        assert_eq!(binary_result_type(BinOp::Add, &p, &Type::int(), false, false).unwrap(), p);
    }

    #[test]
    fn pointer_minus_pointer_yields_int() {
        let p = Type::pointer_to(Type::int());
        assert_eq!(binary_result_type(BinOp::Sub, &p, &p, false, false).unwrap(), Type::int());
    }

    #[test]
    fn pointer_compared_against_null_literal_is_fine() {
        let p = Type::pointer_to(Type::int());
        assert_eq!(binary_result_type(BinOp::Eq, &p, &Type::int(), false, true).unwrap(), Type::int());
        assert_eq!(binary_result_type(BinOp::Ne, &Type::int(), &p, true, false).unwrap(), Type::int());
    }

    #[test]
    fn pointer_compared_against_nonzero_int_is_a_type_error() {
        let p = Type::pointer_to(Type::int());
        assert!(binary_result_type(BinOp::Eq, &p, &Type::int(), false, false).is_err());
    }
}
