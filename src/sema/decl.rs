//! Declaration and name-resolution engine: linkage, tentative definitions,
//! and redeclaration checking across the whole translation unit.
//!
//! This pass does not itself generate code; it validates the program and
//! produces a [`GlobalTable`] that both the type engine (for looking up a
//! called function's signature) and the code generator (for telling global
//! references apart from locals, and for emitting tentative/static storage)
//! consult afterwards.

use std::collections::HashMap;

use crate::ast::{Declaration, ExternalDecl, StorageClass, TranslationUnit};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Kind, Span};
use crate::sema::typeck::resolve_declarator;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    None,
    Internal,
    External,
}

#[derive(Debug, Clone)]
pub struct GlobalSymbol {
    pub ty: Type,
    pub linkage: Linkage,
    pub is_function: bool,
    /// An object with storage has had at least a tentative definition;
    /// a function is "defined" once its body has been seen.
    pub defined: bool,
    /// True for an object with no initializer waiting to be completed by a
    /// later declaration (file-scope only).
    pub tentative: bool,
    pub first_span: Span,
}

#[derive(Default)]
pub struct GlobalTable {
    symbols: HashMap<String, GlobalSymbol>,
}

impl GlobalTable {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GlobalSymbol> {
        self.symbols.get(name)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (&String, &GlobalSymbol)> {
        self.symbols.iter()
    }
}

/// Walks every top-level declaration and function definition in `tu`,
/// building the global table and reporting linkage/redeclaration problems
/// into `sink`. Block-scope declarations are validated lazily, by the code
/// generator's own scope walk, since their effects never escape the
/// function (apart from `extern`/`static` locals, handled by
/// [`merge_block_scope_extern`] and [`unique_static_label`]).
pub fn resolve(tu: &TranslationUnit, sink: &mut DiagnosticSink) -> GlobalTable {
    let mut table = GlobalTable::default();
    for decl in &tu.decls {
        match decl {
            ExternalDecl::Declaration(d) => resolve_file_scope_declaration(d, &mut table, sink),
            ExternalDecl::FunctionDef(f) => {
                let (ty, name, span) = match resolve_declarator(f.spec.base.to_type(), &f.declarator) {
                    Ok(r) => r,
                    Err(diag) => {
                        sink.push(diag);
                        continue;
                    }
                };
                let Some(name) = name else {
                    sink.push(Diagnostic::error(Kind::Parse, span, "function definition has no name"));
                    continue;
                };
                let linkage = match f.spec.storage {
                    Some(StorageClass::Static) => Linkage::Internal,
                    Some(StorageClass::Extern) | None => Linkage::External,
                    Some(_) => {
                        sink.push(Diagnostic::error(
                            Kind::Linkage,
                            span,
                            "invalid storage class for a function",
                        ));
                        Linkage::External
                    }
                };
                merge_or_insert(&mut table, &name, ty, linkage, true, true, false, span, sink);
            }
        }
    }
    finalize_incomplete_tentative_arrays(&mut table);
    table
}

/// A tentative array definition still incomplete at the end of the
/// translation unit (`int x[];` with no later `int x[n];`) completes to an
/// array of one element, per the C standard -- not a leftover diagnostic, a
/// real definition the code generator can size.
fn finalize_incomplete_tentative_arrays(table: &mut GlobalTable) {
    for sym in table.symbols.values_mut() {
        if sym.tentative {
            if let Type::Array { elem, len: None } = &sym.ty {
                sym.ty = Type::array_of((**elem).clone(), Some(1));
            }
        }
    }
}

fn resolve_file_scope_declaration(
    decl: &Declaration,
    table: &mut GlobalTable,
    sink: &mut DiagnosticSink,
) {
    if matches!(decl.spec.storage, Some(StorageClass::Auto) | Some(StorageClass::Register)) {
        sink.push(Diagnostic::error(
            Kind::Linkage,
            decl.spec.span,
            "'auto'/'register' storage class is invalid at file scope",
        ));
    }
    for item in &decl.items {
        let (ty, name, span) = match resolve_declarator(decl.spec.base.to_type(), &item.declarator) {
            Ok(r) => r,
            Err(diag) => {
                sink.push(diag);
                continue;
            }
        };
        let Some(name) = name else { continue };
        let linkage = match decl.spec.storage {
            Some(StorageClass::Static) => Linkage::Internal,
            _ => Linkage::External,
        };
        let is_function = ty.is_function();
        let tentative = !is_function && item.init.is_none();
        let defined = !tentative;
        merge_or_insert(table, &name, ty, linkage, is_function, defined, tentative, span, sink);
    }
}

#[allow(clippy::too_many_arguments)]
fn merge_or_insert(
    table: &mut GlobalTable,
    name: &str,
    ty: Type,
    linkage: Linkage,
    is_function: bool,
    defined: bool,
    tentative: bool,
    span: Span,
    sink: &mut DiagnosticSink,
) {
    if let Some(prev) = table.symbols.get(name) {
        if !prev.ty.compatible_with(&ty) {
            sink.push(Diagnostic::error(
                Kind::Type,
                span,
                format!("conflicting types for '{name}': '{}' vs '{}'", prev.ty, ty),
            ));
            return;
        }
        if prev.linkage != linkage && prev.linkage != Linkage::None && linkage != Linkage::None {
            sink.push(Diagnostic::error(
                Kind::Linkage,
                span,
                format!("'{name}' redeclared with different linkage"),
            ));
        }
        if prev.defined && defined && !tentative {
            sink.push(Diagnostic::error(
                Kind::Redeclaration,
                span,
                format!("redefinition of '{name}'"),
            ));
            return;
        }
        let combined_defined = prev.defined || defined;
        let combined_is_function = prev.is_function || is_function;
        let merged = GlobalSymbol {
            ty: prev.ty.merge(&ty),
            linkage: if linkage == Linkage::None { prev.linkage } else { linkage },
            is_function: combined_is_function,
            defined: combined_defined,
            tentative: !combined_is_function && !combined_defined,
            first_span: prev.first_span,
        };
        table.symbols.insert(name.to_string(), merged);
    } else {
        table.symbols.insert(
            name.to_string(),
            GlobalSymbol { ty, linkage, is_function, defined, tentative, first_span: span },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn resolve_src(src: &str) -> (GlobalTable, DiagnosticSink) {
        let tokens = Lexer::new(src).tokenize().unwrap();
        let tu = Parser::new(tokens).parse_translation_unit().unwrap();
        let mut sink = DiagnosticSink::default();
        let table = resolve(&tu, &mut sink);
        (table, sink)
    }

    #[test]
    fn tentative_definitions_merge_array_length() {
        let (table, sink) = resolve_src("int x[]; int x[10];");
        assert!(!sink.has_errors());
        let sym = table.get("x").unwrap();
        assert_eq!(sym.ty, Type::array_of(Type::int(), Some(10)));
    }

    #[test]
    fn duplicate_function_definition_is_an_error() {
        let (_table, sink) = resolve_src("int f(void) { return 0; } int f(void) { return 1; }");
        assert!(sink.has_errors());
    }

    #[test]
    fn static_then_external_is_a_linkage_conflict() {
        let (_table, sink) = resolve_src("static int x; int x;");
        assert!(sink.has_errors());
    }

    #[test]
    fn tentative_array_never_completed_defaults_to_one_element() {
        let (table, sink) = resolve_src("int x[];");
        assert!(!sink.has_errors());
        let sym = table.get("x").unwrap();
        assert_eq!(sym.ty, Type::array_of(Type::int(), Some(1)));
    }

    #[test]
    fn prototype_then_definition_is_fine() {
        let (table, sink) = resolve_src("int f(int a); int f(int a) { return a; }");
        assert!(!sink.has_errors());
        assert!(table.get("f").unwrap().defined);
    }
}
