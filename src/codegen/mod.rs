//! Code generation: lowers a checked translation unit to the target
//! instruction set (see `asm`), driven by `program::compile_program`.
//!
//! - `asm`: the instruction set and its textual rendering.
//! - `state`: per-function frame layout and register discipline.
//! - `runtime`: the `in`/`out` traps and the `__udiv` intrinsic.
//! - `expr`: expression code generation.
//! - `stmt`: statement/control-flow code generation and the per-function
//!   compilation driver.
//! - `program`: top-level assembly -- section layout, string pooling, the
//!   entry trampoline, and final text rendering.

pub mod asm;
pub mod expr;
pub mod program;
pub mod runtime;
pub mod state;
pub mod stmt;

use std::rc::Rc;

use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::sema::decl::GlobalTable;
use crate::sema::typeck;
use crate::types::Type;
use state::{Storage, VarInfo};

/// A global (or file-scope) object initializer, already constant-folded.
#[derive(Debug, Clone, Copy)]
pub enum GlobalInit {
    Zero,
    Const(i32),
}

/// A `static` local's storage, collected while compiling its enclosing
/// function and materialized by `program.rs` alongside ordinary globals.
pub struct StaticLocalItem {
    pub label: String,
    pub size_words: u32,
    pub init: GlobalInit,
}

/// Mutable state threaded through code generation for one translation unit:
/// the resolved global table, the string-literal pool, the `__udiv`-needed
/// flag, and every `static` local encountered so far.
pub struct CodegenCtx<'a> {
    globals: &'a GlobalTable,
    strings: Vec<(String, Rc<[i32]>)>,
    string_counter: u32,
    needs_udiv: bool,
    pub static_locals: Vec<StaticLocalItem>,
}

impl<'a> CodegenCtx<'a> {
    #[must_use]
    pub fn new(globals: &'a GlobalTable) -> Self {
        CodegenCtx {
            globals,
            strings: Vec::new(),
            string_counter: 0,
            needs_udiv: false,
            static_locals: Vec::new(),
        }
    }

    /// Interns a string literal's already-decoded code points, returning the
    /// label its data will be emitted under. Every occurrence gets its own
    /// label: C gives string literals no identity to deduplicate against,
    /// and this subset never needs string pooling's space savings.
    pub fn intern_string(&mut self, data: &Rc<[i32]>) -> String {
        let label = format!("__str_{}", self.string_counter);
        self.string_counter += 1;
        self.strings.push((label.clone(), data.clone()));
        label
    }

    #[must_use]
    pub fn strings(&self) -> &[(String, Rc<[i32]>)] {
        &self.strings
    }

    pub fn require_udiv(&mut self) {
        self.needs_udiv = true;
    }

    #[must_use]
    pub fn needs_udiv(&self) -> bool {
        self.needs_udiv
    }

    /// Looks up a file-scope symbol (object or function) as a `VarInfo`, for
    /// identifier references that aren't bound to a local.
    #[must_use]
    pub fn global_var_info(&self, name: &str) -> Option<VarInfo> {
        let sym = self.globals.get(name)?;
        Some(VarInfo { ty: sym.ty.clone(), storage: Storage::Global(name.to_string()) })
    }

    /// Records a `static` local's storage and (constant-folded) initializer.
    pub fn declare_static_local(
        &mut self,
        label: &str,
        ty: &Type,
        init: Option<&crate::ast::Expr>,
        span: Span,
    ) -> Result<(), Diagnostic> {
        if matches!(ty, Type::Array { len: None, .. }) {
            return Err(Diagnostic::error(Kind::Type, span, "static local has incomplete array type"));
        }
        let size_words = ty.size_words().max(1);
        let init = match init {
            Some(e) => GlobalInit::Const(typeck::const_eval_i32(e)?),
            None => GlobalInit::Zero,
        };
        self.static_locals.push(StaticLocalItem { label: label.to_string(), size_words, init });
        Ok(())
    }
}
