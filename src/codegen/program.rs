//! Top-level assembly: section layout, string-literal pooling, the
//! `__udiv` runtime routine, the entry trampoline, and final text rendering.

use std::fmt::Write as _;

use crate::ast::{Expr, ExternalDecl, TranslationUnit};
use crate::codegen::asm::{Instruction, Operand};
use crate::codegen::{runtime, stmt, CodegenCtx, GlobalInit};
use crate::config::CompilerConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::sema::{decl, typeck};

/// Label the emitted program jumps to on startup; calls `main` and halts
/// with its return value.
pub const ENTRY_LABEL: &str = "__start";

/// One initialized word-granular object in the data section.
pub struct DataItem {
    pub label: String,
    pub words: Vec<i32>,
}

/// One zero-initialized object in the bss section, named only by its size.
pub struct BssItem {
    pub label: String,
    pub size_words: u32,
}

/// A fully lowered program: machine code plus its data and bss sections,
/// ready for [`AssembledProgram::render`].
pub struct AssembledProgram {
    pub code: Vec<Instruction>,
    pub data: Vec<DataItem>,
    pub bss: Vec<BssItem>,
}

impl AssembledProgram {
    /// Renders with the default configuration; see [`Self::render_with`].
    #[must_use]
    pub fn render(&self) -> String {
        self.render_with(&CompilerConfig::default())
    }

    /// Renders the program as TTK-91-style assembly text: code, then a
    /// `DC`-based data section, then a `DS`-based bss section. Section
    /// banner comments are omitted when `config.comments` is false.
    #[must_use]
    pub fn render_with(&self, config: &CompilerConfig) -> String {
        let mut s = String::new();
        for ins in &self.code {
            let _ = writeln!(s, "{ins}");
        }
        if !self.data.is_empty() {
            if config.comments {
                let _ = writeln!(s, "\n; -- {} --", config.data_section_name);
            }
            for item in &self.data {
                let mut words = item.words.iter();
                let first = words.next().copied().unwrap_or(0);
                let _ = writeln!(s, "{:<15} DC      {first}", item.label);
                for w in words {
                    let _ = writeln!(s, "{:<15} DC      {w}", "");
                }
            }
        }
        if !self.bss.is_empty() {
            if config.comments {
                let _ = writeln!(s, "\n; -- {} --", config.bss_section_name);
            }
            for item in &self.bss {
                let _ = writeln!(s, "{:<15} DS      {}", item.label, item.size_words);
            }
        }
        s
    }
}

/// Compiles a whole translation unit with the default configuration; see
/// [`compile_program_with_config`].
pub fn compile_program(tu: &TranslationUnit) -> Result<AssembledProgram, Vec<Diagnostic>> {
    compile_program_with_config(tu, &CompilerConfig::default())
}

/// Compiles a whole translation unit: declaration/linkage resolution, every
/// function body, the `__udiv` routine if needed, and the data/bss sections
/// for every file-scope object and `static` local.
pub fn compile_program_with_config(
    tu: &TranslationUnit,
    config: &CompilerConfig,
) -> Result<AssembledProgram, Vec<Diagnostic>> {
    let mut sink = DiagnosticSink::new(config.diagnostics_cap);
    let globals = decl::resolve(tu, &mut sink);
    if sink.has_errors() {
        return Err(sink.into_vec());
    }

    let mut cx = CodegenCtx::new(&globals);
    let mut code = Vec::new();

    let has_main = globals.get("main").is_some_and(|s| s.is_function && s.defined);
    if has_main {
        code.push(Instruction::Label(ENTRY_LABEL.to_string()));
        code.push(Instruction::Call(Operand::Label("main".to_string())));
        code.push(Instruction::Halt);
    }

    for item in &tu.decls {
        if let ExternalDecl::FunctionDef(f) = item {
            match stmt::compile_function(&mut cx, f) {
                Ok(mut body) => code.append(&mut body),
                Err(diag) => {
                    sink.push(diag);
                }
            }
        }
    }
    if sink.has_errors() {
        return Err(sink.into_vec());
    }

    if cx.needs_udiv() {
        code.extend(runtime::udiv_routine());
    }

    let mut data = Vec::new();
    let mut bss = Vec::new();

    for (label, codepoints) in cx.strings() {
        data.push(DataItem { label: label.clone(), words: codepoints.to_vec() });
    }

    for (name, sym) in globals.iter() {
        if sym.is_function {
            continue;
        }
        match find_global_init(tu, name) {
            Some(init) => match typeck::const_eval_i32(init) {
                Ok(v) => data.push(DataItem { label: name.clone(), words: vec![v] }),
                Err(diag) => sink.push(diag),
            },
            // `decl::resolve` completes every tentative array to a known
            // length before returning this table, so `size_words` is always
            // safe here.
            None => {
                let size = sym.ty.size_words().max(1);
                bss.push(BssItem { label: name.clone(), size_words: size });
            }
        }
    }
    if sink.has_errors() {
        return Err(sink.into_vec());
    }

    for item in cx.static_locals {
        match item.init {
            GlobalInit::Const(v) => data.push(DataItem { label: item.label, words: vec![v] }),
            GlobalInit::Zero => bss.push(BssItem { label: item.label, size_words: item.size_words }),
        }
    }

    Ok(AssembledProgram { code, data, bss })
}

/// Finds the (at most one, per `decl::resolve`'s duplicate-definition check)
/// file-scope initializer expression for `name`, if any declaration of it
/// carries one.
fn find_global_init<'a>(tu: &'a TranslationUnit, name: &str) -> Option<&'a Expr> {
    tu.decls.iter().find_map(|d| {
        let ExternalDecl::Declaration(decl) = d else { return None };
        decl.items
            .iter()
            .find(|item| item.declarator.name() == Some(name) && item.init.is_some())
            .and_then(|item| item.init.as_ref())
    })
}
