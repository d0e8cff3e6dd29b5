//! `ttkcc`: a compiler translating a subset of C into assembly for a
//! TTK-91-style 32-bit educational register machine.
//!
//! The pipeline is the conventional front-end/middle/back-end split:
//! [`lexer`] and [`parser`] produce an [`ast::TranslationUnit`]; [`sema`]
//! resolves declarations, linkage, and types; [`codegen`] lowers the
//! checked program to the target instruction set and renders it as text.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod token;
pub mod types;

pub use codegen::program::{compile_program, compile_program_with_config, AssembledProgram};
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, LocatedDiagnostic};

use std::path::Path;

/// Compiles C source text to an [`AssembledProgram`]. Lexer/parser failures
/// short-circuit as a single diagnostic; semantic and codegen errors are
/// collected and returned together.
pub fn compile_source(source: &str, config: &CompilerConfig) -> Result<AssembledProgram, Vec<Diagnostic>> {
    let tokens = lexer::Lexer::new(source).tokenize().map_err(|e| vec![Diagnostic::from(e)])?;
    let tu = parser::Parser::new(tokens).parse_translation_unit().map_err(|e| vec![e])?;
    compile_program_with_config(&tu, config)
}

/// Reads `input`, compiles it, and writes the rendered assembly to `output`.
/// Diagnostics are returned bundled with `input` for CLI-style rendering.
pub fn compile_file(
    input: &Path,
    output: &Path,
    config: &CompilerConfig,
) -> Result<(), Vec<LocatedDiagnostic>> {
    let source = std::fs::read_to_string(input).map_err(|e| {
        vec![LocatedDiagnostic {
            path: input.to_path_buf(),
            diagnostic: Diagnostic::error(
                diagnostics::Kind::Codegen,
                diagnostics::Span::default(),
                format!("could not read {}: {e}", input.display()),
            ),
        }]
    })?;
    let program = compile_source(&source, config).map_err(|diags| {
        diags
            .into_iter()
            .map(|diagnostic| LocatedDiagnostic { path: input.to_path_buf(), diagnostic })
            .collect::<Vec<_>>()
    })?;
    std::fs::write(output, program.render_with(config)).map_err(|e| {
        vec![LocatedDiagnostic {
            path: output.to_path_buf(),
            diagnostic: Diagnostic::error(
                diagnostics::Kind::Codegen,
                diagnostics::Span::default(),
                format!("could not write {}: {e}", output.display()),
            ),
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_hello_main_to_an_entry_trampoline() {
        let program = compile_source("int main(void) { out(42); return 0; }", &CompilerConfig::default())
            .expect("compilation should succeed");
        let text = program.render();
        assert!(text.contains("__start:"));
        assert!(text.contains("main:"));
    }

    #[test]
    fn reports_undeclared_identifier() {
        let err = compile_source("int main(void) { return undeclared_name; }", &CompilerConfig::default())
            .unwrap_err();
        assert!(!err.is_empty());
    }
}
