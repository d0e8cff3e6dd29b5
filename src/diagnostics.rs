//! Diagnostics collected while compiling a translation unit.
//!
//! Every compiler stage reports problems through [`Diagnostic`] rather than
//! panicking or writing to stderr directly, so the CLI driver (and any other
//! embedder) can decide how to render them. Severity and [`Kind`] line up
//! with the error-kind table in the project's error handling design.

use std::fmt;
use std::path::PathBuf;

/// A position in a source file. Stored 0-indexed, rendered 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self {
        Span { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Severity of a single diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Which stage (and kind of problem) a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Lex,
    Parse,
    Redeclaration,
    Undeclared,
    Type,
    Linkage,
    Codegen,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Lex => "lex error",
            Kind::Parse => "parse error",
            Kind::Redeclaration => "redeclaration",
            Kind::Undeclared => "undeclared identifier",
            Kind::Type => "type error",
            Kind::Linkage => "linkage conflict",
            Kind::Codegen => "codegen error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: Kind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(kind: Kind, span: Span, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Error, kind, span, message: message.into() }
    }

    #[must_use]
    pub fn warning(kind: Kind, span: Span, message: impl Into<String>) -> Self {
        Diagnostic { severity: Severity::Warning, kind, span, message: message.into() }
    }

    /// Render as `path:line:col: severity: kind: message`.
    #[must_use]
    pub fn render(&self, path: &str) -> String {
        format!("{path}:{}: {}: {}: {}", self.span, self.severity, self.kind, self.message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}: {}", self.span, self.severity, self.kind, self.message)
    }
}

impl std::error::Error for Diagnostic {}

/// Accumulates diagnostics across declaration/type checking so a single run
/// can report several problems at once, per the error handling design's
/// "collect up to a cap" policy. Lexer and parser errors are NOT routed
/// through the sink: there is no sensible AST to keep walking after either
/// fails, so they short-circuit via `Result<_, Diagnostic>` instead.
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    cap: usize,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(cap: usize) -> Self {
        DiagnosticSink { diagnostics: Vec::new(), cap }
    }

    /// Record a diagnostic. Returns `false` once the cap has been reached,
    /// so callers can stop doing further (increasingly noisy) analysis.
    pub fn push(&mut self, diag: Diagnostic) -> bool {
        if self.diagnostics.len() >= self.cap {
            return false;
        }
        self.diagnostics.push(diag);
        true
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.diagnostics.len() >= self.cap
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        DiagnosticSink::new(64)
    }
}

/// Source path bundled with a diagnostic for CLI rendering.
pub struct LocatedDiagnostic {
    pub path: PathBuf,
    pub diagnostic: Diagnostic,
}

impl fmt::Display for LocatedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.diagnostic.render(&self.path.display().to_string()))
    }
}
