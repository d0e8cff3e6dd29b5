//! Declaration resolution and type checking: the semantic layer between the
//! parser's untyped AST and the code generator.

pub mod decl;
pub mod scope;
pub mod typeck;
