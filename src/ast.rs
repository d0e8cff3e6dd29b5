//! Parser output: an untyped AST of declarators, expressions and statements.
//!
//! Declarators keep the C "clockwise spiral" shape (pointer/array/function
//! wrappers nested around a name) exactly as parsed; [`Declarator::resolve`]
//! turns that shape plus a base type into a concrete [`Type`] and name.

use std::rc::Rc;

use crate::diagnostics::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Auto,
    Register,
    Static,
    Extern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Int,
    Unsigned,
    Char,
    Void,
}

impl BaseType {
    #[must_use]
    pub fn to_type(self) -> Type {
        match self {
            // `char` carries no distinct representation in this subset: it
            // is word-sized like everything else, and only its promotion to
            // `int` on use (string indexing) is observable -- see the type
            // engine. Declaring a `char` object yields a signed-int-shaped
            // object for storage purposes.
            BaseType::Int | BaseType::Char => Type::int(),
            BaseType::Unsigned => Type::unsigned(),
            BaseType::Void => Type::Void,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeclSpec {
    pub storage: Option<StorageClass>,
    pub base: BaseType,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Declarator {
    /// `None` for an abstract declarator (an unnamed parameter).
    Name(Option<String>, Span),
    Pointer(Box<Declarator>),
    Array(Box<Declarator>, Option<Box<Expr>>),
    Function(Box<Declarator>, Vec<Param>, bool),
}

impl Declarator {
    /// Resolve this declarator's shape against `base`, returning the final
    /// type and declared name (if any). Array dimensions must already have
    /// been const-evaluated into `Declarator::Array`'s slot by the parser's
    /// caller (the declaration engine does this once scopes are available).
    #[must_use]
    pub fn resolve_with(&self, base: Type) -> (Type, Option<String>, Span) {
        match self {
            Declarator::Name(name, span) => (base, name.clone(), *span),
            Declarator::Pointer(inner) => inner.resolve_with(Type::pointer_to(base)),
            Declarator::Array(inner, _dim) => {
                // Dimension evaluation happens earlier, in the declaration
                // engine, where `Expr` can be const-folded against already
                // visible symbols; by the time codegen sees this AST the
                // length has been threaded through `ArrayLen`.
                inner.resolve_with(Type::array_of(base, None))
            }
            Declarator::Function(inner, params, variadic) => {
                let param_types: Vec<Type> = params
                    .iter()
                    .map(|p| p.resolved_type().decay())
                    .collect();
                inner.resolve_with(Type::function(base, param_types, *variadic))
            }
        }
    }

    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Declarator::Name(_, s) => *s,
            Declarator::Pointer(d) | Declarator::Array(d, _) | Declarator::Function(d, _, _) => {
                d.span()
            }
        }
    }

    /// Inner-most name, if any -- used to find the identifier being
    /// declared without resolving the full type.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Declarator::Name(n, _) => n.as_deref(),
            Declarator::Pointer(d) | Declarator::Array(d, _) | Declarator::Function(d, _, _) => {
                d.name()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub spec: DeclSpec,
    pub declarator: Option<Declarator>,
    pub span: Span,
}

impl Param {
    #[must_use]
    pub fn resolved_type(&self) -> Type {
        let base = self.spec.base.to_type();
        match &self.declarator {
            Some(d) => d.resolve_with(base).0,
            None => base,
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.declarator.as_ref().and_then(Declarator::name)
    }
}

#[derive(Debug, Clone)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub spec: DeclSpec,
    pub items: Vec<InitDeclarator>,
}

#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub spec: DeclSpec,
    pub declarator: Declarator,
    pub params: Vec<Param>,
    pub variadic: bool,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExternalDecl {
    Declaration(Declaration),
    FunctionDef(FunctionDef),
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub decls: Vec<ExternalDecl>,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Decl(Declaration),
    Block(Block),
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
    While { cond: Expr, body: Box<Stmt> },
    DoWhile { body: Box<Stmt>, cond: Expr },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    Break(Span),
    Continue(Span),
    Return(Option<Expr>, Span),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    LogAnd,
    LogOr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Comma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Plus,
    Neg,
    Not,
    BitNot,
    Deref,
    Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// Assignment-operator kind; `Plain` is a simple `=`, all others are the
/// compound-assignment family (`+=`, `&=`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Plain,
    Compound(BinOp),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral { value: u32, unsigned: bool },
    StringLiteral(Rc<[i32]>),
    Ident(String),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    IncDec(IncDec, Box<Expr>),
    Assign(AssignOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Sizeof(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}
