//! Recursive-descent parser producing an [`ast::TranslationUnit`].
//!
//! Declarator parsing follows the standard two-pass "pointer prefix, then
//! direct-declarator suffix loop" shape so that function-pointer forms like
//! `int (*(*p3)(int,void*))(int* a,int)` fall out of plain recursion rather
//! than needing a dedicated special case.

use crate::ast::*;
use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::token::{Keyword, Punct, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, Diagnostic>;

impl Parser {
    #[must_use]
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub fn parse_translation_unit(mut self) -> PResult<TranslationUnit> {
        let mut decls = Vec::new();
        while !self.at_eof() {
            decls.push(self.parse_external_decl()?);
        }
        Ok(TranslationUnit { decls })
    }

    // --- token stream helpers -------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn span(&self) -> Span {
        self.peek().span
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check_punct(&self, p: Punct) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(k) if *k == p)
    }

    fn check_keyword(&self, k: Keyword) -> bool {
        matches!(&self.peek().kind, TokenKind::Keyword(kw) if *kw == k)
    }

    fn eat_punct(&mut self, p: Punct) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, k: Keyword) -> bool {
        if self.check_keyword(k) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: Punct, what: &str) -> PResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, expected: &str) -> Diagnostic {
        Diagnostic::error(
            Kind::Parse,
            self.span(),
            format!("expected {expected}, found {}", describe(&self.peek().kind)),
        )
    }

    fn ident(&mut self) -> PResult<(String, Span)> {
        let span = self.span();
        match self.peek().kind.clone() {
            TokenKind::Ident(s) => {
                self.advance();
                Ok((s, span))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    // --- declarations -----------------------------------------------------

    fn at_decl_start(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Keyword(
                Keyword::Int
                    | Keyword::Unsigned
                    | Keyword::Char
                    | Keyword::Void
                    | Keyword::Static
                    | Keyword::Extern
                    | Keyword::Auto
                    | Keyword::Register
            )
        )
    }

    fn parse_decl_spec(&mut self) -> PResult<DeclSpec> {
        let span = self.span();
        let mut storage = None;
        let mut base = None;
        loop {
            if let TokenKind::Keyword(kw) = self.peek().kind {
                let sc = match kw {
                    Keyword::Static => Some(StorageClass::Static),
                    Keyword::Extern => Some(StorageClass::Extern),
                    Keyword::Auto => Some(StorageClass::Auto),
                    Keyword::Register => Some(StorageClass::Register),
                    _ => None,
                };
                if let Some(sc) = sc {
                    if storage.is_some() {
                        return Err(Diagnostic::error(
                            Kind::Parse,
                            self.span(),
                            "multiple storage-class specifiers",
                        ));
                    }
                    storage = Some(sc);
                    self.advance();
                    continue;
                }
                let bt = match kw {
                    Keyword::Int => Some(BaseType::Int),
                    Keyword::Unsigned => Some(BaseType::Unsigned),
                    Keyword::Char => Some(BaseType::Char),
                    Keyword::Void => Some(BaseType::Void),
                    _ => None,
                };
                if let Some(bt) = bt {
                    if base.is_some() {
                        return Err(Diagnostic::error(
                            Kind::Parse,
                            self.span(),
                            "multiple type specifiers",
                        ));
                    }
                    base = Some(bt);
                    self.advance();
                    continue;
                }
            }
            break;
        }
        let base = base.ok_or_else(|| self.unexpected("a type specifier"))?;
        Ok(DeclSpec { storage, base, span })
    }

    /// `*`-prefixed declarator, recursing into the direct-declarator suffix
    /// loop. See module docs: this is the standard declarator algorithm.
    fn parse_declarator(&mut self) -> PResult<Declarator> {
        if self.eat_punct(Punct::Star) {
            let inner = self.parse_declarator()?;
            return Ok(Declarator::Pointer(Box::new(inner)));
        }
        self.parse_direct_declarator()
    }

    fn parse_direct_declarator(&mut self) -> PResult<Declarator> {
        let mut base = if self.eat_punct(Punct::LParen) {
            let inner = self.parse_declarator()?;
            self.expect_punct(Punct::RParen, "')'")?;
            inner
        } else if matches!(self.peek().kind, TokenKind::Ident(_)) {
            let (name, span) = self.ident()?;
            Declarator::Name(Some(name), span)
        } else {
            Declarator::Name(None, self.span())
        };

        loop {
            if self.eat_punct(Punct::LBracket) {
                let dim = if self.check_punct(Punct::RBracket) {
                    None
                } else {
                    Some(Box::new(self.parse_expr()?))
                };
                self.expect_punct(Punct::RBracket, "']'")?;
                base = Declarator::Array(Box::new(base), dim);
            } else if self.eat_punct(Punct::LParen) {
                let (params, variadic) = self.parse_param_list()?;
                self.expect_punct(Punct::RParen, "')'")?;
                base = Declarator::Function(Box::new(base), params, variadic);
            } else {
                break;
            }
        }
        Ok(base)
    }

    /// Returns the parameter list and whether it ended in `...`. This C
    /// subset never actually produces `true` (there is no ellipsis token to
    /// lex), but `ast::Declarator::Function` carries the flag because
    /// `Type::Function` does too, so the shape round-trips end to end.
    fn parse_param_list(&mut self) -> PResult<(Vec<Param>, bool)> {
        let mut params = Vec::new();
        if self.check_punct(Punct::RParen) {
            return Ok((params, false));
        }
        // `(void)` means no parameters.
        if self.check_keyword(Keyword::Void) && self.peek_ahead_is_rparen() {
            self.advance();
            return Ok((params, false));
        }
        loop {
            let span = self.span();
            let spec = self.parse_decl_spec()?;
            let declarator = if self.check_punct(Punct::Comma) || self.check_punct(Punct::RParen) {
                None
            } else {
                Some(self.parse_declarator()?)
            };
            params.push(Param { spec, declarator, span });
            if self.eat_punct(Punct::Comma) {
                continue;
            }
            break;
        }
        Ok((params, false))
    }

    fn peek_ahead_is_rparen(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(TokenKind::Punct(Punct::RParen))
        )
    }

    fn parse_init_declarator(&mut self) -> PResult<InitDeclarator> {
        let declarator = self.parse_declarator()?;
        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        Ok(InitDeclarator { declarator, init })
    }

    fn parse_declaration(&mut self) -> PResult<Declaration> {
        let spec = self.parse_decl_spec()?;
        let mut items = Vec::new();
        if !self.check_punct(Punct::Semi) {
            items.push(self.parse_init_declarator()?);
            while self.eat_punct(Punct::Comma) {
                items.push(self.parse_init_declarator()?);
            }
        }
        self.expect_punct(Punct::Semi, "';'")?;
        Ok(Declaration { spec, items })
    }

    fn parse_external_decl(&mut self) -> PResult<ExternalDecl> {
        let span = self.span();
        let spec = self.parse_decl_spec()?;
        let declarator = self.parse_declarator()?;
        if self.check_punct(Punct::LBrace) {
            let (params, variadic) = match &declarator {
                Declarator::Function(_, params, variadic) => (params.clone(), *variadic),
                _ => {
                    return Err(Diagnostic::error(
                        Kind::Parse,
                        span,
                        "function body on a non-function declarator",
                    ))
                }
            };
            let body = self.parse_block()?;
            return Ok(ExternalDecl::FunctionDef(FunctionDef {
                spec,
                declarator,
                params,
                variadic,
                body,
                span,
            }));
        }
        let init = if self.eat_punct(Punct::Assign) {
            Some(self.parse_assignment_expr()?)
        } else {
            None
        };
        let mut items = vec![InitDeclarator { declarator, init }];
        while self.eat_punct(Punct::Comma) {
            items.push(self.parse_init_declarator()?);
        }
        self.expect_punct(Punct::Semi, "';'")?;
        Ok(ExternalDecl::Declaration(Declaration { spec, items }))
    }

    // --- statements ---------------------------------------------------

    fn parse_block(&mut self) -> PResult<Block> {
        let span = self.span();
        self.expect_punct(Punct::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check_punct(Punct::RBrace) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect_punct(Punct::RBrace, "'}'")?;
        Ok(Block { stmts, span })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if self.check_punct(Punct::LBrace) {
            return Ok(Stmt::Block(self.parse_block()?));
        }
        if self.at_decl_start() {
            return Ok(Stmt::Decl(self.parse_declaration()?));
        }
        if self.eat_punct(Punct::Semi) {
            return Ok(Stmt::Null);
        }
        if self.eat_keyword(Keyword::If) {
            self.expect_punct(Punct::LParen, "'('")?;
            let cond = self.parse_expr()?;
            self.expect_punct(Punct::RParen, "')'")?;
            let then_branch = Box::new(self.parse_stmt()?);
            let else_branch = if self.eat_keyword(Keyword::Else) {
                Some(Box::new(self.parse_stmt()?))
            } else {
                None
            };
            return Ok(Stmt::If { cond, then_branch, else_branch });
        }
        if self.eat_keyword(Keyword::While) {
            self.expect_punct(Punct::LParen, "'('")?;
            let cond = self.parse_expr()?;
            self.expect_punct(Punct::RParen, "')'")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::While { cond, body });
        }
        if self.eat_keyword(Keyword::Do) {
            let body = Box::new(self.parse_stmt()?);
            if !self.eat_keyword(Keyword::While) {
                return Err(self.unexpected("'while'"));
            }
            self.expect_punct(Punct::LParen, "'('")?;
            let cond = self.parse_expr()?;
            self.expect_punct(Punct::RParen, "')'")?;
            self.expect_punct(Punct::Semi, "';'")?;
            return Ok(Stmt::DoWhile { body, cond });
        }
        if self.eat_keyword(Keyword::For) {
            self.expect_punct(Punct::LParen, "'('")?;
            let init = if self.check_punct(Punct::Semi) {
                self.advance();
                None
            } else if self.at_decl_start() {
                Some(Box::new(Stmt::Decl(self.parse_declaration()?)))
            } else {
                let e = self.parse_expr()?;
                self.expect_punct(Punct::Semi, "';'")?;
                Some(Box::new(Stmt::Expr(e)))
            };
            let cond = if self.check_punct(Punct::Semi) { None } else { Some(self.parse_expr()?) };
            self.expect_punct(Punct::Semi, "';'")?;
            let step = if self.check_punct(Punct::RParen) { None } else { Some(self.parse_expr()?) };
            self.expect_punct(Punct::RParen, "')'")?;
            let body = Box::new(self.parse_stmt()?);
            return Ok(Stmt::For { init, cond, step, body });
        }
        if self.check_keyword(Keyword::Break) {
            let span = self.span();
            self.advance();
            self.expect_punct(Punct::Semi, "';'")?;
            return Ok(Stmt::Break(span));
        }
        if self.check_keyword(Keyword::Continue) {
            let span = self.span();
            self.advance();
            self.expect_punct(Punct::Semi, "';'")?;
            return Ok(Stmt::Continue(span));
        }
        if self.check_keyword(Keyword::Return) {
            let span = self.span();
            self.advance();
            let value =
                if self.check_punct(Punct::Semi) { None } else { Some(self.parse_expr()?) };
            self.expect_punct(Punct::Semi, "';'")?;
            return Ok(Stmt::Return(value, span));
        }
        let e = self.parse_expr()?;
        self.expect_punct(Punct::Semi, "';'")?;
        Ok(Stmt::Expr(e))
    }

    // --- expressions: precedence-climbing ------------------------------

    fn parse_expr(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_assignment_expr()?;
        while self.check_punct(Punct::Comma) {
            let span = self.span();
            self.advance();
            let rhs = self.parse_assignment_expr()?;
            lhs = Expr::new(ExprKind::Binary(BinOp::Comma, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_assignment_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_conditional_expr()?;
        let op = match self.peek().kind {
            TokenKind::Punct(Punct::Assign) => Some(AssignOp::Plain),
            TokenKind::Punct(Punct::PlusAssign) => Some(AssignOp::Compound(BinOp::Add)),
            TokenKind::Punct(Punct::MinusAssign) => Some(AssignOp::Compound(BinOp::Sub)),
            TokenKind::Punct(Punct::StarAssign) => Some(AssignOp::Compound(BinOp::Mul)),
            TokenKind::Punct(Punct::SlashAssign) => Some(AssignOp::Compound(BinOp::Div)),
            TokenKind::Punct(Punct::PercentAssign) => Some(AssignOp::Compound(BinOp::Mod)),
            TokenKind::Punct(Punct::AmpAssign) => Some(AssignOp::Compound(BinOp::BitAnd)),
            TokenKind::Punct(Punct::PipeAssign) => Some(AssignOp::Compound(BinOp::BitOr)),
            TokenKind::Punct(Punct::CaretAssign) => Some(AssignOp::Compound(BinOp::BitXor)),
            TokenKind::Punct(Punct::ShlAssign) => Some(AssignOp::Compound(BinOp::Shl)),
            TokenKind::Punct(Punct::ShrAssign) => Some(AssignOp::Compound(BinOp::Shr)),
            _ => None,
        };
        if let Some(op) = op {
            let span = self.span();
            self.advance();
            // assignment is right-associative
            let rhs = self.parse_assignment_expr()?;
            return Ok(Expr::new(ExprKind::Assign(op, Box::new(lhs), Box::new(rhs)), span));
        }
        Ok(lhs)
    }

    fn parse_conditional_expr(&mut self) -> PResult<Expr> {
        let cond = self.parse_binary_expr(0)?;
        if self.eat_punct(Punct::Question) {
            let span = self.span();
            let then_e = self.parse_expr()?;
            self.expect_punct(Punct::Colon, "':'")?;
            let else_e = self.parse_assignment_expr()?;
            return Ok(Expr::new(
                ExprKind::Conditional(Box::new(cond), Box::new(then_e), Box::new(else_e)),
                span,
            ));
        }
        Ok(cond)
    }

    /// Binary-operator precedence table, lowest to highest. Each level is a
    /// left-associative chain built over the next-higher level.
    fn binop_at(&self, level: usize) -> Option<BinOp> {
        let kind = &self.peek().kind;
        let p = match kind {
            TokenKind::Punct(p) => *p,
            _ => return None,
        };
        let op = match (level, p) {
            (0, Punct::OrOr) => BinOp::LogOr,
            (1, Punct::AndAnd) => BinOp::LogAnd,
            (2, Punct::Pipe) => BinOp::BitOr,
            (3, Punct::Caret) => BinOp::BitXor,
            (4, Punct::Amp) => BinOp::BitAnd,
            (5, Punct::EqEq) => BinOp::Eq,
            (5, Punct::NotEq) => BinOp::Ne,
            (6, Punct::Lt) => BinOp::Lt,
            (6, Punct::Le) => BinOp::Le,
            (6, Punct::Gt) => BinOp::Gt,
            (6, Punct::Ge) => BinOp::Ge,
            (7, Punct::Shl) => BinOp::Shl,
            (7, Punct::Shr) => BinOp::Shr,
            (8, Punct::Plus) => BinOp::Add,
            (8, Punct::Minus) => BinOp::Sub,
            (9, Punct::Star) => BinOp::Mul,
            (9, Punct::Slash) => BinOp::Div,
            (9, Punct::Percent) => BinOp::Mod,
            _ => return None,
        };
        Some(op)
    }

    const MAX_LEVEL: usize = 9;

    fn parse_binary_expr(&mut self, level: usize) -> PResult<Expr> {
        if level > Self::MAX_LEVEL {
            return self.parse_unary_expr();
        }
        let mut lhs = self.parse_binary_expr(level + 1)?;
        while let Some(op) = self.binop_at(level) {
            let span = self.span();
            self.advance();
            let rhs = self.parse_binary_expr(level + 1)?;
            lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
        }
        Ok(lhs)
    }

    fn parse_unary_expr(&mut self) -> PResult<Expr> {
        let span = self.span();
        let un = match self.peek().kind {
            TokenKind::Punct(Punct::Plus) => Some(UnOp::Plus),
            TokenKind::Punct(Punct::Minus) => Some(UnOp::Neg),
            TokenKind::Punct(Punct::Not) => Some(UnOp::Not),
            TokenKind::Punct(Punct::Tilde) => Some(UnOp::BitNot),
            TokenKind::Punct(Punct::Star) => Some(UnOp::Deref),
            TokenKind::Punct(Punct::Amp) => Some(UnOp::Addr),
            _ => None,
        };
        if let Some(op) = un {
            self.advance();
            let operand = self.parse_unary_expr()?;
            return Ok(Expr::new(ExprKind::Unary(op, Box::new(operand)), span));
        }
        if self.eat_punct(Punct::PlusPlus) {
            let operand = self.parse_unary_expr()?;
            return Ok(Expr::new(ExprKind::IncDec(IncDec::PreInc, Box::new(operand)), span));
        }
        if self.eat_punct(Punct::MinusMinus) {
            let operand = self.parse_unary_expr()?;
            return Ok(Expr::new(ExprKind::IncDec(IncDec::PreDec, Box::new(operand)), span));
        }
        if self.eat_keyword(Keyword::Sizeof) {
            let operand = self.parse_unary_expr()?;
            return Ok(Expr::new(ExprKind::Sizeof(Box::new(operand)), span));
        }
        self.parse_postfix_expr()
    }

    fn parse_postfix_expr(&mut self) -> PResult<Expr> {
        let mut e = self.parse_primary_expr()?;
        loop {
            let span = self.span();
            if self.eat_punct(Punct::LBracket) {
                let index = self.parse_expr()?;
                self.expect_punct(Punct::RBracket, "']'")?;
                e = Expr::new(ExprKind::Index(Box::new(e), Box::new(index)), span);
            } else if self.eat_punct(Punct::LParen) {
                let mut args = Vec::new();
                if !self.check_punct(Punct::RParen) {
                    args.push(self.parse_assignment_expr()?);
                    while self.eat_punct(Punct::Comma) {
                        args.push(self.parse_assignment_expr()?);
                    }
                }
                self.expect_punct(Punct::RParen, "')'")?;
                e = Expr::new(ExprKind::Call(Box::new(e), args), span);
            } else if self.eat_punct(Punct::PlusPlus) {
                e = Expr::new(ExprKind::IncDec(IncDec::PostInc, Box::new(e)), span);
            } else if self.eat_punct(Punct::MinusMinus) {
                e = Expr::new(ExprKind::IncDec(IncDec::PostDec, Box::new(e)), span);
            } else {
                break;
            }
        }
        Ok(e)
    }

    fn parse_primary_expr(&mut self) -> PResult<Expr> {
        let span = self.span();
        match self.peek().kind.clone() {
            TokenKind::IntLiteral { value, unsigned } => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral { value, unsigned }, span))
            }
            TokenKind::CharLiteral(v) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntLiteral { value: v as u32, unsigned: false }, span))
            }
            TokenKind::StringLiteral(bytes) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(bytes.into()), span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::new(ExprKind::Ident(name), span))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect_punct(Punct::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(s) => format!("identifier `{s}`"),
        TokenKind::IntLiteral { value, .. } => format!("integer literal `{value}`"),
        TokenKind::CharLiteral(_) => "a character literal".to_string(),
        TokenKind::StringLiteral(_) => "a string literal".to_string(),
        TokenKind::Keyword(k) => format!("keyword `{k:?}`"),
        TokenKind::Punct(p) => format!("`{p:?}`"),
        TokenKind::Eof => "end of file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(src: &str) -> TranslationUnit {
        let tokens = Lexer::new(src).tokenize().expect("lex ok");
        Parser::new(tokens).parse_translation_unit().expect("parse ok")
    }

    #[test]
    fn parses_simple_function() {
        let tu = parse("int main(void) { return 0; }");
        assert_eq!(tu.decls.len(), 1);
        match &tu.decls[0] {
            ExternalDecl::FunctionDef(f) => assert_eq!(f.declarator.name(), Some("main")),
            _ => panic!("expected function def"),
        }
    }

    #[test]
    fn parses_function_pointer_array_declarator() {
        let tu = parse("int (*pa[2])(int);");
        match &tu.decls[0] {
            ExternalDecl::Declaration(d) => {
                let (ty, name, _) = d.items[0].declarator.resolve_with(d.spec.base.to_type());
                assert_eq!(name.as_deref(), Some("pa"));
                assert!(ty.is_array());
            }
            _ => panic!("expected declaration"),
        }
    }

    #[test]
    fn parses_nested_function_pointer_declarator() {
        let tu = parse("int (*(*p3)(int,void*))(int a,int);");
        match &tu.decls[0] {
            ExternalDecl::Declaration(d) => {
                assert_eq!(d.items[0].declarator.name(), Some("p3"));
            }
            _ => panic!("expected declaration"),
        }
    }

    #[test]
    fn precedence_binds_multiplication_tighter_than_addition() {
        let tu = parse("int x = 1 + 2 * 3;");
        let init = match &tu.decls[0] {
            ExternalDecl::Declaration(d) => d.items[0].init.clone().unwrap(),
            _ => panic!(),
        };
        match init.kind {
            ExprKind::Binary(BinOp::Add, _, rhs) => {
                assert!(matches!(rhs.kind, ExprKind::Binary(BinOp::Mul, _, _)));
            }
            _ => panic!("expected top-level +"),
        }
    }

    #[test]
    fn parses_conditional_and_comma() {
        let tu = parse("int x = (1, 2 ? 3 : 4);");
        let init = match &tu.decls[0] {
            ExternalDecl::Declaration(d) => d.items[0].init.clone().unwrap(),
            _ => panic!(),
        };
        assert!(matches!(init.kind, ExprKind::Binary(BinOp::Comma, _, _)));
    }
}
