//! Source bytes to token stream.
//!
//! Handles comments, identifiers (vs. keywords), integer literals, and the
//! escape grammar for character/string literals. Identifiers that happen to
//! spell a target register or device name (`R0`..`R7`, `crt`, `kbd`, ...)
//! are ordinary identifiers here -- the code generator is responsible for
//! not colliding with them at emission time, not the lexer.

use std::fmt;

use crate::diagnostics::{Diagnostic, Kind, Span};
use crate::token::{Keyword, Punct, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

impl std::error::Error for LexError {}

impl From<LexError> for Diagnostic {
    fn from(e: LexError) -> Self {
        Diagnostic::error(Kind::Lex, e.span, e.message)
    }
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

type LexResult<T> = Result<T, LexError>;

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(src: &'a str) -> Self {
        Lexer { src: src.as_bytes(), pos: 0, line: 0, col: 0 }
    }

    /// Tokenize the entire source, returning a restartable token sequence
    /// (always terminated by a single `Eof` token).
    pub fn tokenize(mut self) -> LexResult<Vec<Token>> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia()?;
            let span = self.span();
            if self.at_end() {
                out.push(Token::new(TokenKind::Eof, span));
                return Ok(out);
            }
            let tok = self.next_token()?;
            out.push(tok);
        }
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> u8 {
        if self.at_end() { 0 } else { self.src[self.pos] }
    }

    fn peek_at(&self, offset: usize) -> u8 {
        self.src.get(self.pos + offset).copied().unwrap_or(0)
    }

    fn bump(&mut self) -> u8 {
        let b = self.peek();
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        b
    }

    fn skip_trivia(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while !self.at_end() && self.peek() != b'\n' {
                        self.bump();
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let start = self.span();
                    self.bump();
                    self.bump();
                    loop {
                        if self.at_end() {
                            return Err(LexError { span: start, message: "unterminated block comment".into() });
                        }
                        if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> LexResult<Token> {
        let span = self.span();
        let c = self.peek();
        if is_ident_start(c) {
            return Ok(self.lex_ident_or_keyword(span));
        }
        if c.is_ascii_digit() {
            return self.lex_number(span);
        }
        if c == b'\'' {
            return self.lex_char_literal(span);
        }
        if c == b'"' {
            return self.lex_string_literal(span);
        }
        self.lex_punct(span)
    }

    fn lex_ident_or_keyword(&mut self, span: Span) -> Token {
        let start = self.pos;
        while is_ident_continue(self.peek()) {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("").to_string();
        let kind = match Keyword::from_str(&text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(text),
        };
        Token::new(kind, span)
    }

    fn lex_number(&mut self, span: Span) -> LexResult<Token> {
        let start = self.pos;
        let value: u32 = if self.peek() == b'0' && (self.peek_at(1) == b'x' || self.peek_at(1) == b'X') {
            self.bump();
            self.bump();
            let digit_start = self.pos;
            while self.peek().is_ascii_hexdigit() {
                self.bump();
            }
            if self.pos == digit_start {
                return Err(LexError { span, message: "hexadecimal literal with no digits".into() });
            }
            let text = std::str::from_utf8(&self.src[digit_start..self.pos]).unwrap();
            u32::from_str_radix(text, 16)
                .map_err(|_| LexError { span, message: "hexadecimal literal out of range".into() })?
        } else if self.peek() == b'0' {
            self.bump();
            let digit_start = self.pos;
            while matches!(self.peek(), b'0'..=b'7') {
                self.bump();
            }
            if self.pos == digit_start {
                0
            } else {
                let text = std::str::from_utf8(&self.src[digit_start..self.pos]).unwrap();
                u32::from_str_radix(text, 8)
                    .map_err(|_| LexError { span, message: "octal literal out of range".into() })?
            }
        } else {
            while self.peek().is_ascii_digit() {
                self.bump();
            }
            let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
            text.parse::<u64>()
                .ok()
                .filter(|v| *v <= u64::from(u32::MAX))
                .map(|v| v as u32)
                .ok_or_else(|| LexError { span, message: "integer literal out of range".into() })?
        };
        let mut unsigned = value > i32::MAX as u32;
        loop {
            match self.peek() {
                b'u' | b'U' => {
                    unsigned = true;
                    self.bump();
                }
                b'l' | b'L' => {
                    self.bump();
                }
                _ => break,
            }
        }
        Ok(Token::new(TokenKind::IntLiteral { value, unsigned }, span))
    }

    /// Decode one logical "character element" inside a `'...'` or `"..."`
    /// literal: either a plain byte or a backslash escape. Returns the
    /// decoded 32-bit value.
    fn lex_literal_element(&mut self, quote: u8) -> LexResult<i32> {
        let span = self.span();
        let c = self.bump();
        if c != b'\\' {
            return Ok(i32::from(c));
        }
        if self.at_end() {
            return Err(LexError { span, message: "unterminated escape sequence".into() });
        }
        let e = self.bump();
        let value = match e {
            b'n' => 10,
            b't' => 9,
            b'b' => 8,
            b'r' => 13,
            b'f' => 12,
            b'v' => 11,
            b'a' => 7,
            b'\\' => 92,
            b'\'' => 39,
            b'"' => 34,
            b'?' => 63,
            b'0'..=b'7' => {
                let mut v: u32 = u32::from(e - b'0');
                for _ in 0..2 {
                    if matches!(self.peek(), b'0'..=b'7') {
                        v = v * 8 + u32::from(self.bump() - b'0');
                    } else {
                        break;
                    }
                }
                v as i32
            }
            b'x' => {
                let digit_start = self.pos;
                while self.peek().is_ascii_hexdigit() {
                    self.bump();
                }
                if self.pos == digit_start {
                    return Err(LexError { span, message: "\\x escape with no hex digits".into() });
                }
                let text = std::str::from_utf8(&self.src[digit_start..self.pos]).unwrap();
                u32::from_str_radix(text, 16)
                    .map(|v| v as i32)
                    .unwrap_or_else(|_| {
                        // Overlong \x escapes still parse byte-by-byte; wrap like the target word.
                        text.bytes().fold(0i32, |acc, b| {
                            let digit = (b as char).to_digit(16).unwrap_or(0) as i32;
                            acc.wrapping_shl(4).wrapping_add(digit)
                        })
                    })
            }
            b'u' => {
                let mut v: u32 = 0;
                for _ in 0..4 {
                    if !self.peek().is_ascii_hexdigit() {
                        return Err(LexError { span, message: "\\u escape needs 4 hex digits".into() });
                    }
                    let digit = (self.bump() as char).to_digit(16).unwrap();
                    v = v * 16 + digit;
                }
                v as i32
            }
            _ if e == quote => i32::from(e),
            other => {
                return Err(LexError {
                    span,
                    message: format!("unknown escape sequence '\\{}'", other as char),
                })
            }
        };
        Ok(value)
    }

    fn lex_char_literal(&mut self, span: Span) -> LexResult<Token> {
        self.bump(); // opening '
        let mut last = 0i32;
        let mut any = false;
        loop {
            if self.at_end() || self.peek() == b'\n' {
                return Err(LexError { span, message: "unterminated character literal".into() });
            }
            if self.peek() == b'\'' {
                self.bump();
                break;
            }
            last = self.lex_literal_element(b'\'')?;
            any = true;
        }
        if !any {
            return Err(LexError { span, message: "empty character literal".into() });
        }
        Ok(Token::new(TokenKind::CharLiteral(last), span))
    }

    fn lex_string_literal(&mut self, span: Span) -> LexResult<Token> {
        self.bump(); // opening "
        let mut chars = Vec::new();
        loop {
            if self.at_end() || self.peek() == b'\n' {
                return Err(LexError { span, message: "unterminated string literal".into() });
            }
            if self.peek() == b'"' {
                self.bump();
                break;
            }
            chars.push(self.lex_literal_element(b'"')?);
        }
        Ok(Token::new(TokenKind::StringLiteral(chars), span))
    }

    fn lex_punct(&mut self, span: Span) -> LexResult<Token> {
        macro_rules! two {
            ($second:expr, $two:expr, $one:expr) => {{
                if self.peek_at(1) == $second {
                    self.bump();
                    self.bump();
                    $two
                } else {
                    self.bump();
                    $one
                }
            }};
        }
        use Punct::*;
        let p = match self.peek() {
            b'(' => { self.bump(); LParen }
            b')' => { self.bump(); RParen }
            b'[' => { self.bump(); LBracket }
            b']' => { self.bump(); RBracket }
            b'{' => { self.bump(); LBrace }
            b'}' => { self.bump(); RBrace }
            b';' => { self.bump(); Semi }
            b',' => { self.bump(); Comma }
            b'.' => { self.bump(); Dot }
            b'?' => { self.bump(); Question }
            b':' => { self.bump(); Colon }
            b'~' => { self.bump(); Tilde }
            b'+' => {
                if self.peek_at(1) == b'+' { self.bump(); self.bump(); PlusPlus }
                else { two!(b'=', PlusAssign, Plus) }
            }
            b'-' => {
                if self.peek_at(1) == b'-' { self.bump(); self.bump(); MinusMinus }
                else if self.peek_at(1) == b'>' { self.bump(); self.bump(); Arrow }
                else { two!(b'=', MinusAssign, Minus) }
            }
            b'*' => two!(b'=', StarAssign, Star),
            b'/' => two!(b'=', SlashAssign, Slash),
            b'%' => two!(b'=', PercentAssign, Percent),
            b'=' => two!(b'=', EqEq, Assign),
            b'!' => two!(b'=', NotEq, Not),
            b'&' => {
                if self.peek_at(1) == b'&' { self.bump(); self.bump(); AndAnd }
                else { two!(b'=', AmpAssign, Amp) }
            }
            b'|' => {
                if self.peek_at(1) == b'|' { self.bump(); self.bump(); OrOr }
                else { two!(b'=', PipeAssign, Pipe) }
            }
            b'^' => two!(b'=', CaretAssign, Caret),
            b'<' => {
                if self.peek_at(1) == b'<' {
                    self.bump();
                    self.bump();
                    if self.peek() == b'=' { self.bump(); ShlAssign } else { Shl }
                } else {
                    two!(b'=', Le, Lt)
                }
            }
            b'>' => {
                if self.peek_at(1) == b'>' {
                    self.bump();
                    self.bump();
                    if self.peek() == b'=' { self.bump(); ShrAssign } else { Shr }
                } else {
                    two!(b'=', Ge, Gt)
                }
            }
            other => {
                return Err(LexError {
                    span,
                    message: format!("unexpected character '{}'", other as char),
                });
            }
        };
        Ok(Token::new(TokenKind::Punct(p), span))
    }
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().expect("lex ok").into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn reserved_register_names_are_plain_identifiers() {
        let t = toks("int R0 = 100;");
        assert!(matches!(&t[1], TokenKind::Ident(s) if s == "R0"));
    }

    #[test]
    fn char_literal_single() {
        let t = toks("'a'");
        assert_eq!(t[0], TokenKind::CharLiteral(97));
    }

    #[test]
    fn char_literal_multi_keeps_last_byte() {
        let t = toks("'abc'");
        assert_eq!(t[0], TokenKind::CharLiteral(99));
    }

    #[test]
    fn char_literal_mixed_escape_keeps_last() {
        let t = toks("'a\\xfF'");
        assert_eq!(t[0], TokenKind::CharLiteral(0xff));
    }

    #[test]
    fn universal_name_escape() {
        let t = toks("'\\u00c4'");
        assert_eq!(t[0], TokenKind::CharLiteral(0xc4));
    }

    #[test]
    fn octal_and_hex_escapes() {
        assert_eq!(toks("'\\012'")[0], TokenKind::CharLiteral(0o12));
        assert_eq!(toks("'\\x1F'")[0], TokenKind::CharLiteral(0x1f));
    }

    #[test]
    fn empty_escape_is_zero() {
        assert_eq!(toks("'\\0'")[0], TokenKind::CharLiteral(0));
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let t = toks(r#""a\b""#);
        assert_eq!(t[0], TokenKind::StringLiteral(vec![97, 8]));
    }

    #[test]
    fn unsigned_suffix_and_overflow() {
        let t = toks("4294967295U");
        assert_eq!(t[0], TokenKind::IntLiteral { value: 4_294_967_295, unsigned: true });
        let t = toks("2147483648");
        assert_eq!(t[0], TokenKind::IntLiteral { value: 2_147_483_648, unsigned: true });
        let t = toks("42");
        assert_eq!(t[0], TokenKind::IntLiteral { value: 42, unsigned: false });
    }

    #[test]
    fn hex_and_octal_integers() {
        assert_eq!(toks("0x1f")[0], TokenKind::IntLiteral { value: 0x1f, unsigned: false });
        assert_eq!(toks("017")[0], TokenKind::IntLiteral { value: 0o17, unsigned: false });
    }

    #[test]
    fn line_comment_and_block_comment_are_skipped() {
        let t = toks("1 /* x */ // y\n 2");
        assert_eq!(t.len(), 3); // 1, 2, Eof
    }
}
