//! UTF-8 lexer for CN.
//!
//! Operates on raw bytes rather than decoded `char`s: the identifier class
//! (ASCII alnum ∪ `_` ∪ any byte `>= 0x80`) means a run of Chinese
//! characters is scanned as an opaque byte sequence and keyword lookup is a
//! byte-slice comparison, never a per-codepoint decode (§4.3).

pub mod keywords;

use cn_diagnostics::{DiagnosticBag, ErrorCode};
use keywords::KeywordCategory;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords — control flow
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    // Keywords — types
    KwInt,
    KwFloat,
    KwString,
    KwBool,
    KwVoid,
    // Keywords — declarations
    KwStruct,
    KwEnum,
    KwFunction,
    KwVar,
    KwModule,
    KwImport,
    KwPublic,
    KwPrivate,
    KwConst,
    KwStatic,
    // Keywords — constants
    True,
    False,
    KwNone,
    // Keywords — reserved, not implemented
    Namespace,
    Interface,
    Class,
    Template,
    Protected,
    Virtual,
    Override,
    Abstract,

    // Literals and names
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Punctuation and operators
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Arrow,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Shl,
    Shr,

    Eof,
}

/// A token's byte range lies within the preprocessor output buffer; line
/// and column are 1-based (§3 invariant).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte >= 0x80
}

fn is_ident_continue(byte: u8) -> bool {
    is_ident_start(byte) || byte.is_ascii_digit()
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    filename: PathBuf,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: impl Into<PathBuf>) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            filename: filename.into(),
        }
    }

    /// Scan the whole input into a token stream, terminated by `Eof`.
    /// Errors (invalid characters, unterminated strings) are recorded into
    /// `diagnostics` and scanning continues past them so that later
    /// diagnostics can still be produced from the rest of the file.
    pub fn tokenize(mut self, diagnostics: &mut DiagnosticBag) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let start = self.pos;
            let line = self.line;
            let column = self.column;
            let Some(byte) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    start,
                    end: start,
                    line,
                    column,
                });
                break;
            };

            let kind = if byte.is_ascii_digit() {
                self.scan_number()
            } else if byte == b'"' {
                self.scan_string(diagnostics, line, column)
            } else if is_ident_start(byte) {
                self.scan_identifier_or_keyword()
            } else {
                self.scan_operator(diagnostics, line, column)
            };

            tokens.push(Token {
                kind,
                start,
                end: self.pos,
                line,
                column,
            });
        }
        tokens
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    /// Lexer defensively skips whitespace and comments even though the
    /// preprocessor already stripped them, per §4.3.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while self.peek().is_some()
                        && !(self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/'))
                    {
                        self.advance();
                    }
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn scan_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_ident_continue(b) {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start..self.pos];
        match keywords::lookup(text) {
            Some((kind, _category)) => kind,
            None => TokenKind::Identifier(text.to_string()),
        }
    }

    fn scan_number(&mut self) -> TokenKind {
        let start = self.pos;
        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X')) {
            self.advance();
            self.advance();
            let hex_start = self.pos;
            while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
                self.advance();
            }
            let digits = &self.source[hex_start..self.pos];
            let value = i64::from_str_radix(digits, 16).unwrap_or(0);
            return TokenKind::IntLiteral(value);
        }

        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if b.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(lookahead), Some(b'+') | Some(b'-')) {
                lookahead += 1;
            }
            if matches!(self.peek_at(lookahead), Some(b) if b.is_ascii_digit()) {
                is_float = true;
                for _ in 0..=lookahead {
                    self.advance();
                }
                while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[start..self.pos];
        if is_float {
            TokenKind::FloatLiteral(text.parse().unwrap_or(0.0))
        } else {
            TokenKind::IntLiteral(text.parse().unwrap_or(0))
        }
    }

    fn scan_string(&mut self, diagnostics: &mut DiagnosticBag, line: usize, column: usize) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    diagnostics.error(
                        ErrorCode::LexUnterminatedString,
                        self.filename.clone(),
                        line,
                        column,
                        "未终止的字符串字面量",
                    );
                    break;
                }
                Some(b'"') => {
                    self.advance();
                    break;
                }
                Some(b'\n') => {
                    diagnostics.error(
                        ErrorCode::LexUnterminatedString,
                        self.filename.clone(),
                        line,
                        column,
                        "未终止的字符串字面量",
                    );
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    match self.peek() {
                        Some(b'\\') => {
                            value.push('\\');
                            self.advance();
                        }
                        Some(b'"') => {
                            value.push('"');
                            self.advance();
                        }
                        Some(b'n') => {
                            value.push('\n');
                            self.advance();
                        }
                        Some(b't') => {
                            value.push('\t');
                            self.advance();
                        }
                        Some(other) => {
                            value.push(other as char);
                            self.advance();
                        }
                        None => {}
                    }
                }
                Some(_) => {
                    let start = self.pos;
                    self.advance();
                    // Copy full UTF-8 sequences verbatim (the byte we just
                    // consumed may be a lead byte of a multi-byte char).
                    while self
                        .peek()
                        .is_some_and(|b| b >= 0x80 && b & 0xC0 == 0x80)
                    {
                        self.advance();
                    }
                    value.push_str(&self.source[start..self.pos]);
                }
            }
        }
        TokenKind::StringLiteral(value)
    }

    fn scan_operator(&mut self, diagnostics: &mut DiagnosticBag, line: usize, column: usize) -> TokenKind {
        let byte = self.advance().unwrap();
        macro_rules! two_char {
            ($second:expr, $two:expr, $one:expr) => {{
                if self.peek() == Some($second) {
                    self.advance();
                    $two
                } else {
                    $one
                }
            }};
        }
        match byte {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b':' => TokenKind::Colon,
            b'.' => TokenKind::Dot,
            b'+' => TokenKind::Plus,
            b'-' => two_char!(b'>', TokenKind::Arrow, TokenKind::Minus),
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Caret,
            b'~' => TokenKind::Tilde,
            b'&' => two_char!(b'&', TokenKind::AndAnd, TokenKind::Amp),
            b'|' => two_char!(b'|', TokenKind::OrOr, TokenKind::Pipe),
            b'=' => two_char!(b'=', TokenKind::EqEq, TokenKind::Assign),
            b'!' => two_char!(b'=', TokenKind::NotEq, TokenKind::Bang),
            b'<' => {
                if self.peek() == Some(b'<') {
                    self.advance();
                    TokenKind::Shl
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'>') {
                    self.advance();
                    TokenKind::Shr
                } else if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            _ => {
                diagnostics.error(
                    ErrorCode::LexInvalidChar,
                    self.filename.clone(),
                    line,
                    column,
                    format!("非法字符: 0x{byte:02x}"),
                );
                TokenKind::Identifier(String::new())
            }
        }
    }
}

/// Convenience entry point mirroring the phase-function shape used
/// throughout the pipeline.
pub fn lex(source: &str, filename: &Path, diagnostics: &mut DiagnosticBag) -> Vec<Token> {
    Lexer::new(source, filename).tokenize(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut diags = DiagnosticBag::new();
        lex(source, Path::new("t.cn"), &mut diags)
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn every_keyword_lexes_to_its_kind() {
        for entry in keywords::KEYWORDS {
            let ks = kinds(entry.bytes);
            assert_eq!(ks[0], entry.kind, "keyword {} mismatched", entry.bytes);
        }
    }

    #[test]
    fn non_keyword_chinese_identifier_lexes_whole() {
        let mut diags = DiagnosticBag::new();
        let tokens = lex("你好", Path::new("t.cn"), &mut diags);
        assert_eq!(tokens[0].kind, TokenKind::Identifier("你好".to_string()));
        assert_eq!(tokens[0].start, 0);
        assert_eq!(tokens[0].end, "你好".len());
    }

    #[test]
    fn hex_int_literal() {
        assert_eq!(kinds("0x1F")[0], TokenKind::IntLiteral(31));
    }

    #[test]
    fn float_literal() {
        assert_eq!(kinds("3.5")[0], TokenKind::FloatLiteral(3.5));
    }

    #[test]
    fn bool_literals_are_keywords() {
        assert_eq!(kinds("真")[0], TokenKind::True);
        assert_eq!(kinds("假")[0], TokenKind::False);
    }

    #[test]
    fn string_literal_with_escapes() {
        let ks = kinds(r#""a\nb\"c""#);
        assert_eq!(ks[0], TokenKind::StringLiteral("a\nb\"c".to_string()));
    }

    #[test]
    fn unterminated_string_reports_diagnostic() {
        let mut diags = DiagnosticBag::new();
        let _ = lex("\"abc", Path::new("t.cn"), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn invalid_character_reports_diagnostic() {
        let mut diags = DiagnosticBag::new();
        let _ = lex("@", Path::new("t.cn"), &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn two_char_operators_are_greedy() {
        assert_eq!(kinds("==")[0], TokenKind::EqEq);
        assert_eq!(kinds("&&")[0], TokenKind::AndAnd);
        assert_eq!(kinds("->")[0], TokenKind::Arrow);
        assert_eq!(kinds("<<")[0], TokenKind::Shl);
    }

    #[test]
    fn line_and_column_are_one_based() {
        let mut diags = DiagnosticBag::new();
        let tokens = lex("整数\n变量", Path::new("t.cn"), &mut diags);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 1);
    }
}
