//! the T-language token alphabet - kept deliberately small (§4.6 scopes the
//! grammar to "the supported subset" of C).

use crate::compiler::error::SourceLoc;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // literals
    IntLit(i32),
    FloatLit(f32),
    CharLit(u8),
    BoolLit(bool),
    StringLit(String),
    Identifier(String),

    // type keywords
    Int,
    Float,
    Char,
    Bool,
    Void,

    // control keywords
    If,
    Else,
    For,
    While,
    Return,
    Sizeof,

    // punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    // operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Shl,
    Shr,
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
    AndAnd,
    OrOr,
    PlusPlus,
    MinusMinus,

    Eof,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub loc: SourceLoc,
}

impl Token {
    pub fn new(kind: TokenKind, loc: SourceLoc) -> Token {
        Token { kind, loc }
    }

    /// a human label for error messages - `"identifier"`, `"'+'"`, etc.
    pub fn describe(&self) -> String {
        use TokenKind::*;
        match &self.kind {
            IntLit(_) => "an integer literal".to_string(),
            FloatLit(_) => "a float literal".to_string(),
            CharLit(_) => "a char literal".to_string(),
            BoolLit(_) => "a bool literal".to_string(),
            StringLit(_) => "a string literal".to_string(),
            Identifier(name) => format!("identifier '{}'", name),
            Eof => "end of input".to_string(),
            other => format!("'{:?}'", other),
        }
    }
}
