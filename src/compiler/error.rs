//! the three error kinds a source file can fail at: lexing, parsing, and the
//! semantic checks the parser runs inline while it builds the AST. each
//! variant carries a `SourceLoc` so the CLI can print `file:line:col`.

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourceLoc {
    pub line: usize,
    pub col: usize,
}

impl SourceLoc {
    pub fn new(line: usize, col: usize) -> SourceLoc {
        SourceLoc { line, col }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum LexError {
        UnclosedCharLiteral(loc: SourceLoc) {
            display("{}: unclosed char literal", loc)
        }
        UnclosedStringLiteral(loc: SourceLoc) {
            display("{}: unclosed string literal", loc)
        }
        InvalidEscape(loc: SourceLoc, c: char) {
            display("{}: invalid escape '\\{}'", loc, c)
        }
        NumericLiteralOverflow(loc: SourceLoc, text: String) {
            display("{}: numeric literal '{}' does not fit its type", loc, text)
        }
        UnexpectedCharacter(loc: SourceLoc, c: char) {
            display("{}: unexpected character '{}'", loc, c)
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum ParseError {
        UnexpectedToken(loc: SourceLoc, expected: String, got: String) {
            display("{}: expected {}, got {}", loc, expected, got)
        }
        UnclosedGroup(loc: SourceLoc) {
            display("{}: unclosed group", loc)
        }
        UnexpectedEof(loc: SourceLoc) {
            display("{}: unexpected end of input", loc)
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum SemanticError {
        UnknownIdentifier(loc: SourceLoc, name: String) {
            display("{}: unknown identifier '{}'", loc, name)
        }
        TypeMismatch(loc: SourceLoc, expected: String, got: String) {
            display("{}: type mismatch: expected {}, got {}", loc, expected, got)
        }
        MissingReturn(loc: SourceLoc, function: String) {
            display("{}: function '{}' may fall through without returning a value", loc, function)
        }
        DuplicateIdentifier(loc: SourceLoc, name: String) {
            display("{}: '{}' is already declared in this scope", loc, name)
        }
        NotAnArrayOrPointer(loc: SourceLoc, name: String) {
            display("{}: '{}' cannot be subscripted - not an array or pointer", loc, name)
        }
        AssignToNonLvalue(loc: SourceLoc) {
            display("{}: left-hand side of assignment is not an lvalue", loc)
        }
        Unimplemented(loc: SourceLoc, what: String) {
            display("{}: {} is not implemented", loc, what)
        }
    }
}
