//! an eager tokenizer: the whole source is scanned up front into a `Vec<Token>`
//! before the parser ever runs, matching the original's `tokenizeAll` pass.

use crate::compiler::error::{LexError, SourceLoc};
use crate::compiler::token::{Token, TokenKind};

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        col: 1,
    };
    lexer.run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    fn run(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let loc = self.loc();
            let c = match self.peek() {
                Some(c) => c,
                None => {
                    tokens.push(Token::new(TokenKind::Eof, loc));
                    break;
                }
            };

            let kind = if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == '_' || c.is_alphabetic() {
                self.lex_identifier_or_keyword()
            } else if c == '"' {
                self.lex_string()?
            } else if c == '\'' {
                self.lex_char()?
            } else {
                self.lex_operator()?
            };
            tokens.push(Token::new(kind, loc));
        }
        Ok(tokens)
    }

    fn loc(&self) -> SourceLoc {
        SourceLoc::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    while self.peek().is_some() && !(self.peek() == Some('*') && self.peek_at(1) == Some('/')) {
                        self.advance();
                    }
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.loc();
        let start = self.pos;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !is_float && self.peek_at(1).map_or(false, |d| d.is_ascii_digit()) {
                is_float = true;
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_float {
            let v: f32 = text
                .parse()
                .map_err(|_| LexError::NumericLiteralOverflow(loc, text.clone()))?;
            Ok(TokenKind::FloatLit(v))
        } else {
            let v: i32 = text
                .parse()
                .map_err(|_| LexError::NumericLiteralOverflow(loc, text.clone()))?;
            Ok(TokenKind::IntLit(v))
        }
    }

    fn lex_identifier_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.as_str() {
            "int" => TokenKind::Int,
            "float" => TokenKind::Float,
            "char" => TokenKind::Char,
            "bool" => TokenKind::Bool,
            "void" => TokenKind::Void,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "return" => TokenKind::Return,
            "sizeof" => TokenKind::Sizeof,
            "true" => TokenKind::BoolLit(true),
            "false" => TokenKind::BoolLit(false),
            _ => TokenKind::Identifier(text),
        }
    }

    fn lex_string(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.loc();
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::UnclosedStringLiteral(loc)),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.advance().ok_or(LexError::UnclosedStringLiteral(loc))?;
                    out.push(escape_char(escaped, loc)? as char);
                }
                Some(c) => {
                    self.advance();
                    out.push(c);
                }
            }
        }
        Ok(TokenKind::StringLit(out))
    }

    fn lex_char(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.loc();
        self.advance(); // opening quote
        let byte = match self.advance() {
            Some('\\') => {
                let escaped = self.advance().ok_or(LexError::UnclosedCharLiteral(loc))?;
                escape_char(escaped, loc)?
            }
            Some(c) => c as u8,
            None => return Err(LexError::UnclosedCharLiteral(loc)),
        };
        if self.peek() != Some('\'') {
            return Err(LexError::UnclosedCharLiteral(loc));
        }
        self.advance();
        Ok(TokenKind::CharLit(byte))
    }

    fn lex_operator(&mut self) -> Result<TokenKind, LexError> {
        let loc = self.loc();
        let c = self.advance().expect("checked by caller");
        use TokenKind::*;
        let kind = match c {
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ',' => Comma,
            ';' => Semicolon,
            '~' => Tilde,
            '%' => Percent,
            '^' => Caret,
            '+' => {
                if self.peek() == Some('+') {
                    self.advance();
                    PlusPlus
                } else {
                    Plus
                }
            }
            '-' => {
                if self.peek() == Some('-') {
                    self.advance();
                    MinusMinus
                } else {
                    Minus
                }
            }
            '*' => Star,
            '/' => Slash,
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    AndAnd
                } else {
                    Ampersand
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    OrOr
                } else {
                    Pipe
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Neq
                } else {
                    Bang
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    Eq
                } else {
                    Assign
                }
            }
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    Shl
                } else if self.peek() == Some('=') {
                    self.advance();
                    Lte
                } else {
                    Lt
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    Shr
                } else if self.peek() == Some('=') {
                    self.advance();
                    Gte
                } else {
                    Gt
                }
            }
            other => return Err(LexError::UnexpectedCharacter(loc, other)),
        };
        Ok(kind)
    }
}

/// the same escape table the assembler's lexer uses - see SPEC_FULL.md §15.
fn escape_char(c: char, loc: SourceLoc) -> Result<u8, LexError> {
    Ok(match c {
        'a' => 0x07,
        'b' => 0x08,
        't' => 0x09,
        'n' => 0x0A,
        'v' => 0x0B,
        'f' => 0x0C,
        'r' => 0x0D,
        'e' => 0x1B,
        '\'' => b'\'',
        '"' => b'"',
        '\\' => b'\\',
        '0' => 0x00,
        _ => return Err(LexError::InvalidEscape(loc, c)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_a_function_signature() {
        assert_eq!(
            kinds("int f(int x)"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier("f".to_string()),
                TokenKind::LParen,
                TokenKind::Int,
                TokenKind::Identifier("x".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_compound_operators_longest_match_first() {
        assert_eq!(
            kinds("a <= b && c >> 1"),
            vec![
                TokenKind::Identifier("a".to_string()),
                TokenKind::Lte,
                TokenKind::Identifier("b".to_string()),
                TokenKind::AndAnd,
                TokenKind::Identifier("c".to_string()),
                TokenKind::Shr,
                TokenKind::IntLit(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_line_and_block_comments() {
        assert_eq!(
            kinds("int x; // trailing\n/* block */ int y;"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier("x".to_string()),
                TokenKind::Semicolon,
                TokenKind::Int,
                TokenKind::Identifier("y".to_string()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn char_literal_escape() {
        assert_eq!(kinds("'\\n'"), vec![TokenKind::CharLit(b'\n'), TokenKind::Eof]);
    }
}
