//! line-level tokenization: comments, operand splitting, numeric and char
//! literals. kept separate from the section/label/encoding layers so each
//! concern can be tested in isolation.

use crate::asm::error::AssembleError;

/// strips a `;`-introduced comment, unless the `;` falls inside a char
/// literal (`';'` must not be treated as starting a comment).
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_char_lit = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' if !in_char_lit => {
                in_char_lit = true;
                i += 1;
                // a char literal is `'x'` or `'\e'`; skip past its contents
                // so an escaped quote doesn't confuse the scan.
                if i < bytes.len() && bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1; // the literal character
                if i < bytes.len() && bytes[i] == b'\'' {
                    i += 1;
                }
                in_char_lit = false;
                continue;
            }
            b';' if !in_char_lit => return &line[..i],
            _ => i += 1,
        }
    }
    line
}

/// splits a raw operand string on top-level commas - commas inside a `[...]`
/// bracketed addressing form or a quoted string are not split points.
pub fn split_args(s: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '[' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ']' if !in_quotes => {
                depth -= 1;
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// the escape table for char and string literals: spec.md's `{a b t n v f r e}`
/// extended with `' " \` and a NUL fallback, matching the quoting rules
/// `globals.cpp::escapeChar` uses for the latter set - see SPEC_FULL.md §15.
/// `a` and `e` are spec.md's own addition, not present in the original.
pub fn escape_char(c: char) -> u8 {
    match c {
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
        _ => 0x00,
    }
}

/// parses a char literal's *contents* (without the surrounding quotes),
/// e.g. `a` or `\n`.
pub fn parse_char_literal(line: usize, inner: &str) -> Result<u8, AssembleError> {
    let mut chars = inner.chars();
    match chars.next() {
        Some('\\') => match chars.next() {
            Some(c) => Ok(escape_char(c)),
            None => Err(AssembleError::UnclosedCharLiteral(line)),
        },
        Some(c) if chars.next().is_none() => Ok(c as u8),
        _ => Err(AssembleError::UnclosedCharLiteral(line)),
    }
}

/// parses a numeric literal: `0x`/`0b`/`0d` prefixed, or plain decimal,
/// per the assembly grammar in spec.md §6.
pub fn parse_number(line: usize, text: &str) -> Result<u16, AssembleError> {
    let lower = text.to_ascii_lowercase();
    let (radix, digits): (u32, &str) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if let Some(rest) = lower.strip_prefix("0d") {
        (10, rest)
    } else {
        (10, lower.as_str())
    };
    u32::from_str_radix(digits, radix)
        .ok()
        .filter(|&v| v <= 0xFFFF)
        .map(|v| v as u16)
        .ok_or_else(|| AssembleError::LiteralOutOfRange(line, text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comment_ignores_semicolon_in_char_literal() {
        assert_eq!(strip_comment("mov AL, ';'  ; a comment"), "mov AL, ';'  ");
        assert_eq!(strip_comment("nop ; trailing"), "nop ");
    }

    #[test]
    fn split_args_respects_brackets() {
        assert_eq!(
            split_args("AL, [SP+2]"),
            vec!["AL".to_string(), "[SP+2]".to_string()]
        );
    }

    #[test]
    fn parse_number_accepts_all_prefixes() {
        assert_eq!(parse_number(1, "0x10").unwrap(), 16);
        assert_eq!(parse_number(1, "0b101").unwrap(), 5);
        assert_eq!(parse_number(1, "0d42").unwrap(), 42);
        assert_eq!(parse_number(1, "42").unwrap(), 42);
    }

    #[test]
    fn parse_number_rejects_overflow() {
        assert!(parse_number(1, "0x10000").is_err());
    }

    #[test]
    fn char_literal_escapes() {
        assert_eq!(parse_char_literal(1, "n").unwrap(), b'n');
        assert_eq!(parse_char_literal(1, "\\n").unwrap(), b'\n');
        assert_eq!(parse_char_literal(1, "\\e").unwrap(), 0x1B);
    }
}
