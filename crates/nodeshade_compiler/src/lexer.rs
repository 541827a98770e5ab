// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokenizer for the generated-program dialect.

use serde::{Deserialize, Serialize};

/// A positioned syntax error from the lexer or parser
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{line}:{col}: {message}")]
pub struct SyntaxError {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub col: u32,
    /// Human-readable message
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            col,
            message: message.into(),
        }
    }
}

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    /// Identifier or keyword
    Ident(String),
    /// Numeric literal; the raw lexeme is kept so hex form stays detectable
    Number { value: f64, lexeme: String },
    /// Quoted string literal
    Str(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `;`
    Semi,
    /// `.`
    Dot,
    /// `=`
    Eq,
    /// `=>`
    Arrow,
    /// `-`
    Minus,
}

/// A token with its source position
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind
    pub tok: Tok,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub col: u32,
}

/// Tokenize program text, tracking line/column positions
pub fn tokenize(text: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut line: u32 = 1;
    let mut col: u32 = 1;

    let bump = |c: char, line: &mut u32, col: &mut u32| {
        if c == '\n' {
            *line += 1;
            *col = 1;
        } else {
            *col += 1;
        }
    };

    while i < chars.len() {
        let c = chars[i];

        if c.is_whitespace() {
            bump(c, &mut line, &mut col);
            i += 1;
            continue;
        }

        // Line and block comments.
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
                col += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            col += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                bump(chars[i], &mut line, &mut col);
                i += 1;
            }
            if i >= chars.len() {
                return Err(SyntaxError::new(line, col, "unterminated block comment"));
            }
            i += 2;
            col += 2;
            continue;
        }

        let start_line = line;
        let start_col = col;

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let mut ident = String::new();
            while i < chars.len()
                && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                ident.push(chars[i]);
                i += 1;
                col += 1;
            }
            tokens.push(Token {
                tok: Tok::Ident(ident),
                line: start_line,
                col: start_col,
            });
            continue;
        }

        if c.is_ascii_digit() {
            let mut lexeme = String::new();
            if c == '0' && matches!(chars.get(i + 1), Some('x' | 'X')) {
                lexeme.push_str("0x");
                i += 2;
                col += 2;
                while i < chars.len() && chars[i].is_ascii_hexdigit() {
                    lexeme.push(chars[i]);
                    i += 1;
                    col += 1;
                }
                let digits = &lexeme[2..];
                let value = u64::from_str_radix(digits, 16)
                    .map_err(|_| SyntaxError::new(start_line, start_col, "invalid hex literal"))?;
                tokens.push(Token {
                    tok: Tok::Number {
                        value: value as f64,
                        lexeme,
                    },
                    line: start_line,
                    col: start_col,
                });
            } else {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    lexeme.push(chars[i]);
                    i += 1;
                    col += 1;
                }
                let value: f64 = lexeme
                    .parse()
                    .map_err(|_| SyntaxError::new(start_line, start_col, "invalid number literal"))?;
                tokens.push(Token {
                    tok: Tok::Number { value, lexeme },
                    line: start_line,
                    col: start_col,
                });
            }
            continue;
        }

        if c == '\'' || c == '"' {
            let quote = c;
            i += 1;
            col += 1;
            let mut s = String::new();
            while i < chars.len() && chars[i] != quote {
                if chars[i] == '\n' {
                    return Err(SyntaxError::new(start_line, start_col, "unterminated string"));
                }
                s.push(chars[i]);
                i += 1;
                col += 1;
            }
            if i >= chars.len() {
                return Err(SyntaxError::new(start_line, start_col, "unterminated string"));
            }
            i += 1;
            col += 1;
            tokens.push(Token {
                tok: Tok::Str(s),
                line: start_line,
                col: start_col,
            });
            continue;
        }

        let tok = match c {
            '{' => Tok::LBrace,
            '}' => Tok::RBrace,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            ':' => Tok::Colon,
            ',' => Tok::Comma,
            ';' => Tok::Semi,
            '.' => Tok::Dot,
            '-' => Tok::Minus,
            '=' => {
                if chars.get(i + 1) == Some(&'>') {
                    i += 1;
                    col += 1;
                    Tok::Arrow
                } else {
                    Tok::Eq
                }
            }
            other => {
                return Err(SyntaxError::new(
                    start_line,
                    start_col,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(Token {
            tok,
            line: start_line,
            col: start_col,
        });
        i += 1;
        col += 1;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_statement() {
        let tokens = tokenize("const c = color(0xff0000);").unwrap();
        assert_eq!(tokens[0].tok, Tok::Ident("const".to_string()));
        assert_eq!(tokens[2].tok, Tok::Eq);
        assert!(matches!(
            &tokens[5].tok,
            Tok::Number { lexeme, .. } if lexeme == "0xff0000"
        ));
        assert_eq!(tokens.last().unwrap().tok, Tok::Semi);
    }

    #[test]
    fn test_positions_and_comments() {
        let tokens = tokenize("// skip me\nreturn x;").unwrap();
        assert_eq!(tokens[0].tok, Tok::Ident("return".to_string()));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[0].col, 1);
    }

    #[test]
    fn test_arrow_and_strings() {
        let tokens = tokenize("() => 'three/tsl'").unwrap();
        assert_eq!(tokens[2].tok, Tok::Arrow);
        assert_eq!(tokens[3].tok, Tok::Str("three/tsl".to_string()));
    }

    #[test]
    fn test_error_is_positioned() {
        let err = tokenize("const a = @;").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.col, 11);
    }
}
