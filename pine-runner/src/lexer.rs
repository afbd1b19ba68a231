//! Line tokenizer for the recognized Pine subset.
//!
//! The subset is line-oriented, so lexing happens one source line at a time.
//! Dotted identifiers (`ta.sma`, `input.int`, `plot.style_histogram`) are a
//! single token; trailing `//` comments are dropped here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifier, possibly dotted (`close`, `ta.sma`, `color.new`).
    Ident(String),
    Num(f64),
    Str(String),
    Var,
    Varip,
    And,
    Or,
    Not,
    Na,
    True,
    False,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Question,
    Colon,
    /// `=` or `:=`.
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    NotEq,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("unexpected character '{found}' at column {column}")]
pub struct LexError {
    pub column: usize,
    pub found: char,
}

pub fn lex_line(line: &str) -> Result<Vec<Token>, LexError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => break,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            ':' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Assign);
                    i += 2;
                } else {
                    tokens.push(Token::Colon);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    tokens.push(Token::Assign);
                    i += 1;
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::NotEq);
                    i += 2;
                } else {
                    return Err(LexError {
                        column: i + 1,
                        found: c,
                    });
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut buf = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    buf.push(chars[i]);
                    i += 1;
                }
                if i >= chars.len() {
                    return Err(LexError {
                        column: i,
                        found: quote,
                    });
                }
                i += 1; // closing quote
                tokens.push(Token::Str(buf));
            }
            _ if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text.parse::<f64>().map_err(|_| LexError {
                    column: start + 1,
                    found: c,
                })?;
                tokens.push(Token::Num(value));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let mut buf = String::new();
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    buf.push(chars[i]);
                    i += 1;
                }
                // Fold dotted member access into one identifier.
                while chars.get(i) == Some(&'.')
                    && chars
                        .get(i + 1)
                        .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_')
                {
                    buf.push('.');
                    i += 1;
                    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                        buf.push(chars[i]);
                        i += 1;
                    }
                }
                tokens.push(keyword_or_ident(buf));
            }
            _ => {
                return Err(LexError {
                    column: i + 1,
                    found: c,
                })
            }
        }
    }

    Ok(tokens)
}

fn keyword_or_ident(word: String) -> Token {
    match word.as_str() {
        "var" => Token::Var,
        "varip" => Token::Varip,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "na" => Token::Na,
        "true" => Token::True,
        "false" => Token::False,
        _ => Token::Ident(word),
    }
}
