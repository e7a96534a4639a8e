//! Token extraction from expression strings

use super::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f32),
    /// Name, possibly colon-delimited (`body:arm`)
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
    Dot,
}

impl TokenKind {
    /// Source-like rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(n) => n.to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Dot => ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset into the source
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Split an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '.' && source[position + 1..].starts_with(|n: char| n.is_ascii_digit()));

        if starts_number {
            let mut end = position;
            let mut seen_exponent = false;
            while let Some(&(i, n)) = chars.peek() {
                let exponent_sign = seen_exponent
                    && (n == '+' || n == '-')
                    && matches!(source[..i].chars().last(), Some('e') | Some('E'));
                if n.is_ascii_digit() || n == '.' || exponent_sign {
                    end = i + n.len_utf8();
                    chars.next();
                } else if (n == 'e' || n == 'E') && !seen_exponent {
                    seen_exponent = true;
                    end = i + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &source[position..end];
            let value = text.parse::<f32>().map_err(|_| ExpressionError::InvalidNumber {
                text: text.to_string(),
                position,
            })?;
            tokens.push(Token { kind: TokenKind::Number(value), position });
            continue;
        }

        if is_ident_start(c) {
            let mut end = position;
            while let Some(&(i, n)) = chars.peek() {
                if is_ident_continue(n) {
                    end = i + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token { kind: TokenKind::Ident(source[position..end].to_string()), position });
            continue;
        }

        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            other => return Err(ExpressionError::UnexpectedCharacter { character: other, position }),
        };
        tokens.push(Token { kind, position });
        chars.next();
    }

    Ok(tokens)
}
