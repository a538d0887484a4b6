//! Tokenizer for rule expressions.

use super::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Dot,
    LParen,
    RParen,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
}

/// A token together with the byte offset it starts at.
pub(crate) type Spanned = (usize, Token);

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, ch)) = chars.peek().copied() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }

        if ch == '"' || ch == '\'' {
            let quote = ch;
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                if c == quote {
                    closed = true;
                    break;
                }
                if c == '\\' {
                    match chars.next() {
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, 't')) => value.push('\t'),
                        Some((_, escaped)) => value.push(escaped),
                        None => break,
                    }
                    continue;
                }
                value.push(c);
            }
            if !closed {
                return Err(ParseError::new(pos, "unterminated string literal"));
            }
            tokens.push((pos, Token::Str(value)));
            continue;
        }

        if ch.is_ascii_digit() {
            // After a '.', digits are an array index segment, never a fraction.
            let index_segment = matches!(tokens.last(), Some((_, Token::Dot)));
            let mut text = String::new();
            let mut seen_dot = false;
            while let Some((_, c)) = chars.peek().copied() {
                if c.is_ascii_digit() {
                    text.push(c);
                    chars.next();
                } else if c == '.'
                    && !seen_dot
                    && !index_segment
                    && next_is_digit(input, pos + text.len() + 1)
                {
                    seen_dot = true;
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            let number = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(pos, format!("invalid number '{text}'")))?;
            tokens.push((pos, Token::Number(number)));
            continue;
        }

        if is_ident_start(ch) {
            let mut value = String::new();
            while let Some((_, c)) = chars.peek().copied() {
                if is_ident_char(c) {
                    value.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push((pos, Token::Ident(value)));
            continue;
        }

        chars.next();
        let next = chars.peek().map(|(_, c)| *c);
        let token = match (ch, next) {
            ('=', Some('=')) => {
                chars.next();
                Token::EqEq
            }
            ('!', Some('=')) => {
                chars.next();
                Token::NotEq
            }
            ('<', Some('=')) => {
                chars.next();
                Token::Le
            }
            ('>', Some('=')) => {
                chars.next();
                Token::Ge
            }
            ('&', Some('&')) => {
                chars.next();
                Token::AndAnd
            }
            ('|', Some('|')) => {
                chars.next();
                Token::OrOr
            }
            ('<', _) => Token::Lt,
            ('>', _) => Token::Gt,
            ('!', _) => Token::Bang,
            ('.', _) => Token::Dot,
            ('(', _) => Token::LParen,
            (')', _) => Token::RParen,
            ('+', _) => Token::Plus,
            ('-', _) => Token::Minus,
            ('*', _) => Token::Star,
            ('/', _) => Token::Slash,
            ('%', _) => Token::Percent,
            (other, _) => {
                return Err(ParseError::new(pos, format!("unexpected character '{other}'")));
            }
        };
        tokens.push((pos, token));
    }

    Ok(tokens)
}

fn next_is_digit(input: &str, offset: usize) -> bool {
    input[offset.min(input.len())..]
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
