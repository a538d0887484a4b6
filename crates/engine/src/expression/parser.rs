//! Recursive-descent parser turning tokens into an [`Expr`] tree.
//!
//! Precedence, lowest first: `||`, `&&`, `!`, comparisons, `+ -`, `* / %`,
//! unary `-`. Comparisons do not chain.

use super::lexer::{tokenize, Spanned, Token};
use super::{ArithOp, CompareOp, Expr, FieldPath, LogicalOp, ParseError, Value};

pub(crate) fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(ParseError::new(0, "empty expression"));
    }
    let mut parser = Parser::new(tokens, input.len());
    let expr = parser.parse_or()?;
    if let Some((pos, token)) = parser.peek_spanned() {
        return Err(ParseError::new(*pos, format!("unexpected trailing token {token:?}")));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Self { tokens, pos: 0, end }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|(p, _)| *p).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keywords: &[&str]) -> bool {
        match self.peek() {
            Some(Token::Ident(word)) => keywords.iter().any(|k| word.eq_ignore_ascii_case(k)),
            _ => false,
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) || self.peek_keyword(&["or", "orelse"]) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::logical(LogicalOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while matches!(self.peek(), Some(Token::AndAnd)) || self.peek_keyword(&["and", "andalso"]) {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::logical(LogicalOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::Bang)) || self.peek_keyword(&["not"]) {
            self.advance();
            let operand = self.parse_not()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let Some(op) = self.peek().and_then(compare_op) else {
            return Ok(left);
        };
        self.advance();
        let right = self.parse_additive()?;

        if self.peek().and_then(compare_op).is_some() {
            return Err(ParseError::new(
                self.offset(),
                "comparisons cannot be chained; combine them with '&&'",
            ));
        }
        Ok(Expr::comparison(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => ArithOp::Mul,
                Some(Token::Slash) => ArithOp::Div,
                Some(Token::Percent) => ArithOp::Rem,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::arithmetic(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Negate(Box::new(operand)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ParseError::new(offset, "unclosed '('")),
                }
            }
            Some(Token::Ident(word)) => {
                if word.eq_ignore_ascii_case("true") {
                    Ok(Expr::Literal(Value::Bool(true)))
                } else if word.eq_ignore_ascii_case("false") {
                    Ok(Expr::Literal(Value::Bool(false)))
                } else if word.eq_ignore_ascii_case("null") {
                    Ok(Expr::Literal(Value::Null))
                } else if is_reserved(&word) {
                    Err(ParseError::new(offset, format!("unexpected keyword '{word}'")))
                } else {
                    self.parse_path(word)
                }
            }
            Some(token) => Err(ParseError::new(offset, format!("unexpected token {token:?}"))),
            None => Err(ParseError::new(offset, "unexpected end of expression")),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Expr, ParseError> {
        let mut segments = vec![root];
        while matches!(self.peek(), Some(Token::Dot)) {
            self.advance();
            let offset = self.offset();
            match self.advance() {
                Some(Token::Ident(segment)) => segments.push(segment),
                Some(Token::Number(n)) if n.fract() == 0.0 && n >= 0.0 => {
                    segments.push(format!("{}", n as u64));
                }
                _ => return Err(ParseError::new(offset, "expected a field name after '.'")),
            }
        }
        Ok(Expr::FieldRef(FieldPath::new(segments)))
    }
}

fn compare_op(token: &Token) -> Option<CompareOp> {
    match token {
        Token::EqEq => Some(CompareOp::Eq),
        Token::NotEq => Some(CompareOp::Ne),
        Token::Lt => Some(CompareOp::Lt),
        Token::Le => Some(CompareOp::Le),
        Token::Gt => Some(CompareOp::Gt),
        Token::Ge => Some(CompareOp::Ge),
        _ => None,
    }
}

fn is_reserved(word: &str) -> bool {
    ["and", "andalso", "or", "orelse", "not"]
        .iter()
        .any(|k| word.eq_ignore_ascii_case(k))
}
