//! Query parser.
//!
//! Queries are tokenized first, then parenthesis balance is checked on the token stream,
//! and finally the expression tree is built by recursive descent:
//!
//! ```text
//! expr       := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := number | identifier | identifier '(' expr (',' expr)* ')' | '(' expr ')'
//! number     := digit+
//! identifier := (letter | '_') (letter | digit | '_')*
//! ```

use std::fmt;

use crate::LapQueryError;

use super::{BinaryOperator, Expression, Function};

#[derive(Clone, Debug, PartialEq)]
enum TokenKind {
    Number(i64),
    Identifier(String),
    OpenParen,
    CloseParen,
    Comma,
    Operator(BinaryOperator),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::OpenParen => write!(f, "("),
            TokenKind::CloseParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Operator(op) => write!(f, "{}", op.symbol()),
        }
    }
}

#[derive(Clone, Debug)]
struct Token {
    kind: TokenKind,
    position: usize,
}

/// Parses a query string into an expression tree.
pub fn parse(query: &str) -> Result<Expression, LapQueryError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(LapQueryError::EmptyQuery);
    }
    // positions are reported against the untrimmed query
    let offset = query.len() - query.trim_start().len();

    let tokens = tokenize(trimmed, offset)?;
    check_balance(&tokens)?;

    let mut parser = Parser { tokens, cursor: 0 };
    let expression = parser.parse_expression()?;
    match parser.peek() {
        Some(token) => Err(LapQueryError::UnexpectedToken {
            found: token.kind.to_string(),
            position: token.position,
        }),
        None => Ok(expression),
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(input: &str, offset: usize) -> Result<Vec<Token>, LapQueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        let position = index + offset;
        let kind = match c {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Operator(BinaryOperator::Add),
            '-' => TokenKind::Operator(BinaryOperator::Subtract),
            '*' => TokenKind::Operator(BinaryOperator::Multiply),
            '/' => TokenKind::Operator(BinaryOperator::Divide),
            '0'..='9' => {
                let mut literal = c.to_string();
                while let Some(&(_, next)) = chars.peek() {
                    if !is_identifier_char(next) {
                        break;
                    }
                    literal.push(next);
                    chars.next();
                }
                // a digit run glued to letters is a broken number, not an identifier
                let number = literal
                    .parse::<i64>()
                    .map_err(|_| LapQueryError::MalformedNumber { literal })?;
                TokenKind::Number(number)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = c.to_string();
                while let Some(&(_, next)) = chars.peek() {
                    if !is_identifier_char(next) {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                TokenKind::Identifier(name)
            }
            character => {
                return Err(LapQueryError::IllegalCharacter {
                    character,
                    position,
                });
            }
        };
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

/// Depth counter over the parentheses: it may never go negative and must end at zero.
fn check_balance(tokens: &[Token]) -> Result<(), LapQueryError> {
    let mut open = Vec::new();
    for token in tokens {
        match token.kind {
            TokenKind::OpenParen => open.push(token.position),
            TokenKind::CloseParen => {
                if open.pop().is_none() {
                    return Err(LapQueryError::UnexpectedClosingParenthesis {
                        position: token.position,
                    });
                }
            }
            _ => {}
        }
    }
    match open.pop() {
        Some(position) => Err(LapQueryError::UnclosedParenthesis { position }),
        None => Ok(()),
    }
}

struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, expected: TokenKind) -> Result<(), LapQueryError> {
        match self.next() {
            Some(token) if token.kind == expected => Ok(()),
            Some(token) => Err(LapQueryError::UnexpectedToken {
                found: token.kind.to_string(),
                position: token.position,
            }),
            None => Err(LapQueryError::UnexpectedEnd),
        }
    }

    fn next_operator(&mut self, accepted: &[BinaryOperator]) -> Option<BinaryOperator> {
        match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Operator(op)) if accepted.contains(op) => {
                let op = *op;
                self.cursor += 1;
                Some(op)
            }
            _ => None,
        }
    }

    /// Additive level.
    fn parse_expression(&mut self) -> Result<Expression, LapQueryError> {
        let mut expression = self.parse_term()?;
        while let Some(operator) =
            self.next_operator(&[BinaryOperator::Add, BinaryOperator::Subtract])
        {
            let rhs = self.parse_term()?;
            expression = Expression::Binary {
                operator,
                lhs: Box::new(expression),
                rhs: Box::new(rhs),
            };
        }
        Ok(expression)
    }

    /// Multiplicative level.
    fn parse_term(&mut self) -> Result<Expression, LapQueryError> {
        let mut expression = self.parse_factor()?;
        while let Some(operator) =
            self.next_operator(&[BinaryOperator::Multiply, BinaryOperator::Divide])
        {
            let rhs = self.parse_factor()?;
            expression = Expression::Binary {
                operator,
                lhs: Box::new(expression),
                rhs: Box::new(rhs),
            };
        }
        Ok(expression)
    }

    fn parse_factor(&mut self) -> Result<Expression, LapQueryError> {
        let token = self.next().ok_or(LapQueryError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expression::NumberLiteral(n)),
            TokenKind::Identifier(name) => {
                if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::OpenParen)) {
                    self.cursor += 1;
                    self.parse_call(name)
                } else {
                    Ok(Expression::Variable(name))
                }
            }
            TokenKind::OpenParen => {
                let inner = self.parse_expression()?;
                self.expect(TokenKind::CloseParen)?;
                Ok(inner)
            }
            other => Err(LapQueryError::UnexpectedToken {
                found: other.to_string(),
                position: token.position,
            }),
        }
    }

    /// Arguments of a call whose opening parenthesis was consumed. Commas inside nested
    /// calls belong to those calls.
    fn parse_call(&mut self, name: String) -> Result<Expression, LapQueryError> {
        let mut args = vec![self.parse_expression()?];
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Comma)) {
            self.cursor += 1;
            args.push(self.parse_expression()?);
        }
        self.expect(TokenKind::CloseParen)?;

        Function::resolve(&name, args.len())?;
        Ok(Expression::FunctionCall(name, args))
    }
}
