//! Recursive-descent parser producing a resolved expression tree
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! sum     := product (('+' | '-') product)*
//! product := unary (('*' | '/' | '%') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := number | '(' sum ')' | name '(' args ')' | name '.' channel | name
//! ```
//!
//! Part references are resolved while parsing, so the finished tree holds
//! only [`PartId`] handles and never touches names again.

use super::functions::Function;
use super::lexer::{Token, TokenKind};
use super::ExpressionError;
use crate::animation::{parse_channel_variable, Axis, Channel};
use crate::pose::{EntityProperty, PoseVariable};
use crate::registry::{PartId, ReferenceResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn apply(self, lhs: f32, rhs: f32) -> f32 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Rem => lhs % rhs,
        }
    }
}

/// Resolved expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(f32),
    Pose(PoseVariable),
    Part { part: PartId, channel: Channel, axis: Axis },
    Entity(EntityProperty),
    Negate(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Call { function: Function, args: Vec<Expr> },
}

impl Expr {
    fn constant_value(&self) -> Option<f32> {
        match self {
            Self::Constant(v) => Some(*v),
            _ => None,
        }
    }
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Byte length of the source, reported for errors at end of input
    end: usize,
    resolver: &'a dyn ReferenceResolver,
    context: Option<PartId>,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: &'a [Token],
        end: usize,
        resolver: &'a dyn ReferenceResolver,
        context: Option<PartId>,
        max_depth: usize,
    ) -> Self {
        Self { tokens, pos: 0, end, resolver, context, depth: 0, max_depth }
    }

    /// Parse the whole token stream as one expression.
    pub fn parse(mut self) -> Result<Expr, ExpressionError> {
        if self.tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let expr = self.parse_sum()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(unexpected(token)),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_is(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == *kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&'a Token, ExpressionError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(unexpected(token)),
            None => Err(ExpressionError::UnexpectedEnd { position: self.end }),
        }
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExpressionError::TooDeep { limit: self.max_depth });
        }
        Ok(())
    }

    fn parse_sum(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_product()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_product()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_product(&mut self) -> Result<Expr, ExpressionError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        self.descend()?;
        let expr = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Minus) => {
                self.advance();
                match self.parse_unary()? {
                    Expr::Constant(v) => Expr::Constant(-v),
                    inner => Expr::Negate(Box::new(inner)),
                }
            }
            Some(TokenKind::Plus) => {
                self.advance();
                self.parse_unary()?
            }
            _ => self.parse_primary()?,
        };
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        let token = self.advance().ok_or(ExpressionError::UnexpectedEnd { position: self.end })?;
        match &token.kind {
            TokenKind::Number(value) => Ok(Expr::Constant(*value)),
            TokenKind::LParen => {
                let inner = self.parse_sum()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if self.next_is(&TokenKind::LParen) {
                    self.parse_call(name, token.position)
                } else if self.next_is(&TokenKind::Dot) {
                    self.parse_part_reference(name, token.position)
                } else {
                    self.parse_variable(name, token.position)
                }
            }
            _ => Err(unexpected(token)),
        }
    }

    fn parse_variable(&self, name: &str, position: usize) -> Result<Expr, ExpressionError> {
        match name {
            "pi" => return Ok(Expr::Constant(std::f32::consts::PI)),
            "true" => return Ok(Expr::Constant(1.0)),
            "false" => return Ok(Expr::Constant(0.0)),
            "entity" => return Err(ExpressionError::EntityMisuse { position }),
            _ => {}
        }
        PoseVariable::from_name(name)
            .map(Expr::Pose)
            .ok_or_else(|| ExpressionError::UnknownVariable { name: name.to_string(), position })
    }

    fn parse_part_reference(&mut self, reference: &str, position: usize) -> Result<Expr, ExpressionError> {
        self.expect(TokenKind::Dot)?;
        let (variable, variable_position) = match self.advance() {
            Some(Token { kind: TokenKind::Ident(variable), position }) => (variable, *position),
            Some(token) => return Err(unexpected(token)),
            None => return Err(ExpressionError::UnexpectedEnd { position: self.end }),
        };
        let (channel, axis) = parse_channel_variable(variable).ok_or_else(|| {
            ExpressionError::InvalidChannel { variable: variable.clone(), position: variable_position }
        })?;
        let part = self
            .resolver
            .find_child(reference, self.context)
            .map_err(|source| ExpressionError::UnresolvedReference { source, position })?;
        Ok(Expr::Part { part, channel, axis })
    }

    fn parse_call(&mut self, name: &str, position: usize) -> Result<Expr, ExpressionError> {
        self.descend()?;
        self.expect(TokenKind::LParen)?;

        if let Some(property) = EntityProperty::from_name(name) {
            match self.advance() {
                Some(Token { kind: TokenKind::Ident(arg), .. }) if arg == "entity" => {}
                Some(token) => return Err(unexpected(token)),
                None => return Err(ExpressionError::UnexpectedEnd { position: self.end }),
            }
            self.expect(TokenKind::RParen)?;
            self.depth -= 1;
            return Ok(Expr::Entity(property));
        }

        let function = Function::from_name(name)
            .ok_or_else(|| ExpressionError::UnknownFunction { name: name.to_string(), position })?;

        let mut args = Vec::with_capacity(function.arity());
        if !self.next_is(&TokenKind::RParen) {
            loop {
                args.push(self.parse_sum()?);
                if self.next_is(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        self.depth -= 1;

        if args.len() != function.arity() {
            return Err(ExpressionError::WrongArity {
                function: function.name(),
                expected: function.arity(),
                got: args.len(),
            });
        }

        let constants: Option<Vec<f32>> = args.iter().map(Expr::constant_value).collect();
        Ok(match constants {
            Some(values) => Expr::Constant(function.apply(&values)),
            None => Expr::Call { function, args },
        })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    match (lhs.constant_value(), rhs.constant_value()) {
        (Some(a), Some(b)) => Expr::Constant(op.apply(a, b)),
        _ => Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) },
    }
}

fn unexpected(token: &Token) -> ExpressionError {
    ExpressionError::UnexpectedToken { token: token.kind.describe(), position: token.position }
}
