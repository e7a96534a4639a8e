//! Animation expression compiler and evaluator
//!
//! Expressions are compiled once, with every part reference resolved to a
//! [`PartId`], and then evaluated every frame against the current pose and
//! part arena. Evaluation is pure and allocation-free.
//!
//! Supported syntax:
//! - Numbers: `1`, `0.5`, `.5`, `1e3`
//! - Pose variables: `limb_swing`, `limb_speed`, `age`, `head_yaw`, `head_pitch`
//! - Constants: `pi`, `true`, `false`
//! - Operators: `+`, `-`, `*`, `/`, `%`, unary `-`/`+`, parentheses
//! - Part channels: `head.rx`, `this.ty`, `body:arm.sz`
//! - Functions: `sin`, `cos`, `clamp`, `lerp`, `if`, ... (see [`Function`])
//! - Entity queries: `health(entity)`, `is_child(entity)`, ...

mod functions;
mod lexer;
mod parser;

use thiserror::Error;

pub use functions::Function;

use crate::pose::PoseInputs;
use crate::registry::{LookupError, PartArena, PartId, ReferenceResolver};
use functions::MAX_ARGS;
use parser::{Expr, Parser};

/// Nesting limit used by [`CompiledExpression::compile`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Error compiling an expression. Positions are byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: usize },
    #[error("unexpected token \"{token}\" at {position}")]
    UnexpectedToken { token: String, position: usize },
    #[error("unexpected end of expression at {position}")]
    UnexpectedEnd { position: usize },
    #[error("invalid number \"{text}\" at {position}")]
    InvalidNumber { text: String, position: usize },
    #[error("unknown variable \"{name}\" at {position}")]
    UnknownVariable { name: String, position: usize },
    #[error("unknown function \"{name}\" at {position}")]
    UnknownFunction { name: String, position: usize },
    #[error("function {function} expected {expected} arguments, got {got}")]
    WrongArity { function: &'static str, expected: usize, got: usize },
    #[error("invalid channel \"{variable}\" at {position}")]
    InvalidChannel { variable: String, position: usize },
    /// `entity` used outside an entity function
    #[error("\"entity\" at {position} is only valid as an entity function argument")]
    EntityMisuse { position: usize },
    #[error("{source} (at {position})")]
    UnresolvedReference { source: LookupError, position: usize },
    #[error("expression nested deeper than {limit}")]
    TooDeep { limit: usize },
}

/// An expression ready for per-frame evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
}

impl CompiledExpression {
    /// Compile `source`, resolving part references relative to `context`.
    pub fn compile(
        source: &str,
        resolver: &dyn ReferenceResolver,
        context: Option<PartId>,
    ) -> Result<Self, ExpressionError> {
        Self::compile_with_limit(source, resolver, context, DEFAULT_MAX_DEPTH)
    }

    /// Like [`compile`](Self::compile), with an explicit nesting limit.
    pub fn compile_with_limit(
        source: &str,
        resolver: &dyn ReferenceResolver,
        context: Option<PartId>,
        max_depth: usize,
    ) -> Result<Self, ExpressionError> {
        let tokens = lexer::tokenize(source)?;
        let root = Parser::new(&tokens, source.len(), resolver, context, max_depth).parse()?;
        Ok(Self { source: source.to_string(), root })
    }

    /// An expression that always yields `value`.
    pub fn constant(value: f32) -> Self {
        Self { source: value.to_string(), root: Expr::Constant(value) }
    }

    /// Text the expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Folded value, if the expression does not depend on any input.
    pub fn as_constant(&self) -> Option<f32> {
        match self.root {
            Expr::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn evaluate(&self, pose: &PoseInputs<'_>, parts: &PartArena) -> f32 {
        evaluate(&self.root, pose, parts)
    }

    /// Parts read by this expression, sorted and deduplicated.
    pub fn referenced_parts(&self) -> Vec<PartId> {
        let mut parts = Vec::new();
        collect_parts(&self.root, &mut parts);
        parts.sort();
        parts.dedup();
        parts
    }
}

fn evaluate(expr: &Expr, pose: &PoseInputs<'_>, parts: &PartArena) -> f32 {
    match expr {
        Expr::Constant(v) => *v,
        Expr::Pose(variable) => pose.variable(*variable),
        Expr::Part { part, channel, axis } => {
            parts.get(*part).map_or(0.0, |p| p.channel_value(*channel, *axis))
        }
        Expr::Entity(property) => pose.entity_property(*property),
        Expr::Negate(inner) => -evaluate(inner, pose, parts),
        Expr::Binary { op, lhs, rhs } => op.apply(evaluate(lhs, pose, parts), evaluate(rhs, pose, parts)),
        Expr::Call { function: Function::If, args } => match args.as_slice() {
            [condition, then, otherwise] => {
                if evaluate(condition, pose, parts) != 0.0 {
                    evaluate(then, pose, parts)
                } else {
                    evaluate(otherwise, pose, parts)
                }
            }
            _ => 0.0,
        },
        Expr::Call { function, args } => {
            let mut values = [0.0; MAX_ARGS];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = evaluate(arg, pose, parts);
            }
            function.apply(&values[..args.len().min(MAX_ARGS)])
        }
    }
}

fn collect_parts(expr: &Expr, out: &mut Vec<PartId>) {
    match expr {
        Expr::Part { part, .. } => out.push(*part),
        Expr::Negate(inner) => collect_parts(inner, out),
        Expr::Binary { lhs, rhs, .. } => {
            collect_parts(lhs, out);
            collect_parts(rhs, out);
        }
        Expr::Call { args, .. } => args.iter().for_each(|arg| collect_parts(arg, out)),
        Expr::Constant(_) | Expr::Pose(_) | Expr::Entity(_) => {}
    }
}
