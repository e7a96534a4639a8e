//! Animation bindings: one compiled expression driving one channel/axis
//!
//! A binding is declared in a part definition as `"<part>.<channel><axis>":
//! "<expression>"`, for example `"head.rx": "head_pitch * 0.5"`. Applying a
//! binding overwrites the target value; bindings run in declaration order,
//! so a later binding to the same channel/axis wins.

use std::fmt;
use thiserror::Error;

use crate::document::AnimationEntry;
use crate::expression::{CompiledExpression, ExpressionError};
use crate::pose::PoseInputs;
use crate::registry::{LookupError, PartArena, PartId, ReferenceResolver};

/// Transform channel written by a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
}

impl Channel {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            't' => Some(Self::Translate),
            'r' => Some(Self::Rotate),
            's' => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::Translate => 't',
            Self::Rotate => 'r',
            Self::Scale => 's',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'x' => Some(Self::X),
            'y' => Some(Self::Y),
            'z' => Some(Self::Z),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }

    /// Component index into `[x, y, z]` arrays.
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Parse a two-letter channel variable such as `rx` or `ty`.
pub fn parse_channel_variable(variable: &str) -> Option<(Channel, Axis)> {
    let mut chars = variable.chars();
    let channel = Channel::from_char(chars.next()?)?;
    let axis = Axis::from_char(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some((channel, axis))
}

/// Why a declared animation could not be bound.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum AnimationError {
    /// The part named on the left of the key does not exist
    #[error(transparent)]
    Target(#[from] LookupError),
    /// The variable after the `.` is not a channel/axis pair
    #[error("unknown animation variable \"{0}\"")]
    Variable(String),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

/// A compiled expression wired to one channel/axis of one part.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationBinding {
    target: PartId,
    expression: CompiledExpression,
    channel: Channel,
    axis: Axis,
}

impl AnimationBinding {
    pub fn new(target: PartId, expression: CompiledExpression, channel: Channel, axis: Axis) -> Self {
        Self { target, expression, channel, axis }
    }

    /// Resolve the target of a declared animation and compile its expression.
    ///
    /// `context` is the part whose definition declared the animation; the
    /// expression itself is compiled with the target as its `this`.
    pub fn compile(
        entry: &AnimationEntry,
        resolver: &dyn ReferenceResolver,
        context: PartId,
        max_depth: usize,
    ) -> Result<Self, AnimationError> {
        let target = resolver.find_child(&entry.key.target, Some(context))?;
        let (channel, axis) = parse_channel_variable(&entry.key.variable)
            .ok_or_else(|| AnimationError::Variable(entry.key.variable.clone()))?;
        let expression =
            CompiledExpression::compile_with_limit(&entry.expression, resolver, Some(target), max_depth)?;
        Ok(Self::new(target, expression, channel, axis))
    }

    pub fn target(&self) -> PartId {
        self.target
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.expression
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    /// Evaluate and overwrite the target's channel/axis.
    pub fn apply(&self, pose: &PoseInputs<'_>, parts: &mut PartArena) {
        let value = self.expression.evaluate(pose, parts);
        parts[self.target].set_channel(self.channel, self.axis, value);
    }
}

impl fmt::Display for AnimationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{}.{}{} = {}",
            self.target.index(),
            self.channel.as_char(),
            self.axis.as_char(),
            self.expression.source()
        )
    }
}
