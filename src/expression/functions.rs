//! Built-in math functions

/// Largest arity of any built-in.
pub const MAX_ARGS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    ToRad,
    ToDeg,
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Frac,
    Min,
    Max,
    Clamp,
    Pow,
    Exp,
    Log,
    Signum,
    Lerp,
    If,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "atan2" => Self::Atan2,
            "torad" => Self::ToRad,
            "todeg" => Self::ToDeg,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "frac" => Self::Frac,
            "min" => Self::Min,
            "max" => Self::Max,
            "clamp" => Self::Clamp,
            "pow" => Self::Pow,
            "exp" => Self::Exp,
            "log" => Self::Log,
            "signum" => Self::Signum,
            "lerp" => Self::Lerp,
            "if" => Self::If,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::ToRad => "torad",
            Self::ToDeg => "todeg",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Frac => "frac",
            Self::Min => "min",
            Self::Max => "max",
            Self::Clamp => "clamp",
            Self::Pow => "pow",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Signum => "signum",
            Self::Lerp => "lerp",
            Self::If => "if",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Min | Self::Max | Self::Pow => 2,
            Self::Clamp | Self::Lerp | Self::If => 3,
            _ => 1,
        }
    }

    /// Apply to already-evaluated arguments; `args` holds at least
    /// [`arity`](Self::arity) values.
    pub fn apply(self, args: &[f32]) -> f32 {
        let a = args.first().copied().unwrap_or(0.0);
        let b = args.get(1).copied().unwrap_or(0.0);
        let c = args.get(2).copied().unwrap_or(0.0);
        match self {
            Self::Sin => a.sin(),
            Self::Cos => a.cos(),
            Self::Tan => a.tan(),
            Self::Asin => a.asin(),
            Self::Acos => a.acos(),
            Self::Atan => a.atan(),
            Self::Atan2 => a.atan2(b),
            Self::ToRad => a.to_radians(),
            Self::ToDeg => a.to_degrees(),
            Self::Sqrt => a.sqrt(),
            Self::Abs => a.abs(),
            Self::Floor => a.floor(),
            Self::Ceil => a.ceil(),
            Self::Round => a.round(),
            Self::Frac => a - a.floor(),
            Self::Min => a.min(b),
            Self::Max => a.max(b),
            // clamp(x, lo, hi); written out so lo > hi cannot panic
            Self::Clamp => a.max(b).min(c),
            Self::Pow => a.powf(b),
            Self::Exp => a.exp(),
            Self::Log => a.ln(),
            Self::Signum => {
                if a == 0.0 {
                    0.0
                } else {
                    a.signum()
                }
            }
            // lerp(k, from, to)
            Self::Lerp => b + a * (c - b),
            Self::If => {
                if a != 0.0 {
                    b
                } else {
                    c
                }
            }
        }
    }
}
