//! The closed operator enumeration and its dispatch table.
//!
//! Every operation code maps to exactly one [`Operator`], and every operator has
//! exactly one [`OperatorDef`] in [`OPERATOR_TABLE`], indexed by the operator's
//! code. Non-terminal operators carry two pure functions:
//!
//! - a forward function computing the value from the operand values, failing
//!   with a short reason when the operation is undefined at those operands
//! - a partials function computing the local derivatives of the result with
//!   respect to each operand, given the operand values and the result
//!
//! The evaluator combines the local partials with the operand tangents via the
//! chain rule, so forward-mode differentiation never needs to know which
//! operator it is running.

use std::fmt;

pub(crate) mod arithmetic;
pub(crate) mod exp;
pub(crate) mod ln;
pub(crate) mod pow;
pub(crate) mod sqrt;
pub(crate) mod trigonometric;

/// Result of a forward function: the value, or the reason it is undefined.
pub type DomainResult = Result<f64, &'static str>;

/// Forward function of a unary operator.
pub type UnaryForward = fn(f64) -> DomainResult;
/// Local partial `∂r/∂a` of a unary operator, given `a` and the result `r`.
pub type UnaryPartial = fn(f64, f64) -> f64;
/// Forward function of a binary operator.
pub type BinaryForward = fn(f64, f64) -> DomainResult;
/// Local partials `(∂r/∂a, ∂r/∂b)` of a binary operator, given `a`, `b` and `r`.
pub type BinaryPartials = fn(f64, f64, f64) -> (f64, f64);

/// Operators that can appear in a program.
///
/// The discriminant of each variant is its operation code.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// Load a column of the input table
    Variable = 0,
    /// Load an entry of the constants vector
    Constant = 1,
    Add = 2,
    Subtract = 3,
    Multiply = 4,
    Divide = 5,
    Sin = 6,
    Cos = 7,
    Exp = 8,
    /// Natural logarithm of the absolute value
    Log = 9,
    /// Real power `a^b`
    Power = 10,
    Abs = 11,
    /// Square root of the absolute value
    Sqrt = 12,
    /// Power of the absolute value `|a|^b`
    SafePower = 13,
    Negate = 14,
}

/// Number of operands an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Leaf load; the single operand indexes the table or the constants
    Terminal,
    /// One operand referring to an earlier instruction
    Unary,
    /// Two operands referring to earlier instructions
    Binary,
}

impl Arity {
    /// Number of operands an instruction of this arity carries.
    pub fn operand_count(self) -> usize {
        match self {
            Arity::Terminal | Arity::Unary => 1,
            Arity::Binary => 2,
        }
    }
}

impl Operator {
    /// Number of operators in the enumeration.
    pub const COUNT: usize = 15;

    /// All operators, ordered by operation code.
    pub const ALL: [Operator; Operator::COUNT] = [
        Operator::Variable,
        Operator::Constant,
        Operator::Add,
        Operator::Subtract,
        Operator::Multiply,
        Operator::Divide,
        Operator::Sin,
        Operator::Cos,
        Operator::Exp,
        Operator::Log,
        Operator::Power,
        Operator::Abs,
        Operator::Sqrt,
        Operator::SafePower,
        Operator::Negate,
    ];

    /// Returns the operation code of this operator.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Looks up the operator for an operation code.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    /// Returns the arity of this operator.
    pub fn arity(self) -> Arity {
        match self {
            Operator::Variable | Operator::Constant => Arity::Terminal,
            Operator::Add
            | Operator::Subtract
            | Operator::Multiply
            | Operator::Divide
            | Operator::Power
            | Operator::SafePower => Arity::Binary,
            Operator::Sin
            | Operator::Cos
            | Operator::Exp
            | Operator::Log
            | Operator::Abs
            | Operator::Sqrt
            | Operator::Negate => Arity::Unary,
        }
    }

    /// Returns true for leaf loads.
    pub fn is_terminal(self) -> bool {
        self.arity() == Arity::Terminal
    }

    /// Returns the lowercase name of this operator.
    pub fn name(self) -> &'static str {
        match self {
            Operator::Variable => "load",
            Operator::Constant => "constant",
            Operator::Add => "add",
            Operator::Subtract => "subtract",
            Operator::Multiply => "multiply",
            Operator::Divide => "divide",
            Operator::Sin => "sin",
            Operator::Cos => "cos",
            Operator::Exp => "exp",
            Operator::Log => "log",
            Operator::Power => "power",
            Operator::Abs => "abs",
            Operator::Sqrt => "sqrt",
            Operator::SafePower => "safe power",
            Operator::Negate => "negate",
        }
    }

    /// Returns the dispatch table entry of this operator.
    pub fn definition(self) -> &'static OperatorDef {
        &OPERATOR_TABLE[self as usize]
    }
}

impl TryFrom<i32> for Operator {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Operator::from_code(code).ok_or(code)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an operator produces its value and derivative.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Load `table[row][operand]`
    LoadColumn,
    /// Load `constants[operand]`
    LoadConstant,
    Unary {
        forward: UnaryForward,
        partial: Option<UnaryPartial>,
    },
    Binary {
        forward: BinaryForward,
        partials: Option<BinaryPartials>,
    },
}

/// One entry of the operator dispatch table.
#[derive(Debug, Clone, Copy)]
pub struct OperatorDef {
    pub operator: Operator,
    pub rule: Rule,
}

impl OperatorDef {
    /// Returns true if the entry can be differentiated.
    pub fn is_differentiable(&self) -> bool {
        match self.rule {
            Rule::LoadColumn | Rule::LoadConstant => true,
            Rule::Unary { partial, .. } => partial.is_some(),
            Rule::Binary { partials, .. } => partials.is_some(),
        }
    }
}

const fn unary(operator: Operator, forward: UnaryForward, partial: UnaryPartial) -> OperatorDef {
    OperatorDef {
        operator,
        rule: Rule::Unary {
            forward,
            partial: Some(partial),
        },
    }
}

const fn binary(
    operator: Operator,
    forward: BinaryForward,
    partials: BinaryPartials,
) -> OperatorDef {
    OperatorDef {
        operator,
        rule: Rule::Binary {
            forward,
            partials: Some(partials),
        },
    }
}

/// Dispatch table indexed by operation code.
pub static OPERATOR_TABLE: [OperatorDef; Operator::COUNT] = [
    OperatorDef {
        operator: Operator::Variable,
        rule: Rule::LoadColumn,
    },
    OperatorDef {
        operator: Operator::Constant,
        rule: Rule::LoadConstant,
    },
    binary(Operator::Add, arithmetic::add, arithmetic::add_partials),
    binary(
        Operator::Subtract,
        arithmetic::subtract,
        arithmetic::subtract_partials,
    ),
    binary(
        Operator::Multiply,
        arithmetic::multiply,
        arithmetic::multiply_partials,
    ),
    binary(Operator::Divide, arithmetic::divide, arithmetic::divide_partials),
    unary(Operator::Sin, trigonometric::sin, trigonometric::sin_partial),
    unary(Operator::Cos, trigonometric::cos, trigonometric::cos_partial),
    unary(Operator::Exp, exp::exp, exp::exp_partial),
    unary(Operator::Log, ln::log, ln::log_partial),
    binary(Operator::Power, pow::power, pow::power_partials),
    unary(Operator::Abs, arithmetic::abs, arithmetic::abs_partial),
    unary(Operator::Sqrt, sqrt::sqrt, sqrt::sqrt_partial),
    binary(Operator::SafePower, pow::safe_power, pow::safe_power_partials),
    unary(Operator::Negate, arithmetic::negate, arithmetic::negate_partial),
];

/// Sign of `a`, with `sign(0) == 0` and NaN passed through.
pub(crate) fn sign(a: f64) -> f64 {
    if a > 0.0 {
        1.0
    } else if a < 0.0 {
        -1.0
    } else if a == 0.0 {
        0.0
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_code() {
        for (index, def) in OPERATOR_TABLE.iter().enumerate() {
            assert_eq!(def.operator.code() as usize, index);
            assert_eq!(Operator::from_code(index as i32), Some(def.operator));
        }
    }

    #[test]
    fn test_table_is_complete() {
        for op in Operator::ALL {
            let def = op.definition();
            assert!(def.is_differentiable(), "{op} has no derivative rule");
            match (op.arity(), def.rule) {
                (Arity::Terminal, Rule::LoadColumn | Rule::LoadConstant) => {}
                (Arity::Unary, Rule::Unary { .. }) => {}
                (Arity::Binary, Rule::Binary { .. }) => {}
                (arity, rule) => panic!("{op}: arity {arity:?} does not match rule {rule:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(Operator::from_code(-1), None);
        assert_eq!(Operator::from_code(15), None);
        assert_eq!(Operator::try_from(99), Err(99));
        assert_eq!(Operator::try_from(5), Ok(Operator::Divide));
    }

    #[test]
    fn test_arity() {
        assert_eq!(Operator::Variable.arity().operand_count(), 1);
        assert_eq!(Operator::Sin.arity().operand_count(), 1);
        assert_eq!(Operator::Divide.arity().operand_count(), 2);
        assert!(Operator::Constant.is_terminal());
        assert!(!Operator::Negate.is_terminal());
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(3.0), 1.0);
        assert_eq!(sign(-0.5), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert!(sign(f64::NAN).is_nan());
    }
}
