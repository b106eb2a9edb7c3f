pub mod compiler;
pub mod parser;

use std::fmt;

pub use compiler::{CompiledQuery, Compiler, compile, compile_query};
pub use parser::parse;

use crate::{LapQueryError, telemetry::Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
        }
    }

    pub fn apply(&self, lhs: &Value, rhs: &Value) -> Value {
        match self {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Subtract => lhs - rhs,
            BinaryOperator::Multiply => lhs * rhs,
            BinaryOperator::Divide => lhs / rhs,
        }
    }
}

/// Parsed form of a query.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Variable(String),
    FunctionCall(String, Vec<Expression>),
    NumberLiteral(i64),
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Variable(name) => write!(f, "{name}"),
            Expression::NumberLiteral(n) => write!(f, "{n}"),
            Expression::FunctionCall(name, args) => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expression::Binary { operator, lhs, rhs } => {
                write!(f, "({lhs} {} {rhs})", operator.symbol())
            }
        }
    }
}

/// Windowing functions available in queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    /// `LAP_DELTA(expr)`
    LapDelta,
    /// `LAP_AVERAGE(expr, laps)`
    LapAverage,
    /// `DECREASING_SUM(expr, laps)`
    DecreasingSum,
}

impl Function {
    pub const ALL: [Function; 3] = [
        Function::LapDelta,
        Function::LapAverage,
        Function::DecreasingSum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::LapDelta => "LAP_DELTA",
            Function::LapAverage => "LAP_AVERAGE",
            Function::DecreasingSum => "DECREASING_SUM",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::LapDelta => 1,
            Function::LapAverage | Function::DecreasingSum => 2,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Looks up a function by name and checks the number of arguments it was called with.
    pub fn resolve(name: &str, argument_count: usize) -> Result<Self, LapQueryError> {
        let function = Self::from_name(name).ok_or_else(|| LapQueryError::UnknownFunction {
            name: name.to_string(),
        })?;
        if function.arity() != argument_count {
            return Err(LapQueryError::WrongArgumentCount {
                function: name.to_string(),
                expected: function.arity(),
                found: argument_count,
            });
        }
        Ok(function)
    }
}
