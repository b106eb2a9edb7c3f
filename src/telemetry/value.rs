use std::{
    cmp::Ordering,
    ops::{Add, Div, Mul, Sub},
};

use serde::{Deserialize, Serialize};

/// A query result value. Lists come from array telemetry fields (one entry per car,
/// per tire, ...) and combine element-wise with each other and broadcast with scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    List(Vec<f64>),
}

impl Value {
    pub const ZERO: Value = Value::Scalar(0.0);

    /// Weak ordering: only two scalars are ever ordered, anything involving a list
    /// compares as equal.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::List(_) => None,
        }
    }

    /// Both scalars, or lists of the same length.
    pub fn same_shape(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Scalar(_), Value::Scalar(_)) => true,
            (Value::List(a), Value::List(b)) => a.len() == b.len(),
            _ => false,
        }
    }

    pub fn scale(&self, factor: f64) -> Value {
        self.combine(&Value::Scalar(factor), |a, b| a * b)
    }

    // Mismatched list lengths combine over the shorter one.
    fn combine(&self, other: &Value, op: impl Fn(f64, f64) -> f64) -> Value {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(op(*a, *b)),
            (Value::Scalar(a), Value::List(b)) => Value::List(b.iter().map(|b| op(*a, *b)).collect()),
            (Value::List(a), Value::Scalar(b)) => Value::List(a.iter().map(|a| op(*a, *b)).collect()),
            (Value::List(a), Value::List(b)) => {
                Value::List(a.iter().zip(b).map(|(a, b)| op(*a, *b)).collect())
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::ZERO
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::List(value)
    }
}

macro_rules! impl_value_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Value> for &Value {
            type Output = Value;

            fn $method(self, rhs: &Value) -> Value {
                self.combine(rhs, |a, b| a $op b)
            }
        }

        impl $trait for Value {
            type Output = Value;

            fn $method(self, rhs: Value) -> Value {
                self.combine(&rhs, |a, b| a $op b)
            }
        }
    };
}

impl_value_op!(Add, add, +);
impl_value_op!(Sub, sub, -);
impl_value_op!(Mul, mul, *);
impl_value_op!(Div, div, /);
