pub mod decreasing_sum;
pub mod lap_average;
pub mod lap_delta;
pub(crate) mod window;

pub use decreasing_sum::DecreasingSumProcessor;
pub use lap_average::LapAverageProcessor;
pub use lap_delta::LapDeltaProcessor;

use crate::query::BinaryOperator;
use crate::telemetry::{Extractor, ResultPoint, Sample, Value};

/// Initial allocation of window buffers, roughly one lap at 60Hz. Windows grow past it
/// whenever their distance span needs more samples.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// A compiled query node.
///
/// A processor tree belongs to exactly one consumer. `process` is called once per sample,
/// in non-decreasing driver distance order, and always produces exactly one result point;
/// once compiled, a tree never fails. Trees are `Send` so a consumer can move one to another
/// thread, but they hold unsynchronized state and must not be shared.
pub trait Processor: Send {
    fn process(&mut self, sample: &Sample) -> ResultPoint;

    /// Driver distance that must have been observed before the output is meaningful.
    fn required_lookback(&self) -> f32;
}

pub struct ConstantProcessor {
    value: Value,
}

impl ConstantProcessor {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Processor for ConstantProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        ResultPoint::at(sample, self.value.clone())
    }

    fn required_lookback(&self) -> f32 {
        0.
    }
}

pub struct VariableProcessor {
    extractor: Extractor,
}

impl VariableProcessor {
    pub fn new(extractor: Extractor) -> Self {
        Self { extractor }
    }
}

impl Processor for VariableProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        ResultPoint::at(sample, (self.extractor)(sample))
    }

    fn required_lookback(&self) -> f32 {
        0.
    }
}

pub struct ArithmeticProcessor {
    operator: BinaryOperator,
    lhs: Box<dyn Processor>,
    rhs: Box<dyn Processor>,
    required_lookback: f32,
}

impl ArithmeticProcessor {
    pub fn new(operator: BinaryOperator, lhs: Box<dyn Processor>, rhs: Box<dyn Processor>) -> Self {
        let required_lookback = lhs.required_lookback().max(rhs.required_lookback());
        Self {
            operator,
            lhs,
            rhs,
            required_lookback,
        }
    }
}

impl Processor for ArithmeticProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        let lhs = self.lhs.process(sample);
        let rhs = self.rhs.process(sample);
        ResultPoint::at(sample, self.operator.apply(&lhs.value, &rhs.value))
    }

    fn required_lookback(&self) -> f32 {
        self.required_lookback
    }
}

/// Linear interpolation of the value at `target` between two points with
/// `p1.driver_distance <= target <= p2.driver_distance`. Points at the same distance
/// yield the value of `p2`.
pub(crate) fn interpolate(p1: &ResultPoint, p2: &ResultPoint, target: f32) -> Value {
    let span = p2.driver_distance - p1.driver_distance;
    if span <= 0. {
        return p2.value.clone();
    }
    let w1 = ((p2.driver_distance - target) / span) as f64;
    &p1.value.scale(w1) + &p2.value.scale(1. - w1)
}
