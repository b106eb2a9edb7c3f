use crate::telemetry::{ResultPoint, Sample, Value};

use super::{Processor, window::DistanceWindow};

/// Evictions between two rebuilds of the running sum from the buffer.
const RESUM_INTERVAL: usize = 8192;

/// Rolling mean of the child over the last `laps` laps. The boundary of the window is
/// interpolated and counted as one extra sample so the mean does not step as the window
/// slides past a sample.
pub struct LapAverageProcessor {
    child: Box<dyn Processor>,
    window: DistanceWindow,
    // sum of every buffered value, anchor included
    sum: Value,
    evictions: usize,
    required_lookback: f32,
}

impl LapAverageProcessor {
    pub fn new(child: Box<dyn Processor>, laps: u32, buffer_capacity: usize) -> Self {
        let required_lookback = laps as f32 + child.required_lookback();
        Self {
            child,
            window: DistanceWindow::new(laps as f32, buffer_capacity),
            sum: Value::ZERO,
            evictions: 0,
            required_lookback,
        }
    }
}

impl Processor for LapAverageProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        let current = self.child.process(sample);
        self.sum = &self.sum + &current.value;

        let sum = &mut self.sum;
        let evictions = &mut self.evictions;
        let boundary = self.window.advance(current, |evicted| {
            *sum = &*sum - &evicted.value;
            *evictions += 1;
        });

        // a list of another length truncates the sum, which eviction alone cannot undo
        let reshaped = self
            .window
            .newest()
            .is_some_and(|newest| !newest.value.same_shape(&self.sum));
        if reshaped || self.evictions >= RESUM_INTERVAL {
            self.sum = self
                .window
                .values()
                .fold(Value::ZERO, |acc, value| &acc + value);
            self.evictions = 0;
        }

        let value = match (boundary, self.window.anchor()) {
            (Some(boundary), Some(anchor)) => {
                let inside = &self.sum - &anchor.value;
                (inside + boundary) / Value::Scalar(self.window.len() as f64)
            }
            _ => Value::ZERO,
        };
        ResultPoint::at(sample, value)
    }

    fn required_lookback(&self) -> f32 {
        self.required_lookback
    }
}
