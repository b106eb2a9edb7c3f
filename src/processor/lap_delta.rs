use crate::telemetry::{ResultPoint, Sample, Value};

use super::{Processor, window::DistanceWindow};

/// Change of the child value over exactly one lap: the value one lap ago minus the
/// current value, so a falling fuel level reads as positive consumption.
pub struct LapDeltaProcessor {
    child: Box<dyn Processor>,
    window: DistanceWindow,
    required_lookback: f32,
}

impl LapDeltaProcessor {
    const LAPS: f32 = 1.;

    pub fn new(child: Box<dyn Processor>, buffer_capacity: usize) -> Self {
        let required_lookback = Self::LAPS + child.required_lookback();
        Self {
            child,
            window: DistanceWindow::new(Self::LAPS, buffer_capacity),
            required_lookback,
        }
    }
}

impl Processor for LapDeltaProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        let current = self.child.process(sample);
        let value = match self.window.advance(current.clone(), |_| {}) {
            Some(lap_ago) => &lap_ago - &current.value,
            None => Value::ZERO,
        };
        ResultPoint::at(sample, value)
    }

    fn required_lookback(&self) -> f32 {
        self.required_lookback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::tests::{sample, value_processor};

    #[test]
    fn test_required_lookback() {
        let processor = LapDeltaProcessor::new(value_processor(), 16);
        assert_eq!(processor.required_lookback(), 1.);

        let nested = LapDeltaProcessor::new(Box::new(processor), 16);
        assert_eq!(nested.required_lookback(), 2.);
    }

    #[test]
    fn test_single_sample_warms_up() {
        let mut processor = LapDeltaProcessor::new(value_processor(), 16);
        let result = processor.process(&sample(5., 75.));
        assert_eq!(result.value, Value::Scalar(0.));
    }

    #[test]
    fn test_value_one_lap_ago_minus_current() {
        let mut processor = LapDeltaProcessor::new(value_processor(), 16);
        processor.process(&sample(5., 75.));
        processor.process(&sample(5.0001, 71.));
        let result = processor.process(&sample(6., 71.));

        let delta = result.value.as_scalar().unwrap();
        assert!((delta - 4.).abs() < 0.001, "delta was {}", delta);
    }

    #[test]
    fn test_interpolates_between_samples() {
        let mut processor = LapDeltaProcessor::new(value_processor(), 16);
        processor.process(&sample(0., 100.));
        processor.process(&sample(1., 90.));
        // one lap before 1.5 sits halfway between 100 and 90
        let result = processor.process(&sample(1.5, 80.));
        assert_eq!(result.value, Value::Scalar(15.));
    }

    #[test]
    fn test_emits_one_point_per_sample() {
        let mut processor = LapDeltaProcessor::new(value_processor(), 16);
        for i in 0..50 {
            let s = sample(i as f32 * 0.1, 100. - i as f64);
            let result = processor.process(&s);
            assert_eq!(result.driver_distance, s.driver_distance);
            assert_eq!(result.session_time, s.session_time);
        }
    }
}
