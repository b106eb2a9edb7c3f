use std::{cmp::Ordering, collections::VecDeque};

use crate::telemetry::{ResultPoint, Sample, Value};

use super::{Processor, interpolate};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Increasing,
    Decreasing,
}

/// Contiguous child outputs that never change direction. Equal values extend a run either
/// way; the direction is fixed by the first value that differs from its predecessor.
struct MonotonicRun {
    points: VecDeque<ResultPoint>,
    direction: Option<Direction>,
}

impl MonotonicRun {
    fn starting_at(point: ResultPoint) -> Self {
        Self {
            points: VecDeque::from([point]),
            direction: None,
        }
    }

    fn last(&self) -> Option<&ResultPoint> {
        self.points.back()
    }

    /// Appends `point` if it keeps the run monotonic, otherwise hands it back.
    fn extend(&mut self, point: ResultPoint) -> Result<(), ResultPoint> {
        let Some(last) = self.points.back() else {
            self.points.push_back(point);
            return Ok(());
        };
        let ordering = point.value.compare(&last.value);
        match (self.direction, ordering) {
            (_, Ordering::Equal) => {}
            (None, Ordering::Less) => self.direction = Some(Direction::Decreasing),
            (None, Ordering::Greater) => self.direction = Some(Direction::Increasing),
            (Some(Direction::Decreasing), Ordering::Less)
            | (Some(Direction::Increasing), Ordering::Greater) => {}
            _ => return Err(point),
        }
        self.points.push_back(point);
        Ok(())
    }

    /// Drop from `first` to the end of the run; only decreasing runs drop.
    fn drop_from(&self, first: &Value) -> Value {
        match (self.direction, self.points.back()) {
            (Some(Direction::Decreasing), Some(last)) => first - &last.value,
            _ => Value::ZERO,
        }
    }

    fn total_drop(&self) -> Value {
        match self.points.front() {
            Some(first) => self.drop_from(&first.value),
            None => Value::ZERO,
        }
    }
}

/// Sum of every decrease of the child over the last `laps` laps, ignoring increases.
/// Over a fuel level this is the fuel burnt in the window, with refuels left out.
pub struct DecreasingSumProcessor {
    child: Box<dyn Processor>,
    laps: f32,
    runs: VecDeque<MonotonicRun>,
    // drops of every run strictly between the oldest and the newest
    settled: Value,
    required_lookback: f32,
}

impl DecreasingSumProcessor {
    pub fn new(child: Box<dyn Processor>, laps: u32, buffer_capacity: usize) -> Self {
        let required_lookback = laps as f32 + child.required_lookback();
        Self {
            child,
            laps: laps as f32,
            runs: VecDeque::with_capacity(buffer_capacity.min(64)),
            settled: Value::ZERO,
            required_lookback,
        }
    }

    fn push(&mut self, point: ResultPoint) {
        let Some(newest) = self.runs.back_mut() else {
            self.runs.push_back(MonotonicRun::starting_at(point));
            return;
        };
        let Err(point) = newest.extend(point) else {
            return;
        };

        // the turning point opens the next run so the drop across it is not lost
        let Some(turning_point) = newest.last().cloned() else {
            return;
        };
        if self.runs.len() >= 2 {
            if let Some(closed) = self.runs.back() {
                self.settled = &self.settled + &closed.total_drop();
            }
        }
        let mut run = MonotonicRun::starting_at(turning_point);
        let extended = run.extend(point);
        debug_assert!(extended.is_ok());
        self.runs.push_back(run);
    }

    fn trim(&mut self, target: f32) {
        while let Some(oldest) = self.runs.front_mut() {
            if oldest.points.len() >= 2 && oldest.points[1].driver_distance <= target {
                oldest.points.pop_front();
            } else if oldest.points.len() < 2 && self.runs.len() > 1 {
                self.runs.pop_front();
                if self.runs.len() > 1 {
                    if let Some(promoted) = self.runs.front() {
                        self.settled = &self.settled - &promoted.total_drop();
                    }
                }
            } else {
                break;
            }
        }
    }

    fn window_drop(&self, target: f32) -> Option<Value> {
        let oldest = self.runs.front()?;
        let anchor = oldest.points.front()?;
        if anchor.driver_distance > target {
            return None;
        }
        let boundary = match oldest.points.get(1) {
            Some(next) => interpolate(anchor, next, target),
            None => anchor.value.clone(),
        };

        let mut total = oldest.drop_from(&boundary);
        if self.runs.len() > 1 {
            total = &total + &self.settled;
            if let Some(newest) = self.runs.back() {
                total = &total + &newest.total_drop();
            }
        }
        Some(total)
    }
}

impl Processor for DecreasingSumProcessor {
    fn process(&mut self, sample: &Sample) -> ResultPoint {
        let current = self.child.process(sample);
        let target = current.driver_distance - self.laps;

        self.push(current);
        self.trim(target);

        ResultPoint::at(sample, self.window_drop(target).unwrap_or(Value::ZERO))
    }

    fn required_lookback(&self) -> f32 {
        self.required_lookback
    }
}
