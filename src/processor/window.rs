use std::collections::VecDeque;

use crate::telemetry::{ResultPoint, Value};

use super::interpolate;

/// Child outputs covering the last `span` laps of driver distance.
///
/// The oldest buffered point is kept as the anchor: the newest point at or before the
/// window boundary. Everything older is evicted, so the buffer size follows the distance
/// span and never the sample rate.
pub(crate) struct DistanceWindow {
    points: VecDeque<ResultPoint>,
    span: f32,
}

impl DistanceWindow {
    pub(crate) fn new(span: f32, capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            span,
        }
    }

    /// Buffers `point`, hands evicted points to `evict` and returns the interpolated value
    /// at the window boundary, or `None` while the window is still warming up.
    pub(crate) fn advance(
        &mut self,
        point: ResultPoint,
        mut evict: impl FnMut(ResultPoint),
    ) -> Option<Value> {
        let target = point.driver_distance - self.span;
        self.points.push_back(point);

        while self.points.len() >= 2 && self.points[1].driver_distance <= target {
            if let Some(evicted) = self.points.pop_front() {
                evict(evicted);
            }
        }

        let anchor = self.points.front()?;
        if anchor.driver_distance > target {
            return None;
        }
        match self.points.get(1) {
            Some(next) => Some(interpolate(anchor, next, target)),
            None => Some(anchor.value.clone()),
        }
    }

    pub(crate) fn anchor(&self) -> Option<&ResultPoint> {
        self.points.front()
    }

    pub(crate) fn newest(&self) -> Option<&ResultPoint> {
        self.points.back()
    }

    pub(crate) fn len(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &Value> {
        self.points.iter().map(|p| &p.value)
    }
}
