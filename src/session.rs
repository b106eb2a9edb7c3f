// Query sets registered by one consumer, and the consumer side result throttle

use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::{
    LapQueryError,
    query::{CompiledQuery, Compiler},
    telemetry::{ResultPoint, Sample, SampleSource, Value},
};

/// Every query registered by one consumer. All of them are driven by the same sample
/// sequence, first the historical replay and then the live tail.
pub struct QuerySet {
    queries: Vec<CompiledQuery>,
}

impl QuerySet {
    /// Compiles every query; a single failure rejects the whole registration.
    pub fn compile<S: AsRef<str>>(
        queries: &[S],
        compiler: &Compiler<'_>,
    ) -> Result<Self, LapQueryError> {
        let queries = queries
            .iter()
            .map(|q| compiler.compile_query(q.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn queries(&self) -> impl Iterator<Item = &CompiledQuery> {
        self.queries.iter()
    }

    /// Driver distance the replay has to cover before every query is warmed up.
    pub fn required_lookback(&self) -> f32 {
        self.queries
            .iter()
            .map(CompiledQuery::required_lookback)
            .fold(0., f32::max)
    }

    /// Earliest driver distance a historical replay must start from to have every query
    /// warmed up by `current_distance`.
    pub fn replay_start_distance(&self, current_distance: f32) -> f32 {
        (current_distance - self.required_lookback()).max(0.)
    }

    /// One result point per query, in registration order.
    pub fn process(&mut self, sample: &Sample) -> Vec<ResultPoint> {
        self.queries.iter_mut().map(|q| q.process(sample)).collect()
    }

    /// Feeds every remaining sample of `source` through the queries, handing each result
    /// to `emit` along with the index of its query. Returns the number of samples read.
    pub fn drain(
        &mut self,
        source: &mut impl SampleSource,
        emit: impl FnMut(usize, ResultPoint) -> Result<(), LapQueryError>,
    ) -> Result<usize, LapQueryError> {
        self.drain_until(source, &AtomicBool::new(false), emit)
    }

    /// Same as [`QuerySet::drain`], but stops before the next sample once `stop` is set.
    /// Every result of the samples already read has been handed to `emit` by then.
    pub fn drain_until(
        &mut self,
        source: &mut impl SampleSource,
        stop: &AtomicBool,
        mut emit: impl FnMut(usize, ResultPoint) -> Result<(), LapQueryError>,
    ) -> Result<usize, LapQueryError> {
        let mut samples = 0;
        loop {
            if stop.load(Ordering::Relaxed) {
                info!("Stopped after {} samples", samples);
                break;
            }
            let sample = match source.next_sample() {
                Ok(sample) => sample,
                Err(LapQueryError::EndOfSamples) => break,
                Err(e) => return Err(e),
            };
            for (index, point) in self.process(&sample).into_iter().enumerate() {
                emit(index, point)?;
            }
            samples += 1;
        }
        info!("Processed {} samples through {} queries", samples, self.len());
        Ok(samples)
    }
}

/// Down-samples results to a target rate and drops values equal to the last one emitted
/// for the same query. The engine itself emits a point for every sample.
pub struct ResultThrottle {
    min_interval_s: f64,
    last_emitted: Vec<Option<(f64, Value)>>,
}

impl ResultThrottle {
    /// A rate of zero or less only suppresses repeated values.
    pub fn new(rate_hz: f64, query_count: usize) -> Self {
        let min_interval_s = if rate_hz > 0. { 1. / rate_hz } else { 0. };
        Self {
            min_interval_s,
            last_emitted: vec![None; query_count],
        }
    }

    pub fn admit(&mut self, query: usize, point: &ResultPoint) -> bool {
        let Some(slot) = self.last_emitted.get_mut(query) else {
            return false;
        };
        if let Some((session_time, value)) = slot {
            if point.session_time - *session_time < self.min_interval_s || *value == point.value {
                return false;
            }
        }
        *slot = Some((point.session_time, point.value.clone()));
        true
    }
}
