use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::mpsc::Receiver,
};

use log::info;
use serde_jsonlines::JsonLinesReader;

use crate::LapQueryError;

use super::Sample;

/// An ordered supply of telemetry samples.
///
/// Implementations hand out samples in the order the ingestion layer delivered them, which
/// is non-decreasing in driver distance. Filtering anomalies and reordering happen upstream.
///
/// # Errors
///
/// `next_sample` returns [`LapQueryError::EndOfSamples`] once the source is exhausted, and
/// read or parse errors for broken input.
pub trait SampleSource {
    fn next_sample(&mut self) -> Result<Sample, LapQueryError>;
}

/// Replays samples held in memory, mostly for tests and benchmarks.
#[derive(Default)]
pub struct MemorySampleSource {
    cur_tick: usize,
    samples: Vec<Sample>,
}

impl MemorySampleSource {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self {
            cur_tick: 0,
            samples,
        }
    }
}

impl SampleSource for MemorySampleSource {
    fn next_sample(&mut self) -> Result<Sample, LapQueryError> {
        let sample = self
            .samples
            .get(self.cur_tick)
            .cloned()
            .ok_or(LapQueryError::EndOfSamples)?;
        self.cur_tick += 1;
        Ok(sample)
    }
}

/// Reads one JSON encoded [`Sample`] per line.
pub struct JsonLinesSampleSource<R: BufRead> {
    reader: JsonLinesReader<R>,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSampleSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: JsonLinesReader::new(reader),
            line_no: 0,
        }
    }
}

impl JsonLinesSampleSource<BufReader<File>> {
    pub fn from_file(path: &Path) -> Result<Self, LapQueryError> {
        let file = File::open(path).map_err(|e| LapQueryError::SampleReadError { source: e })?;
        info!("Reading telemetry samples from {:?}", path);
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSampleSource<R> {
    /// Consumes blank lines ahead of the next sample, keeping the line count.
    fn skip_blank_lines(&mut self) -> io::Result<()> {
        let reader = self.reader.get_mut();
        loop {
            let buf = reader.fill_buf()?;
            if buf.is_empty() {
                return Ok(());
            }
            let blank = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            self.line_no += buf[..blank].iter().filter(|b| **b == b'\n').count();
            let found_sample = blank < buf.len();
            reader.consume(blank);
            if found_sample {
                return Ok(());
            }
        }
    }
}

impl<R: BufRead> SampleSource for JsonLinesSampleSource<R> {
    fn next_sample(&mut self) -> Result<Sample, LapQueryError> {
        self.skip_blank_lines()
            .map_err(|e| LapQueryError::SampleReadError { source: e })?;
        self.line_no += 1;
        match self.reader.read::<Sample>() {
            Ok(Some(sample)) => Ok(sample),
            Ok(None) => Err(LapQueryError::EndOfSamples),
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(LapQueryError::SampleParseError {
                    description: format!("line {}: {}", self.line_no, e),
                })
            }
            Err(e) => Err(LapQueryError::SampleReadError { source: e }),
        }
    }
}

/// Live samples handed over by another thread. The source ends when every sender is gone.
pub struct ChannelSampleSource {
    receiver: Receiver<Sample>,
}

impl ChannelSampleSource {
    pub fn new(receiver: Receiver<Sample>) -> Self {
        Self { receiver }
    }
}

impl SampleSource for ChannelSampleSource {
    fn next_sample(&mut self) -> Result<Sample, LapQueryError> {
        self.receiver
            .recv()
            .map_err(|_| LapQueryError::EndOfSamples)
    }
}
