use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::Serialize;

use crate::{LapQueryError, telemetry::ResultPoint};

/// One line of output: the query text next to its result point.
#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    #[serde(flatten)]
    point: &'a ResultPoint,
}

/// Writes query results as JSON Lines.
pub struct ResultWriter<W: Write> {
    writer: BufWriter<W>,
}

impl ResultWriter<File> {
    pub fn create(path: &Path) -> Result<Self, LapQueryError> {
        let file = File::create(path).map_err(|e| LapQueryError::WriterError { source: e })?;
        Ok(Self::new(file))
    }
}

impl<W: Write> ResultWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    pub fn write(&mut self, query: &str, point: &ResultPoint) -> Result<(), LapQueryError> {
        serde_json::to_writer(&mut self.writer, &QueryOutput { query, point })
            .map_err(|e| LapQueryError::WriterError { source: e.into() })?;
        writeln!(self.writer).map_err(|e| LapQueryError::WriterError { source: e })
    }

    pub fn flush(&mut self) -> Result<(), LapQueryError> {
        self.writer
            .flush()
            .map_err(|e| LapQueryError::WriterError { source: e })
    }

    pub fn into_inner(self) -> Result<W, LapQueryError> {
        self.writer
            .into_inner()
            .map_err(|e| LapQueryError::WriterError {
                source: e.into_error(),
            })
    }
}
