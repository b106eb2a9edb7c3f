use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    LapQueryError,
    processor::DEFAULT_BUFFER_CAPACITY,
    telemetry::{TelemetrySchema, VariableResolver},
};

const CONFIG_DIR_NAME: &str = "lapquery";
const CONFIG_FILE_NAME: &str = "config.json";

/// Results per second and per query written by the command line consumer.
pub const DEFAULT_OUTPUT_RATE_HZ: f64 = 10.;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub buffer_capacity: usize,
    pub output_rate_hz: f64,
    /// Telemetry schema to use instead of the built-in one
    pub schema_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            output_rate_hz: DEFAULT_OUTPUT_RATE_HZ,
            schema_path: None,
        }
    }
}

impl EngineConfig {
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// The saved configuration, if there is a readable one.
    pub fn from_local_file() -> Option<Self> {
        let config_path = Self::default_path()?;
        if !config_path.exists() {
            return None;
        }
        Self::from_path(&config_path)
            .map_err(|e| warn!("Ignoring config file {:?}: {}", config_path, e))
            .ok()
    }

    pub fn from_path(path: &Path) -> Result<Self, LapQueryError> {
        let file =
            std::fs::File::open(path).map_err(|e| LapQueryError::ConfigIOError { source: e })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|e| LapQueryError::ConfigParseError { source: e })
    }

    pub fn save(&self) -> Result<(), LapQueryError> {
        let config_path = Self::default_path().ok_or(LapQueryError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), LapQueryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LapQueryError::ConfigIOError { source: e })?;
        }
        let file =
            std::fs::File::create(path).map_err(|e| LapQueryError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| LapQueryError::ConfigSerializeError { source: e })
    }

    pub fn schema(&self) -> Result<TelemetrySchema, LapQueryError> {
        match &self.schema_path {
            Some(path) => TelemetrySchema::from_file(path),
            None => Ok(TelemetrySchema::builtin()),
        }
    }

    pub fn resolver(&self) -> Result<VariableResolver, LapQueryError> {
        VariableResolver::new(&self.schema()?)
    }
}
