// Library interface for lapquery
// The command line consumer and the integration tests are both built on top of it

pub mod config;
pub mod errors;
pub mod processor;
pub mod query;
pub mod session;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use config::EngineConfig;
pub use errors::LapQueryError;
pub use processor::Processor;
pub use query::{CompiledQuery, Compiler, Expression, compile, compile_query, parse};
pub use session::{QuerySet, ResultThrottle};
pub use telemetry::{ResultPoint, Sample, SampleSource, TelemetrySchema, Value, VariableResolver};
pub use writer::ResultWriter;
