// Error types for lapquery

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum LapQueryError {
    // Query syntax errors, raised when a query is registered
    #[snafu(display("Query is empty"))]
    EmptyQuery,
    #[snafu(display("Illegal character '{character}' at position {position}"))]
    IllegalCharacter { character: char, position: usize },
    #[snafu(display("Parenthesis opened at position {position} is never closed"))]
    UnclosedParenthesis { position: usize },
    #[snafu(display("Closing parenthesis at position {position} has no matching opening one"))]
    UnexpectedClosingParenthesis { position: usize },
    #[snafu(display("'{literal}' looks like a number but is not a valid integer literal"))]
    MalformedNumber { literal: String },
    #[snafu(display("Unexpected '{found}' at position {position}"))]
    UnexpectedToken { found: String, position: usize },
    #[snafu(display("Query ends where an expression was expected"))]
    UnexpectedEnd,

    // Query compilation errors
    #[snafu(display("Unknown function {name}"))]
    UnknownFunction { name: String },
    #[snafu(display("{function} takes {expected} argument(s), found {found}"))]
    WrongArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("The window size of {function} must be a number literal"))]
    WindowNotConstant { function: String },
    #[snafu(display("The window size of {function} must be at least one lap, found {laps}"))]
    InvalidWindow { function: String, laps: i64 },

    // Variable resolver errors
    #[snafu(display("Variable {name} not found"))]
    VariableNotFound { name: String },
    #[snafu(display("Field {name} is defined more than once in the telemetry schema"))]
    DuplicateField { name: String },
    #[snafu(display("Error loading telemetry schema file"))]
    SchemaLoadError { source: io::Error },
    #[snafu(display("Error parsing telemetry schema file"))]
    SchemaParseError { source: serde_json::Error },

    // Sample source errors
    #[snafu(display("Error reading telemetry samples"))]
    SampleReadError { source: io::Error },
    #[snafu(display("Could not parse telemetry sample: {description}"))]
    SampleParseError { description: String },
    #[snafu(display("No more telemetry samples"))]
    EndOfSamples,

    // Errors for the result writer
    #[snafu(display("Error writing query results"))]
    WriterError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Error parsing config file"))]
    ConfigParseError { source: serde_json::Error },
}
