//! Error types for engine construction and configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring or constructing engines.
///
/// Engine *call* outcomes are not errors at this level: the trait methods
/// return the native status codes and flags unchanged, and the orchestrator
/// owns the policy for them.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Environment variable {name} not defined")]
    MissingConfig { name: &'static str },

    #[error("Failed to read scenario file: {path}")]
    ScenarioRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario file {path}: {source}")]
    ScenarioParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Exporter error: {what}")]
    Exporter { what: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
