//! Engine configuration from the environment.
//!
//! | *MBD_MODEL_DB* = Path to the model database engine component
//! | *MBD_SOLVER* = Path to the dynamics solver engine component
//! | *MBD_REDUCER* = Path to the FE reducer engine component
//! | *MBD_VIS_EXPORTER* = Path to the visualization exporter component
//!
//! The first two are mandatory. The reducer entry is only needed if FE
//! model reduction is to be performed; the exporter entry only if a VTFx
//! file is to be exported. An absent optional entry gates the respective
//! feature off, it is never an error.

use crate::error::{EngineError, EngineResult};
use std::env;
use std::path::PathBuf;

pub const ENV_MODEL_DB: &str = "MBD_MODEL_DB";
pub const ENV_SOLVER: &str = "MBD_SOLVER";
pub const ENV_REDUCER: &str = "MBD_REDUCER";
pub const ENV_VIS_EXPORTER: &str = "MBD_VIS_EXPORTER";

/// Resolved locations of the engine components.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub model_db: PathBuf,
    pub solver: PathBuf,
    pub reducer: Option<PathBuf>,
    pub exporter: Option<PathBuf>,
}

impl EngineConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        let model_db = required(ENV_MODEL_DB)?;
        let solver = required(ENV_SOLVER)?;
        Ok(Self {
            model_db,
            solver,
            reducer: optional(ENV_REDUCER),
            exporter: optional(ENV_VIS_EXPORTER),
        })
    }
}

fn required(name: &'static str) -> EngineResult<PathBuf> {
    env::var_os(name)
        .map(PathBuf::from)
        .ok_or(EngineError::MissingConfig { name })
}

fn optional(name: &str) -> Option<PathBuf> {
    env::var_os(name).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_mandatory_entries_are_reported_by_name() {
        // Construct directly to avoid touching the process environment.
        let err = required("MBD_TEST_UNSET_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("MBD_TEST_UNSET_VARIABLE"));
    }
}
