//! FE part descriptors and the stress-recovery tri-state.

use crate::ids::BaseId;
use std::path::{Path, PathBuf};

/// Stress-recovery setting of one model part, as reported by the database.
///
/// Encoded on the wire as an integer: negative for visualization-only
/// generic parts, zero for FE parts with recovery switched off, positive
/// for FE parts that get full deformation/stress recovery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecoveryLevel {
    /// Generic part carrying only a visualization file, never recovered.
    VisualizationOnly,
    /// FE part with stress recovery flagged off.
    Off,
    /// FE part with full deformation and stress recovery.
    Full,
}

impl RecoveryLevel {
    /// Decode the database's integer encoding.
    pub fn from_code(code: i32) -> Self {
        match code {
            c if c < 0 => RecoveryLevel::VisualizationOnly,
            0 => RecoveryLevel::Off,
            _ => RecoveryLevel::Full,
        }
    }

    pub fn is_fe_part(self) -> bool {
        !matches!(self, RecoveryLevel::VisualizationOnly)
    }

    pub fn recovers(self) -> bool {
        matches!(self, RecoveryLevel::Full)
    }
}

/// FE part geometry handed to the visualization exporter at open time.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FemPart {
    pub path: PathBuf,
    pub name: String,
    pub base_id: BaseId,
    pub recovery: bool,
}

/// Generic part with a visualization file only.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisPart {
    pub path: PathBuf,
    pub name: String,
    pub base_id: BaseId,
}

/// Derive a part/case name from a data file path: file stem without extension.
pub fn name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
