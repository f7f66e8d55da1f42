//! mbd-core: stable foundation for the mbdsim workspace.
//!
//! Contains:
//! - ids (compact base ids for model database objects)
//! - parts (FE part descriptors and the stress-recovery tri-state)
//! - status (run outcome codes shared by orchestrator and front ends)

pub mod ids;
pub mod parts;
pub mod status;

// Re-exports: nice ergonomics for downstream crates
pub use ids::BaseId;
pub use parts::{FemPart, RecoveryLevel, VisPart};
pub use status::*;
