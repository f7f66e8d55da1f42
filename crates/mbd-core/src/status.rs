//! Run outcome codes.
//!
//! A full run reports a single integer status: zero for success, a
//! distinct negative value for each failure stage. Solver-init and
//! step-loop failures carry the engine's own negative code through
//! unchanged, so only the orchestrator-detected stages get values here.

/// Successful run, or no-op when no model file was given.
pub const OK: i32 = 0;

/// The model file could not be opened or read.
pub const OPEN_FAILED: i32 = -97;

/// FE part reduction failed for some part.
pub const REDUCTION_FAILED: i32 = -98;

/// The database could not materialize a run directory with solver input.
pub const INPUT_WRITE_FAILED: i32 = -99;
