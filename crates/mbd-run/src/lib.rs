//! Simulation lifecycle orchestration for mechanism models.
//!
//! The core of this crate is [`Orchestrator`]: the state machine that
//! sequences model-open, FE reduction, solver start, time stepping with
//! per-step visualization export, and model close with save/discard
//! semantics. The surrounding pieces are thin:
//! - option assembly for the reducer/solver engines ([`options`])
//! - log/result-file tailing for failure reports ([`diag`])
//! - the external-function tag map ([`funcmap`])
//! - the FE reduction coordinator ([`reduce`])
//! - the visualization export pipeline ([`export`])

pub mod diag;
pub mod export;
pub mod funcmap;
pub mod lifecycle;
pub mod options;
pub mod reduce;

// Re-exports for public API
pub use export::ExportPipeline;
pub use lifecycle::{CloseOutcome, LifecycleState, Orchestrator, SolveOptions, StartOptions};
pub use options::{REDUCER_NAME, SOLVER_NAME, engine_options};
pub use reduce::reduce_fe_parts;
