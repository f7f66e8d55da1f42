//! Core traits for the external engine contracts.
//!
//! These mirror the native call interfaces one to one: boolean and integer
//! return values are the engines' own codes, passed through unchanged. The
//! orchestrator in `mbd-run` owns all policy about what a non-zero status
//! means and what happens next.

use crate::error::EngineResult;
use mbd_core::{BaseId, FemPart, RecoveryLevel, VisPart};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Object classes the model database can be queried for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectClass {
    Triad,
    Joint,
    Beam,
    FePart,
    /// All mechanism objects, regardless of class.
    All,
}

/// Optional restart vectors handed to the solver at init time.
#[derive(Clone, Debug, Default)]
pub struct RestartData {
    /// Complete state vector to restart the simulation from.
    pub state: Option<Vec<f64>>,
    /// Initial strain gauge values.
    pub gauges: Option<Vec<f64>>,
    /// Initial external function values, for initial equilibrium iterations.
    pub external_inputs: Option<Vec<f64>>,
}

/// The mechanism model database.
///
/// At most one model is open per handle; `open` on an already open handle
/// is engine-defined and not used by the orchestrator.
pub trait ModelDatabase: Send {
    /// Read a model file into the internal data structure.
    fn open(&mut self, path: &Path) -> bool;

    /// Release the open model. With `release_singletons` the heap-allocated
    /// singleton objects are released as well. Idempotent.
    fn close(&mut self, release_singletons: bool);

    /// Update the model file from current result files.
    fn save(&mut self) -> bool;

    /// Number of objects of the given class in the open model.
    fn count(&self, class: ObjectClass) -> usize;

    /// Base ids of all objects of the given class, in model enumeration order.
    fn objects(&self, class: ObjectClass) -> Vec<BaseId>;

    /// Tag of the external function on the given channel. `None` means the
    /// channel has no function at all; an empty string means the function
    /// exists but carries no tag.
    fn function_tag(&self, channel: usize) -> Option<String>;

    /// Write reducer input files for the given FE part. Returns the
    /// directory they were written to, or an empty path if the part is
    /// already reduced.
    fn write_reducer_input(&mut self, part: BaseId) -> PathBuf;

    /// Create the run database directory populated with solver input files.
    /// Returns the directory path, or an empty path on failure.
    fn write_solver_input(&mut self, keep_old_res: bool) -> PathBuf;

    /// FE data file and recovery setting of the given part.
    fn fe_model_file(&self, part: BaseId) -> (PathBuf, RecoveryLevel);

    /// Update the model's record of a part with its now-reduced data.
    fn sync_reduced_part(&mut self, part: BaseId);
}

/// The dynamics solver engine.
pub trait DynamicsSolver: Send {
    /// Initialize the solver process with assembled options and optional
    /// restart vectors. Zero or positive on success, negative on failure.
    fn init(&mut self, options: &[String], restart: &RestartData) -> i32;

    /// Advance to the next time step. Returns true while more steps remain.
    fn step_next(&mut self) -> bool;

    /// Current physical time of the simulation.
    fn current_time(&self) -> f64;

    /// Number of result quantities available for the current step.
    fn results_available(&self) -> usize;

    /// Size of the global transformation state array.
    fn transform_state_size(&self) -> usize;

    /// Size of the deformation state array for one recovered part,
    /// zero if the part has no deformation results.
    fn part_deformation_size(&self, part: BaseId) -> usize;

    /// Size of the stress state array for one recovered part.
    /// May be negative when stress output is disabled; callers clamp to 0.
    fn part_stress_size(&self, part: BaseId) -> i64;

    /// Copy the current global transformation state into `out`.
    fn read_transform_state(&self, out: &mut [f64]);

    /// Copy the current deformation and stress state of one part into the
    /// given buffers.
    fn read_part_state(&self, part: BaseId, deformation: &mut [f64], stress: &mut [f64]);

    /// Run the solver through the whole time series in one call,
    /// bypassing the step loop. Returns the final status.
    fn run_to_completion(&mut self, options: &[String]) -> i32;

    /// Last error code recorded by the engine, zero if none.
    fn last_error(&self) -> i32;

    /// Termination flag: zero for a clean finish.
    fn done(&self) -> i32;

    /// Assign a value to the external function on the given channel.
    fn set_external_input(&mut self, channel: usize, value: f64) -> bool;
}

/// The FE part reducer engine.
pub trait FeReducer: Send {
    /// Reduce one part with the given options. Zero on success.
    fn run(&mut self, options: &[String]) -> i32;
}

/// Factory for visualization export sessions.
pub trait VisExporter: Send {
    /// Open an export session and write the static geometry of all parts.
    fn open(
        &self,
        fem_parts: &[FemPart],
        vis_parts: &[VisPart],
        vtfx_file: &Path,
        casename: &str,
    ) -> EngineResult<Box<dyn ExportSession>>;
}

/// One open visualization export session.
pub trait ExportSession: Send {
    /// Append one animation frame. The buffers are only observed
    /// synchronously during the call; no ownership is transferred.
    fn write_step(
        &mut self,
        time: f64,
        transform: &[f64],
        deformations: &BTreeMap<BaseId, Vec<f64>>,
        stresses: &BTreeMap<BaseId, Vec<f64>>,
    );

    /// Finalize the session, applying frame-rate and fringe-range settings.
    fn close(&mut self, max_time_increment: f64, fringe_max: f64);
}

/// The full set of engine handles one orchestrator drives.
///
/// Reducer and exporter are optional: their absence gates FE reduction and
/// visualization export off without being an error.
pub struct EngineSet {
    pub model: Box<dyn ModelDatabase>,
    pub solver: Box<dyn DynamicsSolver>,
    pub reducer: Option<Box<dyn FeReducer>>,
    pub exporter: Option<Box<dyn VisExporter>>,
}
