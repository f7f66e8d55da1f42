//! Simulation lifecycle orchestration.
//!
//! The [`Orchestrator`] owns one set of engine handles and at most one open
//! model, and sequences a run through its states:
//!
//! `Idle → ModelOpen → FeReduced → SolverStarted → Stepping →
//! Closed(Saved|Discarded)`, with `ErrorExit` reachable from any non-idle
//! state.
//!
//! All engine calls are blocking and strictly sequenced; there is no
//! concurrency inside a run. Run outcomes are integer status codes: zero
//! for success, a distinct negative value per failure stage (see
//! [`mbd_core::status`]), with solver statuses passed through unchanged.

use crate::diag;
use crate::export::ExportPipeline;
use crate::funcmap::build_tag_map;
use crate::options::{SOLVER_NAME, engine_options};
use crate::reduce::reduce_fe_parts;
use mbd_core::status;
use mbd_engines::{EngineSet, ObjectClass, RestartData};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Lifecycle state of the orchestrator's model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    ModelOpen,
    FeReduced,
    SolverStarted,
    Stepping,
    Closed(CloseOutcome),
    ErrorExit,
}

/// How the model was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Saved,
    Discarded,
}

/// Options for [`Orchestrator::start`].
#[derive(Clone, Debug, Default)]
pub struct StartOptions {
    /// Do not overwrite an existing res-file in the RDB directory.
    pub keep_old_res: bool,
    /// Release the model from memory before solver start. The model file
    /// can then not be updated from this run's results.
    pub close_model: bool,
    /// Reduce unreduced FE parts before the solver is started.
    pub reduce_fem: bool,
    /// Restart vectors handed to the solver at init time.
    pub restart: RestartData,
    /// Start time of the simulation, overriding the model file setting.
    pub time_start: Option<f64>,
    /// Target path of the VTFx visualization output.
    pub vtfx_file: Option<PathBuf>,
}

/// Options for [`Orchestrator::solve_all`].
#[derive(Clone, Debug)]
pub struct SolveOptions {
    /// Update the model file from the new results when the solver finished.
    pub save_model: bool,
    pub reduce_fem: bool,
    pub vtfx_file: Option<PathBuf>,
    /// Max fringe range value for VTFx output; negative selects an
    /// automatic range.
    pub fringe_max: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            save_model: true,
            reduce_fem: false,
            vtfx_file: None,
            fringe_max: -1.0,
        }
    }
}

/// Drives one simulation run over a set of engine handles.
pub struct Orchestrator {
    engines: EngineSet,
    state: LifecycleState,
    func_map: BTreeMap<String, usize>,
    export: ExportPipeline,
}

impl Orchestrator {
    pub fn new(engines: EngineSet) -> Self {
        Self {
            engines,
            state: LifecycleState::Idle,
            func_map: BTreeMap::new(),
            export: ExportPipeline::default(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The external-function tags discovered at model start.
    pub fn function_tags(&self) -> impl Iterator<Item = &str> {
        self.func_map.keys().map(String::as_str)
    }

    /// Start a simulation on the specified model file.
    ///
    /// A `None` model file is a no-op returning 0. Otherwise each stage is
    /// gated on the previous one succeeding; on failure the model is closed
    /// forcibly, the relevant log or result file is reported, and a
    /// distinct negative status is returned. Solver-init failures return
    /// the engine's status unchanged.
    pub fn start(&mut self, model_file: Option<&Path>, opts: &StartOptions) -> i32 {
        let Some(model_file) = model_file else {
            return status::OK;
        };

        // Snapshot the companion log so only new lines show up on failure.
        let log_file = model_file.with_extension("log");
        let log_snapshot = diag::count_lines(&log_file);

        if !self.engines.model.open(model_file) {
            error!(
                "Failed to open model file {} in working directory {}",
                model_file.display(),
                std::env::current_dir()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default()
            );
            return self.error_exit(&log_file, log_snapshot, status::OPEN_FAILED);
        }
        self.state = LifecycleState::ModelOpen;

        info!("Model file {} successfully opened", model_file.display());
        info!("Number of Triads: {}", self.engines.model.count(ObjectClass::Triad));
        info!("Number of Joints: {}", self.engines.model.count(ObjectClass::Joint));
        info!("Number of Beams: {}", self.engines.model.count(ObjectClass::Beam));
        info!("Number of Parts: {}", self.engines.model.count(ObjectClass::FePart));
        info!(
            "Total number of mechanism objects: {}",
            self.engines.model.count(ObjectClass::All)
        );

        let num_reduced = reduce_fe_parts(
            self.engines.model.as_mut(),
            self.engines.reducer.as_deref_mut(),
            opts.reduce_fem,
        );
        if num_reduced < 0 {
            return self.error_exit(&log_file, log_snapshot, status::REDUCTION_FAILED);
        }
        if num_reduced > 0 {
            self.state = LifecycleState::FeReduced;
        }

        // None means no export session; Some (possibly empty) carries the
        // ids stress recovery will be performed for.
        let recovery_ids = self.export.open(
            self.engines.exporter.as_deref(),
            opts.vtfx_file.as_deref(),
            model_file,
            self.engines.model.as_ref(),
        );

        let rdb_dir = self.engines.model.write_solver_input(opts.keep_old_res);
        if rdb_dir.as_os_str().is_empty() {
            error!("Failed to write solver input");
            return self.error_exit(&log_file, log_snapshot, status::INPUT_WRITE_FAILED);
        }

        // The tag map is built against the now-fixed channel assignment.
        self.func_map = build_tag_map(self.engines.model.as_ref());

        if opts.close_model {
            self.close_model(num_reduced > 0, false, -1.0);
        }

        let has_recovery = recovery_ids.as_ref().is_some_and(|ids| !ids.is_empty());
        let solver_opts = engine_options(
            SOLVER_NAME,
            Some(&rdb_dir),
            opts.time_start,
            has_recovery,
        );
        let solver_status = self.engines.solver.init(&solver_opts, &opts.restart);
        if solver_status < 0 {
            if !opts.close_model {
                self.engines.model.close(true);
            }
            error!("Failed to start the dynamics solver");
            diag::report_result_file(&diag::result_file(&rdb_dir, SOLVER_NAME));
            self.state = LifecycleState::ErrorExit;
            return solver_status;
        }

        if let Some(ids) = recovery_ids {
            self.export
                .allocate_buffers(self.engines.solver.as_ref(), &ids);
        }

        self.state = LifecycleState::SolverStarted;
        solver_status
    }

    /// Start and run through a complete simulation on the specified model.
    ///
    /// Without a model file the solver runs directly on any option files in
    /// the working directory, or does nothing when there are none. Returns
    /// the terminal error code, zero for full success.
    pub fn solve_all(&mut self, model_file: Option<&Path>, opts: &SolveOptions) -> i32 {
        let Some(model_file) = model_file else {
            let solver_opts = engine_options(SOLVER_NAME, None, None, false);
            if solver_opts.is_empty() {
                return status::OK;
            }
            return self.engines.solver.run_to_completion(&solver_opts);
        };

        info!("Running dynamics solver on {}", model_file.display());
        let start_opts = StartOptions {
            keep_old_res: true,
            reduce_fem: opts.reduce_fem,
            vtfx_file: opts.vtfx_file.clone(),
            ..StartOptions::default()
        };
        let started = self.start(Some(model_file), &start_opts);
        if started < 0 {
            error!("Solver failed to start ({started})");
            return started;
        }

        // Run through the entire time series, exporting per completed step.
        self.state = LifecycleState::Stepping;
        while self.engines.solver.step_next() {
            self.export.export_step(self.engines.solver.as_ref());
        }

        // Abnormal termination is only detected after loop exit; the close
        // is then forced with singleton removal and nothing is saved.
        if self.engines.solver.done() == 0 && self.engines.solver.last_error() == 0 {
            info!("Time step loop OK, solver closed");
            self.close_model(opts.save_model, false, opts.fringe_max);
        } else {
            self.close_model(false, true, opts.fringe_max);
            error!("Dynamics solver failed {}", self.engines.solver.last_error());
        }

        self.engines.solver.last_error()
    }

    /// Close the currently open model.
    ///
    /// With `save` the model file is first updated from current result
    /// files; a failed save forces singleton removal regardless of the
    /// caller's request. Closing itself is unconditional. An open export
    /// session is finalized with the tracked maximum time increment and
    /// the given fringe-range ceiling.
    ///
    /// Returns whether the save step, if requested, succeeded.
    pub fn close_model(&mut self, save: bool, remove_singletons: bool, fringe_max: f64) -> bool {
        let saved = if save {
            info!("Saving updated model");
            self.engines.model.save()
        } else {
            true
        };

        self.engines.model.close(!saved || remove_singletons);
        self.export.finalize(fringe_max);

        self.state = LifecycleState::Closed(if save && saved {
            CloseOutcome::Saved
        } else {
            CloseOutcome::Discarded
        });
        saved
    }

    /// Assign a sensor value to the tagged external function, ahead of the
    /// next solver step.
    ///
    /// Returns false, without any engine call, when the tag is unknown.
    pub fn set_input(&mut self, func_tag: &str, value: f64) -> bool {
        match self.func_map.get(func_tag) {
            Some(&channel) => self.engines.solver.set_external_input(channel, value),
            None => false,
        }
    }

    fn error_exit(&mut self, log_file: &Path, log_snapshot: usize, code: i32) -> i32 {
        self.engines.model.close(true);
        diag::report_log_tail(log_file, log_snapshot);
        self.state = LifecycleState::ErrorExit;
        code
    }
}
