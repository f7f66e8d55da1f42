//! Scripted replay backend.
//!
//! Implements every engine trait on top of a serde-defined [`Scenario`],
//! so a full run can be exercised without any native engine component.
//! Each engine shares its internal state through an `Arc<Mutex<_>>` probe,
//! letting tests assert on call order and outcomes after the orchestrator
//! has consumed the boxed engines.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::traits::{
    DynamicsSolver, EngineSet, ExportSession, FeReducer, ModelDatabase, ObjectClass, RestartData,
    VisExporter,
};
use mbd_core::{BaseId, FemPart, RecoveryLevel, VisPart};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One FE or generic part in the scripted model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartScript {
    pub base_id: u32,
    #[serde(default)]
    pub file: PathBuf,
    /// Recovery code as the database reports it: negative = visualization
    /// only, 0 = recovery off, positive = full recovery.
    #[serde(default)]
    pub recovery: i32,
    /// Whether reduced matrix files already exist for this part.
    #[serde(default)]
    pub reduced: bool,
    /// Directory the reducer input files land in when the part is unreduced.
    #[serde(default)]
    pub reducer_dir: Option<PathBuf>,
}

/// Scripted model database contents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelScript {
    #[serde(default)]
    pub triads: usize,
    #[serde(default)]
    pub joints: usize,
    #[serde(default)]
    pub beams: usize,
    #[serde(default)]
    pub parts: Vec<PartScript>,
    /// External function tags by channel, channel 1 first. A `null` entry
    /// is a channel with no function; an empty string is an untagged one.
    #[serde(default)]
    pub function_tags: Vec<Option<String>>,
    /// Run database directory returned by the solver-input write,
    /// `None` scripts a write failure.
    #[serde(default)]
    pub rdb_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub open_ok: bool,
    #[serde(default = "default_true")]
    pub save_ok: bool,
}

impl Default for ModelScript {
    fn default() -> Self {
        Self {
            triads: 0,
            joints: 0,
            beams: 0,
            parts: Vec::new(),
            function_tags: Vec::new(),
            rdb_dir: None,
            open_ok: true,
            save_ok: true,
        }
    }
}

/// Scripted dynamics solver behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverScript {
    #[serde(default)]
    pub init_status: i32,
    /// Physical time of each step the solver will produce, in order.
    #[serde(default)]
    pub step_times: Vec<f64>,
    #[serde(default = "default_one")]
    pub results_available: usize,
    #[serde(default = "default_transform_size")]
    pub transform_size: usize,
    /// Per-part (deformation, stress) state array sizes.
    #[serde(default)]
    pub part_sizes: BTreeMap<u32, (usize, i64)>,
    #[serde(default)]
    pub last_error: i32,
    #[serde(default)]
    pub done: i32,
    #[serde(default)]
    pub run_to_completion_status: i32,
}

impl Default for SolverScript {
    fn default() -> Self {
        Self {
            init_status: 0,
            step_times: Vec::new(),
            results_available: 1,
            transform_size: default_transform_size(),
            part_sizes: BTreeMap::new(),
            last_error: 0,
            done: 0,
            run_to_completion_status: 0,
        }
    }
}

/// Scripted reducer: statuses returned by successive `run` calls,
/// zero once the list is exhausted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReducerScript {
    #[serde(default)]
    pub statuses: Vec<i32>,
}

/// Scripted exporter behavior.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExporterScript {
    #[serde(default)]
    pub fail_open: bool,
}

/// A complete replay scenario.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scenario {
    pub model: ModelScript,
    #[serde(default)]
    pub solver: SolverScript,
    #[serde(default)]
    pub reducer: Option<ReducerScript>,
    #[serde(default)]
    pub exporter: Option<ExporterScript>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> usize {
    1
}

fn default_transform_size() -> usize {
    12
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::ScenarioRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let scenario: Scenario =
            serde_json::from_str(&content).map_err(|e| EngineError::ScenarioParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(
            "Loaded scenario {} with {} parts",
            path.display(),
            scenario.model.parts.len()
        );
        Ok(scenario)
    }

    /// Build the engine set this scenario describes, plus probes into the
    /// scripted engines' internal state.
    pub fn build(self) -> (EngineSet, Probes) {
        let model = ScriptedModel::new(self.model);
        let solver = ScriptedSolver::new(self.solver);
        let reducer = self.reducer.map(ScriptedReducer::new);
        let exporter = self.exporter.map(ScriptedExporter::new);

        let probes = Probes {
            model: model.probe(),
            solver: solver.probe(),
            reducer: reducer.as_ref().map(|r| r.probe()),
            exporter: exporter.as_ref().map(|e| e.probe()),
        };
        let engines = EngineSet {
            model: Box::new(model),
            solver: Box::new(solver),
            reducer: reducer.map(|r| Box::new(r) as Box<dyn FeReducer>),
            exporter: exporter.map(|e| Box::new(e) as Box<dyn VisExporter>),
        };
        (engines, probes)
    }
}

/// Build engines from an [`EngineConfig`], interpreting the model-database
/// entry as a scenario file. The optional reducer and exporter entries gate
/// those engines off even when the scenario scripts them.
pub fn engines_from_config(config: &EngineConfig) -> EngineResult<(EngineSet, Probes)> {
    let mut scenario = Scenario::load(&config.model_db)?;
    if config.reducer.is_none() {
        scenario.reducer = None;
    }
    if config.exporter.is_none() {
        scenario.exporter = None;
    }
    Ok(scenario.build())
}

/// Shared handles into the scripted engines' state.
pub struct Probes {
    pub model: Arc<Mutex<ModelState>>,
    pub solver: Arc<Mutex<SolverState>>,
    pub reducer: Option<Arc<Mutex<ReducerState>>>,
    pub exporter: Option<Arc<Mutex<ExporterState>>>,
}

/// Observable state of the scripted model database.
#[derive(Debug)]
pub struct ModelState {
    script: ModelScript,
    pub open_model: Option<PathBuf>,
    pub open_calls: usize,
    pub save_calls: usize,
    /// Release-singletons flag of each close call, in order.
    pub close_calls: Vec<bool>,
    pub synced_parts: Vec<BaseId>,
    pub reduced: BTreeSet<u32>,
    pub solver_input_writes: Vec<bool>,
}

impl ModelState {
    pub fn is_open(&self) -> bool {
        self.open_model.is_some()
    }
}

pub struct ScriptedModel {
    state: Arc<Mutex<ModelState>>,
}

impl ScriptedModel {
    pub fn new(script: ModelScript) -> Self {
        let reduced = script
            .parts
            .iter()
            .filter(|p| p.reduced)
            .map(|p| p.base_id)
            .collect();
        Self {
            state: Arc::new(Mutex::new(ModelState {
                script,
                open_model: None,
                open_calls: 0,
                save_calls: 0,
                close_calls: Vec::new(),
                synced_parts: Vec::new(),
                reduced,
                solver_input_writes: Vec::new(),
            })),
        }
    }

    pub fn probe(&self) -> Arc<Mutex<ModelState>> {
        Arc::clone(&self.state)
    }
}

impl ModelDatabase for ScriptedModel {
    fn open(&mut self, path: &Path) -> bool {
        let mut state = self.state.lock().unwrap();
        state.open_calls += 1;
        if state.script.open_ok {
            state.open_model = Some(path.to_path_buf());
        }
        state.script.open_ok
    }

    fn close(&mut self, release_singletons: bool) {
        let mut state = self.state.lock().unwrap();
        state.close_calls.push(release_singletons);
        state.open_model = None;
    }

    fn save(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        state.save_calls += 1;
        state.script.save_ok
    }

    fn count(&self, class: ObjectClass) -> usize {
        let state = self.state.lock().unwrap();
        let s = &state.script;
        match class {
            ObjectClass::Triad => s.triads,
            ObjectClass::Joint => s.joints,
            ObjectClass::Beam => s.beams,
            ObjectClass::FePart => s.parts.len(),
            ObjectClass::All => s.triads + s.joints + s.beams + s.parts.len(),
        }
    }

    fn objects(&self, class: ObjectClass) -> Vec<BaseId> {
        let state = self.state.lock().unwrap();
        match class {
            ObjectClass::FePart => state
                .script
                .parts
                .iter()
                .filter_map(|p| BaseId::new(p.base_id))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn function_tag(&self, channel: usize) -> Option<String> {
        let state = self.state.lock().unwrap();
        if channel == 0 {
            return None;
        }
        state
            .script
            .function_tags
            .get(channel - 1)
            .cloned()
            .flatten()
    }

    fn write_reducer_input(&mut self, part: BaseId) -> PathBuf {
        let state = self.state.lock().unwrap();
        if state.reduced.contains(&part.get()) {
            return PathBuf::new();
        }
        state
            .script
            .parts
            .iter()
            .find(|p| p.base_id == part.get())
            .map(|p| {
                p.reducer_dir
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(format!("part_{}_rdb", p.base_id)))
            })
            .unwrap_or_default()
    }

    fn write_solver_input(&mut self, keep_old_res: bool) -> PathBuf {
        let mut state = self.state.lock().unwrap();
        state.solver_input_writes.push(keep_old_res);
        state.script.rdb_dir.clone().unwrap_or_default()
    }

    fn fe_model_file(&self, part: BaseId) -> (PathBuf, RecoveryLevel) {
        let state = self.state.lock().unwrap();
        state
            .script
            .parts
            .iter()
            .find(|p| p.base_id == part.get())
            .map(|p| (p.file.clone(), RecoveryLevel::from_code(p.recovery)))
            .unwrap_or((PathBuf::new(), RecoveryLevel::Off))
    }

    fn sync_reduced_part(&mut self, part: BaseId) {
        let mut state = self.state.lock().unwrap();
        state.reduced.insert(part.get());
        state.synced_parts.push(part);
    }
}

/// Observable state of the scripted solver.
#[derive(Debug)]
pub struct SolverState {
    script: SolverScript,
    remaining: VecDeque<f64>,
    pub time: f64,
    pub init_options: Vec<Vec<String>>,
    pub init_had_restart: bool,
    pub run_options: Vec<Vec<String>>,
    pub external_inputs: Vec<(usize, f64)>,
}

impl SolverState {
    pub fn steps_taken(&self) -> usize {
        self.script.step_times.len() - self.remaining.len()
    }
}

pub struct ScriptedSolver {
    state: Arc<Mutex<SolverState>>,
}

impl ScriptedSolver {
    pub fn new(script: SolverScript) -> Self {
        let remaining = script.step_times.iter().copied().collect();
        Self {
            state: Arc::new(Mutex::new(SolverState {
                script,
                remaining,
                time: 0.0,
                init_options: Vec::new(),
                init_had_restart: false,
                run_options: Vec::new(),
                external_inputs: Vec::new(),
            })),
        }
    }

    pub fn probe(&self) -> Arc<Mutex<SolverState>> {
        Arc::clone(&self.state)
    }
}

impl DynamicsSolver for ScriptedSolver {
    fn init(&mut self, options: &[String], restart: &RestartData) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.init_options.push(options.to_vec());
        state.init_had_restart = restart.state.is_some()
            || restart.gauges.is_some()
            || restart.external_inputs.is_some();
        state.script.init_status
    }

    fn step_next(&mut self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.remaining.pop_front() {
            Some(t) => {
                state.time = t;
                true
            }
            None => false,
        }
    }

    fn current_time(&self) -> f64 {
        self.state.lock().unwrap().time
    }

    fn results_available(&self) -> usize {
        self.state.lock().unwrap().script.results_available
    }

    fn transform_state_size(&self) -> usize {
        self.state.lock().unwrap().script.transform_size
    }

    fn part_deformation_size(&self, part: BaseId) -> usize {
        let state = self.state.lock().unwrap();
        state
            .script
            .part_sizes
            .get(&part.get())
            .map(|&(d, _)| d)
            .unwrap_or(0)
    }

    fn part_stress_size(&self, part: BaseId) -> i64 {
        let state = self.state.lock().unwrap();
        state
            .script
            .part_sizes
            .get(&part.get())
            .map(|&(_, s)| s)
            .unwrap_or(0)
    }

    fn read_transform_state(&self, out: &mut [f64]) {
        let time = self.state.lock().unwrap().time;
        out.fill(time);
    }

    fn read_part_state(&self, part: BaseId, deformation: &mut [f64], stress: &mut [f64]) {
        deformation.fill(part.get() as f64);
        stress.fill(part.get() as f64);
    }

    fn run_to_completion(&mut self, options: &[String]) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.run_options.push(options.to_vec());
        state.script.run_to_completion_status
    }

    fn last_error(&self) -> i32 {
        self.state.lock().unwrap().script.last_error
    }

    fn done(&self) -> i32 {
        self.state.lock().unwrap().script.done
    }

    fn set_external_input(&mut self, channel: usize, value: f64) -> bool {
        let mut state = self.state.lock().unwrap();
        if channel == 0 {
            return false;
        }
        state.external_inputs.push((channel, value));
        true
    }
}

/// Observable state of the scripted reducer.
#[derive(Debug, Default)]
pub struct ReducerState {
    statuses: VecDeque<i32>,
    pub run_options: Vec<Vec<String>>,
}

pub struct ScriptedReducer {
    state: Arc<Mutex<ReducerState>>,
}

impl ScriptedReducer {
    pub fn new(script: ReducerScript) -> Self {
        Self {
            state: Arc::new(Mutex::new(ReducerState {
                statuses: script.statuses.into_iter().collect(),
                run_options: Vec::new(),
            })),
        }
    }

    pub fn probe(&self) -> Arc<Mutex<ReducerState>> {
        Arc::clone(&self.state)
    }
}

impl FeReducer for ScriptedReducer {
    fn run(&mut self, options: &[String]) -> i32 {
        let mut state = self.state.lock().unwrap();
        state.run_options.push(options.to_vec());
        state.statuses.pop_front().unwrap_or(0)
    }
}

/// Observable state of the scripted exporter and its session.
#[derive(Debug, Default)]
pub struct ExporterState {
    pub open_calls: usize,
    pub fem_parts: Vec<FemPart>,
    pub vis_parts: Vec<VisPart>,
    pub casename: String,
    pub frames: Vec<FrameRecord>,
    /// `(max_time_increment, fringe_max)` of the close call, if any.
    pub closed: Option<(f64, f64)>,
}

/// One recorded animation frame.
#[derive(Clone, Debug)]
pub struct FrameRecord {
    pub time: f64,
    pub transform: Vec<f64>,
    pub deformations: BTreeMap<u32, Vec<f64>>,
    pub stresses: BTreeMap<u32, Vec<f64>>,
}

pub struct ScriptedExporter {
    fail_open: bool,
    state: Arc<Mutex<ExporterState>>,
}

impl ScriptedExporter {
    pub fn new(script: ExporterScript) -> Self {
        Self {
            fail_open: script.fail_open,
            state: Arc::new(Mutex::new(ExporterState::default())),
        }
    }

    pub fn probe(&self) -> Arc<Mutex<ExporterState>> {
        Arc::clone(&self.state)
    }
}

impl VisExporter for ScriptedExporter {
    fn open(
        &self,
        fem_parts: &[FemPart],
        vis_parts: &[VisPart],
        _vtfx_file: &Path,
        casename: &str,
    ) -> EngineResult<Box<dyn ExportSession>> {
        if self.fail_open {
            return Err(EngineError::Exporter {
                what: "scripted open failure".to_string(),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.open_calls += 1;
        state.fem_parts = fem_parts.to_vec();
        state.vis_parts = vis_parts.to_vec();
        state.casename = casename.to_string();
        drop(state);
        Ok(Box::new(ScriptedSession {
            state: Arc::clone(&self.state),
        }))
    }
}

struct ScriptedSession {
    state: Arc<Mutex<ExporterState>>,
}

impl ExportSession for ScriptedSession {
    fn write_step(
        &mut self,
        time: f64,
        transform: &[f64],
        deformations: &BTreeMap<BaseId, Vec<f64>>,
        stresses: &BTreeMap<BaseId, Vec<f64>>,
    ) {
        let mut state = self.state.lock().unwrap();
        state.frames.push(FrameRecord {
            time,
            transform: transform.to_vec(),
            deformations: deformations
                .iter()
                .map(|(id, v)| (id.get(), v.clone()))
                .collect(),
            stresses: stresses.iter().map(|(id, v)| (id.get(), v.clone())).collect(),
        });
    }

    fn close(&mut self, max_time_increment: f64, fringe_max: f64) {
        let mut state = self.state.lock().unwrap();
        state.closed = Some((max_time_increment, fringe_max));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(base_id: u32, recovery: i32, reduced: bool) -> PartScript {
        PartScript {
            base_id,
            file: PathBuf::from(format!("part{base_id}.ftl")),
            recovery,
            reduced,
            reducer_dir: None,
        }
    }

    #[test]
    fn scenario_round_trips_through_json() {
        let scenario = Scenario {
            model: ModelScript {
                triads: 4,
                joints: 2,
                beams: 0,
                parts: vec![part(10, 1, false)],
                function_tags: vec![Some("sensorA".to_string()), None],
                rdb_dir: Some(PathBuf::from("/tmp/rdb")),
                open_ok: true,
                save_ok: true,
            },
            solver: SolverScript {
                step_times: vec![0.1, 0.2],
                ..SolverScript::default()
            },
            reducer: Some(ReducerScript { statuses: vec![0] }),
            exporter: Some(ExporterScript::default()),
        };
        let json = serde_json::to_string(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back.model.parts.len(), 1);
        assert_eq!(back.solver.step_times, vec![0.1, 0.2]);
        assert!(back.reducer.is_some());
    }

    #[test]
    fn model_tracks_reduced_parts() {
        let mut model = ScriptedModel::new(ModelScript {
            parts: vec![part(10, 1, false), part(20, 0, true)],
            ..ModelScript::default()
        });
        let p10 = BaseId::new(10).unwrap();
        let p20 = BaseId::new(20).unwrap();

        assert!(!model.write_reducer_input(p10).as_os_str().is_empty());
        assert!(model.write_reducer_input(p20).as_os_str().is_empty());

        model.sync_reduced_part(p10);
        assert!(model.write_reducer_input(p10).as_os_str().is_empty());
    }

    #[test]
    fn solver_steps_through_scripted_times() {
        let mut solver = ScriptedSolver::new(SolverScript {
            step_times: vec![0.5, 1.0],
            ..SolverScript::default()
        });
        assert!(solver.step_next());
        assert_eq!(solver.current_time(), 0.5);
        assert!(solver.step_next());
        assert_eq!(solver.current_time(), 1.0);
        assert!(!solver.step_next());
    }

    #[test]
    fn config_gating_masks_optional_engines() {
        let scenario = Scenario {
            reducer: Some(ReducerScript::default()),
            exporter: Some(ExporterScript::default()),
            ..Scenario::default()
        };
        let dir = std::env::temp_dir().join(format!("mbd_scenario_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("scenario.json");
        std::fs::write(&path, serde_json::to_string(&scenario).unwrap()).unwrap();

        let config = EngineConfig {
            model_db: path.clone(),
            solver: path.clone(),
            reducer: None,
            exporter: None,
        };
        let (engines, _probes) = engines_from_config(&config).unwrap();
        assert!(engines.reducer.is_none());
        assert!(engines.exporter.is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
