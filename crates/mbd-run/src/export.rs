//! Visualization export pipeline.
//!
//! Stands up one export session per run: classifies the model's parts at
//! open time (so static geometry is written once), allocates the per-step
//! result buffers once from the solver's reported state sizes, and streams
//! one animation frame per completed solver step. The buffers are
//! overwritten in place every step, never reallocated mid-run; the export
//! session only observes their contents synchronously before the next
//! overwrite.

use mbd_core::{BaseId, FemPart, VisPart, parts::name_from_path};
use mbd_engines::{DynamicsSolver, ExportSession, ModelDatabase, ObjectClass, VisExporter};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Largest observed time delta between consecutive steps, used to set the
/// animation frame rate at close time. Reset per run.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeIncrementTracker {
    prev_time: f64,
    max_delta: f64,
}

impl TimeIncrementTracker {
    /// Record the time of a completed step.
    pub fn update(&mut self, time: f64) {
        let delta = time - self.prev_time;
        self.prev_time = time;
        if delta > self.max_delta {
            self.max_delta = delta;
        }
    }

    pub fn max_delta(&self) -> f64 {
        self.max_delta
    }
}

/// Per-run export state: the session, the reusable result buffers and the
/// time-increment tracker.
#[derive(Default)]
pub struct ExportPipeline {
    session: Option<Box<dyn ExportSession>>,
    transform: Vec<f64>,
    deformations: BTreeMap<BaseId, Vec<f64>>,
    stresses: BTreeMap<BaseId, Vec<f64>>,
    tracker: TimeIncrementTracker,
}

impl ExportPipeline {
    /// Open an export session for the given target, writing static geometry
    /// for the full part list immediately.
    ///
    /// Returns the base ids of the FE parts stress recovery will be
    /// performed for, or `None` when no export session was stood up: no
    /// target path given, no exporter engine configured, or the exporter
    /// rejected the session (logged, never fatal).
    pub fn open(
        &mut self,
        exporter: Option<&dyn VisExporter>,
        vtfx_file: Option<&Path>,
        model_file: &Path,
        model: &dyn ModelDatabase,
    ) -> Option<Vec<BaseId>> {
        let vtfx_file = vtfx_file?;
        let Some(exporter) = exporter else {
            warn!("No visualization exporter configured, no VTFx export");
            return None;
        };

        let mut recovery_ids = Vec::new();
        let mut fem_parts = Vec::new();
        let mut vis_parts = Vec::new();
        for base_id in model.objects(ObjectClass::FePart) {
            let (file, level) = model.fe_model_file(base_id);
            let name = name_from_path(&file);
            if level.is_fe_part() {
                fem_parts.push(FemPart {
                    path: file,
                    name,
                    base_id,
                    recovery: level.recovers(),
                });
            } else {
                vis_parts.push(VisPart {
                    path: file,
                    name,
                    base_id,
                });
            }
            if level.recovers() {
                recovery_ids.push(base_id);
            }
        }

        let casename = name_from_path(model_file);
        match exporter.open(&fem_parts, &vis_parts, vtfx_file, &casename) {
            Ok(session) => {
                self.session = Some(session);
                Some(recovery_ids)
            }
            Err(err) => {
                warn!("Failed to open VTFx export session: {err}");
                None
            }
        }
    }

    /// Allocate the per-step result buffers, sized from the solver.
    ///
    /// Called once after a successful solver init; parts whose deformation
    /// state is empty get no buffers at all.
    pub fn allocate_buffers(&mut self, solver: &dyn DynamicsSolver, recovery_ids: &[BaseId]) {
        self.transform = vec![0.0; solver.transform_state_size()];
        self.deformations.clear();
        self.stresses.clear();
        for &base_id in recovery_ids {
            let deform_size = solver.part_deformation_size(base_id);
            if deform_size > 0 {
                let stress_size = solver.part_stress_size(base_id).max(0) as usize;
                self.deformations.insert(base_id, vec![0.0; deform_size]);
                self.stresses.insert(base_id, vec![0.0; stress_size]);
            }
        }
    }

    /// Export results for the current step as one animation frame.
    ///
    /// No-op without an open session, or when the solver has no results
    /// available for this step.
    pub fn export_step(&mut self, solver: &dyn DynamicsSolver) {
        if self.session.is_none() || solver.results_available() == 0 {
            return;
        }

        solver.read_transform_state(&mut self.transform);
        for (base_id, deformation) in self.deformations.iter_mut() {
            if let Some(stress) = self.stresses.get_mut(base_id) {
                solver.read_part_state(*base_id, deformation, stress);
            }
        }

        let time = solver.current_time();
        self.tracker.update(time);

        if let Some(session) = self.session.as_mut() {
            session.write_step(time, &self.transform, &self.deformations, &self.stresses);
        }
    }

    /// Close the export session, applying the tracked frame rate and the
    /// fringe-range ceiling. No-op if no session was ever opened.
    pub fn finalize(&mut self, fringe_max: f64) {
        if let Some(mut session) = self.session.take() {
            session.close(self.tracker.max_delta(), fringe_max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_reports_largest_consecutive_delta() {
        let mut tracker = TimeIncrementTracker::default();
        for t in [0.0, 0.1, 0.25, 0.3] {
            tracker.update(t);
        }
        assert!((tracker.max_delta() - 0.15).abs() < 1e-12);
    }

    #[test]
    fn tracker_starts_from_time_zero() {
        let mut tracker = TimeIncrementTracker::default();
        tracker.update(0.5);
        assert_eq!(tracker.max_delta(), 0.5);
    }

    #[test]
    fn finalize_without_session_is_a_no_op() {
        let mut pipeline = ExportPipeline::default();
        pipeline.finalize(-1.0);
        pipeline.finalize(-1.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn tracked_increment_is_max_consecutive_delta(
            mut times in prop::collection::vec(0.0_f64..1000.0, 1..40)
        ) {
            times.sort_by(|a, b| a.partial_cmp(b).unwrap());

            let mut tracker = TimeIncrementTracker::default();
            let mut prev = 0.0;
            let mut expected = 0.0_f64;
            for &t in &times {
                tracker.update(t);
                expected = expected.max(t - prev);
                prev = t;
            }
            prop_assert_eq!(tracker.max_delta(), expected);
        }
    }
}
