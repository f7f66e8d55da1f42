//! FE part reduction coordination.

use crate::diag;
use crate::options::{REDUCER_NAME, engine_options};
use mbd_engines::{FeReducer, ModelDatabase, ObjectClass};
use tracing::{error, info};

/// Reduce every FE part of the open model that is not already reduced.
///
/// Parts reduce one at a time, in model enumeration order. A non-zero
/// engine result aborts immediately; the parts reduced before the failure
/// stay reduced. The count includes the part being attempted, so a failure
/// on the n-th unreduced part returns -n and is always distinguishable
/// from the no-op return 0. With `do_reduce` false, or no reducer engine
/// configured, this is a no-op returning 0.
pub fn reduce_fe_parts(
    model: &mut dyn ModelDatabase,
    reducer: Option<&mut (dyn FeReducer + 'static)>,
    do_reduce: bool,
) -> i64 {
    if !do_reduce {
        return 0;
    }
    let Some(reducer) = reducer else {
        return 0;
    };

    let mut num_reduced: i64 = 0;
    for base_id in model.objects(ObjectClass::FePart) {
        // An empty path means the part is already reduced; skip it.
        let rdb_dir = model.write_reducer_input(base_id);
        if rdb_dir.as_os_str().is_empty() {
            continue;
        }

        num_reduced += 1;
        let opts = engine_options(REDUCER_NAME, Some(&rdb_dir), None, false);
        if reducer.run(&opts) != 0 {
            error!("Reduction failure for FE part {base_id}");
            diag::report_result_file(&diag::result_file(&rdb_dir, REDUCER_NAME));
            return -num_reduced;
        }

        info!("FE part {base_id} successfully reduced");
        model.sync_reduced_part(base_id);
    }

    if num_reduced > 0 {
        info!("FE model reduction done");
    }
    num_reduced
}

#[cfg(test)]
mod tests {
    use super::*;
    use mbd_core::BaseId;
    use mbd_engines::scripted::{ModelScript, PartScript, ReducerScript, ScriptedModel, ScriptedReducer};

    fn part(base_id: u32, reduced: bool) -> PartScript {
        PartScript {
            base_id,
            file: format!("part{base_id}.ftl").into(),
            recovery: 0,
            reduced,
            reducer_dir: None,
        }
    }

    fn model(parts: Vec<PartScript>) -> ScriptedModel {
        ScriptedModel::new(ModelScript {
            parts,
            ..ModelScript::default()
        })
    }

    #[test]
    fn disabled_reduction_is_a_no_op() {
        let mut m = model(vec![part(10, false)]);
        let mut r = ScriptedReducer::new(ReducerScript::default());
        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), false), 0);
        assert!(m.probe().lock().unwrap().synced_parts.is_empty());
    }

    #[test]
    fn unconfigured_reducer_is_a_silent_no_op() {
        let mut m = model(vec![part(10, false)]);
        assert_eq!(reduce_fe_parts(&mut m, None, true), 0);
    }

    #[test]
    fn reduces_only_unreduced_parts_in_order() {
        let mut m = model(vec![part(10, true), part(20, false), part(30, false)]);
        let reducer = ScriptedReducer::new(ReducerScript::default());
        let probe = reducer.probe();
        let mut r = reducer;

        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), true), 2);
        assert_eq!(probe.lock().unwrap().run_options.len(), 2);
        assert_eq!(
            m.probe().lock().unwrap().synced_parts,
            vec![BaseId::new(20).unwrap(), BaseId::new(30).unwrap()]
        );
    }

    #[test]
    fn second_pass_over_reduced_model_reduces_nothing() {
        let mut m = model(vec![part(10, false), part(20, false)]);
        let mut r = ScriptedReducer::new(ReducerScript::default());
        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), true), 2);
        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), true), 0);
    }

    #[test]
    fn failure_returns_negative_count_of_attempted_parts() {
        // Third part fails: it is the third attempt, so the result is -3.
        let mut m = model(vec![part(10, false), part(20, false), part(30, false)]);
        let mut r = ScriptedReducer::new(ReducerScript {
            statuses: vec![0, 0, 5],
        });
        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), true), -3);

        let probe = m.probe();
        let state = probe.lock().unwrap();
        assert_eq!(state.synced_parts.len(), 2);
        assert!(state.reduced.contains(&10));
        assert!(state.reduced.contains(&20));
        assert!(!state.reduced.contains(&30));
    }

    #[test]
    fn failure_on_first_part_is_still_negative() {
        let mut m = model(vec![part(10, false)]);
        let mut r = ScriptedReducer::new(ReducerScript { statuses: vec![1] });
        assert_eq!(reduce_fe_parts(&mut m, Some(&mut r), true), -1);

        let probe = m.probe();
        assert!(probe.lock().unwrap().synced_parts.is_empty());
    }
}
