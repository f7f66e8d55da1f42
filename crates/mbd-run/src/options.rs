//! Command-line-style option assembly for the reducer and solver engines.
//!
//! The engines parse positionally sensitive option files, so the emission
//! order here is fixed and significant.

use std::path::{Path, PathBuf};

/// Process name of the dynamics solver, used for option/result file lookup.
pub const SOLVER_NAME: &str = "mbd_solver";

/// Process name of the FE part reducer.
pub const REDUCER_NAME: &str = "mbd_reducer";

/// Option-file suffixes recognized next to an engine's run directory,
/// probed in this order.
const OPTION_FILE_EXTS: [&str; 3] = ["fco", "fop", "fao"];

/// Assemble the standard engine options.
///
/// With an RDB directory the working-directory and single-process terminal
/// flags come first. Each recognized option file contributes a flag only if
/// it exists on disk relative to the RDB directory (or the current working
/// directory when none is given). A start-time override and the in-core
/// stress-array flag are appended last, each only when requested.
pub fn engine_options(
    engine: &str,
    rdb_dir: Option<&Path>,
    time_start: Option<f64>,
    in_core_stress: bool,
) -> Vec<String> {
    let mut opts = Vec::new();
    if let Some(dir) = rdb_dir {
        opts.push("-cwd".to_string());
        opts.push(dir.display().to_string());
        opts.push("-terminal".to_string());
        opts.push("-1".to_string());
    }

    for ext in OPTION_FILE_EXTS {
        let file_name = format!("{engine}.{ext}");
        let probe = match rdb_dir {
            Some(dir) => dir.join(&file_name),
            None => PathBuf::from(&file_name),
        };
        if probe.is_file() {
            opts.push(format!("-{ext}"));
            opts.push(file_name);
        }
    }

    if let Some(t) = time_start {
        opts.push(format!("-timeStart={t}"));
    }

    if in_core_stress {
        opts.push("-partVMStress=2".to_string());
    }

    opts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mbd_options_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn rdb_dir_prepends_cwd_and_terminal_flags() {
        let dir = scratch_dir("cwd");
        let opts = engine_options(SOLVER_NAME, Some(&dir), None, false);
        assert_eq!(opts[0], "-cwd");
        assert_eq!(opts[1], dir.display().to_string());
        assert_eq!(opts[2], "-terminal");
        assert_eq!(opts[3], "-1");
        assert_eq!(opts.len(), 4);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn only_existing_option_files_are_referenced() {
        let dir = scratch_dir("files");
        fs::write(dir.join("mbd_solver.fop"), "-resfile \"run.res\"\n").unwrap();
        fs::write(dir.join("mbd_solver.fao"), "").unwrap();

        let opts = engine_options(SOLVER_NAME, Some(&dir), None, false);
        let tail = &opts[4..];
        assert_eq!(
            tail,
            ["-fop", "mbd_solver.fop", "-fao", "mbd_solver.fao"],
            "fco is absent on disk and must not be referenced"
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn trailing_flags_are_conditional_and_ordered() {
        let dir = scratch_dir("tail");
        let opts = engine_options(SOLVER_NAME, Some(&dir), Some(1.5), true);
        assert_eq!(opts[opts.len() - 2], "-timeStart=1.5");
        assert_eq!(opts[opts.len() - 1], "-partVMStress=2");

        let opts = engine_options(SOLVER_NAME, Some(&dir), None, false);
        assert!(!opts.iter().any(|o| o.starts_with("-timeStart")));
        assert!(!opts.iter().any(|o| o == "-partVMStress=2"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn no_rdb_dir_and_no_option_files_yields_empty_list() {
        // Probes resolve relative to the current working directory, where
        // no mbd_solver option files exist during the test run.
        let opts = engine_options(SOLVER_NAME, None, None, false);
        assert!(opts.is_empty());
    }
}
