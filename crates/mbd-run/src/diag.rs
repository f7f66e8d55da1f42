//! Operator-facing failure reports from engine log and result files.
//!
//! Everything here is best-effort: a missing or unreadable file skips the
//! report silently, so diagnostics can never mask the status code of the
//! failure that triggered them.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::error;

/// Number of lines in a file, zero if it does not exist.
pub fn count_lines(path: &Path) -> usize {
    match fs::read_to_string(path) {
        Ok(content) => content.lines().count(),
        Err(_) => 0,
    }
}

/// Locate the result file of an engine process in its run directory.
///
/// The engine's `.fop` option file may name the file on a `-resfile` line
/// (value in enclosing quotes); otherwise `<engine>.res` is assumed.
pub fn result_file(rdb_dir: &Path, engine: &str) -> PathBuf {
    let fop_file = rdb_dir.join(format!("{engine}.fop"));
    if let Ok(content) = fs::read_to_string(&fop_file) {
        for line in content.lines() {
            if let Some(value) = line.strip_prefix("-resfile") {
                let name = value.trim().trim_matches('"');
                if !name.is_empty() {
                    return rdb_dir.join(name);
                }
            }
        }
    }
    rdb_dir.join(format!("{engine}.res"))
}

/// Report the contents of a result file: the first 100 lines, and the
/// rest of the file from the first `Error :` message if one occurs.
pub fn report_result_file(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    error!("Check {} for error messages", path.display());
    error!("Here is the file content:");
    // 1 = within the head, 2 = past an error message, 0 = suppressed
    let mut print_line = 1;
    for (count, line) in content.lines().enumerate() {
        if line.starts_with("Error :") {
            print_line = 2;
        } else if count > 100 && print_line == 1 {
            print_line = 0;
            error!("     . . .");
        }
        if print_line > 0 {
            error!("{:8} {}", count + 1, line);
        }
    }
    error!("#### End of file {}", path.display());
}

/// Report only the lines of a log file appended since a snapshot.
pub fn report_log_tail(path: &Path, from_line: usize) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    error!("Here is the model log:");
    for line in content.lines().skip(from_line) {
        error!("{line}");
    }
    error!("#### End of log for {}", path.display());
}
