//! Behaviors that end the process, checked by re-running this test binary
//! as a child with a marker variable set.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing_line_log::{init_logging, init_logging_or_exit, LoggingConfig};

const CHILD_ENV: &str = "TRACING_LINE_LOG_CHILD";

fn is_child(test: &str) -> bool {
    std::env::var(CHILD_ENV).as_deref() == Ok(test)
}

fn run_child(test: &str, log_path: &Path) -> Output {
    Command::new(std::env::current_exe().unwrap())
        .args(["--exact", test, "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, test)
        .env("CHILD_LOG_PATH", log_path)
        .output()
        .unwrap()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tracing-line-log-exit-{}-{}", std::process::id(), name))
}

#[test]
fn unknown_level_terminates_the_process() {
    const TEST: &str = "unknown_level_terminates_the_process";
    if is_child(TEST) {
        let path = std::env::var("CHILD_LOG_PATH").unwrap();
        let _logger = init_logging_or_exit(&LoggingConfig::new("TRACE", path));
        // returning normally means the process was not terminated
        return;
    }

    let path = temp_path("trace.log");
    let output = run_child(TEST, &path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid logLevel: TRACE"));
    assert!(!path.exists());
}

#[test]
fn unopenable_file_terminates_the_process() {
    const TEST: &str = "unopenable_file_terminates_the_process";
    if is_child(TEST) {
        let path = std::env::var("CHILD_LOG_PATH").unwrap();
        let _logger = init_logging_or_exit(&LoggingConfig::new("INFO", path));
        return;
    }

    let path = temp_path("no-such-dir").join("grv.log");
    let output = run_child(TEST, &path);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unable to open log file"));
}

#[test]
fn fatal_writes_the_line_then_exits() {
    const TEST: &str = "fatal_writes_the_line_then_exits";
    if is_child(TEST) {
        let path = std::env::var("CHILD_LOG_PATH").unwrap();
        let logger = init_logging(&LoggingConfig::new("ERROR", path)).unwrap();
        logger.fatal("giving up");
    }

    let path = temp_path("fatal.log");
    let output = run_child(TEST, &path);

    assert_eq!(output.status.code(), Some(1));
    let contents = fs::read_to_string(&path).unwrap();
    assert!(contents.contains("] [FATAL] [process_exit.rs:"), "{contents}");
    assert!(contents.ends_with("] - giving up\n"));
    let _ = fs::remove_file(&path);
}
