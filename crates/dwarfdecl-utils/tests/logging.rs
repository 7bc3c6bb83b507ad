//! Tests for file-only logging
//!
//! Installing a global subscriber is once per process, so this file holds a
//! single test.

use std::fs;

use dwarfdecl_utils::{info, init_logging_to_file, LogFormat, LogLevel};

#[test]
fn test_init_logging_to_file_writes_records()
{
    let dir = std::env::temp_dir().join(format!("dwarfdecl-logging-{}", std::process::id()));
    let path = dir.join("nested").join("run.log");
    let _ = fs::remove_dir_all(&dir);

    let guard = init_logging_to_file(&path, Some(LogLevel::Info), LogFormat::Json).unwrap();
    info!(fragments = 3, "Generated header");
    drop(guard);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("Generated header"));
    assert!(text.contains("\"fragments\":3"));
    assert!(text.contains("\"level\":\"INFO\""));

    // A second global subscriber is refused.
    assert!(init_logging_to_file(&path, None, LogFormat::Pretty).is_err());
    fs::remove_dir_all(&dir).unwrap();
}
