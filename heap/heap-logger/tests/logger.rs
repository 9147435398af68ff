use heap_logger::{LoggerBuilder, Severity};
use log::Log;
use std::fs;
use std::path::PathBuf;

/// Unique per-process path so parallel test runs don't clobber each other.
fn temp_log(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("heap-logger-{}-{name}.txt", std::process::id()))
}

#[test]
fn file_sink_respects_its_threshold() {
    let path = temp_log("threshold");
    let logger = LoggerBuilder::new()
        .file(&path, Severity::Warning)
        .build()
        .unwrap();

    logger
        .trace("below the line")
        .debug("below the line")
        .warning("at the line")
        .critical("above the line");

    let written = fs::read_to_string(&path).unwrap();
    assert!(!written.contains("below the line"));
    assert!(written.contains("[warning] at the line"));
    assert!(written.contains("[critical] above the line"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn one_message_fans_out_to_every_admitting_sink() {
    let verbose = temp_log("fanout-verbose");
    let terse = temp_log("fanout-terse");
    let logger = LoggerBuilder::new()
        .file(&verbose, Severity::Trace)
        .file(&terse, Severity::Error)
        .build()
        .unwrap();

    logger.trace("fine detail").error("something broke");

    let verbose_lines = fs::read_to_string(&verbose).unwrap();
    let terse_lines = fs::read_to_string(&terse).unwrap();
    assert_eq!(verbose_lines.lines().count(), 2);
    assert_eq!(terse_lines.lines().count(), 1);
    assert!(terse_lines.contains("[error] something broke"));

    fs::remove_file(&verbose).unwrap();
    fs::remove_file(&terse).unwrap();
}

#[test]
fn unwritable_file_fails_at_build_time() {
    let path = std::env::temp_dir()
        .join("heap-logger-no-such-dir")
        .join("log.txt");
    assert!(
        LoggerBuilder::new()
            .file(path, Severity::Trace)
            .build()
            .is_err()
    );
}

#[test]
fn facade_records_reach_the_sinks() {
    let path = temp_log("facade");
    let logger = LoggerBuilder::new()
        .file(&path, Severity::Information)
        .build()
        .unwrap();

    logger.log(
        &log::Record::builder()
            .args(format_args!("squeezed through the facade"))
            .level(log::Level::Warn)
            .target("facade")
            .build(),
    );
    logger.log(
        &log::Record::builder()
            .args(format_args!("dropped on the floor"))
            .level(log::Level::Trace)
            .target("facade")
            .build(),
    );

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[warning] squeezed through the facade"));
    assert!(!written.contains("dropped on the floor"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn enabled_asks_every_sink() {
    let path = temp_log("enabled");
    let logger = LoggerBuilder::new()
        .file(&path, Severity::Error)
        .build()
        .unwrap();

    assert!(logger.enabled(&log::Metadata::builder().level(log::Level::Error).build()));
    assert!(!logger.enabled(&log::Metadata::builder().level(log::Level::Info).build()));

    fs::remove_file(&path).unwrap();
}
