use crate::Severity;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// One output target with its own severity threshold.
struct Sink {
    threshold: Severity,
    target: Target,
}

enum Target {
    Console,
    /// Behind a mutex so the logger stays `Sync`, which the `log` facade
    /// requires of an installed logger.
    File(Mutex<File>),
}

impl Sink {
    fn write(&self, severity: Severity, message: &str) {
        // A failing sink must not fail the operation being logged.
        match &self.target {
            Target::Console => println!("[{severity}] {message}"),
            Target::File(file) => {
                if let Ok(mut file) = file.lock() {
                    let _ = writeln!(file, "[{severity}] {message}");
                }
            }
        }
    }
}

/// Assembles a [`Logger`] from console and file sinks.
///
/// Files are opened (and truncated) at [`build`](Self::build) time, so a
/// bad path surfaces before the first message rather than swallowing them.
#[derive(Default)]
pub struct LoggerBuilder {
    planned: Vec<(PlannedTarget, Severity)>,
}

enum PlannedTarget {
    Console,
    File(PathBuf),
}

impl LoggerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a console sink passing messages at `threshold` and above.
    #[must_use]
    pub fn console(mut self, threshold: Severity) -> Self {
        self.planned.push((PlannedTarget::Console, threshold));
        self
    }

    /// Add a file sink at `path` passing messages at `threshold` and above.
    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>, threshold: Severity) -> Self {
        self.planned.push((PlannedTarget::File(path.into()), threshold));
        self
    }

    /// Open every planned file and produce the logger.
    ///
    /// # Errors
    /// Returns the first file-creation failure.
    pub fn build(self) -> io::Result<Logger> {
        let mut sinks = Vec::with_capacity(self.planned.len());
        for (target, threshold) in self.planned {
            let target = match target {
                PlannedTarget::Console => Target::Console,
                PlannedTarget::File(path) => Target::File(Mutex::new(File::create(path)?)),
            };
            sinks.push(Sink { threshold, target });
        }
        Ok(Logger { sinks })
    }
}

/// A severity-filtered, multi-sink log object.
///
/// The severity methods are chainable, so guard sequences read as one
/// statement:
///
/// ```no_run
/// # use heap_logger::{LoggerBuilder, Severity};
/// # let logger = LoggerBuilder::new().console(Severity::Trace).build().unwrap();
/// logger.trace("allocate started").debug("requested 1000 bytes");
/// ```
pub struct Logger {
    sinks: Vec<Sink>,
}

impl Logger {
    /// Fan `message` out to every sink whose threshold admits `severity`.
    pub fn emit(&self, severity: Severity, message: &str) -> &Self {
        for sink in &self.sinks {
            if severity >= sink.threshold {
                sink.write(severity, message);
            }
        }
        self
    }

    pub fn trace(&self, message: &str) -> &Self {
        self.emit(Severity::Trace, message)
    }

    pub fn debug(&self, message: &str) -> &Self {
        self.emit(Severity::Debug, message)
    }

    pub fn information(&self, message: &str) -> &Self {
        self.emit(Severity::Information, message)
    }

    pub fn warning(&self, message: &str) -> &Self {
        self.emit(Severity::Warning, message)
    }

    pub fn error(&self, message: &str) -> &Self {
        self.emit(Severity::Error, message)
    }

    pub fn critical(&self, message: &str) -> &Self {
        self.emit(Severity::Critical, message)
    }

    /// Install this logger as the process-wide `log` facade backend.
    ///
    /// The instance is leaked; `log::set_logger` wants a `&'static` and a
    /// process has exactly one logger anyway.
    ///
    /// # Errors
    /// Fails if a global logger is already installed.
    pub fn install(self) -> Result<(), log::SetLoggerError> {
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(log::LevelFilter::Trace);
        Ok(())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        let severity = Severity::from(metadata.level());
        self.sinks.iter().any(|sink| severity >= sink.threshold)
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            self.emit(Severity::from(record.level()), &record.args().to_string());
        }
    }

    fn flush(&self) {}
}
