//! # Severity-Filtered Logging
//!
//! The log object the allocators borrow: a set of sinks (console or file),
//! each with its own severity threshold, assembled through
//! [`LoggerBuilder`] and driven through chainable severity methods:
//!
//! ```no_run
//! use heap_logger::{LoggerBuilder, Severity};
//!
//! # fn main() -> std::io::Result<()> {
//! let logger = LoggerBuilder::new()
//!     .console(Severity::Debug)
//!     .file("allocator-trace.txt", Severity::Trace)
//!     .build()?;
//!
//! logger
//!     .trace("construction started")
//!     .debug("requested 10000 bytes");
//! # Ok(())
//! # }
//! ```
//!
//! [`Logger`] also implements [`log::Log`], so one instance can serve as
//! the process-wide logger for code speaking through the `log` facade; see
//! [`Logger::install`].

mod logger;
mod severity;

pub use logger::{Logger, LoggerBuilder};
pub use severity::Severity;
