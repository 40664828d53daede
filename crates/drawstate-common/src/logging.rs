use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "DRAWSTATE_LOG";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize structured logging with environment filter.
/// Set DRAWSTATE_LOG=debug (or trace, info, warn, error) for verbosity control.
///
/// Panics if a global subscriber is already installed; use [`try_init_logging`]
/// from library entry points.
pub fn init_logging() {
    fmt()
        .with_env_filter(env_filter("info"))
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Install the global subscriber if none is set yet.
///
/// When `log_file` is given the output goes to that file instead of stderr. A
/// file that cannot be created falls back to stderr and the failure is logged
/// once the subscriber is up. Calling this more than once is harmless.
pub fn try_init_logging(log_file: Option<&Path>) {
    let mut open_error = None;
    let file = match log_file {
        Some(path) => match File::create(path) {
            Ok(file) => Some(file),
            Err(e) => {
                open_error = Some((path, e));
                None
            }
        },
        None => None,
    };

    let installed = match file {
        Some(file) => fmt()
            .with_env_filter(env_filter("info"))
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
            .is_ok(),
        None => fmt()
            .with_env_filter(env_filter("info"))
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    if let (true, Some((path, e))) = (installed, open_error) {
        tracing::warn!(
            "bad log file {} ({}), writing to stderr instead",
            path.display(),
            e
        );
    }
}
