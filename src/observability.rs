//! Logger installation.
//!
//! The library itself only talks to the `log` facade. Binaries, the Python
//! module and tests decide where records go by calling `init_logging` once.

use log::LevelFilter;
use std::fs::OpenOptions;
use std::sync::Once;

use crate::error::Result;

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend printing `[LEVEL] message` lines.
///
/// `verbose` selects `Debug` instead of `Info`. With `log_file` the records
/// are appended to that file instead of stderr. Only the first call has any
/// effect; later calls return `Ok(())` without touching the logger.
pub fn init_logging(verbose: bool, log_file: Option<&str>) -> Result<()> {
    if INIT_LOGGER.is_completed() {
        return Ok(());
    }

    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(move || {
        let mut builder = env_logger::Builder::new();
        builder.is_test(false);
        builder.filter_level(if verbose { LevelFilter::Debug } else { LevelFilter::Info });

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        // Another logger may already be installed by the host application.
        let _ = builder.try_init();
    });
    Ok(())
}

/// Routes log output through the test harness's captured stdout.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Debug)
        .try_init();
}
