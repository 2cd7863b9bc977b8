//! Logging setup and structured diagnostics.
//!
//! The library only ever talks to the `log` facade. Binaries and tests that
//! want to see the records call `init_logging` once; later calls are no-ops.
//! The `log_metric!` macro emits one structured key/value record per call at
//! `debug` level under the `nucdiff::metric` target.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Once;

use log::LevelFilter;

use crate::config::LoggingConfig;
use crate::error::NucdiffError;

/// Logs a structured key-value metric record at debug level.
///
/// # Example
/// ```
/// use nucdiff::log_metric;
/// let rows = 4;
/// log_metric!("event" = "deviation", "quantity" = "isotope", "rows" = &rows);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        if $crate::__log::log_enabled!(target: "nucdiff::metric", $crate::__log::Level::Debug) {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            $crate::__log::debug!(target: "nucdiff::metric", "{{ {} }}", parts.join(", "));
        }
    };
}

static INIT_LOGGER: Once = Once::new();

/// Installs an `env_logger` backend at `level`, appending to `log_file` when given.
///
/// Only the first call has any effect. An unopenable log file is reported as an
/// error and leaves logging uninitialised.
pub fn init_logging(level: LevelFilter, log_file: Option<&Path>) -> Result<(), NucdiffError> {
    let file = match log_file {
        Some(path) => Some(OpenOptions::new().append(true).create(true).open(path)?),
        None => None,
    };

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(level);

        // Custom formatter: level, target and message
        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}

/// Convenience wrapper over `init_logging` for a loaded config section.
pub fn init_from_config(config: &LoggingConfig) -> Result<(), NucdiffError> {
    init_logging(config.level_filter()?, config.log_file.as_deref())
}
