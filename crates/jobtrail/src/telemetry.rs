//! Logging setup.
//!
//! Library code logs through the `log` facade; this bridges those records
//! into a `tracing` subscriber that also prints the run and message spans.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::error::JobtrailError;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Installs the global subscriber. `RUST_LOG` overrides `default_filter`.
///
/// Returns `Ok(false)` when logging was already initialised by an earlier
/// call.
pub fn init_logging(default_filter: &str) -> Result<bool, JobtrailError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(false);
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| {
            INSTALLED.store(false, Ordering::SeqCst);
            JobtrailError::Logging(format!("invalid log filter '{}': {}", default_filter, e))
        })?;

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_log::LogTracer::init()
        .map_err(|e| JobtrailError::Logging(format!("cannot bridge log records: {}", e)))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| JobtrailError::Logging(format!("cannot install subscriber: {}", e)))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        std::env::remove_var("RUST_LOG");
        let first = init_logging("jobtrail=debug,info");
        assert!(first.is_ok());
        assert!(!init_logging("info").unwrap());
        log::info!("logging initialised");
    }
}
