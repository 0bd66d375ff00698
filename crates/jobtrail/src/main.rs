use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};

use jobtrail::email::MailSource;
use jobtrail::{
    load_config, telemetry, ConfigError, Database, ImapClient, JobtrailError, SyncContext,
    SyncWorker,
};

fn run(config_path: PathBuf) -> Result<(), JobtrailError> {
    let config = load_config(&config_path)?;
    telemetry::init_logging(&config.log_level)?;

    info!("Starting jobtrail v{}", env!("CARGO_PKG_VERSION"));

    let db_path = match &config.database_path {
        Some(path) => PathBuf::from(jobtrail::secrets::expand_home(path)),
        None => jobtrail::db::default_database_path().ok_or_else(|| {
            ConfigError::Validation {
                message: "cannot determine home directory for the database".to_string(),
            }
        })?,
    };
    let db = Database::open(&db_path)?;

    let context = Arc::new(SyncContext::from_config(db, &config)?);
    let worker = Arc::new(SyncWorker::new(
        Arc::clone(&context),
        Duration::from_secs(config.sync.poll_interval_secs),
    ));

    let mailbox = config.mailbox.clone();
    let handle =
        worker.start(move || Box::new(ImapClient::new(mailbox.clone())) as Box<dyn MailSource>)?;

    let stopper = Arc::clone(&worker);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Shutting down after the current message");
        stopper.stop();
    }) {
        error!("Cannot install Ctrl-C handler: {}", e);
    }

    if handle.join().is_err() {
        error!("Sync worker panicked");
    }

    let status = context.status()?;
    info!(
        "Last sync: {} ({})",
        status
            .last_synced_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string()),
        status.summary
    );
    Ok(())
}

fn main() -> ExitCode {
    let Some(config_path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("Usage: jobtrail <config.yaml|config.json>");
        return ExitCode::from(2);
    };

    match run(config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jobtrail: {}", e);
            ExitCode::FAILURE
        }
    }
}
