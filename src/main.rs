mod error;
mod models;
mod poll;
mod settings;
mod store;
mod utils;
#[cfg(test)]
mod testing;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use anyhow::Context;
use dotenv::dotenv;
use log::{error, info};
use simplelog::{ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger};
use crate::poll::PollLoop;
use crate::settings::Settings;
use crate::store::{CredentialSource, EnvCredentials, GradeStore};
use crate::utils::session::SessionConfig;
use crate::utils::telegram::TelegramNotifier;

// Entry point for the async main function, powered by tokio runtime.
#[tokio::main]
async fn main() -> ExitCode {
    // Loads environment variables from a `.env` file, if present.
    dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Cannot set up logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    // Ctrl-C is the only clean way out; everything else is a fatal error.
    tokio::select! {
        result = run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Quitting: {:#}", e);
                ExitCode::FAILURE
            }
        },
        signal = tokio::signal::ctrl_c() => match interrupted(signal) {
            Ok(()) => {
                info!("Interrupted, shutting down.");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Quitting: {:#}", e);
                ExitCode::FAILURE
            }
        }
    }
}

// A Ctrl-C handler that failed to install resolves at once; that is not an interrupt.
fn interrupted(signal: std::io::Result<()>) -> anyhow::Result<()> {
    signal.context("Failed to listen for Ctrl-C")
}

// Logs to the terminal and appends to the log file.
fn init_logging() -> anyhow::Result<()> {
    let log_file = std::env::var("MY2_LOG_FILE").unwrap_or_else(|_| "logs.log".to_string());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .with_context(|| format!("Failed to open log file {}", log_file))?;

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, Config::default(), file),
    ])
    .context("Failed to install the logger")?;
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    let settings_path = std::env::var("MY2_SETTINGS").unwrap_or_else(|_| "settings.json".to_string());
    let settings = Settings::load(&PathBuf::from(&settings_path))
        .with_context(|| format!("Failed to load settings from {}", settings_path))?;

    info!("Starting the grade checker.");

    let store = GradeStore::open(&settings.database)
        .with_context(|| format!("Failed to open database {}", settings.database.display()))?;

    let credential = if EnvCredentials::is_configured() {
        EnvCredentials.credential()
    } else {
        store.credential()
    }
    .context("Failed to read portal credentials")?;

    let notifier = TelegramNotifier::from_env()?;

    let session_config = SessionConfig {
        credential,
        endpoints: settings.endpoints()?,
        retry: settings.retry_policy(),
        timeout: settings.request_timeout(),
    };

    let poll = PollLoop::start(settings, session_config, store, Box::new(notifier))
        .await
        .context("Failed to log into the portal")?;

    match poll.run().await? {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn ctrl_c_counts_as_interrupt() {
        assert!(interrupted(Ok(())).is_ok());
    }

    #[test]
    fn failed_ctrl_c_listener_is_fatal() {
        let result = interrupted(Err(io::Error::new(io::ErrorKind::Other, "no signal driver")));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("Failed to listen for Ctrl-C"));
        assert!(message.contains("no signal driver"));
    }
}
