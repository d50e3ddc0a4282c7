//! Configuration, logging and service wiring shared by every command.

use crate::notifier::ConsoleNotifier;
use anyhow::Context;
use ballot_casting::{BallotEffects, BallotService};
use ballot_core::{BallotConfig, BallotError, LedgerKey};
use ballot_effects::FilesystemStorageHandler;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Defaults, then the optional file, then `BALLOT_*` variables, then flags.
pub fn load_config(path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<BallotConfig> {
    let mut config = match path {
        Some(path) => BallotConfig::load_from_file(path).map_err(BallotError::from)?,
        None => BallotConfig::default(),
    };
    config.merge_with_env().map_err(BallotError::from)?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir.to_path_buf();
    }
    config.validate().map_err(BallotError::from)?;
    Ok(config)
}

/// Log to stderr; `RUST_LOG` wins over the configured filter.
pub fn init_tracing(config: &BallotConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.filter))
    };
    // A subscriber may already be installed when commands run inside tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read the hex-encoded ledger key written by `ballot init`.
pub fn read_ledger_key(config: &BallotConfig) -> anyhow::Result<LedgerKey> {
    let path = config.ledger_key_path();
    let encoded = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "Ledger key not found at {}; run `ballot init` first",
            path.display()
        )
    })?;
    Ok(LedgerKey::from_hex(&encoded).map_err(BallotError::from)?)
}

/// Service over the filesystem store in `storage.data_dir`.
pub fn open(config: &BallotConfig) -> anyhow::Result<BallotService> {
    let key = read_ledger_key(config)?;
    let storage =
        FilesystemStorageHandler::open(&config.storage.data_dir).map_err(BallotError::from)?;
    let effects = BallotEffects::production(Arc::new(storage), Arc::new(ConsoleNotifier));
    Ok(BallotService::new(effects, config, key)?)
}
