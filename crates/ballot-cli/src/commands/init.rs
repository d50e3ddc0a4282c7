//! `ballot init`

use anyhow::Context;
use ballot_core::{BallotConfig, LedgerKey};
use ballot_effects::RealRandomHandler;
use std::fs;
use std::io::Write;

pub fn run(config: &BallotConfig) -> anyhow::Result<()> {
    let data_dir = &config.storage.data_dir;
    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let key_path = config.ledger_key_path();
    if key_path.exists() {
        println!("Ledger key already present at {}", key_path.display());
        return Ok(());
    }
    if let Some(parent) = key_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let key = LedgerKey::generate(&RealRandomHandler::new());
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(&key_path)
        .with_context(|| format!("Failed to create {}", key_path.display()))?;
    writeln!(file, "{}", key.to_hex())
        .with_context(|| format!("Failed to write {}", key_path.display()))?;

    tracing::info!(path = %key_path.display(), "Ledger key generated");
    println!("Initialized ballot data in {}", data_dir.display());
    Ok(())
}
