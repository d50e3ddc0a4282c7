//! `ballot audit ...` and `ballot receipts ...`

use anyhow::{bail, Context};
use ballot_casting::BallotService;
use ballot_journal::ExportFormat;
use clap::{Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Csv,
}

impl From<Format> for ExportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => ExportFormat::Json,
            Format::Csv => ExportFormat::Csv,
        }
    }
}

#[derive(Subcommand)]
pub enum AuditSubcommand {
    /// Export the audit log, newest first
    Export {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete every audit entry (administrative)
    Purge {
        /// Confirm the purge
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ReceiptsSubcommand {
    /// Export receipts without voter identities, oldest first
    Export {
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn handle_audit(service: &BallotService, command: AuditSubcommand) -> anyhow::Result<()> {
    match command {
        AuditSubcommand::Export { format, output } => {
            emit(&service.export_audit_log(format.into())?, output)
        }
        AuditSubcommand::Purge { yes } => {
            if !yes {
                bail!("Refusing to purge the audit log without --yes");
            }
            let removed = service.admin().purge_audit_log()?;
            println!("Purged {removed} audit entries");
            Ok(())
        }
    }
}

pub fn handle_receipts(service: &BallotService, command: ReceiptsSubcommand) -> anyhow::Result<()> {
    match command {
        ReceiptsSubcommand::Export { format, output } => {
            emit(&service.export_receipts(format.into())?, output)
        }
    }
}

fn emit(rendered: &str, output: Option<PathBuf>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
