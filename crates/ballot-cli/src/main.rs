//! `ballot`: command-line surface for operators and demo voting sessions.

use ballot_core::BallotError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod context;
mod notifier;

mod commands {
    pub mod audit;
    pub mod ballot;
    pub mod init;
    pub mod registry;
}

use commands::audit::{AuditSubcommand, ReceiptsSubcommand};
use commands::registry::{CandidateSubcommand, VoterSubcommand};

#[derive(Parser)]
#[command(name = "ballot")]
#[command(about = "Secure Ballot - authenticated, single-use vote casting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Data directory (overrides configuration)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and ledger key
    Init,

    /// Voter registry
    Voter {
        #[command(subcommand)]
        command: VoterSubcommand,
    },

    /// Candidate registry
    Candidate {
        #[command(subcommand)]
        command: CandidateSubcommand,
    },

    /// One-time passcodes
    Otp {
        #[command(subcommand)]
        command: OtpSubcommand,
    },

    /// Cast a ballot (requires a validated passcode)
    Cast {
        /// Voter ID
        #[arg(long)]
        voter: String,

        /// Candidate ID
        #[arg(long)]
        candidate: u64,
    },

    /// Verify a receipt
    Verify {
        /// Receipt ID
        receipt_id: String,
    },

    /// Audit log
    Audit {
        #[command(subcommand)]
        command: AuditSubcommand,
    },

    /// Receipt ledger
    Receipts {
        #[command(subcommand)]
        command: ReceiptsSubcommand,
    },

    /// Show tally and turnout
    Results {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OtpSubcommand {
    /// Send a passcode to a registered address
    Send {
        /// Contact address
        address: String,
    },

    /// Check a passcode and open a voting session
    Validate {
        /// Contact address
        address: String,

        /// Passcode as received
        code: String,
    },
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = context::load_config(cli.config.as_deref(), cli.data_dir.as_deref())?;
    context::init_tracing(&config, cli.verbose);

    match cli.command {
        Commands::Init => commands::init::run(&config),
        Commands::Voter { command } => {
            commands::registry::handle_voter(&context::open(&config)?, command)
        }
        Commands::Candidate { command } => {
            commands::registry::handle_candidate(&context::open(&config)?, command)
        }
        Commands::Otp { command } => {
            let service = context::open(&config)?;
            match command {
                OtpSubcommand::Send { address } => commands::ballot::send_otp(&service, &address),
                OtpSubcommand::Validate { address, code } => {
                    commands::ballot::validate_otp(&service, &address, &code)
                }
            }
        }
        Commands::Cast { voter, candidate } => {
            commands::ballot::cast(&context::open(&config)?, &voter, candidate)
        }
        Commands::Verify { receipt_id } => {
            commands::ballot::verify(&context::open(&config)?, &receipt_id)
        }
        Commands::Audit { command } => commands::audit::handle_audit(&context::open(&config)?, command),
        Commands::Receipts { command } => {
            commands::audit::handle_receipts(&context::open(&config)?, command)
        }
        Commands::Results { json } => commands::ballot::results(&context::open(&config)?, json),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            match error.downcast_ref::<BallotError>() {
                Some(ballot) => eprintln!("[{}] {ballot}", ballot.severity()),
                None => eprintln!("[error] {error:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_subcommands_and_globals() {
        let cli = Cli::try_parse_from([
            "ballot", "--data-dir", "/tmp/b", "cast", "--voter", "V1", "--candidate", "5",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/b")));
        assert!(matches!(
            cli.command,
            Commands::Cast { ref voter, candidate: 5 } if voter == "V1"
        ));

        let cli = Cli::try_parse_from(["ballot", "otp", "validate", "a@x.com", "123456"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Otp { command: OtpSubcommand::Validate { .. } }
        ));
    }

    #[test]
    fn purge_requires_confirmation_flag_to_parse() {
        let cli = Cli::try_parse_from(["ballot", "audit", "purge"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Audit { command: AuditSubcommand::Purge { yes: false } }
        ));
    }

    #[test]
    fn init_is_idempotent_and_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = context::load_config(None, Some(dir.path())).unwrap();
        commands::init::run(&config).unwrap();
        let key = context::read_ledger_key(&config).unwrap().to_hex();
        commands::init::run(&config).unwrap();
        assert_eq!(context::read_ledger_key(&config).unwrap().to_hex(), key);

        context::open(&config)
            .unwrap()
            .register_voter("V1", "Ada", "a@x.com")
            .unwrap();
        let service = context::open(&config).unwrap();
        assert!(matches!(
            service.register_voter("V1", "Ada", "b@x.com"),
            Err(BallotError::Validation(_))
        ));
        assert!(service.send_otp("a@x.com").unwrap().delivered);
    }

    #[test]
    fn open_before_init_names_the_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = context::load_config(None, Some(dir.path())).unwrap();
        let error = context::open(&config).unwrap_err();
        assert!(error.to_string().contains("ballot init"));
        assert!(error.downcast_ref::<BallotError>().is_none());
    }
}
