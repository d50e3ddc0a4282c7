//! `ballot voter ...` and `ballot candidate ...`

use ballot_casting::BallotService;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum VoterSubcommand {
    /// Register a voter
    Add {
        /// Voter ID
        #[arg(long)]
        id: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Contact address for passcodes
        #[arg(long)]
        address: String,
    },

    /// List registered voters
    List,
}

#[derive(Subcommand)]
pub enum CandidateSubcommand {
    /// Register a candidate
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Party affiliation
        #[arg(long, default_value = "")]
        party: String,

        /// Ballot symbol
        #[arg(long, default_value = "")]
        symbol: String,
    },

    /// List candidates with their ids
    List,
}

pub fn handle_voter(service: &BallotService, command: VoterSubcommand) -> anyhow::Result<()> {
    match command {
        VoterSubcommand::Add { id, name, address } => {
            let voter = service.register_voter(&id, &name, &address)?;
            println!("Registered voter {} ({})", voter.voter_id, voter.address);
        }
        VoterSubcommand::List => {
            for voter in service.admin().voters()? {
                let status = if voter.has_voted { "voted" } else { "not voted" };
                println!("{}\t{}\t{}\t{status}", voter.voter_id, voter.name, voter.address);
            }
        }
    }
    Ok(())
}

pub fn handle_candidate(service: &BallotService, command: CandidateSubcommand) -> anyhow::Result<()> {
    match command {
        CandidateSubcommand::Add {
            name,
            party,
            symbol,
        } => {
            let candidate = service.register_candidate(&name, &party, &symbol)?;
            println!("Registered candidate {} with id {}", candidate.name, candidate.id);
        }
        CandidateSubcommand::List => {
            for candidate in service.candidates()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    candidate.id, candidate.name, candidate.party, candidate.symbol
                );
            }
        }
    }
    Ok(())
}
