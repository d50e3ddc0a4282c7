//! Voter-facing commands: passcodes, casting, verification and results.

use ballot_casting::BallotService;
use ballot_core::CandidateId;
use ballot_journal::export::rfc3339;

pub fn send_otp(service: &BallotService, address: &str) -> anyhow::Result<()> {
    let issued = service.send_otp(address)?;
    if issued.delivered {
        println!(
            "Passcode sent to {}; valid until {}",
            issued.address,
            rfc3339(issued.expires_at)
        );
    } else {
        eprintln!(
            "[warning] Passcode issued for {} but delivery failed; request a new one",
            issued.address
        );
    }
    Ok(())
}

pub fn validate_otp(service: &BallotService, address: &str, code: &str) -> anyhow::Result<()> {
    let session = service.validate_otp(address, code)?;
    println!(
        "Passcode accepted. You may cast one ballot until {}",
        rfc3339(session.expires_at)
    );
    Ok(())
}

pub fn cast(service: &BallotService, voter: &str, candidate: u64) -> anyhow::Result<()> {
    let receipt = service.cast(voter, CandidateId::new(candidate))?;
    println!("Ballot cast for {}", receipt.candidate_name);
    println!("Receipt ID:    {}", receipt.receipt_id);
    println!("Cast at:       {}", rfc3339(receipt.timestamp));
    println!("Integrity tag: {}", receipt.integrity_tag);
    Ok(())
}

pub fn verify(service: &BallotService, receipt_id: &str) -> anyhow::Result<()> {
    let verified = service.verify_receipt(receipt_id)?;
    println!(
        "Receipt verified: ballot for {} counted at {}",
        verified.candidate_name,
        rfc3339(verified.timestamp)
    );
    Ok(())
}

pub fn results(service: &BallotService, json: bool) -> anyhow::Result<()> {
    let summary = service.results()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    for (rank, row) in summary.candidates.iter().enumerate() {
        println!(
            "{:>2}. {:<24} {:<16} {:>6} votes {:>5.1}%",
            rank + 1,
            row.name,
            row.party,
            row.votes,
            row.percentage
        );
    }
    println!("Total votes cast: {}", summary.total_votes);
    println!(
        "Voters participated: {} / {}",
        summary.voters_participated, summary.registered_voters
    );
    println!("Turnout: {:.2}%", summary.turnout_percentage);
    Ok(())
}
