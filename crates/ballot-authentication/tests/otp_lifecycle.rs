//! Passcode lifecycle: issue, lockout, expiry and delivery failure.

use assert_matches::assert_matches;
use ballot_authentication::OtpAuthenticator;
use ballot_core::config::OtpConfig;
use ballot_core::{
    AuthError, BallotError, ContactAddress, NotificationEffects, StorageEffects, ValidationError,
    WriteBatch,
};
use ballot_journal::{AuditEventType, AuditLog};
use ballot_registry::StoredVoterDirectory;
use ballot_testkit::{FailingNotifier, TestEffects};
use std::sync::Arc;

struct Fixture {
    effects: TestEffects,
    audit: Arc<AuditLog>,
    otp: OtpAuthenticator,
}

fn build(effects: TestEffects, notifier: Arc<dyn NotificationEffects>) -> Fixture {
    let voters = Arc::new(StoredVoterDirectory::new(
        effects.storage.clone(),
        effects.clock.clone(),
    ));
    voters.register("V1", "Ada", "a@x.com").unwrap();
    let audit = Arc::new(AuditLog::new(
        effects.storage.clone(),
        effects.clock.clone(),
        effects.random.clone(),
    ));
    let otp = OtpAuthenticator::new(
        voters,
        effects.storage.clone(),
        effects.clock.clone(),
        effects.random.clone(),
        notifier,
        audit.clone(),
        OtpConfig::default(),
    );
    Fixture {
        effects,
        audit,
        otp,
    }
}

fn fixture() -> Fixture {
    let effects = TestEffects::deterministic(21, 1_000);
    let notifier = effects.notifier.clone();
    build(effects, notifier)
}

fn fixture_with_failing_delivery() -> Fixture {
    build(TestEffects::deterministic(21, 1_000), Arc::new(FailingNotifier))
}

fn wrong(code: &str) -> String {
    code.chars()
        .map(|c| if c == '0' { '1' } else { '0' })
        .collect()
}

fn events(audit: &AuditLog) -> Vec<AuditEventType> {
    let mut events: Vec<_> = audit.query().unwrap().iter().map(|e| e.event_type).collect();
    events.reverse();
    events
}

#[test]
fn three_mismatches_lock_until_reissued() {
    let f = fixture();
    let issued = f.otp.send("a@x.com").unwrap();
    assert!(issued.delivered);
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_digit()));

    for remaining in [2, 1, 0] {
        assert_matches!(
            f.otp.validate("a@x.com", &wrong(&code)),
            Err(BallotError::Auth(AuthError::Mismatch { remaining_attempts })) if remaining_attempts == remaining
        );
    }
    assert_matches!(
        f.otp.validate("a@x.com", &code),
        Err(BallotError::Auth(AuthError::Locked))
    );

    f.otp.send("a@x.com").unwrap();
    let address = ContactAddress::parse("a@x.com").unwrap();
    assert_eq!(f.otp.record(&address).unwrap().unwrap().attempts, 0);
    let fresh = f.effects.notifier.last_code_for("a@x.com").unwrap();
    f.otp.validate("a@x.com", &fresh).unwrap();
}

#[test]
fn success_consumes_the_code() {
    let f = fixture();
    f.otp.send("A@X.com").unwrap();
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();
    f.otp.validate(" a@x.com", &code).unwrap();
    assert_matches!(
        f.otp.validate("a@x.com", &code),
        Err(BallotError::Auth(AuthError::NoActiveCode))
    );
    assert_eq!(
        events(&f.audit),
        vec![
            AuditEventType::OtpSent,
            AuditEventType::OtpValidateSuccess,
            AuditEventType::OtpValidateFail
        ]
    );
}

#[test]
fn expired_code_fails_and_is_purged() {
    let f = fixture();
    f.otp.send("a@x.com").unwrap();
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();

    f.effects.clock.advance_secs(300);
    f.effects.clock.advance_millis(1);
    assert_matches!(
        f.otp.validate("a@x.com", &code),
        Err(BallotError::Auth(AuthError::Expired))
    );
    assert_matches!(
        f.otp.validate("a@x.com", &code),
        Err(BallotError::Auth(AuthError::NoActiveCode))
    );
}

#[test]
fn code_is_valid_at_the_expiry_instant() {
    let f = fixture();
    f.otp.send("a@x.com").unwrap();
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();
    f.effects.clock.advance_secs(300);
    f.otp.validate("a@x.com", &code).unwrap();
}

#[test]
fn resend_invalidates_previous_code() {
    let f = fixture();
    f.otp.send("a@x.com").unwrap();
    let first = f.effects.notifier.last_code_for("a@x.com").unwrap();
    f.otp.send("a@x.com").unwrap();
    let second = f.effects.notifier.last_code_for("a@x.com").unwrap();
    if first != second {
        assert_matches!(
            f.otp.validate("a@x.com", &first),
            Err(BallotError::Auth(AuthError::Mismatch { .. }))
        );
    }
    f.otp.validate("a@x.com", &second).unwrap();
}

#[test]
fn unregistered_address_is_rejected_and_audited() {
    let f = fixture();
    assert_matches!(
        f.otp.send("nobody@x.com"),
        Err(BallotError::Auth(AuthError::UnregisteredAddress))
    );
    assert_eq!(events(&f.audit), vec![AuditEventType::OtpSendFail]);
    assert_eq!(f.effects.notifier.delivery_count(), 0);
}

#[test]
fn blank_input_is_a_validation_error_and_not_an_attempt() {
    let f = fixture();
    f.otp.send("a@x.com").unwrap();
    assert_matches!(
        f.otp.validate("a@x.com", "   "),
        Err(BallotError::Validation(ValidationError::EmptyField { .. }))
    );
    assert_matches!(
        f.otp.send(""),
        Err(BallotError::Validation(ValidationError::EmptyField { .. }))
    );
    let address = ContactAddress::parse("a@x.com").unwrap();
    assert_eq!(f.otp.record(&address).unwrap().unwrap().attempts, 0);
}

#[test]
fn delivery_failure_keeps_the_record() {
    let f = fixture_with_failing_delivery();
    let issued = f.otp.send("a@x.com").unwrap();
    assert!(!issued.delivered);

    let address = ContactAddress::parse("a@x.com").unwrap();
    let record = f.otp.record(&address).unwrap().unwrap();
    assert_eq!(record.expires_at, issued.expires_at);
    assert_eq!(
        events(&f.audit),
        vec![AuditEventType::OtpSent, AuditEventType::OtpDeliveryFail]
    );

    f.otp.validate("a@x.com", record.code.expose()).unwrap();
}

#[test]
fn concurrent_guesses_cannot_exceed_the_attempt_cap() {
    let f = Arc::new(fixture());
    f.otp.send("a@x.com").unwrap();
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();
    let bad = wrong(&code);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let f = f.clone();
            let bad = bad.clone();
            std::thread::spawn(move || f.otp.validate("a@x.com", &bad))
        })
        .collect();
    let mismatches = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|r| matches!(r, Err(BallotError::Auth(AuthError::Mismatch { .. }))))
        .count();

    assert_eq!(mismatches, 3);
    let address = ContactAddress::parse("a@x.com").unwrap();
    assert_eq!(f.otp.record(&address).unwrap().unwrap().attempts, 3);
}

#[test]
fn staged_acceptance_consumes_code_only_when_applied() {
    let f = fixture();
    f.otp.send("a@x.com").unwrap();
    let code = f.effects.notifier.last_code_for("a@x.com").unwrap();
    let address = ContactAddress::parse("a@x.com").unwrap();

    let mut batch = WriteBatch::new();
    let accepted = f.otp.stage_validate("a@x.com", &code, &mut batch).unwrap();
    drop(accepted);
    assert!(f.otp.record(&address).unwrap().is_some());

    let mut batch = WriteBatch::new();
    let accepted = f.otp.stage_validate("a@x.com", &code, &mut batch).unwrap();
    assert_eq!(accepted.address(), &address);
    f.effects.storage.apply_batch(batch).unwrap();
    accepted.record_accepted();

    assert!(f.otp.record(&address).unwrap().is_none());
    assert_eq!(events(&f.audit).last(), Some(&AuditEventType::OtpValidateSuccess));
}
