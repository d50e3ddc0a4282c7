//! Single-use voting sessions
//!
//! A session is the bridge between a passcode check and one cast attempt. It
//! lives at `sessions/<address>`, is overwritten by a new grant, and is removed
//! by the first cast attempt whatever its outcome.

use ballot_core::config::SessionConfig;
use ballot_core::effects::{StorageEffects, StorageExt, TimeEffects, WriteBatch};
use ballot_core::{ContactAddress, Result, StripedLocks, Timestamp};
use ballot_journal::{AuditEvent, AuditEventType, AuditLog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SESSION_PREFIX: &str = "sessions/";

fn session_key(address: &ContactAddress) -> String {
    format!("{SESSION_PREFIX}{}", address.as_str())
}

/// Authorization window for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authorized address
    pub address: ContactAddress,
    /// When the passcode was accepted
    pub granted_at: Timestamp,
    /// Last instant a cast attempt is accepted
    pub expires_at: Timestamp,
}

impl Session {
    /// True while `now` is within the window (inclusive).
    pub fn is_live(&self, now: Timestamp) -> bool {
        now <= self.expires_at
    }
}

/// Grants, checks and revokes sessions.
pub struct SessionGate {
    storage: Arc<dyn StorageEffects>,
    time: Arc<dyn TimeEffects>,
    audit: Arc<AuditLog>,
    config: SessionConfig,
    address_locks: StripedLocks,
}

impl SessionGate {
    /// Create a gate with the configured window length.
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn TimeEffects>,
        audit: Arc<AuditLog>,
        config: SessionConfig,
    ) -> Self {
        Self {
            storage,
            time,
            audit,
            config,
            address_locks: StripedLocks::default(),
        }
    }

    /// Open a window for `address`, replacing any existing one.
    ///
    /// Call only after a successful passcode check.
    pub fn grant(&self, address: &ContactAddress) -> Result<Session> {
        let _guard = self.address_locks.lock(address);
        let mut batch = WriteBatch::new();
        let session = self.stage_grant(address, &mut batch)?;
        self.storage.apply_batch(batch)?;
        self.record_granted(&session);
        Ok(session)
    }

    /// Add a fresh window for `address` to `batch` and return it.
    ///
    /// After the batch commits, call [`record_granted`](Self::record_granted).
    pub fn stage_grant(
        &self,
        address: &ContactAddress,
        batch: &mut WriteBatch,
    ) -> Result<Session> {
        let granted_at = self.time.now();
        let session = Session {
            address: address.clone(),
            granted_at,
            expires_at: granted_at.plus_secs(self.config.ttl_secs),
        };
        batch.put_json(session_key(address), &session)?;
        Ok(session)
    }

    /// Log and audit a grant that was committed through a batch.
    pub fn record_granted(&self, session: &Session) {
        tracing::info!(
            address = %session.address,
            expires_at = session.expires_at.as_millis(),
            "Session granted"
        );
        self.audit.append(AuditEvent::success(
            AuditEventType::SessionGranted,
            &session.address,
            "",
        ));
    }

    /// Whether `address` holds a live session. An expired one is removed.
    pub fn check(&self, address: &ContactAddress) -> Result<bool> {
        let _guard = self.address_locks.lock(address);
        let key = session_key(address);
        match self.storage.get_json::<Session>(&key)? {
            Some(session) if session.is_live(self.time.now()) => Ok(true),
            Some(_) => {
                self.storage.remove(&key)?;
                tracing::debug!(address = %address, "Expired session reclaimed");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Remove the session for `address`; returns whether one existed.
    pub fn revoke(&self, address: &ContactAddress) -> Result<bool> {
        let _guard = self.address_locks.lock(address);
        let existed = self.storage.remove(&session_key(address))?;
        if existed {
            self.record_revoked(address);
        }
        Ok(existed)
    }

    /// Add removal of the session for `address` to `batch`.
    ///
    /// After the batch commits, call [`record_revoked`](Self::record_revoked).
    pub fn stage_revoke(&self, address: &ContactAddress, batch: &mut WriteBatch) {
        batch.delete(session_key(address));
    }

    /// Log and audit a revocation that was committed through a batch.
    pub fn record_revoked(&self, address: &ContactAddress) {
        tracing::info!(address = %address, "Session revoked");
        self.audit
            .append(AuditEvent::success(AuditEventType::SessionRevoked, address, ""));
    }

    /// Stored session for `address`, live or not.
    pub fn session(&self, address: &ContactAddress) -> Result<Option<Session>> {
        Ok(self.storage.get_json(&session_key(address))?)
    }
}

impl std::fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
