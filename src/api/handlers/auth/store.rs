//! Store seams and persistent record types for the auth subsystem.
//!
//! Handlers never talk to a connection directly; they go through these traits
//! so the Postgres backend and the in-process test backend stay
//! interchangeable.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of marketplace roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vendor,
    Customer,
    Admin,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vendor => "vendor",
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vendor" => Some(Self::Vendor),
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct UserRecord {
    pub id: Uuid,
    pub phone: String,
    pub role: Role,
    pub name: Option<String>,
    pub phone_verified: bool,
}

/// Pending proof-of-possession challenge for a phone number.
#[derive(Clone, Debug)]
pub struct OtpChallenge {
    pub id: Uuid,
    pub phone: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: i32,
}

#[derive(Clone, Debug)]
pub struct NewOtpChallenge {
    pub phone: String,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
}

/// Client metadata captured when a refresh token is issued.
#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub device_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by_token_id: Option<Uuid>,
    pub device: DeviceInfo,
}

/// A refresh token row about to be persisted. The id is chosen by the caller
/// so the opaque plaintext handed to the client can embed it.
#[derive(Clone, Debug)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub device: DeviceInfo,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserRecord>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>>;
    /// Create a user with a verified phone; first login doubles as signup.
    async fn create(&self, phone: &str, role: Role) -> Result<UserRecord>;
    async fn mark_phone_verified(&self, id: Uuid) -> Result<UserRecord>;
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Newest unexpired challenge for the phone, if any. Expired rows behave
    /// exactly like missing ones.
    async fn find_live(&self, phone: &str) -> Result<Option<OtpChallenge>>;
    async fn insert(&self, challenge: NewOtpChallenge) -> Result<OtpChallenge>;
    /// Bump the attempt counter, returning the new value. `None` means the
    /// challenge vanished underneath us (consumed or purged concurrently).
    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i32>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    /// Remove expired challenges; returns how many were purged.
    async fn purge_expired(&self) -> Result<u64>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord>;
    /// Record by id if not revoked and not expired.
    async fn find_active(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>>;
    /// Insert the replacement and revoke the old record in one atomic step.
    /// Returns `None` when the old record is no longer active, which is how a
    /// concurrent rotation loser finds out it lost.
    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>>;
    /// Mark a record revoked. Already-revoked records are left untouched.
    async fn revoke(&self, id: Uuid) -> Result<()>;
    /// Remove tokens past their expiry; returns how many were purged.
    async fn purge_expired(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Vendor, Role::Customer, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn role_rejects_unknown() {
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse(""), None);
        assert_eq!(Role::parse("Vendor"), None);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Vendor).expect("role serializes");
        assert_eq!(json, "\"vendor\"");
        let decoded: Role = serde_json::from_str("\"admin\"").expect("role deserializes");
        assert_eq!(decoded, Role::Admin);
    }
}
