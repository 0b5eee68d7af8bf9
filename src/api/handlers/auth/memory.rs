//! In-process store backend for the hermetic test suite.
//!
//! Mirrors the Postgres semantics closely enough that the flow tests exercise
//! the same state machine: newest-live-challenge lookup, attempt counting,
//! revocation guards on rotation, and expiry purges.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{
    NewOtpChallenge, NewRefreshToken, OtpChallenge, OtpStore, RefreshTokenRecord,
    RefreshTokenStore, Role, UserRecord, UserStore,
};

#[derive(Default)]
pub(crate) struct MemoryAuthStore {
    users: Mutex<HashMap<Uuid, UserRecord>>,
    challenges: Mutex<Vec<OtpChallenge>>,
    tokens: Mutex<Vec<RefreshTokenRecord>>,
}

impl MemoryAuthStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all persisted refresh token rows, for assertions.
    pub(crate) async fn tokens_snapshot(&self) -> Vec<RefreshTokenRecord> {
        self.tokens.lock().await.clone()
    }

    /// Snapshot of all persisted challenges, for assertions.
    pub(crate) async fn challenges_snapshot(&self) -> Vec<OtpChallenge> {
        self.challenges.lock().await.clone()
    }
}

#[async_trait]
impl UserStore for MemoryAuthStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|user| user.phone == phone).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let users = self.users.lock().await;
        Ok(users.get(&id).cloned())
    }

    async fn create(&self, phone: &str, role: Role) -> Result<UserRecord> {
        let user = UserRecord {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            role,
            name: None,
            phone_verified: true,
        };
        self.users.lock().await.insert(user.id, user.clone());
        Ok(user)
    }

    async fn mark_phone_verified(&self, id: Uuid) -> Result<UserRecord> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| anyhow::anyhow!("user not found: {id}"))?;
        user.phone_verified = true;
        Ok(user.clone())
    }
}

#[async_trait]
impl OtpStore for MemoryAuthStore {
    async fn find_live(&self, phone: &str) -> Result<Option<OtpChallenge>> {
        let now = Utc::now();
        let challenges = self.challenges.lock().await;
        Ok(challenges
            .iter()
            .filter(|challenge| challenge.phone == phone && challenge.expires_at > now)
            .max_by_key(|challenge| challenge.expires_at)
            .cloned())
    }

    async fn insert(&self, challenge: NewOtpChallenge) -> Result<OtpChallenge> {
        let record = OtpChallenge {
            id: Uuid::new_v4(),
            phone: challenge.phone,
            code_hash: challenge.code_hash,
            expires_at: challenge.expires_at,
            attempts: 0,
        };
        self.challenges.lock().await.push(record.clone());
        Ok(record)
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i32>> {
        let mut challenges = self.challenges.lock().await;
        Ok(challenges
            .iter_mut()
            .find(|challenge| challenge.id == id)
            .map(|challenge| {
                challenge.attempts += 1;
                challenge.attempts
            }))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut challenges = self.challenges.lock().await;
        challenges.retain(|challenge| challenge.id != id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut challenges = self.challenges.lock().await;
        let before = challenges.len();
        challenges.retain(|challenge| challenge.expires_at > now);
        Ok((before - challenges.len()) as u64)
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryAuthStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let record = RefreshTokenRecord {
            id: token.id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            revoked_at: None,
            replaced_by_token_id: None,
            device: token.device,
        };
        self.tokens.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let now = Utc::now();
        let tokens = self.tokens.lock().await;
        Ok(tokens
            .iter()
            .find(|token| token.id == id && token.revoked_at.is_none() && token.expires_at > now)
            .cloned())
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>> {
        let now = Utc::now();
        // One lock held across check + insert + revoke stands in for the
        // single-transaction guarantee of the Postgres backend.
        let mut tokens = self.tokens.lock().await;

        let Some(position) = tokens
            .iter()
            .position(|token| token.id == old_id && token.revoked_at.is_none() && token.expires_at > now)
        else {
            return Ok(None);
        };

        let record = RefreshTokenRecord {
            id: replacement.id,
            user_id: replacement.user_id,
            token_hash: replacement.token_hash,
            expires_at: replacement.expires_at,
            revoked_at: None,
            replaced_by_token_id: None,
            device: replacement.device,
        };
        tokens.push(record.clone());

        let old = &mut tokens[position];
        old.revoked_at = Some(now);
        old.replaced_by_token_id = Some(record.id);

        Ok(Some(record))
    }

    async fn revoke(&self, id: Uuid) -> Result<()> {
        let mut tokens = self.tokens.lock().await;
        if let Some(token) = tokens
            .iter_mut()
            .find(|token| token.id == id && token.revoked_at.is_none())
        {
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().await;
        let before = tokens.len();
        tokens.retain(|token| token.expires_at > now);
        Ok((before - tokens.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::store::DeviceInfo;
    use chrono::Duration;

    fn new_token(user_id: Uuid, expires_in_days: i64) -> NewRefreshToken {
        NewRefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token_hash: "digest".to_string(),
            expires_at: Utc::now() + Duration::days(expires_in_days),
            device: DeviceInfo::default(),
        }
    }

    #[tokio::test]
    async fn find_live_returns_newest_challenge() -> Result<()> {
        let store = MemoryAuthStore::new();
        OtpStore::insert(
            &store,
            NewOtpChallenge {
                phone: "+15550001234".to_string(),
                code_hash: "old".to_string(),
                expires_at: Utc::now() + Duration::minutes(5),
            },
        )
        .await?;
        OtpStore::insert(
            &store,
            NewOtpChallenge {
                phone: "+15550001234".to_string(),
                code_hash: "new".to_string(),
                expires_at: Utc::now() + Duration::minutes(10),
            },
        )
        .await?;

        let live = store.find_live("+15550001234").await?;
        assert_eq!(live.map(|challenge| challenge.code_hash), Some("new".to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn expired_challenges_are_invisible_and_purgeable() -> Result<()> {
        let store = MemoryAuthStore::new();
        OtpStore::insert(
            &store,
            NewOtpChallenge {
                phone: "+15550001234".to_string(),
                code_hash: "stale".to_string(),
                expires_at: Utc::now() - Duration::minutes(1),
            },
        )
        .await?;

        assert!(store.find_live("+15550001234").await?.is_none());
        assert_eq!(OtpStore::purge_expired(&store).await?, 1);
        assert!(store.challenges_snapshot().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn rotate_admits_exactly_one_winner() -> Result<()> {
        let store = MemoryAuthStore::new();
        let user_id = Uuid::new_v4();
        let original = RefreshTokenStore::insert(&store, new_token(user_id, 30)).await?;

        let winner = store
            .rotate(original.id, new_token(user_id, 30))
            .await?
            .expect("first rotation wins");
        let loser = store.rotate(original.id, new_token(user_id, 30)).await?;
        assert!(loser.is_none());

        let snapshot = store.tokens_snapshot().await;
        let old = snapshot
            .iter()
            .find(|token| token.id == original.id)
            .expect("old token still recorded");
        assert!(old.revoked_at.is_some());
        assert_eq!(old.replaced_by_token_id, Some(winner.id));
        Ok(())
    }

    #[tokio::test]
    async fn revoke_is_idempotent() -> Result<()> {
        let store = MemoryAuthStore::new();
        let token = RefreshTokenStore::insert(&store, new_token(Uuid::new_v4(), 30)).await?;

        store.revoke(token.id).await?;
        let first = store
            .tokens_snapshot()
            .await
            .into_iter()
            .find(|record| record.id == token.id)
            .and_then(|record| record.revoked_at)
            .expect("token revoked");

        store.revoke(token.id).await?;
        let second = store
            .tokens_snapshot()
            .await
            .into_iter()
            .find(|record| record.id == token.id)
            .and_then(|record| record.revoked_at)
            .expect("token still revoked");
        assert_eq!(first, second);

        // Revoking an unknown id is a quiet no-op.
        store.revoke(Uuid::new_v4()).await?;
        Ok(())
    }
}
