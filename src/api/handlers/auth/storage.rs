//! Postgres-backed stores for users, OTP challenges, and refresh tokens.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::Instrument;
use uuid::Uuid;

use super::store::{
    DeviceInfo, NewOtpChallenge, NewRefreshToken, OtpChallenge, OtpStore, RefreshTokenRecord,
    RefreshTokenStore, Role, UserRecord, UserStore,
};

#[derive(Clone, Debug)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    Ok(UserRecord {
        id: row.get("id"),
        phone: row.get("phone"),
        role: Role::parse(&role).with_context(|| format!("unknown role in users row: {role}"))?,
        name: row.get("name"),
        phone_verified: row.get("phone_verified"),
    })
}

fn challenge_from_row(row: &PgRow) -> OtpChallenge {
    OtpChallenge {
        id: row.get("id"),
        phone: row.get("phone"),
        code_hash: row.get("code_hash"),
        expires_at: row.get("expires_at"),
        attempts: row.get("attempts"),
    }
}

fn refresh_from_row(row: &PgRow) -> RefreshTokenRecord {
    RefreshTokenRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        token_hash: row.get("token_hash"),
        expires_at: row.get("expires_at"),
        revoked_at: row.get("revoked_at"),
        replaced_by_token_id: row.get("replaced_by_token_id"),
        device: DeviceInfo {
            device_id: row.get("device_id"),
            user_agent: row.get("user_agent"),
            ip: row.get("ip"),
        },
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

#[async_trait]
impl UserStore for PgAuthStore {
    async fn find_by_phone(&self, phone: &str) -> Result<Option<UserRecord>> {
        let query = r"
            SELECT id, phone, role, name, phone_verified
            FROM users
            WHERE phone = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(phone)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by phone")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>> {
        let query = r"
            SELECT id, phone, role, name, phone_verified
            FROM users
            WHERE id = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup user by id")?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create(&self, phone: &str, role: Role) -> Result<UserRecord> {
        let query = r"
            INSERT INTO users (id, phone, role, phone_verified)
            VALUES ($1, $2, $3, TRUE)
            RETURNING id, phone, role, name, phone_verified
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(phone)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert user")?;
        user_from_row(&row)
    }

    async fn mark_phone_verified(&self, id: Uuid) -> Result<UserRecord> {
        let query = r"
            UPDATE users
            SET phone_verified = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING id, phone, role, name, phone_verified
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_one(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to mark phone verified")?;
        user_from_row(&row)
    }
}

#[async_trait]
impl OtpStore for PgAuthStore {
    async fn find_live(&self, phone: &str) -> Result<Option<OtpChallenge>> {
        // Newest challenge wins: a racing earlier create becomes unverifiable.
        let query = r"
            SELECT id, phone, code_hash, expires_at, attempts
            FROM otp_challenges
            WHERE phone = $1
              AND expires_at > NOW()
            ORDER BY expires_at DESC
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(phone)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup live OTP challenge")?;
        Ok(row.as_ref().map(challenge_from_row))
    }

    async fn insert(&self, challenge: NewOtpChallenge) -> Result<OtpChallenge> {
        let query = r"
            INSERT INTO otp_challenges (id, phone, code_hash, expires_at, attempts)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING id, phone, code_hash, expires_at, attempts
        ";
        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(&challenge.phone)
            .bind(&challenge.code_hash)
            .bind(challenge.expires_at)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert OTP challenge")?;
        Ok(challenge_from_row(&row))
    }

    async fn increment_attempts(&self, id: Uuid) -> Result<Option<i32>> {
        let query = r"
            UPDATE otp_challenges
            SET attempts = attempts + 1
            WHERE id = $1
            RETURNING attempts
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to increment OTP attempts")?;
        Ok(row.map(|row| row.get("attempts")))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let query = "DELETE FROM otp_challenges WHERE id = $1";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete OTP challenge")?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let query = "DELETE FROM otp_challenges WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to purge expired OTP challenges")?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RefreshTokenStore for PgAuthStore {
    async fn insert(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let query = r"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, expires_at, device_id, user_agent, ip)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, token_hash, expires_at, revoked_at,
                      replaced_by_token_id, device_id, user_agent, ip
        ";
        let row = sqlx::query(query)
            .bind(token.id)
            .bind(token.user_id)
            .bind(&token.token_hash)
            .bind(token.expires_at)
            .bind(&token.device.device_id)
            .bind(&token.device.user_agent)
            .bind(&token.device.ip)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert refresh token")?;
        Ok(refresh_from_row(&row))
    }

    async fn find_active(&self, id: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let query = r"
            SELECT id, user_id, token_hash, expires_at, revoked_at,
                   replaced_by_token_id, device_id, user_agent, ip
            FROM refresh_tokens
            WHERE id = $1
              AND revoked_at IS NULL
              AND expires_at > NOW()
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup refresh token")?;
        Ok(row.as_ref().map(refresh_from_row))
    }

    async fn rotate(
        &self,
        old_id: Uuid,
        replacement: NewRefreshToken,
    ) -> Result<Option<RefreshTokenRecord>> {
        // One transaction so there is no window with both tokens usable, and
        // no window with neither.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin rotate transaction")?;

        let insert_query = r"
            INSERT INTO refresh_tokens
                (id, user_id, token_hash, expires_at, device_id, user_agent, ip)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, token_hash, expires_at, revoked_at,
                      replaced_by_token_id, device_id, user_agent, ip
        ";
        let row = sqlx::query(insert_query)
            .bind(replacement.id)
            .bind(replacement.user_id)
            .bind(&replacement.token_hash)
            .bind(replacement.expires_at)
            .bind(&replacement.device.device_id)
            .bind(&replacement.device.user_agent)
            .bind(&replacement.device.ip)
            .fetch_one(&mut *tx)
            .instrument(query_span("INSERT", insert_query))
            .await
            .context("failed to insert replacement refresh token")?;
        let new_record = refresh_from_row(&row);

        // The revoked_at guard decides concurrent rotations: exactly one
        // caller sees a row here.
        let revoke_query = r"
            UPDATE refresh_tokens
            SET revoked_at = NOW(), replaced_by_token_id = $2
            WHERE id = $1
              AND revoked_at IS NULL
              AND expires_at > NOW()
        ";
        let result = sqlx::query(revoke_query)
            .bind(old_id)
            .bind(new_record.id)
            .execute(&mut *tx)
            .instrument(query_span("UPDATE", revoke_query))
            .await
            .context("failed to revoke rotated refresh token")?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .context("failed to roll back lost rotation")?;
            return Ok(None);
        }

        tx.commit().await.context("failed to commit rotation")?;
        Ok(Some(new_record))
    }

    async fn revoke(&self, id: Uuid) -> Result<()> {
        let query = r"
            UPDATE refresh_tokens
            SET revoked_at = NOW()
            WHERE id = $1
              AND revoked_at IS NULL
        ";
        sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to revoke refresh token")?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let query = "DELETE FROM refresh_tokens WHERE expires_at <= NOW()";
        let result = sqlx::query(query)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to purge expired refresh tokens")?;
        Ok(result.rows_affected())
    }
}
