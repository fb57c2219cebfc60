//! Postgres-backed credential store.
//!
//! Every query carries a `db.query` span. Token consumption locks the token
//! row so exactly one redeemer wins under concurrency.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::model::{NewUser, Role, TokenPurpose, User, UserMutation, UserStatus, UserUpdate};
use super::store::{
    ActionTokenRecord, ConsumeOutcome, CredentialStore, InsertUserOutcome, TokenState,
};

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn user_from_row(row: &PgRow) -> Result<User> {
    let status_text: String = row.get("status");
    let status = UserStatus::parse(&status_text)
        .ok_or_else(|| anyhow!("unknown user status: {status_text}"))?;

    let roles_text: Vec<String> = row.get("roles");
    let roles = roles_text
        .iter()
        .map(|role| Role::parse(role).ok_or_else(|| anyhow!("unknown role: {role}")))
        .collect::<Result<Vec<_>>>()?;

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        status,
        roles,
        email_confirmed: row.get("email_confirmed"),
    })
}

fn roles_to_text(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|role| role.as_str().to_string()).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = r"
            SELECT id, name, email, phone, password_hash, status::text AS status, roles,
                   (email_confirmed_at IS NOT NULL) AS email_confirmed
            FROM users
            WHERE email = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let query = r"
            SELECT id, name, email, phone, password_hash, status::text AS status, roles,
                   (email_confirmed_at IS NOT NULL) AS email_confirmed
            FROM users
            WHERE id = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by id")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<InsertUserOutcome> {
        let query = r"
            INSERT INTO users (name, email, phone, password_hash, roles)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, password_hash, status::text AS status, roles,
                      (email_confirmed_at IS NOT NULL) AS email_confirmed
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.phone)
            .bind(&new_user.password_hash)
            .bind(roles_to_text(&new_user.roles))
            .fetch_one(&self.pool)
            .instrument(span)
            .await;

        match row {
            Ok(row) => Ok(InsertUserOutcome::Created(user_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertUserOutcome::EmailTaken),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<Option<User>> {
        let query = r"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                roles = COALESCE($4, roles),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, status::text AS status, roles,
                      (email_confirmed_at IS NOT NULL) AS email_confirmed
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let roles = update.roles.as_deref().map(roles_to_text);
        let row = sqlx::query(query)
            .bind(id)
            .bind(update.name)
            .bind(update.phone)
            .bind(roles)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        // Pending tokens go with the row via ON DELETE CASCADE.
        let query = "DELETE FROM users WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<Option<User>> {
        let query = r"
            UPDATE users
            SET status = $2::user_status, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, status::text AS status, roles,
                      (email_confirmed_at IS NOT NULL) AS email_confirmed
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to update user status")?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_by_roles(&self, roles: &[Role]) -> Result<Vec<User>> {
        let rows = if roles.is_empty() {
            let query = r"
                SELECT id, name, email, phone, password_hash, status::text AS status, roles,
                       (email_confirmed_at IS NOT NULL) AS email_confirmed
                FROM users
                ORDER BY id
            ";
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            sqlx::query(query)
                .fetch_all(&self.pool)
                .instrument(span)
                .await
                .context("failed to list users")?
        } else {
            // && is array overlap: any shared role qualifies.
            let query = r"
                SELECT id, name, email, phone, password_hash, status::text AS status, roles,
                       (email_confirmed_at IS NOT NULL) AS email_confirmed
                FROM users
                WHERE roles && $1
                ORDER BY id
            ";
            let span = tracing::info_span!(
                "db.query",
                db.system = "postgresql",
                db.operation = "SELECT",
                db.statement = query
            );
            sqlx::query(query)
                .bind(roles_to_text(roles))
                .fetch_all(&self.pool)
                .instrument(span)
                .await
                .context("failed to list users by role")?
        };

        rows.iter().map(user_from_row).collect()
    }

    async fn supersede_action_token(
        &self,
        user_id: i64,
        purpose: TokenPurpose,
        token_hash: &[u8],
        payload: Option<&str>,
        ttl_seconds: i64,
    ) -> Result<()> {
        // Transaction keeps "at most one pending token per (user, purpose)"
        // true even when two requests race.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin supersede transaction")?;

        let query = r"
            DELETE FROM action_tokens
            WHERE user_id = $1 AND purpose = $2::token_purpose AND consumed_at IS NULL
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DELETE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(purpose.as_str())
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to delete superseded tokens")?;

        let query = r"
            INSERT INTO action_tokens (user_id, token_hash, purpose, payload, expires_at)
            VALUES ($1, $2, $3::token_purpose, $4, NOW() + ($5 * INTERVAL '1 second'))
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(user_id)
            .bind(token_hash)
            .bind(purpose.as_str())
            .bind(payload)
            .bind(ttl_seconds)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to insert action token")?;

        tx.commit().await.context("commit supersede transaction")?;

        Ok(())
    }

    async fn find_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
    ) -> Result<Option<ActionTokenRecord>> {
        let query = r"
            SELECT user_id, payload,
                   (consumed_at IS NOT NULL) AS consumed,
                   (expires_at <= NOW()) AS expired
            FROM action_tokens
            WHERE token_hash = $1 AND purpose = $2::token_purpose
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup action token")?;

        Ok(row.map(|row| {
            // Consumed wins over expired: a redeemed token stays "used".
            let state = if row.get::<bool, _>("consumed") {
                TokenState::Consumed
            } else if row.get::<bool, _>("expired") {
                TokenState::Expired
            } else {
                TokenState::Valid
            };
            ActionTokenRecord {
                user_id: row.get("user_id"),
                payload: row.get("payload"),
                state,
            }
        }))
    }

    async fn consume_action_token(
        &self,
        token_hash: &[u8],
        purpose: TokenPurpose,
        mutation: UserMutation,
    ) -> Result<ConsumeOutcome> {
        let mut tx = self.pool.begin().await.context("begin consume transaction")?;

        // FOR UPDATE serializes concurrent redeemers on the token row; the
        // loser re-reads the committed consumed_at and bails out below.
        let query = r"
            SELECT user_id,
                   (consumed_at IS NOT NULL) AS consumed,
                   (expires_at <= NOW()) AS expired
            FROM action_tokens
            WHERE token_hash = $1 AND purpose = $2::token_purpose
            FOR UPDATE
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(token_hash)
            .bind(purpose.as_str())
            .fetch_optional(&mut *tx)
            .instrument(span)
            .await
            .context("failed to lock action token")?;

        let Some(row) = row else {
            return Ok(ConsumeOutcome::NotFound);
        };
        if row.get::<bool, _>("consumed") {
            return Ok(ConsumeOutcome::AlreadyConsumed);
        }
        if row.get::<bool, _>("expired") {
            return Ok(ConsumeOutcome::Expired);
        }
        let user_id: i64 = row.get("user_id");

        let query = r"
            UPDATE action_tokens
            SET consumed_at = NOW()
            WHERE token_hash = $1
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(token_hash)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to consume action token")?;

        let result = match &mutation {
            UserMutation::SetPasswordHash(password_hash) => {
                let query = r"
                    UPDATE users
                    SET password_hash = $2, updated_at = NOW()
                    WHERE id = $1
                ";
                let span = tracing::info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(user_id)
                    .bind(password_hash)
                    .execute(&mut *tx)
                    .instrument(span)
                    .await
            }
            UserMutation::SetEmail(email) => {
                let query = r"
                    UPDATE users
                    SET email = $2, email_confirmed_at = NOW(), updated_at = NOW()
                    WHERE id = $1
                ";
                let span = tracing::info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(user_id)
                    .bind(email)
                    .execute(&mut *tx)
                    .instrument(span)
                    .await
            }
            UserMutation::ConfirmEmail => {
                let query = r"
                    UPDATE users
                    SET email_confirmed_at = NOW(), updated_at = NOW()
                    WHERE id = $1
                ";
                let span = tracing::info_span!(
                    "db.query",
                    db.system = "postgresql",
                    db.operation = "UPDATE",
                    db.statement = query
                );
                sqlx::query(query)
                    .bind(user_id)
                    .execute(&mut *tx)
                    .instrument(span)
                    .await
            }
        };

        if let Err(err) = result {
            if is_unique_violation(&err) {
                // Another account claimed the email first. Roll back so the
                // token stays pending.
                let _ = tx.rollback().await;
                return Ok(ConsumeOutcome::EmailTaken);
            }
            return Err(err).context("failed to apply token mutation");
        }

        tx.commit().await.context("commit consume transaction")?;

        Ok(ConsumeOutcome::Applied { user_id })
    }
}
