//! External identities, OAuth `state` values and staged registrations

use aula_common::db::{unix_now, User};
use aula_common::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Sqlite};

/// User linked to a provider identity
pub async fn find_linked_user<'e, E>(
    executor: E,
    provider: &str,
    provider_account_id: &str,
) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM accounts a
        JOIN users u ON u.id = a.user_id
        WHERE a.provider = ? AND a.provider_account_id = ?
        "#,
    )
    .bind(provider)
    .bind(provider_account_id)
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

/// Link a provider identity to a user; an existing link is kept
pub async fn link_account<'e, E>(
    executor: E,
    provider: &str,
    provider_account_id: &str,
    user_id: &str,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO accounts (provider, provider_account_id, user_id, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(provider)
    .bind(provider_account_id)
    .bind(user_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn insert_oauth_state<'e, E>(
    executor: E,
    state: &str,
    provider: &str,
    expires_at: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT INTO oauth_states (state, provider, expires_at) VALUES (?, ?, ?)")
        .bind(state)
        .bind(provider)
        .bind(expires_at)
        .execute(executor)
        .await?;

    Ok(())
}

/// Consume a `state` value: returns `(provider, expires_at)` and deletes it
pub async fn take_oauth_state<'e, E>(executor: E, state: &str) -> Result<Option<(String, i64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, (String, i64)>(
        "DELETE FROM oauth_states WHERE state = ? RETURNING provider, expires_at",
    )
    .bind(state)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

pub async fn purge_expired_oauth_states<'e, E>(executor: E) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM oauth_states WHERE expires_at <= ?")
        .bind(unix_now())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Provider profile waiting for the user to confirm registration
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PendingRegistration {
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub provider: String,
    #[serde(skip_serializing)]
    pub provider_account_id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub expires_at: i64,
}

impl PendingRegistration {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_now()
    }
}

/// Stage a registration; a row with the same token is replaced
pub async fn insert_pending_registration<'e, E>(
    executor: E,
    pending: &PendingRegistration,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO pending_registrations (
            token_hash, provider, provider_account_id, email, name, image, expires_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&pending.token_hash)
    .bind(&pending.provider)
    .bind(&pending.provider_account_id)
    .bind(&pending.email)
    .bind(&pending.name)
    .bind(&pending.image)
    .bind(pending.expires_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Staged registration by token hash, expired or not
pub async fn find_pending_registration<'e, E>(
    executor: E,
    token_hash: &str,
) -> Result<Option<PendingRegistration>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pending = sqlx::query_as::<_, PendingRegistration>(
        "SELECT * FROM pending_registrations WHERE token_hash = ?",
    )
    .bind(token_hash)
    .fetch_optional(executor)
    .await?;

    Ok(pending)
}

pub async fn delete_pending_registration<'e, E>(executor: E, token_hash: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM pending_registrations WHERE token_hash = ?")
        .bind(token_hash)
        .execute(executor)
        .await?;

    Ok(())
}
