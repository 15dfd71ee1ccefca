//! Session rows (only the SHA-256 of the token is stored)

use aula_common::db::{unix_now, User};
use aula_common::Result;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

pub async fn insert_session<'e, E>(
    executor: E,
    token_hash: &str,
    user_id: &str,
    expires_at: i64,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// User owning an unexpired session
pub async fn find_session_user<'e, E>(executor: E, token_hash: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT u.*
        FROM sessions s
        JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = ? AND s.expires_at > ?
        "#,
    )
    .bind(token_hash)
    .bind(unix_now())
    .fetch_optional(executor)
    .await?;

    Ok(user)
}

pub async fn delete_session<'e, E>(executor: E, token_hash: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(token_hash)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Drop the user's expired sessions
pub async fn purge_expired_sessions<'e, E>(executor: E, user_id: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE user_id = ? AND expires_at <= ?")
        .bind(user_id)
        .bind(unix_now())
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}
