//! In-app notifications

use aula_common::db::Notification;
use aula_common::Result;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

use super::new_id;

/// Notification kinds
pub const KIND_ENROLLMENT: &str = "enrollment";
pub const KIND_ACHIEVEMENT: &str = "achievement";
pub const KIND_COURSE_COMPLETED: &str = "course_completed";
pub const KIND_EVALUATION: &str = "evaluation";

pub async fn insert_notification<'e, E>(
    executor: E,
    user_id: &str,
    kind: &str,
    title: &str,
    body: &str,
) -> Result<Notification>
where
    E: Executor<'e, Database = Sqlite>,
{
    let notification = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(notification)
}

/// User's notifications, newest first
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: &str,
    unread_only: bool,
) -> Result<Vec<Notification>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = ? AND (? = 0 OR is_read = 0)
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Mark one of the user's notifications read; false if it is not theirs
pub async fn mark_read<'e, E>(executor: E, id: &str, user_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn mark_all_read<'e, E>(executor: E, user_id: &str) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(executor)
            .await?;

    Ok(result.rows_affected())
}
