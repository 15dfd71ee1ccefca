//! Per-lesson completion rows

use aula_common::Result;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

/// Record a completed lesson; false when it was already recorded
pub async fn mark_lesson_complete<'e, E>(
    executor: E,
    enrollment_id: &str,
    lesson_id: &str,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO lesson_progress (enrollment_id, lesson_id, completed_at) VALUES (?, ?, ?)",
    )
    .bind(enrollment_id)
    .bind(lesson_id)
    .bind(Utc::now())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn completed_lesson_ids<'e, E>(executor: E, enrollment_id: &str) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT lesson_id FROM lesson_progress WHERE enrollment_id = ? ORDER BY completed_at",
    )
    .bind(enrollment_id)
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

pub async fn count_completed<'e, E>(executor: E, enrollment_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM lesson_progress WHERE enrollment_id = ?")
            .bind(enrollment_id)
            .fetch_one(executor)
            .await?;

    Ok(count)
}

/// Completion percentage rounded to one decimal; a course without
/// lessons is 0 %
pub fn progress_percent(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let ratio = completed.min(total) as f64 / total as f64;
    (ratio * 1000.0).round() / 10.0
}
