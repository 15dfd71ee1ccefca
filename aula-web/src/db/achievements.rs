//! Achievement catalogue and awards

use aula_common::db::Achievement;
use aula_common::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqliteConnection};

/// Catalogue entry with the student's award state
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AchievementStatus {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub achievement: Achievement,
    pub earned: bool,
    pub awarded_at: Option<DateTime<Utc>>,
}

/// Award by code; returns the achievement only when newly awarded
///
/// Unknown codes award nothing.
pub async fn award(
    conn: &mut SqliteConnection,
    student_id: &str,
    code: &str,
) -> Result<Option<Achievement>> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO student_achievements (student_id, achievement_id, awarded_at)
        SELECT ?, id, ? FROM achievements WHERE code = ?
        "#,
    )
    .bind(student_id)
    .bind(Utc::now())
    .bind(code)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let achievement = sqlx::query_as::<_, Achievement>("SELECT * FROM achievements WHERE code = ?")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(achievement)
}

/// Whole catalogue, earned entries first
pub async fn list_with_status<'e, E>(executor: E, student_id: &str) -> Result<Vec<AchievementStatus>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, AchievementStatus>(
        r#"
        SELECT a.*,
            sa.awarded_at IS NOT NULL AS earned,
            sa.awarded_at AS awarded_at
        FROM achievements a
        LEFT JOIN student_achievements sa
            ON sa.achievement_id = a.id AND sa.student_id = ?
        ORDER BY earned DESC, sa.awarded_at, a.title
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
