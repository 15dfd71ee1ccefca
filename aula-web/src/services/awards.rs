//! Achievement awarding with the matching notification

use aula_common::db::Achievement;
use aula_common::Result;
use sqlx::SqliteConnection;
use tracing::info;

use crate::db::{achievements, notifications};

pub const FIRST_ENROLLMENT: &str = "first_enrollment";
pub const FIRST_LESSON: &str = "first_lesson";
pub const COURSE_COMPLETE: &str = "course_complete";
pub const PERFECT_SCORE: &str = "perfect_score";

/// Award an achievement once and notify the student
///
/// Returns the achievement only when it was awarded by this call.
pub async fn award_achievement(
    conn: &mut SqliteConnection,
    student_id: &str,
    code: &str,
) -> Result<Option<Achievement>> {
    let Some(achievement) = achievements::award(&mut *conn, student_id, code).await? else {
        return Ok(None);
    };

    notifications::insert_notification(
        &mut *conn,
        student_id,
        notifications::KIND_ACHIEVEMENT,
        &format!("Achievement unlocked: {}", achievement.title),
        &achievement.description,
    )
    .await?;

    info!(student_id, code, "Achievement awarded");
    Ok(Some(achievement))
}
