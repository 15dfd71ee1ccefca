//! Dashboard counters

use aula_common::db::{ENROLLMENT_ACTIVE, ENROLLMENT_COMPLETED};
use aula_common::Result;
use serde::Serialize;
use sqlx::{Executor, Sqlite};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub enrolled_courses: i64,
    pub completed_courses: i64,
    pub in_progress_courses: i64,
    pub average_progress: f64,
    pub certificates: i64,
    pub achievements: i64,
    pub unread_notifications: i64,
}

pub async fn stats_for_student<'e, E>(executor: E, student_id: &str) -> Result<DashboardStats>
where
    E: Executor<'e, Database = Sqlite>,
{
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM enrollments WHERE student_id = ?) AS enrolled_courses,
            (SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND status = ?) AS completed_courses,
            (SELECT COUNT(*) FROM enrollments WHERE student_id = ? AND status = ?) AS in_progress_courses,
            (SELECT CAST(COALESCE(AVG(progress_percent), 0) AS REAL) FROM enrollments WHERE student_id = ?) AS average_progress,
            (SELECT COUNT(*) FROM certificates WHERE student_id = ?) AS certificates,
            (SELECT COUNT(*) FROM student_achievements WHERE student_id = ?) AS achievements,
            (SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0) AS unread_notifications
        "#,
    )
    .bind(student_id)
    .bind(student_id)
    .bind(ENROLLMENT_COMPLETED)
    .bind(student_id)
    .bind(ENROLLMENT_ACTIVE)
    .bind(student_id)
    .bind(student_id)
    .bind(student_id)
    .bind(student_id)
    .fetch_one(executor)
    .await?;

    Ok(stats)
}
