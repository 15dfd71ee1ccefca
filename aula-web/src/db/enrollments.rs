//! Enrollment rows

use aula_common::db::{Enrollment, ENROLLMENT_ACTIVE, ENROLLMENT_COMPLETED};
use aula_common::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqliteConnection};

use super::new_id;

/// Enrollment joined with its course
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EnrollmentWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course_title: String,
    pub course_thumbnail_url: Option<String>,
}

pub async fn find_enrollment<'e, E>(
    executor: E,
    student_id: &str,
    course_id: &str,
) -> Result<Option<Enrollment>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE student_id = ? AND course_id = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await?;

    Ok(enrollment)
}

/// Enroll a student; returns the row and whether it was created now
///
/// Concurrent requests for the same pair race on the UNIQUE constraint, so
/// exactly one of them inserts and every caller reads back the same row.
pub async fn enroll(
    conn: &mut SqliteConnection,
    student_id: &str,
    course_id: &str,
) -> Result<(Enrollment, bool)> {
    let result = sqlx::query(
        r#"
        INSERT INTO enrollments (id, student_id, course_id, progress_percent, status, enrolled_at)
        VALUES (?, ?, ?, 0, ?, ?)
        ON CONFLICT(student_id, course_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(student_id)
    .bind(course_id)
    .bind(ENROLLMENT_ACTIVE)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    let created = result.rows_affected() == 1;
    let enrollment = find_enrollment(&mut *conn, student_id, course_id)
        .await?
        .ok_or_else(|| Error::Internal("enrollment vanished after insert".to_string()))?;

    Ok((enrollment, created))
}

/// Remove an enrollment (its lesson progress cascades)
pub async fn unenroll<'e, E>(executor: E, student_id: &str, course_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM enrollments WHERE student_id = ? AND course_id = ?")
        .bind(student_id)
        .bind(course_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Student's enrollments, most recent first; `limit` of `None` lists all
pub async fn list_for_student<'e, E>(
    executor: E,
    student_id: &str,
    limit: Option<i64>,
) -> Result<Vec<EnrollmentWithCourse>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, EnrollmentWithCourse>(
        r#"
        SELECT e.*, c.title AS course_title, c.thumbnail_url AS course_thumbnail_url
        FROM enrollments e
        JOIN courses c ON c.id = e.course_id
        WHERE e.student_id = ?
        ORDER BY e.enrolled_at DESC
        LIMIT ?
        "#,
    )
    .bind(student_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Store the recomputed percentage
///
/// Below 100 % a completed enrollment goes back to active (lessons were
/// added after completion); any certificate already issued is kept.
pub async fn set_progress<'e, E>(executor: E, enrollment_id: &str, percent: f64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress_percent = ?1,
            status = CASE WHEN ?1 < 100 THEN ?2 ELSE status END,
            completed_at = CASE WHEN ?1 < 100 THEN NULL ELSE completed_at END
        WHERE id = ?3
        "#,
    )
    .bind(percent)
    .bind(ENROLLMENT_ACTIVE)
    .bind(enrollment_id)
    .execute(executor)
    .await?;

    Ok(())
}

/// Flip an active enrollment to completed; false if it already was
pub async fn mark_completed<'e, E>(executor: E, enrollment_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE enrollments
        SET status = ?, completed_at = ?, progress_percent = 100
        WHERE id = ? AND status != ?
        "#,
    )
    .bind(ENROLLMENT_COMPLETED)
    .bind(Utc::now())
    .bind(enrollment_id)
    .bind(ENROLLMENT_COMPLETED)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
