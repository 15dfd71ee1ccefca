//! Lesson completion bookkeeping
//!
//! Marking a lesson complete recomputes the enrollment percentage. Reaching
//! 100 % completes the enrollment, issues the certificate and awards the
//! course achievement; all of it runs on the caller's transaction.

use aula_common::db::{Achievement, Certificate, Enrollment};
use aula_common::{Error, Result};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::info;

use super::awards::{self, award_achievement};
use crate::db::{certificates, courses, enrollments, notifications, progress};

/// Outcome of a lesson completion
#[derive(Debug, Clone, Serialize)]
pub struct LessonCompletion {
    pub lesson_id: String,
    /// False when the lesson had already been completed
    pub newly_completed: bool,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub progress_percent: f64,
    pub course_completed: bool,
    pub enrollment: Enrollment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    pub achievements: Vec<Achievement>,
}

pub async fn record_lesson_completion(
    conn: &mut SqliteConnection,
    enrollment: &Enrollment,
    lesson_id: &str,
) -> Result<LessonCompletion> {
    let student_id = enrollment.student_id.as_str();
    let course_id = enrollment.course_id.as_str();

    let newly_completed =
        progress::mark_lesson_complete(&mut *conn, &enrollment.id, lesson_id).await?;
    let completed_lessons = progress::count_completed(&mut *conn, &enrollment.id).await?;
    let total_lessons = courses::count_course_lessons(&mut *conn, course_id).await?;
    let percent = progress::progress_percent(completed_lessons, total_lessons);

    enrollments::set_progress(&mut *conn, &enrollment.id, percent).await?;

    let mut earned = Vec::new();
    if newly_completed {
        earned.extend(award_achievement(&mut *conn, student_id, awards::FIRST_LESSON).await?);
    }

    let course_completed = total_lessons > 0 && completed_lessons >= total_lessons;
    let mut certificate = None;
    if course_completed {
        if enrollments::mark_completed(&mut *conn, &enrollment.id).await? {
            let title: String = courses::find_course(&mut *conn, course_id)
                .await?
                .map(|c| c.title)
                .unwrap_or_default();
            notifications::insert_notification(
                &mut *conn,
                student_id,
                notifications::KIND_COURSE_COMPLETED,
                "Course completed",
                &format!("You completed {}. Your certificate is ready.", title),
            )
            .await?;
            info!(student_id, course_id, "Course completed");
        }

        let (issued, _) = certificates::issue_certificate(&mut *conn, student_id, course_id).await?;
        certificate = Some(issued);
        earned.extend(award_achievement(&mut *conn, student_id, awards::COURSE_COMPLETE).await?);
    }

    let enrollment = enrollments::find_enrollment(&mut *conn, student_id, course_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("enrollment in course {}", course_id)))?;

    Ok(LessonCompletion {
        lesson_id: lesson_id.to_string(),
        newly_completed,
        completed_lessons,
        total_lessons,
        progress_percent: enrollment.progress_percent,
        course_completed,
        enrollment,
        certificate,
        achievements: earned,
    })
}
