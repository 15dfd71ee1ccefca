//! Student profile rows

use aula_common::db::Student;
use aula_common::Result;
use chrono::Utc;
use serde::Deserialize;
use sqlx::{Executor, Sqlite};

pub async fn find_student<'e, E>(executor: E, user_id: &str) -> Result<Option<Student>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(student)
}

/// A missing profile row counts as not completed
pub async fn is_profile_completed<'e, E>(executor: E, user_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let completed: Option<bool> =
        sqlx::query_scalar("SELECT profile_completed FROM students WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;

    Ok(completed.unwrap_or(false))
}

/// Profile fields; `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<String>,
    pub education_level: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<String>,
}

impl ProfileUpdate {
    /// Trim every field and turn blank strings into `None`
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            full_name: clean(self.full_name),
            phone: clean(self.phone),
            birth_date: clean(self.birth_date),
            education_level: clean(self.education_level),
            bio: clean(self.bio),
            interests: clean(self.interests),
        }
    }
}

/// Write profile fields, creating the row if needed
///
/// `mark_completed` only ever raises the flag; a plain profile edit never
/// sends a student back through onboarding.
pub async fn upsert_profile<'e, E>(
    executor: E,
    user_id: &str,
    update: &ProfileUpdate,
    mark_completed: bool,
) -> Result<Student>
where
    E: Executor<'e, Database = Sqlite>,
{
    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (
            user_id, full_name, phone, birth_date, education_level, bio, interests,
            profile_completed, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            full_name = COALESCE(excluded.full_name, students.full_name),
            phone = COALESCE(excluded.phone, students.phone),
            birth_date = COALESCE(excluded.birth_date, students.birth_date),
            education_level = COALESCE(excluded.education_level, students.education_level),
            bio = COALESCE(excluded.bio, students.bio),
            interests = COALESCE(excluded.interests, students.interests),
            profile_completed = MAX(students.profile_completed, excluded.profile_completed),
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&update.full_name)
    .bind(&update.phone)
    .bind(&update.birth_date)
    .bind(&update.education_level)
    .bind(&update.bio)
    .bind(&update.interests)
    .bind(mark_completed)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(student)
}
