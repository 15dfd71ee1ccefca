//! Tutor conversation log
//!
//! A conversation is identified by (student, course); `course_id` NULL is
//! the general conversation. Messages created in the same instant keep
//! insertion order through `rowid`.

use aula_common::db::TutorMessage;
use aula_common::Result;
use chrono::Utc;
use sqlx::{Executor, Sqlite};

use super::new_id;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

pub async fn insert_message<'e, E>(
    executor: E,
    student_id: &str,
    course_id: Option<&str>,
    role: &str,
    content: &str,
) -> Result<TutorMessage>
where
    E: Executor<'e, Database = Sqlite>,
{
    let message = sqlx::query_as::<_, TutorMessage>(
        r#"
        INSERT INTO tutor_messages (id, student_id, course_id, role, content, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(student_id)
    .bind(course_id)
    .bind(role)
    .bind(content)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(message)
}

/// Last `limit` messages of the conversation, oldest first
pub async fn recent_messages<'e, E>(
    executor: E,
    student_id: &str,
    course_id: Option<&str>,
    limit: i64,
) -> Result<Vec<TutorMessage>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let messages = sqlx::query_as::<_, TutorMessage>(
        r#"
        SELECT * FROM (
            SELECT *, rowid AS seq FROM tutor_messages
            WHERE student_id = ? AND course_id IS ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
        )
        ORDER BY created_at, seq
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(messages)
}

/// Whole conversation, oldest first
pub async fn list_messages<'e, E>(
    executor: E,
    student_id: &str,
    course_id: Option<&str>,
) -> Result<Vec<TutorMessage>>
where
    E: Executor<'e, Database = Sqlite>,
{
    recent_messages(executor, student_id, course_id, -1).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::{create_user, NewUser};
    use aula_common::db::{init_memory_database, Role};

    #[tokio::test]
    async fn test_history_window_and_order() {
        let pool = init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();
        let user = create_user(
            &mut conn,
            &NewUser {
                email: "t@example.com",
                name: "T",
                image: None,
                password_hash: None,
                role: Role::Student,
            },
        )
        .await
        .unwrap();
        drop(conn);

        for i in 0..3 {
            insert_message(&pool, &user.id, None, ROLE_USER, &format!("q{}", i)).await.unwrap();
            insert_message(&pool, &user.id, None, ROLE_ASSISTANT, &format!("a{}", i)).await.unwrap();
        }

        let recent = recent_messages(&pool, &user.id, None, 3).await.unwrap();
        let contents: Vec<_> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a1", "q2", "a2"]);

        assert_eq!(list_messages(&pool, &user.id, None).await.unwrap().len(), 6);
        assert!(list_messages(&pool, &user.id, Some("course-x"))
            .await
            .unwrap()
            .is_empty());
    }
}
