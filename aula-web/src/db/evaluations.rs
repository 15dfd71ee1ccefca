//! Evaluations and their results

use aula_common::db::{Evaluation, EvaluationResult};
use aula_common::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite};

use super::new_id;

pub async fn list_for_course<'e, E>(executor: E, course_id: &str) -> Result<Vec<Evaluation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let evaluations = sqlx::query_as::<_, Evaluation>(
        "SELECT * FROM evaluations WHERE course_id = ? ORDER BY created_at, title",
    )
    .bind(course_id)
    .fetch_all(executor)
    .await?;

    Ok(evaluations)
}

pub async fn find_evaluation<'e, E>(executor: E, id: &str) -> Result<Option<Evaluation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let evaluation = sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(evaluation)
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEvaluation {
    pub module_id: Option<String>,
    pub title: String,
    pub instructions: String,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default = "default_passing_score")]
    pub passing_score: f64,
}

fn default_max_score() -> f64 {
    100.0
}

fn default_passing_score() -> f64 {
    60.0
}

pub async fn insert_evaluation<'e, E>(
    executor: E,
    course_id: &str,
    new: &NewEvaluation,
) -> Result<Evaluation>
where
    E: Executor<'e, Database = Sqlite>,
{
    let evaluation = sqlx::query_as::<_, Evaluation>(
        r#"
        INSERT INTO evaluations (
            id, course_id, module_id, title, instructions, max_score, passing_score, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(course_id)
    .bind(&new.module_id)
    .bind(new.title.trim())
    .bind(new.instructions.trim())
    .bind(new.max_score)
    .bind(new.passing_score)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(evaluation)
}

/// Graded submission about to be stored
#[derive(Debug, Clone)]
pub struct NewResult<'a> {
    pub evaluation_id: &'a str,
    pub student_id: &'a str,
    pub answer: &'a str,
    pub score: f64,
    pub feedback: Option<&'a str>,
    pub passed: bool,
}

pub async fn insert_result<'e, E>(executor: E, new: &NewResult<'_>) -> Result<EvaluationResult>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query_as::<_, EvaluationResult>(
        r#"
        INSERT INTO results (
            id, evaluation_id, student_id, answer, score, feedback, passed, submitted_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(new.evaluation_id)
    .bind(new.student_id)
    .bind(new.answer)
    .bind(new.score)
    .bind(new.feedback)
    .bind(new.passed)
    .bind(Utc::now())
    .fetch_one(executor)
    .await?;

    Ok(result)
}

/// Result joined with its evaluation and course
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResultWithEvaluation {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub result: EvaluationResult,
    pub evaluation_title: String,
    pub max_score: f64,
    pub course_id: String,
    pub course_title: String,
}

/// Student's results, newest first
pub async fn list_results_for_student<'e, E>(
    executor: E,
    student_id: &str,
) -> Result<Vec<ResultWithEvaluation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let results = sqlx::query_as::<_, ResultWithEvaluation>(
        r#"
        SELECT r.*,
            ev.title AS evaluation_title,
            ev.max_score AS max_score,
            c.id AS course_id,
            c.title AS course_title
        FROM results r
        JOIN evaluations ev ON ev.id = r.evaluation_id
        JOIN courses c ON c.id = ev.course_id
        WHERE r.student_id = ?
        ORDER BY r.submitted_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await?;

    Ok(results)
}
