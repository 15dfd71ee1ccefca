//! Course completion certificates

use aula_common::credentials::generate_verification_code;
use aula_common::db::Certificate;
use aula_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, Sqlite, SqliteConnection};

use super::new_id;

/// Attempts before giving up on a fresh verification code
const CODE_ATTEMPTS: usize = 5;

pub async fn find_certificate<'e, E>(
    executor: E,
    student_id: &str,
    course_id: &str,
) -> Result<Option<Certificate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let certificate = sqlx::query_as::<_, Certificate>(
        "SELECT * FROM certificates WHERE student_id = ? AND course_id = ?",
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(executor)
    .await?;

    Ok(certificate)
}

/// Issue the certificate for a course, or return the one already issued
///
/// Returns `(certificate, issued_now)`.
pub async fn issue_certificate(
    conn: &mut SqliteConnection,
    student_id: &str,
    course_id: &str,
) -> Result<(Certificate, bool)> {
    for _ in 0..CODE_ATTEMPTS {
        let inserted = sqlx::query(
            r#"
            INSERT INTO certificates (id, student_id, course_id, verification_code, issued_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(student_id, course_id) DO NOTHING
            "#,
        )
        .bind(new_id())
        .bind(student_id)
        .bind(course_id)
        .bind(generate_verification_code())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .map_err(Error::from);

        match inserted {
            Ok(result) => {
                let certificate = find_certificate(&mut *conn, student_id, course_id)
                    .await?
                    .ok_or_else(|| Error::Internal("certificate vanished after insert".to_string()))?;
                return Ok((certificate, result.rows_affected() == 1));
            }
            // Verification code collision; draw another
            Err(e) if e.is_unique_violation() => continue,
            Err(e) => return Err(e),
        }
    }

    Err(Error::Internal(
        "could not generate a unique verification code".to_string(),
    ))
}

/// Certificate joined with its course title
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CertificateWithCourse {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub certificate: Certificate,
    pub course_title: String,
}

pub async fn list_for_student<'e, E>(
    executor: E,
    student_id: &str,
) -> Result<Vec<CertificateWithCourse>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, CertificateWithCourse>(
        r#"
        SELECT ce.*, c.title AS course_title
        FROM certificates ce
        JOIN courses c ON c.id = ce.course_id
        WHERE ce.student_id = ?
        ORDER BY ce.issued_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Public view of a certificate
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CertificateVerification {
    pub verification_code: String,
    pub student_name: String,
    pub course_title: String,
    pub issued_at: DateTime<Utc>,
}

pub async fn verify_code<'e, E>(executor: E, code: &str) -> Result<Option<CertificateVerification>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, CertificateVerification>(
        r#"
        SELECT ce.verification_code,
            COALESCE(s.full_name, u.name) AS student_name,
            c.title AS course_title,
            ce.issued_at
        FROM certificates ce
        JOIN users u ON u.id = ce.student_id
        LEFT JOIN students s ON s.user_id = ce.student_id
        JOIN courses c ON c.id = ce.course_id
        WHERE ce.verification_code = ?
        "#,
    )
    .bind(code.trim().to_uppercase())
    .fetch_optional(executor)
    .await?;

    Ok(row)
}
