//! User rows

use aula_common::db::{Role, User};
use aula_common::Result;
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection};

use super::new_id;

pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

/// Case-insensitive lookup (the column is `COLLATE NOCASE`)
pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email.trim())
        .fetch_optional(executor)
        .await?;

    Ok(user)
}

/// Fields of a user about to be created
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub image: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Role,
}

/// Insert the user and its empty student profile
///
/// Run inside a transaction so both rows appear together. A duplicate email
/// surfaces as a unique-violation database error.
pub async fn create_user(conn: &mut SqliteConnection, new: &NewUser<'_>) -> Result<User> {
    let now = Utc::now();
    let user = User {
        id: new_id(),
        email: new.email.trim().to_lowercase(),
        name: new.name.trim().to_string(),
        image: new.image.map(str::to_string),
        password_hash: new.password_hash.map(str::to_string),
        role: new.role.as_str().to_string(),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, image, password_hash, role, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.image)
    .bind(&user.password_hash)
    .bind(&user.role)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("INSERT INTO students (user_id, full_name, updated_at) VALUES (?, ?, ?)")
        .bind(&user.id)
        .bind(&user.name)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(user)
}

/// Fill in the display image when the user has none yet
pub async fn set_image_if_missing<'e, E>(executor: E, user_id: &str, image: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("UPDATE users SET image = ? WHERE id = ? AND image IS NULL")
        .bind(image)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(())
}
