//! Database access layer for aula-web
//!
//! Single-statement functions are generic over the executor so they run on
//! the pool or inside a transaction. Multi-statement operations take a
//! `&mut SqliteConnection`.

pub mod accounts;
pub mod achievements;
pub mod certificates;
pub mod courses;
pub mod dashboard;
pub mod enrollments;
pub mod evaluations;
pub mod notifications;
pub mod progress;
pub mod sessions;
pub mod students;
pub mod tutor;
pub mod users;

/// New random row id
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
