//! # Aula Common Library
//!
//! Shared code for the Aula services including:
//! - Database schema, initialization and row models
//! - Configuration loading and root folder resolution
//! - Credential hashing (passwords, session tokens)
//! - Common error type

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;

pub use error::{Error, Result};
