//! # ACU Common Library
//!
//! Shared code for the activity completion upload tools:
//! - Database schema and entity models
//! - Persisted settings
//! - Configuration loading
//! - Timestamp parsing helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
