//! Test Helper Utilities
//!
//! Shared fixtures for acu-import integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::{create_seeded_db, SeededIds};
pub use fakes::{FakePlatform, TransitionMode};
