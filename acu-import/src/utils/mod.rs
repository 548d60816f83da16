//! Utility modules for acu-import

pub mod poll;

pub use poll::{poll_until_found, PollPolicy};
