//! Import services

pub mod batch_import;
pub mod reconciler;

pub use batch_import::{BatchImporter, BatchOptions};
pub use reconciler::Reconciler;
