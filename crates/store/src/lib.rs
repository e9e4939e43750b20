//! File-backed policy and action repository.

pub mod error;
pub mod file;

pub use error::StoreError;
pub use file::{FileStore, LoadReport, LoadResult, LoadStatus};
