//! IndexTank Core Library
//!
//! Transport-independent pieces of the IndexTank client:
//! - Document and result models
//! - Search query building and serialization
//! - Batch result correlation
//! - Client configuration

pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod query;

// Re-export commonly used types
pub use batch::{BatchAddResults, BatchDeleteResults, BatchResults, ItemOutcome};
pub use config::ClientConfig;
pub use error::{BatchConsistencyError, ValidationError};
pub use models::*;
pub use query::{Range, SearchQuery};
