//! IndexTank Client Library
//!
//! Blocking HTTP client for IndexTank-compatible hosted search services
//! (Searchify and friends). Every call blocks the calling thread until the
//! server has answered.
//!
//! ```rust,no_run
//! use indextank_rs::{ApiClient, Document, SearchQuery};
//!
//! fn main() -> indextank_rs::Result<()> {
//!     let client = ApiClient::new("https://:secret@example.api.searchify.com")?;
//!     let index = client.index("articles");
//!
//!     let doc = Document::new("doc1", [("text", "Testing golang search")])?
//!         .with_variable(0, 1.5);
//!     index.add_document(&doc)?;
//!
//!     let mut query = SearchQuery::new("golang");
//!     query.fetch_fields(["text"]).num_results(5);
//!     let results = index.search_with_query(&query)?;
//!     println!("{} matches", results.matches);
//!     Ok(())
//! }
//! ```

mod client;
pub mod http;
mod index;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use index::Index;
pub use indextank_core::{
    AddOutcome, BatchAddResults, BatchConsistencyError, BatchDeleteResults, BatchResults,
    ClientConfig, DeleteOutcome, Document, IndexMetadata, IndexOptions, ItemOutcome, Range,
    SearchQuery, SearchResults, ValidationError,
};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Malformed response from server: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Index does not exist")]
    IndexNotFound,

    #[error("Index already exists")]
    IndexAlreadyExists,

    #[error("Maximum indexes limit reached for this account")]
    IndexLimitExceeded,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    BatchConsistency(#[from] BatchConsistencyError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
