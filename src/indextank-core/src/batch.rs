//! Correlation of batch requests with the server's per-item outcomes.
//!
//! The server answers a batch add or delete with one outcome per submitted
//! item, in submission order. [`BatchResults`] pairs the two lists by position
//! and refuses to build when their lengths differ.

use crate::error::BatchConsistencyError;
use crate::models::{AddOutcome, DeleteOutcome, Document};

/// Outcome of a single item in a batch call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl From<AddOutcome> for ItemOutcome {
    fn from(outcome: AddOutcome) -> Self {
        Self {
            success: outcome.added,
            error: outcome.error,
        }
    }
}

impl From<DeleteOutcome> for ItemOutcome {
    fn from(outcome: DeleteOutcome) -> Self {
        Self {
            success: outcome.deleted,
            error: outcome.error,
        }
    }
}

/// Submitted items paired with their outcomes
#[derive(Debug, Clone)]
pub struct BatchResults<T> {
    items: Vec<T>,
    outcomes: Vec<ItemOutcome>,
    failed: Vec<usize>,
}

/// Result of a batch document add
pub type BatchAddResults = BatchResults<Document>;

/// Result of a batch delete by document id
pub type BatchDeleteResults = BatchResults<String>;

impl<T> BatchResults<T> {
    /// Pair `items[i]` with `outcomes[i]`.
    pub fn new<O>(items: Vec<T>, outcomes: Vec<O>) -> Result<Self, BatchConsistencyError>
    where
        O: Into<ItemOutcome>,
    {
        if items.len() != outcomes.len() {
            tracing::error!(
                submitted = items.len(),
                returned = outcomes.len(),
                "batch response does not line up with request"
            );
            return Err(BatchConsistencyError {
                submitted: items.len(),
                returned: outcomes.len(),
            });
        }

        let outcomes: Vec<ItemOutcome> = outcomes.into_iter().map(Into::into).collect();
        let failed = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !outcome.success)
            .map(|(i, _)| i)
            .collect();

        Ok(Self {
            items,
            outcomes,
            failed,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when at least one item was rejected
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Success flag for the item at `position`
    pub fn result(&self, position: usize) -> Option<bool> {
        self.outcomes.get(position).map(|o| o.success)
    }

    /// Server message for a failed item at `position`, if it sent one
    pub fn error_message(&self, position: usize) -> Option<&str> {
        self.outcomes
            .get(position)
            .filter(|o| !o.success)
            .and_then(|o| o.error.as_deref())
    }

    /// The submitted item at `position`
    pub fn item(&self, position: usize) -> Option<&T> {
        self.items.get(position)
    }

    pub fn outcome(&self, position: usize) -> Option<&ItemOutcome> {
        self.outcomes.get(position)
    }

    /// Items that failed, in submission order
    pub fn failed_items(&self) -> Vec<&T> {
        self.failed.iter().map(|&i| &self.items[i]).collect()
    }

    pub fn failed_positions(&self) -> &[usize] {
        &self.failed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&T, &ItemOutcome)> {
        self.items.iter().zip(self.outcomes.iter())
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl BatchResults<Document> {
    pub fn document(&self, position: usize) -> Option<&Document> {
        self.item(position)
    }

    pub fn failed_documents(&self) -> Vec<&Document> {
        self.failed_items()
    }
}

impl BatchResults<String> {
    pub fn docid(&self, position: usize) -> Option<&str> {
        self.item(position).map(String::as_str)
    }

    pub fn failed_docids(&self) -> Vec<&str> {
        self.failed.iter().map(|&i| self.items[i].as_str()).collect()
    }
}
