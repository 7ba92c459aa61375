use chrono::NaiveDateTime;
use indextank_core::error::{validate_docid, validate_variables};
use indextank_core::query::escape;
use indextank_core::{
    AddOutcome, BatchAddResults, BatchDeleteResults, BatchResults, DeleteOutcome, Document,
    IndexMetadata, IndexOptions, SearchQuery, SearchResults,
};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::http::{self, Transport};
use crate::{ClientError, Result};

#[derive(Serialize)]
struct DocidRef<'a> {
    docid: &'a str,
}

#[derive(Serialize)]
struct UpdateVariablesRequest<'a> {
    docid: &'a str,
    variables: BTreeMap<u32, f64>,
}

#[derive(Serialize)]
struct UpdateCategoriesRequest<'a> {
    docid: &'a str,
    categories: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct FunctionRequest<'a> {
    definition: &'a str,
}

/// Handle on a single search index.
///
/// The handle keeps the last metadata snapshot it fetched. Reading metadata
/// goes through the cache; `create`/`update` refresh it and `delete` drops
/// it. Calls that touch the cache take `&mut self`, so sharing one handle
/// between threads requires external locking.
pub struct Index {
    name: String,
    url: String,
    transport: Arc<dyn Transport>,
    metadata: Option<IndexMetadata>,
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("url", &http::redact(&self.url))
            .field("metadata", &self.metadata)
            .finish()
    }
}

impl Index {
    pub(crate) fn new(name: impl Into<String>, url: String, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.into(),
            url,
            transport,
            metadata: None,
        }
    }

    pub(crate) fn with_metadata(
        name: impl Into<String>,
        url: String,
        transport: Arc<dyn Transport>,
        metadata: IndexMetadata,
    ) -> Self {
        Self {
            metadata: Some(metadata),
            ..Self::new(name, url, transport)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}{}", self.url, suffix)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create this index with default options
    pub fn create(&mut self) -> Result<()> {
        self.create_with_options(&IndexOptions::default())
    }

    /// Create this index.
    ///
    /// The server answers 201 when created, 204 when an index with this name
    /// already exists and 409 when the account is at its index limit.
    pub fn create_with_options(&mut self, options: &IndexOptions) -> Result<()> {
        let response = http::send_json(self.transport.as_ref(), Method::PUT, &self.url, options)?;
        match response.status {
            204 => return Err(ClientError::IndexAlreadyExists),
            409 => return Err(ClientError::IndexLimitExceeded),
            _ if response.is_success() => {}
            _ => return Err(http::server_error(&response)),
        }

        info!(index = %self.name, "Index created");
        self.refresh_after_mutation();
        Ok(())
    }

    /// Change the options of an existing index
    pub fn update(&mut self, options: &IndexOptions) -> Result<()> {
        let response = http::send_json(self.transport.as_ref(), Method::PUT, &self.url, options)?;
        http::check_status(response)?;
        self.refresh_after_mutation();
        Ok(())
    }

    /// Permanently delete the index and all its documents
    pub fn delete(&mut self) -> Result<()> {
        let response = http::send(self.transport.as_ref(), Method::DELETE, &self.url)?;
        http::check_status(response)?;
        self.metadata = None;
        info!(index = %self.name, "Index deleted");
        Ok(())
    }

    fn refresh_after_mutation(&mut self) {
        if let Err(e) = self.refresh_metadata().map(|_| ()) {
            warn!(index = %self.name, error = %e, "Failed to refresh index metadata");
            self.metadata = None;
        }
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    fn fetch_metadata(&self) -> Result<IndexMetadata> {
        http::get_json_object(self.transport.as_ref(), &self.url, &[])
    }

    /// Cached metadata, fetched on first use
    pub fn metadata(&mut self) -> Result<&IndexMetadata> {
        let metadata = match self.metadata.take() {
            Some(metadata) => metadata,
            None => self.fetch_metadata()?,
        };
        Ok(&*self.metadata.insert(metadata))
    }

    /// Fetch metadata from the server, replacing the cached snapshot
    pub fn refresh_metadata(&mut self) -> Result<&IndexMetadata> {
        let metadata = self.fetch_metadata()?;
        debug!(index = %self.name, status = %metadata.status, "Metadata refreshed");
        Ok(&*self.metadata.insert(metadata))
    }

    /// Last snapshot fetched, without touching the network
    pub fn cached_metadata(&self) -> Option<&IndexMetadata> {
        self.metadata.as_ref()
    }

    /// Whether the index exists on the server. Always asks the server.
    pub fn exists(&mut self) -> Result<bool> {
        let refreshed = self.refresh_metadata().map(|_| ());
        match refreshed {
            Ok(()) => Ok(true),
            Err(ClientError::IndexNotFound) => {
                self.metadata = None;
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the index is ready to serve requests. Always asks the server.
    pub fn has_started(&mut self) -> Result<bool> {
        Ok(self.refresh_metadata()?.started)
    }

    pub fn status(&mut self) -> Result<String> {
        Ok(self.metadata()?.status.clone())
    }

    /// Internal identifier assigned by the service
    pub fn code(&mut self) -> Result<String> {
        Ok(self.metadata()?.code.clone())
    }

    /// Number of documents in the index
    pub fn size(&mut self) -> Result<u64> {
        Ok(self.metadata()?.size)
    }

    pub fn creation_time(&mut self) -> Result<Option<NaiveDateTime>> {
        Ok(self.metadata()?.creation_time)
    }

    pub fn public_search_enabled(&mut self) -> Result<bool> {
        Ok(self.metadata()?.public_search)
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Add a document, replacing any document with the same id
    pub fn add_document(&self, document: &Document) -> Result<()> {
        document.validate()?;
        let response = http::send_json(
            self.transport.as_ref(),
            Method::PUT,
            &self.endpoint("/docs"),
            document,
        )?;
        http::check_status(response)?;
        Ok(())
    }

    /// Add several documents in one request.
    ///
    /// Rejections of individual documents are reported through the returned
    /// [`BatchAddResults`], not as an error.
    pub fn add_documents(&self, documents: Vec<Document>) -> Result<BatchAddResults> {
        for document in &documents {
            document.validate()?;
        }
        if documents.is_empty() {
            return Ok(BatchResults::new(documents, Vec::<AddOutcome>::new())?);
        }

        let response = http::send_json(
            self.transport.as_ref(),
            Method::PUT,
            &self.endpoint("/docs"),
            &documents,
        )?;
        let outcomes: Vec<AddOutcome> = http::check_status(response)?.json()?;
        let results = BatchResults::new(documents, outcomes)?;

        if results.has_errors() {
            warn!(
                index = %self.name,
                failed = results.failed_positions().len(),
                total = results.len(),
                "Batch add partially failed"
            );
        }
        Ok(results)
    }

    /// Replace scoring variables of a document without touching its fields
    pub fn update_variables(
        &self,
        docid: &str,
        variables: impl IntoIterator<Item = (u32, f64)>,
    ) -> Result<()> {
        validate_docid(docid)?;
        let variables: BTreeMap<u32, f64> = variables.into_iter().collect();
        validate_variables(&variables)?;
        let body = UpdateVariablesRequest { docid, variables };
        let response = http::send_json(
            self.transport.as_ref(),
            Method::PUT,
            &self.endpoint("/docs/variables"),
            &body,
        )?;
        http::check_status(response)?;
        Ok(())
    }

    /// Replace category assignments of a document
    pub fn update_categories<K, V>(
        &self,
        docid: &str,
        categories: impl IntoIterator<Item = (K, V)>,
    ) -> Result<()>
    where
        K: Into<String>,
        V: Into<String>,
    {
        validate_docid(docid)?;
        let body = UpdateCategoriesRequest {
            docid,
            categories: categories
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        let response = http::send_json(
            self.transport.as_ref(),
            Method::PUT,
            &self.endpoint("/docs/categories"),
            &body,
        )?;
        http::check_status(response)?;
        Ok(())
    }

    pub fn delete_document(&self, docid: &str) -> Result<()> {
        validate_docid(docid)?;
        let url = self.endpoint(&format!("/docs?docid={}", escape(docid)));
        let response = http::send(self.transport.as_ref(), Method::DELETE, &url)?;
        http::check_status(response)?;
        Ok(())
    }

    /// Delete several documents in one request
    pub fn delete_documents(&self, docids: Vec<String>) -> Result<BatchDeleteResults> {
        for docid in &docids {
            validate_docid(docid)?;
        }
        if docids.is_empty() {
            return Ok(BatchResults::new(docids, Vec::<DeleteOutcome>::new())?);
        }

        let body: Vec<DocidRef<'_>> = docids.iter().map(|docid| DocidRef { docid }).collect();
        let response = http::send_json(
            self.transport.as_ref(),
            Method::DELETE,
            &self.endpoint("/docs"),
            &body,
        )?;
        let outcomes: Vec<DeleteOutcome> = http::check_status(response)?.json()?;
        let results = BatchResults::new(docids, outcomes)?;

        if results.has_errors() {
            warn!(
                index = %self.name,
                failed = results.failed_positions().len(),
                total = results.len(),
                "Batch delete partially failed"
            );
        }
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Scoring functions
    // ------------------------------------------------------------------

    /// Define (or redefine) scoring function number `function`
    pub fn add_function(&self, function: u32, definition: &str) -> Result<()> {
        let response = http::send_json(
            self.transport.as_ref(),
            Method::PUT,
            &self.endpoint(&format!("/functions/{}", function)),
            &FunctionRequest { definition },
        )?;
        http::check_status(response)?;
        Ok(())
    }

    pub fn delete_function(&self, function: u32) -> Result<()> {
        let response = http::send(
            self.transport.as_ref(),
            Method::DELETE,
            &self.endpoint(&format!("/functions/{}", function)),
        )?;
        http::check_status(response)?;
        Ok(())
    }

    /// All scoring functions, by number
    pub fn list_functions(&self) -> Result<BTreeMap<u32, String>> {
        http::get_json_object(self.transport.as_ref(), &self.endpoint("/functions"), &[])
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// Search with default settings (first 10 results)
    pub fn search(&self, text: &str) -> Result<SearchResults> {
        self.search_with_query(&SearchQuery::new(text))
    }

    pub fn search_with_query(&self, query: &SearchQuery) -> Result<SearchResults> {
        query.validate()?;
        let url = format!("{}?{}", self.endpoint("/search"), query.to_query_string());
        let response = http::send(self.transport.as_ref(), Method::GET, &url)?;
        let results: SearchResults = http::check_status(response)?.json()?;
        debug!(
            index = %self.name,
            matches = results.matches,
            search_time = results.search_time,
            "Search completed"
        );
        Ok(results)
    }
}
