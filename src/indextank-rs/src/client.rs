use indextank_core::config::validate_api_url;
use indextank_core::{ClientConfig, IndexMetadata, IndexOptions};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::http::{self, ReqwestTransport, Transport};
use crate::index::Index;
use crate::Result;

/// IndexTank account client.
///
/// Manages indexes by name. Document and search calls go through the
/// [`Index`] handles it hands out.
#[derive(Clone)]
pub struct ApiClient {
    api_url: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &http::redact(&self.api_url))
            .finish()
    }
}

impl ApiClient {
    /// Create a client for the given private API URL with default settings
    pub fn new(api_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::new(api_url))
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(&config.api_url, Arc::new(transport))
    }

    /// Create a client that sends its requests through `transport`
    pub fn with_transport(api_url: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let api_url = validate_api_url(api_url)?;
        tracing::debug!(api_url = %http::redact(&api_url), "IndexTank client ready");
        Ok(Self { api_url, transport })
    }

    fn indexes_url(&self) -> String {
        format!("{}/v1/indexes", self.api_url)
    }

    /// `<api>/v1/indexes/<name>`, with `name` encoded as a path segment
    fn index_url(&self, name: &str) -> String {
        let base = self.indexes_url();
        match url::Url::parse(&base) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(name);
                }
                url.to_string()
            }
            Err(_) => format!("{}/{}", base, name),
        }
    }

    /// Handle on the named index. Nothing is sent to the server.
    pub fn index(&self, name: &str) -> Index {
        Index::new(name, self.index_url(name), self.transport.clone())
    }

    pub fn create_index(&self, name: &str) -> Result<Index> {
        self.create_index_with_options(name, &IndexOptions::default())
    }

    pub fn create_index_with_options(&self, name: &str, options: &IndexOptions) -> Result<Index> {
        let mut index = self.index(name);
        index.create_with_options(options)?;
        Ok(index)
    }

    pub fn update_index(&self, name: &str, options: &IndexOptions) -> Result<()> {
        self.index(name).update(options)
    }

    /// Permanently delete the named index and all its documents
    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.index(name).delete()
    }

    /// All indexes of the account, each carrying the metadata returned by
    /// the listing.
    pub fn list_indexes(&self) -> Result<BTreeMap<String, Index>> {
        let listing: BTreeMap<String, IndexMetadata> =
            http::get_json_object(self.transport.as_ref(), &self.indexes_url(), &[])?;

        tracing::debug!(count = listing.len(), "Listed indexes");
        Ok(listing
            .into_iter()
            .map(|(name, metadata)| {
                let index = Index::with_metadata(
                    name.as_str(),
                    self.index_url(&name),
                    self.transport.clone(),
                    metadata,
                );
                (name, index)
            })
            .collect())
    }
}
