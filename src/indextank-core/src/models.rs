use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{validate_docid, validate_variables, ValidationError};

/// Document represents one indexable record: text fields plus optional
/// scoring variables and category assignments.
///
/// Variables are keyed by their integer slot. On the wire the slot becomes a
/// string key (`{"0": 1.5}`); serde_json performs that conversion when the
/// map is serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "docid")]
    id: String,
    pub fields: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<u32, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, String>,
}

impl Document {
    /// Create a document, rejecting ids that are empty or longer than 1024 bytes.
    pub fn new<I, K, V>(id: impl Into<String>, fields: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let id = id.into();
        validate_docid(&id)?;
        Ok(Self {
            id,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            variables: BTreeMap::new(),
            categories: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reject scoring variables that have no JSON representation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_variables(&self.variables)
    }

    pub fn with_field(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(name.into(), text.into());
        self
    }

    pub fn with_variable(mut self, slot: u32, value: f64) -> Self {
        self.variables.insert(slot, value);
        self
    }

    pub fn with_variables(mut self, variables: impl IntoIterator<Item = (u32, f64)>) -> Self {
        self.variables.extend(variables);
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.categories.insert(name.into(), value.into());
        self
    }

    pub fn with_categories<K, V>(mut self, categories: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.categories
            .extend(categories.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Per-document outcome of a batch add, as reported by the server
#[derive(Debug, Clone, Deserialize)]
pub struct AddOutcome {
    pub added: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Per-docid outcome of a batch delete
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Options accepted when creating or updating an index
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexOptions {
    /// Allow searches through the public (unauthenticated) API URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_search: Option<bool>,
}

impl IndexOptions {
    pub fn public_search(enabled: bool) -> Self {
        Self {
            public_search: Some(enabled),
        }
    }
}

/// Server-reported state of an index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub started: bool,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, deserialize_with = "creation_time")]
    pub creation_time: Option<NaiveDateTime>,
    #[serde(default)]
    pub public_search: bool,
}

/// SearchResults is the parsed body of a search call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub matches: u64,
    #[serde(default)]
    pub query: String,
    /// Seconds spent on the server
    #[serde(default, deserialize_with = "search_time")]
    pub search_time: f64,
    /// Spelling suggestion; empty when the server has none
    #[serde(rename = "didyoumean", default, deserialize_with = "null_as_empty")]
    pub did_you_mean: String,
    #[serde(default)]
    pub results: Vec<HashMap<String, serde_json::Value>>,
    /// category name -> value -> matching documents
    #[serde(default)]
    pub facets: BTreeMap<String, BTreeMap<String, u64>>,
}

const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse the server's creation timestamp. Unparsable values yield `None`.
pub fn parse_creation_time(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, CREATION_TIME_FORMAT).ok()
}

fn creation_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_creation_time))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// The service has sent codes both as strings and as numbers
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

// search_time arrives as a decimal string ("0.004")
fn search_time<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        serde_json::Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "unexpected search_time value: {}",
            other
        ))),
    }
}
