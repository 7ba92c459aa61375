//! Search query builder
//!
//! [`SearchQuery`] accumulates the parameters of a search call and renders
//! them as the query string understood by the `/search` endpoint:
//!
//! | parameter            | source                                          |
//! |----------------------|-------------------------------------------------|
//! | `q`                  | query text                                      |
//! | `start`              | result offset, only when > 0                    |
//! | `len`                | result count, always                            |
//! | `function`           | scoring function, only when > 0                 |
//! | `snippet` / `fetch`  | comma-joined field lists                        |
//! | `var<N>`             | query-time scoring variables                    |
//! | `fetch_variables`    | `*` when enabled                                |
//! | `fetch_categories`   | `*` when enabled                                |
//! | `category_filters`   | JSON object of category -> allowed values       |
//! | `filter_docvar<N>`   | `floor:ceil[,floor:ceil...]` over document vars |
//! | `filter_function<N>` | same, over computed function scores             |
//!
//! Infinite range bounds are written as `*` (`*:10` means "at most 10").

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ValidationError;

pub const DEFAULT_LENGTH: usize = 10;

const UNBOUNDED: &str = "*";

/// Percent-encode a query parameter value (`application/x-www-form-urlencoded`).
pub fn escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Shortest digits that parse back to the same `f64`. Magnitudes below 1e-6
/// or from 1e21 up use exponent notation (`1e-7`, `1e300`), everything else
/// is plain decimal.
pub fn format_number(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && (magnitude < 1e-6 || magnitude >= 1e21) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

fn format_bound(value: f64) -> String {
    if value.is_infinite() {
        UNBOUNDED.to_string()
    } else {
        format_number(value)
    }
}

/// Inclusive `floor..=ceil` bounds of a range filter. An infinite side is
/// unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub floor: f64,
    pub ceil: f64,
}

impl Range {
    pub fn new(floor: f64, ceil: f64) -> Self {
        Self { floor, ceil }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", format_bound(self.floor), format_bound(self.ceil))
    }
}

/// Mutable accumulator for search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    text: String,
    start: usize,
    length: usize,
    scoring_function: u32,
    fetch_fields: Vec<String>,
    snippet_fields: Vec<String>,
    fetch_variables: bool,
    fetch_categories: bool,
    variables: BTreeMap<u32, f64>,
    docvar_filters: BTreeMap<u32, Vec<Range>>,
    function_filters: BTreeMap<u32, Vec<Range>>,
    category_filters: BTreeMap<String, Vec<String>>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start: 0,
            length: DEFAULT_LENGTH,
            scoring_function: 0,
            fetch_fields: Vec::new(),
            snippet_fields: Vec::new(),
            fetch_variables: false,
            fetch_categories: false,
            variables: BTreeMap::new(),
            docvar_filters: BTreeMap::new(),
            function_filters: BTreeMap::new(),
            category_filters: BTreeMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn start(&mut self, start: usize) -> &mut Self {
        self.start = start;
        self
    }

    pub fn num_results(&mut self, length: usize) -> &mut Self {
        self.length = length;
        self
    }

    /// Replace the list of fields returned verbatim with each result
    pub fn fetch_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the list of fields returned as highlighted snippets
    pub fn snippet_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snippet_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn fetch_variables(&mut self) -> &mut Self {
        self.fetch_variables = true;
        self
    }

    pub fn fetch_categories(&mut self) -> &mut Self {
        self.fetch_categories = true;
        self
    }

    /// Rank with the given scoring function; 0 selects the index default.
    pub fn scoring_function(&mut self, function: u32) -> &mut Self {
        self.scoring_function = function;
        self
    }

    /// Set one query-time variable, replacing any earlier value for `slot`.
    pub fn query_variable(&mut self, slot: u32, value: f64) -> &mut Self {
        self.variables.insert(slot, value);
        self
    }

    /// Upsert several query-time variables.
    pub fn query_variables(&mut self, variables: impl IntoIterator<Item = (u32, f64)>) -> &mut Self {
        self.variables.extend(variables);
        self
    }

    /// Restrict results to documents whose variable `slot` lies in `[floor, ceil]`.
    /// Repeated calls for the same slot OR the ranges together.
    pub fn document_variable_filter(&mut self, slot: u32, floor: f64, ceil: f64) -> &mut Self {
        self.docvar_filters
            .entry(slot)
            .or_default()
            .push(Range::new(floor, ceil));
        self
    }

    /// Restrict results to documents whose score under function `function`
    /// lies in `[floor, ceil]`.
    pub fn function_filter(&mut self, function: u32, floor: f64, ceil: f64) -> &mut Self {
        self.function_filters
            .entry(function)
            .or_default()
            .push(Range::new(floor, ceil));
        self
    }

    /// Merge category filters. Values for a category already present are
    /// replaced, not unioned.
    pub fn category_filter<I, K, V>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, values) in filters {
            self.category_filters
                .insert(name.into(), values.into_iter().map(Into::into).collect());
        }
        self
    }

    /// Reject values that cannot be expressed on the wire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (slot, value) in &self.variables {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue {
                    name: format!("var{}", slot),
                });
            }
        }
        let filters = [
            ("filter_docvar", &self.docvar_filters),
            ("filter_function", &self.function_filters),
        ];
        for (prefix, ranges) in filters {
            for (slot, list) in ranges {
                if list.iter().any(|r| r.floor.is_nan() || r.ceil.is_nan()) {
                    return Err(ValidationError::NonFiniteValue {
                        name: format!("{}{}", prefix, slot),
                    });
                }
            }
        }
        Ok(())
    }

    /// Ordered `(name, raw value)` pairs, before escaping.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("q".to_string(), self.text.clone())];

        if self.start > 0 {
            params.push(("start".to_string(), self.start.to_string()));
        }
        params.push(("len".to_string(), self.length.to_string()));
        if self.scoring_function > 0 {
            params.push(("function".to_string(), self.scoring_function.to_string()));
        }
        if !self.snippet_fields.is_empty() {
            params.push(("snippet".to_string(), self.snippet_fields.join(",")));
        }
        if !self.fetch_fields.is_empty() {
            params.push(("fetch".to_string(), self.fetch_fields.join(",")));
        }
        for (slot, value) in &self.variables {
            params.push((format!("var{}", slot), format_number(*value)));
        }
        if self.fetch_variables {
            params.push(("fetch_variables".to_string(), UNBOUNDED.to_string()));
        }
        if self.fetch_categories {
            params.push(("fetch_categories".to_string(), UNBOUNDED.to_string()));
        }
        if !self.category_filters.is_empty() {
            // A map of strings to string lists always serializes
            let json = serde_json::to_string(&self.category_filters).unwrap_or_default();
            params.push(("category_filters".to_string(), json));
        }
        push_ranges(&mut params, "filter_docvar", &self.docvar_filters);
        push_ranges(&mut params, "filter_function", &self.function_filters);

        params
    }

    /// Render the canonical query string, e.g. `q=golang&len=10`.
    pub fn to_query_string(&self) -> String {
        self.params()
            .iter()
            .map(|(name, value)| format!("{}={}", name, escape(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn push_ranges(params: &mut Vec<(String, String)>, prefix: &str, ranges: &BTreeMap<u32, Vec<Range>>) {
    for (slot, list) in ranges {
        let value = list
            .iter()
            .map(Range::to_string)
            .collect::<Vec<_>>()
            .join(",");
        params.push((format!("{}{}", prefix, slot), value));
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_string() {
        let query = SearchQuery::new("golang");
        assert_eq!(query.to_query_string(), "q=golang&len=10");
    }

    #[test]
    fn test_query_text_is_escaped() {
        let query = SearchQuery::new("cats OR dogs&more");
        assert_eq!(query.to_query_string(), "q=cats+OR+dogs%26more&len=10");
    }

    #[test]
    fn test_start_and_function_only_when_positive() {
        let mut query = SearchQuery::new("golang");
        query.start(0).scoring_function(0);
        assert_eq!(query.to_query_string(), "q=golang&len=10");

        query.start(20).num_results(5).scoring_function(2);
        assert_eq!(
            query.to_query_string(),
            "q=golang&start=20&len=5&function=2"
        );
    }

    #[test]
    fn test_field_lists_joined_and_escaped_as_one_value() {
        let mut query = SearchQuery::new("golang");
        query
            .fetch_fields(["title", "url"])
            .snippet_fields(vec!["text".to_string()]);
        assert_eq!(
            query.to_query_string(),
            "q=golang&len=10&snippet=text&fetch=title%2Curl"
        );

        query.fetch_fields(["text"]);
        assert!(query.to_query_string().ends_with("&fetch=text"));
    }

    #[test]
    fn test_query_variables_upsert() {
        let mut query = SearchQuery::new("q");
        query.query_variable(0, 1.5).query_variable(2, -97.744444);
        query.query_variables([(0, 3.0), (1, 0.25)]);
        assert_eq!(
            query.to_query_string(),
            "q=q&len=10&var0=3&var1=0.25&var2=-97.744444"
        );
    }

    #[test]
    fn test_fetch_flags_use_star_sentinel() {
        let mut query = SearchQuery::new("q");
        query.fetch_variables().fetch_categories();
        let params = query.params();
        assert!(params.contains(&("fetch_variables".to_string(), "*".to_string())));
        assert!(params.contains(&("fetch_categories".to_string(), "*".to_string())));
        assert!(query
            .to_query_string()
            .ends_with("&fetch_variables=*&fetch_categories=*"));
    }

    #[test]
    fn test_category_filters_json_encoded_and_overwritten_per_name() {
        let mut query = SearchQuery::new("q");
        query.category_filter([("type", vec!["article", "post"])]);
        query.category_filter([("lang", vec!["go"])]);
        query.category_filter([("type", vec!["video"])]);

        let params = query.params();
        let (_, value) = params
            .iter()
            .find(|(name, _)| name == "category_filters")
            .unwrap();
        let decoded: BTreeMap<String, Vec<String>> = serde_json::from_str(value).unwrap();
        assert_eq!(decoded["type"], vec!["video"]);
        assert_eq!(decoded["lang"], vec!["go"]);

        assert!(query
            .to_query_string()
            .contains("&category_filters=%7B%22lang%22%3A%5B%22go%22%5D"));
    }

    #[test]
    fn test_repeated_range_filters_share_one_parameter() {
        let mut query = SearchQuery::new("q");
        query
            .document_variable_filter(0, 1.0, 5.5)
            .document_variable_filter(0, 10.0, 20.0)
            .document_variable_filter(3, -1.0, 1.0);

        let params = query.params();
        let docvar0: Vec<_> = params.iter().filter(|(n, _)| n == "filter_docvar0").collect();
        assert_eq!(docvar0.len(), 1);
        assert_eq!(docvar0[0].1, "1:5.5,10:20");
        assert!(params.contains(&("filter_docvar3".to_string(), "-1:1".to_string())));
    }

    #[test]
    fn test_function_filter_with_unbounded_sides() {
        let mut query = SearchQuery::new("q");
        query
            .function_filter(1, f64::NEG_INFINITY, 10.0)
            .function_filter(1, 100.0, f64::INFINITY);
        assert!(query
            .to_query_string()
            .ends_with("&filter_function1=*%3A10%2C100%3A*"));
        assert_eq!(
            Range::new(f64::NEG_INFINITY, f64::INFINITY).to_string(),
            "*:*"
        );
        assert_eq!(Range::new(2.5, f64::INFINITY).to_string(), "2.5:*");
    }

    #[test]
    fn test_serialization_is_idempotent() {
        let mut query = SearchQuery::new("golang gophers");
        query
            .start(10)
            .fetch_fields(["title"])
            .query_variable(5, 0.1)
            .query_variable(1, 7.0)
            .category_filter([("b", vec!["1"]), ("a", vec!["2", "3"])])
            .document_variable_filter(2, 0.0, 1.0)
            .function_filter(0, 0.0, 1.0);
        let first = query.to_query_string();
        let second = query.to_query_string();
        assert_eq!(first, second);
        assert_eq!(query.clone().to_string(), first);
    }

    #[test]
    fn test_full_parameter_order() {
        let mut query = SearchQuery::new("x");
        query
            .function_filter(0, 0.0, 1.0)
            .document_variable_filter(0, 0.0, 1.0)
            .category_filter([("t", vec!["v"])])
            .fetch_categories()
            .fetch_variables()
            .query_variable(0, 1.0)
            .fetch_fields(["f"])
            .snippet_fields(["s"])
            .scoring_function(1)
            .num_results(3)
            .start(1);
        let names: Vec<String> = query.params().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "q",
                "start",
                "len",
                "function",
                "snippet",
                "fetch",
                "var0",
                "fetch_variables",
                "fetch_categories",
                "category_filters",
                "filter_docvar0",
                "filter_function0",
            ]
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut query = SearchQuery::new("q");
        assert!(query.validate().is_ok());

        query.document_variable_filter(0, f64::NEG_INFINITY, f64::INFINITY);
        assert!(query.validate().is_ok());

        query.function_filter(4, f64::NAN, 1.0);
        assert_eq!(
            query.validate(),
            Err(ValidationError::NonFiniteValue {
                name: "filter_function4".to_string()
            })
        );

        let mut query = SearchQuery::new("q");
        query.query_variable(2, f64::NAN);
        assert_eq!(
            query.validate(),
            Err(ValidationError::NonFiniteValue {
                name: "var2".to_string()
            })
        );
    }

    #[test]
    fn test_validate_rejects_infinite_query_variable() {
        let mut query = SearchQuery::new("q");
        query.query_variable(0, f64::INFINITY);
        assert_eq!(
            query.validate(),
            Err(ValidationError::NonFiniteValue {
                name: "var0".to_string()
            })
        );

        let mut query = SearchQuery::new("q");
        query.query_variable(1, f64::NEG_INFINITY);
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_format_number_shortest_round_trip() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-97.744444), "-97.744444");
        assert_eq!(format_number(1e-7), "1e-7");
        assert_eq!(format_number(1e300), "1e300");
        assert_eq!(format_number(-2.5e-10), "-2.5e-10");
        assert_eq!(format_number(1234.5), "1234.5");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(0.000001), "0.000001");
        assert_eq!(format_number(1e21), "1e21");
        let tricky = 0.1 + 0.2;
        assert_eq!(format_number(tricky).parse::<f64>().unwrap(), tricky);
    }
}
