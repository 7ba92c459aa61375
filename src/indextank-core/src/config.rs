use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Private API URL of the account, credentials included
    /// (e.g. `https://:secret@xyz.api.searchify.com`)
    pub api_url: String,

    /// Whole-request timeout in seconds; 0 disables it
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("indextank-rs/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        validate_api_url(&config.api_url)?;
        Ok(config)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

/// Check that `api_url` is an absolute http(s) URL and return it without a
/// trailing slash.
pub fn validate_api_url(api_url: &str) -> Result<String, ValidationError> {
    let parsed = url::Url::parse(api_url)
        .map_err(|e| ValidationError::InvalidApiUrl(format!("{}: {}", api_url, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ValidationError::InvalidApiUrl(format!(
                "scheme must be http or https, got {}",
                other
            )))
        }
    }

    Ok(api_url.strip_suffix('/').unwrap_or(api_url).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_url() {
        assert_eq!(
            validate_api_url("https://:secret@xyz.api.searchify.com/").unwrap(),
            "https://:secret@xyz.api.searchify.com"
        );
        assert_eq!(
            validate_api_url("http://localhost:8080").unwrap(),
            "http://localhost:8080"
        );
        assert!(matches!(
            validate_api_url("ftp://example.com"),
            Err(ValidationError::InvalidApiUrl(_))
        ));
        assert!(validate_api_url("not a url").is_err());
    }

    #[test]
    fn test_config_defaults_from_json() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"api_url": "http://example.com"}"#).unwrap();
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("indextank-rs/"));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_load_rejects_bad_scheme() {
        let path = std::env::temp_dir().join(format!(
            "indextank-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"api_url": "gopher://example.com"}"#).unwrap();
        let result = ClientConfig::load(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();
        assert!(result.is_err());
    }
}
