//! HTTP plumbing shared by the index and account clients.
//!
//! [`Transport`] is the only place a request leaves the process. The default
//! implementation wraps a blocking reqwest client; tests swap in a recording
//! fake.

use indextank_core::query::escape;
use indextank_core::ClientConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// JSON body, already encoded
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Canonical reason phrase for the status code
    pub fn reason(&self) -> &'static str {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::MalformedResponse)
    }
}

/// Sends one request and hands back the status and the fully read body.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Transport backed by `reqwest::blocking`.
///
/// Credentials embedded in the API URL (`https://:secret@host`) are sent as
/// HTTP basic auth by reqwest.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

/// Strip credentials so URLs can be logged.
pub(crate) fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        Err(_) => "<invalid url>".to_string(),
    }
}

/// Join `(name, value)` pairs into an escaped query string.
pub(crate) fn encode_params(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(name, value)| format!("{}={}", name, escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Send a request without a body.
pub(crate) fn send(transport: &dyn Transport, method: Method, url: &str) -> Result<HttpResponse> {
    dispatch(transport, method, url, None)
}

/// Send a request with `body` encoded as JSON.
pub(crate) fn send_json<B>(
    transport: &dyn Transport,
    method: Method,
    url: &str,
    body: &B,
) -> Result<HttpResponse>
where
    B: Serialize + ?Sized,
{
    let encoded = serde_json::to_vec(body)?;
    dispatch(transport, method, url, Some(encoded))
}

fn dispatch(
    transport: &dyn Transport,
    method: Method,
    url: &str,
    body: Option<Vec<u8>>,
) -> Result<HttpResponse> {
    debug!(
        method = %method,
        url = %redact(url),
        body_len = body.as_ref().map_or(0, Vec::len),
        "Sending request"
    );
    let response = transport.send(HttpRequest {
        method,
        url: url.to_string(),
        body,
    })?;
    debug!(status = response.status, body_len = response.body.len(), "Received response");
    Ok(response)
}

/// GET `url?params` and parse a JSON object response. An empty body is read
/// as `{}`.
pub(crate) fn get_json_object<T>(
    transport: &dyn Transport,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T>
where
    T: DeserializeOwned,
{
    let uri = if params.is_empty() {
        url.to_string()
    } else {
        format!("{}?{}", url, encode_params(params))
    };

    let response = check_status(send(transport, Method::GET, &uri)?)?;
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_str("{}").map_err(ClientError::MalformedResponse);
    }
    response.json()
}

/// Apply the common status policy: 2xx passes through, 404 means the index is
/// missing, anything else becomes [`ClientError::Server`].
pub(crate) fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    if response.status == 404 {
        warn!("Index does not exist (HTTP 404)");
        return Err(ClientError::IndexNotFound);
    }
    Err(server_error(&response))
}

/// Build a [`ClientError::Server`], preferring the server's own message.
pub(crate) fn server_error(response: &HttpResponse) -> ClientError {
    let text = response.text();
    let message = if text.trim().is_empty() {
        response.reason().to_string()
    } else {
        text
    };
    warn!(status = response.status, %message, "Request rejected by server");
    ClientError::Server {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use std::collections::BTreeMap;

    #[test]
    fn test_check_status_policy() {
        assert!(check_status(HttpResponse::new(200, "")).is_ok());
        assert!(check_status(HttpResponse::new(204, "")).is_ok());
        assert!(matches!(
            check_status(HttpResponse::new(404, "")),
            Err(ClientError::IndexNotFound)
        ));

        match check_status(HttpResponse::new(400, r#"{"error": "bad field"}"#)) {
            Err(ClientError::Server { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, r#"{"error": "bad field"}"#);
            }
            other => panic!("unexpected: {:?}", other),
        }

        match check_status(HttpResponse::new(503, "")) {
            Err(ClientError::Server { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "Service Unavailable");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_send_json_encodes_body() {
        let transport = MockTransport::new();
        transport.respond(200, "");

        let body = BTreeMap::from([("definition", "-age")]);
        send_json(&*transport, Method::PUT, "http://api.test/x", &body).unwrap();

        let request = transport.last_request();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.body_json(), serde_json::json!({"definition": "-age"}));
    }

    #[test]
    fn test_get_json_object_appends_params_and_handles_empty_body() {
        let transport = MockTransport::new();
        transport.respond(200, "");

        let value: BTreeMap<String, serde_json::Value> = get_json_object(
            &*transport,
            "http://api.test/v1/indexes/idx/search",
            &[("q", "cats dogs")],
        )
        .unwrap();
        assert!(value.is_empty());
        assert_eq!(
            transport.last_request().url,
            "http://api.test/v1/indexes/idx/search?q=cats+dogs"
        );
    }

    #[test]
    fn test_get_json_object_rejects_non_json() {
        let transport = MockTransport::new();
        transport.respond(200, "<html>oops</html>");

        let result: Result<BTreeMap<String, serde_json::Value>> =
            get_json_object(&*transport, "http://api.test/v1/indexes", &[]);
        assert!(matches!(result, Err(ClientError::MalformedResponse(_))));
    }

    #[test]
    fn test_redact_hides_credentials() {
        assert_eq!(
            redact("https://:secret@xyz.api.searchify.com/v1/indexes/idx"),
            "https://xyz.api.searchify.com/v1/indexes/idx"
        );
        assert_eq!(redact("http://localhost:8080/v1"), "http://localhost:8080/v1");
    }
}
