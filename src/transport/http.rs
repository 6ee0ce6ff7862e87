//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::client::Transport;
use super::types::{Method, RequestDescriptor, RequestOutcome};
use crate::error::{AuditdashError, Result};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl HttpTransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Transport that talks to the audit API over HTTP
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AuditdashError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Absolute URL for a request target
    fn url_for(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else if target.starts_with('/') {
            format!("{}{}", self.base_url, target)
        } else {
            format!("{}/{}", self.base_url, target)
        }
    }
}

/// Parse a response body: JSON when possible, raw text otherwise, Null when empty
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> RequestOutcome {
        let url = self.url_for(&request.target);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        log::debug!("{} {}", request.method, url);

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("{} {} failed: {}", request.method, url, e);
                return RequestOutcome::fault(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(text) => parse_body(text),
            Err(e) => return RequestOutcome::fault(format!("Failed to read response body: {}", e)),
        };

        log::debug!("{} {} -> {}", request.method, url, status.as_u16());

        if status.is_success() {
            RequestOutcome::success(status.as_u16(), body)
        } else {
            RequestOutcome::failure(status.as_u16(), body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new("https://audit.example.com/api/")).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpTransportConfig::new("https://audit.example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));

        let config = config.with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_url_for_joins_paths() {
        let t = transport();
        assert_eq!(t.url_for("/scans/"), "https://audit.example.com/api/scans/");
        assert_eq!(t.url_for("scans/"), "https://audit.example.com/api/scans/");
        assert_eq!(t.url_for("https://other.example.com/x"), "https://other.example.com/x");
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(String::new()), Value::Null);
        assert_eq!(parse_body(r#"{"a": 1}"#.to_string()), serde_json::json!({"a": 1}));
        assert_eq!(
            parse_body("Bad Gateway".to_string()),
            Value::String("Bad Gateway".to_string())
        );
    }

    #[tokio::test]
    async fn test_connection_fault_is_failure_without_status() {
        // Nothing listens on port 9 of localhost
        let t = HttpTransport::new(
            HttpTransportConfig::new("http://127.0.0.1:9").with_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let outcome = t.send(&RequestDescriptor::get("/scans/")).await;
        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), None);
    }
}
