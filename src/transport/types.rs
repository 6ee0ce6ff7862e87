//! Request and outcome types shared by every transport.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

/// HTTP verb of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// One request, created per call and dropped once it settles
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Path relative to the API base URL
    pub target: String,
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, target).with_body(body)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Copy of this request carrying `Authorization: Bearer <token>`.
    pub fn authorized(&self, access_token: &str) -> Self {
        self.clone()
            .with_header(AUTHORIZATION, format!("Bearer {}", access_token))
    }

    /// Value of the Authorization header, if set
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).map(String::as_str)
    }
}

/// Header name carrying the access credential
pub const AUTHORIZATION: &str = "Authorization";

/// Status code that signals an expired or invalid access credential
pub const UNAUTHORIZED: u16 = 401;

/// A successful response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

/// A failed response, or a transport fault when `status` is None
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub status: Option<u16>,
    pub body: Value,
}

impl Failure {
    /// Failure reported by the server
    pub fn http(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// Network-level fault (timeout, DNS, connection reset)
    pub fn fault(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: Value::String(message.into()),
        }
    }

    /// Body rendered for error messages
    pub fn message(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Normalized result of one request. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(Response),
    Failure(Failure),
}

impl RequestOutcome {
    pub fn success(status: u16, body: Value) -> Self {
        RequestOutcome::Success(Response { status, body })
    }

    pub fn failure(status: u16, body: Value) -> Self {
        RequestOutcome::Failure(Failure::http(status, body))
    }

    pub fn fault(message: impl Into<String>) -> Self {
        RequestOutcome::Failure(Failure::fault(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// Whether this is an authorization failure (HTTP 401)
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RequestOutcome::Failure(f) if f.status == Some(UNAUTHORIZED))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            RequestOutcome::Success(r) => Some(r.status),
            RequestOutcome::Failure(f) => f.status,
        }
    }
}
