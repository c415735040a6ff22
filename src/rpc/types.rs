//! Call data types

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default per-request timeout handed to the transport
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ─────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────

/// A concrete service instance a call is sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Instance identifier
    pub id: String,

    /// Network address (host:port)
    pub address: String,
}

impl Node {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────

/// An outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Target service name
    pub service: String,

    /// Method on the service
    pub endpoint: String,

    /// Request body
    pub body: serde_json::Value,
}

impl Request {
    pub fn new(service: impl Into<String>, endpoint: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            service: service.into(),
            endpoint: endpoint.into(),
            body,
        }
    }

    /// Build a request from any serializable body
    pub fn from_body<T: Serialize>(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        body: &T,
    ) -> Result<Self> {
        Ok(Self::new(service, endpoint, serde_json::to_value(body)?))
    }

    /// Call name: `<service>.<endpoint>`
    pub fn name(&self) -> String {
        format!("{}.{}", self.service, self.endpoint)
    }
}

/// Reply slot filled in by the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub body: serde_json::Value,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the body with a serialized value
    pub fn set<T: Serialize>(&mut self, value: &T) -> Result<()> {
        self.body = serde_json::to_value(value)?;
        Ok(())
    }

    /// Decode the body into a typed value
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.body.clone())?)
    }
}

// ─────────────────────────────────────────────────────────────────
// Call Options
// ─────────────────────────────────────────────────────────────────

/// Per-call options passed through to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct CallOptions {
    /// How long the transport may wait for a reply
    pub request_timeout: Duration,

    /// Transport-level retries; the pipeline itself never retries
    pub retries: u32,

    /// Headers or other metadata for the transport
    pub metadata: HashMap<String, String>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retries: 0,
            metadata: HashMap::new(),
        }
    }
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_name() {
        let req = Request::new("users", "Get", json!({"id": 1}));
        assert_eq!(req.name(), "users.Get");
    }

    #[test]
    fn test_response_decode() {
        #[derive(Deserialize, Serialize, PartialEq, Debug)]
        struct User {
            id: u32,
        }

        let mut resp = Response::new();
        assert!(resp.body.is_null());
        resp.set(&User { id: 3 }).unwrap();
        assert_eq!(resp.decode::<User>().unwrap(), User { id: 3 });
        assert!(resp.decode::<Vec<String>>().is_err());
    }

    #[test]
    fn test_call_options_defaults() {
        let opts = CallOptions::default();
        assert_eq!(opts.request_timeout, Duration::from_secs(30));
        assert_eq!(opts.retries, 0);

        let opts = opts.with_timeout(Duration::from_millis(50)).with_metadata("x-id", "7");
        assert_eq!(opts.request_timeout, Duration::from_millis(50));
        assert_eq!(opts.metadata.get("x-id").map(String::as_str), Some("7"));
    }
}
