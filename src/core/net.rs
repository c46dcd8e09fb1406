// src/core/net.rs
use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};

use crate::config::consts::USER_AGENT;
use crate::error::ConfigError;

/// Blocking client with a per-request timeout and fixed default headers.
/// Built once per run; clones share the connection pool.
pub fn client(timeout: Duration, headers: &BTreeMap<String, String>) -> Result<Client, ConfigError> {
    let mut map = HeaderMap::new();
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::Source(format!("bad header name `{name}`: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::Source(format!("bad value for header `{name}`: {e}")))?;
        map.insert(name, value);
    }

    Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(map)
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Source(format!("cannot build HTTP client: {e}")))
}
