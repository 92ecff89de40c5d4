//! Read-only API resources shown to the user: testimonials, thermometers and
//! their temperature readings.
//!
//! Records stay opaque like user and profile records. List endpoints may
//! answer with a bare array or a paginated `{ "results": [...] }` page.

use std::sync::Arc;

use serde_json::Value;

use crate::gateway::transport::{ApiRequest, HttpTransport};
use crate::session::types::Record;

const TESTIMONIALS_PATH: &str = "testimonials/";
const THERMOMETERS_PATH: &str = "thermometers/";
const TEMPERATURES_PATH: &str = "temperatures/";

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource request failed: {0}")]
    Request(String),
    #[error("resource request returned status {status}")]
    Status { status: u16 },
    #[error("resource response parse failed: {0}")]
    Parse(String),
    #[error("not logged in")]
    NotLoggedIn,
}

pub struct ResourceClient {
    transport: Arc<dyn HttpTransport>,
    api_root: String,
}

impl ResourceClient {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, api_root: impl Into<String>) -> Self {
        Self { transport, api_root: api_root.into() }
    }

    /// Public product testimonials.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of records.
    pub async fn testimonials(&self) -> Result<Vec<Record>, ResourceError> {
        self.list(TESTIMONIALS_PATH, None).await
    }

    /// Thermometers visible to the token's user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of records.
    pub async fn thermometers(&self, token: &str) -> Result<Vec<Record>, ResourceError> {
        self.list(THERMOMETERS_PATH, Some(token)).await
    }

    /// Temperature readings of the token user's thermometers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a list of records.
    pub async fn temperatures(&self, token: &str) -> Result<Vec<Record>, ResourceError> {
        self.list(TEMPERATURES_PATH, Some(token)).await
    }

    async fn list(&self, path: &str, token: Option<&str>) -> Result<Vec<Record>, ResourceError> {
        let mut request = ApiRequest::get(format!("{}{path}", self.api_root));
        if let Some(token) = token {
            request = request.with_token(token);
        }

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| ResourceError::Request(e.to_string()))?;
        if !response.is_success() {
            return Err(ResourceError::Status { status: response.status });
        }

        let body: Value = serde_json::from_str(&response.body).map_err(|e| ResourceError::Parse(e.to_string()))?;
        parse_list(body)
    }
}

fn parse_list(body: Value) -> Result<Vec<Record>, ResourceError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut page) => match page.remove("results") {
            Some(Value::Array(items)) => items,
            _ => return Err(ResourceError::Parse("object body has no `results` list".into())),
        },
        _ => return Err(ResourceError::Parse("expected a list".into())),
    };

    items
        .into_iter()
        .map(|item| Record::from_value(item).ok_or_else(|| ResourceError::Parse("list item is not an object".into())))
        .collect()
}

#[cfg(test)]
#[path = "resources_test.rs"]
mod tests;
