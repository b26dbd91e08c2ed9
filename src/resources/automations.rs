//! Automations available to run against tenders.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;

/// An external automation the backend can run against a tender's documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Automation {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// # Errors
///
/// [`ApiError::Api`] on backend rejection, transport/session errors otherwise.
pub async fn list(api: &ApiClient) -> Result<Vec<Automation>, ApiError> {
    api.request_json(Method::GET, "/automations", None).await
}
