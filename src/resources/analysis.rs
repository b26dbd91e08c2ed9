//! Analysis results produced by external automation runs.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;

/// Lifecycle of an automation run as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    /// True once the run can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One automation run against a tender. `payload` is the backend's arbitrary
/// structured output; rendering it is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub automation_id: Uuid,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Trigger an automation run for a tender.
///
/// # Errors
///
/// [`ApiError::Api`] on backend rejection, transport/session errors otherwise.
pub async fn run(
    api: &ApiClient,
    tender_id: Uuid,
    automation_id: Uuid,
) -> Result<AnalysisResult, ApiError> {
    api.request_json(
        Method::POST,
        &format!("/tenders/{tender_id}/analysis"),
        Some(&serde_json::json!({ "automation_id": automation_id })),
    )
    .await
}

/// # Errors
///
/// See [`run`].
pub async fn list(api: &ApiClient, tender_id: Uuid) -> Result<Vec<AnalysisResult>, ApiError> {
    api.request_json(Method::GET, &format!("/tenders/{tender_id}/analysis"), None).await
}

/// # Errors
///
/// See [`run`].
pub async fn get(api: &ApiClient, analysis_id: Uuid) -> Result<AnalysisResult, ApiError> {
    api.request_json(Method::GET, &format!("/analysis/{analysis_id}"), None).await
}

#[cfg(test)]
#[path = "analysis_test.rs"]
mod tests;
