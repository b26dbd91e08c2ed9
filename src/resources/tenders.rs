//! Tender CRUD and PDF document upload.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::{ApiClient, expect_json};
use crate::error::ApiError;

/// A tender under a space, the unit that documents and analyses attach to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tender {
    pub id: Uuid,
    pub space_id: Uuid,
    pub title: String,
}

/// An uploaded PDF belonging to a tender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderDocument {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub filename: String,
}

/// # Errors
///
/// [`ApiError::Api`] on backend rejection, transport/session errors otherwise.
pub async fn list(api: &ApiClient, space_id: Uuid) -> Result<Vec<Tender>, ApiError> {
    api.request_json(Method::GET, &format!("/spaces/{space_id}/tenders"), None).await
}

/// # Errors
///
/// See [`list`].
pub async fn create(api: &ApiClient, space_id: Uuid, title: &str) -> Result<Tender, ApiError> {
    api.request_json(
        Method::POST,
        &format!("/spaces/{space_id}/tenders"),
        Some(&serde_json::json!({ "title": title })),
    )
    .await
}

/// # Errors
///
/// See [`list`].
pub async fn get(api: &ApiClient, tender_id: Uuid) -> Result<Tender, ApiError> {
    api.request_json(Method::GET, &format!("/tenders/{tender_id}"), None).await
}

/// # Errors
///
/// See [`list`].
pub async fn delete(api: &ApiClient, tender_id: Uuid) -> Result<(), ApiError> {
    api.request_empty(Method::DELETE, &format!("/tenders/{tender_id}"), None).await
}

/// Upload a PDF into a tender as a multipart form. The form is rebuilt if
/// the request is retried after a token refresh.
///
/// # Errors
///
/// See [`list`].
pub async fn upload_document(
    api: &ApiClient,
    tender_id: Uuid,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<TenderDocument, ApiError> {
    let path = format!("/tenders/{tender_id}/documents");
    let filename = filename.to_owned();
    let response = api
        .upload(&path, move || {
            let part = reqwest::multipart::Part::bytes(bytes.clone())
                .file_name(filename.clone())
                .mime_str("application/pdf")?;
            Ok(reqwest::multipart::Form::new().part("file", part))
        })
        .await?;
    expect_json(response).await
}

/// # Errors
///
/// See [`list`].
pub async fn documents(api: &ApiClient, tender_id: Uuid) -> Result<Vec<TenderDocument>, ApiError> {
    api.request_json(Method::GET, &format!("/tenders/{tender_id}/documents"), None).await
}

/// # Errors
///
/// See [`list`].
pub async fn delete_document(api: &ApiClient, document_id: Uuid) -> Result<(), ApiError> {
    api.request_empty(Method::DELETE, &format!("/documents/{document_id}"), None).await
}

#[cfg(test)]
#[path = "tenders_test.rs"]
mod tests;
