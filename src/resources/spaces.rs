//! Space (workspace) CRUD and membership.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ApiClient;
use crate::error::ApiError;

/// A workspace owned by a user, holding tenders and members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
}

/// Role granted to a collaborator within a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceRole {
    Owner,
    Editor,
    Viewer,
}

/// A collaborator's membership in a space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceMember {
    pub user_id: Uuid,
    pub email: String,
    #[serde(rename = "full_name")]
    pub name: String,
    pub role: SpaceRole,
}

/// # Errors
///
/// [`ApiError::Api`] on backend rejection, transport/session errors otherwise.
pub async fn list(api: &ApiClient) -> Result<Vec<Space>, ApiError> {
    api.request_json(Method::GET, "/spaces", None).await
}

/// # Errors
///
/// See [`list`].
pub async fn create(api: &ApiClient, name: &str) -> Result<Space, ApiError> {
    api.request_json(Method::POST, "/spaces", Some(&serde_json::json!({ "name": name })))
        .await
}

/// # Errors
///
/// See [`list`].
pub async fn get(api: &ApiClient, space_id: Uuid) -> Result<Space, ApiError> {
    api.request_json(Method::GET, &format!("/spaces/{space_id}"), None).await
}

/// # Errors
///
/// See [`list`].
pub async fn rename(api: &ApiClient, space_id: Uuid, name: &str) -> Result<Space, ApiError> {
    api.request_json(
        Method::PATCH,
        &format!("/spaces/{space_id}"),
        Some(&serde_json::json!({ "name": name })),
    )
    .await
}

/// # Errors
///
/// See [`list`].
pub async fn delete(api: &ApiClient, space_id: Uuid) -> Result<(), ApiError> {
    api.request_empty(Method::DELETE, &format!("/spaces/{space_id}"), None).await
}

/// Invite a collaborator by email with an initial role.
///
/// # Errors
///
/// See [`list`].
pub async fn invite(
    api: &ApiClient,
    space_id: Uuid,
    email: &str,
    role: SpaceRole,
) -> Result<SpaceMember, ApiError> {
    api.request_json(
        Method::POST,
        &format!("/spaces/{space_id}/members"),
        Some(&serde_json::json!({ "email": email, "role": role })),
    )
    .await
}

/// # Errors
///
/// See [`list`].
pub async fn members(api: &ApiClient, space_id: Uuid) -> Result<Vec<SpaceMember>, ApiError> {
    api.request_json(Method::GET, &format!("/spaces/{space_id}/members"), None).await
}

/// # Errors
///
/// See [`list`].
pub async fn set_role(
    api: &ApiClient,
    space_id: Uuid,
    user_id: Uuid,
    role: SpaceRole,
) -> Result<SpaceMember, ApiError> {
    api.request_json(
        Method::PATCH,
        &format!("/spaces/{space_id}/members/{user_id}"),
        Some(&serde_json::json!({ "role": role })),
    )
    .await
}

/// # Errors
///
/// See [`list`].
pub async fn remove_member(api: &ApiClient, space_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
    api.request_empty(Method::DELETE, &format!("/spaces/{space_id}/members/{user_id}"), None)
        .await
}

#[cfg(test)]
#[path = "spaces_test.rs"]
mod tests;
