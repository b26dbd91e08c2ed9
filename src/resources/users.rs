//! Current-user profile endpoint.

use reqwest::Method;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::session::UserProfile;

/// Fetch the authenticated user's profile from `/users/me`.
///
/// # Errors
///
/// [`ApiError::Api`] on backend rejection, transport/session errors otherwise.
pub async fn me(api: &ApiClient) -> Result<UserProfile, ApiError> {
    api.request_json(Method::GET, "/users/me", None).await
}
