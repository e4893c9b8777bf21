use reqwest::Method;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::user::{ChangePasswordRequest, LoginRequest, LoginResponse};
use crate::session::Session;

/// Exchanges credentials for a token and persists `{token, user}`.
pub async fn login(client: &ApiClient, username: &str, password: &str) -> ApiResult<Session> {
    let payload = LoginRequest {
        username: username.to_string(),
        password: password.to_string(),
    };

    let response: LoginResponse = client
        .mutate_json(Method::POST, "/api/auth/login", &payload)
        .await?;

    let token = response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Login succeeded but no token was returned".to_string()))?;

    let session = Session {
        token,
        user: response.user,
    };
    client.session().save(&session)?;
    tracing::info!(username, "logged in");
    Ok(session)
}

pub fn logout(client: &ApiClient) -> ApiResult<()> {
    client.session().clear()?;
    tracing::info!("logged out");
    Ok(())
}

pub fn current_session(client: &ApiClient) -> Option<Session> {
    client.session().load()
}

/// Views only super admins get: audit logs, verifications and ban deletion.
/// Checked against the stored role before any request goes out.
pub fn require_super_admin(client: &ApiClient) -> ApiResult<Session> {
    let session = current_session(client).ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;
    if !session.is_super_admin() {
        return Err(ApiError::Forbidden("Super admin access required".to_string()));
    }
    Ok(session)
}

pub async fn change_password(client: &ApiClient, old_password: &str, new_password: &str) -> ApiResult<()> {
    let payload = ChangePasswordRequest {
        old_password: old_password.to_string(),
        new_password: new_password.to_string(),
    };
    client
        .mutate(Method::POST, "/api/auth/change-password", Some(&payload))
        .await
}
