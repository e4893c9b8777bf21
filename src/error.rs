use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything that can go wrong between the console and the backend.
///
/// Transport failures and non-2xx responses are kept apart: the gateway only
/// produces `Network`, the status variants are produced by callers that
/// interpret a response with [`ApiError::from_response`].
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response at all (DNS, refused connection, reset, ...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 401, usually a missing or expired session token
    #[error("not authenticated: {0}")]
    Unauthorized(String),

    /// 403 on a privilege-gated action
    #[error("permission denied: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx response
    #[error("request failed ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("session storage error: {0}")]
    Session(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Consumes a non-2xx response and classifies it.
    pub async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::from_status(status, &body)
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = resolve_message(status, body);
        match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            _ => ApiError::Rejected { status, message },
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Forbidden(_))
    }

    /// The backend-provided text, without the category prefix of `Display`.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Config(m) => m.clone(),
            ApiError::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Picks the most useful message out of an error body.
///
/// Order: a bare JSON string, then an `error` field, then a `message` field,
/// then the raw text, then a generic message for the status category.
pub fn resolve_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        match &value {
            serde_json::Value::String(s) if !s.is_empty() => return s.clone(),
            serde_json::Value::Object(map) => {
                for key in ["error", "message", "msg"] {
                    if let Some(serde_json::Value::String(s)) = map.get(key) {
                        if !s.is_empty() {
                            return s.clone();
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    generic_message(status).to_string()
}

fn generic_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED => "Authentication required",
        StatusCode::FORBIDDEN => "Permission denied",
        StatusCode::NOT_FOUND => "Resource not found",
        StatusCode::CONFLICT => "Conflicting record",
        s if s.is_client_error() => "Invalid request",
        s if s.is_server_error() => "Backend error",
        _ => "Request failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_structured_error_field() {
        let msg = resolve_message(StatusCode::CONFLICT, r#"{"error":"已在白名单中","status":"approved"}"#);
        assert_eq!(msg, "已在白名单中");
    }

    #[test]
    fn accepts_bare_json_string() {
        let msg = resolve_message(StatusCode::BAD_REQUEST, r#""Connection failed: timed out""#);
        assert_eq!(msg, "Connection failed: timed out");
    }

    #[test]
    fn falls_back_to_text_then_generic() {
        assert_eq!(resolve_message(StatusCode::INTERNAL_SERVER_ERROR, "db down"), "db down");
        assert_eq!(resolve_message(StatusCode::INTERNAL_SERVER_ERROR, ""), "Backend error");
        assert_eq!(resolve_message(StatusCode::FORBIDDEN, "  "), "Permission denied");
    }

    #[test]
    fn object_without_known_fields_uses_raw_text() {
        let body = r#"{"code":17}"#;
        assert_eq!(resolve_message(StatusCode::BAD_REQUEST, body), body);
    }

    #[test]
    fn classifies_by_status() {
        assert!(ApiError::from_status(StatusCode::FORBIDDEN, "Access denied").is_forbidden());
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream");
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.detail(), "upstream");
    }
}
