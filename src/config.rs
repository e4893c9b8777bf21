use crate::error::{ApiError, ApiResult};
use std::env;
use std::path::PathBuf;

/// Backend used when running against the development environment.
pub const DEV_API_URL: &str = "http://192.168.0.132:8080";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_base_url: String,
    pub session_file: PathBuf,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> ApiResult<Self> {
        dotenvy::dotenv().ok();

        let development = env::var("KZGUARD_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let api_base_url = if development {
            DEV_API_URL.to_string()
        } else {
            env::var("KZGUARD_API_URL").unwrap_or_default()
        };

        Ok(Config {
            api_base_url: normalize_base_url(&api_base_url)?,
            session_file: env::var("KZGUARD_SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".kzguard-session.json")),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Strips a trailing slash so endpoints ("/api/...") can be appended verbatim.
pub fn normalize_base_url(url: &str) -> ApiResult<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(ApiError::Config(
            "KZGUARD_API_URL is required outside development".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ApiError::Config(format!("Invalid KZGUARD_API_URL: {url}")));
    }
    Ok(url.to_string())
}
