use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ApiResult;
use crate::models::user::{Role, SessionUser};

/// Claims the backend puts in its tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // username
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    #[serde(default)]
    pub user: Option<SessionUser>,
}

impl Session {
    /// Role from the stored profile, or from the token when no profile was
    /// returned at login. Only used to hide actions; the backend decides.
    pub fn role(&self) -> Option<Role> {
        if let Some(user) = &self.user {
            return Some(user.role.clone());
        }
        peek_claims(&self.token).map(|c| Role::from(c.role))
    }

    pub fn username(&self) -> Option<String> {
        if let Some(user) = &self.user {
            return Some(user.username.clone());
        }
        peek_claims(&self.token).map(|c| c.sub)
    }

    pub fn is_super_admin(&self) -> bool {
        self.role() == Some(Role::SuperAdmin)
    }
}

/// Reads claims without checking the signature; the secret lives server-side.
pub fn peek_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}

/// The one piece of durable client state: `{token, user}` as JSON on disk.
///
/// Nothing is cached in memory, so a login or logout from another console
/// process is seen on the next request.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<Session> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.token.is_empty() => Some(session),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Ignoring corrupt session file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        self.load().map(|s| s.token)
    }

    pub fn save(&self, session: &Session) -> ApiResult<()> {
        let raw = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    pub fn clear(&self) -> ApiResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
