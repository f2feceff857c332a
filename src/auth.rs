use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::ensure_parent_dir;
use crate::error::AppError;

/// Session handed over by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub last_sign_in_at: Option<String>,
    pub provider: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

pub fn load_session(path: &Path) -> Result<Option<Session>, AppError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn save_session(path: &Path, session: &Session) -> Result<(), AppError> {
    if session.user_id.trim().is_empty() {
        return Err(AppError::Validation("user id cannot be empty".to_string()));
    }
    ensure_parent_dir(path)?;
    fs::write(path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

/// Removes the stored session; `false` when nobody was signed in.
pub fn clear_session(path: &Path) -> Result<bool, AppError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
