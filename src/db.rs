use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::{Database, DatabaseConnection};
use url::Url;

use crate::error::AppError;
use crate::migrate::{self, MigrationReport};

pub fn resolve_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("dono.db")
}

pub fn resolve_session_path(data_dir: &Path) -> PathBuf {
    data_dir.join("session.json")
}

pub fn resolve_preferences_path(data_dir: &Path) -> PathBuf {
    data_dir.join("preferences.json")
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::Validation(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    Ok(Database::connect(&sqlite_url).await?)
}

/// Connects and brings the schema up to date. Nothing is served from a
/// database whose migrations did not complete.
pub async fn open(path: &Path) -> Result<(DatabaseConnection, MigrationReport), AppError> {
    let db = connect(path).await?;
    let report = migrate::migrate(&db).await?;
    if !report.applied.is_empty() {
        tracing::info!(from = report.from, to = report.to, "database schema upgraded");
    }
    Ok((db, report))
}
