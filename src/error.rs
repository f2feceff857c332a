use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Persistence(#[from] sea_orm::DbErr),
    #[error("{}", multiline("Not found", .0))]
    NotFound(String),
    #[error("{}", multiline("Invalid input", .0))]
    Validation(String),
    #[error("migration to version {version} failed: {message}")]
    Migration { version: i32, message: String },
    #[error("not signed in; run `dono auth login` first")]
    Unauthenticated,
}

fn multiline(label: &str, message: &str) -> String {
    if message.contains('\n') {
        format!("{label}:\n{message}")
    } else {
        format!("{label}: {message}")
    }
}
