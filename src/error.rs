use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Westpac export failed: {0}")]
    Export(String),

    #[error("Failed to parse statement: {0}")]
    Parse(String),

    #[error("YNAB import failed: {0}")]
    Import(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
