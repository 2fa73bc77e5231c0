use thiserror::Error;

use crate::config::ExtractError;
use crate::npm::ApiError;
use crate::routing::TransformError;

pub type Result<T> = std::result::Result<T, MigrateError>;

/// Ошибка, на которой останавливается весь прогон
#[derive(Error, Debug)]
pub enum MigrateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("server block #{block} ({server_name}): {source}")]
    Transform {
        block: usize,
        server_name: String,
        #[source]
        source: TransformError,
    },

    #[error("NPM authentication failed: {0}")]
    Auth(#[source] ApiError),

    #[error("site {server_name} was not created: {source}")]
    Submit {
        server_name: String,
        #[source]
        source: ApiError,
    },
}
