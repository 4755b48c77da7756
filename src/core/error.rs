

use thiserror::Error;


#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("CQL parse error at token {position}: {message}")]
    CqlParse { message: String, position: usize },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn cql(message: impl Into<String>, position: usize) -> Self {
        Self::CqlParse {
            message: message.into(),
            position,
        }
    }
}


pub type Result<T> = std::result::Result<T, CatalogError>;
