use catalogue::{LookupError, MetadataField};
use thiserror::Error;

use crate::tree::DocKind;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("catalogue lookup failed for {identifier}: {reason}")]
    CatalogueLookupFailed { identifier: String, reason: String },
    #[error("metadata {field} is not allowed for {kind}")]
    MetadataNotAllowed { field: MetadataField, kind: DocKind },
    #[error("invalid document structure: {0}")]
    Preferences(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("could not copy asset {path}: {reason}")]
    AssetCopy { path: String, reason: String },
    #[error("image folder {folder} is not valid: {problems}")]
    InvalidFolder { folder: String, problems: String },
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    pub fn lookup(identifier: &str, err: LookupError) -> Self {
        ImportError::CatalogueLookupFailed {
            identifier: identifier.to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<lopdf::Error> for ImportError {
    fn from(e: lopdf::Error) -> Self {
        ImportError::Pdf(e.to_string())
    }
}

impl From<toml::de::Error> for ImportError {
    fn from(e: toml::de::Error) -> Self {
        ImportError::Config(e.to_string())
    }
}

impl From<regex::Error> for ImportError {
    fn from(e: regex::Error) -> Self {
        ImportError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
