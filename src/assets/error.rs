use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("subject id is empty")]
    EmptySubjectId,

    #[error("invalid subject id '{subject_id}': {reason}")]
    InvalidSubjectId { subject_id: String, reason: String },

    #[error("no enrolled image for subject '{subject_id}'")]
    NotFound { subject_id: String },

    #[error("failed to read enrolled image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type AssetResult<T> = Result<T, AssetError>;
