use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MmapError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("record file is empty")]
    EmptyRecord,

    #[error("mapping is not aligned to {alignment} bytes")]
    Misaligned { alignment: usize },

    #[error("archive validation failed: {0}")]
    InvalidArchive(String),
}

pub type MmapResult<T> = Result<T, MmapError>;
