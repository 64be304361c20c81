use crate::block::BlockID;
use paxtier_catalog::error::SchemaError;
use paxtier_catalog::ColumnGroupID;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    // arena errors
    #[error("insufficient memory({0})")]
    InsufficientMemory(usize),
    #[error("IO Error")]
    IOError,
    // slot/block errors
    #[error("invalid slot index")]
    InvalidSlotIndex,
    #[error("invalid block id {0}")]
    InvalidBlockId(BlockID),
    #[error("column group {0} not found")]
    ColumnGroupNotFound(ColumnGroupID),
    // engine errors
    #[error("relation not found")]
    RelationNotFound,
    #[error("relation already exists")]
    RelationAlreadyExists,
    #[error("{0}")]
    Schema(#[from] SchemaError),
    #[error("{0} not supported")]
    NotSupported(&'static str),
}

impl From<std::io::Error> for Error {
    #[inline]
    fn from(_src: std::io::Error) -> Self {
        Error::IOError
    }
}
