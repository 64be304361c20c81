use crate::{ColumnGroupID, ColumnID};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchemaError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("relation has no column group")]
    NoColumnGroup,
    #[error("duplicate column group {0}")]
    DuplicateColumnGroup(ColumnGroupID),
    #[error("column group {0} has zero tuple size")]
    ZeroTupleSize(ColumnGroupID),
    #[error("column group {0} has no column")]
    EmptyColumnGroup(ColumnGroupID),
    #[error("column {0} listed in multiple column groups")]
    DuplicateColumn(ColumnID),
}
