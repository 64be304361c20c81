pub mod arena;
pub mod block;
pub mod config;
pub mod dir;
pub mod engine;
pub mod error;
pub mod relation;
pub mod slot_map;

pub mod prelude {
    pub use crate::arena::MemTier;
    pub use crate::block::{BlockID, BlockKind, RelationBlock, SlotRef};
    pub use crate::config::StorageConfig;
    pub use crate::engine::StorageEngine;
    pub use crate::error::{Error, Result};
    pub use crate::relation::RelationStorage;
    pub use paxtier_catalog::{ColumnGroupSpec, RelationSpec};
}
