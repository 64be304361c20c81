//! Entry point of the paxtier storage engine.
//!
//! The engine owns one shared arena per memory tier and the registry
//! of per-relation allocators. Relations are created from finalized
//! column-group schemas supplied by the catalog layer.
use crate::arena::{Arena, MemTier};
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::relation::{RelationStorage, TierArenas};
use parking_lot::RwLock;
use paxtier_catalog::{ColumnGroupSchema, RelationID, RelationSpec};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

pub struct StorageEngine {
    config: StorageConfig,
    arenas: TierArenas,
    relations: RwLock<HashMap<RelationID, Arc<RelationStorage>>>,
}

impl StorageEngine {
    /// Bring up the engine: map both tier arenas according to the
    /// configuration. The non-volatile arena is file-backed when a
    /// path is configured and falls back to anonymous memory
    /// otherwise.
    pub fn new(config: StorageConfig) -> Result<StorageEngine> {
        assert!(config.block_capacity > 0);
        let volatile = Arc::new(Arena::anon(
            MemTier::Volatile,
            config.volatile_arena_size.as_u64() as usize,
        )?);
        let nonvolatile_size = config.nonvolatile_arena_size.as_u64() as usize;
        let nonvolatile = if config.nonvolatile_path.is_empty() {
            Arc::new(Arena::anon(MemTier::NonVolatile, nonvolatile_size)?)
        } else {
            Arc::new(Arena::file_backed(
                Path::new(&config.nonvolatile_path),
                nonvolatile_size,
            )?)
        };
        tracing::info!(
            block_capacity = config.block_capacity,
            volatile_arena_size = volatile.size(),
            nonvolatile_arena_size = nonvolatile.size(),
            "storage engine started"
        );
        Ok(StorageEngine {
            config,
            arenas: TierArenas {
                volatile,
                nonvolatile,
            },
            relations: RwLock::new(HashMap::new()),
        })
    }

    #[inline]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[inline]
    pub fn arena(&self, tier: MemTier) -> &Arc<Arena> {
        self.arenas.arena(tier)
    }

    /// Finalize the relation spec and register its allocator. Blocks
    /// are created lazily on first slot demand.
    pub fn create_relation(
        &self,
        relation_id: RelationID,
        spec: RelationSpec,
    ) -> Result<Arc<RelationStorage>> {
        let schema = ColumnGroupSchema::finalize(spec)?;
        let mut g = self.relations.write();
        if g.contains_key(&relation_id) {
            return Err(Error::RelationAlreadyExists);
        }
        let relation = Arc::new(RelationStorage::new(
            relation_id,
            schema,
            self.config.block_capacity,
            self.arenas.clone(),
        ));
        g.insert(relation_id, Arc::clone(&relation));
        tracing::info!(
            relation_id,
            name = relation.schema().relation_name(),
            "relation storage created"
        );
        Ok(relation)
    }

    #[inline]
    pub fn relation(&self, relation_id: RelationID) -> Result<Arc<RelationStorage>> {
        self.relations
            .read()
            .get(&relation_id)
            .cloned()
            .ok_or(Error::RelationNotFound)
    }
}
