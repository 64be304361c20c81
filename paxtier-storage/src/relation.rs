use crate::arena::{Arena, MemTier};
use crate::block::{BlockID, BlockKind, RelationBlock, SlotRef};
use crate::dir::BlockDirectory;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use paxtier_catalog::{ColumnGroupID, ColumnGroupSchema, RelationID};
use std::sync::Arc;

/// One shared arena per memory tier.
#[derive(Clone)]
pub struct TierArenas {
    pub volatile: Arc<Arena>,
    pub nonvolatile: Arc<Arena>,
}

impl TierArenas {
    #[inline]
    pub fn arena(&self, tier: MemTier) -> &Arc<Arena> {
        match tier {
            MemTier::Volatile => &self.volatile,
            MemTier::NonVolatile => &self.nonvolatile,
        }
    }
}

struct RelationBlocks {
    // block table: BlockID is the index of a block in this vector.
    blocks: Vec<Arc<RelationBlock>>,
    dir: BlockDirectory,
}

/// Per-relation block and slot allocator.
///
/// All state is owned by this object and reached through it; callers
/// hold a handle to the relation, never ambient globals. One lock
/// serializes directory scan and growth, so two concurrent "no free
/// block" observations cannot both append when one suffices; slot
/// claims take only the chosen block's own lock.
pub struct RelationStorage {
    relation_id: RelationID,
    schema: ColumnGroupSchema,
    block_capacity: usize,
    arenas: TierArenas,
    inner: Mutex<RelationBlocks>,
}

impl RelationStorage {
    #[inline]
    pub(crate) fn new(
        relation_id: RelationID,
        schema: ColumnGroupSchema,
        block_capacity: usize,
        arenas: TierArenas,
    ) -> Self {
        RelationStorage {
            relation_id,
            schema,
            block_capacity,
            arenas,
            inner: Mutex::new(RelationBlocks {
                blocks: vec![],
                dir: BlockDirectory::new(),
            }),
        }
    }

    #[inline]
    pub fn relation_id(&self) -> RelationID {
        self.relation_id
    }

    #[inline]
    pub fn schema(&self) -> &ColumnGroupSchema {
        &self.schema
    }

    /// Slots per fixed block of this relation.
    #[inline]
    pub fn block_capacity(&self) -> usize {
        self.block_capacity
    }

    /// Find the first block of given tier and kind with spare
    /// capacity, in append order, or create and append a new one.
    ///
    /// First-fit by append order favors filling older blocks before
    /// growing the relation.
    pub fn find_or_create_block(
        &self,
        tier: MemTier,
        kind: BlockKind,
    ) -> Result<(BlockID, Arc<RelationBlock>)> {
        if kind != BlockKind::Fixed {
            return Err(Error::NotSupported("variable-length block allocation"));
        }
        let mut g = self.inner.lock();
        for &block_id in g.dir.list(tier, kind) {
            let block = &g.blocks[block_id as usize];
            if !block.is_full() {
                return Ok((block_id, Arc::clone(block)));
            }
        }
        // no block with free capacity, grow the relation.
        let block = Arc::new(RelationBlock::allocate(
            &self.schema,
            tier,
            self.block_capacity,
            Arc::clone(self.arenas.arena(tier)),
        )?);
        let block_id = g.blocks.len() as BlockID;
        g.blocks.push(Arc::clone(&block));
        g.dir.append(tier, kind, block_id);
        tracing::debug!(
            relation_id = self.relation_id,
            block_id,
            ?tier,
            "block appended to directory"
        );
        Ok((block_id, block))
    }

    /// Claim a free slot in given tier, creating a block if needed.
    ///
    /// Fails only when the tier's arena cannot back a new block; a full
    /// block is always recovered from locally.
    pub fn claim_slot(&self, tier: MemTier) -> Result<SlotRef> {
        loop {
            let (block_id, block) = self.find_or_create_block(tier, BlockKind::Fixed)?;
            // the block had free capacity when selected, but another
            // claimant may have filled it since; retry on the fresh
            // directory state.
            if let Some(slot_idx) = block.claim_slot() {
                tracing::trace!(
                    relation_id = self.relation_id,
                    block_id,
                    slot_idx,
                    free_slots = block.free_slots(),
                    "slot claimed"
                );
                return Ok(SlotRef { block_id, slot_idx });
            }
        }
    }

    /// Release a claimed slot. The owning block is never retired, even
    /// when it becomes fully empty.
    pub fn release_slot(&self, slot: SlotRef) -> Result<()> {
        let block = self.block(slot.block_id)?;
        block.release_slot(slot.slot_idx)?;
        tracing::trace!(
            relation_id = self.relation_id,
            block_id = slot.block_id,
            slot_idx = slot.slot_idx,
            "slot released"
        );
        Ok(())
    }

    /// Resolve a block id issued by this relation.
    #[inline]
    pub fn block(&self, block_id: BlockID) -> Result<Arc<RelationBlock>> {
        let g = self.inner.lock();
        g.blocks
            .get(block_id as usize)
            .cloned()
            .ok_or(Error::InvalidBlockId(block_id))
    }

    /// Schema position of the column group with given id, for segment
    /// access on a resolved block.
    #[inline]
    pub fn group_index(&self, group_id: ColumnGroupID) -> Result<usize> {
        self.schema
            .group_by_id(group_id)
            .map(|(group_idx, _)| group_idx)
            .ok_or(Error::ColumnGroupNotFound(group_id))
    }

    #[inline]
    pub fn block_count(&self, tier: MemTier, kind: BlockKind) -> usize {
        self.inner.lock().dir.block_count(tier, kind)
    }

    #[inline]
    pub fn total_block_count(&self) -> usize {
        self.inner.lock().dir.total_block_count()
    }

    /// Log one record per directory list: tier, kind, block count and
    /// free slots. Diagnostics only.
    pub fn log_blocks(&self) {
        let g = self.inner.lock();
        for tier in [MemTier::Volatile, MemTier::NonVolatile] {
            for kind in [BlockKind::Fixed, BlockKind::Variable] {
                let list = g.dir.list(tier, kind);
                let free_slots: usize = list
                    .iter()
                    .map(|&id| g.blocks[id as usize].free_slots())
                    .sum();
                tracing::debug!(
                    relation_id = self.relation_id,
                    ?tier,
                    ?kind,
                    block_count = list.len(),
                    free_slots,
                    "relation block list"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paxtier_catalog::{ColumnGroupSpec, RelationSpec};
    use std::thread;

    fn test_arenas(size: usize) -> TierArenas {
        TierArenas {
            volatile: Arc::new(Arena::anon(MemTier::Volatile, size).unwrap()),
            nonvolatile: Arc::new(Arena::anon(MemTier::NonVolatile, size).unwrap()),
        }
    }

    fn test_relation(block_capacity: usize) -> RelationStorage {
        let schema = ColumnGroupSchema::finalize(RelationSpec::new(
            "orders",
            vec![
                ColumnGroupSpec::new(0, 16, vec![0, 1]),
                ColumnGroupSpec::new(1, 8, vec![2]),
            ],
        ))
        .unwrap();
        RelationStorage::new(1, schema, block_capacity, test_arenas(1024 * 1024))
    }

    #[test]
    fn test_sequential_claims_fill_first_block() {
        let rel = test_relation(4);
        for k in 0..4 {
            let slot = rel.claim_slot(MemTier::Volatile).unwrap();
            assert_eq!(slot.block_id, 0);
            assert_eq!(slot.slot_idx, k);
        }
        // fifth claim opens a second block at slot 0.
        let slot = rel.claim_slot(MemTier::Volatile).unwrap();
        assert_eq!(slot.block_id, 1);
        assert_eq!(slot.slot_idx, 0);
        assert_eq!(rel.block_count(MemTier::Volatile, BlockKind::Fixed), 2);
    }

    #[test]
    fn test_end_to_end_two_group_layout() {
        let rel = test_relation(4);
        let slot = rel.claim_slot(MemTier::Volatile).unwrap();
        let block = rel.block(slot.block_id).unwrap();
        assert_eq!(rel.group_index(1).unwrap(), 1);
        assert!(matches!(
            rel.group_index(5),
            Err(Error::ColumnGroupNotFound(5))
        ));
        assert_eq!(block.segment_count(), 2);
        assert_eq!(block.segment_size(0), 64);
        assert_eq!(block.segment_size(1), 32);
        assert_eq!(block.free_slots(), 3);
        for _ in 0..3 {
            rel.claim_slot(MemTier::Volatile).unwrap();
        }
        assert_eq!(block.free_slots(), 0);
        let slot = rel.claim_slot(MemTier::Volatile).unwrap();
        assert_eq!(slot.block_id, 1);
        assert_eq!(slot.slot_idx, 0);
        // second block is identically shaped.
        let second = rel.block(1).unwrap();
        assert_eq!(second.segment_count(), block.segment_count());
        assert_eq!(second.segment_size(0), block.segment_size(0));
        assert_eq!(second.segment_size(1), block.segment_size(1));
    }

    #[test]
    fn test_release_reuses_lowest_index() {
        let rel = test_relation(4);
        let mut slots = vec![];
        for _ in 0..4 {
            slots.push(rel.claim_slot(MemTier::Volatile).unwrap());
        }
        rel.release_slot(slots[2]).unwrap();
        let block = rel.block(0).unwrap();
        assert_eq!(block.free_slots(), 1);
        // first-fit reuses the just-released index instead of growing.
        let slot = rel.claim_slot(MemTier::Volatile).unwrap();
        assert_eq!(slot, slots[2]);
        assert_eq!(rel.total_block_count(), 1);
    }

    #[test]
    fn test_release_errors() {
        let rel = test_relation(4);
        let slot = rel.claim_slot(MemTier::Volatile).unwrap();
        let res = rel.release_slot(SlotRef {
            block_id: 0,
            slot_idx: 4,
        });
        assert!(matches!(res, Err(Error::InvalidSlotIndex)));
        let res = rel.release_slot(SlotRef {
            block_id: 9,
            slot_idx: 0,
        });
        assert!(matches!(res, Err(Error::InvalidBlockId(9))));
        assert_eq!(rel.block(0).unwrap().free_slots(), 3);
        rel.release_slot(slot).unwrap();
        // double release is rejected and does not inflate free count.
        let res = rel.release_slot(slot);
        assert!(matches!(res, Err(Error::InvalidSlotIndex)));
        assert_eq!(rel.block(0).unwrap().free_slots(), 4);
    }

    #[test]
    fn test_tiers_are_independent() {
        let rel = test_relation(4);
        let vm = rel.claim_slot(MemTier::Volatile).unwrap();
        let nvm = rel.claim_slot(MemTier::NonVolatile).unwrap();
        // each tier grows its own block.
        assert_ne!(vm.block_id, nvm.block_id);
        assert_eq!(vm.slot_idx, 0);
        assert_eq!(nvm.slot_idx, 0);
        assert_eq!(rel.block_count(MemTier::Volatile, BlockKind::Fixed), 1);
        assert_eq!(rel.block_count(MemTier::NonVolatile, BlockKind::Fixed), 1);
        assert_eq!(rel.block(vm.block_id).unwrap().tier(), MemTier::Volatile);
        assert_eq!(
            rel.block(nvm.block_id).unwrap().tier(),
            MemTier::NonVolatile
        );
    }

    #[test]
    fn test_variable_kind_rejected() {
        let rel = test_relation(4);
        let res = rel.find_or_create_block(MemTier::Volatile, BlockKind::Variable);
        assert!(matches!(res, Err(Error::NotSupported(_))));
    }

    #[test]
    fn test_arena_exhaustion_propagates() {
        let schema = ColumnGroupSchema::finalize(RelationSpec::new(
            "t1",
            vec![ColumnGroupSpec::new(0, 16, vec![0])],
        ))
        .unwrap();
        // room for exactly one 4-slot block of 64 bytes.
        let rel = RelationStorage::new(1, schema, 4, test_arenas(64));
        for _ in 0..4 {
            rel.claim_slot(MemTier::Volatile).unwrap();
        }
        let res = rel.claim_slot(MemTier::Volatile);
        assert!(matches!(res, Err(Error::InsufficientMemory(_))));
    }

    #[test]
    fn test_concurrent_claims_single_block() {
        const CAPACITY: usize = 64;
        const THREADS: usize = 4;
        let rel = test_relation(CAPACITY);
        let block = rel
            .find_or_create_block(MemTier::Volatile, BlockKind::Fixed)
            .unwrap()
            .1;
        let results = easy_parallel::Parallel::new()
            .each(0..THREADS, |_| {
                let mut claimed = vec![];
                for _ in 0..CAPACITY / THREADS {
                    claimed.push(block.claim_slot().unwrap());
                }
                claimed
            })
            .run();
        let mut all: Vec<usize> = results.into_iter().flatten().collect();
        all.sort();
        // exactly capacity distinct indices, no duplicates, no gaps.
        assert_eq!(all, (0..CAPACITY).collect::<Vec<_>>());
        assert_eq!(block.free_slots(), 0);
    }

    #[test]
    fn test_claim_release_churn_keeps_free_count() {
        use rand::Rng;
        let rel = test_relation(8);
        let mut rng = rand::rng();
        let mut live: Vec<SlotRef> = vec![];
        for _ in 0..1000 {
            if live.is_empty() || rng.random_bool(0.6) {
                live.push(rel.claim_slot(MemTier::Volatile).unwrap());
            } else {
                let slot = live.swap_remove(rng.random_range(0..live.len()));
                rel.release_slot(slot).unwrap();
            }
            // free count of every block matches live claims at all times.
            let block_count = rel.block_count(MemTier::Volatile, BlockKind::Fixed);
            for id in 0..block_count {
                let block = rel.block(id as BlockID).unwrap();
                let claimed_here = live.iter().filter(|s| s.block_id == id as BlockID).count();
                assert_eq!(block.free_slots(), 8 - claimed_here);
            }
        }
    }

    #[test]
    fn test_concurrent_claims_across_blocks() {
        const CLAIMS_PER_THREAD: usize = 40;
        const THREADS: usize = 4;
        let rel = Arc::new(test_relation(16));
        let mut handles = vec![];
        for _ in 0..THREADS {
            let rel = Arc::clone(&rel);
            handles.push(thread::spawn(move || {
                let mut claimed = vec![];
                for _ in 0..CLAIMS_PER_THREAD {
                    claimed.push(rel.claim_slot(MemTier::Volatile).unwrap());
                }
                claimed
            }));
        }
        let mut all: Vec<SlotRef> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), THREADS * CLAIMS_PER_THREAD);
        all.sort_by_key(|s| (s.block_id, s.slot_idx));
        all.dedup();
        // no two claimants ever received the same slot.
        assert_eq!(all.len(), THREADS * CLAIMS_PER_THREAD);
        // claimed slots account for every non-free slot.
        let block_count = rel.block_count(MemTier::Volatile, BlockKind::Fixed);
        let free_slots: usize = (0..block_count)
            .map(|id| rel.block(id as BlockID).unwrap().free_slots())
            .sum();
        assert_eq!(block_count * 16 - free_slots, THREADS * CLAIMS_PER_THREAD);
        rel.log_blocks();
    }
}
