use crate::arena::{Arena, ArenaSlice, MemTier};
use crate::error::Result;
use crate::slot_map::SlotMap;
use parking_lot::Mutex;
use paxtier_catalog::ColumnGroupSchema;
use smallvec::SmallVec;
use std::sync::Arc;

pub type BlockID = u32;

/// Physical layout class of a block.
///
/// Only fixed-length blocks are implemented; `Variable` names the
/// overflow-block collaborator that can plug in later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Fixed,
    Variable,
}

/// Identifies one claimed tuple position: the block it was claimed
/// from plus the slot index inside that block. A slot index alone is
/// meaningless without its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub block_id: BlockID,
    pub slot_idx: usize,
}

/// One per-column-group memory region of a block.
pub struct Segment {
    handle: ArenaSlice,
    tuple_size: usize,
}

impl Segment {
    #[inline]
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    #[inline]
    pub fn tuple_size(&self) -> usize {
        self.tuple_size
    }
}

/// One fixed-capacity storage unit of a relation.
///
/// A block is immutable in identity: capacity, tier, kind and the
/// number and order of segments never change after creation. Only the
/// slot map mutates, under its own lock, so claims on different blocks
/// of one relation proceed concurrently.
pub struct RelationBlock {
    kind: BlockKind,
    tier: MemTier,
    capacity: usize,
    total_size: usize,
    // per-column-group regions, in schema order.
    segments: SmallVec<[Segment; 4]>,
    slot_map: Mutex<SlotMap>,
    arena: Arc<Arena>,
}

impl RelationBlock {
    /// Allocate a fixed-length block sized from the column-group
    /// schema: one segment per group, `tuple_size * capacity` bytes
    /// each, carved from the shared arena of the requested tier.
    pub(crate) fn allocate(
        schema: &ColumnGroupSchema,
        tier: MemTier,
        capacity: usize,
        arena: Arc<Arena>,
    ) -> Result<Self> {
        debug_assert!(capacity > 0);
        debug_assert!(arena.tier() == tier);
        let mut segments: SmallVec<[Segment; 4]> = SmallVec::with_capacity(schema.group_count());
        let mut total_size = 0usize;
        for cg in schema.groups() {
            let seg_size = cg.tuple_size * capacity;
            let handle = arena.alloc(seg_size)?;
            tracing::debug!(group_id = cg.id, size = seg_size, "column group segment");
            total_size += seg_size;
            segments.push(Segment {
                handle,
                tuple_size: cg.tuple_size,
            });
        }
        tracing::debug!(
            ?tier,
            kind = ?BlockKind::Fixed,
            size = total_size,
            capacity,
            "relation block allocated"
        );
        Ok(RelationBlock {
            kind: BlockKind::Fixed,
            tier,
            capacity,
            total_size,
            segments,
            slot_map: Mutex::new(SlotMap::new(capacity)),
            arena,
        })
    }

    #[inline]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[inline]
    pub fn tier(&self) -> MemTier {
        self.tier
    }

    /// Number of tuple slots this block holds.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sum of all segment lengths.
    #[inline]
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    #[inline]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[inline]
    pub fn segment_size(&self, group_idx: usize) -> usize {
        self.segments[group_idx].len()
    }

    #[inline]
    pub fn free_slots(&self) -> usize {
        self.slot_map.lock().free_count()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.slot_map.lock().is_full()
    }

    /// Returns whether the slot is currently claimed.
    #[inline]
    pub fn is_claimed(&self, slot_idx: usize) -> bool {
        self.slot_map.lock().is_set(slot_idx)
    }

    /// Claim the lowest free slot, or `None` if the block is full.
    ///
    /// Check and claim happen under the slot map lock, so two
    /// concurrent claimants can never receive the same index.
    #[inline]
    pub fn claim_slot(&self) -> Option<usize> {
        self.slot_map.lock().claim()
    }

    /// Return a slot to the free pool. The block itself survives even
    /// when it becomes fully empty.
    #[inline]
    pub fn release_slot(&self, slot_idx: usize) -> Result<()> {
        self.slot_map.lock().release(slot_idx)
    }

    /// Full segment bytes of the column group at given schema position.
    #[inline]
    pub fn segment(&self, group_idx: usize) -> &[u8] {
        self.arena.slice(self.segments[group_idx].handle)
    }

    /// Bytes of one slot within the column group at given schema
    /// position.
    #[inline]
    pub fn slot(&self, group_idx: usize, slot_idx: usize) -> &[u8] {
        debug_assert!(slot_idx < self.capacity);
        let tuple_size = self.segments[group_idx].tuple_size;
        &self.segment(group_idx)[slot_idx * tuple_size..(slot_idx + 1) * tuple_size]
    }

    /// Mutable bytes of one slot within the column group at given
    /// schema position.
    ///
    /// # Safety
    ///
    /// Caller must hold the claim on `slot_idx` and be the only writer
    /// of that slot.
    #[inline]
    pub unsafe fn slot_mut(&self, group_idx: usize, slot_idx: usize) -> &mut [u8] {
        debug_assert!(slot_idx < self.capacity);
        let seg = &self.segments[group_idx];
        let tuple_size = seg.tuple_size;
        &mut self.arena.slice_mut(seg.handle)[slot_idx * tuple_size..(slot_idx + 1) * tuple_size]
    }
}
