use crate::arena::MemTier;
use crate::block::{BlockID, BlockKind};

const LIST_COUNT: usize = 4;

/// Flat index of a (tier, kind) pair into the directory's lists.
///
/// Keeping selection a data lookup instead of nested branching makes
/// adding a tier or kind a table change, not a control-flow change.
#[inline]
pub(crate) const fn list_index(tier: MemTier, kind: BlockKind) -> usize {
    tier as usize * 2 + kind as usize
}

/// Per-relation registry of blocks, one append-only list per
/// (tier, kind) combination.
///
/// The directory is generic over all four combinations so a
/// variable-length collaborator can plug in later; this core only ever
/// populates the two `Fixed` lists. A block, once appended, is never
/// removed or reordered.
pub struct BlockDirectory {
    lists: [Vec<BlockID>; LIST_COUNT],
}

impl BlockDirectory {
    #[inline]
    pub fn new() -> Self {
        BlockDirectory {
            lists: [vec![], vec![], vec![], vec![]],
        }
    }

    /// Blocks of given tier and kind, in append order.
    #[inline]
    pub fn list(&self, tier: MemTier, kind: BlockKind) -> &[BlockID] {
        &self.lists[list_index(tier, kind)]
    }

    /// Append a block to the end of the selected list.
    #[inline]
    pub fn append(&mut self, tier: MemTier, kind: BlockKind, block_id: BlockID) {
        self.lists[list_index(tier, kind)].push(block_id);
    }

    #[inline]
    pub fn block_count(&self, tier: MemTier, kind: BlockKind) -> usize {
        self.lists[list_index(tier, kind)].len()
    }

    #[inline]
    pub fn total_block_count(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum()
    }
}

impl Default for BlockDirectory {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
