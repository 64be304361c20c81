use crate::error::{Error, Result};

/// Per-block occupancy bitmap with a cached free-slot count.
///
/// Bit i set means slot i is occupied. Bits at positions past the
/// capacity are pre-set at construction so the first-fit scan can
/// work on whole units without a tail check.
pub struct SlotMap {
    bits: Box<[u64]>,
    capacity: usize,
    free_count: usize,
}

impl SlotMap {
    /// Create a slot map with all slots free.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        let unit_count = (capacity + 63) / 64;
        let mut bits = vec![0u64; unit_count].into_boxed_slice();
        // mark tail bits beyond capacity as permanently occupied.
        let tail = capacity % 64;
        if tail != 0 {
            bits[unit_count - 1] = !0u64 << tail;
        }
        SlotMap {
            bits,
            capacity,
            free_count: capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free_count
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.free_count == 0
    }

    /// Returns whether slot at given index is occupied.
    #[inline]
    pub fn is_set(&self, slot_idx: usize) -> bool {
        debug_assert!(slot_idx < self.capacity);
        self.bits[slot_idx / 64] & (1 << (slot_idx % 64)) != 0
    }

    /// Claim the lowest free slot.
    ///
    /// Deterministic first-fit: indices are scanned in ascending order.
    /// Returns `None` when the map is full, which the caller recovers
    /// from by moving to another block.
    #[inline]
    pub fn claim(&mut self) -> Option<usize> {
        if self.free_count == 0 {
            return None;
        }
        for (unit_idx, v) in self.bits.iter_mut().enumerate() {
            let bit_idx = v.trailing_ones();
            if bit_idx < 64 {
                *v |= 1 << bit_idx;
                self.free_count -= 1;
                let slot_idx = unit_idx * 64 + bit_idx as usize;
                debug_assert!(slot_idx < self.capacity);
                return Some(slot_idx);
            }
        }
        // free_count said a slot exists; the scan must find it.
        unreachable!("slot map free count out of sync with bitmap")
    }

    /// Release a claimed slot.
    ///
    /// Fails with `InvalidSlotIndex` when the index is out of range or
    /// the slot is already free, so a duplicate release can never
    /// inflate the free count.
    #[inline]
    pub fn release(&mut self, slot_idx: usize) -> Result<()> {
        if slot_idx >= self.capacity {
            return Err(Error::InvalidSlotIndex);
        }
        let unit_idx = slot_idx / 64;
        let mask = 1u64 << (slot_idx % 64);
        if self.bits[unit_idx] & mask == 0 {
            return Err(Error::InvalidSlotIndex);
        }
        self.bits[unit_idx] &= !mask;
        self.free_count += 1;
        debug_assert!(self.free_count <= self.capacity);
        Ok(())
    }
}
