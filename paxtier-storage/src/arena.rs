use crate::error::{Error, Result};
use libc::{
    c_void, madvise, mmap, munmap, MADV_DONTFORK, MADV_HUGEPAGE, MAP_ANONYMOUS, MAP_FAILED,
    MAP_PRIVATE, PROT_READ, PROT_WRITE,
};
use memmap2::MmapRaw;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::path::Path;

/// Memory class a block is placed in. Orthogonal to block kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemTier {
    Volatile,
    NonVolatile,
}

/// Stable handle into an arena region.
///
/// Handles are offsets, not raw addresses, so block ownership and
/// lifetime stay explicit: a handle is resolved through the arena that
/// issued it and must not outlive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSlice {
    offset: usize,
    len: usize,
}

impl ArenaSlice {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

enum Backing {
    // anonymous private mapping, unmapped on drop.
    Anon,
    // file-backed mapping, unmapped when MmapRaw drops.
    File(#[allow(dead_code)] MmapRaw),
}

/// One contiguous pre-mapped region per memory tier, shared by every
/// execution context attached to the owning engine.
///
/// Allocation is bump-only: segments are carved off the region front
/// and never returned individually. The region is reclaimed as a whole
/// when the arena drops, which only happens on engine teardown.
pub struct Arena {
    base: *mut u8,
    size: usize,
    tier: MemTier,
    allocated: Mutex<usize>,
    backing: Backing,
}

unsafe impl Send for Arena {}

unsafe impl Sync for Arena {}

impl Arena {
    /// Create an anonymous-memory arena for given tier.
    #[inline]
    pub fn anon(tier: MemTier, size: usize) -> Result<Self> {
        let base = unsafe { mmap_allocate(size)? };
        tracing::info!(?tier, size, "anonymous arena mapped");
        Ok(Arena {
            base,
            size,
            tier,
            allocated: Mutex::new(0),
            backing: Backing::Anon,
        })
    }

    /// Create a file-backed arena for the non-volatile tier.
    ///
    /// The file is created if missing and sized up front so that the
    /// whole region is addressable immediately.
    #[inline]
    pub fn file_backed(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        file.set_len(size as u64)?;
        let mmap = MmapRaw::map_raw(&file)?;
        let base = mmap.as_mut_ptr();
        tracing::info!(path = %path.as_ref().display(), size, "file-backed arena mapped");
        Ok(Arena {
            base,
            size,
            tier: MemTier::NonVolatile,
            allocated: Mutex::new(0),
            backing: Backing::File(mmap),
        })
    }

    #[inline]
    pub fn tier(&self) -> MemTier {
        self.tier
    }

    /// Total bytes of this arena.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes handed out so far, including alignment padding.
    #[inline]
    pub fn allocated(&self) -> usize {
        *self.allocated.lock()
    }

    /// Carve a new region off the arena.
    ///
    /// Fails with `InsufficientMemory` when the remaining space cannot
    /// satisfy the request; capacity exhaustion here is a hard failure
    /// of the requesting operation, not retried.
    #[inline]
    pub fn alloc(&self, len: usize) -> Result<ArenaSlice> {
        let aligned = align8(len);
        let mut allocated = self.allocated.lock();
        if *allocated + aligned > self.size {
            return Err(Error::InsufficientMemory(len));
        }
        let offset = *allocated;
        *allocated += aligned;
        Ok(ArenaSlice { offset, len })
    }

    /// Resolve a handle to its bytes.
    #[inline]
    pub fn slice(&self, handle: ArenaSlice) -> &[u8] {
        debug_assert!(handle.offset + handle.len <= self.size);
        unsafe { std::slice::from_raw_parts(self.base.add(handle.offset), handle.len) }
    }

    /// Resolve a handle to mutable bytes.
    ///
    /// # Safety
    ///
    /// Caller must guarantee exclusive access to the addressed range,
    /// e.g. by holding a claimed slot that maps to it.
    #[inline]
    pub unsafe fn slice_mut(&self, handle: ArenaSlice) -> &mut [u8] {
        debug_assert!(handle.offset + handle.len <= self.size);
        std::slice::from_raw_parts_mut(self.base.add(handle.offset), handle.len)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Backing::Anon = self.backing {
            unsafe { mmap_deallocate(self.base, self.size) }
        }
    }
}

#[inline]
const fn align8(len: usize) -> usize {
    (len + 7) & !7
}

#[inline]
unsafe fn mmap_allocate(total_bytes: usize) -> Result<*mut u8> {
    let memory_chunk = mmap(
        std::ptr::null_mut(),
        total_bytes,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
    );
    if memory_chunk == MAP_FAILED {
        return Err(Error::InsufficientMemory(total_bytes));
    }
    madvise(memory_chunk, total_bytes, MADV_HUGEPAGE);
    madvise(memory_chunk, total_bytes, MADV_DONTFORK);
    Ok(memory_chunk as *mut u8)
}

#[inline]
unsafe fn mmap_deallocate(ptr: *mut u8, total_bytes: usize) {
    munmap(ptr as *mut c_void, total_bytes);
}
