//! Cell arena
//!
//! One anonymous private mapping carved into fixed 64 KiB slots. Slot 0
//! holds the arena descriptor; every other slot is a cell: an 8-byte header
//! (reference count plus a redundant tag) followed by the payload. Equal
//! slot sizes keep the free list fragmentation-free and let the sweep walk
//! the touched region linearly.
//!
//! Free slots are threaded into a singly-linked chunk list. A chunk covers
//! one or more consecutive slots; allocation either consumes the head chunk
//! whole or peels off its trailing slot. The initial state is a single
//! wilderness chunk spanning the whole region, and the watermark
//! (`heap_size`) only grows when the wilderness is consumed, so the
//! touched-slot range for the sweep is always the top of the region.
//!
//! The reservation is large (70 GiB by default) but pages are only
//! committed on first touch; when the kernel refuses, the request halves
//! until it fits.

use crate::value::{Slot, Tag};
use std::ptr;
use tracing::debug;

/// Bytes per slot, header included.
pub const SLOT_SIZE: usize = 64 * 1024;

/// Bytes of header before each cell payload. 8 rather than 6 so every
/// payload is 8-byte aligned.
pub const HEADER_SIZE: usize = 8;

/// Usable payload bytes per cell.
pub const CELL_SIZE: usize = SLOT_SIZE - HEADER_SIZE;

/// Reservation floor for the halving fallback.
const MIN_RESERVE: usize = 16 << 20;

/// Per-cell metadata, immediately before the payload.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub rc: u32,
    pub tag: u16,
    _pad: u16,
}

/// Arena descriptor, stored in slot 0.
#[repr(C)]
struct Descriptor {
    /// Head of the free-chunk list; 0 means exhausted
    first_free: Slot,
    _pad: u32,
    /// Watermark: bytes ever carved out of the wilderness chunk
    heap_size: usize,
    /// Bytes covered by slots 1..slot_count
    total_size: usize,
}

/// Free-chunk link, written over the payload of the chunk's first slot.
#[repr(C)]
struct FreeChunk {
    /// Next chunk in the free list; 0 terminates
    next: Slot,
    _pad: u32,
    /// Bytes covered by this chunk (a multiple of `SLOT_SIZE`)
    size: usize,
}

pub struct Arena {
    base: *mut u8,
    region: usize,
    slot_count: Slot,
}

impl Arena {
    /// Reserve a region and install the descriptor and the wilderness
    /// chunk. Halves the request on mmap failure down to a floor before
    /// giving up.
    pub fn reserve(max_bytes: usize) -> Result<Arena, String> {
        let mut want = (max_bytes / SLOT_SIZE) * SLOT_SIZE;
        want = want.max(MIN_RESERVE);
        let base = loop {
            let p = unsafe {
                libc::mmap(
                    ptr::null_mut(),
                    want,
                    libc::PROT_READ | libc::PROT_WRITE,
                    map_flags(),
                    -1,
                    0,
                )
            };
            if p != libc::MAP_FAILED {
                break p as *mut u8;
            }
            if want <= MIN_RESERVE {
                return Err(format!(
                    "mmap: cannot reserve {} bytes: {}",
                    want,
                    std::io::Error::last_os_error()
                ));
            }
            want /= 2;
        };
        debug!(bytes = want, "arena reserved");

        let slot_count = (want / SLOT_SIZE) as Slot;
        let arena = Arena {
            base,
            region: want,
            slot_count,
        };
        let total = (slot_count as usize - 1) * SLOT_SIZE;
        unsafe {
            *arena.descriptor() = Descriptor {
                first_free: 1,
                _pad: 0,
                heap_size: 0,
                total_size: total,
            };
            *arena.chunk_mut(1) = FreeChunk {
                next: 0,
                _pad: 0,
                size: total,
            };
        }
        Ok(arena)
    }

    fn descriptor(&self) -> *mut Descriptor {
        self.base as *mut Descriptor
    }

    fn slot_base(&self, slot: Slot) -> *mut u8 {
        debug_assert!(slot > 0 && slot < self.slot_count);
        unsafe { self.base.add(slot as usize * SLOT_SIZE) }
    }

    /// Pointer to the payload of `slot`; 8-byte aligned, `CELL_SIZE` long.
    pub(crate) fn payload_ptr(&self, slot: Slot) -> *mut u8 {
        unsafe { self.slot_base(slot).add(HEADER_SIZE) }
    }

    fn chunk_mut(&self, slot: Slot) -> *mut FreeChunk {
        self.payload_ptr(slot) as *mut FreeChunk
    }

    pub(crate) fn header(&self, slot: Slot) -> Header {
        unsafe { *(self.slot_base(slot) as *const Header) }
    }

    pub(crate) fn set_rc(&mut self, slot: Slot, rc: u32) {
        unsafe { (*(self.slot_base(slot) as *mut Header)).rc = rc }
    }

    pub(crate) fn set_tag(&mut self, slot: Slot, tag: Tag) {
        unsafe { (*(self.slot_base(slot) as *mut Header)).tag = tag as u16 }
    }

    /// Carve one cell out of the free list and initialise its header with
    /// rc 1 and the given tag. Returns `None` when the head chunk is
    /// absent or smaller than a slot; the arena is left unchanged.
    pub(crate) fn alloc(&mut self, tag: Tag) -> Option<Slot> {
        let d = self.descriptor();
        let head = unsafe { (*d).first_free };
        if head == 0 {
            return None;
        }
        let chunk = self.chunk_mut(head);
        let (next, size) = unsafe { ((*chunk).next, (*chunk).size) };
        if size < SLOT_SIZE {
            return None;
        }
        let slot = if size == SLOT_SIZE {
            // chunk size == wanted size: unlink it whole
            unsafe { (*d).first_free = next };
            head
        } else {
            // chunk is larger: peel off the trailing slot
            unsafe { (*chunk).size = size - SLOT_SIZE };
            head + ((size - SLOT_SIZE) / SLOT_SIZE) as Slot
        };
        if next == 0 {
            // consumed from the wilderness: the watermark grows
            unsafe { (*d).heap_size += SLOT_SIZE };
        }
        unsafe {
            *(self.slot_base(slot) as *mut Header) = Header {
                rc: 1,
                tag: tag as u16,
                _pad: 0,
            };
        }
        Some(slot)
    }

    /// Return a cell to the free list as a single-slot chunk. The rc is
    /// cleared; the tag stays for sweep observation.
    pub(crate) fn free(&mut self, slot: Slot) {
        let d = self.descriptor();
        unsafe {
            *self.chunk_mut(slot) = FreeChunk {
                next: (*d).first_free,
                _pad: 0,
                size: SLOT_SIZE,
            };
            (*(self.slot_base(slot) as *mut Header)).rc = 0;
            (*d).first_free = slot;
        }
    }

    /// Overwrite the payload (not the header) with zeros.
    pub(crate) fn zero(&mut self, slot: Slot) {
        unsafe { ptr::write_bytes(self.payload_ptr(slot), 0, CELL_SIZE) }
    }

    /// Slots the sweep has to look at: every slot ever carved out of the
    /// wilderness. Freed-and-recycled slots stay inside this range.
    pub(crate) fn touched_slots(&self) -> std::ops::Range<Slot> {
        let touched = unsafe { (*self.descriptor()).heap_size } / SLOT_SIZE;
        let touched = (touched as Slot).min(self.slot_count - 1);
        (self.slot_count - touched)..self.slot_count
    }

    /// Slots still available in the wilderness chunk.
    pub fn free_slots(&self) -> usize {
        let d = unsafe { &*self.descriptor() };
        (d.total_size - d.heap_size.min(d.total_size)) / SLOT_SIZE
    }

    pub fn slot_count(&self) -> Slot {
        self.slot_count
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.region);
        }
    }
}

#[cfg(target_os = "linux")]
fn map_flags() -> libc::c_int {
    // MAP_NORESERVE keeps a huge reservation honest under strict
    // overcommit accounting.
    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE
}

#[cfg(not(target_os = "linux"))]
fn map_flags() -> libc::c_int {
    libc::MAP_PRIVATE | libc::MAP_ANON
}
