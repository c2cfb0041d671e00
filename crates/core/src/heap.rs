//! Interpreter heap: the arena plus the error slot
//!
//! `Heap` is the substrate half of the interpreter-state handle. Every
//! container operation takes it explicitly; nothing in this crate is
//! process-global. The reference-counting and sweep half of the lifecycle
//! lives in [`gc`](crate::gc).

use crate::arena::{Arena, CELL_SIZE, HEADER_SIZE};
use crate::error::{ErrorKind, RuntimeError};
use crate::value::{Slot, Tag, Value};
use tracing::debug;

pub struct Heap {
    pub(crate) arena: Arena,
    last_error: Option<RuntimeError>,
}

impl Heap {
    /// Reserve the arena region. `max_bytes` is a ceiling; see
    /// [`Arena::reserve`] for the fallback behaviour.
    pub fn new(max_bytes: usize) -> Result<Heap, String> {
        Ok(Heap {
            arena: Arena::reserve(max_bytes)?,
            last_error: None,
        })
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    /// Allocate one cell with rc 1. Returns nil and records out-of-memory
    /// when the free list cannot supply a slot.
    pub fn alloc(&mut self, tag: Tag) -> Value {
        match self.arena.alloc(tag) {
            Some(slot) => {
                Value::boxed(tag, slot).expect("alloc is only called with boxed tags")
            }
            None => self.fail(ErrorKind::OutOfMemory, "alloc", "out of memory"),
        }
    }

    /// Return a boxed value's cell to the free list. No-op for immediates.
    pub fn free_cell(&mut self, v: Value) {
        if let Some(slot) = v.slot() {
            self.arena.free(slot);
        }
    }

    /// Zero a boxed value's payload.
    pub fn zero(&mut self, v: Value) {
        if let Some(slot) = v.slot() {
            self.arena.zero(slot);
        }
    }

    /// Current reference count of a boxed value's cell.
    pub fn refcount(&self, v: Value) -> Option<u32> {
        v.slot().map(|s| self.arena.header(s).rc)
    }

    /// Wilderness slots still untouched; the REPL banner reports this.
    pub fn free_cells(&self) -> usize {
        self.arena.free_slots()
    }

    // =========================================================================
    // Error slot
    // =========================================================================

    /// Record an error, print it, and hand back nil for propagation.
    pub fn fail(
        &mut self,
        kind: ErrorKind,
        op: &'static str,
        message: impl Into<String>,
    ) -> Value {
        let err = RuntimeError::new(kind, op, message);
        eprintln!("error: {err}");
        debug!(op = err.op, ?kind, "error recorded");
        self.last_error = Some(err);
        Value::Nil
    }

    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }

    pub fn last_error(&self) -> Option<&RuntimeError> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<RuntimeError> {
        self.last_error.take()
    }

    pub fn reset_errors(&mut self) {
        self.last_error = None;
    }

    // =========================================================================
    // Typed cell access
    // =========================================================================

    /// Shared view of a cell payload as `T`.
    ///
    /// # Safety
    /// The payload bytes must currently hold a valid `T`, and `T` must fit
    /// in `CELL_SIZE` with alignment at most `HEADER_SIZE`.
    pub(crate) unsafe fn cell<T>(&self, slot: Slot) -> &T {
        const { assert!(size_of::<T>() <= CELL_SIZE && align_of::<T>() <= HEADER_SIZE) };
        unsafe { &*(self.arena.payload_ptr(slot) as *const T) }
    }

    /// Exclusive view of a cell payload as `T`.
    ///
    /// # Safety
    /// Same requirements as [`Heap::cell`].
    pub(crate) unsafe fn cell_mut<T>(&mut self, slot: Slot) -> &mut T {
        const { assert!(size_of::<T>() <= CELL_SIZE && align_of::<T>() <= HEADER_SIZE) };
        unsafe { &mut *(self.arena.payload_ptr(slot) as *mut T) }
    }

    /// Raw payload pointer, for initialising cells whose payload is not yet
    /// a valid typed value.
    pub(crate) fn payload_ptr(&self, slot: Slot) -> *mut u8 {
        self.arena.payload_ptr(slot)
    }
}
