//! Cellisp object and memory substrate
//!
//! Key design principles:
//! - Value: one tagged word; immediates carry their payload, boxed values
//!   carry a cell index
//! - Cell: every boxed payload occupies exactly one fixed-size arena slot
//!   behind a small rc+tag header
//! - Lifecycle: allocation installs rc 1, containers retain on insertion
//!   and release on removal, and a between-iterations sweep reclaims
//!   whatever only the allocator still holds
//!
//! Everything is threaded through an explicit [`heap::Heap`] handle;
//! nothing in this crate is process-global.

pub mod arena;
pub mod array;
pub mod cfunc;
pub mod error;
pub mod gc;
pub mod hash;
pub mod heap;
pub mod string;
pub mod value;

pub use error::{ErrorKind, RuntimeError};
pub use heap::Heap;
pub use value::{Slot, Tag, Value, is_truthy, values_equal};
