//! Cellisp runtime: reader, evaluator and primitive registry
//!
//! Key design principles:
//! - One [`Interp`] handle owns the heap, the intern table and the global
//!   environment; nothing is process-global
//! - The reader and the printer run on the heap's own string and array
//!   cells, so parsing exercises the same allocator as evaluation
//! - Between top-level forms the caller runs [`Interp::collect`] to sweep
//!   unreachable cells

pub mod builtins;
pub mod env;
pub mod eval;
pub mod interp;
pub mod printer;
pub mod reader;

pub use cellisp_core::{ErrorKind, Heap, RuntimeError, Tag, Value};
pub use interp::{Interp, PrimFn};
