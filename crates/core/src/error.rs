//! Cooperative error reporting
//!
//! One error slot lives in the [`Heap`](crate::heap::Heap) (the state is
//! threaded explicitly, never process-global). A failing operation records
//! the error, prints one `error:` line to stderr, and returns nil; callers
//! either test the slot or just propagate the nil. The reader clears the
//! slot at the start of each top-level read.

use std::fmt;

/// Classification of runtime failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Allocator exhausted
    OutOfMemory,
    /// Operation applied to a value whose tag is not in the accepted set
    TypeMismatch,
    /// Malformed input: unexpected `)`, EOF inside a list
    ReaderError,
    /// Application of an unbound symbol
    UnknownProc,
    /// Lambda called with the wrong argument count
    ArityMismatch,
    /// Array or string grown past its cell capacity
    CapacityExceeded,
    /// Release on a cell with rc <= 1, or delete on rc != 1
    RcViolation,
    /// Integer division by zero
    DivideByZero,
}

/// The recorded failure: kind, originating operation, message, and an
/// errno snapshot taken when the slot was set.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    /// Name of the operation that raised the error
    pub op: &'static str,
    pub message: String,
    pub errno: i32,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, op: &'static str, message: impl Into<String>) -> RuntimeError {
        RuntimeError {
            kind,
            op,
            message: message.into(),
            errno: std::io::Error::last_os_error().raw_os_error().unwrap_or(0),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.op, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_operation() {
        let e = RuntimeError::new(ErrorKind::ReaderError, "read", "unexpected )");
        assert_eq!(e.to_string(), "read: unexpected )");
        assert_eq!(e.kind, ErrorKind::ReaderError);
    }
}
