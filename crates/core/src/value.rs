//! Tagged values
//!
//! A `Value` is one machine-word-sized datum plus a tag. Nil, bool, int and
//! float are immediate: their payload travels inside the value and never
//! touches the arena. Everything else is boxed: the value carries the index
//! of the cell that holds the payload.
//!
//! # Memory layout
//!
//! `#[repr(C, u8)]` pins the discriminant at offset 0 with `Nil = 0`, so a
//! zero-filled cell payload reads back as a run of `Nil` values. Container
//! cells rely on this: `Heap::zero` makes every embedded `Value` valid.
//!
//! Derived equality compares boxed variants by cell index, i.e. identity.
//! Content-aware comparison lives in [`values_equal`].

use crate::array;
use crate::heap::Heap;
use crate::string;

/// Index of a cell inside the arena.
pub type Slot = u32;

/// Cell tags, also stored redundantly in each cell header.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Nil = 0,
    Float = 1,
    Int = 2,
    Str = 3,
    Sym = 4,
    CFunc = 5,
    Hash = 6,
    Pair = 7,
    Array = 8,
}

impl Tag {
    /// Decode a header tag. Returns `None` for values outside the tag range.
    pub fn from_raw(raw: u16) -> Option<Tag> {
        Some(match raw {
            0 => Tag::Nil,
            1 => Tag::Float,
            2 => Tag::Int,
            3 => Tag::Str,
            4 => Tag::Sym,
            5 => Tag::CFunc,
            6 => Tag::Hash,
            7 => Tag::Pair,
            8 => Tag::Array,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Tag::Nil => "nil",
            Tag::Float => "float",
            Tag::Int => "int",
            Tag::Str => "string",
            Tag::Sym => "symbol",
            Tag::CFunc => "cfunc",
            Tag::Hash => "hash",
            Tag::Pair => "hash pair",
            Tag::Array => "array",
        }
    }
}

/// One language datum.
///
/// The language-level `false` is [`Value::Nil`]; predicates answer with
/// `Bool(true)` or `Nil` (see [`Value::truth`]), so `Bool(false)` is
/// representable but never produced by evaluation.
#[repr(C, u8)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Byte string cell
    Str(Slot),
    /// Interned identifier; cell layout identical to `Str`
    Sym(Slot),
    /// Host primitive function cell
    CFunc(Slot),
    Array(Slot),
    Hash(Slot),
    /// One bucket-chain node of a hash; owned by its hash
    Pair(Slot),
}

impl Value {
    /// Map a truth to the language's encoding: `true` is the distinct true
    /// word, `false` is nil.
    #[inline]
    pub fn truth(b: bool) -> Value {
        if b { Value::Bool(true) } else { Value::Nil }
    }

    pub fn tag(self) -> Tag {
        match self {
            Value::Nil | Value::Bool(_) => Tag::Nil,
            Value::Int(_) => Tag::Int,
            Value::Float(_) => Tag::Float,
            Value::Str(_) => Tag::Str,
            Value::Sym(_) => Tag::Sym,
            Value::CFunc(_) => Tag::CFunc,
            Value::Array(_) => Tag::Array,
            Value::Hash(_) => Tag::Hash,
            Value::Pair(_) => Tag::Pair,
        }
    }

    /// The cell index of a boxed value, `None` for immediates.
    #[inline]
    pub fn slot(self) -> Option<Slot> {
        match self {
            Value::Str(s)
            | Value::Sym(s)
            | Value::CFunc(s)
            | Value::Array(s)
            | Value::Hash(s)
            | Value::Pair(s) => Some(s),
            _ => None,
        }
    }

    /// Rebuild a boxed value from a header tag and a slot index.
    pub fn boxed(tag: Tag, slot: Slot) -> Option<Value> {
        Some(match tag {
            Tag::Str => Value::Str(slot),
            Tag::Sym => Value::Sym(slot),
            Tag::CFunc => Value::CFunc(slot),
            Tag::Array => Value::Array(slot),
            Tag::Hash => Value::Hash(slot),
            Tag::Pair => Value::Pair(slot),
            Tag::Nil | Tag::Float | Tag::Int => return None,
        })
    }

    #[inline]
    pub fn is_boxed(self) -> bool {
        self.slot().is_some()
    }

    #[inline]
    pub fn is_number(self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Strings and symbols share one cell layout and compare as one type.
    #[inline]
    pub fn is_stringish(self) -> bool {
        matches!(self, Value::Str(_) | Value::Sym(_))
    }
}

/// Collapse the empty array to nil; every other value passes through.
/// Truthiness and non-string equality are defined over this projection.
fn demote_empty(heap: &Heap, v: Value) -> Value {
    match v {
        Value::Array(_) if array::len(heap, v) == 0 => Value::Nil,
        other => other,
    }
}

/// Nil and the empty array are false; everything else, including `0` and
/// the empty string, is true.
pub fn is_truthy(heap: &Heap, v: Value) -> bool {
    !matches!(demote_empty(heap, v), Value::Nil | Value::Bool(false))
}

/// Value equality: strings and symbols compare byte-wise, everything else
/// compares as words after the empty array has been collapsed to nil.
/// Boxed non-string values therefore compare by cell identity.
pub fn values_equal(heap: &Heap, a: Value, b: Value) -> bool {
    if a.is_stringish() && b.is_stringish() {
        return string::bytes(heap, a) == string::bytes(heap, b);
    }
    demote_empty(heap, a) == demote_empty(heap, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_value_layout() {
        // Values are embedded directly in array/hash/pair cells, so the
        // size and alignment are load-bearing, not cosmetic.
        assert_eq!(size_of::<Value>(), 16, "Value must stay one tagged word");
        assert_eq!(align_of::<Value>(), 8);
    }

    #[test]
    fn test_zeroed_bytes_read_as_nil() {
        // Heap::zero fills container payloads with zero bytes; those bytes
        // must decode as Nil for the embedded entries to be valid.
        let zeroed = [0u8; 16];
        let v = unsafe { std::ptr::read_unaligned(zeroed.as_ptr() as *const Value) };
        assert_eq!(v, Value::Nil);
    }

    #[test]
    fn test_boxed_identity_equality() {
        assert_eq!(Value::Array(7), Value::Array(7));
        assert_ne!(Value::Array(7), Value::Array(8));
        assert_ne!(Value::Str(7), Value::Sym(7));
    }

    #[test]
    fn test_truth_encoding() {
        assert_eq!(Value::truth(true), Value::Bool(true));
        assert_eq!(Value::truth(false), Value::Nil);
    }

    #[test]
    fn test_tag_round_trip() {
        for raw in 0u16..=8 {
            let tag = Tag::from_raw(raw).unwrap();
            assert_eq!(tag as u16, raw);
        }
        assert_eq!(Tag::from_raw(9), None);
    }
}
