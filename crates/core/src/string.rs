//! String cells
//!
//! Layout: a u16 length prefix followed by the payload bytes. The payload
//! is not NUL-terminated logically, but a trailing zero byte is kept up to
//! date for cheap host interop. A symbol is the same cell with a different
//! tag; [`into_symbol`] retags in place.

use crate::arena::CELL_SIZE;
use crate::error::ErrorKind;
use crate::heap::Heap;
use crate::value::{Slot, Tag, Value};

/// Payload capacity, trailing zero included.
pub const STR_MAX_LEN: usize = CELL_SIZE - 2;

#[repr(C)]
struct StringCell {
    len: u16,
    bytes: [u8; STR_MAX_LEN],
}

fn slot_of(heap: &mut Heap, v: Value, op: &'static str) -> Option<Slot> {
    match v {
        Value::Str(s) | Value::Sym(s) => Some(s),
        other => {
            heap.fail(
                ErrorKind::TypeMismatch,
                op,
                format!("expected string, have '{}'", other.tag().name()),
            );
            None
        }
    }
}

/// Allocate a string cell holding `content`.
pub fn new(heap: &mut Heap, content: &[u8]) -> Value {
    if content.len() + 1 > STR_MAX_LEN {
        return heap.fail(ErrorKind::CapacityExceeded, "string_new", "string too large");
    }
    let v = heap.alloc(Tag::Str);
    let Some(slot) = v.slot() else { return Value::Nil };
    unsafe {
        let cell = heap.cell_mut::<StringCell>(slot);
        cell.len = content.len() as u16;
        cell.bytes[..content.len()].copy_from_slice(content);
        cell.bytes[content.len()] = 0;
    }
    v
}

pub fn from_str(heap: &mut Heap, s: &str) -> Value {
    new(heap, s.as_bytes())
}

/// Decimal rendering of an int or float as a fresh string cell. Floats
/// always keep a decimal point so the printed form re-reads as a float.
pub fn from_number(heap: &mut Heap, v: Value) -> Value {
    match v {
        Value::Int(i) => {
            let s = format!("{i}");
            new(heap, s.as_bytes())
        }
        Value::Float(f) => {
            let s = format!("{f:?}");
            new(heap, s.as_bytes())
        }
        other => heap.fail(
            ErrorKind::TypeMismatch,
            "string_from_number",
            format!("expected number, have '{}'", other.tag().name()),
        ),
    }
}

/// Payload bytes of a string or symbol; empty for anything else.
pub fn bytes<'a>(heap: &'a Heap, v: Value) -> &'a [u8] {
    match v {
        Value::Str(slot) | Value::Sym(slot) => {
            let cell = unsafe { heap.cell::<StringCell>(slot) };
            &cell.bytes[..cell.len as usize]
        }
        _ => &[],
    }
}

/// Lossy host copy of the payload.
pub fn to_owned(heap: &Heap, v: Value) -> String {
    String::from_utf8_lossy(bytes(heap, v)).into_owned()
}

/// Append `src`'s bytes to `dst` in place and return `dst`.
pub fn append(heap: &mut Heap, dst: Value, src: Value) -> Value {
    let Some(dst_slot) = slot_of(heap, dst, "string_append") else {
        return Value::Nil;
    };
    if slot_of(heap, src, "string_append").is_none() {
        return Value::Nil;
    }
    // owned copy so that self-append cannot alias
    let tail = bytes(heap, src).to_vec();
    let head_len = bytes(heap, dst).len();
    if head_len + tail.len() + 1 > STR_MAX_LEN {
        return heap.fail(ErrorKind::CapacityExceeded, "string_append", "string too large");
    }
    unsafe {
        let cell = heap.cell_mut::<StringCell>(dst_slot);
        cell.bytes[head_len..head_len + tail.len()].copy_from_slice(&tail);
        cell.len = (head_len + tail.len()) as u16;
        cell.bytes[head_len + tail.len()] = 0;
    }
    dst
}

/// Literal (non-regex) substitution producing a new string.
pub fn replace(heap: &mut Heap, s: Value, find: Value, subst: Value) -> Value {
    if slot_of(heap, s, "string_replace").is_none()
        || slot_of(heap, find, "string_replace").is_none()
        || slot_of(heap, subst, "string_replace").is_none()
    {
        return Value::Nil;
    }
    let src = bytes(heap, s).to_vec();
    let pat = bytes(heap, find).to_vec();
    let sub = bytes(heap, subst).to_vec();
    if pat.is_empty() {
        return new(heap, &src);
    }
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i..].starts_with(&pat) {
            out.extend_from_slice(&sub);
            i += pat.len();
        } else {
            out.push(src[i]);
            i += 1;
        }
    }
    new(heap, &out)
}

/// Split on ASCII space into an array of fresh strings. An empty string
/// yields nil, matching the tokenizer's contract for blank input.
pub fn split(heap: &mut Heap, s: Value) -> Value {
    if slot_of(heap, s, "string_split").is_none() {
        return Value::Nil;
    }
    let src = bytes(heap, s).to_vec();
    if src.is_empty() {
        return Value::Nil;
    }
    let ary = crate::array::new(heap);
    if ary == Value::Nil {
        return Value::Nil;
    }
    for word in src.split(|b| *b == b' ') {
        if word.is_empty() {
            continue;
        }
        let piece = new(heap, word);
        if piece == Value::Nil || !crate::array::push(heap, ary, piece) {
            return Value::Nil;
        }
    }
    ary
}

/// Rolling content hash: `v = byte + 31 * v`.
pub fn content_hash(heap: &Heap, v: Value) -> u64 {
    let mut h: u64 = 0;
    for b in bytes(heap, v) {
        h = (*b as u64).wrapping_add(h.wrapping_mul(31));
    }
    h
}

/// Keyword comparison against a host literal; false for non-strings.
pub fn equals_lit(heap: &Heap, v: Value, lit: &str) -> bool {
    v.is_stringish() && bytes(heap, v) == lit.as_bytes()
}

/// Retag a string cell as a symbol, in the value and in the cell header.
pub fn into_symbol(heap: &mut Heap, v: Value) -> Value {
    match v {
        Value::Str(slot) => {
            heap.arena.set_tag(slot, Tag::Sym);
            Value::Sym(slot)
        }
        Value::Sym(_) => v,
        other => heap.fail(
            ErrorKind::TypeMismatch,
            "intern",
            format!("expected string, have '{}'", other.tag().name()),
        ),
    }
}

/// View a symbol under its string tag (the cell is shared, layout is
/// identical). Pure value rewrite; the header is untouched.
pub fn as_string_key(v: Value) -> Value {
    match v {
        Value::Sym(slot) => Value::Str(slot),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::values_equal;

    fn heap() -> Heap {
        Heap::new(16 << 20).unwrap()
    }

    #[test]
    fn test_new_records_length() {
        let mut h = heap();
        let s = from_str(&mut h, "hello");
        assert_eq!(bytes(&h, s), b"hello");
        assert_eq!(to_owned(&h, s), "hello");
    }

    #[test]
    fn test_append_in_place() {
        let mut h = heap();
        let a = from_str(&mut h, "foo");
        let b = from_str(&mut h, "bar");
        let r = append(&mut h, a, b);
        assert_eq!(r, a);
        assert_eq!(bytes(&h, a), b"foobar");
    }

    #[test]
    fn test_append_past_capacity_fails() {
        let mut h = heap();
        let big = "x".repeat(STR_MAX_LEN - 1);
        let a = new(&mut h, big.as_bytes());
        let b = from_str(&mut h, "y");
        assert_eq!(append(&mut h, a, b), Value::Nil);
        assert_eq!(h.take_error().unwrap().kind, ErrorKind::CapacityExceeded);
        // dst is unchanged
        assert_eq!(bytes(&h, a).len(), STR_MAX_LEN - 1);
    }

    #[test]
    fn test_oversized_new_fails() {
        let mut h = heap();
        let big = vec![b'x'; STR_MAX_LEN];
        assert_eq!(new(&mut h, &big), Value::Nil);
        assert_eq!(h.take_error().unwrap().kind, ErrorKind::CapacityExceeded);
    }

    #[test]
    fn test_replace_literal() {
        let mut h = heap();
        let s = from_str(&mut h, "(a (b))");
        let find = from_str(&mut h, "(");
        let subst = from_str(&mut h, " ( ");
        let r = replace(&mut h, s, find, subst);
        assert_eq!(bytes(&h, r), b" ( a  ( b))");
        // source is untouched
        assert_eq!(bytes(&h, s), b"(a (b))");
    }

    #[test]
    fn test_split_on_spaces() {
        let mut h = heap();
        let s = from_str(&mut h, "  one two   three ");
        let ary = split(&mut h, s);
        assert_eq!(crate::array::len(&h, ary), 3);
        let first = crate::array::index(&h, ary, 0);
        assert_eq!(bytes(&h, first), b"one");
        let last = crate::array::index(&h, ary, 2);
        assert_eq!(bytes(&h, last), b"three");
    }

    #[test]
    fn test_split_empty_is_nil() {
        let mut h = heap();
        let s = from_str(&mut h, "");
        assert_eq!(split(&mut h, s), Value::Nil);
    }

    #[test]
    fn test_content_hash_depends_only_on_bytes() {
        let mut h = heap();
        let a = from_str(&mut h, "symbolic");
        let b = from_str(&mut h, "symbolic");
        let c = from_str(&mut h, "symbolics");
        assert_eq!(content_hash(&h, a), content_hash(&h, b));
        assert_ne!(content_hash(&h, a), content_hash(&h, c));
    }

    #[test]
    fn test_equality_by_content_across_tags() {
        let mut h = heap();
        let s = from_str(&mut h, "name");
        let t = from_str(&mut h, "name");
        let sym = into_symbol(&mut h, t);
        assert!(values_equal(&h, s, sym));
        assert!(equals_lit(&h, sym, "name"));
        assert!(!equals_lit(&h, Value::Int(3), "name"));
    }
}
