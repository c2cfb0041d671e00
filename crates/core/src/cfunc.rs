//! Host primitive cells
//!
//! A c-function cell stores one host function pointer as a raw word. The
//! interpreter crate owns the concrete signature and is the only caller of
//! [`raw`]; keeping the word untyped here keeps this crate free of any
//! knowledge of the evaluator.

use crate::heap::Heap;
use crate::value::{Tag, Value};

#[repr(C)]
struct CFuncCell {
    raw: usize,
}

/// Allocate a c-function cell holding `raw`, a non-zero host function
/// pointer word.
pub fn new(heap: &mut Heap, raw: usize) -> Value {
    let v = heap.alloc(Tag::CFunc);
    let Some(slot) = v.slot() else { return Value::Nil };
    unsafe {
        (heap.payload_ptr(slot) as *mut CFuncCell).write(CFuncCell { raw });
    }
    v
}

/// The stored function pointer word; `None` for non-cfunc values.
pub fn raw(heap: &Heap, v: Value) -> Option<usize> {
    match v {
        Value::CFunc(slot) => Some(unsafe { heap.cell::<CFuncCell>(slot) }.raw),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_the_word() {
        let mut h = Heap::new(16 << 20).unwrap();
        let v = new(&mut h, 0xDEAD_BEEF);
        assert_eq!(raw(&h, v), Some(0xDEAD_BEEF));
        assert_eq!(raw(&h, Value::Int(1)), None);
    }
}
