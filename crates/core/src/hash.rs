//! Hash cells
//!
//! Chained-bucket map from value to value. The bucket heads live inside
//! the hash cell; each entry is a separate pair cell `{key, value, next}`
//! owned by the hash. Collisions chain LIFO, so `get` answers with the
//! most recent insertion.
//!
//! A hash also carries a parent reference, nil at the root; the
//! environment chain is built out of exactly this field.

use crate::arena::CELL_SIZE;
use crate::error::ErrorKind;
use crate::heap::Heap;
use crate::string;
use crate::value::{Slot, Tag, Value, values_equal};

/// Bucket heads per hash cell.
pub const HASH_BUCKETS: usize = (CELL_SIZE - 24) / size_of::<Value>();

#[repr(C)]
struct HashCell {
    size: u32,
    _pad: u32,
    parent: Value,
    buckets: [Value; HASH_BUCKETS],
}

#[repr(C)]
struct PairCell {
    key: Value,
    value: Value,
    next: Value,
}

fn slot_of(heap: &mut Heap, v: Value, op: &'static str) -> Option<Slot> {
    match v {
        Value::Hash(s) => Some(s),
        other => {
            heap.fail(
                ErrorKind::TypeMismatch,
                op,
                format!("expected hash, have '{}'", other.tag().name()),
            );
            None
        }
    }
}

/// Strings and symbols hash by content; everything else hashes by its
/// raw tagged word.
fn key_hash(heap: &Heap, key: Value) -> u64 {
    if key.is_stringish() {
        return string::content_hash(heap, key);
    }
    let payload: u64 = match key {
        Value::Nil => 0,
        Value::Bool(b) => b as u64,
        Value::Int(i) => i as u64,
        Value::Float(f) => f.to_bits(),
        boxed => boxed.slot().unwrap_or(0) as u64,
    };
    (payload << 16) | key.tag() as u64
}

fn bucket_index(heap: &Heap, key: Value) -> usize {
    (key_hash(heap, key) % HASH_BUCKETS as u64) as usize
}

fn pair(heap: &Heap, slot: Slot) -> (Value, Value, Value) {
    let p = unsafe { heap.cell::<PairCell>(slot) };
    (p.key, p.value, p.next)
}

pub fn new(heap: &mut Heap) -> Value {
    let v = heap.alloc(Tag::Hash);
    heap.zero(v);
    v
}

pub fn size(heap: &Heap, h: Value) -> usize {
    match h {
        Value::Hash(slot) => unsafe { heap.cell::<HashCell>(slot) }.size as usize,
        _ => 0,
    }
}

pub fn parent(heap: &Heap, h: Value) -> Value {
    match h {
        Value::Hash(slot) => unsafe { heap.cell::<HashCell>(slot) }.parent,
        _ => Value::Nil,
    }
}

/// Install the parent link. The caller owns the retain.
pub fn set_parent(heap: &mut Heap, h: Value, parent: Value) {
    if let Value::Hash(slot) = h {
        unsafe { heap.cell_mut::<HashCell>(slot) }.parent = parent;
    }
}

/// Linear scan of the key's bucket; nil when absent.
pub fn get(heap: &Heap, h: Value, key: Value) -> Value {
    let Value::Hash(slot) = h else {
        return Value::Nil;
    };
    let k = bucket_index(heap, key);
    let mut cur = unsafe { heap.cell::<HashCell>(slot) }.buckets[k];
    while let Value::Pair(ps) = cur {
        let (pk, pv, next) = pair(heap, ps);
        if values_equal(heap, key, pk) {
            return pv;
        }
        cur = next;
    }
    Value::Nil
}

/// Insert or overwrite. A fresh entry retains both key and value and is
/// prepended to its bucket; an overwrite releases the value it replaces.
/// Returns `value`, or nil when the pair cell cannot be allocated.
pub fn set(heap: &mut Heap, h: Value, key: Value, value: Value) -> Value {
    let Some(slot) = slot_of(heap, h, "hash_set") else {
        return Value::Nil;
    };
    let k = bucket_index(heap, key);
    let head = unsafe { heap.cell::<HashCell>(slot) }.buckets[k];

    let mut cur = head;
    while let Value::Pair(ps) = cur {
        let (pk, old, next) = pair(heap, ps);
        if values_equal(heap, key, pk) {
            heap.release(old);
            heap.retain(value);
            unsafe { heap.cell_mut::<PairCell>(ps) }.value = value;
            return value;
        }
        cur = next;
    }

    let entry = heap.alloc(Tag::Pair);
    let Some(pair_slot) = entry.slot() else {
        return Value::Nil;
    };
    heap.retain(entry);
    heap.retain(key);
    heap.retain(value);
    unsafe {
        (heap.payload_ptr(pair_slot) as *mut PairCell).write(PairCell {
            key,
            value,
            next: head,
        });
    }
    let cell = unsafe { heap.cell_mut::<HashCell>(slot) };
    cell.buckets[k] = entry;
    cell.size += 1;
    value
}

/// Unlink the key's pair, release its key and value, and free the pair.
/// Answering true either way mirrors the cooperative contract: deleting
/// an absent key is not an error.
pub fn remove(heap: &mut Heap, h: Value, key: Value) -> Value {
    let Some(slot) = slot_of(heap, h, "hash_delete") else {
        return Value::Nil;
    };
    let k = bucket_index(heap, key);
    let mut prev: Option<Slot> = None;
    let mut cur = unsafe { heap.cell::<HashCell>(slot) }.buckets[k];
    while let Value::Pair(ps) = cur {
        let (pk, pv, next) = pair(heap, ps);
        if values_equal(heap, key, pk) {
            match prev {
                Some(pp) => unsafe { heap.cell_mut::<PairCell>(pp) }.next = next,
                None => unsafe { heap.cell_mut::<HashCell>(slot) }.buckets[k] = next,
            }
            heap.release(pk);
            heap.release(pv);
            heap.free_cell(cur);
            unsafe { heap.cell_mut::<HashCell>(slot) }.size -= 1;
            return Value::Bool(true);
        }
        prev = Some(ps);
        cur = next;
    }
    Value::Bool(true)
}

/// Release every key and value (cascading), free every pair, release the
/// parent link, then free the hash cell itself. Called by `Heap::delete`.
pub(crate) fn teardown(heap: &mut Heap, h: Value) {
    let Some(slot) = h.slot() else { return };
    for k in 0..HASH_BUCKETS {
        let mut cur = unsafe { heap.cell::<HashCell>(slot) }.buckets[k];
        while let Value::Pair(ps) = cur {
            let (pk, pv, next) = pair(heap, ps);
            heap.release_owned(pk);
            heap.release_owned(pv);
            heap.free_cell(cur);
            cur = next;
        }
    }
    let parent = unsafe { heap.cell::<HashCell>(slot) }.parent;
    if parent.is_boxed() {
        heap.release_owned(parent);
    }
    heap.free_cell(h);
}

/// An orphaned pair reached by the sweep: release what it owns, free it.
pub(crate) fn pair_teardown(heap: &mut Heap, p: Value) {
    let Some(slot) = p.slot() else { return };
    let (pk, pv, _) = pair(heap, slot);
    heap.release_owned(pk);
    heap.release_owned(pv);
    heap.free_cell(p);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::from_str;

    fn heap() -> Heap {
        Heap::new(32 << 20).unwrap()
    }

    #[test]
    fn test_set_then_get() {
        let mut h = heap();
        let table = new(&mut h);
        let k = from_str(&mut h, "answer");
        set(&mut h, table, k, Value::Int(42));
        assert_eq!(get(&h, table, k), Value::Int(42));
        assert_eq!(size(&h, table), 1);
    }

    #[test]
    fn test_get_by_content_not_identity() {
        let mut h = heap();
        let table = new(&mut h);
        let k1 = from_str(&mut h, "key");
        let k2 = from_str(&mut h, "key");
        set(&mut h, table, k1, Value::Int(1));
        assert_eq!(get(&h, table, k2), Value::Int(1));
    }

    #[test]
    fn test_absent_key_is_nil() {
        let mut h = heap();
        let table = new(&mut h);
        let k = from_str(&mut h, "missing");
        assert_eq!(get(&h, table, k), Value::Nil);
    }

    #[test]
    fn test_overwrite_releases_old_value() {
        let mut h = heap();
        let table = new(&mut h);
        let k = from_str(&mut h, "slot");
        let old = from_str(&mut h, "old");
        let newer = from_str(&mut h, "new");
        set(&mut h, table, k, old);
        assert_eq!(h.refcount(old), Some(2));
        set(&mut h, table, k, newer);
        assert_eq!(h.refcount(old), Some(1));
        assert_eq!(h.refcount(newer), Some(2));
        assert_eq!(get(&h, table, k), newer);
        assert_eq!(size(&h, table), 1);
    }

    #[test]
    fn test_word_keys() {
        let mut h = heap();
        let table = new(&mut h);
        set(&mut h, table, Value::Int(7), Value::Int(70));
        set(&mut h, table, Value::Float(7.0), Value::Int(71));
        assert_eq!(get(&h, table, Value::Int(7)), Value::Int(70));
        assert_eq!(get(&h, table, Value::Float(7.0)), Value::Int(71));
    }

    #[test]
    fn test_colliding_keys_stay_reachable() {
        // "aaa" and "Bq" land in the same bucket: their content hashes are
        // 96321 and 2159, congruent modulo the bucket count.
        let mut h = heap();
        let a = from_str(&mut h, "aaa");
        let b = from_str(&mut h, "Bq");
        assert_eq!(
            string::content_hash(&h, a) % HASH_BUCKETS as u64,
            string::content_hash(&h, b) % HASH_BUCKETS as u64
        );
        let table = new(&mut h);
        set(&mut h, table, a, Value::Int(1));
        set(&mut h, table, b, Value::Int(2));
        assert_eq!(get(&h, table, a), Value::Int(1));
        assert_eq!(get(&h, table, b), Value::Int(2));
        assert_eq!(size(&h, table), 2);
    }

    #[test]
    fn test_remove_unlinks_and_releases() {
        let mut h = heap();
        let table = new(&mut h);
        let a = from_str(&mut h, "aaa");
        let b = from_str(&mut h, "Bq");
        let v = from_str(&mut h, "payload");
        set(&mut h, table, a, v);
        set(&mut h, table, b, Value::Int(2));
        remove(&mut h, table, a);
        assert_eq!(get(&h, table, a), Value::Nil);
        // the collision chain survives the unlink
        assert_eq!(get(&h, table, b), Value::Int(2));
        assert_eq!(size(&h, table), 1);
        assert_eq!(h.refcount(v), Some(1));
    }

    #[test]
    fn test_many_keys() {
        let mut h = heap();
        let table = new(&mut h);
        for i in 0..100 {
            let k = from_str(&mut h, &format!("key-{i}"));
            set(&mut h, table, k, Value::Int(i));
        }
        assert_eq!(size(&h, table), 100);
        for i in 0..100 {
            let k = from_str(&mut h, &format!("key-{i}"));
            assert_eq!(get(&h, table, k), Value::Int(i));
        }
    }

    #[test]
    fn test_hash_size_matches_reachable_pairs() {
        let mut h = heap();
        let table = new(&mut h);
        let k = from_str(&mut h, "once");
        set(&mut h, table, k, Value::Int(1));
        set(&mut h, table, k, Value::Int(2));
        assert_eq!(size(&h, table), 1);
    }
}
