//! Reference counting and reclamation
//!
//! A cell is born with rc 1 (the allocator's share). Containers retain on
//! insertion and release on removal; nobody else touches the count. The
//! sweep runs between REPL iterations, when no evaluator temporary is
//! live, and treats rc == 1 as "only the allocator holds it".
//!
//! This is not a general-purpose reference counter: cycles would leak, but
//! the language has no primitive that creates one (list cells are never
//! mutated and the only back-edge, the environment parent, points strictly
//! upward).
//!
//! Teardown cascades: when deleting a container drops an owned child to
//! rc 1, the child is deleted on the spot. One sweep therefore reclaims a
//! whole unreachable tree, and a second sweep with no allocations in
//! between reclaims nothing.

use crate::array;
use crate::error::ErrorKind;
use crate::hash;
use crate::heap::Heap;
use crate::value::{Tag, Value};
use tracing::debug;

impl Heap {
    /// Add one share to a boxed value's cell. No-op for immediates.
    pub fn retain(&mut self, v: Value) -> Value {
        if let Some(slot) = v.slot() {
            let h = self.arena.header(slot);
            debug_assert!(h.rc > 0, "retain of a freed cell");
            self.arena.set_rc(slot, h.rc + 1);
        }
        v
    }

    /// Drop one share. Releasing a cell already at rc 1 is a contract
    /// violation, not an auto-free.
    pub fn release(&mut self, v: Value) -> Value {
        let Some(slot) = v.slot() else { return v };
        let rc = self.arena.header(slot).rc;
        if rc <= 1 {
            return self.fail(
                ErrorKind::RcViolation,
                "release",
                "reference count already at its floor",
            );
        }
        self.arena.set_rc(slot, rc - 1);
        v
    }

    /// Drop an owned child during container teardown. If only the
    /// allocator's share remains afterwards the child is unreachable and
    /// is deleted immediately.
    pub(crate) fn release_owned(&mut self, v: Value) {
        let Some(slot) = v.slot() else { return };
        let rc = self.arena.header(slot).rc;
        if rc <= 1 {
            self.fail(
                ErrorKind::RcViolation,
                "release",
                "reference count already at its floor",
            );
            return;
        }
        self.arena.set_rc(slot, rc - 1);
        if rc - 1 == 1 {
            self.delete(v);
        }
    }

    /// Tear down a cell whose only share is the allocator's: release its
    /// owned children and return the cell to the free list.
    pub fn delete(&mut self, v: Value) -> Value {
        let Some(slot) = v.slot() else { return v };
        let rc = self.arena.header(slot).rc;
        if rc == 0 {
            // already freed; ignore
            return Value::Nil;
        }
        if rc != 1 {
            return self.fail(
                ErrorKind::RcViolation,
                "delete",
                "cannot delete, reference count is not 1",
            );
        }
        match v {
            Value::Array(_) => array::teardown(self, v),
            Value::Hash(_) => hash::teardown(self, v),
            Value::Pair(_) => hash::pair_teardown(self, v),
            _ => self.free_cell(v),
        }
        Value::Bool(true)
    }

    /// Walk every touched slot and delete the ones only the allocator
    /// still holds. Invoked once per REPL iteration, never mid-evaluation.
    pub fn sweep(&mut self) -> usize {
        let range = self.arena.touched_slots();
        let scanned = range.len();
        let mut reclaimed = 0;
        for slot in range {
            let h = self.arena.header(slot);
            if h.rc != 1 {
                continue;
            }
            let Some(tag) = Tag::from_raw(h.tag) else {
                continue;
            };
            let Some(v) = Value::boxed(tag, slot) else {
                continue;
            };
            self.delete(v);
            reclaimed += 1;
        }
        debug!(scanned, reclaimed, "sweep");
        reclaimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string;

    fn heap() -> Heap {
        Heap::new(16 << 20).unwrap()
    }

    #[test]
    fn test_retain_release_accounting() {
        let mut h = heap();
        let s = string::from_str(&mut h, "counted");
        assert_eq!(h.refcount(s), Some(1));
        h.retain(s);
        h.retain(s);
        assert_eq!(h.refcount(s), Some(3));
        h.release(s);
        assert_eq!(h.refcount(s), Some(2));
    }

    #[test]
    fn test_release_at_floor_is_a_violation() {
        let mut h = heap();
        let s = string::from_str(&mut h, "floor");
        let r = h.release(s);
        assert_eq!(r, Value::Nil);
        assert_eq!(h.take_error().unwrap().kind, ErrorKind::RcViolation);
        // the cell is untouched
        assert_eq!(h.refcount(s), Some(1));
    }

    #[test]
    fn test_delete_requires_rc_one() {
        let mut h = heap();
        let s = string::from_str(&mut h, "shared");
        h.retain(s);
        assert_eq!(h.delete(s), Value::Nil);
        assert_eq!(h.take_error().unwrap().kind, ErrorKind::RcViolation);
    }

    #[test]
    fn test_sweep_reclaims_unreferenced_cells() {
        let mut h = heap();
        let kept = string::from_str(&mut h, "kept");
        h.retain(kept);
        let _temp = string::from_str(&mut h, "temp");
        let reclaimed = h.sweep();
        assert_eq!(reclaimed, 1);
        assert_eq!(h.refcount(kept), Some(2));
        // idempotent with no allocations in between
        assert_eq!(h.sweep(), 0);
    }

    #[test]
    fn test_sweep_cascades_through_containers() {
        let mut h = heap();
        let ary = array::new(&mut h);
        let child = string::from_str(&mut h, "child");
        array::push(&mut h, ary, child);
        // ary rc 1, child rc 2 (allocator + array); deleting the array
        // cascades into the child, so one sweep reclaims the whole tree
        assert_eq!(h.sweep(), 1);
        assert_eq!(h.refcount(child), Some(0));
        assert_eq!(h.sweep(), 0);
    }
}
