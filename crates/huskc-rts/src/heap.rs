//! The closure/entry heap and its mark-and-sweep collector.
//!
//! The heap owns two slot lists (all live closures, all live entries) and
//! a one-byte GC word per object with three flag bits:
//!
//! - `USED`: the evaluator is currently manipulating the object on its
//!   call stack; acts as a conservative root.
//! - `PINNED`: an externally declared root, e.g. a top-level binding.
//! - `SEEN`: transient mark, cleared on survivors after every sweep.
//!
//! Collection marks from every object carrying `USED | PINNED` in either
//! list (plus the scratch-root stack the evaluator uses to keep detached
//! environments alive mid-reduction) and sweeps everything unmarked.
//! Freed slots are stamped with a poison byte and recycled through free
//! lists, so a stale handle trips the liveness assertions instead of
//! silently aliasing a new object.
//!
//! Allocation policy: a new closure or entry first collects if the live
//! population has more than doubled since the previous collection, and the
//! new object is born `USED` so a nested allocation's collection can never
//! sweep it.

use tracing::{debug, trace};

use crate::closure::{Closure, ClosureId, Entry, EntryId};

/// Transient mark set during the walk.
const SEEN: u8 = 0x01;
/// The evaluator holds this object on its call stack.
const USED: u8 = 0x02;
/// Externally declared root.
const PINNED: u8 = 0x04;
/// Roots are anything used or pinned.
const REFERRED: u8 = USED | PINNED;
/// Any of these bits set means the slot was freed.
const DEAD: u8 = 0xf8;
/// Poison byte stamped on freed slots.
const DEAD_BYTE: u8 = 0xff;

struct Slot<T> {
    gc: u8,
    value: T,
}

/// The runtime heap: all closures and entries, plus collector state.
pub struct Heap {
    closures: Vec<Slot<Closure>>,
    entries: Vec<Slot<Entry>>,
    free_closures: Vec<u32>,
    free_entries: Vec<u32>,
    live_closures: usize,
    live_entries: usize,
    /// Live population right after the previous collection.
    last_collection: usize,
    /// Evaluator-owned roots: closure handles in detached environments
    /// that no live object references yet.
    scratch: Vec<ClosureId>,
}

impl Heap {
    pub fn new() -> Heap {
        Heap {
            closures: Vec::new(),
            entries: Vec::new(),
            free_closures: Vec::new(),
            free_entries: Vec::new(),
            live_closures: 0,
            live_entries: 0,
            last_collection: 0,
            scratch: Vec::new(),
        }
    }

    // =========================================================================
    // Allocation
    // =========================================================================

    fn maybe_collect(&mut self) {
        if self.live_closures + self.live_entries > 2 * self.last_collection {
            self.collect();
        }
    }

    /// Allocate a closure; it is born `USED`.
    pub fn new_closure(&mut self, value: Closure) -> ClosureId {
        self.maybe_collect();
        self.live_closures += 1;
        match self.free_closures.pop() {
            Some(idx) => {
                self.closures[idx as usize] = Slot { gc: USED, value };
                ClosureId(idx)
            }
            None => {
                let idx = self.closures.len() as u32;
                self.closures.push(Slot { gc: USED, value });
                ClosureId(idx)
            }
        }
    }

    /// Allocate an entry; it is born `USED`.
    pub fn new_entry(&mut self, value: Entry) -> EntryId {
        self.maybe_collect();
        self.live_entries += 1;
        match self.free_entries.pop() {
            Some(idx) => {
                self.entries[idx as usize] = Slot { gc: USED, value };
                EntryId(idx)
            }
            None => {
                let idx = self.entries.len() as u32;
                self.entries.push(Slot { gc: USED, value });
                EntryId(idx)
            }
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    pub fn closure(&self, id: ClosureId) -> &Closure {
        let slot = &self.closures[id.index()];
        assert!(slot.gc & DEAD == 0, "access to freed closure {:?}", id);
        &slot.value
    }

    pub fn closure_mut(&mut self, id: ClosureId) -> &mut Closure {
        let slot = &mut self.closures[id.index()];
        assert!(slot.gc & DEAD == 0, "access to freed closure {:?}", id);
        &mut slot.value
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        let slot = &self.entries[id.index()];
        assert!(slot.gc & DEAD == 0, "access to freed entry {:?}", id);
        &slot.value
    }

    /// Drop a closure's payload without touching its heap identity.
    pub fn erase(&mut self, id: ClosureId) {
        *self.closure_mut(id) = Closure::Null;
    }

    /// Replace `id`'s payload outright (erase + write).
    pub fn set_closure(&mut self, id: ClosureId, value: Closure) {
        *self.closure_mut(id) = value;
    }

    /// Overwrite `dest`'s payload with a deep copy of `src`'s: primitive
    /// bytes are duplicated; field and environment arrays are duplicated
    /// but their element handles are shared.
    pub fn copy_into(&mut self, dest: ClosureId, src: ClosureId) {
        if dest == src {
            return;
        }
        let copy = self.closure(src).clone();
        self.set_closure(dest, copy);
    }

    // =========================================================================
    // Root management
    // =========================================================================

    pub fn pin(&mut self, id: ClosureId) {
        self.closures[id.index()].gc |= PINNED;
    }

    pub fn unpin(&mut self, id: ClosureId) {
        self.closures[id.index()].gc &= !PINNED;
    }

    pub fn use_closure(&mut self, id: ClosureId) {
        self.closures[id.index()].gc |= USED;
    }

    pub fn unuse_closure(&mut self, id: ClosureId) {
        self.closures[id.index()].gc &= !USED;
    }

    pub fn use_entry(&mut self, id: EntryId) {
        self.entries[id.index()].gc |= USED;
    }

    pub fn unuse_entry(&mut self, id: EntryId) {
        self.entries[id.index()].gc &= !USED;
    }

    /// Whether a closure handle still points at a live object.
    pub fn is_live_closure(&self, id: ClosureId) -> bool {
        self.closures[id.index()].gc & DEAD == 0
    }

    /// Whether an entry handle still points at a live object.
    pub fn is_live_entry(&self, id: EntryId) -> bool {
        self.entries[id.index()].gc & DEAD == 0
    }

    /// Push detached-environment handles onto the scratch-root stack,
    /// returning a watermark for [`Heap::unprotect`].
    pub fn protect(&mut self, ids: &[ClosureId]) -> usize {
        let mark = self.scratch.len();
        self.scratch.extend_from_slice(ids);
        mark
    }

    /// Pop scratch roots down to a watermark from [`Heap::protect`].
    pub fn unprotect(&mut self, mark: usize) {
        debug_assert!(mark <= self.scratch.len());
        self.scratch.truncate(mark);
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    pub fn live_closure_count(&self) -> usize {
        self.live_closures
    }

    pub fn live_entry_count(&self) -> usize {
        self.live_entries
    }

    /// Live population recorded by the previous collection.
    pub fn last_collection_size(&self) -> usize {
        self.last_collection
    }

    /// Whether the `SEEN` bit is clear on every live object; sweep must
    /// leave the heap in this state.
    pub fn seen_bits_clear(&self) -> bool {
        self.closures
            .iter()
            .all(|slot| slot.gc & DEAD != 0 || slot.gc & SEEN == 0)
            && self
                .entries
                .iter()
                .all(|slot| slot.gc & DEAD != 0 || slot.gc & SEEN == 0)
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Stop-the-world mark and sweep.
    pub fn collect(&mut self) {
        let before = self.live_closures + self.live_entries;
        self.mark();
        let (swept_closures, swept_entries) = self.sweep();
        self.last_collection = self.live_closures + self.live_entries;
        debug!(
            before,
            after = self.last_collection,
            swept_closures,
            swept_entries,
            "gc cycle complete"
        );
    }

    fn mark(&mut self) {
        let mut work: Vec<Work> = Vec::new();
        for (idx, slot) in self.closures.iter().enumerate() {
            if slot.gc & DEAD == 0 && slot.gc & REFERRED != 0 {
                work.push(Work::Closure(idx as u32));
            }
        }
        for (idx, slot) in self.entries.iter().enumerate() {
            if slot.gc & DEAD == 0 && slot.gc & REFERRED != 0 {
                work.push(Work::Entry(idx as u32));
            }
        }
        for &id in &self.scratch {
            work.push(Work::Closure(id.0));
        }
        trace!(roots = work.len(), "gc mark start");

        while let Some(item) = work.pop() {
            match item {
                Work::Closure(idx) => {
                    let slot = &mut self.closures[idx as usize];
                    debug_assert!(slot.gc & DEAD == 0, "marking a freed closure");
                    if slot.gc & SEEN != 0 {
                        continue;
                    }
                    slot.gc |= SEEN;
                    match &slot.value {
                        Closure::Null | Closure::Prim { .. } => {}
                        Closure::Constr { fields, .. } => {
                            work.extend(fields.iter().map(|f| Work::Closure(f.0)));
                        }
                        Closure::Thunk { env, entry, .. } => {
                            work.extend(env.iter().map(|e| Work::Closure(e.0)));
                            work.push(Work::Entry(entry.0));
                        }
                    }
                }
                Work::Entry(idx) => {
                    let slot = &mut self.entries[idx as usize];
                    debug_assert!(slot.gc & DEAD == 0, "marking a freed entry");
                    if slot.gc & SEEN != 0 {
                        continue;
                    }
                    slot.gc |= SEEN;
                    match &slot.value {
                        Entry::Prim(_) | Entry::Select(_) => {}
                        Entry::Ref(clos) => work.push(Work::Closure(clos.0)),
                        Entry::Apply { fun, arg } => {
                            work.push(Work::Entry(fun.entry.0));
                            work.push(Work::Entry(arg.entry.0));
                        }
                        Entry::Case {
                            scrutinee,
                            branches,
                        } => {
                            work.push(Work::Entry(scrutinee.entry.0));
                            work.extend(branches.iter().map(|b| Work::Entry(b.entry.0)));
                        }
                        Entry::Letrec { body, bindings } => {
                            work.push(Work::Entry(body.entry.0));
                            work.extend(bindings.iter().map(|b| Work::Entry(b.entry.0)));
                        }
                        Entry::Lam { body } => work.push(Work::Entry(body.0)),
                    }
                }
            }
        }
    }

    fn sweep(&mut self) -> (usize, usize) {
        let mut swept_closures = 0;
        for (idx, slot) in self.closures.iter_mut().enumerate() {
            if slot.gc & DEAD != 0 {
                continue;
            }
            if slot.gc & SEEN != 0 {
                slot.gc &= !SEEN;
            } else {
                slot.gc = DEAD_BYTE;
                slot.value = Closure::Null;
                self.free_closures.push(idx as u32);
                self.live_closures -= 1;
                swept_closures += 1;
            }
        }
        let mut swept_entries = 0;
        for (idx, slot) in self.entries.iter_mut().enumerate() {
            if slot.gc & DEAD != 0 {
                continue;
            }
            if slot.gc & SEEN != 0 {
                slot.gc &= !SEEN;
            } else {
                slot.gc = DEAD_BYTE;
                slot.value = Entry::Select(0);
                self.free_entries.push(idx as u32);
                self.live_entries -= 1;
                swept_entries += 1;
            }
        }
        (swept_closures, swept_entries)
    }
}

impl Default for Heap {
    fn default() -> Heap {
        Heap::new()
    }
}

enum Work {
    Closure(u32),
    Entry(u32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::EnvMask;
    use crate::closure::MaskedEntry;

    fn prim_byte(heap: &mut Heap, b: u8) -> ClosureId {
        heap.new_closure(Closure::Prim {
            bytes: vec![b].into_boxed_slice(),
        })
    }

    #[test]
    fn test_new_objects_are_born_used() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        // A collection right after allocation must not sweep it.
        heap.collect();
        assert!(heap.is_live_closure(a));
    }

    #[test]
    fn test_unused_unpinned_objects_are_swept() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        heap.unuse_closure(a);
        heap.collect();
        assert!(!heap.is_live_closure(a));
        assert_eq!(heap.live_closure_count(), 0);
    }

    #[test]
    fn test_pinned_objects_survive() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        heap.unuse_closure(a);
        heap.pin(a);
        heap.collect();
        assert!(heap.is_live_closure(a));
        heap.unpin(a);
        heap.collect();
        assert!(!heap.is_live_closure(a));
    }

    #[test]
    fn test_reachability_through_fields_and_env() {
        let mut heap = Heap::new();
        let leaf = prim_byte(&mut heap, 7);
        heap.unuse_closure(leaf);
        let con = heap.new_closure(Closure::Constr {
            variant: 0,
            want_arity: 0,
            fields: vec![leaf],
        });
        heap.unuse_closure(con);
        heap.pin(con);
        let entry = heap.new_entry(Entry::Select(0));
        heap.unuse_entry(entry);
        let thunk = heap.new_closure(Closure::Thunk {
            want_arity: 0,
            env: vec![con],
            entry,
        });
        heap.unuse_closure(thunk);
        heap.pin(thunk);

        heap.collect();
        assert!(heap.is_live_closure(leaf));
        assert!(heap.is_live_closure(con));
        assert!(heap.is_live_closure(thunk));
        assert!(heap.is_live_entry(entry));
    }

    #[test]
    fn test_entry_roots_keep_referenced_closures() {
        let mut heap = Heap::new();
        let target = prim_byte(&mut heap, 3);
        heap.unuse_closure(target);
        let entry = heap.new_entry(Entry::Ref(target));
        // The entry stays USED (born used); the closure it references must
        // survive through it.
        heap.collect();
        assert!(heap.is_live_entry(entry));
        assert!(heap.is_live_closure(target));
    }

    #[test]
    fn test_cycles_are_collected_when_unrooted() {
        let mut heap = Heap::new();
        let entry = heap.new_entry(Entry::Select(0));
        let a = heap.new_closure(Closure::Null);
        let b = heap.new_closure(Closure::Null);
        heap.set_closure(
            a,
            Closure::Thunk {
                want_arity: 0,
                env: vec![b],
                entry,
            },
        );
        heap.set_closure(
            b,
            Closure::Thunk {
                want_arity: 0,
                env: vec![a],
                entry,
            },
        );
        heap.pin(a);
        heap.unuse_closure(a);
        heap.unuse_closure(b);
        heap.unuse_entry(entry);
        heap.collect();
        assert!(heap.is_live_closure(a));
        assert!(heap.is_live_closure(b));

        heap.unpin(a);
        heap.collect();
        assert!(!heap.is_live_closure(a));
        assert!(!heap.is_live_closure(b));
        assert!(!heap.is_live_entry(entry));
    }

    #[test]
    fn test_seen_clear_after_collect() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        let b = prim_byte(&mut heap, 2);
        heap.unuse_closure(b);
        heap.pin(a);
        heap.collect();
        assert!(heap.seen_bits_clear());
        let _ = (a, b);
    }

    #[test]
    fn test_scratch_roots_protect_detached_ids() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        heap.unuse_closure(a);
        let mark = heap.protect(&[a]);
        heap.collect();
        assert!(heap.is_live_closure(a));
        heap.unprotect(mark);
        heap.collect();
        assert!(!heap.is_live_closure(a));
    }

    #[test]
    fn test_slot_reuse_after_sweep() {
        let mut heap = Heap::new();
        let a = prim_byte(&mut heap, 1);
        heap.unuse_closure(a);
        heap.collect();
        let b = prim_byte(&mut heap, 2);
        // The freed slot is recycled.
        assert_eq!(a.index(), b.index());
        assert!(heap.is_live_closure(b));
    }

    #[test]
    fn test_allocation_triggers_collection_at_double() {
        let mut heap = Heap::new();
        let keep = prim_byte(&mut heap, 0);
        heap.pin(keep);
        heap.unuse_closure(keep);
        heap.collect();
        assert_eq!(heap.last_collection_size(), 1);

        // Allocate garbage until the 2x policy kicks in; the heap must not
        // grow without bound.
        for i in 0..64 {
            let c = prim_byte(&mut heap, i);
            heap.unuse_closure(c);
        }
        assert!(heap.live_closure_count() < 64);
        assert!(heap.is_live_closure(keep));
    }

    #[test]
    fn test_copy_into_shares_elements_and_duplicates_arrays() {
        let mut heap = Heap::new();
        let field = prim_byte(&mut heap, 9);
        let src = heap.new_closure(Closure::Constr {
            variant: 2,
            want_arity: 0,
            fields: vec![field],
        });
        let dest = heap.new_closure(Closure::Null);
        heap.copy_into(dest, src);
        match heap.closure(dest) {
            Closure::Constr {
                variant, fields, ..
            } => {
                assert_eq!(*variant, 2);
                assert_eq!(fields, &vec![field]);
            }
            other => panic!("unexpected closure {:?}", other),
        }
    }

    #[test]
    fn test_masked_entry_branches_marked() {
        let mut heap = Heap::new();
        let inner = heap.new_entry(Entry::Select(0));
        heap.unuse_entry(inner);
        let case = heap.new_entry(Entry::Case {
            scrutinee: MaskedEntry::new(EnvMask::all(1), inner),
            branches: vec![MaskedEntry::new(EnvMask::empty(), inner)],
        });
        heap.collect();
        assert!(heap.is_live_entry(case));
        assert!(heap.is_live_entry(inner));
    }
}
