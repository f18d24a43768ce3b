//! Collector behavior across real reductions: reachability after cycles,
//! reclamation of evaluation garbage, and flag hygiene.

mod common;

use common::*;
use huskc_rts::{whnf, Closure, Entry, Heap};

#[test]
fn reduction_results_survive_collection() {
    let mut heap = Heap::new();
    let value = prim_u64(&mut heap, 21);
    let entry = heap.new_entry(Entry::Ref(value));
    let t = thunk(&mut heap, Vec::new(), entry);
    heap.pin(t);
    heap.unuse_closure(t);
    heap.unuse_closure(value);
    heap.unuse_entry(entry);

    whnf(&mut heap, t).unwrap();
    heap.collect();

    assert!(heap.is_live_closure(t));
    assert_eq!(prim_value(&heap, t), 21);
    assert!(heap.seen_bits_clear());
}

#[test]
fn evaluation_garbage_is_reclaimed() {
    let mut heap = Heap::new();
    let sel0 = heap.new_entry(Entry::Select(0));

    // A chain of Apply entries produces intermediate fun/arg closures
    // that become garbage as soon as the result is copied in place.
    let id_body = heap.new_entry(Entry::Select(0));
    let lam = heap.new_entry(Entry::Lam { body: id_body });
    let identity = thunk(&mut heap, Vec::new(), lam);
    let value = prim_u64(&mut heap, 5);
    let apply = heap.new_entry(Entry::Apply {
        fun: me(&[0], sel0),
        arg: me(&[1], sel0),
    });
    let t = thunk(&mut heap, vec![identity, value], apply);
    heap.pin(t);

    whnf(&mut heap, t).unwrap();
    assert_eq!(prim_value(&heap, t), 5);

    // Drop the evaluator's remaining use marks and the roots we no longer
    // care about; only the pinned result (and what it references) should
    // survive.
    heap.unuse_closure(t);
    heap.unuse_closure(identity);
    heap.unuse_closure(value);
    for e in [sel0, id_body, lam, apply] {
        heap.unuse_entry(e);
    }
    heap.collect();
    let live_after_first = heap.live_closure_count() + heap.live_entry_count();

    heap.collect();
    let live_after_second = heap.live_closure_count() + heap.live_entry_count();

    // A second collection with no mutator activity finds nothing new.
    assert_eq!(live_after_first, live_after_second);
    assert!(heap.is_live_closure(t));
    assert!(heap.seen_bits_clear());
}

#[test]
fn unpinned_results_are_reclaimed() {
    let mut heap = Heap::new();
    let value = prim_u64(&mut heap, 1);
    let entry = heap.new_entry(Entry::Ref(value));
    let t = thunk(&mut heap, Vec::new(), entry);
    whnf(&mut heap, t).unwrap();

    heap.unuse_closure(t);
    heap.unuse_closure(value);
    heap.unuse_entry(entry);
    heap.collect();

    assert!(!heap.is_live_closure(t));
    assert!(!heap.is_live_closure(value));
    assert!(!heap.is_live_entry(entry));
    assert_eq!(heap.live_closure_count(), 0);
    assert_eq!(heap.live_entry_count(), 0);
}

#[test]
fn pinned_constructor_keeps_lazy_fields_alive() {
    let mut heap = Heap::new();
    let sel0 = heap.new_entry(Entry::Select(0));
    let payload = prim_u64(&mut heap, 9);
    let lazy_field = thunk(&mut heap, vec![payload], sel0);
    let cell = constr(&mut heap, 0, 0, vec![lazy_field]);
    heap.pin(cell);
    heap.unuse_closure(cell);
    heap.unuse_closure(lazy_field);
    heap.unuse_closure(payload);
    heap.unuse_entry(sel0);

    heap.collect();

    // The unevaluated field and everything it captures survive through
    // the pinned constructor.
    assert!(heap.is_live_closure(lazy_field));
    assert!(heap.is_live_closure(payload));
    assert!(heap.is_live_entry(sel0));

    // Forcing the field afterwards still works.
    whnf(&mut heap, lazy_field).unwrap();
    assert_eq!(prim_value(&heap, lazy_field), 9);
}

#[test]
fn collection_during_reduction_spares_in_flight_objects() {
    // Tight heap: allocations during the reduction will repeatedly cross
    // the 2x threshold and run collections while thunks are mid-flight.
    let mut heap = Heap::new();
    let sel0 = heap.new_entry(Entry::Select(0));
    let one = prim_u64(&mut heap, 1);
    let cons = constr(&mut heap, 1, 2, Vec::new());

    let cons_one = heap.new_entry(Entry::Apply {
        fun: me(&[1], sel0),
        arg: me(&[0], sel0),
    });
    let xs_entry = heap.new_entry(Entry::Apply {
        fun: me(&[0, 1], cons_one),
        arg: me(&[2], sel0),
    });
    let letrec = heap.new_entry(Entry::Letrec {
        body: me(&[2], sel0),
        bindings: vec![me(&[0, 1, 2], xs_entry)],
    });
    let xs = thunk(&mut heap, vec![one, cons], letrec);
    heap.pin(xs);
    // Give the collector every reason to run: nothing is use-marked except
    // what the evaluator itself marks.
    heap.unuse_closure(xs);
    heap.unuse_closure(one);
    heap.unuse_closure(cons);
    for e in [sel0, cons_one, xs_entry, letrec] {
        heap.unuse_entry(e);
    }

    whnf(&mut heap, xs).unwrap();

    match heap.closure(xs) {
        Closure::Constr {
            variant: 1,
            want_arity: 0,
            fields,
        } => {
            let head = fields[0];
            heap.use_closure(head);
            whnf(&mut heap, head).unwrap();
            assert_eq!(prim_value(&heap, head), 1);
        }
        other => panic!("expected cons cell, found {:?}", other),
    }
}
