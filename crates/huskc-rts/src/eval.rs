//! The WHNF evaluator: entry-code interpretation by in-place reduction.
//!
//! [`whnf`] reduces a closure until its outermost shape is known and
//! overwrites the closure's heap slot with the result, so every handle to
//! it observes the value. This is how lazy evaluation memoizes.
//!
//! The evaluator manipulates environments in two states. An *attached*
//! environment belongs to a thunk in the heap and is reachable through it.
//! A *detached* environment (a masked selection being handed to a child
//! computation) is reachable from nowhere; since any allocation may start
//! a collection, [`materialize`] parks its environment on the heap's
//! scratch-root stack for the duration of the call. `USED` marks are
//! placed and released around individual closures exactly as the reduction
//! steps touch them.

use crate::closure::{Closure, ClosureId, Entry, EntryId};
use crate::error::RtsError;
use crate::heap::Heap;

/// Reduce a closure to weak-head normal form, in place.
///
/// Primitives, constructors, and functions return immediately; an
/// unevaluated thunk is marked in-use and materialized. The caller that
/// asked for the reduction releases the in-use mark once it has consumed
/// the result (see [`apply`] and the `Ref`/`Select` steps).
pub fn whnf(heap: &mut Heap, id: ClosureId) -> Result<(), RtsError> {
    debug_assert!(heap.is_live_closure(id));
    match heap.closure(id) {
        Closure::Prim { .. } | Closure::Constr { .. } => Ok(()),
        Closure::Thunk {
            want_arity,
            env,
            entry,
        } => {
            let want_arity = *want_arity;
            let env = env.clone();
            let entry = *entry;
            heap.use_closure(id);
            if want_arity > 0 {
                return Ok(());
            }
            materialize(heap, id, env, entry)
        }
        Closure::Null => Err(RtsError::UninitializedClosure),
    }
}

/// Evaluate entry code whose result must overwrite `self_id`.
///
/// The environment is parked on the scratch-root stack for the duration of
/// the call: it may be a detached masked selection that nothing else
/// references, and any nested allocation is allowed to collect.
pub(crate) fn materialize(
    heap: &mut Heap,
    self_id: ClosureId,
    env: Vec<ClosureId>,
    entry: EntryId,
) -> Result<(), RtsError> {
    debug_assert!(heap.is_live_closure(self_id));
    debug_assert!(heap.is_live_entry(entry));
    let mark = heap.protect(&env);
    let result = materialize_steps(heap, self_id, &env, entry);
    heap.unprotect(mark);
    result
}

fn materialize_steps(
    heap: &mut Heap,
    self_id: ClosureId,
    env: &[ClosureId],
    entry: EntryId,
) -> Result<(), RtsError> {
    match heap.entry(entry).clone() {
        Entry::Prim(prim) => {
            // The environment may be a detached selection (branch body,
            // saturating call); attach it so the primitive reaches its
            // arguments through the self-closure, per the primitive ABI.
            heap.set_closure(
                self_id,
                Closure::Thunk {
                    want_arity: 0,
                    env: env.to_vec(),
                    entry,
                },
            );
            prim(heap, self_id)
        }

        Entry::Ref(target) => {
            heap.use_closure(target);
            whnf(heap, target)?;
            heap.copy_into(self_id, target);
            heap.unuse_closure(target);
            Ok(())
        }

        Entry::Select(index) => {
            let target = match env.get(index as usize) {
                Some(&id) => id,
                None => {
                    return Err(RtsError::BadEnvSlot {
                        index,
                        len: env.len(),
                    })
                }
            };
            heap.use_closure(target);
            whnf(heap, target)?;
            heap.copy_into(self_id, target);
            heap.unuse_closure(target);
            Ok(())
        }

        Entry::Apply { fun, arg } => {
            let fun_clos = heap.new_closure(Closure::Thunk {
                want_arity: 0,
                env: fun.mask.select(env),
                entry: fun.entry,
            });
            let arg_clos = heap.new_closure(Closure::Thunk {
                want_arity: 0,
                env: arg.mask.select(env),
                entry: arg.entry,
            });
            apply(heap, self_id, fun_clos, arg_clos)
        }

        Entry::Case {
            scrutinee,
            branches,
        } => {
            let scrut = heap.new_closure(Closure::Null);
            materialize(heap, scrut, scrutinee.mask.select(env), scrutinee.entry)?;
            let (variant, fields) = match heap.closure(scrut) {
                Closure::Constr {
                    variant,
                    want_arity: 0,
                    fields,
                } => (*variant, fields.clone()),
                Closure::Constr { want_arity, .. } => {
                    return Err(RtsError::CaseOnUnsaturated {
                        missing: *want_arity,
                    })
                }
                _ => return Err(RtsError::CaseOnNonConstructor),
            };
            let branch = match branches.get(variant as usize) {
                Some(branch) => branch,
                None => {
                    return Err(RtsError::MissingBranch {
                        variant,
                        branches: branches.len(),
                    })
                }
            };
            let branch_env = branch.mask.select_concat(env, &fields);
            let branch_entry = branch.entry;
            heap.unuse_closure(scrut);
            materialize(heap, self_id, branch_env, branch_entry)
        }

        Entry::Letrec { body, bindings } => {
            // Tie the knot: allocate every binding as an empty placeholder
            // first, then give each its environment, which may contain the
            // whole binding group including itself. The resulting cycle
            // lives in the heap and is the collector's problem, not an
            // ownership cycle here.
            let binds: Vec<ClosureId> = bindings
                .iter()
                .map(|_| heap.new_closure(Closure::Null))
                .collect();
            for (slot, binding) in binds.iter().zip(&bindings) {
                heap.set_closure(
                    *slot,
                    Closure::Thunk {
                        want_arity: 0,
                        env: binding.mask.select_concat(env, &binds),
                        entry: binding.entry,
                    },
                );
            }
            let body_env = body.mask.select_concat(env, &binds);
            let result = materialize(heap, self_id, body_env, body.entry);
            for slot in binds {
                heap.unuse_closure(slot);
            }
            result
        }

        Entry::Lam { body } => {
            // Become a function of one more argument. The environment is
            // attached just as for Prim: on the plain-reduction path it is
            // self's own environment, on a saturating call it is the
            // extended call environment the new function must close over.
            heap.set_closure(
                self_id,
                Closure::Thunk {
                    want_arity: 1,
                    env: env.to_vec(),
                    entry: body,
                },
            );
            Ok(())
        }
    }
}

/// Apply `fun` to `arg`, leaving the result in `self_id`. Reduces `fun`
/// to WHNF first; consumes (releases the in-use marks of) both `fun` and
/// `arg`.
pub(crate) fn apply(
    heap: &mut Heap,
    self_id: ClosureId,
    fun: ClosureId,
    arg: ClosureId,
) -> Result<(), RtsError> {
    debug_assert!(heap.is_live_closure(self_id));
    debug_assert!(heap.is_live_closure(fun));
    debug_assert!(heap.is_live_closure(arg));
    whnf(heap, fun)?;
    match heap.closure(fun).clone() {
        Closure::Constr {
            variant,
            want_arity,
            mut fields,
        } => {
            if want_arity == 0 {
                return Err(RtsError::ApplyNonFunction {
                    found: "saturated constructor",
                });
            }
            fields.push(arg);
            heap.set_closure(
                self_id,
                Closure::Constr {
                    variant,
                    want_arity: want_arity - 1,
                    fields,
                },
            );
            heap.unuse_closure(fun);
            heap.unuse_closure(arg);
            Ok(())
        }
        Closure::Thunk {
            want_arity,
            mut env,
            entry,
        } => {
            if want_arity == 0 {
                return Err(RtsError::ApplyNonFunction {
                    found: "unevaluated thunk",
                });
            }
            env.push(arg);
            if want_arity == 1 {
                heap.unuse_closure(fun);
                heap.unuse_closure(arg);
                materialize(heap, self_id, env, entry)
            } else {
                heap.set_closure(
                    self_id,
                    Closure::Thunk {
                        want_arity: want_arity - 1,
                        env,
                        entry,
                    },
                );
                heap.unuse_closure(fun);
                heap.unuse_closure(arg);
                Ok(())
            }
        }
        other => Err(RtsError::ApplyNonFunction {
            found: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::{EnvMask, MaskedEntry};

    fn prim_u64(heap: &mut Heap, value: u64) -> ClosureId {
        heap.new_closure(Closure::Prim {
            bytes: value.to_le_bytes().to_vec().into_boxed_slice(),
        })
    }

    fn prim_value(heap: &Heap, id: ClosureId) -> u64 {
        match heap.closure(id) {
            Closure::Prim { bytes } => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                u64::from_le_bytes(buf)
            }
            other => panic!("expected primitive, found {:?}", other),
        }
    }

    #[test]
    fn test_whnf_on_prim_is_noop() {
        let mut heap = Heap::new();
        let p = prim_u64(&mut heap, 42);
        whnf(&mut heap, p).unwrap();
        whnf(&mut heap, p).unwrap();
        assert_eq!(prim_value(&heap, p), 42);
    }

    #[test]
    fn test_ref_copies_result() {
        let mut heap = Heap::new();
        let target = prim_u64(&mut heap, 7);
        let entry = heap.new_entry(Entry::Ref(target));
        let thunk = heap.new_closure(Closure::Thunk {
            want_arity: 0,
            env: Vec::new(),
            entry,
        });
        whnf(&mut heap, thunk).unwrap();
        assert_eq!(prim_value(&heap, thunk), 7);
    }

    #[test]
    fn test_select_out_of_range_errors() {
        let mut heap = Heap::new();
        let entry = heap.new_entry(Entry::Select(3));
        let thunk = heap.new_closure(Closure::Thunk {
            want_arity: 0,
            env: Vec::new(),
            entry,
        });
        assert_eq!(
            whnf(&mut heap, thunk),
            Err(RtsError::BadEnvSlot { index: 3, len: 0 })
        );
    }

    #[test]
    fn test_apply_to_saturated_constructor_errors() {
        let mut heap = Heap::new();
        let con = heap.new_closure(Closure::Constr {
            variant: 0,
            want_arity: 0,
            fields: Vec::new(),
        });
        let arg = prim_u64(&mut heap, 1);
        let dest = heap.new_closure(Closure::Null);
        assert!(matches!(
            apply(&mut heap, dest, con, arg),
            Err(RtsError::ApplyNonFunction { .. })
        ));
    }

    #[test]
    fn test_case_on_non_constructor_errors() {
        let mut heap = Heap::new();
        let value = prim_u64(&mut heap, 5);
        let scrut_entry = heap.new_entry(Entry::Ref(value));
        let case = heap.new_entry(Entry::Case {
            scrutinee: MaskedEntry::new(EnvMask::empty(), scrut_entry),
            branches: Vec::new(),
        });
        let thunk = heap.new_closure(Closure::Thunk {
            want_arity: 0,
            env: Vec::new(),
            entry: case,
        });
        assert_eq!(whnf(&mut heap, thunk), Err(RtsError::CaseOnNonConstructor));
    }

    #[test]
    fn test_missing_branch_errors() {
        let mut heap = Heap::new();
        let con = heap.new_closure(Closure::Constr {
            variant: 1,
            want_arity: 0,
            fields: Vec::new(),
        });
        let scrut_entry = heap.new_entry(Entry::Ref(con));
        let body = heap.new_entry(Entry::Select(0));
        let case = heap.new_entry(Entry::Case {
            scrutinee: MaskedEntry::new(EnvMask::empty(), scrut_entry),
            branches: vec![MaskedEntry::new(EnvMask::empty(), body)],
        });
        let thunk = heap.new_closure(Closure::Thunk {
            want_arity: 0,
            env: Vec::new(),
            entry: case,
        });
        assert_eq!(
            whnf(&mut heap, thunk),
            Err(RtsError::MissingBranch {
                variant: 1,
                branches: 1
            })
        );
    }
}
