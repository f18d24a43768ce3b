//! Shared builders for runtime integration tests.

use huskc_rts::{Closure, ClosureId, EntryId, EnvMask, Heap, MaskedEntry, RtsError};

/// Allocate an evaluated primitive holding a little-endian u64.
pub fn prim_u64(heap: &mut Heap, value: u64) -> ClosureId {
    heap.new_closure(Closure::Prim {
        bytes: value.to_le_bytes().to_vec().into_boxed_slice(),
    })
}

/// Read the u64 out of an evaluated primitive closure.
pub fn prim_value(heap: &Heap, id: ClosureId) -> u64 {
    match heap.closure(id) {
        Closure::Prim { bytes } => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
        other => panic!("expected primitive, found {:?}", other),
    }
}

/// Store a u64 primitive value into `self_id`, the usual way a primitive
/// leaves its result.
pub fn store_u64(heap: &mut Heap, id: ClosureId, value: u64) {
    heap.set_closure(
        id,
        Closure::Prim {
            bytes: value.to_le_bytes().to_vec().into_boxed_slice(),
        },
    );
}

/// The environment of a thunk closure; primitives use this to reach their
/// arguments.
pub fn thunk_env(heap: &Heap, id: ClosureId) -> Result<Vec<ClosureId>, RtsError> {
    match heap.closure(id) {
        Closure::Thunk { env, .. } => Ok(env.clone()),
        other => Err(RtsError::Prim(format!(
            "primitive self-closure is {}",
            other.kind_name()
        ))),
    }
}

/// A masked entry selecting the given environment indices.
pub fn me(indices: &[usize], entry: EntryId) -> MaskedEntry {
    MaskedEntry::new(EnvMask::from_indices(indices), entry)
}

/// A masked entry selecting nothing.
pub fn me_empty(entry: EntryId) -> MaskedEntry {
    MaskedEntry::new(EnvMask::empty(), entry)
}

/// Allocate an unevaluated thunk.
pub fn thunk(heap: &mut Heap, env: Vec<ClosureId>, entry: EntryId) -> ClosureId {
    heap.new_closure(Closure::Thunk {
        want_arity: 0,
        env,
        entry,
    })
}

/// Allocate a saturated or partially applied constructor.
pub fn constr(heap: &mut Heap, variant: u8, want_arity: u16, fields: Vec<ClosureId>) -> ClosureId {
    heap.new_closure(Closure::Constr {
        variant,
        want_arity,
        fields,
    })
}
