//! Heap object shapes: closures, entry code, and environment masks.
//!
//! A [`Closure`] is a value or a suspended computation; an [`Entry`] is the
//! instruction describing how to turn a suspended closure into its value.
//! Both live in the [`Heap`](crate::Heap) and are referenced by copyable
//! index handles. Field and environment arrays hold handles, not owned
//! objects: the arrays belong to the closure, the objects to the GC.

use crate::error::RtsError;
use crate::heap::Heap;

/// Handle to a closure slot in the heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ClosureId(pub(crate) u32);

/// Handle to an entry slot in the heap.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EntryId(pub(crate) u32);

impl ClosureId {
    /// Raw slot index, for diagnostics.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl EntryId {
    /// Raw slot index, for diagnostics.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A primitive function: receives the heap and its self-closure and must
/// leave the self-closure in WHNF.
pub type PrimFn = fn(&mut Heap, ClosureId) -> Result<(), RtsError>;

/// A heap-allocated closure.
#[derive(Clone, Debug)]
pub enum Closure {
    /// Freshly allocated placeholder carrying no payload yet. Only the
    /// evaluator creates these (scrutinee temporaries, letrec knot-tying),
    /// and it fills them before anything can observe them.
    Null,

    /// An evaluated opaque primitive value.
    Prim {
        /// The value bytes, owned by the closure.
        bytes: Box<[u8]>,
    },

    /// An evaluated (possibly partially applied) algebraic value.
    Constr {
        /// Which variant of its datatype this is.
        variant: u8,
        /// How many arguments the constructor still wants; 0 means
        /// saturated.
        want_arity: u16,
        /// Fields supplied so far.
        fields: Vec<ClosureId>,
    },

    /// A suspended computation (`want_arity == 0`) or a function value
    /// still waiting for `want_arity` arguments.
    Thunk {
        want_arity: u16,
        /// Captured environment.
        env: Vec<ClosureId>,
        /// How to compute the value.
        entry: EntryId,
    },
}

impl Closure {
    /// Whether this closure is already in weak-head normal form.
    ///
    /// Primitives and constructors are WHNF; a thunk is WHNF exactly when
    /// it is a function (`want_arity > 0`).
    pub fn is_whnf(&self) -> bool {
        match self {
            Closure::Null => false,
            Closure::Prim { .. } | Closure::Constr { .. } => true,
            Closure::Thunk { want_arity, .. } => *want_arity > 0,
        }
    }

    /// A short name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Closure::Null => "uninitialized closure",
            Closure::Prim { .. } => "primitive value",
            Closure::Constr { want_arity: 0, .. } => "saturated constructor",
            Closure::Constr { .. } => "partial constructor",
            Closure::Thunk { want_arity: 0, .. } => "unevaluated thunk",
            Closure::Thunk { .. } => "function",
        }
    }
}

/// A bitmask over an environment, selecting the slots a child computation
/// needs. Bit `i` selects the `i`th slot of the (possibly concatenated)
/// parent environment; selected slots are packed in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvMask {
    bits: Box<[u8]>,
}

impl EnvMask {
    /// The mask selecting nothing.
    pub fn empty() -> EnvMask {
        EnvMask::default()
    }

    /// A mask with exactly the given bit indices set.
    pub fn from_indices(indices: &[usize]) -> EnvMask {
        let len = match indices.iter().max() {
            Some(&max) => max / 8 + 1,
            None => 0,
        };
        let mut bits = vec![0u8; len];
        for &i in indices {
            bits[i / 8] |= 1 << (i % 8);
        }
        EnvMask {
            bits: bits.into_boxed_slice(),
        }
    }

    /// A mask selecting every one of the first `len` slots.
    pub fn all(len: usize) -> EnvMask {
        let mut bits = vec![0u8; len.div_ceil(8)];
        for i in 0..len {
            bits[i / 8] |= 1 << (i % 8);
        }
        EnvMask {
            bits: bits.into_boxed_slice(),
        }
    }

    /// Whether bit `i` is set.
    pub fn contains(&self, i: usize) -> bool {
        match self.bits.get(i / 8) {
            Some(byte) => byte & (1 << (i % 8)) != 0,
            None => false,
        }
    }

    /// Select the masked subset of `env`, packed in order.
    pub fn select(&self, env: &[ClosureId]) -> Vec<ClosureId> {
        env.iter()
            .enumerate()
            .filter(|(i, _)| self.contains(*i))
            .map(|(_, &id)| id)
            .collect()
    }

    /// Select across the concatenation `env1 ++ env2`: bit `i` picks the
    /// `i`th element of the concatenated sequence.
    pub fn select_concat(&self, env1: &[ClosureId], env2: &[ClosureId]) -> Vec<ClosureId> {
        env1.iter()
            .chain(env2.iter())
            .enumerate()
            .filter(|(i, _)| self.contains(*i))
            .map(|(_, &id)| id)
            .collect()
    }
}

/// An entry reference paired with the environment subset it needs.
#[derive(Clone, Debug)]
pub struct MaskedEntry {
    pub mask: EnvMask,
    pub entry: EntryId,
}

impl MaskedEntry {
    pub fn new(mask: EnvMask, entry: EntryId) -> MaskedEntry {
        MaskedEntry { mask, entry }
    }
}

/// Entry code: instructions for materializing a closure's value.
#[derive(Clone, Debug)]
pub enum Entry {
    /// Run a primitive function on the self-closure.
    Prim(PrimFn),

    /// The result is whatever the referenced closure reduces to.
    Ref(ClosureId),

    /// The result is environment slot `i`, reduced.
    Select(u16),

    /// Build function and argument thunks from masked views of the
    /// environment, then apply.
    Apply { fun: MaskedEntry, arg: MaskedEntry },

    /// Reduce the scrutinee to a saturated constructor and take the branch
    /// of its variant, extending the environment with the constructor's
    /// fields.
    Case {
        scrutinee: MaskedEntry,
        /// One branch per variant of the scrutinized datatype.
        branches: Vec<MaskedEntry>,
    },

    /// Allocate the bindings as mutually recursive thunks (each sees the
    /// outer environment extended with the whole binding group), then
    /// materialize the body.
    Letrec {
        body: MaskedEntry,
        bindings: Vec<MaskedEntry>,
    },

    /// Become a function of one more argument whose entry code is `body`.
    Lam { body: EntryId },
}
