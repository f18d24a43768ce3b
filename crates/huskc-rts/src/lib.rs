//! huskc-rts - Graph-Reduction Runtime
//!
//! The runtime evaluates husk programs by *graph reduction*: the program is
//! a heap of [`Closure`]s (values or suspended computations) whose code is
//! a graph of [`Entry`] instructions, and evaluation rewrites closures in
//! place until they reach weak-head normal form (WHNF).
//!
//! ```text
//!              ┌────────────┐   entry    ┌───────────┐
//!   ClosureId ─▶   Thunk    ├───────────▶│  Entry    │
//!              │ env: […]   │            │ (Apply,   │
//!              └─────┬──────┘            │  Case, …) │
//!                    │ reduce                └───────┘
//!                    ▼
//!              ┌────────────┐
//!              │ Constr/Prim│   same heap slot: every reference
//!              └────────────┘   observes the result (sharing)
//! ```
//!
//! Three design points carry the weight:
//!
//! - **In-place update.** Reducing a thunk overwrites its heap slot with
//!   the result, so a shared computation is evaluated at most once. Handles
//!   ([`ClosureId`]) are stable; the payload behind them changes.
//! - **Masked environments.** A thunk captures a flat environment array.
//!   Child computations name the subset they need with a bitmask
//!   ([`EnvMask`]) over the parent environment (or over parent ++ extras
//!   for `Case` fields and `Letrec` bindings), which stands in for de
//!   Bruijn renumbering.
//! - **Mark-and-sweep GC.** The [`Heap`] owns every closure and entry.
//!   Objects carry one GC byte (`SEEN`/`USED`/`PINNED`); collection marks
//!   from every pinned or in-use object and sweeps the rest. Allocation
//!   triggers a cycle when the live population doubles since the last one.
//!
//! The runtime is single-threaded and synchronous; in-place update is
//! sound precisely because there is one mutator. All state lives in the
//! `Heap` value (nothing global), so tests build isolated heaps freely.

pub mod closure;
pub mod error;
pub mod eval;
pub mod heap;

pub use closure::{Closure, ClosureId, Entry, EntryId, EnvMask, MaskedEntry, PrimFn};
pub use error::RtsError;
pub use eval::whnf;
pub use heap::Heap;
