//! Runtime error types.
//!
//! Every variant is fatal: the evaluator has found a closure whose shape
//! contradicts what its entry code requires, which means the lowered
//! program (or a primitive) is wrong. There is no recovery path; the
//! driver prints the error and exits.

use thiserror::Error;

/// Errors raised by the evaluator and primitives.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RtsError {
    #[error("apply: function value expected, found {found}")]
    ApplyNonFunction { found: &'static str },

    #[error("case analysis on a non-constructor value")]
    CaseOnNonConstructor,

    #[error("case analysis on an unsaturated constructor (missing {missing} arguments)")]
    CaseOnUnsaturated { missing: u16 },

    #[error("constructor variant {variant} has no case branch ({branches} branches)")]
    MissingBranch { variant: u8, branches: usize },

    #[error("environment slot {index} out of range ({len} slots)")]
    BadEnvSlot { index: u16, len: usize },

    #[error("reduction reached an uninitialized closure")]
    UninitializedClosure,

    #[error("primitive failed: {0}")]
    Prim(String),
}
