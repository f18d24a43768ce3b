//! huskc-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every phase of the husk compiler and runtime:
//!
//! - [`Symbol`] / [`QualName`]: interned identifier handles. Identifiers and
//!   module qualifiers are canonicalized once into a process-wide string
//!   table, after which equality is a 4-byte integer comparison. This is
//!   what makes "pointer equality after interning" hold for qualified names
//!   throughout the front end.
//! - [`Pos`]: a source location (byte offset plus 1-based line/column),
//!   carried by tokens and embedded in every fatal diagnostic.
//!
//! The string table is global on purpose: interned strings live until
//! process exit, so handles never dangle and never need lifetime tracking.
//! Everything else in the compiler takes its state as explicit handles.

pub mod span;
pub mod symbol;

pub use span::Pos;
pub use symbol::{QualName, Symbol};

// Re-export commonly used hash containers
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
