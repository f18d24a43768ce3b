//! String interner backing the [`Symbol`] type.
//!
//! The table is keyed by the string contents (DashMap with AHash) and keeps
//! a parallel index-ordered vector for symbol-to-string lookup. Strings are
//! leaked into `'static` on first sight; subsequent interns of equal
//! contents return the existing index.
//!
//! The interner is thread-safe. The compiler itself is single-threaded,
//! but a global table must not make that assumption for it.

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{LazyLock, RwLock};

use super::Symbol;

/// Global string table, initialized on first use.
pub static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(StringTable::new);

/// Content-addressed string table.
pub struct StringTable {
    /// Maps interned contents to table index.
    map: DashMap<&'static str, u32, RandomState>,

    /// Index-ordered interned strings, for `Symbol -> &str`.
    strings: RwLock<Vec<&'static str>>,
}

impl StringTable {
    fn new() -> Self {
        StringTable {
            map: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            strings: RwLock::new(Vec::with_capacity(256)),
        }
    }

    /// Intern a string, returning its symbol.
    ///
    /// Fast path is a single map lookup. The slow path takes the vector
    /// write lock, re-checks (another thread may have won the race), and
    /// appends.
    pub fn intern(&self, string: &str) -> Symbol {
        if let Some(entry) = self.map.get(string) {
            return Symbol { index: *entry };
        }

        let mut strings = self.strings.write().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = self.map.get(string) {
            return Symbol { index: *entry };
        }
        let interned: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = strings.len() as u32;
        strings.push(interned);
        self.map.insert(interned, index);
        Symbol { index }
    }

    /// Look up the string for a symbol.
    ///
    /// # Panics
    ///
    /// Panics if the symbol did not come from this table; symbols are only
    /// ever constructed by [`StringTable::intern`], so this indicates a bug.
    pub fn get(&self, symbol: Symbol) -> &'static str {
        let strings = self.strings.read().unwrap_or_else(|e| e.into_inner());
        strings[symbol.index as usize]
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
