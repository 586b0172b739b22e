//! Deduplicating string storage.
//!
//! Every identifier and file name that flows through the compiler is
//! interned here. Two [`Symbol`]s are equal iff the strings they name
//! are equal, so downstream comparisons are integer comparisons.

use std::collections::HashMap;
use std::fmt;

/// A handle to an interned string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

/// A deduplicating string arena.
#[derive(Clone, Debug, Default)]
pub struct Interner {
    strings: Vec<String>,
    map: HashMap<String, u32>,
}

impl Interner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string, returning an existing symbol if it is already present.
    pub fn intern(&mut self, string: &str) -> Symbol {
        if let Some(&index) = self.map.get(string) {
            return Symbol(index);
        }
        let index = u32::try_from(self.strings.len()).unwrap_or_else(|_| {
            panic!(
                "interner overflow: {} strings exceeds u32::MAX",
                self.strings.len()
            )
        });
        self.map.insert(string.to_owned(), index);
        self.strings.push(string.to_owned());
        Symbol(index)
    }

    /// Returns the symbol for a string without interning it.
    pub fn get(&self, string: &str) -> Option<Symbol> {
        self.map.get(string).map(|&index| Symbol(index))
    }

    /// Returns `true` if the string has been interned.
    ///
    /// The unique-name procedure probes this to avoid colliding with
    /// any identifier present in the source.
    pub fn contains(&self, string: &str) -> bool {
        self.map.contains_key(string)
    }

    /// Resolves a symbol back to its string.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        &self.strings[symbol.0 as usize]
    }

    /// Returns the number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns `true` if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
