//! String interning.
//!
//! A [`Symbol`] is a compact, `Copy` handle into an [`Interner`]'s string
//! table. Unlike a general-purpose language front end, this compiler never
//! shares a table across threads and never runs more than one parse per
//! process, so the table is owned by whoever does the parsing rather than
//! stashed behind a global lock.

use rustc_hash::FxHashMap;
use std::fmt;

/// An interned identifier. Two symbols compare equal iff the strings they
/// were interned from compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl Symbol {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// Owns the string table a set of [`Symbol`]s are indices into.
#[derive(Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Symbol>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning the same [`Symbol`] for repeated calls with
    /// equal text.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(&sym) = self.lookup.get(text) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, sym);
        sym
    }

    /// Resolves a previously interned symbol back to its text.
    ///
    /// # Panics
    ///
    /// Panics if `sym` was not produced by this interner.
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_returns_same_symbol() {
        let mut interner = Interner::new();
        let a = interner.intern("main");
        let b = interner.intern("main");
        assert_eq!(a, b);
    }

    #[test]
    fn interning_distinct_text_returns_distinct_symbols() {
        let mut interner = Interner::new();
        let a = interner.intern("x");
        let b = interner.intern("y");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_round_trips() {
        let mut interner = Interner::new();
        let sym = interner.intern("counter");
        assert_eq!(interner.resolve(sym), "counter");
    }
}
