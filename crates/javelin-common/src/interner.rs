//! String interning.
//!
//! Binary names and simple names repeat constantly across a compilation, so
//! symbols hold an `Atom` (a 4-byte handle) and the `Interner` owns the
//! backing strings. Atoms from the same interner compare and hash as
//! integers.

use rustc_hash::FxHashMap;

/// A handle to an interned string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
pub struct Interner {
    map: FxHashMap<Box<str>, Atom>,
    strings: Vec<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&atom) = self.map.get(text) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.map.insert(boxed, atom);
        atom
    }

    /// Look up an existing atom without interning.
    pub fn get(&self, text: &str) -> Option<Atom> {
        self.map.get(text).copied()
    }

    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.index()]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_dedupes() {
        let mut interner = Interner::new();
        let a = interner.intern("java/lang/Object");
        let b = interner.intern("java/lang/String");
        let c = interner.intern("java/lang/Object");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "java/lang/Object");
        assert_eq!(interner.get("java/lang/String"), Some(b));
        assert_eq!(interner.get("java/util/List"), None);
    }
}
