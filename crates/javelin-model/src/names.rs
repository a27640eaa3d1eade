//! Shared interner handle.
//!
//! One `Names` lives for the whole compilation; every crate that mints or
//! prints symbols holds a reference. The lock makes it usable from the
//! parallel lowering stage; the binder itself is single-threaded and never
//! contends.

use crate::sym::{ClassSym, PackageSym};
use javelin_common::{Atom, Interner};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct Names {
    interner: RwLock<Interner>,
}

impl Names {
    pub fn new() -> Self {
        Names {
            interner: RwLock::new(Interner::new()),
        }
    }

    pub fn intern(&self, text: &str) -> Atom {
        self.interner
            .write()
            .expect("interner lock poisoned")
            .intern(text)
    }

    pub fn get(&self, text: &str) -> Option<Atom> {
        self.interner
            .read()
            .expect("interner lock poisoned")
            .get(text)
    }

    /// The interned string, cloned out.
    pub fn resolve(&self, atom: Atom) -> String {
        self.interner
            .read()
            .expect("interner lock poisoned")
            .resolve(atom)
            .to_string()
    }

    /// Borrow the interned string without cloning.
    pub fn with<R>(&self, atom: Atom, f: impl FnOnce(&str) -> R) -> R {
        let guard = self.interner.read().expect("interner lock poisoned");
        f(guard.resolve(atom))
    }

    pub fn class(&self, binary_name: &str) -> ClassSym {
        ClassSym(self.intern(binary_name))
    }

    pub fn package(&self, name: &str) -> PackageSym {
        PackageSym(self.intern(name))
    }

    /// The binary name behind a class symbol.
    pub fn binary_name(&self, sym: ClassSym) -> String {
        self.resolve(sym.0)
    }
}
