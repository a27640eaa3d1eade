//! Symbols.
//!
//! Symbols are small copyable handles; the strings behind them live in the
//! compilation's `Interner`. Bound classes store symbols, never pointers to
//! other bound classes: `A extends B` and `B` mentioning `A` through
//! generics is a cycle of symbols, which is fine, rather than a cycle of
//! ownership, which is not. Resolution back to data goes through the
//! environment at the point of use.

use javelin_common::Atom;

/// A class, keyed by interned binary name (`java/util/Map$Entry`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassSym(pub Atom);

/// A package, keyed by interned slash-separated name (`""` for the default
/// package). Packages own nothing; they are lookup roots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PackageSym(pub Atom);

/// A module, keyed by interned dotted module name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleSym(pub Atom);

/// A field: owner class plus simple name. Fields cannot overload, so the
/// pair is unique.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldSym {
    pub owner: ClassSym,
    pub name: Atom,
}

/// A method: owner class, simple name, and erased descriptor to tell
/// overloads apart. Method symbols are minted during member binding, once
/// erased descriptors exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MethodSym {
    pub owner: ClassSym,
    pub name: Atom,
    pub descriptor: Atom,
}

/// What declares a type variable. Methods are identified by declaration
/// index within their owner, since type parameters bind before the method's
/// own symbol (which needs the erased descriptor) can exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TyVarOwner {
    Class(ClassSym),
    Method(ClassSym, u32),
}

impl TyVarOwner {
    pub fn class(self) -> ClassSym {
        match self {
            TyVarOwner::Class(sym) | TyVarOwner::Method(sym, _) => sym,
        }
    }
}

/// A type variable: owner plus simple name plus declaration index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TyVarSym {
    pub owner: TyVarOwner,
    pub name: Atom,
    pub index: u32,
}
