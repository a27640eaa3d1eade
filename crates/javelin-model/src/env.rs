//! The environment abstraction.
//!
//! An environment maps a class symbol to its bound representation at the
//! current phase. Environments compose: a `CompoundEnv` consults the top
//! layer first and falls back to the base, which is how the binder stacks
//! source-phase-N-1 snapshots over the classpath. This is deliberately a
//! sum of layers with an iterative lookup, not a trait-object inheritance
//! chain.

use crate::sym::ClassSym;
use rustc_hash::FxHashMap;

pub trait Env<V> {
    fn entry(&self, sym: ClassSym) -> Option<V>;
}

/// A map-backed environment layer. Values are cloned out; use `Arc`ed
/// values for anything non-trivial.
pub struct MapEnv<'a, V> {
    map: &'a FxHashMap<ClassSym, V>,
}

impl<'a, V> MapEnv<'a, V> {
    pub fn new(map: &'a FxHashMap<ClassSym, V>) -> Self {
        MapEnv { map }
    }
}

impl<'a, V: Clone> Env<V> for MapEnv<'a, V> {
    fn entry(&self, sym: ClassSym) -> Option<V> {
        self.map.get(&sym).cloned()
    }
}

/// Two environments chained, top first.
pub struct CompoundEnv<T, B> {
    pub top: T,
    pub base: B,
}

impl<T, B> CompoundEnv<T, B> {
    pub fn new(top: T, base: B) -> Self {
        CompoundEnv { top, base }
    }
}

impl<V, T: Env<V>, B: Env<V>> Env<V> for CompoundEnv<T, B> {
    fn entry(&self, sym: ClassSym) -> Option<V> {
        self.top.entry(sym).or_else(|| self.base.entry(sym))
    }
}

impl<V, E: Env<V> + ?Sized> Env<V> for &E {
    fn entry(&self, sym: ClassSym) -> Option<V> {
        (**self).entry(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_common::Interner;

    #[test]
    fn compound_prefers_top() {
        let mut interner = Interner::new();
        let a = ClassSym(interner.intern("A"));
        let b = ClassSym(interner.intern("B"));
        let mut base = FxHashMap::default();
        base.insert(a, 1);
        base.insert(b, 2);
        let mut top = FxHashMap::default();
        top.insert(a, 10);
        let env = CompoundEnv::new(MapEnv::new(&top), MapEnv::new(&base));
        assert_eq!(env.entry(a), Some(10));
        assert_eq!(env.entry(b), Some(2));
    }
}
