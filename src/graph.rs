//! Memoized evaluation over a fixed, acyclic node table.
//!
//! A node set lists every node with its dependencies before it. Input nodes
//! carry no value, only a revision that the owner bumps when the underlying
//! data changes. Derived nodes cache a value together with the revisions of
//! their dependencies at the time it was computed; `resolve` walks the table
//! once in declaration order and recomputes exactly the nodes whose
//! dependency revisions moved. Because a recomputed node gets a fresh
//! revision, every transitive dependent is recomputed in the same pass.
//!
//! Parameterized queries are cached separately in [`QueryCache`], keyed by
//! `(generation, parameter)`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use tracing::trace;

/// A closed set of graph nodes.
///
/// `ALL` must list dependencies before dependents and `index` must return the
/// node's position in `ALL`. Implementors should check both at compile time.
pub trait NodeSet: Copy + Eq + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn index(self) -> usize;

    fn deps(self) -> &'static [Self];

    fn is_input(self) -> bool {
        self.deps().is_empty()
    }
}

#[derive(Debug)]
struct Slot<V> {
    value: Option<V>,
    revision: u64,
    seen: Vec<u64>,
    evaluations: u64,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            revision: 0,
            seen: Vec::new(),
            evaluations: 0,
        }
    }
}

#[derive(Debug)]
pub struct Memo<N: NodeSet, V> {
    slots: Vec<Slot<V>>,
    clock: u64,
    _nodes: PhantomData<N>,
}

impl<N: NodeSet, V> Default for Memo<N, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: NodeSet, V> Memo<N, V> {
    pub fn new() -> Self {
        Self {
            slots: N::ALL.iter().map(|_| Slot::default()).collect(),
            clock: 0,
            _nodes: PhantomData,
        }
    }

    /// Marks an input node as changed.
    pub fn touch(&mut self, input: N) {
        debug_assert!(input.is_input(), "{input:?} is not an input node");
        self.clock += 1;
        self.slots[input.index()].revision = self.clock;
    }

    /// Brings every derived node up to date and returns how many were
    /// recomputed.
    pub fn resolve<F>(&mut self, mut eval: F) -> usize
    where
        F: FnMut(N, &Resolved<'_, N, V>) -> V,
    {
        let mut recomputed = 0;
        for &node in N::ALL {
            if node.is_input() {
                continue;
            }
            let idx = node.index();
            let seen: Vec<u64> = node
                .deps()
                .iter()
                .map(|dep| self.slots[dep.index()].revision)
                .collect();

            let slot = &self.slots[idx];
            if slot.value.is_some() && slot.seen == seen {
                continue;
            }

            let value = eval(
                node,
                &Resolved {
                    slots: &self.slots,
                    _nodes: PhantomData,
                },
            );

            self.clock += 1;
            let slot = &mut self.slots[idx];
            slot.value = Some(value);
            slot.seen = seen;
            slot.revision = self.clock;
            slot.evaluations += 1;
            recomputed += 1;
            trace!(node = ?node, revision = self.clock, "recomputed");
        }
        recomputed
    }

    pub fn get(&self, node: N) -> Option<&V> {
        self.slots[node.index()].value.as_ref()
    }

    pub fn revision(&self, node: N) -> u64 {
        self.slots[node.index()].revision
    }

    /// How many times `node` has been computed.
    pub fn evaluations(&self, node: N) -> u64 {
        self.slots[node.index()].evaluations
    }

    pub fn total_evaluations(&self) -> u64 {
        self.slots.iter().map(|s| s.evaluations).sum()
    }
}

/// Read access to already-resolved nodes while another node is evaluated.
pub struct Resolved<'a, N, V> {
    slots: &'a [Slot<V>],
    _nodes: PhantomData<N>,
}

impl<'a, N: NodeSet, V> Resolved<'a, N, V> {
    pub fn get(&self, node: N) -> Option<&'a V> {
        self.slots[node.index()].value.as_ref()
    }
}

/// Cache for parameterized queries. Entries belong to one generation and are
/// dropped as soon as a newer generation is seen.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    generation: Cell<u64>,
    entries: RefCell<HashMap<K, V>>,
    misses: Cell<u64>,
}

impl<K: Hash + Eq, V: Clone> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V: Clone> QueryCache<K, V> {
    pub fn new() -> Self {
        Self {
            generation: Cell::new(0),
            entries: RefCell::new(HashMap::new()),
            misses: Cell::new(0),
        }
    }

    pub fn get_or_compute<F>(&self, generation: u64, key: K, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if self.generation.get() != generation {
            self.entries.borrow_mut().clear();
            self.generation.set(generation);
        }
        if let Some(hit) = self.entries.borrow().get(&key) {
            return hit.clone();
        }
        // compute may re-enter other caches, so no borrow is held here
        let value = compute();
        self.misses.set(self.misses.get() + 1);
        self.entries.borrow_mut().insert(key, value.clone());
        value
    }

    /// Number of computations performed, i.e. cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a -> b -> c, a -> d, e independent input feeding d
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Toy {
        A,
        E,
        B,
        C,
        D,
    }

    impl NodeSet for Toy {
        const ALL: &'static [Self] = &[Toy::A, Toy::E, Toy::B, Toy::C, Toy::D];

        fn index(self) -> usize {
            self as usize
        }

        fn deps(self) -> &'static [Self] {
            match self {
                Toy::A | Toy::E => &[],
                Toy::B => &[Toy::A],
                Toy::C => &[Toy::B],
                Toy::D => &[Toy::A, Toy::E],
            }
        }
    }

    fn eval(inputs: (i64, i64)) -> impl FnMut(Toy, &Resolved<'_, Toy, i64>) -> i64 {
        move |node, r| match node {
            Toy::B => inputs.0 + 1,
            Toy::C => r.get(Toy::B).copied().unwrap_or_default() * 2,
            Toy::D => inputs.0 + inputs.1,
            Toy::A | Toy::E => unreachable!(),
        }
    }

    #[test]
    fn first_resolve_computes_everything() {
        let mut memo: Memo<Toy, i64> = Memo::new();
        assert_eq!(memo.resolve(eval((1, 10))), 3);
        assert_eq!(memo.get(Toy::B), Some(&2));
        assert_eq!(memo.get(Toy::C), Some(&4));
        assert_eq!(memo.get(Toy::D), Some(&11));
        assert_eq!(memo.get(Toy::A), None);
    }

    #[test]
    fn unchanged_inputs_recompute_nothing() {
        let mut memo: Memo<Toy, i64> = Memo::new();
        memo.resolve(eval((1, 10)));
        let before = memo.total_evaluations();
        assert_eq!(memo.resolve(eval((1, 10))), 0);
        assert_eq!(memo.total_evaluations(), before);
    }

    #[test]
    fn touching_an_input_recomputes_only_dependents() {
        let mut memo: Memo<Toy, i64> = Memo::new();
        memo.resolve(eval((1, 10)));

        memo.touch(Toy::E);
        assert_eq!(memo.resolve(eval((1, 20))), 1);
        assert_eq!(memo.get(Toy::D), Some(&21));
        assert_eq!(memo.evaluations(Toy::B), 1);
        assert_eq!(memo.evaluations(Toy::C), 1);
        assert_eq!(memo.evaluations(Toy::D), 2);

        memo.touch(Toy::A);
        assert_eq!(memo.resolve(eval((5, 20))), 3);
        assert_eq!(memo.get(Toy::C), Some(&12));
    }

    #[test]
    fn query_cache_evicts_old_generation() {
        let cache: QueryCache<&str, i64> = QueryCache::new();
        assert_eq!(cache.get_or_compute(1, "x", || 7), 7);
        assert_eq!(cache.get_or_compute(1, "x", || 99), 7);
        assert_eq!(cache.misses(), 1);

        assert_eq!(cache.get_or_compute(2, "x", || 8), 8);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.misses(), 2);
    }
}
