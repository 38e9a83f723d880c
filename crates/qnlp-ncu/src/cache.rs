//! Memoised chains of iterated matrix square roots.
//!
//! For every label the cache holds a chain indexed by recursion depth:
//! entry 0 is the seed gate, entry `d` is the square root of entry `d - 1`.
//! Each entry stores the forward matrix and its adjoint side by side, so
//! callers never encode "adjoint" into the sign of the depth.
//!
//! Chains only ever grow at the end. An entry, once written, is not
//! modified until the chain is reseeded or the cache is cleared.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use num_traits::Float;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{NcuError, NcuResult};
use crate::unitary::{DEFAULT_TOLERANCE, Unitary2x2};

/// Label of the pre-seeded Pauli-X chain used for control chaining.
pub const PAULI_X: &str = "X";

/// One depth of a gate chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateChainEntry<T = f64> {
    /// `sqrt^depth(seed)`.
    pub forward: Unitary2x2<T>,
    /// Adjoint of `forward`.
    pub adjoint: Unitary2x2<T>,
}

impl<T: Float> GateChainEntry<T> {
    fn new(forward: Unitary2x2<T>) -> Self {
        Self {
            adjoint: forward.adjoint(),
            forward,
        }
    }
}

/// Cache of square-root chains keyed by gate label.
#[derive(Debug, Clone)]
pub struct GateCache<T = f64> {
    chains: FxHashMap<String, Vec<GateChainEntry<T>>>,
    degeneracy_tolerance: f64,
    seed_tolerance: f64,
    sqrt_evaluations: usize,
}

impl<T: Float> GateCache<T> {
    /// Create a cache pre-seeded with the Pauli-X chain at depth 0.
    pub fn new() -> Self {
        let mut cache = Self::empty();
        cache.seed(PAULI_X, Unitary2x2::x());
        cache
    }

    /// Create a cache without any chains.
    pub fn empty() -> Self {
        Self {
            chains: FxHashMap::default(),
            degeneracy_tolerance: DEFAULT_TOLERANCE,
            seed_tolerance: DEFAULT_TOLERANCE,
            sqrt_evaluations: 0,
        }
    }

    /// Set the smallest `|t|` accepted when forming a square root.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.degeneracy_tolerance = tolerance;
        self
    }

    /// Set how close a seed must be to a chain's root for
    /// [`init_cache`](Self::init_cache) to keep the chain.
    #[must_use]
    pub fn with_seed_tolerance(mut self, tolerance: f64) -> Self {
        self.seed_tolerance = tolerance;
        self
    }

    /// Ensure `label` holds a chain for `seed` covering depths `0..=depth`.
    ///
    /// A chain already saturated to `depth` for the same seed is left
    /// untouched. A shorter chain is extended in place. A chain seeded with
    /// a different gate is discarded and rebuilt from `seed`.
    pub fn init_cache(&mut self, seed: Unitary2x2<T>, label: &str, depth: usize) -> NcuResult<()> {
        self.init_cache_within(seed, label, depth, self.seed_tolerance)
    }

    /// [`init_cache`](Self::init_cache), with the seed comparison done at
    /// `seed_tolerance` instead of the cache's own setting.
    pub fn init_cache_within(
        &mut self,
        seed: Unitary2x2<T>,
        label: &str,
        depth: usize,
        seed_tolerance: f64,
    ) -> NcuResult<()> {
        let reseed = match self.chains.get(label).and_then(|chain| chain.first()) {
            Some(root) => !root.forward.approx_eq(&seed, seed_tolerance),
            None => true,
        };
        if reseed {
            if self.chains.contains_key(label) {
                debug!(label, "reseeding gate chain with a different gate");
            }
            self.seed(label, seed);
        }
        self.extend(label, depth)
    }

    /// Extend an existing chain so it covers depths `0..=depth`.
    ///
    /// Returns [`NcuError::UnknownGate`](crate::NcuError::UnknownGate) when
    /// `label` was never seeded. On a degenerate square root the entries
    /// computed so far are kept and the error is returned.
    pub fn extend(&mut self, label: &str, depth: usize) -> NcuResult<()> {
        let tolerance = self.degeneracy_tolerance;
        let chain = self
            .chains
            .get_mut(label)
            .ok_or_else(|| NcuError::UnknownGate(label.to_string()))?;

        let cached = chain.len() - 1;
        if cached >= depth {
            return Ok(());
        }

        debug!(label, from = cached, to = depth, "extending gate chain");
        while chain.len() <= depth {
            let previous = chain[chain.len() - 1].forward;
            let root = previous.try_sqrt(tolerance)?;
            self.sqrt_evaluations += 1;
            chain.push(GateChainEntry::new(root));
        }
        Ok(())
    }

    /// The `(forward, adjoint)` record at `depth`, if populated.
    pub fn get(&self, label: &str, depth: usize) -> Option<&GateChainEntry<T>> {
        self.chains.get(label).and_then(|chain| chain.get(depth))
    }

    /// The forward matrix at `depth`, if populated.
    pub fn forward(&self, label: &str, depth: usize) -> Option<Unitary2x2<T>> {
        self.get(label, depth).map(|entry| entry.forward)
    }

    /// The adjoint matrix at `depth`, if populated.
    pub fn adjoint(&self, label: &str, depth: usize) -> Option<Unitary2x2<T>> {
        self.get(label, depth).map(|entry| entry.adjoint)
    }

    /// The whole chain cached for `label`.
    pub fn chain(&self, label: &str) -> Option<&[GateChainEntry<T>]> {
        self.chains.get(label).map(Vec::as_slice)
    }

    /// Deepest populated depth for `label`.
    pub fn depth(&self, label: &str) -> Option<usize> {
        self.chains.get(label).map(|chain| chain.len() - 1)
    }

    /// Whether a chain exists for `label`.
    pub fn contains(&self, label: &str) -> bool {
        self.chains.contains_key(label)
    }

    /// Labels currently cached, in no particular order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Number of matrix square roots computed since creation or the last clear.
    pub fn sqrt_evaluations(&self) -> usize {
        self.sqrt_evaluations
    }

    /// Drop every chain, including the Pauli-X one, and reset the counter.
    pub fn clear(&mut self) {
        self.chains.clear();
        self.sqrt_evaluations = 0;
    }

    fn seed(&mut self, label: &str, seed: Unitary2x2<T>) {
        self.chains
            .insert(label.to_string(), vec![GateChainEntry::new(seed)]);
    }
}

impl<T: Float> Default for GateCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`GateCache`] shared between engines, possibly on different threads.
///
/// Growth takes the write lock. Lookups of populated depths only take the
/// read lock, which is sound because entries are append-only.
#[derive(Debug, Clone)]
pub struct SharedGateCache<T = f64> {
    inner: Arc<RwLock<GateCache<T>>>,
}

impl<T: Float> SharedGateCache<T> {
    /// Wrap an existing cache.
    pub fn new(cache: GateCache<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(cache)),
        }
    }

    /// Acquire the read lock, recovering from poisoning.
    pub fn read(&self) -> RwLockReadGuard<'_, GateCache<T>> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Acquire the write lock, recovering from poisoning.
    pub fn write(&self) -> RwLockWriteGuard<'_, GateCache<T>> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// See [`GateCache::init_cache`].
    pub fn init_cache(&self, seed: Unitary2x2<T>, label: &str, depth: usize) -> NcuResult<()> {
        {
            let cache = self.read();
            let saturated = cache.get(label, depth).is_some()
                && cache
                    .forward(label, 0)
                    .is_some_and(|root| root.approx_eq(&seed, cache.seed_tolerance));
            if saturated {
                return Ok(());
            }
        }
        self.write().init_cache(seed, label, depth)
    }

    /// See [`GateCache::sqrt_evaluations`].
    pub fn sqrt_evaluations(&self) -> usize {
        self.read().sqrt_evaluations()
    }
}

impl<T: Float> Default for SharedGateCache<T> {
    fn default() -> Self {
        Self::new(GateCache::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_new_preseeds_pauli_x() {
        let cache = GateCache::<f64>::new();
        assert_eq!(cache.depth(PAULI_X), Some(0));
        assert_eq!(cache.forward(PAULI_X, 0), Some(Unitary2x2::x()));
        assert_eq!(cache.sqrt_evaluations(), 0);
    }

    #[test]
    fn test_init_builds_iterated_roots() {
        let mut cache = GateCache::<f64>::new();
        cache.init_cache(Unitary2x2::z(), "Z", 3).unwrap();

        assert_eq!(cache.depth("Z"), Some(3));
        assert!(cache.forward("Z", 1).unwrap().approx_eq(&Unitary2x2::s(), TOL));
        assert!(cache.forward("Z", 2).unwrap().approx_eq(&Unitary2x2::t(), TOL));
        for depth in 0..=3 {
            let entry = cache.get("Z", depth).unwrap();
            assert_eq!(entry.adjoint, entry.forward.adjoint());
        }
        assert_eq!(cache.sqrt_evaluations(), 3);
    }

    #[test]
    fn test_init_is_idempotent_when_saturated() {
        let mut cache = GateCache::<f64>::new();
        cache.init_cache(Unitary2x2::h(), "H", 4).unwrap();
        let before = cache.chain("H").unwrap().to_vec();

        cache.init_cache(Unitary2x2::h(), "H", 2).unwrap();
        cache.init_cache(Unitary2x2::h(), "H", 4).unwrap();

        assert_eq!(cache.chain("H").unwrap(), before.as_slice());
        assert_eq!(cache.sqrt_evaluations(), 4);
    }

    #[test]
    fn test_extension_keeps_existing_entries() {
        let mut cache = GateCache::<f64>::new();
        cache.init_cache(Unitary2x2::h(), "H", 2).unwrap();
        let shallow = cache.chain("H").unwrap().to_vec();

        cache.init_cache(Unitary2x2::h(), "H", 5).unwrap();

        assert_eq!(&cache.chain("H").unwrap()[..3], shallow.as_slice());
        assert_eq!(cache.depth("H"), Some(5));
        assert_eq!(cache.sqrt_evaluations(), 5);
    }

    #[test]
    fn test_different_seed_rebuilds_chain() {
        let mut cache = GateCache::<f64>::new();
        cache.init_cache(Unitary2x2::z(), "U", 3).unwrap();
        cache.init_cache(Unitary2x2::h(), "U", 1).unwrap();

        assert_eq!(cache.depth("U"), Some(1));
        assert_eq!(cache.forward("U", 0), Some(Unitary2x2::h()));
    }

    #[test]
    fn test_degeneracy_tolerance_does_not_merge_seeds() {
        let mut cache = GateCache::<f64>::new().with_tolerance(1e-3);
        cache.init_cache(Unitary2x2::p(0.0), "U", 2).unwrap();
        cache.init_cache(Unitary2x2::p(1e-4), "U", 2).unwrap();

        assert_eq!(cache.forward("U", 0), Some(Unitary2x2::p(1e-4)));
        assert!(cache.forward("U", 1).unwrap().approx_eq(&Unitary2x2::p(5e-5), TOL));
    }

    #[test]
    fn test_seed_tolerance_override() {
        let mut cache = GateCache::<f64>::new().with_seed_tolerance(1e-3);
        cache.init_cache(Unitary2x2::p(0.0), "U", 1).unwrap();

        cache.init_cache(Unitary2x2::p(1e-4), "U", 1).unwrap();
        assert_eq!(cache.forward("U", 0), Some(Unitary2x2::p(0.0)));

        cache
            .init_cache_within(Unitary2x2::p(1e-4), "U", 1, TOL)
            .unwrap();
        assert_eq!(cache.forward("U", 0), Some(Unitary2x2::p(1e-4)));
    }

    #[test]
    fn test_miss_at_unpopulated_depth() {
        let cache = GateCache::<f64>::new();
        assert!(cache.get(PAULI_X, 1).is_none());
        assert!(cache.get("missing", 0).is_none());
    }

    #[test]
    fn test_extend_unknown_label() {
        let mut cache = GateCache::<f64>::new();
        assert!(matches!(cache.extend("nope", 2), Err(NcuError::UnknownGate(l)) if l == "nope"));
    }

    #[test]
    fn test_degenerate_root_keeps_prefix() {
        let mut cache = GateCache::<f64>::new();
        let minus_i = Unitary2x2::identity().scale(Complex64::new(-1.0, 0.0));
        let err = cache.init_cache(minus_i, "-I", 2).unwrap_err();

        assert!(matches!(err, NcuError::NumericalDegeneracy { .. }));
        assert_eq!(cache.depth("-I"), Some(0));
        assert_eq!(cache.sqrt_evaluations(), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut cache = GateCache::<f64>::new();
        cache.init_cache(Unitary2x2::h(), "H", 2).unwrap();
        cache.clear();

        assert!(!cache.contains(PAULI_X));
        assert!(!cache.contains("H"));
        assert_eq!(cache.labels().count(), 0);
        assert_eq!(cache.sqrt_evaluations(), 0);
    }

    #[test]
    fn test_shared_cache_across_threads() {
        let shared = SharedGateCache::<f64>::default();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let cache = shared.clone();
                std::thread::spawn(move || cache.init_cache(Unitary2x2::x(), PAULI_X, 2 + i))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(shared.read().depth(PAULI_X), Some(5));
        assert_eq!(shared.sqrt_evaluations(), 5);
    }
}
