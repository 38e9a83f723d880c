//! N-qubit-controlled unitary decomposition.
//!
//! A gate `U` controlled on every qubit of a contiguous block `[c0, cn]` is
//! rewritten into singly-controlled gates. With `V = sqrt(U)`:
//!
//! ```text
//!   C^n(U) = C_{cn}(V) · C^{n-1}(X → cn) · C_{cn}(V†) · C^{n-1}(X → cn) · C^{n-1}(V)
//! ```
//!
//! where the two `C^{n-1}(X)` cascades compute and uncompute the AND of the
//! first `n - 1` controls into `cn`, and the final `C^{n-1}(V)` recurses on
//! the next square root. One control is peeled off per level, and the
//! whole decomposition emits `2·3^(n-1) - 1` controlled gates (see
//! [`emitted_gate_count`]).
//!
//! Square roots and adjoints come from a [`GateCache`], indexed by how many
//! times the seed gate has been rooted. All chains a call needs are grown,
//! checked and copied out under a single lock before the first gate is
//! emitted, so a degenerate root never leaves a register half-updated and
//! engines sharing a cache never see each other's half-finished reseeds.
//!
//! Recursion depth equals the number of controls, which is bounded in
//! practice by the register width.

use num_traits::Float;
use tracing::{debug, instrument, trace};

use crate::cache::{GateCache, GateChainEntry, PAULI_X, SharedGateCache};
use crate::config::NcuConfig;
use crate::control::ControlRange;
use crate::error::{NcuError, NcuResult};
use crate::register::GateRegister;
use crate::unitary::Unitary2x2;

/// Cache label of the arbitrary gate passed to
/// [`NcuEngine::apply_n_qubit_control`] with `is_pauli_x == false`.
///
/// Every unnamed gate shares this one chain. A call with a different gate
/// reseeds it, so alternating gates recompute their roots each time, and a
/// chain registered under this label is replaced by the next unnamed call.
/// Gates applied repeatedly should be registered under their own label
/// with [`NcuEngine::register_gate`] and applied with
/// [`NcuEngine::apply_named`].
pub const TARGET_GATE: &str = "U";

/// Number of controlled-unitary calls emitted for `c_ops` control qubits.
pub fn emitted_gate_count(c_ops: usize) -> usize {
    match c_ops {
        0 => 0,
        c => {
            let exp = u32::try_from(c - 1).unwrap_or(u32::MAX);
            3usize.saturating_pow(exp).saturating_mul(2) - 1
        }
    }
}

#[derive(Debug, Clone)]
enum CacheHandle<T> {
    Owned(GateCache<T>),
    Shared(SharedGateCache<T>),
}

/// Chains copied out of the cache for one decomposition.
struct Chains<T> {
    target: Vec<GateChainEntry<T>>,
    x: Vec<GateChainEntry<T>>,
}

/// What a decomposition needs from the cache before emitting.
struct ChainPlan<'a, T> {
    label: &'a str,
    seed: Option<Unitary2x2<T>>,
    deepest: usize,
    x_depth: Option<usize>,
}

impl<T: Float> ChainPlan<'_, T> {
    fn is_ready(&self, cache: &GateCache<T>, tolerance: f64) -> bool {
        let seeded = match &self.seed {
            Some(seed) => cache
                .forward(self.label, 0)
                .is_some_and(|root| root.approx_eq(seed, tolerance)),
            None => cache.contains(self.label),
        };
        let deep_enough = cache.depth(self.label).is_some_and(|d| d >= self.deepest);
        let x_ready = self.x_depth.is_none_or(|want| {
            cache.depth(PAULI_X).is_some_and(|d| d >= want)
                && cache.forward(PAULI_X, 0) == Some(Unitary2x2::x())
        });
        seeded && deep_enough && x_ready
    }

    fn populate(&self, cache: &mut GateCache<T>, tolerance: f64) -> NcuResult<()> {
        match self.seed {
            Some(seed) => cache.init_cache_within(seed, self.label, self.deepest, tolerance)?,
            None => cache.extend(self.label, self.deepest)?,
        }
        if let Some(depth) = self.x_depth {
            cache.init_cache_within(Unitary2x2::x(), PAULI_X, depth, tolerance)?;
        }
        Ok(())
    }

    fn snapshot(&self, cache: &GateCache<T>) -> Chains<T> {
        let copy = |label: &str| cache.chain(label).unwrap_or_default().to_vec();
        Chains {
            target: copy(self.label),
            x: if self.x_depth.is_some() {
                copy(PAULI_X)
            } else {
                Vec::new()
            },
        }
    }
}

/// Decomposes multi-controlled single-qubit gates onto a [`GateRegister`].
#[derive(Debug, Clone)]
pub struct NcuEngine<T = f64> {
    config: NcuConfig,
    cache: CacheHandle<T>,
}

impl<T: Float> NcuEngine<T> {
    /// Create an engine with default configuration and its own cache.
    pub fn new() -> Self {
        Self::with_config(NcuConfig::default())
    }

    /// Create an engine with its own cache.
    pub fn with_config(config: NcuConfig) -> Self {
        let cache = if config.preseed_pauli_x {
            GateCache::new()
        } else {
            GateCache::empty()
        }
        .with_tolerance(config.degeneracy_tolerance);
        Self {
            config,
            cache: CacheHandle::Owned(cache),
        }
    }

    /// Create an engine backed by a cache shared with other engines.
    ///
    /// Square roots are formed with the shared cache's own degeneracy
    /// tolerance; `config.degeneracy_tolerance` and `config.preseed_pauli_x`
    /// only apply to caches the engine creates itself. Gate matching and
    /// reseeding use `config.match_tolerance`.
    pub fn with_shared_cache(config: NcuConfig, cache: SharedGateCache<T>) -> Self {
        Self {
            config,
            cache: CacheHandle::Shared(cache),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &NcuConfig {
        &self.config
    }

    /// Run `f` against the cache, taking the read lock when shared.
    pub fn with_cache<R>(&self, f: impl FnOnce(&GateCache<T>) -> R) -> R {
        match &self.cache {
            CacheHandle::Owned(cache) => f(cache),
            CacheHandle::Shared(shared) => f(&*shared.read()),
        }
    }

    /// Number of square roots the backing cache has computed.
    pub fn sqrt_evaluations(&self) -> usize {
        self.with_cache(GateCache::sqrt_evaluations)
    }

    /// Seed a named chain so it can be used with [`apply_named`](Self::apply_named).
    pub fn register_gate(&mut self, label: &str, gate: Unitary2x2<T>, depth: usize) -> NcuResult<()> {
        match &mut self.cache {
            CacheHandle::Owned(cache) => cache.init_cache(gate, label, depth),
            CacheHandle::Shared(shared) => shared.init_cache(gate, label, depth),
        }
    }

    /// Drop every cached chain.
    pub fn clear_cache(&mut self) {
        match &mut self.cache {
            CacheHandle::Owned(cache) => cache.clear(),
            CacheHandle::Shared(shared) => shared.write().clear(),
        }
    }

    /// Apply `gate` to `target`, controlled on every qubit of
    /// `[control_start, control_end]`.
    ///
    /// With `is_pauli_x` the pre-seeded Pauli-X chain is used and `gate`
    /// must be `sqrt^depth(X)`. Otherwise the chain of `gate` itself is
    /// used: at `depth == 0` it is (re)seeded from `gate`, at deeper levels
    /// `gate` must equal the entry already cached at `depth`. Callers start
    /// at depth 0.
    ///
    /// # Errors
    ///
    /// [`NcuError::NumericalDegeneracy`] when a required square root cannot
    /// be formed. Nothing is emitted in that case.
    ///
    /// # Panics
    ///
    /// On precondition violations: an inverted range, qubits outside the
    /// register, a target inside the control block, a gate that does not
    /// match its cached chain, or a chain deeper than `max_cache_depth`.
    #[allow(clippy::too_many_arguments)]
    #[instrument(level = "debug", skip(self, register, gate))]
    pub fn apply_n_qubit_control<R: GateRegister<T> + ?Sized>(
        &mut self,
        register: &mut R,
        control_start: usize,
        control_end: usize,
        target: usize,
        gate: &Unitary2x2<T>,
        is_pauli_x: bool,
        depth: usize,
    ) -> NcuResult<()> {
        let controls = ControlRange::new(control_start, control_end);
        check_operands(register.num_qubits(), controls, target);

        if controls.len() < 2 {
            register.apply_controlled_unitary(controls.end(), target, gate);
            return Ok(());
        }

        let (label, seed) = match (is_pauli_x, depth) {
            (true, _) => (PAULI_X, Some(Unitary2x2::x())),
            (false, 0) => (TARGET_GATE, Some(*gate)),
            (false, _) => {
                assert!(
                    self.with_cache(|cache| cache.contains(TARGET_GATE)),
                    "no cached chain to resume at depth {depth}"
                );
                (TARGET_GATE, None)
            }
        };

        let plan = self.plan(label, seed, controls, depth);
        let chains = self.prepare(&plan)?;

        let matches = chains
            .target
            .get(depth)
            .is_some_and(|cached| cached.forward.approx_eq(gate, self.config.match_tolerance));
        assert!(
            matches,
            "gate does not match the '{label}' chain entry at depth {depth}"
        );

        emit(register, controls, target, &chains.target, &chains.x, depth);
        Ok(())
    }

    /// Apply the chain cached under `label` (from depth 0) to `target`,
    /// controlled on `controls`.
    ///
    /// # Errors
    ///
    /// [`NcuError::UnknownGate`] when `label` was never registered, or
    /// [`NcuError::NumericalDegeneracy`] while growing its chain.
    #[instrument(level = "debug", skip(self, register))]
    pub fn apply_named<R: GateRegister<T> + ?Sized>(
        &mut self,
        register: &mut R,
        controls: ControlRange,
        target: usize,
        label: &str,
    ) -> NcuResult<()> {
        check_operands(register.num_qubits(), controls, target);

        let plan = self.plan(label, None, controls, 0);
        let chains = self.prepare(&plan)?;
        emit(register, controls, target, &chains.target, &chains.x, 0);
        Ok(())
    }

    /// Apply `gate` with arbitrary, possibly scattered, control qubits.
    ///
    /// The decomposition itself only accepts a contiguous block. Scattered
    /// controls are swapped into the block directly below the target (or
    /// directly above it when there is no room below), decomposed there and
    /// swapped back. Qubits displaced by the swaps are restored afterwards.
    ///
    /// # Errors
    ///
    /// [`NcuError::EmptyControls`], [`NcuError::InsufficientQubits`] when no
    /// block fits beside the target, or [`NcuError::NumericalDegeneracy`].
    /// The register is untouched when an error is returned.
    ///
    /// # Panics
    ///
    /// When a qubit is outside the register or the target is also a control.
    pub fn apply_scattered<R: GateRegister<T> + ?Sized>(
        &mut self,
        register: &mut R,
        controls: &[usize],
        target: usize,
        gate: &Unitary2x2<T>,
    ) -> NcuResult<()> {
        let mut sorted = controls.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let num_qubits = register.num_qubits();
        assert!(
            !sorted.contains(&target),
            "target {target} is also listed as a control"
        );
        assert!(
            target < num_qubits && sorted.last().is_none_or(|&q| q < num_qubits),
            "qubit index out of range for a {num_qubits}-qubit register"
        );

        if let Ok(range) = ControlRange::from_indices(&sorted) {
            return self.apply_n_qubit_control(
                register,
                range.start(),
                range.end(),
                target,
                gate,
                false,
                0,
            );
        }
        if sorted.is_empty() {
            return Err(NcuError::EmptyControls);
        }

        let k = sorted.len();
        let block = if target >= k {
            ControlRange::new(target - k, target - 1)
        } else if target + k < num_qubits {
            ControlRange::new(target + 1, target + k)
        } else {
            return Err(NcuError::InsufficientQubits {
                controls: k,
                target,
                num_qubits,
            });
        };

        let outside = sorted.iter().copied().filter(|&q| !block.contains(q));
        let free = block.iter().filter(|q| sorted.binary_search(q).is_err());
        let swaps: Vec<(usize, usize)> = outside.zip(free).collect();
        debug!(?swaps, %block, "permuting scattered controls into a block");

        let plan = self.plan(TARGET_GATE, Some(*gate), block, 0);
        let chains = self.prepare(&plan)?;

        for &(a, b) in &swaps {
            register.swap_qubits(a, b);
        }
        emit(register, block, target, &chains.target, &chains.x, 0);
        for &(a, b) in swaps.iter().rev() {
            register.swap_qubits(a, b);
        }
        Ok(())
    }

    fn plan<'a>(
        &self,
        label: &'a str,
        seed: Option<Unitary2x2<T>>,
        controls: ControlRange,
        depth: usize,
    ) -> ChainPlan<'a, T> {
        let deepest = depth + controls.len() - 1;
        assert!(
            deepest <= self.config.max_cache_depth,
            "decomposition needs a chain of depth {deepest}, above max_cache_depth {}",
            self.config.max_cache_depth
        );
        ChainPlan {
            label,
            seed,
            deepest,
            x_depth: (controls.len() >= 2).then(|| controls.len() - 2),
        }
    }

    /// Grow the chains `plan` needs and copy them out under one lock.
    fn prepare(&mut self, plan: &ChainPlan<'_, T>) -> NcuResult<Chains<T>> {
        let tolerance = self.config.match_tolerance;
        match &mut self.cache {
            CacheHandle::Owned(cache) => {
                plan.populate(cache, tolerance)?;
                Ok(plan.snapshot(cache))
            }
            CacheHandle::Shared(shared) => {
                {
                    let cache = shared.read();
                    if plan.is_ready(&cache, tolerance) {
                        return Ok(plan.snapshot(&cache));
                    }
                }
                let mut cache = shared.write();
                plan.populate(&mut cache, tolerance)?;
                Ok(plan.snapshot(&cache))
            }
        }
    }
}

impl<T: Float> Default for NcuEngine<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_operands(num_qubits: usize, controls: ControlRange, target: usize) {
    assert!(
        controls.end() < num_qubits,
        "control qubit {} out of range for a {num_qubits}-qubit register",
        controls.end()
    );
    assert!(
        target < num_qubits,
        "target qubit {target} out of range for a {num_qubits}-qubit register"
    );
    assert!(
        !controls.contains(target),
        "target qubit {target} lies inside control range {controls}"
    );
}

/// Recursive emission over populated chains.
///
/// `chain[depth]` is the gate being controlled at this level and
/// `chain[depth + 1]` its square root. `x_chain` drives the AND cascades.
fn emit<T, R>(
    register: &mut R,
    controls: ControlRange,
    target: usize,
    chain: &[GateChainEntry<T>],
    x_chain: &[GateChainEntry<T>],
    depth: usize,
) where
    T: Float,
    R: GateRegister<T> + ?Sized,
{
    let last = controls.end();
    let Some(rest) = controls.without_last() else {
        register.apply_controlled_unitary(last, target, &chain[depth].forward);
        return;
    };

    let local_depth = depth + 1;
    let root = &chain[local_depth];
    trace!(%controls, target, depth = local_depth, "decomposing level");

    register.apply_controlled_unitary(last, target, &root.forward);
    emit(register, rest, last, x_chain, x_chain, 0);
    register.apply_controlled_unitary(last, target, &root.adjoint);
    emit(register, rest, last, x_chain, x_chain, 0);
    emit(register, rest, target, chain, x_chain, local_depth);
}
