//! Local statevector register for `qnlp-ncu`.
//!
//! A dense, single-threaded statevector implementing
//! [`GateRegister`](qnlp_ncu::GateRegister), used to check decomposed
//! circuits against their intended action. Exact, and limited to roughly
//! 20-25 qubits.
//!
//! | Qubits | Memory |
//! |--------|--------|
//! | 10 | ~16 KB |
//! | 15 | ~512 KB |
//! | 20 | ~16 MB |
//! | 25 | ~512 MB |
//!
//! # Example
//!
//! ```rust
//! use qnlp_adapter_sim::Statevector;
//! use qnlp_ncu::{GateRegister, NcuEngine, Unitary2x2};
//!
//! let mut engine = NcuEngine::<f64>::new();
//! let mut state = Statevector::new(5);
//! for q in 0..4 {
//!     state.apply_pauli_x(q);
//! }
//! engine
//!     .apply_n_qubit_control(&mut state, 0, 3, 4, &Unitary2x2::x(), true, 0)
//!     .unwrap();
//!
//! assert!((state.probability_of_one(4) - 1.0).abs() < 1e-12);
//! ```

mod statevector;

pub use statevector::Statevector;
