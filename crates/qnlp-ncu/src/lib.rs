//! `qnlp-ncu` — n-qubit-controlled unitary decomposition.
//!
//! Applies a single-qubit gate `U` to a target qubit conditioned on a
//! contiguous block of control qubits, using only singly-controlled gates.
//! Each level of the decomposition peels one control off the block and
//! uses the next iterated square root of `U`; the roots and their adjoints
//! are memoised in a [`GateCache`].
//!
//! The engine drives any register implementing [`GateRegister`]; it never
//! stores amplitudes itself.
//!
//! # Quick start
//!
//! ```rust
//! use qnlp_ncu::{NcuEngine, RecordingRegister, Unitary2x2, emitted_gate_count};
//!
//! // Toffoli with three controls (qubits 0..=2) on target 3.
//! let mut engine = NcuEngine::<f64>::new();
//! let mut register = RecordingRegister::new(4);
//! engine
//!     .apply_n_qubit_control(&mut register, 0, 2, 3, &Unitary2x2::x(), true, 0)
//!     .unwrap();
//!
//! assert_eq!(register.trace().len(), emitted_gate_count(3));
//! ```
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`unitary`] | `Unitary2x2`, closed-form square root, adjoint |
//! | [`cache`] | `GateCache`, `SharedGateCache` |
//! | [`control`] | `ControlRange` |
//! | [`register`] | `GateRegister` trait |
//! | [`ncu`] | `NcuEngine` |
//! | [`trace`] | gate observers and CSV / JSON export |
//! | [`config`] | `NcuConfig` |

pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod ncu;
pub mod register;
pub mod trace;
pub mod unitary;

pub use cache::{GateCache, GateChainEntry, PAULI_X, SharedGateCache};
pub use config::NcuConfig;
pub use control::ControlRange;
pub use error::{NcuError, NcuResult};
pub use ncu::{NcuEngine, TARGET_GATE, emitted_gate_count};
pub use register::GateRegister;
pub use trace::{
    CountingSink, CsvTraceWriter, GateEvent, GateTrace, GateTraceSink, RecordingRegister,
    TracedRegister,
};
pub use unitary::{Complex64, DEFAULT_TOLERANCE, Unitary2x2, adjoint_matrix, matrix_sqrt};
