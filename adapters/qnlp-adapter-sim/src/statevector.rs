//! Dense statevector register.

use num_complex::Complex64;
use qnlp_ncu::{GateRegister, Unitary2x2};

/// A statevector over `num_qubits` qubits, little-endian: qubit `q` is bit
/// `q` of the basis index.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        Self::from_basis_state(num_qubits, 0)
    }

    /// Create the computational basis state `|index⟩`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in `num_qubits` bits.
    pub fn from_basis_state(num_qubits: usize, index: usize) -> Self {
        let size = 1 << num_qubits;
        assert!(
            index < size,
            "basis index {index} out of range for {num_qubits} qubits"
        );
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// All amplitudes, indexed by basis state.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Amplitude of basis state `index`.
    pub fn amplitude(&self, index: usize) -> Complex64 {
        self.amplitudes[index]
    }

    /// Probability of every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Probability that `qubit` reads |1⟩.
    pub fn probability_of_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    /// Squared norm of the state.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum()
    }

    /// `⟨self|other⟩`.
    ///
    /// # Panics
    ///
    /// Panics if the registers differ in width.
    pub fn inner_product(&self, other: &Self) -> Complex64 {
        assert_eq!(self.num_qubits, other.num_qubits, "register widths differ");
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// `|⟨self|other⟩|²`.
    pub fn fidelity(&self, other: &Self) -> f64 {
        self.inner_product(other).norm_sqr()
    }

    /// Largest elementwise amplitude difference to `other`.
    pub fn max_distance(&self, other: &Self) -> f64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Convert a basis index to a bitstring, qubit 0 first.
    pub fn basis_bitstring(&self, index: usize) -> String {
        format!("{:0width$b}", index, width = self.num_qubits)
            .chars()
            .rev()
            .collect()
    }

    fn check_qubit(&self, qubit: usize) {
        assert!(
            qubit < self.num_qubits,
            "qubit {qubit} out of range for a {}-qubit statevector",
            self.num_qubits
        );
    }

    fn apply_single(&mut self, qubit: usize, gate: &Unitary2x2) {
        self.check_qubit(qubit);
        let mask = 1 << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                let j = i | mask;
                let (a, b) = gate.apply_to(self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = a;
                self.amplitudes[j] = b;
            }
        }
    }

    fn apply_controlled(&mut self, control: usize, target: usize, gate: &Unitary2x2) {
        self.check_qubit(control);
        self.check_qubit(target);
        assert_ne!(control, target, "control and target must differ");
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..self.amplitudes.len() {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let (a, b) = gate.apply_to(self.amplitudes[i], self.amplitudes[j]);
                self.amplitudes[i] = a;
                self.amplitudes[j] = b;
            }
        }
    }
}

impl GateRegister<f64> for Statevector {
    fn apply_controlled_unitary(&mut self, control: usize, target: usize, gate: &Unitary2x2) {
        self.apply_controlled(control, target, gate);
    }

    fn apply_single_qubit_unitary(&mut self, qubit: usize, gate: &Unitary2x2) {
        self.apply_single(qubit, gate);
    }

    fn num_qubits(&self) -> usize {
        self.num_qubits
    }
}
