//! The gate-application interface the engine drives.
//!
//! The engine never owns amplitudes. It emits single-control, single-target
//! gates against any type implementing [`GateRegister`]: a dense
//! statevector, a distributed simulator, or a recorder that only logs the
//! calls.

use num_traits::Float;

use crate::unitary::Unitary2x2;

/// A qubit register that can apply one- and two-qubit gates.
pub trait GateRegister<T: Float = f64> {
    /// Apply `gate` to `target` when `control` is |1⟩.
    fn apply_controlled_unitary(&mut self, control: usize, target: usize, gate: &Unitary2x2<T>);

    /// Apply `gate` to `qubit` unconditionally.
    fn apply_single_qubit_unitary(&mut self, qubit: usize, gate: &Unitary2x2<T>);

    /// Number of qubits in the register.
    fn num_qubits(&self) -> usize;

    /// Apply Pauli-X to `qubit`.
    fn apply_pauli_x(&mut self, qubit: usize) {
        self.apply_single_qubit_unitary(qubit, &Unitary2x2::x());
    }

    /// Apply a CNOT.
    fn apply_cx(&mut self, control: usize, target: usize) {
        self.apply_controlled_unitary(control, target, &Unitary2x2::x());
    }

    /// Exchange two qubits with three CNOTs. A no-op when `a == b`.
    fn swap_qubits(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.apply_cx(a, b);
        self.apply_cx(b, a);
        self.apply_cx(a, b);
    }
}

impl<T: Float, R: GateRegister<T> + ?Sized> GateRegister<T> for &mut R {
    fn apply_controlled_unitary(&mut self, control: usize, target: usize, gate: &Unitary2x2<T>) {
        (**self).apply_controlled_unitary(control, target, gate);
    }

    fn apply_single_qubit_unitary(&mut self, qubit: usize, gate: &Unitary2x2<T>) {
        (**self).apply_single_qubit_unitary(qubit, gate);
    }

    fn num_qubits(&self) -> usize {
        (**self).num_qubits()
    }
}
