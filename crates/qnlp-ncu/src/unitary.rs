//! 2x2 unitary matrices and the square-root / adjoint primitives the
//! decomposition is built on.

use std::ops::Mul;

use num_complex::Complex;
use num_traits::Float;
use serde::{Deserialize, Serialize};

use crate::error::{NcuError, NcuResult};

/// Default tolerance for the square-root denominator and matrix comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// A 2x2 complex matrix representing a single-qubit gate.
///
/// Unitarity is a caller precondition and is not checked on construction.
/// Values are never mutated in place; every operation returns a fresh matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unitary2x2<T = f64> {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex<T>; 4],
}

/// Double-precision complex scalar used throughout the crate.
pub type Complex64 = Complex<f64>;

#[inline]
fn cplx<T: Float>(re: T, im: T) -> Complex<T> {
    Complex::new(re, im)
}

#[inline]
fn half<T: Float>() -> T {
    (T::one() + T::one()).recip()
}

impl<T: Float> Unitary2x2<T> {
    /// Create a new matrix from row-major entries.
    pub fn new(a: Complex<T>, b: Complex<T>, c: Complex<T>, d: Complex<T>) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(cplx(o, z), cplx(z, z), cplx(z, z), cplx(o, z))
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(cplx(z, z), cplx(o, z), cplx(o, z), cplx(z, z))
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(cplx(z, z), cplx(z, -o), cplx(z, o), cplx(z, z))
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(cplx(o, z), cplx(z, z), cplx(z, z), cplx(-o, z))
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = half::<T>().sqrt();
        let z = T::zero();
        Self::new(cplx(s, z), cplx(s, z), cplx(s, z), cplx(-s, z))
    }

    /// Create an S gate (sqrt(Z)).
    pub fn s() -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(cplx(o, z), cplx(z, z), cplx(z, z), cplx(z, o))
    }

    /// Create a T gate (fourth root of Z).
    pub fn t() -> Self {
        let quarter_pi = T::from(std::f64::consts::FRAC_PI_4).unwrap_or_else(T::zero);
        Self::p(quarter_pi)
    }

    /// Create an SX gate (sqrt(X)).
    pub fn sx() -> Self {
        let h = half::<T>();
        Self::new(cplx(h, h), cplx(h, -h), cplx(h, -h), cplx(h, h))
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: T) -> Self {
        let (s, c) = (theta * half()).sin_cos();
        let z = T::zero();
        Self::new(cplx(c, z), cplx(z, -s), cplx(z, -s), cplx(c, z))
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: T) -> Self {
        let (s, c) = (theta * half()).sin_cos();
        let z = T::zero();
        Self::new(cplx(c, z), cplx(-s, z), cplx(s, z), cplx(c, z))
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: T) -> Self {
        let z = T::zero();
        Self::new(
            Complex::from_polar(T::one(), -theta * half()),
            cplx(z, z),
            cplx(z, z),
            Complex::from_polar(T::one(), theta * half()),
        )
    }

    /// Create a phase gate P(lambda).
    pub fn p(lambda: T) -> Self {
        let (o, z) = (T::one(), T::zero());
        Self::new(
            cplx(o, z),
            cplx(z, z),
            cplx(z, z),
            Complex::from_polar(o, lambda),
        )
    }

    /// Create a U gate U(theta, phi, lambda).
    pub fn u(theta: T, phi: T, lambda: T) -> Self {
        let (s, c) = (theta * half()).sin_cos();
        Self::new(
            cplx(c, T::zero()),
            -Complex::from_polar(s, lambda),
            Complex::from_polar(s, phi),
            Complex::from_polar(c, phi + lambda),
        )
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Multiply every entry by a complex scalar.
    pub fn scale(&self, factor: Complex<T>) -> Self {
        let [a, b, c, d] = self.data;
        Self::new(a * factor, b * factor, c * factor, d * factor)
    }

    /// Get the conjugate transpose (U†).
    ///
    /// Swaps the off-diagonal entries and conjugates all four.
    pub fn adjoint(&self) -> Self {
        Self::new(
            self.data[0].conj(),
            self.data[2].conj(),
            self.data[1].conj(),
            self.data[3].conj(),
        )
    }

    /// Determinant `a·d - b·c`.
    pub fn determinant(&self) -> Complex<T> {
        let [a, b, c, d] = self.data;
        a * d - b * c
    }

    /// Trace `a + d`.
    pub fn trace(&self) -> Complex<T> {
        self.data[0] + self.data[3]
    }

    /// Closed-form principal square root, returning `V` with `V·V = U`.
    ///
    /// With `s = sqrt(det U)` and `t = sqrt(tr U + 2s)` the root is
    /// `(U + s·I) / t`. Fails with [`NcuError::NumericalDegeneracy`] when
    /// `|t|` is not larger than `tolerance` (or is NaN).
    pub fn try_sqrt(&self, tolerance: f64) -> NcuResult<Self> {
        let [a, b, c, d] = self.data;
        let s = self.determinant().sqrt();
        let t = (self.trace() + s + s).sqrt();

        let magnitude = t.norm().to_f64().unwrap_or(f64::NAN);
        if magnitude.is_nan() || magnitude <= tolerance {
            return Err(NcuError::NumericalDegeneracy {
                magnitude,
                tolerance,
            });
        }

        Ok(Self::new((a + s) / t, b / t, c / t, (d + s) / t))
    }

    /// [`try_sqrt`](Self::try_sqrt) with [`DEFAULT_TOLERANCE`].
    pub fn sqrt(&self) -> NcuResult<Self> {
        self.try_sqrt(DEFAULT_TOLERANCE)
    }

    /// Apply the matrix to the amplitude pair `(|0⟩, |1⟩)` of one qubit.
    #[inline]
    pub fn apply_to(&self, amp0: Complex<T>, amp1: Complex<T>) -> (Complex<T>, Complex<T>) {
        let [a, b, c, d] = self.data;
        (a * amp0 + b * amp1, c * amp0 + d * amp1)
    }

    /// Elementwise comparison within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.data.iter().zip(other.data.iter()).all(|(x, y)| {
            (*x - *y)
                .norm()
                .to_f64()
                .is_some_and(|diff| diff <= tolerance)
        })
    }

    /// Check `U·U† ≈ I` within `tolerance`.
    pub fn is_unitary(&self, tolerance: f64) -> bool {
        self.mul(&self.adjoint())
            .approx_eq(&Self::identity(), tolerance)
    }
}

impl<T: Float> Default for Unitary2x2<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: Float> Mul for Unitary2x2<T> {
    type Output = Self;

    #[allow(clippy::needless_pass_by_value)]
    fn mul(self, rhs: Self) -> Self::Output {
        Unitary2x2::mul(&self, &rhs)
    }
}

/// Principal square root of a 2x2 unitary with the default tolerance.
pub fn matrix_sqrt<T: Float>(u: &Unitary2x2<T>) -> NcuResult<Unitary2x2<T>> {
    u.sqrt()
}

/// Conjugate transpose of a 2x2 matrix.
pub fn adjoint_matrix<T: Float>(u: &Unitary2x2<T>) -> Unitary2x2<T> {
    u.adjoint()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::PI;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_sqrt_x_is_sx() {
        let v = Unitary2x2::<f64>::x().sqrt().unwrap();
        assert!(v.approx_eq(&Unitary2x2::sx(), TOL), "got {v:?}");
    }

    #[test]
    fn test_sqrt_z_is_s() {
        let v = Unitary2x2::<f64>::z().sqrt().unwrap();
        assert!(v.approx_eq(&Unitary2x2::s(), TOL), "got {v:?}");
    }

    #[test]
    fn test_sqrt_s_is_t() {
        let v = Unitary2x2::<f64>::s().sqrt().unwrap();
        assert!(v.approx_eq(&Unitary2x2::t(), TOL), "got {v:?}");
    }

    #[test]
    fn test_sqrt_identity() {
        let v = Unitary2x2::<f64>::identity().sqrt().unwrap();
        assert!(v.approx_eq(&Unitary2x2::identity(), TOL));
    }

    #[test]
    fn test_sqrt_of_minus_identity_is_degenerate() {
        let minus_i = Unitary2x2::<f64>::identity().scale(Complex64::new(-1.0, 0.0));
        match minus_i.sqrt() {
            Err(NcuError::NumericalDegeneracy { magnitude, .. }) => assert!(magnitude <= TOL),
            other => panic!("expected degeneracy, got {other:?}"),
        }
    }

    #[test]
    fn test_sqrt_squares_back_for_hadamard() {
        let h = Unitary2x2::<f64>::h();
        let v = h.sqrt().unwrap();
        assert!((v * v).approx_eq(&h, TOL));
        assert!(v.is_unitary(TOL));
    }

    #[test]
    fn test_single_precision_sqrt() {
        let v = Unitary2x2::<f32>::x().try_sqrt(1e-6).unwrap();
        assert!((v * v).approx_eq(&Unitary2x2::x(), 1e-6));
    }

    #[test]
    fn test_adjoint_swaps_and_conjugates() {
        let m = Unitary2x2::new(
            Complex64::new(1.0, 2.0),
            Complex64::new(3.0, 4.0),
            Complex64::new(5.0, 6.0),
            Complex64::new(7.0, 8.0),
        );
        let a = adjoint_matrix(&m);
        assert_eq!(a.data[0], Complex64::new(1.0, -2.0));
        assert_eq!(a.data[1], Complex64::new(5.0, -6.0));
        assert_eq!(a.data[2], Complex64::new(3.0, -4.0));
        assert_eq!(a.data[3], Complex64::new(7.0, -8.0));
    }

    #[test]
    fn test_rx_pi_is_minus_i_x() {
        let rx = Unitary2x2::rx(PI);
        let expected = Unitary2x2::x().scale(Complex64::new(0.0, -1.0));
        assert!(rx.approx_eq(&expected, TOL));
    }

    fn arb_unitary() -> impl Strategy<Value = Unitary2x2> {
        (0.1..(PI - 0.1), -PI..PI, -PI..PI).prop_map(|(t, p, l)| Unitary2x2::u(t, p, l))
    }

    proptest! {
        #[test]
        fn prop_adjoint_round_trip_is_exact(u in arb_unitary()) {
            prop_assert_eq!(adjoint_matrix(&adjoint_matrix(&u)), u);
        }

        #[test]
        fn prop_adjoint_is_inverse(u in arb_unitary()) {
            prop_assert!((u * u.adjoint()).approx_eq(&Unitary2x2::identity(), 1e-12));
        }

        #[test]
        fn prop_sqrt_reconstructs(u in arb_unitary()) {
            let v = matrix_sqrt(&u).unwrap();
            prop_assert!((v * v).approx_eq(&u, 1e-9), "v*v = {:?}, u = {:?}", v * v, u);
            prop_assert!(v.is_unitary(1e-9));
        }
    }
}
