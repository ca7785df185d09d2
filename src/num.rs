//! Utilities related to numbers.

use num;
use std::fmt;

/// Floating point marker trait for easier control over trait bounds.
pub trait BFloat: Sync + Send + num::Float + num::cast::FromPrimitive + fmt::Debug {}

impl BFloat for f32 {}
impl BFloat for f64 {}

/// Converts the given `f64` constant to the floating point type `F`.
pub fn from_f64<F: BFloat>(value: f64) -> F {
    F::from_f64(value).expect("Conversion failed")
}

/// Converts the given index to the floating point type `F`.
pub fn from_usize<F: BFloat>(value: usize) -> F {
    F::from_usize(value).expect("Conversion failed")
}

/// Whether all the given values are finite.
pub fn all_finite<F: BFloat>(values: &[F]) -> bool {
    values.iter().all(|value| value.is_finite())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn finiteness_check_rejects_nan_and_infinity() {
        assert!(all_finite(&[0.0_f64, -3.5, 1e300]));
        assert!(!all_finite(&[0.0_f64, f64::NAN]));
        assert!(!all_finite(&[f32::INFINITY]));
    }
}
