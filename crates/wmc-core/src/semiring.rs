//! # Semirings
//!
//! The algebra a circuit is evaluated in.
//!
//! Every evaluation is parameterized over one [`Semiring`]. AND nodes fold
//! their children with `times`, OR nodes with `plus`, negated internal nodes
//! go through `negate`, and atom weights enter through `value`.
//!
//! Laws every implementation upholds:
//! - `plus(zero, x) = x`
//! - `times(one, x) = x` and `times(zero, x) = zero`
//! - `negate(one) = zero` and `negate(zero) = one`

use crate::{Weight, WmcError};
use std::fmt::Debug;

/// An algebraic domain for circuit evaluation.
pub trait Semiring {
    /// The values combined along the circuit.
    type Value: Clone + Debug + PartialEq;

    /// Multiplicative identity.
    fn one(&self) -> Self::Value;

    /// Additive identity.
    fn zero(&self) -> Self::Value;

    /// Combination for OR nodes. Commutative and associative.
    fn plus(&self, a: Self::Value, b: Self::Value) -> Self::Value;

    /// Combination for AND nodes. Commutative and associative.
    fn times(&self, a: Self::Value, b: Self::Value) -> Self::Value;

    /// Complement for negated references.
    fn negate(&self, a: Self::Value) -> Self::Value;

    /// Lift a declared weight into the semiring.
    fn value(&self, raw: &Weight) -> Result<Self::Value, WmcError>;

    /// Rescale `a` by the normalization constant `z`.
    ///
    /// Fails with [`WmcError::DivisionByZero`] when `z` is the additive identity.
    fn normalize(&self, a: Self::Value, z: &Self::Value) -> Result<Self::Value, WmcError>;

    /// Presentation cleanup applied to a final query result.
    ///
    /// Domains without a notion of magnitude return the value unchanged.
    fn present(&self, value: Self::Value, _zero_threshold: f64) -> Self::Value {
        value
    }
}

// =============================================================================
// PROBABILITY SEMIRING
// =============================================================================

/// Ordinary floating-point arithmetic over `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbabilitySemiring;

impl Semiring for ProbabilitySemiring {
    type Value = f64;

    fn one(&self) -> f64 {
        1.0
    }

    fn zero(&self) -> f64 {
        0.0
    }

    fn plus(&self, a: f64, b: f64) -> f64 {
        a + b
    }

    fn times(&self, a: f64, b: f64) -> f64 {
        a * b
    }

    fn negate(&self, a: f64) -> f64 {
        1.0 - a
    }

    fn value(&self, raw: &Weight) -> Result<f64, WmcError> {
        let p = match raw {
            Weight::Probability(p) => *p,
            Weight::Symbol(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| WmcError::InvalidWeight(format!("'{}' is not a number", s)))?,
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(WmcError::InvalidWeight(format!(
                "{} is not a probability",
                p
            )));
        }
        Ok(p)
    }

    fn normalize(&self, a: f64, z: &f64) -> Result<f64, WmcError> {
        if *z == 0.0 {
            return Err(WmcError::DivisionByZero);
        }
        Ok(a / z)
    }

    fn present(&self, value: f64, zero_threshold: f64) -> f64 {
        if value.abs() < zero_threshold {
            if value != 0.0 {
                tracing::trace!(raw = value, "suppressed near-zero result");
            }
            0.0
        } else {
            value
        }
    }
}

// =============================================================================
// SYMBOLIC SEMIRING
// =============================================================================

/// Builds the arithmetic expression an evaluation computes, as text.
///
/// Identity elements are simplified away so the output stays readable:
/// `plus` drops `"0"`, `times` drops `"1"` and collapses on `"0"`, and
/// normalizing by `"1"` emits no division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolicSemiring;

const SYM_ONE: &str = "1";
const SYM_ZERO: &str = "0";

impl Semiring for SymbolicSemiring {
    type Value = String;

    fn one(&self) -> String {
        SYM_ONE.to_string()
    }

    fn zero(&self) -> String {
        SYM_ZERO.to_string()
    }

    fn plus(&self, a: String, b: String) -> String {
        if a == SYM_ZERO {
            b
        } else if b == SYM_ZERO {
            a
        } else {
            format!("({} + {})", a, b)
        }
    }

    fn times(&self, a: String, b: String) -> String {
        if a == SYM_ZERO || b == SYM_ZERO {
            self.zero()
        } else if a == SYM_ONE {
            b
        } else if b == SYM_ONE {
            a
        } else {
            format!("{}*{}", a, b)
        }
    }

    fn negate(&self, a: String) -> String {
        match a.as_str() {
            SYM_ZERO => self.one(),
            SYM_ONE => self.zero(),
            _ => format!("(1-{})", a),
        }
    }

    fn value(&self, raw: &Weight) -> Result<String, WmcError> {
        let text = raw.to_string();
        if text.is_empty() {
            return Err(WmcError::InvalidWeight("empty symbol".to_string()));
        }
        Ok(text)
    }

    fn normalize(&self, a: String, z: &String) -> Result<String, WmcError> {
        match z.as_str() {
            SYM_ONE => Ok(a),
            SYM_ZERO => Err(WmcError::DivisionByZero),
            _ => Ok(format!("{} / {}", a, z)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probability_identities() {
        let s = ProbabilitySemiring;
        for x in [0.0, 0.3, 0.5, 1.0] {
            assert_eq!(s.plus(s.zero(), x), x);
            assert_eq!(s.times(s.one(), x), x);
            assert_eq!(s.times(s.zero(), x), 0.0);
        }
        assert_eq!(s.negate(s.one()), s.zero());
        assert_eq!(s.negate(s.zero()), s.one());
    }

    #[test]
    fn probability_value_parses_numeric_symbols() {
        let s = ProbabilitySemiring;
        assert_eq!(s.value(&Weight::from(0.3)).expect("value"), 0.3);
        assert_eq!(s.value(&Weight::symbol("0.25")).expect("value"), 0.25);
        assert!(matches!(
            s.value(&Weight::symbol("p")),
            Err(WmcError::InvalidWeight(_))
        ));
        assert!(s.value(&Weight::from(1.5)).is_err());
        assert!(s.value(&Weight::from(f64::NAN)).is_err());
    }

    #[test]
    fn probability_normalize_by_zero_fails() {
        let s = ProbabilitySemiring;
        assert_eq!(s.normalize(0.2, &0.0), Err(WmcError::DivisionByZero));
        assert_eq!(s.normalize(0.2, &0.5).expect("normalize"), 0.4);
    }

    #[test]
    fn probability_present_clamps_noise_only() {
        let s = ProbabilitySemiring;
        assert_eq!(s.present(5e-7, 1e-6), 0.0);
        assert_eq!(s.present(-5e-7, 1e-6), 0.0);
        assert_eq!(s.present(2e-6, 1e-6), 2e-6);
        assert_eq!(s.present(0.5, 1e-6), 0.5);
    }

    #[test]
    fn symbolic_plus_drops_zero() {
        let s = SymbolicSemiring;
        assert_eq!(s.plus(s.zero(), "a".into()), "a");
        assert_eq!(s.plus("a".into(), s.zero()), "a");
        assert_eq!(s.plus("a".into(), "b".into()), "(a + b)");
    }

    #[test]
    fn symbolic_times_simplifies_identities() {
        let s = SymbolicSemiring;
        assert_eq!(s.times(s.one(), "a".into()), "a");
        assert_eq!(s.times("a".into(), s.one()), "a");
        assert_eq!(s.times(s.zero(), "a".into()), "0");
        assert_eq!(s.times("a".into(), s.zero()), "0");
        assert_eq!(s.times("a".into(), "b".into()), "a*b");
    }

    #[test]
    fn symbolic_negate() {
        let s = SymbolicSemiring;
        assert_eq!(s.negate(s.one()), "0");
        assert_eq!(s.negate(s.zero()), "1");
        assert_eq!(s.negate("a".into()), "(1-a)");
    }

    #[test]
    fn symbolic_normalize() {
        let s = SymbolicSemiring;
        assert_eq!(s.normalize("a".into(), &s.one()).expect("norm"), "a");
        assert_eq!(s.normalize("a".into(), &"z".into()).expect("norm"), "a / z");
        assert_eq!(
            s.normalize("a".into(), &s.zero()),
            Err(WmcError::DivisionByZero)
        );
    }

    #[test]
    fn symbolic_value_renders_weights() {
        let s = SymbolicSemiring;
        assert_eq!(s.value(&Weight::symbol("p_rain")).expect("value"), "p_rain");
        assert_eq!(s.value(&Weight::from(0.3)).expect("value"), "0.3");
    }
}
