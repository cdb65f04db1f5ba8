//! The numeric contract expressions are generic over.
//!
//! An [`Expression`](crate::Expression) does not care what it is counting
//! with, only that the type behaves like a totally ordered field (or ring,
//! for the integer instantiations): it must support the four arithmetic
//! operators, negation, comparison against the additive and multiplicative
//! identities, and a *total* order usable as a map key. [`Scalar`] captures
//! exactly that contract.
//!
//! Implementations are provided for `i32`, `i64`, `f32` and `f64`, and for
//! [`rug::Rational`] behind the `rational` cargo feature. The float
//! implementations use [`f64::total_cmp`]/[`f32::total_cmp`] for the key
//! order, so `-0.0` and `0.0` are *structurally* distinct constants even
//! though both satisfy [`Scalar::is_zero`].

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

use num_traits::{One, ToPrimitive, Zero};

/// The numeric type an expression tree is built over.
pub trait Scalar:
    Clone
    + fmt::Debug
    + fmt::Display
    + PartialOrd
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
{
    /// Whether the type can represent non-integer values.
    ///
    /// This gates the eager `E / c -> (1/c) * E` rewrite (which would change
    /// the meaning of truncating integer division) and the negative-base
    /// power domain check (which is vacuous when every value is an integer).
    const FRACTIONAL: bool;

    /// The additive identity.
    fn zero() -> Self;

    /// The multiplicative identity.
    fn one() -> Self;

    /// Whether `self` is numerically equal to [`Scalar::zero`].
    fn is_zero(&self) -> bool;

    /// Whether `self` is numerically equal to [`Scalar::one`].
    fn is_one(&self) -> bool;

    /// Converts a small integer into the scalar type.
    fn from_i64(n: i64) -> Self;

    /// Whether `self` represents an integer value.
    fn is_integer(&self) -> bool;

    /// Whether `self` is NaN. Always `false` for exact types.
    fn is_nan(&self) -> bool;

    /// Whether `self` is finite. Always `true` for exact types.
    fn is_finite(&self) -> bool;

    /// The exact `i64` value of `self`, if it has one.
    fn to_i64(&self) -> Option<i64>;

    /// `self` raised to `exponent`, or `None` when the result is not
    /// representable in the scalar type (a negative exponent over integers,
    /// a non-integer exponent over rationals).
    fn checked_pow(&self, exponent: &Self) -> Option<Self>;

    /// A total order over all values of the type, used to key the canonical
    /// maps inside sums and products. Must be consistent with [`Scalar::hash`].
    fn total_cmp(&self, other: &Self) -> Ordering;

    /// Feeds the value into a hasher, consistently with [`Scalar::total_cmp`]
    /// equality.
    fn hash<H: Hasher>(&self, state: &mut H);
}

macro_rules! impl_scalar_int {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const FRACTIONAL: bool = false;

            fn zero() -> Self {
                Zero::zero()
            }

            fn one() -> Self {
                One::one()
            }

            fn is_zero(&self) -> bool {
                Zero::is_zero(self)
            }

            fn is_one(&self) -> bool {
                One::is_one(self)
            }

            fn from_i64(n: i64) -> Self {
                n as $t
            }

            fn is_integer(&self) -> bool {
                true
            }

            fn is_nan(&self) -> bool {
                false
            }

            fn is_finite(&self) -> bool {
                true
            }

            fn to_i64(&self) -> Option<i64> {
                ToPrimitive::to_i64(self)
            }

            fn checked_pow(&self, exponent: &Self) -> Option<Self> {
                let exponent = u32::try_from(*exponent).ok()?;
                <$t>::checked_pow(*self, exponent)
            }

            fn total_cmp(&self, other: &Self) -> Ordering {
                Ord::cmp(self, other)
            }

            fn hash<H: Hasher>(&self, state: &mut H) {
                Hash::hash(self, state)
            }
        }
    )*};
}

impl_scalar_int!(i32, i64);

macro_rules! impl_scalar_float {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            const FRACTIONAL: bool = true;

            fn zero() -> Self {
                Zero::zero()
            }

            fn one() -> Self {
                One::one()
            }

            fn is_zero(&self) -> bool {
                Zero::is_zero(self)
            }

            fn is_one(&self) -> bool {
                One::is_one(self)
            }

            fn from_i64(n: i64) -> Self {
                n as $t
            }

            fn is_integer(&self) -> bool {
                // NaN and the infinities have a NaN fractional part, so both
                // fall out as non-integers here.
                self.fract() == 0.0
            }

            fn is_nan(&self) -> bool {
                <$t>::is_nan(*self)
            }

            fn is_finite(&self) -> bool {
                <$t>::is_finite(*self)
            }

            fn to_i64(&self) -> Option<i64> {
                if !Scalar::is_integer(self) {
                    return None;
                }
                ToPrimitive::to_i64(self)
            }

            fn checked_pow(&self, exponent: &Self) -> Option<Self> {
                let result = self.powf(*exponent);
                if result.is_nan() { None } else { Some(result) }
            }

            fn total_cmp(&self, other: &Self) -> Ordering {
                <$t>::total_cmp(self, other)
            }

            fn hash<H: Hasher>(&self, state: &mut H) {
                // bit-identical values hash identically, matching total_cmp
                self.to_bits().hash(state)
            }
        }
    )*};
}

impl_scalar_float!(f32, f64);

#[cfg(feature = "rational")]
impl Scalar for rug::Rational {
    const FRACTIONAL: bool = true;

    fn zero() -> Self {
        rug::Rational::new()
    }

    fn one() -> Self {
        rug::Rational::from(1)
    }

    fn is_zero(&self) -> bool {
        *self == 0
    }

    fn is_one(&self) -> bool {
        *self == 1
    }

    fn from_i64(n: i64) -> Self {
        rug::Rational::from(n)
    }

    fn is_integer(&self) -> bool {
        self.is_integer()
    }

    fn is_nan(&self) -> bool {
        false
    }

    fn is_finite(&self) -> bool {
        true
    }

    fn to_i64(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        self.numer().to_i64()
    }

    fn checked_pow(&self, exponent: &Self) -> Option<Self> {
        use rug::ops::Pow;

        let exponent = Scalar::to_i64(exponent).and_then(|e| i32::try_from(e).ok())?;
        if Scalar::is_zero(self) && exponent < 0 {
            return None;
        }
        Some(self.clone().pow(exponent))
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        Ord::cmp(self, other)
    }

    fn hash<H: Hasher>(&self, state: &mut H) {
        Hash::hash(self, state)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn integer_scalars_are_always_integers() {
        assert!(Scalar::is_integer(&7i32));
        assert!(Scalar::is_integer(&-3i64));
        assert!(!i32::FRACTIONAL);
        assert!(!i64::FRACTIONAL);
    }

    #[test]
    fn float_integrality() {
        assert!(Scalar::is_integer(&3.0f64));
        assert!(!Scalar::is_integer(&3.5f64));
        assert!(!Scalar::is_integer(&f64::NAN));
        assert!(!Scalar::is_integer(&f64::INFINITY));
        assert!(f64::FRACTIONAL);
    }

    #[test]
    fn exact_to_i64() {
        assert_eq!(Scalar::to_i64(&4.0f64), Some(4));
        assert_eq!(Scalar::to_i64(&4.5f64), None);
        assert_eq!(Scalar::to_i64(&-9i32), Some(-9));
    }

    #[test]
    fn integer_checked_pow() {
        assert_eq!(Scalar::checked_pow(&2i32, &10), Some(1024));
        // negative exponents are not representable over the integers
        assert_eq!(Scalar::checked_pow(&2i32, &-1), None);
        // overflow is an unrepresentable result, not a wrap
        assert_eq!(Scalar::checked_pow(&2i32, &40), None);
    }

    #[test]
    fn float_checked_pow() {
        assert_eq!(Scalar::checked_pow(&2.0f64, &-1.0), Some(0.5));
        assert_eq!(Scalar::checked_pow(&-8.0f64, &0.5), None);
    }

    #[test]
    fn float_total_order_distinguishes_signed_zero() {
        assert_eq!(Scalar::total_cmp(&-0.0f64, &0.0f64), Ordering::Less);
        assert!(Scalar::is_zero(&-0.0f64));
    }

    #[cfg(feature = "rational")]
    #[test]
    fn rational_pow() {
        use rug::Rational;

        let half = Rational::from((1, 2));
        assert_eq!(
            Scalar::checked_pow(&half, &Rational::from(2)),
            Some(Rational::from((1, 4)))
        );
        // 2^(1/2) has no exact rational representation
        assert_eq!(Scalar::checked_pow(&Rational::from(2), &half), None);
    }
}
