//! Native field arithmetic unit.
//!
//! `Uint248` is a BN254 scalar field element interpreted as an unsigned integer of at most 248
//! bits. Ring operations (`add`, `sub`, `mul`) are plain field operations and wrap modulo `p`.
//! Integer operations (`div_rem`, `sqrt`, `is_greater_than`) work on the canonical
//! representative and refuse operands wider than 248 bits, mirroring the range checks the
//! circuit gadgets in [`crate::gadgets`] enforce.
//!
//! Booleans are the field elements 0 and 1.

use crate::constants::{SQRT_BITS, UINT248_BITS};
use crate::errors::ArithmeticError;
use ark_bn254::Fr;
use ark_ff::PrimeField;
use ark_std::{One, Zero};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Uint248(Fr);

impl Uint248 {
    pub const BITS: usize = UINT248_BITS;

    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    pub fn one() -> Self {
        Self(Fr::one())
    }

    pub fn from_u64(v: u64) -> Self {
        Self(Fr::from(v))
    }

    pub fn from_bool(b: bool) -> Self {
        if b { Self::one() } else { Self::zero() }
    }

    /// Interpret big-endian bytes as an integer. Inputs wider than 248 bits are rejected.
    pub fn from_be_bytes(bytes: &[u8]) -> Result<Self, ArithmeticError> {
        let n = BigUint::from_bytes_be(bytes);
        if n.bits() as usize > Self::BITS {
            return Err(ArithmeticError::Overflow { op: "from_be_bytes", bits: Self::BITS });
        }
        Ok(Self(Fr::from(n)))
    }

    pub fn from_fr(fr: Fr) -> Self {
        Self(fr)
    }

    pub fn to_fr(self) -> Fr {
        self.0
    }

    pub fn to_biguint(self) -> BigUint {
        self.0.into_bigint().into()
    }

    /// Returns the value as `u64` if it fits.
    pub fn to_u64(self) -> Option<u64> {
        u64::try_from(self.to_biguint()).ok()
    }

    pub fn fits_bits(self, bits: usize) -> bool {
        self.to_biguint().bits() as usize <= bits
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// True iff the element is the boolean 1.
    pub fn is_true(self) -> bool {
        self.0.is_one()
    }

    pub fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }

    /// Field subtraction. `a - b` with `b > a` wraps to `p - (b - a)`; squaring the result still
    /// yields `(b - a)^2` modulo `p`.
    pub fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }

    pub fn mul(self, rhs: Self) -> Self {
        Self(self.0 * rhs.0)
    }

    /// Truncating division with remainder.
    ///
    /// A zero divisor yields the sentinel `(0, 0)`; the division gadget selects the same result.
    pub fn div_rem(self, divisor: Self) -> Result<(Self, Self), ArithmeticError> {
        let a = self.checked("div_rem")?;
        let b = divisor.checked("div_rem")?;
        if b.is_zero() {
            return Ok((Self::zero(), Self::zero()));
        }
        Ok((Self(Fr::from(&a / &b)), Self(Fr::from(&a % &b))))
    }

    /// Quotient of [`Uint248::div_rem`].
    pub fn div(self, divisor: Self) -> Result<Self, ArithmeticError> {
        self.div_rem(divisor).map(|(q, _)| q)
    }

    /// Floor of the integer square root.
    pub fn sqrt(self) -> Result<Self, ArithmeticError> {
        let a = self.checked("sqrt")?;
        let s = a.sqrt();
        debug_assert!(s.bits() as usize <= SQRT_BITS);
        Ok(Self(Fr::from(s)))
    }

    pub fn is_equal(self, rhs: Self) -> Self {
        Self::from_bool(self == rhs)
    }

    pub fn is_greater_than(self, rhs: Self) -> Result<Self, ArithmeticError> {
        let a = self.checked("is_greater_than")?;
        let b = rhs.checked("is_greater_than")?;
        Ok(Self::from_bool(a > b))
    }

    pub fn min(self, rhs: Self) -> Result<Self, ArithmeticError> {
        Ok(Self::select(self.is_greater_than(rhs)?.is_true(), rhs, self))
    }

    /// N-ary conjunction over boolean elements. Empty input is true.
    pub fn and(values: &[Self]) -> Self {
        Self::from_bool(values.iter().all(|v| v.is_true()))
    }

    /// `cond ? t : f`.
    pub fn select(cond: bool, t: Self, f: Self) -> Self {
        if cond { t } else { f }
    }

    fn checked(self, op: &'static str) -> Result<BigUint, ArithmeticError> {
        let n = self.to_biguint();
        if n.bits() as usize > Self::BITS {
            return Err(ArithmeticError::Overflow { op, bits: Self::BITS });
        }
        Ok(n)
    }
}

impl From<u64> for Uint248 {
    fn from(v: u64) -> Self {
        Self::from_u64(v)
    }
}

impl fmt::Debug for Uint248 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uint248({})", self.to_biguint())
    }
}

impl fmt::Display for Uint248 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_biguint())
    }
}

// Decimal strings keep JSON readers from truncating 248-bit values.
impl From<Uint248> for String {
    fn from(v: Uint248) -> String {
        v.to_string()
    }
}

impl TryFrom<String> for Uint248 {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let n = BigUint::parse_bytes(s.as_bytes(), 10).ok_or_else(|| format!("invalid decimal: {s}"))?;
        if n.bits() as usize > Self::BITS {
            return Err(format!("value does not fit in {} bits", Self::BITS));
        }
        Ok(Self(Fr::from(n)))
    }
}
