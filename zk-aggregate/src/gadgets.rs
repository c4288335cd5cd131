//! In-circuit arithmetic unit over `FpVar<Fr>`.
//!
//! Each gadget mirrors a method of [`crate::field::Uint248`] bit for bit, including the zero
//! divisor sentinel. Integer gadgets range-check their operands to 248 bits, so an operand the
//! native side rejects leaves the constraint system unsatisfiable.

use crate::constants::{LIMB_BITS, SQRT_BITS, UINT248_BITS};
use crate::field::Uint248;
use crate::types::Word;
use ark_bn254::Fr;
use ark_r1cs_std::prelude::*;
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use num_bigint::BigUint;
use num_traits::One;

/// `2^bits` as a field element.
pub fn pow2(bits: usize) -> Fr {
    Fr::from(BigUint::one() << bits)
}

/// Convert little-endian boolean bits into an FpVar.
pub fn bits_le_to_fp(bits_le: &[Boolean<Fr>]) -> Result<FpVar<Fr>, SynthesisError> {
    let mut acc = FpVar::<Fr>::zero();
    let mut coeff = FpVar::<Fr>::one();

    for b in bits_le {
        // b ? coeff : 0
        let term = b.select(&coeff, &FpVar::<Fr>::zero())?;
        acc += term;
        coeff += coeff.clone();
    }

    Ok(acc)
}

/// Enforce that `v` fits in `n` bits and return its `n` little-endian bits.
pub fn constrain_bits(v: &FpVar<Fr>, n: usize) -> Result<Vec<Boolean<Fr>>, SynthesisError> {
    let bits = v.to_bits_le()?;
    let low = bits[..n].to_vec();
    let reconstructed = bits_le_to_fp(&low)?;
    reconstructed.enforce_equal(v)?;
    Ok(low)
}

pub fn constrain_uint248(v: &FpVar<Fr>) -> Result<(), SynthesisError> {
    constrain_bits(v, UINT248_BITS).map(|_| ())
}

/// `a > b` for operands already known to fit in `bits` bits.
///
/// `a + 2^bits - b - 1` fits in `bits + 1` bits and its top bit is set iff `a > b`.
pub fn is_greater_than(a: &FpVar<Fr>, b: &FpVar<Fr>, bits: usize) -> Result<Boolean<Fr>, SynthesisError> {
    let shifted = a + FpVar::constant(pow2(bits)) - b - FpVar::one();
    let shifted_bits = constrain_bits(&shifted, bits + 1)?;
    Ok(shifted_bits[bits].clone())
}

pub fn min(a: &FpVar<Fr>, b: &FpVar<Fr>, bits: usize) -> Result<FpVar<Fr>, SynthesisError> {
    is_greater_than(a, b, bits)?.select(b, a)
}

/// Truncating division with remainder. A zero divisor yields `(0, 0)`.
pub fn div_rem(a: &FpVar<Fr>, b: &FpVar<Fr>) -> Result<(FpVar<Fr>, FpVar<Fr>), SynthesisError> {
    constrain_uint248(a)?;
    constrain_uint248(b)?;

    if a.is_constant() && b.is_constant() {
        let (q, r) = Uint248::from_fr(a.value()?)
            .div_rem(Uint248::from_fr(b.value()?))
            .map_err(|_| SynthesisError::Unsatisfiable)?;
        return Ok((FpVar::constant(q.to_fr()), FpVar::constant(r.to_fr())));
    }

    let cs = a.cs().or(b.cs());
    let zero = FpVar::<Fr>::zero();
    let b_is_zero = b.is_eq(&zero)?;
    let divisor = b_is_zero.select(&FpVar::one(), b)?;

    let quotient_of = |a: Fr, d: Fr| -> (Fr, Fr) {
        let a: BigUint = Uint248::from_fr(a).to_biguint();
        let d: BigUint = Uint248::from_fr(d).to_biguint();
        (Fr::from(&a / &d), Fr::from(&a % &d))
    };

    let q = FpVar::new_witness(cs.clone(), || Ok(quotient_of(a.value()?, divisor.value()?).0))?;
    let r = FpVar::new_witness(cs, || Ok(quotient_of(a.value()?, divisor.value()?).1))?;

    constrain_uint248(&q)?;
    constrain_uint248(&r)?;
    (&q * &divisor + &r).enforce_equal(a)?;
    is_greater_than(&divisor, &r, UINT248_BITS)?.enforce_equal(&Boolean::constant(true))?;
    // q <= a: with a * divisor below the modulus, q * divisor + r cannot wrap.
    is_greater_than(&q, a, UINT248_BITS)?.enforce_equal(&Boolean::constant(false))?;

    Ok((b_is_zero.select(&zero, &q)?, b_is_zero.select(&zero, &r)?))
}

/// Floor square root: `s^2 <= v < (s + 1)^2`.
pub fn sqrt(v: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    constrain_uint248(v)?;

    if v.is_constant() {
        let s = Uint248::from_fr(v.value()?).sqrt().map_err(|_| SynthesisError::Unsatisfiable)?;
        return Ok(FpVar::constant(s.to_fr()));
    }

    let s = FpVar::new_witness(v.cs(), || {
        Uint248::from_fr(v.value()?)
            .sqrt()
            .map(Uint248::to_fr)
            .map_err(|_| SynthesisError::Unsatisfiable)
    })?;
    constrain_bits(&s, SQRT_BITS)?;

    let below = v - &s * &s;
    constrain_uint248(&below)?;

    let next = &s + FpVar::one();
    let above = &next * &next - v - FpVar::one();
    constrain_uint248(&above)?;

    Ok(s)
}

/// A 32-byte word as two 128-bit limbs, keeping the high limb's bits for truncation.
#[derive(Clone, Debug)]
pub struct WordVar {
    pub hi: FpVar<Fr>,
    pub lo: FpVar<Fr>,
    hi_bits: Vec<Boolean<Fr>>,
}

impl WordVar {
    pub fn new_witness(cs: ConstraintSystemRef<Fr>, word: &Word) -> Result<Self, SynthesisError> {
        let (hi, lo) = word.limbs();
        let hi = FpVar::new_witness(cs.clone(), || Ok(hi))?;
        let lo = FpVar::new_witness(cs, || Ok(lo))?;
        let hi_bits = constrain_bits(&hi, LIMB_BITS)?;
        constrain_bits(&lo, LIMB_BITS)?;
        Ok(Self { hi, lo, hi_bits })
    }

    pub fn is_eq_word(&self, word: &Word) -> Result<Boolean<Fr>, SynthesisError> {
        let (hi, lo) = word.limbs();
        let hi_eq = self.hi.is_eq(&FpVar::constant(hi))?;
        let lo_eq = self.lo.is_eq(&FpVar::constant(lo))?;
        Boolean::kary_and(&[hi_eq, lo_eq])
    }

    /// Low 248 bits, matching [`Word::to_uint248`].
    pub fn to_uint248(&self) -> Result<FpVar<Fr>, SynthesisError> {
        let hi = bits_le_to_fp(&self.hi_bits[..UINT248_BITS - LIMB_BITS])?;
        Ok(hi * FpVar::constant(pow2(LIMB_BITS)) + &self.lo)
    }

    pub fn limbs(&self) -> [FpVar<Fr>; 2] {
        [self.hi.clone(), self.lo.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_relations::r1cs::ConstraintSystem;

    fn witness(cs: &ConstraintSystemRef<Fr>, v: u64) -> FpVar<Fr> {
        FpVar::new_witness(cs.clone(), || Ok(Fr::from(v))).unwrap()
    }

    #[test]
    fn div_rem_matches_native_and_zero_sentinel() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let (q, r) = div_rem(&witness(&cs, 17), &witness(&cs, 5)).unwrap();
        assert_eq!(q.value().unwrap(), Fr::from(3u64));
        assert_eq!(r.value().unwrap(), Fr::from(2u64));

        let (q, r) = div_rem(&witness(&cs, 42), &witness(&cs, 0)).unwrap();
        assert_eq!(q.value().unwrap(), Fr::from(0u64));
        assert_eq!(r.value().unwrap(), Fr::from(0u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn division_of_wide_numerator_is_unsatisfiable() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let wide = witness(&cs, 3) - witness(&cs, 10);
        let _ = div_rem(&wide, &witness(&cs, 2)).unwrap();
        assert!(!cs.is_satisfied().unwrap());
    }

    #[test]
    fn sqrt_floors() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        for (v, expected) in [(0u64, 0u64), (15, 3), (16, 4), (1_000_001, 1000)] {
            let s = sqrt(&witness(&cs, v)).unwrap();
            assert_eq!(s.value().unwrap(), Fr::from(expected));
        }
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn comparisons() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let gt = is_greater_than(&witness(&cs, 9), &witness(&cs, 5), 64).unwrap();
        let not_gt = is_greater_than(&witness(&cs, 5), &witness(&cs, 5), 64).unwrap();
        assert!(gt.value().unwrap());
        assert!(!not_gt.value().unwrap());
        let m = min(&witness(&cs, 20), &witness(&cs, 7), 64).unwrap();
        assert_eq!(m.value().unwrap(), Fr::from(7u64));
        assert!(cs.is_satisfied().unwrap());
    }

    #[test]
    fn word_truncation_matches_native() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        let mut word = Word::from_u64(77);
        word.0[0] = 0xff;
        let var = WordVar::new_witness(cs.clone(), &word).unwrap();
        assert_eq!(var.to_uint248().unwrap().value().unwrap(), word.to_uint248().to_fr());
        assert!(var.is_eq_word(&word).unwrap().value().unwrap());
        assert!(!var.is_eq_word(&Word::from_u64(77)).unwrap().value().unwrap());
        assert!(cs.is_satisfied().unwrap());
    }
}
