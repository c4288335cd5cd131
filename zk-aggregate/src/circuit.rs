//! R1CS circuits for the two statistics pipelines.
//!
//! What a volatility proof shows (for a stream of `N` slots):
//! 1) The prover knows `N` private records and liveness flags.
//! 2) A public commitment equals Poseidon(slots) (see [`crate::commitment`]).
//! 3) The public std equals the two-pass delta statistic over the swaps that pass the filter.
//!
//! An activity proof shows the same binding, and that the public count and minimum block number
//! are taken over the given user's events.
//!
//! Both circuits have a fixed shape: every slot runs through every stage and dead slots are
//! neutralised by selection, so the constraint count depends only on `N`.

use crate::commitment::stream_commitment_var;
use crate::config::{ActivityConfig, VolatilityConfig};
use crate::constants::{OUTPUT_BITS_ADDRESS, OUTPUT_BITS_BLOCK_NUM, OUTPUT_BITS_UINT};
use crate::field::Uint248;
use crate::gadgets::{self, WordVar, constrain_bits};
use crate::types::Record;
use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

/// A record allocated as private witnesses.
#[derive(Clone, Debug)]
pub struct RecordVar {
    pub block_num: FpVar<Fr>,
    pub event_id: WordVar,
    pub fields: Vec<WordVar>,
}

impl RecordVar {
    pub fn new_witness(cs: ConstraintSystemRef<Fr>, record: &Record) -> Result<Self, SynthesisError> {
        let block_num = FpVar::new_witness(cs.clone(), || Ok(Fr::from(record.block_num)))?;
        constrain_bits(&block_num, OUTPUT_BITS_BLOCK_NUM as usize)?;
        let event_id = WordVar::new_witness(cs.clone(), &record.event_id)?;
        let fields = record
            .fields
            .iter()
            .map(|f| WordVar::new_witness(cs.clone(), f))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { block_num, event_id, fields })
    }
}

/// In-circuit counterpart of [`crate::stream::DataStream`].
#[derive(Clone, Debug)]
pub struct StreamVar<T> {
    slots: Vec<T>,
    live: Vec<Boolean<Fr>>,
}

impl<T> StreamVar<T> {
    pub fn new(slots: Vec<T>, live: Vec<Boolean<Fr>>) -> Result<Self, SynthesisError> {
        if slots.len() != live.len() {
            return Err(SynthesisError::Unsatisfiable);
        }
        Ok(Self { slots, live })
    }

    pub fn filter(
        self,
        predicate: impl Fn(&T) -> Result<Boolean<Fr>, SynthesisError>,
    ) -> Result<Self, SynthesisError> {
        let live = self
            .slots
            .iter()
            .zip(&self.live)
            .map(|(slot, live)| Boolean::kary_and(&[live.clone(), predicate(slot)?]))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slots: self.slots, live })
    }

    /// Dead slots project to `dead`.
    pub fn map<U: CondSelectGadget<Fr>>(
        &self,
        dead: &U,
        transform: impl Fn(&T) -> Result<U, SynthesisError>,
    ) -> Result<StreamVar<U>, SynthesisError> {
        let slots = self
            .slots
            .iter()
            .zip(&self.live)
            .map(|(slot, live)| live.select(&transform(slot)?, dead))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StreamVar { slots, live: self.live.clone() })
    }

    pub fn reduce<A: CondSelectGadget<Fr>>(
        &self,
        init: A,
        step: impl Fn(&A, &T) -> Result<A, SynthesisError>,
    ) -> Result<A, SynthesisError> {
        let mut acc = init;
        for (slot, live) in self.slots.iter().zip(&self.live) {
            let next = step(&acc, slot)?;
            acc = live.select(&next, &acc)?;
        }
        Ok(acc)
    }
}

#[derive(Clone, Debug)]
pub struct TickAccumulatorVar {
    pub previous_tick: FpVar<Fr>,
    pub sum: FpVar<Fr>,
    pub count: FpVar<Fr>,
    pub sum_of_squares: FpVar<Fr>,
    pub has_previous: Boolean<Fr>,
}

impl TickAccumulatorVar {
    pub fn zero() -> Self {
        Self {
            previous_tick: FpVar::zero(),
            sum: FpVar::zero(),
            count: FpVar::zero(),
            sum_of_squares: FpVar::zero(),
            has_previous: Boolean::constant(false),
        }
    }
}

impl CondSelectGadget<Fr> for TickAccumulatorVar {
    fn conditionally_select(cond: &Boolean<Fr>, t: &Self, f: &Self) -> Result<Self, SynthesisError> {
        Ok(Self {
            previous_tick: cond.select(&t.previous_tick, &f.previous_tick)?,
            sum: cond.select(&t.sum, &f.sum)?,
            count: cond.select(&t.count, &f.count)?,
            sum_of_squares: cond.select(&t.sum_of_squares, &f.sum_of_squares)?,
            has_previous: cond.select(&t.has_previous, &f.has_previous)?,
        })
    }
}

fn tick_variation(curr: &FpVar<Fr>, previous: &FpVar<Fr>, scale: &FpVar<Fr>) -> Result<FpVar<Fr>, SynthesisError> {
    gadgets::div_rem(&(curr * scale), previous).map(|(q, _)| q)
}

pub fn delta_step_var(
    acc: &TickAccumulatorVar,
    curr: &FpVar<Fr>,
    scale: &FpVar<Fr>,
) -> Result<TickAccumulatorVar, SynthesisError> {
    let variation = tick_variation(curr, &acc.previous_tick, scale)?;
    let counted = &acc.has_previous;
    Ok(TickAccumulatorVar {
        previous_tick: curr.clone(),
        sum: counted.select(&(&acc.sum + &variation), &acc.sum)?,
        count: counted.select(&(&acc.count + FpVar::one()), &acc.count)?,
        sum_of_squares: acc.sum_of_squares.clone(),
        has_previous: Boolean::constant(true),
    })
}

pub fn variance_step_var(
    acc: &TickAccumulatorVar,
    curr: &FpVar<Fr>,
    scale: &FpVar<Fr>,
    mean: &FpVar<Fr>,
) -> Result<TickAccumulatorVar, SynthesisError> {
    let variation = tick_variation(curr, &acc.previous_tick, scale)?;
    let residual = &variation - mean;
    let counted = &acc.has_previous;
    Ok(TickAccumulatorVar {
        previous_tick: curr.clone(),
        sum: acc.sum.clone(),
        count: counted.select(&(&acc.count + FpVar::one()), &acc.count)?,
        sum_of_squares: counted.select(&(&acc.sum_of_squares + &residual * &residual), &acc.sum_of_squares)?,
        has_previous: Boolean::constant(true),
    })
}

#[derive(Clone, Debug)]
pub struct MinAccumulatorVar {
    pub min: FpVar<Fr>,
    pub seen: Boolean<Fr>,
}

impl CondSelectGadget<Fr> for MinAccumulatorVar {
    fn conditionally_select(cond: &Boolean<Fr>, t: &Self, f: &Self) -> Result<Self, SynthesisError> {
        Ok(Self { min: cond.select(&t.min, &f.min)?, seen: cond.select(&t.seen, &f.seen)? })
    }
}

fn allocate_stream<const N: usize>(
    cs: &ConstraintSystemRef<Fr>,
    records: &[Record],
    live: &[bool],
) -> Result<(Vec<RecordVar>, Vec<Boolean<Fr>>), SynthesisError> {
    if records.len() != N || live.len() != N {
        return Err(SynthesisError::Unsatisfiable);
    }
    let record_vars = records
        .iter()
        .map(|r| RecordVar::new_witness(cs.clone(), r))
        .collect::<Result<Vec<_>, _>>()?;
    let live_vars = live
        .iter()
        .map(|l| Boolean::new_witness(cs.clone(), || Ok(*l)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((record_vars, live_vars))
}

/// Enforce that `computed` equals the public input and fits its published width.
fn enforce_output(computed: &FpVar<Fr>, public: &FpVar<Fr>, bits: u16) -> Result<(), SynthesisError> {
    constrain_bits(computed, bits as usize)?;
    computed.enforce_equal(public)
}

/// Circuit proving the std of consecutive tick ratios of one pool's swaps.
#[derive(Clone, Debug)]
pub struct VolatilityCircuit<const N: usize> {
    pub config: VolatilityConfig,

    /// Private stream slots and their liveness.
    pub records: Vec<Record>,
    pub live: Vec<bool>,

    /// Public inputs.
    pub public_commitment: Fr,
    pub public_std: Uint248,
}

impl<const N: usize> ConstraintSynthesizer<Fr> for VolatilityCircuit<N> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // IMPORTANT: public input ordering MUST match `groth16::public_inputs_to_field_elems`.
        // We use: commitment, std.
        let public_commitment = FpVar::new_input(cs.clone(), || Ok(self.public_commitment))?;
        let public_std = FpVar::new_input(cs.clone(), || Ok(self.public_std.to_fr()))?;

        let (records, live) = allocate_stream::<N>(&cs, &self.records, &self.live)?;

        let commitment = stream_commitment_var(cs.clone(), &records, &live)?;
        commitment.enforce_equal(&public_commitment)?;

        let cfg = self.config;
        let pool_address = FpVar::constant(cfg.pool_address_uint().to_fr());
        let stream = StreamVar::new(records, live)?.filter(|r| {
            let sender = r.fields[1].to_uint248()?;
            Boolean::kary_and(&[
                r.event_id.is_eq_word(&cfg.event_id)?,
                r.fields[0].is_eq_word(&cfg.pool_id)?,
                sender.is_eq(&pool_address)?,
            ])
        })?;

        let ticks = stream.map(&FpVar::zero(), |r| r.fields[2].to_uint248())?;
        let scale = FpVar::constant(cfg.scale_uint().to_fr());

        let first = ticks.reduce(TickAccumulatorVar::zero(), |acc, tick| delta_step_var(acc, tick, &scale))?;
        let (mean, _) = gadgets::div_rem(&first.sum, &first.count)?;

        let second = ticks.reduce(TickAccumulatorVar::zero(), |acc, tick| variance_step_var(acc, tick, &scale, &mean))?;
        let (variance, _) = gadgets::div_rem(&second.sum_of_squares, &first.count)?;
        let std = gadgets::sqrt(&variance)?;

        enforce_output(&std, &public_std, OUTPUT_BITS_UINT)
    }
}

/// Circuit proving how many events a user emitted and the earliest block among them.
#[derive(Clone, Debug)]
pub struct ActivityCircuit<const N: usize> {
    pub config: ActivityConfig,

    pub records: Vec<Record>,
    pub live: Vec<bool>,

    pub public_commitment: Fr,
    pub public_count: Uint248,
    pub public_min_block_num: Uint248,
    pub public_user: Uint248,
}

impl<const N: usize> ConstraintSynthesizer<Fr> for ActivityCircuit<N> {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Ordering: commitment, count, min_block_num, user.
        let public_commitment = FpVar::new_input(cs.clone(), || Ok(self.public_commitment))?;
        let public_count = FpVar::new_input(cs.clone(), || Ok(self.public_count.to_fr()))?;
        let public_min = FpVar::new_input(cs.clone(), || Ok(self.public_min_block_num.to_fr()))?;
        let public_user = FpVar::new_input(cs.clone(), || Ok(self.public_user.to_fr()))?;

        let (records, live) = allocate_stream::<N>(&cs, &self.records, &self.live)?;

        let commitment = stream_commitment_var(cs.clone(), &records, &live)?;
        commitment.enforce_equal(&public_commitment)?;

        let cfg = self.config;
        let stream = StreamVar::new(records, live)?.filter(|r| {
            let user = r.fields[0].to_uint248()?;
            Boolean::kary_and(&[r.event_id.is_eq_word(&cfg.event_id)?, user.is_eq(&public_user)?])
        })?;

        let zero = FpVar::zero();
        let existing = stream.map(&zero, |_| Ok(FpVar::one()))?;
        let block_nums = stream.map(&zero, |r| Ok(r.block_num.clone()))?;

        let count = existing.reduce(FpVar::zero(), |acc, one| Ok(acc + one))?;
        let min = block_nums.reduce(
            MinAccumulatorVar { min: FpVar::zero(), seen: Boolean::constant(false) },
            |acc, block| {
                let smaller = gadgets::min(&acc.min, block, OUTPUT_BITS_BLOCK_NUM as usize)?;
                Ok(MinAccumulatorVar { min: acc.seen.select(&smaller, block)?, seen: Boolean::constant(true) })
            },
        )?;

        enforce_output(&count, &public_count, OUTPUT_BITS_UINT)?;
        enforce_output(&min.min, &public_min, OUTPUT_BITS_BLOCK_NUM)?;
        constrain_bits(&public_user, OUTPUT_BITS_ADDRESS as usize)?;
        Ok(())
    }
}
