//! Statistics pipelines built from the stream stages.
//!
//! Two pipelines are provided:
//! - volatility: filter swaps of one pool, project the tick, then a two-pass fold computing the
//!   mean and standard deviation of the scaled ratio between consecutive ticks;
//! - activity: filter one user's events, then count them and find the earliest block.
//!
//! Degenerate inputs use fixed sentinels: with no variation recorded (zero or one live record)
//! mean, variance and std are 0, and the minimum of an empty stream is 0.

use crate::config::{ActivityConfig, VolatilityConfig};
use crate::constants::{OUTPUT_BITS_ADDRESS, OUTPUT_BITS_BLOCK_NUM, OUTPUT_BITS_UINT};
use crate::errors::{ArithmeticError, PipelineError};
use crate::field::Uint248;
use crate::output::OutputSink;
use crate::stream::DataStream;
use crate::types::{OutputValue, Record, Word};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fold state shared by both passes of the delta statistics.
///
/// `has_previous` records whether a live value has been seen; the first live slot only seeds
/// `previous_tick`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickAccumulator {
    pub previous_tick: Uint248,
    pub sum: Uint248,
    pub count: Uint248,
    pub sum_of_squares: Uint248,
    pub has_previous: bool,
}

/// `curr * scale / previous`, with the zero-divisor sentinel.
pub fn tick_variation(curr: Uint248, previous: Uint248, scale: Uint248) -> Result<Uint248, ArithmeticError> {
    curr.mul(scale).div(previous)
}

/// First pass: running sum and count of variations.
pub fn delta_step(acc: &TickAccumulator, curr: Uint248, scale: Uint248) -> Result<TickAccumulator, ArithmeticError> {
    let variation = tick_variation(curr, acc.previous_tick, scale)?;
    let counted = acc.has_previous;
    Ok(TickAccumulator {
        previous_tick: curr,
        sum: Uint248::select(counted, acc.sum.add(variation), acc.sum),
        count: Uint248::select(counted, acc.count.add(Uint248::one()), acc.count),
        sum_of_squares: acc.sum_of_squares,
        has_previous: true,
    })
}

/// Second pass: running sum of squared residuals from `mean`.
pub fn variance_step(
    acc: &TickAccumulator,
    curr: Uint248,
    scale: Uint248,
    mean: Uint248,
) -> Result<TickAccumulator, ArithmeticError> {
    let variation = tick_variation(curr, acc.previous_tick, scale)?;
    let residual = variation.sub(mean);
    let counted = acc.has_previous;
    Ok(TickAccumulator {
        previous_tick: curr,
        sum: acc.sum,
        count: Uint248::select(counted, acc.count.add(Uint248::one()), acc.count),
        sum_of_squares: Uint248::select(counted, acc.sum_of_squares.add(residual.mul(residual)), acc.sum_of_squares),
        has_previous: true,
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaStats {
    /// Number of variations (live records minus one, or zero).
    pub count: Uint248,
    pub sum: Uint248,
    pub mean: Uint248,
    pub sum_of_squares: Uint248,
    pub variance: Uint248,
    pub std: Uint248,
}

/// Two-pass mean / variance / std over consecutive tick ratios.
pub fn delta_statistics<const N: usize>(
    ticks: &DataStream<Uint248, N>,
    scale: Uint248,
) -> Result<DeltaStats, ArithmeticError> {
    let first = ticks.reduce(TickAccumulator::default(), |acc, tick| delta_step(acc, *tick, scale))?;
    let mean = first.sum.div(first.count)?;

    let second = ticks.reduce(TickAccumulator::default(), |acc, tick| variance_step(acc, *tick, scale, mean))?;
    let variance = second.sum_of_squares.div(first.count)?;
    let std = variance.sqrt()?;

    Ok(DeltaStats {
        count: first.count,
        sum: first.sum,
        mean,
        sum_of_squares: second.sum_of_squares,
        variance,
        std,
    })
}

/// Minimum fold state; the first live value seeds `min`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinAccumulator {
    pub min: Uint248,
    pub seen: bool,
}

pub fn min_step(acc: &MinAccumulator, value: Uint248) -> Result<MinAccumulator, ArithmeticError> {
    let smaller = acc.min.min(value)?;
    Ok(MinAccumulator { min: Uint248::select(acc.seen, smaller, value), seen: true })
}

pub fn min_of<const N: usize>(values: &DataStream<Uint248, N>) -> Result<Uint248, ArithmeticError> {
    values.reduce(MinAccumulator::default(), |acc, v| min_step(acc, *v)).map(|acc| acc.min)
}

fn word_eq(a: &Word, b: &Word) -> Uint248 {
    Uint248::from_bool(a == b)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolatilityReport {
    pub live_records: usize,
    pub stats: DeltaStats,
    /// `[std: 248]`.
    pub outputs: Vec<OutputValue>,
}

#[derive(Clone, Debug)]
pub struct VolatilityPipeline<const N: usize> {
    config: VolatilityConfig,
}

impl<const N: usize> VolatilityPipeline<N> {
    pub fn new(config: VolatilityConfig) -> Self {
        Self { config }
    }

    /// Swap event of the configured pool, emitted through the configured pool address.
    pub fn predicate(&self, record: &Record) -> Uint248 {
        Uint248::and(&[
            word_eq(&record.event_id, &self.config.event_id),
            word_eq(&record.fields[0], &self.config.pool_id),
            record.fields[1].to_uint248().is_equal(self.config.pool_address_uint()),
        ])
    }

    pub fn filter(&self, stream: DataStream<Record, N>) -> DataStream<Record, N> {
        stream.filter(|r| self.predicate(r))
    }

    pub fn project_ticks(stream: &DataStream<Record, N>) -> DataStream<Uint248, N> {
        stream.map(|r| r.fields[2].to_uint248())
    }

    pub fn run(&self, stream: DataStream<Record, N>) -> Result<VolatilityReport, PipelineError> {
        let filtered = self.filter(stream);
        let ticks = Self::project_ticks(&filtered);
        let stats = delta_statistics(&ticks, self.config.scale_uint())?;

        let mut sink = OutputSink::new();
        sink.output_uint(OUTPUT_BITS_UINT, stats.std)?;

        debug!(live = filtered.live_count(), count = %stats.count, std = %stats.std, "volatility pipeline done");
        Ok(VolatilityReport { live_records: filtered.live_count(), stats, outputs: sink.into_values() })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityReport {
    /// Records that passed the user filter.
    pub live_records: usize,
    pub count: Uint248,
    pub min_block_num: Uint248,
    /// `[count: 248, min_block_num: 64, user: 160]`.
    pub outputs: Vec<OutputValue>,
}

#[derive(Clone, Debug)]
pub struct ActivityPipeline<const N: usize> {
    config: ActivityConfig,
}

impl<const N: usize> ActivityPipeline<N> {
    pub fn new(config: ActivityConfig) -> Self {
        Self { config }
    }

    pub fn predicate(&self, record: &Record, user: Uint248) -> Uint248 {
        Uint248::and(&[
            word_eq(&record.event_id, &self.config.event_id),
            record.fields[0].to_uint248().is_equal(user),
        ])
    }

    pub fn filter(&self, stream: DataStream<Record, N>, user: &Word) -> DataStream<Record, N> {
        let user = user.to_uint248();
        stream.filter(|r| self.predicate(r, user))
    }

    pub fn run(&self, stream: DataStream<Record, N>, user: &Word) -> Result<ActivityReport, PipelineError> {
        let filtered = self.filter(stream, user);

        // Independent passes over the same liveness mask.
        let block_nums = filtered.map(|r| Uint248::from_u64(r.block_num));
        let count = filtered.map(|_| Uint248::one()).sum();
        let min_block_num = min_of(&block_nums)?;

        let mut sink = OutputSink::new();
        sink.output_uint(OUTPUT_BITS_UINT, count)?;
        sink.output_uint(OUTPUT_BITS_BLOCK_NUM, min_block_num)?;
        sink.output_uint(OUTPUT_BITS_ADDRESS, user.to_uint248())?;

        debug!(%count, %min_block_num, "activity pipeline done");
        Ok(ActivityReport { live_records: filtered.live_count(), count, min_block_num, outputs: sink.into_values() })
    }
}
