//! ZK layer for verifiable on-chain event statistics.
//!
//! This crate contains:
//! - A fixed-capacity filter / map / reduce engine over log records, with a native field
//!   arithmetic unit and its in-circuit mirror.
//! - Statistics pipelines (tick volatility; per-user event count and earliest block) and the
//!   SNARK circuits that prove them.
//! - Prover + verifier orchestration and serialization helpers for transporting proofs.
//! - A volatility forecaster fed by proven std values.

pub mod circuit;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod errors;
pub mod field;
pub mod forecast;
pub mod gadgets;
pub mod groth16;
pub mod output;
pub mod stats;
pub mod stream;
pub mod types;
