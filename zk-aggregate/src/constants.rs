//! Crate-wide constants used by the circuits, the native pipeline and host-side orchestration.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::{find_poseidon_ark_and_mds, PoseidonConfig};
use ark_ff::PrimeField;

/// Default number of record slots per stream.
///
/// A compiled circuit always processes exactly this many slots; unused slots are padding.
pub const DEFAULT_CAPACITY: usize = 32;

/// Bit width of the integer domain the arithmetic unit operates in.
pub const UINT248_BITS: usize = 248;

/// Largest value whose square root fits the sqrt gadget's witness range.
pub const SQRT_BITS: usize = UINT248_BITS / 2;

/// Width of a limb when a 32-byte word is split for the circuit.
pub const LIMB_BITS: usize = 128;

/// Number of indexed/data fields carried by each record after the event identifier.
pub const RECORD_FIELDS: usize = 3;

/// Fixed-point multiplier applied before dividing consecutive ticks.
pub const TICK_SCALE: u64 = 10_000_000;

/// Output widths. Part of the public interface: changing one breaks verifiers.
pub const OUTPUT_BITS_UINT: u16 = 248;
pub const OUTPUT_BITS_BLOCK_NUM: u16 = 64;
pub const OUTPUT_BITS_ADDRESS: u16 = 160;

/// Published output layout of each circuit, in order.
pub const VOLATILITY_OUTPUT_BITS: [u16; 1] = [OUTPUT_BITS_UINT];
pub const ACTIVITY_OUTPUT_BITS: [u16; 3] = [OUTPUT_BITS_UINT, OUTPUT_BITS_BLOCK_NUM, OUTPUT_BITS_ADDRESS];

/// `Swap(PoolId indexed id, address indexed sender, ...)` topic0.
pub const SWAP_EVENT_ID: &str = "0xc42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67";

/// Pool manager that emits the swaps we track.
pub const SWAP_POOL_ADDRESS: &str = "0xEf1c6E67703c7BD7107eed8303Fbe6EC2554BF6B";

/// Pool id of the default tracked pool.
pub const SWAP_POOL_ID: &str = "0x9adbefe3f238ee484d264492f59ec821d3f0b665750140ee12c0c19f4f2af2b7";

/// `BuyBottle(address indexed user, uint256 tokenId)` topic0.
pub const BUY_BOTTLE_EVENT_ID: &str = "0x822cd8cda2d2b3feb2339ab2e79a3b336b792f0a912867901e963e928afd3be8";

/// Number of volatility observations the forecaster keeps.
pub const FORECAST_WINDOW: usize = 20;

/// Linear model coefficients, scaled by `TICK_SCALE`, oldest observation first.
pub const FORECAST_COEFFICIENTS: [i64; FORECAST_WINDOW] = [
    -146_693, 5_476, -132_090, 80_985, -61_377, -18_760, 113_246, -115_346, 42_895, -54_885,
    94_450, -69_297, 144_672, -83_620, -178_140, -19_045, 55_406, 62_330, -441_246, 10_240_533,
];

// Poseidon sponge configuration.
//
// Width-3 sponge (rate=2, capacity=1) so limb pairs are absorbed per permutation.
pub const POSEIDON_RATE: usize = 2;
pub const POSEIDON_CAPACITY: usize = 1;

pub const POSEIDON_FULL_ROUNDS: usize = 8;
pub const POSEIDON_PARTIAL_ROUNDS: usize = 57;

/// Poseidon S-box exponent (alpha).
pub const POSEIDON_ALPHA: u64 = 5;

/// Deterministically derive Poseidon parameters for BN254::Fr.
///
/// Both the native stream commitment and the in-circuit gadget use this, so they agree on the
/// same round constants and MDS matrix.
pub fn poseidon_config() -> PoseidonConfig<Fr> {
    let prime_bits = Fr::MODULUS_BIT_SIZE as u64;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        prime_bits,
        POSEIDON_RATE,
        POSEIDON_FULL_ROUNDS as u64,
        POSEIDON_PARTIAL_ROUNDS as u64,
        0,
    );

    PoseidonConfig::new(
        POSEIDON_FULL_ROUNDS,
        POSEIDON_PARTIAL_ROUNDS,
        POSEIDON_ALPHA,
        mds,
        ark,
        POSEIDON_RATE,
        POSEIDON_CAPACITY,
    )
}
