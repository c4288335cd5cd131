use ark_bn254::Fr;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystem};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use zk_aggregate::circuit::{ActivityCircuit, VolatilityCircuit};
use zk_aggregate::config::{ActivityConfig, VolatilityConfig};
use zk_aggregate::field::Uint248;
use zk_aggregate::groth16::{
    compute_activity, compute_volatility, deserialize_proof, deserialize_vk, prove_activity,
    prove_volatility, serialize_proof, serialize_vk, setup_activity_keys, setup_volatility_keys,
    verify_proof, ZkError,
};
use zk_aggregate::stream::DataStream;
use zk_aggregate::types::{Record, Word};

const N: usize = 6;

fn swap(cfg: &VolatilityConfig, block: u64, tick: u64) -> Record {
    Record {
        block_num: block,
        event_id: cfg.event_id,
        fields: [cfg.pool_id, cfg.pool_address, Word::from_u64(tick)],
    }
}

fn user() -> Word {
    Word::from_hex("user", "0x2e234DAe75C793f67A35089C9d99245E1C58470b").unwrap()
}

fn buy(cfg: &ActivityConfig, block: u64, buyer: Word) -> Record {
    Record { block_num: block, event_id: cfg.event_id, fields: [buyer, Word::from_u64(1), Word::ZERO] }
}

fn volatility_stream(cfg: &VolatilityConfig) -> DataStream<Record, N> {
    let mut other_pool = swap(cfg, 12, 999);
    other_pool.fields[0] = Word::from_u64(1);
    DataStream::from_live(vec![
        swap(cfg, 10, 200),
        other_pool,
        swap(cfg, 14, 210),
        swap(cfg, 15, 190),
        swap(cfg, 19, 205),
    ])
    .unwrap()
}

fn volatility_circuit(cfg: &VolatilityConfig, stream: &DataStream<Record, N>, std: Uint248) -> VolatilityCircuit<N> {
    let (commitment, _) = compute_volatility(cfg, stream).unwrap();
    VolatilityCircuit {
        config: *cfg,
        records: stream.slots().to_vec(),
        live: stream.liveness().to_vec(),
        public_commitment: commitment,
        public_std: std,
    }
}

#[test]
fn volatility_circuit_accepts_native_std() {
    let cfg = VolatilityConfig::default();
    let stream = volatility_stream(&cfg);
    let (_, report) = compute_volatility(&cfg, &stream).unwrap();
    assert_eq!(report.live_records, 4);
    assert_eq!(report.stats.count, Uint248::from_u64(3));
    assert!(!report.stats.std.is_zero());

    let cs = ConstraintSystem::<Fr>::new_ref();
    volatility_circuit(&cfg, &stream, report.stats.std).generate_constraints(cs.clone()).unwrap();
    assert!(cs.is_satisfied().unwrap());
}

#[test]
fn volatility_circuit_rejects_wrong_std() {
    let cfg = VolatilityConfig::default();
    let stream = volatility_stream(&cfg);
    let (_, report) = compute_volatility(&cfg, &stream).unwrap();

    let cs = ConstraintSystem::<Fr>::new_ref();
    let wrong = report.stats.std.add(Uint248::one());
    volatility_circuit(&cfg, &stream, wrong).generate_constraints(cs.clone()).unwrap();
    assert!(!cs.is_satisfied().unwrap());
}

#[test]
fn volatility_circuit_handles_degenerate_streams() {
    let cfg = VolatilityConfig::default();
    for stream in [
        DataStream::<Record, N>::from_live(vec![]).unwrap(),
        DataStream::<Record, N>::from_live(vec![swap(&cfg, 3, 400)]).unwrap(),
        DataStream::<Record, N>::from_live(vec![swap(&cfg, 3, 0), swap(&cfg, 4, 7)]).unwrap(),
    ] {
        let (_, report) = compute_volatility(&cfg, &stream).unwrap();
        assert_eq!(report.stats.std, Uint248::zero());
        let cs = ConstraintSystem::<Fr>::new_ref();
        volatility_circuit(&cfg, &stream, report.stats.std).generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}

#[test]
fn constraint_count_is_independent_of_live_records() {
    let cfg = VolatilityConfig::default();
    let full = volatility_stream(&cfg);
    let empty = DataStream::<Record, N>::from_live(vec![]).unwrap();

    let mut counts = Vec::new();
    for stream in [&full, &empty] {
        let (_, report) = compute_volatility(&cfg, stream).unwrap();
        let cs = ConstraintSystem::<Fr>::new_ref();
        volatility_circuit(&cfg, stream, report.stats.std).generate_constraints(cs.clone()).unwrap();
        counts.push(cs.num_constraints());
    }
    assert_eq!(counts[0], counts[1]);
}

fn activity_circuit(cfg: &ActivityConfig, stream: &DataStream<Record, N>) -> ActivityCircuit<N> {
    let (commitment, report) = compute_activity(cfg, stream, &user()).unwrap();
    ActivityCircuit {
        config: *cfg,
        records: stream.slots().to_vec(),
        live: stream.liveness().to_vec(),
        public_commitment: commitment,
        public_count: report.count,
        public_min_block_num: report.min_block_num,
        public_user: user().to_uint248(),
    }
}

#[test]
fn activity_circuit_handles_degenerate_streams() {
    let cfg = ActivityConfig::default();
    for stream in [
        DataStream::<Record, N>::from_live(vec![]).unwrap(),
        DataStream::<Record, N>::from_live(vec![buy(&cfg, 4, Word::from_u64(0xdead))]).unwrap(),
    ] {
        let (_, report) = compute_activity(&cfg, &stream, &user()).unwrap();
        assert_eq!(report.live_records, 0);
        assert_eq!(report.count, Uint248::zero());
        assert_eq!(report.min_block_num, Uint248::zero());

        let cs = ConstraintSystem::<Fr>::new_ref();
        activity_circuit(&cfg, &stream).generate_constraints(cs.clone()).unwrap();
        assert!(cs.is_satisfied().unwrap());
    }
}

#[test]
fn activity_circuit_counts_user_events() {
    let cfg = ActivityConfig::default();
    let stranger = Word::from_u64(0xdead);
    let stream = DataStream::<Record, N>::from_live(vec![
        buy(&cfg, 9, user()),
        buy(&cfg, 5, user()),
        buy(&cfg, 1, stranger),
        buy(&cfg, 20, user()),
    ])
    .unwrap();

    let (commitment, report) = compute_activity(&cfg, &stream, &user()).unwrap();
    assert_eq!(report.live_records, 3);
    assert_eq!(report.count, Uint248::from_u64(3));
    assert_eq!(report.min_block_num, Uint248::from_u64(5));
    assert_eq!(report.outputs.iter().map(|o| o.bits).collect::<Vec<_>>(), vec![248, 64, 160]);

    let circuit = ActivityCircuit::<N> {
        config: cfg,
        records: stream.slots().to_vec(),
        live: stream.liveness().to_vec(),
        public_commitment: commitment,
        public_count: report.count,
        public_min_block_num: report.min_block_num,
        public_user: user().to_uint248(),
    };

    let cs = ConstraintSystem::<Fr>::new_ref();
    circuit.clone().generate_constraints(cs.clone()).unwrap();
    assert!(cs.is_satisfied().unwrap());

    let cs = ConstraintSystem::<Fr>::new_ref();
    ActivityCircuit::<N> { public_min_block_num: Uint248::from_u64(1), ..circuit }
        .generate_constraints(cs.clone())
        .unwrap();
    assert!(!cs.is_satisfied().unwrap());
}

#[test]
fn volatility_groth16_round_trip() {
    const SMALL: usize = 3;
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let cfg = VolatilityConfig::default();
    let (pk, vk) = setup_volatility_keys::<SMALL>(&cfg, &mut rng).unwrap();

    let stream = DataStream::<Record, SMALL>::from_live(vec![swap(&cfg, 1, 100), swap(&cfg, 2, 130), swap(&cfg, 3, 90)])
        .unwrap();
    let (proof, commitment, report) = prove_volatility(&mut rng, &pk, &cfg, &stream).unwrap();

    let vk = deserialize_vk(&serialize_vk(&vk).unwrap()).unwrap();
    let proof = deserialize_proof(&serialize_proof(&proof).unwrap()).unwrap();
    verify_proof(&vk, &proof, commitment, &report.outputs).unwrap();

    let mut tampered = report.outputs.clone();
    tampered[0].value = tampered[0].value.add(Uint248::one());
    assert!(matches!(verify_proof(&vk, &proof, commitment, &tampered), Err(ZkError::VerificationFailed)));
}

#[test]
fn activity_groth16_round_trip() {
    const SMALL: usize = 2;
    let mut rng = ChaCha20Rng::seed_from_u64(11);
    let cfg = ActivityConfig::default();
    let (pk, vk) = setup_activity_keys::<SMALL>(&cfg, &mut rng).unwrap();

    let stream = DataStream::<Record, SMALL>::from_live(vec![buy(&cfg, 40, user()), buy(&cfg, 33, user())]).unwrap();
    let (proof, commitment, report) = prove_activity(&mut rng, &pk, &cfg, &stream, &user()).unwrap();
    assert_eq!(report.min_block_num, Uint248::from_u64(33));
    verify_proof(&vk, &proof, commitment, &report.outputs).unwrap();

    assert!(verify_proof(&vk, &proof, commitment + Fr::from(1u64), &report.outputs).is_err());
}

#[test]
fn repeated_runs_are_identical() {
    let cfg = VolatilityConfig::default();
    let stream = volatility_stream(&cfg);
    let (c1, r1) = compute_volatility(&cfg, &stream).unwrap();
    let (c2, r2) = compute_volatility(&cfg, &stream).unwrap();
    assert_eq!(c1, c2);
    assert_eq!(serde_json::to_string(&r1.outputs).unwrap(), serde_json::to_string(&r2.outputs).unwrap());
}
