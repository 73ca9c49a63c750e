use obscura_core::seed::Seed;
use obscura_transform::MathObfuscator;
use obscura_transform::math_obfuscator::{ChoiceSource, PerFunctionRng};
use rand::RngCore;

const SEED: &str = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";

#[test]
fn test_deterministic_rng() {
    let seed = Seed::from_hex(SEED).unwrap();

    let mut rng1 = seed.create_deterministic_rng();
    let mut rng2 = seed.create_deterministic_rng();

    assert_eq!(rng1.next_u32(), rng2.next_u32());
    assert_eq!(rng1.next_u64(), rng2.next_u64());
}

#[test]
fn test_hash_deterministic() {
    let seed = Seed::from_hex(SEED).unwrap();
    assert_eq!(seed.hash(), seed.hash());

    let hash_hex = seed.hash_hex();
    assert!(hash_hex.starts_with("0x"));
    assert_eq!(hash_hex.len(), 66);
    assert_ne!(hash_hex, seed.to_hex());
}

#[test]
fn test_different_seeds_different_rngs() {
    let seed1 = Seed::from_hex(&"11".repeat(32)).unwrap();
    let seed2 = Seed::from_hex(&"22".repeat(32)).unwrap();

    let mut rng1 = seed1.create_deterministic_rng();
    let mut rng2 = seed2.create_deterministic_rng();

    assert_ne!(rng1.next_u64(), rng2.next_u64());
}

#[test]
fn test_seed_serde_round_trip() {
    let seed = Seed::from_hex(SEED).unwrap();
    let json = serde_json::to_string(&seed).unwrap();
    let back: Seed = serde_json::from_str(&json).unwrap();
    assert_eq!(back, seed);
}

#[test]
fn test_generated_seeds_differ() {
    assert_ne!(Seed::generate(), Seed::generate());
}

#[test]
fn test_per_function_streams_depend_only_on_name() {
    let seed = Seed::from_hex(SEED).unwrap();
    let picks = |order: &[&str]| {
        let mut source = PerFunctionRng::new(seed.clone());
        let mut out = Vec::new();
        for name in order {
            source.enter_function(name);
            out.push((name.to_string(), (0..8).map(|_| source.choose(3)).collect::<Vec<_>>()));
        }
        out.sort();
        out
    };
    assert_eq!(picks(&["alpha", "beta"]), picks(&["beta", "alpha"]));
}

#[test]
fn test_engine_from_seed_is_reproducible() {
    let seed = Seed::from_hex(SEED).unwrap();
    let text = obscura_tests::ARITH;
    let run = || {
        let mut module = obscura_tests::module(text);
        let mut engine = MathObfuscator::from_seed(&seed);
        for func in &mut module.functions {
            engine.run(func).unwrap();
        }
        module.to_string()
    };
    assert_eq!(run(), run());
}
