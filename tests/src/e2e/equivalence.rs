//! Rewritten functions compute what the originals compute, checked in the interpreter.

use obscura_core::eval::{Machine, RuntimeValue};
use obscura_core::seed::Seed;
use obscura_core::validator::validate_function;
use obscura_core::{Function, Module};
use obscura_transform::math_obfuscator::{FixedChoice, MathConfig, MathObfuscator};
use obscura_transform::obfuscator::{ObfuscationConfig, obfuscate_module};
use obscura_tests::{ARITH, LOOP, MEMORY, call_int, edge_values, function, init_tracing, module};

const SOUND: MathConfig = MathConfig { sound_only: true };

fn fixtures() -> Module {
    module(&[ARITH, MEMORY, LOOP].join("\n"))
}

/// Every function of `original` and `rewritten` agrees on a grid of inputs. Inputs on which the
/// original traps are skipped.
fn assert_same_behaviour(original: &Module, rewritten: &Module) {
    for before in &original.functions {
        let after = function(rewritten, &before.name);
        validate_function(after).unwrap();
        match before.name.as_str() {
            "arith" => {
                for a in edge_values(32) {
                    for b in edge_values(32) {
                        let Some(expected) = call_int(before, 32, &[a, b]) else {
                            continue;
                        };
                        assert_eq!(call_int(after, 32, &[a, b]), Some(expected), "arith({a}, {b})");
                    }
                }
            }
            "memory" => {
                for p in edge_values(64) {
                    for q in edge_values(64) {
                        assert_eq!(run_memory(before, p, q), run_memory(after, p, q), "memory({p}, {q})");
                    }
                }
            }
            "triangle" => {
                for n in [-5, 0, 1, 2, 17, 300] {
                    assert_eq!(call_int(before, 64, &[n]), call_int(after, 64, &[n]), "triangle({n})");
                }
            }
            "scale" => {
                for (x, k) in [(0.0, 0), (1.5, 3), (-2.25, -128), (1e10, 127)] {
                    let args = [RuntimeValue::Float(x), RuntimeValue::int(8, k)];
                    let expected = Machine::new().call(before, &args).unwrap();
                    assert_eq!(Machine::new().call(after, &args).unwrap(), expected);
                }
            }
            other => panic!("no inputs for @{other}"),
        }
    }
}

fn run_memory(func: &Function, p: i64, q: i64) -> (i64, i64) {
    let mut machine = Machine::new();
    let p = machine.alloc(RuntimeValue::int(64, p));
    let q = machine.alloc(RuntimeValue::int(64, q));
    let out = machine.call(func, &[p, q]).unwrap().as_i64().unwrap();
    let stored = machine.read(q).unwrap().as_i64().unwrap();
    (out, stored)
}

#[test]
fn test_every_fixed_index_preserves_behaviour() {
    init_tracing();
    let original = fixtures();
    for index in 0..3 {
        let mut rewritten = original.clone();
        let mut engine = MathObfuscator::with_source(FixedChoice(index)).with_config(SOUND);
        for func in &mut rewritten.functions {
            engine.run(func).unwrap();
        }
        assert_same_behaviour(&original, &rewritten);
    }
}

#[test]
fn test_seeded_pipeline_preserves_behaviour() {
    let original = fixtures();
    for byte in 0u8..16 {
        let seed = Seed::from_hex(&format!("{byte:02x}").repeat(32)).unwrap();
        let config = ObfuscationConfig {
            sound_only: true,
            ..ObfuscationConfig::with_seed(seed)
        };
        let mut rewritten = original.clone();
        let result = obfuscate_module(&mut rewritten, &config).unwrap();
        assert!(result.modified());
        assert_same_behaviour(&original, &rewritten);
    }
}

#[test]
fn test_obfuscating_twice_still_preserves_behaviour() {
    let original = fixtures();
    let mut rewritten = original.clone();
    let seed = Seed::from_hex(&"5a".repeat(32)).unwrap();
    let mut engine = MathObfuscator::from_seed(&seed).with_config(SOUND);
    for _ in 0..2 {
        for func in &mut rewritten.functions {
            engine.run(func).unwrap();
        }
    }
    assert!(rewritten.instruction_count() > original.instruction_count());
    assert_same_behaviour(&original, &rewritten);
}

#[test]
fn test_flagged_rules_change_results() {
    // Index 1 picks `(a ^ b) ^ (a ^ b)` for distinct adds, which is always zero.
    let original = module(ARITH);
    let mut rewritten = original.clone();
    MathObfuscator::with_source(FixedChoice(1))
        .run(&mut rewritten.functions[0])
        .unwrap();
    let (before, after) = (&original.functions[0], &rewritten.functions[0]);
    assert_ne!(call_int(before, 32, &[3, 4]), call_int(after, 32, &[3, 4]));
}
