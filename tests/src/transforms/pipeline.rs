use obscura_core::seed::Seed;
use obscura_core::validator::validate_module;
use obscura_transform::function_names::FunctionNames;
use obscura_transform::obfuscator::{ObfuscationConfig, Seeding, obfuscate_module, obfuscate_source};
use obscura_transform::pass::{FunctionPassManager, PassRegistry, PreservedAnalyses};
use obscura_transform::{Error, Transform};
use obscura_tests::{ARITH, LOOP, MEMORY, init_tracing, module};

fn seed() -> Seed {
    Seed::from_hex("0x9a8b7c6d5e4f30211203f4e5d6c7b8a99a8b7c6d5e4f30211203f4e5d6c7b8a9").unwrap()
}

fn all_fixtures() -> String {
    [ARITH, MEMORY, LOOP].join("\n")
}

#[test]
fn test_registry_names_resolve() {
    let registry = PassRegistry::new(seed());
    for name in PassRegistry::NAMES {
        assert_eq!(registry.create(name).unwrap().name(), *name);
    }
    assert!(matches!(registry.create("math_obfuscator"), Err(Error::UnknownPass(_))));
}

#[test]
fn test_diagnostic_pass_preserves_everything() {
    let mut module = module(&all_fixtures());
    let before = module.to_string();
    let mut manager = FunctionPassManager::new();
    manager.add_pass(Box::new(FunctionNames::new()));
    for func in &mut module.functions {
        assert_eq!(manager.run(func).unwrap(), PreservedAnalyses::All);
    }
    assert_eq!(module.to_string(), before);
}

#[test]
fn test_full_pipeline_report() {
    init_tracing();
    let config = ObfuscationConfig {
        pipeline: "function-names,math-obfuscator".into(),
        ..ObfuscationConfig::with_seed(seed())
    };
    let (module, result) = obfuscate_source(&all_fixtures(), &config).unwrap();
    validate_module(&module).unwrap();

    assert_eq!(result.pipeline, ["function-names", "math-obfuscator"]);
    assert_eq!(result.functions.len(), 4);
    assert!(result.functions.iter().all(|f| f.modified));
    assert!(result.modified());

    let counted: usize = result.functions.iter().map(|f| f.instructions_after).sum();
    assert_eq!(counted, module.instruction_count());

    for record in &result.rewrites {
        assert!(module.function(&record.function).is_ok());
        assert!(record.identity.contains(" → "), "{}", record.identity);
    }

    let json = serde_json::to_string(&result).unwrap();
    let back: obscura_transform::obfuscator::ObfuscationResult =
        serde_json::from_str(&json).unwrap();
    assert_eq!(back.rewrites, result.rewrites);
    assert_eq!(back.seed, seed().to_hex());
}

#[test]
fn test_same_seed_byte_identical_output() {
    let config = ObfuscationConfig::with_seed(seed());
    let (a, ra) = obfuscate_source(&all_fixtures(), &config).unwrap();
    let (b, rb) = obfuscate_source(&all_fixtures(), &config).unwrap();
    assert_eq!(a.to_string(), b.to_string());
    assert_eq!(ra.rewrites, rb.rewrites);
}

#[test]
fn test_per_function_seeding_is_order_independent() {
    let config = ObfuscationConfig {
        seeding: Seeding::PerFunction,
        ..ObfuscationConfig::with_seed(seed())
    };
    let mut forward = module(&all_fixtures());
    obfuscate_module(&mut forward, &config).unwrap();

    let mut backward = module(&all_fixtures());
    backward.functions.reverse();
    obfuscate_module(&mut backward, &config).unwrap();

    for func in &forward.functions {
        assert_eq!(func.to_string(), backward.function(&func.name).unwrap().to_string());
    }
}

#[test]
fn test_sound_only_report_has_no_flagged_rewrites() {
    let config = ObfuscationConfig {
        sound_only: true,
        ..ObfuscationConfig::with_seed(seed())
    };
    let (_, result) = obfuscate_source(&all_fixtures(), &config).unwrap();
    assert!(result.sound_only);
    assert_eq!(result.unsound_rewrites(), 0);
    assert!(!result.rewrites.is_empty());
}

#[test]
fn test_bad_pipelines_fail_before_touching_ir() {
    let mut module = module(ARITH);
    let before = module.to_string();
    for pipeline in ["", "math-obfuscator,nope"] {
        let config = ObfuscationConfig {
            pipeline: pipeline.into(),
            ..ObfuscationConfig::with_seed(seed())
        };
        assert!(obfuscate_module(&mut module, &config).is_err());
    }
    assert_eq!(module.to_string(), before);
}
