use obscura_core::Function;
use obscura_core::eval::{Machine, RuntimeValue};
use obscura_core::parser::parse_function;
use obscura_core::validator::validate_function;
use obscura_transform::math_obfuscator::{
    FixedChoice, MathConfig, MathObfuscator, OperandPattern, classify,
};
use obscura_transform::{Soundness, Transform};
use obscura_tests::{ARITH, LOOP, MEMORY, init_tracing, module};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rule_ids(engine: &mut impl Transform) -> Vec<String> {
    engine.drain_records().into_iter().map(|r| r.rule).collect()
}

fn arith() -> Function {
    module(ARITH).functions.remove(0)
}

#[test]
fn test_golden_add_same_scenario() {
    init_tracing();
    let mut func = parse_function(
        "define i32 @g(i32 %x) {\nentry:\n  %r = add i32 %x, %x\n  %u = icmp eq i32 %r, 0\n  %v = xor i32 %r, 9\n  ret i32 %v\n}\n",
    )
    .unwrap();
    let r = func.lookup("r").unwrap();
    let consumers: Vec<_> = func.uses(r).iter().map(|u| u.user).collect();

    let mut engine = MathObfuscator::with_source(FixedChoice(2));
    assert!(engine.apply(&mut func).unwrap());

    let entry = func.entry().unwrap();
    let listing: Vec<_> = func
        .block_insts(entry)
        .iter()
        .map(|id| func.display_inst(*id))
        .collect();
    assert_eq!(
        listing,
        [
            "%t0 = mul i32 %x, 3",
            "%t1 = sub i32 %t0, %x",
            "%u = icmp eq i32 %t1, 0",
            "%v = xor i32 %t1, 9",
            "ret i32 %v",
        ]
    );
    assert!(!func.is_live(r));
    let t1 = func.lookup("t1").unwrap();
    for user in consumers {
        assert!(func.inst(user).unwrap().operands.contains(&t1));
    }
    validate_function(&func).unwrap();
}

#[test]
fn test_fixed_choice_over_arith_fixture() {
    init_tracing();
    let mut func = arith();
    let mut engine = MathObfuscator::with_source(FixedChoice(0));
    assert!(engine.apply(&mut func).unwrap());
    validate_function(&func).unwrap();

    assert_eq!(
        rule_ids(&mut engine),
        [
            "add-same-mul2",
            "add-diff-sub-neg",
            "sub-same-zero",
            "sub-diff-add-neg",
            "mul-same-shl1",
            "mul-diff-shl",
            "sdiv-same-one",
        ]
    );

    // %odd (x12), %prod (distinct) and %quot (distinct sdiv) survive untouched.
    for name in ["odd", "prod", "quot"] {
        assert!(func.lookup(name).is_some(), "%{name} should be kept");
    }
    for name in ["double", "sum", "zero", "diff", "sq", "scaled", "one"] {
        assert!(func.lookup(name).is_none(), "%{name} should be replaced");
    }
}

#[test]
fn test_sub_same_zero_rewires_to_constant() {
    let mut func = arith();
    MathObfuscator::with_source(FixedChoice(0))
        .apply(&mut func)
        .unwrap();
    let x1 = func.lookup("x1").unwrap();
    let zero_operand = func.inst(x1).unwrap().operands[1];
    assert_eq!(func.as_const_int(zero_operand), Some(0));
}

#[test]
fn test_same_load_source_is_rewritten_as_same() {
    let mut func = module(MEMORY).functions.remove(0);
    let mut engine = MathObfuscator::with_source(FixedChoice(1));
    engine.apply(&mut func).unwrap();
    let records = engine.drain_records();

    let same = records.iter().find(|r| r.original.starts_with("%same")).unwrap();
    assert_eq!(same.rule, "sub-same-xor");
    assert!(func.to_string().contains("xor i64 %l1, %l1"));

    let mixed = records.iter().find(|r| r.original.starts_with("%mixed")).unwrap();
    assert_eq!(mixed.rule, "add-diff-xor-self");
    assert_eq!(mixed.soundness, Soundness::Unsound);
}

#[test]
fn test_store_between_same_pointer_loads_is_still_same() {
    let text = "\
define i32 @clobber(ptr %p, i32 %v) {
entry:
  %l1 = load i32, ptr %p
  store i32 %v, ptr %p
  %l2 = load i32, ptr %p
  %d = sub i32 %l1, %l2
  ret i32 %d
}
";
    let original = parse_function(text).unwrap();
    let (l1, l2) = (original.lookup("l1").unwrap(), original.lookup("l2").unwrap());
    assert_eq!(classify(&original, l1, l2), OperandPattern::Same(l1));

    let mut func = original.clone();
    let mut engine = MathObfuscator::with_source(FixedChoice(0));
    assert!(engine.apply(&mut func).unwrap());
    assert_eq!(rule_ids(&mut engine), ["sub-same-zero"]);
    validate_function(&func).unwrap();

    // The loads read 5 then 9: the original yields -4, the rewrite folds to 0.
    let call = |f: &Function| {
        let mut machine = Machine::new();
        let cell = machine.alloc(RuntimeValue::int(32, 5));
        machine.call(f, &[cell, RuntimeValue::int(32, 9)]).unwrap().as_i64()
    };
    assert_eq!(call(&original), Some(-4));
    assert_eq!(call(&func), Some(0));
}

#[test]
fn test_sound_only_never_selects_flagged_rules() {
    for seed in 0..32 {
        let mut func = arith();
        let mut engine = MathObfuscator::with_source(StdRng::seed_from_u64(seed))
            .with_config(MathConfig { sound_only: true });
        engine.apply(&mut func).unwrap();
        let records = engine.drain_records();
        assert!(records.iter().all(|r| r.soundness == Soundness::Sound));
        // mul/same has no sound rule left, so %sq is always kept.
        assert!(func.lookup("sq").is_some());
        validate_function(&func).unwrap();
    }
}

#[test]
fn test_random_choices_cover_every_alternative() {
    let mut seen = std::collections::BTreeSet::new();
    for seed in 0..64 {
        let mut func = arith();
        let mut engine = MathObfuscator::with_source(StdRng::seed_from_u64(seed));
        engine.apply(&mut func).unwrap();
        seen.extend(rule_ids(&mut engine));
    }
    assert_eq!(seen.len(), 17, "{seen:?}");
}

#[test]
fn test_float_and_control_flow_untouched() {
    let mut module = module(LOOP);
    let scale = module.functions.iter_mut().find(|f| f.name == "scale").unwrap();
    let before = scale.to_string();
    let mut engine = MathObfuscator::with_source(FixedChoice(0));
    assert!(engine.apply(scale).unwrap());
    let after = scale.to_string();

    // Only the i8 add changed.
    assert!(after.contains("%y = fmul double %x, %x"));
    assert!(after.contains("%z = fadd double %y, %x"));
    assert!(!after.contains("%k2 ="));
    assert_eq!(before.lines().count(), after.lines().count());
}

#[test]
fn test_no_candidates_means_no_modification() {
    let text = "define i32 @f(i32 %a, i32 %b) {\nentry:\n  %x = and i32 %a, %b\n  %y = udiv i32 %x, 3\n  %z = mul i32 %y, %a\n  ret i32 %z\n}\n";
    let mut func = parse_function(text).unwrap();
    let mut engine = MathObfuscator::with_source(FixedChoice(0));
    assert!(!engine.apply(&mut func).unwrap());
    assert_eq!(func.to_string(), text);
    assert!(engine.drain_records().is_empty());
}
