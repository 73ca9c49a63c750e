use obscura_core::ir::{BinaryOp, InstKind};
use obscura_core::parser::{parse_function, parse_module};
use obscura_core::{Error, Type};
use obscura_tests::{ARITH, LOOP, MEMORY, module};

#[test]
fn test_fixtures_parse_and_reprint_stably() {
    for text in [ARITH, MEMORY, LOOP] {
        let parsed = module(text);
        let printed = parsed.to_string();
        let reparsed = parse_module(&printed).unwrap();
        assert_eq!(reparsed.to_string(), printed);
        assert_eq!(reparsed.instruction_count(), parsed.instruction_count());
    }
}

#[test]
fn test_loop_fixture_shape() {
    let module = module(LOOP);
    assert_eq!(module.functions.len(), 2);

    let triangle = module.function("triangle").unwrap();
    let labels: Vec<_> = triangle
        .blocks()
        .into_iter()
        .map(|b| triangle.label(b).to_string())
        .collect();
    assert_eq!(labels, ["entry", "head", "body", "exit"]);
    assert_eq!(triangle.ret_ty, Type::Int(64));

    let scale = module.function("scale").unwrap();
    assert_eq!(scale.ret_ty, Type::F64);
    let k2 = scale.lookup("k2").unwrap();
    assert_eq!(scale.ty(k2).unwrap(), Type::Int(8));
    assert!(matches!(
        scale.inst(k2).unwrap().kind,
        InstKind::Binary(BinaryOp::Add)
    ));
}

#[test]
fn test_literals_are_typed_and_truncated() {
    let func = parse_function(
        "define i8 @f(i8 %x) {\n  %a = add i8 %x, 255\n  %b = add i8 %a, -1\n  ret i8 %b\n}\n",
    )
    .unwrap();
    let a = func.lookup("a").unwrap();
    let b = func.lookup("b").unwrap();
    let lit_a = func.inst(a).unwrap().operands[1];
    let lit_b = func.inst(b).unwrap().operands[1];
    assert_eq!(lit_a, lit_b, "255 and -1 are the same i8 constant");
    assert_eq!(func.as_const_int(lit_a), Some(0xff));
    assert_eq!(func.operand_text(lit_a), "-1");
}

#[test]
fn test_errors_carry_line_numbers() {
    let text = "define i32 @f(i32 %x) {\nentry:\n  %y = add i32 %x, %x\n  %z = mul i32 %y, %w\n  ret i32 %z\n}\n";
    match parse_module(text) {
        Err(Error::ParseError { line, msg, raw }) => {
            assert_eq!(line, 4);
            assert!(msg.contains("%w"), "{msg}");
            assert!(raw.contains("mul"));
        }
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_rejects_type_confusion() {
    let text = "define i32 @f(i64 %x) {\n  %y = add i32 %x, 1\n  ret i32 %y\n}\n";
    assert!(matches!(parse_module(text), Err(Error::ParseError { line: 2, .. })));

    let text = "define float @f(float %x) {\n  %y = add float %x, %x\n  ret float %y\n}\n";
    assert!(matches!(parse_module(text), Err(Error::ParseError { line: 2, .. })));
}

#[test]
fn test_rejects_duplicates_and_unknown_opcodes() {
    let dup = "define void @f() {\n  ret void\n}\ndefine void @f() {\n  ret void\n}\n";
    assert!(matches!(parse_module(dup), Err(Error::ParseError { line: 4, .. })));

    let unknown = "define void @f(i32 %x) {\n  %y = frobnicate i32 %x, %x\n  ret void\n}\n";
    let err = parse_module(unknown).unwrap_err();
    assert!(err.to_string().contains("frobnicate"), "{err}");
}

#[test]
fn test_parse_function_requires_exactly_one() {
    assert!(parse_function(LOOP).is_err());
    assert!(parse_function("").is_err());
    assert!(parse_function(ARITH).is_ok());
}
