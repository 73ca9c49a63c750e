use obscura_core::eval::{Machine, RuntimeValue, run};
use obscura_core::parser::parse_function;
use obscura_core::Error;
use obscura_tests::{LOOP, MEMORY, call_int, function, module};

#[test]
fn test_triangle_numbers() {
    let module = module(LOOP);
    let triangle = function(&module, "triangle");
    assert_eq!(call_int(triangle, 64, &[0]), Some(0));
    assert_eq!(call_int(triangle, 64, &[1]), Some(1));
    assert_eq!(call_int(triangle, 64, &[100]), Some(5050));
}

#[test]
fn test_float_function() {
    let module = module(LOOP);
    let scale = function(&module, "scale");
    let out = run(scale, &[RuntimeValue::Float(1.5), RuntimeValue::int(8, 3)]).unwrap();
    assert_eq!(out, RuntimeValue::Float(1.5 * 1.5 + 1.5));
}

#[test]
fn test_memory_fixture_writes_through_pointer() {
    let module = module(MEMORY);
    let func = function(&module, "memory");
    let mut machine = Machine::new();
    let p = machine.alloc(RuntimeValue::int(64, 40));
    let q = machine.alloc(RuntimeValue::int(64, 2));

    let out = machine.call(func, &[p, q]).unwrap();
    // (40 - 40) + (40 + 2)
    assert_eq!(out.as_i64(), Some(42));
    assert_eq!(machine.read(q).unwrap().as_i64(), Some(42));
    assert_eq!(machine.read(p).unwrap().as_i64(), Some(40));
}

#[test]
fn test_uninitialized_and_foreign_pointers() {
    let func = parse_function(
        "define i32 @f() {\n  %slot = alloca i32\n  %v = load i32, ptr %slot\n  ret i32 %v\n}\n",
    )
    .unwrap();
    assert!(matches!(run(&func, &[]), Err(Error::InvalidPointer(_))));

    let machine = Machine::new();
    assert!(matches!(
        machine.read(RuntimeValue::Ptr(3)),
        Err(Error::InvalidPointer(_))
    ));
}

#[test]
fn test_wraparound_across_widths() {
    let text = |bits: u32| {
        format!("define i{bits} @f(i{bits} %a, i{bits} %b) {{\n  %m = mul i{bits} %a, %b\n  ret i{bits} %m\n}}\n")
    };
    let f8 = parse_function(&text(8)).unwrap();
    assert_eq!(call_int(&f8, 8, &[16, 16]), Some(0));
    assert_eq!(call_int(&f8, 8, &[-128, -1]), Some(-128));

    let f_wide = parse_function(&text(64)).unwrap();
    assert_eq!(call_int(&f_wide, 64, &[i64::MAX, 2]), Some(-2));
}

#[test]
fn test_unsigned_and_shift_semantics() {
    let func = parse_function(
        "define i8 @f(i8 %a) {\n  %u = udiv i8 %a, 3\n  %s = ashr i8 %a, 1\n  %l = lshr i8 %a, 1\n  %x = xor i8 %u, %s\n  %y = xor i8 %x, %l\n  ret i8 %y\n}\n",
    )
    .unwrap();
    // a = -6 = 0xfa: udiv 250/3 = 83, ashr = -3 (0xfd), lshr = 125 (0x7d)
    let expected = (83u8 ^ 0xfd ^ 0x7d) as i8 as i64;
    assert_eq!(call_int(&func, 8, &[-6]), Some(expected));
}
