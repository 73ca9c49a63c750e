//! Shared helpers for the integration tests.

use obscura_core::eval::{Machine, RuntimeValue};
use obscura_core::types::{sign_extend, signed_max, signed_min};
use obscura_core::{Function, Module, parser};

pub const ARITH: &str = include_str!("../ir/arith.ir");
pub const MEMORY: &str = include_str!("../ir/memory.ir");
pub const LOOP: &str = include_str!("../ir/loop.ir");

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_ansi(false)
        .without_time()
        .try_init();
}

pub fn module(text: &str) -> Module {
    parser::parse_module(text).expect("fixture parses")
}

pub fn function<'m>(module: &'m Module, name: &str) -> &'m Function {
    module.function(name).expect("fixture function exists")
}

/// Zero, ±1, the signed extremes and a few values that wrap when doubled or negated.
pub fn edge_values(bits: u32) -> Vec<i64> {
    let min = sign_extend(signed_min(bits), bits);
    let max = sign_extend(signed_max(bits), bits);
    vec![0, 1, -1, 2, -2, 3, 16, -77, min, max, min + 1, max - 1, max / 2 + 1]
}

/// Runs `func` on integer arguments of width `bits`; `None` when execution traps.
pub fn call_int(func: &Function, bits: u32, args: &[i64]) -> Option<i64> {
    let args: Vec<_> = args.iter().map(|a| RuntimeValue::int(bits, *a)).collect();
    Machine::new().call(func, &args).ok()?.as_i64()
}
