//! Substitution catalogue.
//!
//! Each (operator, operand pattern) pair maps to a fixed list of rewrite rules. A rule emits its
//! replacement through a [`Builder`] anchored at the instruction being replaced and returns the
//! value that takes over the original result. Constants are always materialized in the type of
//! the operand they combine with.
//!
//! Identities, over wraparound integers:
//!   x + x == x * 2 == x << 1 == (x * 3) - x
//!   a + b == a - (-b) == a * 1 + b * 1
//!   x - x == 0 == x ^ x == x + (~x + 1)
//!   a - b == a + (~b + 1)
//!   a * 2^k == a << k
//!   x / x == 1 == x - (x - 1)
//!
//! Rules marked [`Soundness::Unsound`] are not identities:
//!   (a ^ b) ^ (a ^ b) is always 0
//!   x * x is rewritten to 2x
//!   x * (1 / x) is 0 for |x| > 1

use super::classify::OperandPattern;
use crate::Soundness;
use obscura_core::{BinaryOp, Builder, Function, ValueId};

/// Operators the catalogue knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    SDiv,
}

impl Operator {
    pub fn from_binary(op: BinaryOp) -> Option<Self> {
        match op {
            BinaryOp::Add => Some(Operator::Add),
            BinaryOp::Sub => Some(Operator::Sub),
            BinaryOp::Mul => Some(Operator::Mul),
            BinaryOp::SDiv => Some(Operator::SDiv),
            _ => None,
        }
    }
}

type Emit = fn(&mut Builder<'_>, ValueId, ValueId) -> obscura_core::Result<ValueId>;

/// A single catalogued rewrite.
#[derive(Debug)]
pub struct Rule {
    /// Stable identifier used in reports.
    pub id: &'static str,
    /// Diagnostic text, `<original> → <replacement>`.
    pub identity: &'static str,
    pub soundness: Soundness,
    /// Narrowest integer width the rule is defined for.
    pub min_bits: u32,
    emit: Emit,
}

impl Rule {
    /// Whether the rule may be applied to operands `bits` wide.
    pub fn fits(&self, bits: u32) -> bool {
        bits >= self.min_bits
    }

    /// Emits the replacement before the builder's anchor. Same-operand rules receive the base
    /// value as both `lhs` and `rhs`.
    pub fn emit(
        &self,
        builder: &mut Builder<'_>,
        lhs: ValueId,
        rhs: ValueId,
    ) -> obscura_core::Result<ValueId> {
        (self.emit)(builder, lhs, rhs)
    }
}

/// What the catalogue offers for one instruction.
#[derive(Debug)]
pub enum Entry {
    /// One of these rules, picked uniformly.
    Choose(&'static [Rule]),
    /// `a * factor` with `factor == 1 << shift`.
    ShiftLeft { shift: u32, factor: u64 },
    /// No rewrite for this shape.
    Abstain,
}

/// Looks up the catalogue entry for `op` applied to an operand pair classified as `pattern`.
pub fn lookup(func: &Function, op: Operator, pattern: OperandPattern, rhs: ValueId) -> Entry {
    let same = matches!(pattern, OperandPattern::Same(_));
    match (op, same) {
        (Operator::Add, true) => Entry::Choose(ADD_SAME),
        (Operator::Add, false) => Entry::Choose(ADD_DISTINCT),
        (Operator::Sub, true) => Entry::Choose(SUB_SAME),
        (Operator::Sub, false) => Entry::Choose(SUB_DISTINCT),
        (Operator::Mul, true) => Entry::Choose(MUL_SAME),
        (Operator::Mul, false) => match func.as_const_int(rhs) {
            Some(factor) if factor.is_power_of_two() => Entry::ShiftLeft {
                shift: factor.trailing_zeros(),
                factor,
            },
            _ => Entry::Abstain,
        },
        (Operator::SDiv, true) => Entry::Choose(SDIV_SAME),
        (Operator::SDiv, false) => Entry::Abstain,
    }
}

const fn rule(id: &'static str, identity: &'static str, emit: Emit) -> Rule {
    Rule {
        id,
        identity,
        soundness: Soundness::Sound,
        min_bits: 1,
        emit,
    }
}

const fn unsound(id: &'static str, identity: &'static str, emit: Emit) -> Rule {
    Rule {
        id,
        identity,
        soundness: Soundness::Unsound,
        min_bits: 1,
        emit,
    }
}

/// `x << 1` shifts an `i1` by its full width.
const fn shifting(rule: Rule) -> Rule {
    Rule { min_bits: 2, ..rule }
}

pub static ADD_SAME: &[Rule] = &[
    rule("add-same-mul2", "x + x → x * 2", add_same_mul2),
    shifting(rule("add-same-shl1", "x + x → x << 1", add_same_shl1)),
    rule("add-same-mul3-sub", "x + x → (x * 3) - x", add_same_mul3_sub),
];

pub static ADD_DISTINCT: &[Rule] = &[
    rule("add-diff-sub-neg", "a + b → a - (-b)", add_diff_sub_neg),
    unsound("add-diff-xor-self", "a + b → (a ^ b) ^ (a ^ b)", add_diff_xor_self),
    rule("add-diff-mul1", "a + b → a * 1 + b * 1", add_diff_mul1),
];

pub static SUB_SAME: &[Rule] = &[
    rule("sub-same-zero", "x - x → 0", sub_same_zero),
    rule("sub-same-xor", "x - x → x ^ x", sub_same_xor),
    rule("sub-same-add-neg", "x - x → x + (~x + 1)", sub_same_add_neg),
];

pub static SUB_DISTINCT: &[Rule] = &[rule("sub-diff-add-neg", "a - b → a + (~b + 1)", sub_diff_add_neg)];

pub static MUL_SAME: &[Rule] = &[
    shifting(unsound("mul-same-shl1", "x * x → x << 1", add_same_shl1)),
    unsound("mul-same-add", "x * x → x + x", mul_same_add),
    unsound("mul-same-mul2", "x * x → x * 2", add_same_mul2),
];

pub static SDIV_SAME: &[Rule] = &[
    rule("sdiv-same-one", "x / x → 1", sdiv_same_one),
    unsound("sdiv-same-mul-recip", "x / x → x * (1/x)", sdiv_same_mul_recip),
    rule("sdiv-same-sub", "x / x → x - (x - 1)", sdiv_same_sub),
];

type Emitted = obscura_core::Result<ValueId>;

fn add_same_mul2(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.mul_const(x, 2)
}

fn add_same_shl1(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.shl_const(x, 1)
}

fn add_same_mul3_sub(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    let triple = b.mul_const(x, 3)?;
    b.sub(triple, x)
}

fn add_diff_sub_neg(b: &mut Builder<'_>, lhs: ValueId, rhs: ValueId) -> Emitted {
    let neg = b.neg(rhs)?;
    b.sub(lhs, neg)
}

fn add_diff_xor_self(b: &mut Builder<'_>, lhs: ValueId, rhs: ValueId) -> Emitted {
    let mixed = b.xor(lhs, rhs)?;
    b.xor(mixed, mixed)
}

fn add_diff_mul1(b: &mut Builder<'_>, lhs: ValueId, rhs: ValueId) -> Emitted {
    let lhs = b.mul_const(lhs, 1)?;
    let rhs = b.mul_const(rhs, 1)?;
    b.add(lhs, rhs)
}

fn sub_same_zero(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.int_const_like(x, 0)
}

fn sub_same_xor(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.xor(x, x)
}

fn sub_same_add_neg(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    sub_diff_add_neg(b, x, x)
}

fn sub_diff_add_neg(b: &mut Builder<'_>, lhs: ValueId, rhs: ValueId) -> Emitted {
    let flipped = b.not(rhs)?;
    let neg = b.add_const(flipped, 1)?;
    b.add(lhs, neg)
}

fn mul_same_add(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.add(x, x)
}

fn sdiv_same_one(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    b.int_const_like(x, 1)
}

fn sdiv_same_mul_recip(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    let one = b.int_const_like(x, 1)?;
    let recip = b.sdiv(one, x)?;
    b.mul(x, recip)
}

fn sdiv_same_sub(b: &mut Builder<'_>, x: ValueId, _: ValueId) -> Emitted {
    let pred = b.sub_const(x, 1)?;
    b.sub(x, pred)
}
