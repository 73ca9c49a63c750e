//! Reference interpreter for the IR.
//!
//! Used to check that rewritten functions compute what the originals computed. Integer
//! arithmetic wraps at the type width, `sdiv`/`srem` truncate toward zero, and the cases the IR
//! leaves undefined (division by zero, `MIN sdiv -1`, oversized shifts) are reported as errors
//! so a comparison never silently agrees on garbage.

use crate::ir::{BinaryOp, Constant, Function, IcmpPred, InstKind, ValueId, ValueKind};
use crate::result::{Error, Result};
use crate::types::{Type, sign_extend, signed_min, truncate};
use std::collections::HashMap;
use tracing::trace;

/// Steps allowed per call before giving up on a non-terminating function.
pub const DEFAULT_STEP_LIMIT: usize = 1_000_000;

/// A concrete runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuntimeValue {
    Int { bits: u32, value: u64 },
    Float(f64),
    /// Index of a memory cell owned by the [`Machine`].
    Ptr(usize),
    Void,
}

impl RuntimeValue {
    /// Integer of `bits` width from a signed literal, truncated.
    pub fn int(bits: u32, value: i64) -> Self {
        RuntimeValue::Int {
            bits,
            value: truncate(value as u64, bits),
        }
    }

    /// Sign-extended view of an integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int { bits, value } => Some(sign_extend(*value, *bits)),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RuntimeValue::Int { value, .. } => Some(*value),
            _ => None,
        }
    }

    fn matches(&self, ty: Type) -> bool {
        match (self, ty) {
            (RuntimeValue::Int { bits, .. }, Type::Int(width)) => *bits == width,
            (RuntimeValue::Float(_), Type::F32 | Type::F64) => true,
            (RuntimeValue::Ptr(_), Type::Ptr) => true,
            (RuntimeValue::Void, Type::Void) => true,
            _ => false,
        }
    }
}

/// Memory plus execution limits. Cells outlive calls so callers can inspect stores.
#[derive(Debug)]
pub struct Machine {
    memory: Vec<Option<RuntimeValue>>,
    step_limit: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine {
    pub fn new() -> Self {
        Self {
            memory: Vec::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: usize) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Allocates an initialized cell and returns a pointer to it.
    pub fn alloc(&mut self, init: RuntimeValue) -> RuntimeValue {
        self.memory.push(Some(init));
        RuntimeValue::Ptr(self.memory.len() - 1)
    }

    pub fn read(&self, ptr: RuntimeValue) -> Result<RuntimeValue> {
        let RuntimeValue::Ptr(cell) = ptr else {
            return Err(Error::InvalidPointer(format!("{ptr:?} is not a pointer")));
        };
        self.memory
            .get(cell)
            .copied()
            .flatten()
            .ok_or_else(|| Error::InvalidPointer(format!("cell {cell} is unallocated or uninitialized")))
    }

    fn write(&mut self, ptr: RuntimeValue, value: RuntimeValue) -> Result<()> {
        let RuntimeValue::Ptr(cell) = ptr else {
            return Err(Error::InvalidPointer(format!("{ptr:?} is not a pointer")));
        };
        let slot = self
            .memory
            .get_mut(cell)
            .ok_or_else(|| Error::InvalidPointer(format!("cell {cell} is unallocated")))?;
        *slot = Some(value);
        Ok(())
    }

    /// Runs `func` on `args`, returning [`RuntimeValue::Void`] for `ret void`.
    pub fn call(&mut self, func: &Function, args: &[RuntimeValue]) -> Result<RuntimeValue> {
        if args.len() != func.params().len() {
            return Err(Error::ArgumentMismatch(format!(
                "@{} takes {} arguments, got {}",
                func.name,
                func.params().len(),
                args.len()
            )));
        }

        let mut env: HashMap<ValueId, RuntimeValue> = HashMap::new();
        for (param, arg) in func.params().iter().zip(args) {
            let ty = func.ty(*param)?;
            if !arg.matches(ty) {
                return Err(Error::ArgumentMismatch(format!(
                    "{} expects {ty}, got {arg:?}",
                    func.operand_text(*param)
                )));
            }
            env.insert(*param, *arg);
        }

        let mut block = func
            .entry()
            .ok_or_else(|| Error::MissingReturn(func.name.clone()))?;
        let mut steps = 0usize;

        loop {
            let mut next_block = None;
            for id in func.block_insts(block) {
                steps += 1;
                if steps > self.step_limit {
                    return Err(Error::StepLimitExceeded(self.step_limit));
                }
                let inst = func.inst(*id).ok_or(Error::StaleValue(id.index()))?;
                let operand = |i: usize| lookup(func, &env, inst.operands[i]);
                trace!("exec {}", func.display_inst(*id));

                let result = match &inst.kind {
                    InstKind::Binary(op) => binary(*op, operand(0)?, operand(1)?)?,
                    InstKind::Icmp(pred) => icmp(*pred, operand(0)?, operand(1)?)?,
                    InstKind::Load => self.read(operand(0)?)?,
                    InstKind::Store => {
                        let value = operand(0)?;
                        self.write(operand(1)?, value)?;
                        RuntimeValue::Void
                    }
                    InstKind::Alloca(_) => {
                        self.memory.push(None);
                        RuntimeValue::Ptr(self.memory.len() - 1)
                    }
                    InstKind::Br(target) => {
                        next_block = Some(*target);
                        break;
                    }
                    InstKind::CondBr {
                        then_dest,
                        else_dest,
                    } => {
                        let taken = operand(0)?.as_u64().unwrap_or(0) != 0;
                        next_block = Some(if taken { *then_dest } else { *else_dest });
                        break;
                    }
                    InstKind::Ret => {
                        return match inst.operands.first() {
                            Some(_) => operand(0),
                            None => Ok(RuntimeValue::Void),
                        };
                    }
                };
                env.insert(*id, result);
            }

            block = next_block.ok_or_else(|| Error::MissingReturn(func.label(block).to_string()))?;
        }
    }
}

/// Convenience wrapper: run `func` on fresh memory.
pub fn run(func: &Function, args: &[RuntimeValue]) -> Result<RuntimeValue> {
    Machine::new().call(func, args)
}

fn lookup(func: &Function, env: &HashMap<ValueId, RuntimeValue>, id: ValueId) -> Result<RuntimeValue> {
    if let Some(value) = env.get(&id) {
        return Ok(*value);
    }
    let data = func.value(id)?;
    match (&data.kind, data.ty) {
        (ValueKind::Constant(Constant::Int(value)), Type::Int(bits)) => Ok(RuntimeValue::Int {
            bits,
            value: *value,
        }),
        (ValueKind::Constant(Constant::Float(value)), _) => Ok(RuntimeValue::Float(*value)),
        _ => Err(Error::UnknownValue(func.operand_text(id))),
    }
}

fn binary(op: BinaryOp, lhs: RuntimeValue, rhs: RuntimeValue) -> Result<RuntimeValue> {
    if op.is_float() {
        let (RuntimeValue::Float(a), RuntimeValue::Float(b)) = (lhs, rhs) else {
            return Err(Error::ArgumentMismatch(format!("{} on non-floats", op.mnemonic())));
        };
        let value = match op {
            BinaryOp::FAdd => a + b,
            BinaryOp::FSub => a - b,
            BinaryOp::FMul => a * b,
            _ => a / b,
        };
        return Ok(RuntimeValue::Float(value));
    }

    let (
        RuntimeValue::Int { bits, value: a },
        RuntimeValue::Int {
            bits: rhs_bits,
            value: b,
        },
    ) = (lhs, rhs)
    else {
        return Err(Error::ArgumentMismatch(format!("{} on non-integers", op.mnemonic())));
    };
    if bits != rhs_bits {
        return Err(Error::TypeMismatch {
            expected: Type::Int(bits),
            found: Type::Int(rhs_bits),
        });
    }

    let (sa, sb) = (sign_extend(a, bits), sign_extend(b, bits));
    let check_divisor = |signed: bool| {
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        if signed && a == signed_min(bits) && sb == -1 {
            return Err(Error::DivisionOverflow);
        }
        Ok(())
    };
    let check_shift = || {
        if b >= bits as u64 {
            Err(Error::ShiftTooLarge { amount: b, bits })
        } else {
            Ok(b as u32)
        }
    };

    let raw = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::SDiv => {
            check_divisor(true)?;
            sa.wrapping_div(sb) as u64
        }
        BinaryOp::SRem => {
            check_divisor(true)?;
            sa.wrapping_rem(sb) as u64
        }
        BinaryOp::UDiv => {
            check_divisor(false)?;
            a / b
        }
        BinaryOp::URem => {
            check_divisor(false)?;
            a % b
        }
        BinaryOp::Shl => a << check_shift()?,
        BinaryOp::LShr => a >> check_shift()?,
        BinaryOp::AShr => (sa >> check_shift()?) as u64,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv => unreachable!(),
    };
    Ok(RuntimeValue::Int {
        bits,
        value: truncate(raw, bits),
    })
}

fn icmp(pred: IcmpPred, lhs: RuntimeValue, rhs: RuntimeValue) -> Result<RuntimeValue> {
    let (a, b, sa, sb) = match (lhs, rhs) {
        (RuntimeValue::Int { bits, value: a }, RuntimeValue::Int { value: b, .. }) => {
            (a, b, sign_extend(a, bits), sign_extend(b, bits))
        }
        (RuntimeValue::Ptr(a), RuntimeValue::Ptr(b)) => (a as u64, b as u64, a as i64, b as i64),
        _ => return Err(Error::ArgumentMismatch("icmp on incompatible values".into())),
    };
    let holds = match pred {
        IcmpPred::Eq => a == b,
        IcmpPred::Ne => a != b,
        IcmpPred::Slt => sa < sb,
        IcmpPred::Sle => sa <= sb,
        IcmpPred::Sgt => sa > sb,
        IcmpPred::Sge => sa >= sb,
        IcmpPred::Ult => a < b,
        IcmpPred::Ule => a <= b,
        IcmpPred::Ugt => a > b,
        IcmpPred::Uge => a >= b,
    };
    Ok(RuntimeValue::int(1, holds as i64))
}
