//! Structural checks over a [`Function`].
//!
//! `validate_function` does not judge semantics. It confirms the invariants passes rely on:
//! every block ends in exactly one terminator, operands point at live values of the right type,
//! use lists mirror operand lists in both directions, and CFG edges agree with terminators.
//! A pass that erased an instruction without rewiring its users shows up here as a dangling
//! operand.

use crate::ir::{Function, InstKind, Module, Use, ValueId, ValueKind};
use crate::result::{Error, Result};
use crate::types::Type;

/// Validates every function of `module`.
pub fn validate_module(module: &Module) -> Result<()> {
    module.functions.iter().try_for_each(validate_function)
}

/// Validates one function, returning the first problem found.
pub fn validate_function(func: &Function) -> Result<()> {
    let fail = |reason: String| Error::MalformedFunction {
        function: func.name.clone(),
        reason,
    };

    if func.entry().is_none() {
        return Err(fail("function has no blocks".into()));
    }

    for block in func.blocks() {
        let label = func.label(block);
        let insts = func.block_insts(block);
        let Some((last, body)) = insts.split_last() else {
            return Err(fail(format!("block '{label}' is empty")));
        };

        for (position, id) in insts.iter().enumerate() {
            let inst = func
                .inst(*id)
                .ok_or_else(|| fail(format!("block '{label}' lists erased value {id}")))?;
            if inst.block != block {
                return Err(fail(format!(
                    "{} is listed in '{label}' but records another block",
                    func.display_inst(*id)
                )));
            }
            let is_last = position == body.len();
            if inst.kind.is_terminator() != is_last {
                return Err(fail(format!(
                    "terminator placement broken at '{}' in '{label}'",
                    func.display_inst(*id)
                )));
            }
        }

        let mut expected: Vec<_> = func
            .inst(*last)
            .map(|inst| inst.kind.targets())
            .unwrap_or_default();
        expected.sort_by_key(|(target, kind)| (*kind as u8, target.index()));
        if func.successors(block) != expected {
            return Err(fail(format!("CFG edges of '{label}' disagree with its terminator")));
        }
    }

    for (id, data) in func.live_values() {
        if let ValueKind::Inst(inst) = &data.kind {
            for (index, operand) in inst.operands.iter().enumerate() {
                if !func.is_live(*operand) {
                    return Err(fail(format!(
                        "{} references erased value {operand}",
                        func.display_inst(id)
                    )));
                }
                if !func.uses(*operand).contains(&Use { user: id, index }) {
                    return Err(fail(format!(
                        "operand {index} of {} missing from use list",
                        func.display_inst(id)
                    )));
                }
            }
            check_types(func, id, &inst.kind, &inst.operands, data.ty).map_err(fail)?;
        }

        for u in data.uses() {
            let consistent = func
                .inst(u.user)
                .and_then(|user| user.operands.get(u.index))
                .is_some_and(|operand| *operand == id);
            if !consistent {
                return Err(fail(format!(
                    "use list of {} names a stale user {}",
                    func.operand_text(id),
                    u.user
                )));
            }
        }
    }
    Ok(())
}

fn check_types(
    func: &Function,
    id: ValueId,
    kind: &InstKind,
    operands: &[ValueId],
    ty: Type,
) -> std::result::Result<(), String> {
    let operand_ty = |i: usize| func.ty(operands[i]).unwrap_or(Type::Void);
    let arity = |n: usize| {
        if operands.len() == n {
            Ok(())
        } else {
            Err(format!(
                "{} has {} operands, expected {n}",
                func.display_inst(id),
                operands.len()
            ))
        }
    };
    let mismatch = || format!("type mismatch in {}", func.display_inst(id));

    match kind {
        InstKind::Binary(op) => {
            arity(2)?;
            let ok_class = if op.is_float() { ty.is_float() } else { ty.is_int() };
            if !ok_class || operand_ty(0) != ty || operand_ty(1) != ty {
                return Err(mismatch());
            }
        }
        InstKind::Icmp(_) => {
            arity(2)?;
            if ty != Type::Int(1) || operand_ty(0) != operand_ty(1) {
                return Err(mismatch());
            }
        }
        InstKind::Load => {
            arity(1)?;
            if operand_ty(0) != Type::Ptr || ty == Type::Void {
                return Err(mismatch());
            }
        }
        InstKind::Store => {
            arity(2)?;
            if operand_ty(1) != Type::Ptr {
                return Err(mismatch());
            }
        }
        InstKind::Alloca(_) => {
            arity(0)?;
            if ty != Type::Ptr {
                return Err(mismatch());
            }
        }
        InstKind::Br(_) => arity(0)?,
        InstKind::CondBr { .. } => {
            arity(1)?;
            if operand_ty(0) != Type::Int(1) {
                return Err(mismatch());
            }
        }
        InstKind::Ret => {
            let returned = operands.first().map(|_| operand_ty(0)).unwrap_or(Type::Void);
            if operands.len() > 1 || returned != func.ret_ty {
                return Err(format!(
                    "{} does not match return type {}",
                    func.display_inst(id),
                    func.ret_ty
                ));
            }
        }
    }
    Ok(())
}
