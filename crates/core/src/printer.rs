//! Textual rendering of functions and modules, the inverse of [`crate::parser`].

use crate::ir::{Function, InstKind, Module, ValueId};
use std::fmt;

impl Function {
    /// Renders one instruction as it appears in the text format, without indentation.
    pub fn display_inst(&self, id: ValueId) -> String {
        let Some(inst) = self.inst(id) else {
            return format!("<erased {id}>");
        };
        let ops: Vec<String> = inst
            .operands
            .iter()
            .map(|v| self.operand_text(*v))
            .collect();
        let ty_of = |v: &ValueId| {
            self.ty(*v)
                .map(|t| t.to_string())
                .unwrap_or_else(|_| "?".into())
        };
        let result = self.operand_text(id);
        let ty = self.ty(id).map(|t| t.to_string()).unwrap_or_default();

        match &inst.kind {
            InstKind::Binary(op) => {
                format!("{result} = {} {ty} {}, {}", op.mnemonic(), ops[0], ops[1])
            }
            InstKind::Icmp(pred) => format!(
                "{result} = icmp {} {} {}, {}",
                pred.mnemonic(),
                ty_of(&inst.operands[0]),
                ops[0],
                ops[1]
            ),
            InstKind::Load => format!("{result} = load {ty}, ptr {}", ops[0]),
            InstKind::Alloca(allocated) => format!("{result} = alloca {allocated}"),
            InstKind::Store => format!(
                "store {} {}, ptr {}",
                ty_of(&inst.operands[0]),
                ops[0],
                ops[1]
            ),
            InstKind::Br(target) => format!("br label %{}", self.label(*target)),
            InstKind::CondBr {
                then_dest,
                else_dest,
            } => format!(
                "br i1 {}, label %{}, label %{}",
                ops[0],
                self.label(*then_dest),
                self.label(*else_dest)
            ),
            InstKind::Ret => match inst.operands.first() {
                Some(v) => format!("ret {} {}", ty_of(v), ops[0]),
                None => "ret void".to_string(),
            },
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .params()
            .iter()
            .map(|p| {
                let ty = self.ty(*p).map(|t| t.to_string()).unwrap_or_default();
                format!("{ty} {}", self.operand_text(*p))
            })
            .collect();
        writeln!(
            f,
            "define {} @{}({}) {{",
            self.ret_ty,
            self.name,
            params.join(", ")
        )?;
        for block in self.blocks() {
            writeln!(f, "{}:", self.label(block))?;
            for inst in self.block_insts(block) {
                writeln!(f, "  {}", self.display_inst(*inst))?;
            }
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}
