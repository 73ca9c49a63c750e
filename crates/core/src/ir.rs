//! SSA function representation used by every Obscura pass.
//!
//! A [`Function`] keeps its basic blocks as nodes of a `StableDiGraph`, with edges mirroring the
//! terminator of each block. Values (arguments, interned constants and instruction results) live
//! in a slot arena indexed by [`ValueId`]. Erasing an instruction empties its slot instead of
//! compacting the arena, so a stale id is reported as [`Error::StaleValue`] rather than silently
//! aliasing a newer value.
//!
//! Every value tracks its users as `(user, operand index)` pairs. This is what makes
//! [`Function::replace_all_uses`] a local operation: only the recorded operand slots are
//! rewritten, and the old value ends up with an empty use list so it can be erased.

use crate::result::{Error, Result};
use crate::types::{Type, truncate};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handle to a value slot inside one [`Function`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(usize);

impl ValueId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Two-operand arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl BinaryOp {
    const ALL: [BinaryOp; 17] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::SDiv,
        BinaryOp::UDiv,
        BinaryOp::SRem,
        BinaryOp::URem,
        BinaryOp::Shl,
        BinaryOp::LShr,
        BinaryOp::AShr,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Xor,
        BinaryOp::FAdd,
        BinaryOp::FSub,
        BinaryOp::FMul,
        BinaryOp::FDiv,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::Shl => "shl",
            BinaryOp::LShr => "lshr",
            BinaryOp::AShr => "ashr",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == s)
    }

    /// Infix symbol used in diagnostics.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add | BinaryOp::FAdd => "+",
            BinaryOp::Sub | BinaryOp::FSub => "-",
            BinaryOp::Mul | BinaryOp::FMul => "*",
            BinaryOp::SDiv | BinaryOp::UDiv | BinaryOp::FDiv => "/",
            BinaryOp::SRem | BinaryOp::URem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::LShr | BinaryOp::AShr => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv
        )
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IcmpPred {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IcmpPred {
    const ALL: [IcmpPred; 10] = [
        IcmpPred::Eq,
        IcmpPred::Ne,
        IcmpPred::Slt,
        IcmpPred::Sle,
        IcmpPred::Sgt,
        IcmpPred::Sge,
        IcmpPred::Ult,
        IcmpPred::Ule,
        IcmpPred::Ugt,
        IcmpPred::Uge,
    ];

    pub fn mnemonic(&self) -> &'static str {
        match self {
            IcmpPred::Eq => "eq",
            IcmpPred::Ne => "ne",
            IcmpPred::Slt => "slt",
            IcmpPred::Sle => "sle",
            IcmpPred::Sgt => "sgt",
            IcmpPred::Sge => "sge",
            IcmpPred::Ult => "ult",
            IcmpPred::Ule => "ule",
            IcmpPred::Ugt => "ugt",
            IcmpPred::Uge => "uge",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.mnemonic() == s)
    }
}

/// What an instruction does. Branch targets are block nodes, not values.
#[derive(Debug, Clone, PartialEq)]
pub enum InstKind {
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    /// `[lhs, rhs]`, result is `i1`
    Icmp(IcmpPred),
    /// `[ptr]`
    Load,
    /// `[value, ptr]`
    Store,
    /// Reserves one memory cell holding the given type.
    Alloca(Type),
    Br(NodeIndex),
    /// `[cond]`
    CondBr {
        then_dest: NodeIndex,
        else_dest: NodeIndex,
    },
    /// `[]` or `[value]`
    Ret,
}

impl InstKind {
    #[inline]
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            InstKind::Binary(op) => Some(*op),
            _ => None,
        }
    }

    #[inline]
    pub fn is_terminator(&self) -> bool {
        matches!(self, InstKind::Br(_) | InstKind::CondBr { .. } | InstKind::Ret)
    }

    /// Successor blocks paired with the edge kind they produce.
    pub fn targets(&self) -> Vec<(NodeIndex, EdgeType)> {
        match self {
            InstKind::Br(target) => vec![(*target, EdgeType::Jump)],
            InstKind::CondBr {
                then_dest,
                else_dest,
            } => vec![
                (*then_dest, EdgeType::BranchTrue),
                (*else_dest, EdgeType::BranchFalse),
            ],
            _ => Vec::new(),
        }
    }
}

/// An instruction placed in a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstKind,
    pub operands: Vec<ValueId>,
    pub block: NodeIndex,
}

/// Literal payload of a constant value. Integers are stored truncated to their width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant {
    Int(u64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Function parameter at the given position.
    Argument(usize),
    Constant(Constant),
    Inst(Instruction),
}

/// One operand slot that consumes a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Use {
    pub user: ValueId,
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct ValueData {
    pub ty: Type,
    pub name: Option<String>,
    pub kind: ValueKind,
    uses: Vec<Use>,
}

impl ValueData {
    pub fn uses(&self) -> &[Use] {
        &self.uses
    }

    pub fn as_inst(&self) -> Option<&Instruction> {
        match &self.kind {
            ValueKind::Inst(inst) => Some(inst),
            _ => None,
        }
    }
}

/// A labelled straight-line instruction list.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub label: String,
    insts: Vec<ValueId>,
}

impl Block {
    pub fn insts(&self) -> &[ValueId] {
        &self.insts
    }
}

/// CFG edge kinds, derived from block terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    Jump,
    BranchTrue,
    BranchFalse,
}

/// A function body: parameters, blocks and the value arena.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    params: Vec<ValueId>,
    cfg: StableDiGraph<Block, EdgeType>,
    values: Vec<Option<ValueData>>,
    constants: HashMap<(Type, u64), ValueId>,
    names: HashMap<String, ValueId>,
    labels: HashMap<String, NodeIndex>,
    next_temp: usize,
}

impl Function {
    pub fn new(name: impl Into<String>, ret_ty: Type) -> Self {
        Self {
            name: name.into(),
            ret_ty,
            params: Vec::new(),
            cfg: StableDiGraph::new(),
            values: Vec::new(),
            constants: HashMap::new(),
            names: HashMap::new(),
            labels: HashMap::new(),
            next_temp: 0,
        }
    }

    // ----------------------------------------------------------------------------------------
    // Construction
    // ----------------------------------------------------------------------------------------

    pub fn add_param(&mut self, name: &str, ty: Type) -> Result<ValueId> {
        let index = self.params.len();
        let id = self.alloc(ValueData {
            ty,
            name: None,
            kind: ValueKind::Argument(index),
            uses: Vec::new(),
        });
        self.bind_name(id, name)?;
        self.params.push(id);
        Ok(id)
    }

    /// Appends an empty block. Labels must be unique within the function.
    pub fn add_block(&mut self, label: &str) -> Result<NodeIndex> {
        if self.labels.contains_key(label) {
            return Err(self.malformed(format!("duplicate block label '{label}'")));
        }
        let node = self.cfg.add_node(Block {
            label: label.to_string(),
            insts: Vec::new(),
        });
        self.labels.insert(label.to_string(), node);
        Ok(node)
    }

    /// Interns an integer constant of `ty`, truncating `value` to the type width.
    pub fn const_int(&mut self, ty: Type, value: i64) -> Result<ValueId> {
        let bits = ty.int_bits().ok_or(Error::NotAnInteger(ty))?;
        self.intern(ty, Constant::Int(truncate(value as u64, bits)))
    }

    pub fn const_float(&mut self, ty: Type, value: f64) -> Result<ValueId> {
        if !ty.is_float() {
            return Err(Error::TypeMismatch {
                expected: Type::F64,
                found: ty,
            });
        }
        self.intern(ty, Constant::Float(value))
    }

    /// Appends an instruction at the end of `block`.
    pub fn append_inst(
        &mut self,
        block: NodeIndex,
        kind: InstKind,
        operands: Vec<ValueId>,
        ty: Type,
        name: Option<&str>,
    ) -> Result<ValueId> {
        let position = self.block_ref(block)?.insts.len();
        self.place_inst(block, position, kind, operands, ty, name)
    }

    /// Inserts an instruction immediately before `anchor`. Non-void results get a fresh name.
    pub fn insert_before(
        &mut self,
        anchor: ValueId,
        kind: InstKind,
        operands: Vec<ValueId>,
        ty: Type,
    ) -> Result<ValueId> {
        let (block, position) = self.position(anchor)?;
        self.place_inst(block, position, kind, operands, ty, None)
    }

    fn place_inst(
        &mut self,
        block: NodeIndex,
        position: usize,
        kind: InstKind,
        operands: Vec<ValueId>,
        ty: Type,
        name: Option<&str>,
    ) -> Result<ValueId> {
        for operand in &operands {
            self.value(*operand)?;
        }
        for (target, _) in kind.targets() {
            self.block_ref(target)?;
        }

        let is_terminator = kind.is_terminator();
        let id = self.alloc(ValueData {
            ty,
            name: None,
            kind: ValueKind::Inst(Instruction {
                kind,
                operands: operands.clone(),
                block,
            }),
            uses: Vec::new(),
        });

        match name {
            Some(name) => self.bind_name(id, name)?,
            None if ty != Type::Void => {
                let fresh = self.fresh_name();
                self.bind_name(id, &fresh)?;
            }
            None => {}
        }

        for (index, operand) in operands.into_iter().enumerate() {
            self.slot_mut(operand)?.uses.push(Use { user: id, index });
        }
        self.cfg[block].insts.insert(position, id);

        if is_terminator {
            self.sync_edges(block);
        }
        Ok(id)
    }

    // ----------------------------------------------------------------------------------------
    // Mutation
    // ----------------------------------------------------------------------------------------

    /// Points every consumer of `old` at `new`. Both values must share a type.
    pub fn replace_all_uses(&mut self, old: ValueId, new: ValueId) -> Result<()> {
        if old == new {
            return Ok(());
        }
        let expected = self.ty(old)?;
        let found = self.ty(new)?;
        if expected != found {
            return Err(Error::TypeMismatch { expected, found });
        }

        let function = self.name.clone();
        let uses = std::mem::take(&mut self.slot_mut(old)?.uses);
        for u in &uses {
            let ValueKind::Inst(inst) = &mut self.slot_mut(u.user)?.kind else {
                return Err(Error::MalformedFunction {
                    function,
                    reason: format!("use of {old} by a non-instruction"),
                });
            };
            inst.operands[u.index] = new;
        }
        self.slot_mut(new)?.uses.extend(uses);
        Ok(())
    }

    /// Removes an instruction from its block and empties its slot.
    pub fn erase_inst(&mut self, id: ValueId) -> Result<()> {
        let data = self.value(id)?;
        let Some(inst) = data.as_inst() else {
            return Err(self.malformed(format!("{id} is not an instruction")));
        };
        if !data.uses.is_empty() {
            return Err(Error::InstructionStillUsed(self.operand_text(id)));
        }
        let block = inst.block;
        let operands = inst.operands.clone();
        let is_terminator = inst.kind.is_terminator();

        for (index, operand) in operands.into_iter().enumerate() {
            if let Some(Some(data)) = self.values.get_mut(operand.0) {
                data.uses.retain(|u| !(u.user == id && u.index == index));
            }
        }
        self.cfg[block].insts.retain(|&v| v != id);

        if let Some(data) = self.values[id.0].take()
            && let Some(name) = data.name
        {
            self.names.remove(&name);
        }

        if is_terminator {
            self.sync_edges(block);
        }
        Ok(())
    }

    // ----------------------------------------------------------------------------------------
    // Queries
    // ----------------------------------------------------------------------------------------

    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Blocks in creation order.
    pub fn blocks(&self) -> Vec<NodeIndex> {
        self.cfg.node_indices().collect()
    }

    pub fn entry(&self) -> Option<NodeIndex> {
        self.cfg.node_indices().next()
    }

    pub fn block(&self, node: NodeIndex) -> Option<&Block> {
        self.cfg.node_weight(node)
    }

    pub fn block_by_label(&self, label: &str) -> Option<NodeIndex> {
        self.labels.get(label).copied()
    }

    pub fn label(&self, node: NodeIndex) -> &str {
        self.cfg
            .node_weight(node)
            .map(|b| b.label.as_str())
            .unwrap_or("<unknown>")
    }

    /// Outgoing CFG edges of `node`.
    pub fn successors(&self, node: NodeIndex) -> Vec<(NodeIndex, EdgeType)> {
        let mut out: Vec<_> = self
            .cfg
            .edges_directed(node, Direction::Outgoing)
            .map(|e| (e.target(), *e.weight()))
            .collect();
        out.sort_by_key(|(target, kind)| (*kind as u8, target.index()));
        out
    }

    pub fn value(&self, id: ValueId) -> Result<&ValueData> {
        self.values
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::StaleValue(id.0))
    }

    pub fn is_live(&self, id: ValueId) -> bool {
        self.value(id).is_ok()
    }

    pub fn ty(&self, id: ValueId) -> Result<Type> {
        self.value(id).map(|v| v.ty)
    }

    pub fn inst(&self, id: ValueId) -> Option<&Instruction> {
        self.value(id).ok().and_then(ValueData::as_inst)
    }

    pub fn uses(&self, id: ValueId) -> &[Use] {
        self.value(id).map(|v| v.uses.as_slice()).unwrap_or(&[])
    }

    pub fn lookup(&self, name: &str) -> Option<ValueId> {
        self.names.get(name).copied()
    }

    /// Pointer operand if `id` is a load.
    pub fn as_load(&self, id: ValueId) -> Option<ValueId> {
        match self.inst(id) {
            Some(Instruction {
                kind: InstKind::Load,
                operands,
                ..
            }) => operands.first().copied(),
            _ => None,
        }
    }

    /// Stored (zero-extended) literal if `id` is an integer constant.
    pub fn as_const_int(&self, id: ValueId) -> Option<u64> {
        match self.value(id).ok()?.kind {
            ValueKind::Constant(Constant::Int(value)) => Some(value),
            _ => None,
        }
    }

    pub fn block_insts(&self, node: NodeIndex) -> &[ValueId] {
        self.cfg
            .node_weight(node)
            .map(|b| b.insts.as_slice())
            .unwrap_or(&[])
    }

    /// Owning block and index of an instruction.
    pub fn position(&self, id: ValueId) -> Result<(NodeIndex, usize)> {
        let block = self
            .inst(id)
            .ok_or_else(|| self.malformed(format!("{id} is not a placed instruction")))?
            .block;
        let position = self
            .block_insts(block)
            .iter()
            .position(|&v| v == id)
            .ok_or_else(|| self.malformed(format!("{id} missing from its block")))?;
        Ok((block, position))
    }

    pub fn instruction_count(&self) -> usize {
        self.cfg.node_weights().map(|b| b.insts.len()).sum()
    }

    /// Every live slot, in allocation order.
    pub fn live_values(&self) -> impl Iterator<Item = (ValueId, &ValueData)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|data| (ValueId(i), data)))
    }

    /// Operand spelling used by the printer: `%name` or a literal.
    pub fn operand_text(&self, id: ValueId) -> String {
        match self.value(id) {
            Ok(ValueData {
                kind: ValueKind::Constant(c),
                ty,
                ..
            }) => match (c, ty) {
                (Constant::Int(v), Type::Int(1)) => {
                    if *v == 0 { "false" } else { "true" }.to_string()
                }
                (Constant::Int(v), Type::Int(bits)) => {
                    crate::types::sign_extend(*v, *bits).to_string()
                }
                (Constant::Int(v), _) => v.to_string(),
                (Constant::Float(f), _) => format!("{f:?}"),
            },
            Ok(ValueData {
                name: Some(name), ..
            }) => format!("%{name}"),
            Ok(_) => format!("%{id}"),
            Err(_) => format!("%<erased {id}>"),
        }
    }

    pub(crate) fn malformed(&self, reason: String) -> Error {
        Error::MalformedFunction {
            function: self.name.clone(),
            reason,
        }
    }

    // ----------------------------------------------------------------------------------------
    // Internals
    // ----------------------------------------------------------------------------------------

    fn alloc(&mut self, data: ValueData) -> ValueId {
        self.values.push(Some(data));
        ValueId(self.values.len() - 1)
    }

    fn intern(&mut self, ty: Type, constant: Constant) -> Result<ValueId> {
        let key_bits = match constant {
            Constant::Int(v) => v,
            Constant::Float(f) => f.to_bits(),
        };
        if let Some(id) = self.constants.get(&(ty, key_bits)) {
            return Ok(*id);
        }
        let id = self.alloc(ValueData {
            ty,
            name: None,
            kind: ValueKind::Constant(constant),
            uses: Vec::new(),
        });
        self.constants.insert((ty, key_bits), id);
        Ok(id)
    }

    fn bind_name(&mut self, id: ValueId, name: &str) -> Result<()> {
        if name.is_empty() || self.names.contains_key(name) {
            return Err(self.malformed(format!("duplicate or empty value name '%{name}'")));
        }
        self.names.insert(name.to_string(), id);
        self.slot_mut(id)?.name = Some(name.to_string());
        Ok(())
    }

    fn fresh_name(&mut self) -> String {
        loop {
            let candidate = format!("t{}", self.next_temp);
            self.next_temp += 1;
            if !self.names.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn slot_mut(&mut self, id: ValueId) -> Result<&mut ValueData> {
        self.values
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::StaleValue(id.0))
    }

    fn block_ref(&self, node: NodeIndex) -> Result<&Block> {
        self.cfg
            .node_weight(node)
            .ok_or_else(|| Error::UnknownBlock(format!("#{}", node.index())))
    }

    /// Rebuilds the outgoing edges of `block` from its last instruction.
    fn sync_edges(&mut self, block: NodeIndex) {
        let stale: Vec<_> = self
            .cfg
            .edges_directed(block, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.cfg.remove_edge(edge);
        }

        let targets = self
            .cfg
            .node_weight(block)
            .and_then(|b| b.insts.last())
            .and_then(|last| self.inst(*last))
            .map(|inst| inst.kind.targets())
            .unwrap_or_default();
        for (target, kind) in targets {
            self.cfg.add_edge(block, target, kind);
        }
    }
}

/// An ordered collection of functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub functions: Vec<Function>,
}

impl Module {
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))
    }

    pub fn instruction_count(&self) -> usize {
        self.functions.iter().map(Function::instruction_count).sum()
    }
}
