//! Instruction builder anchored before an existing instruction.
//!
//! Everything a [`Builder`] creates lands immediately before its anchor, in emission order, so
//! the operands it consumes (which dominate the anchor) stay valid. Integer helpers check that
//! both operands share one integer type; a mismatch is a caller bug and surfaces as
//! [`Error::TypeMismatch`] or [`Error::NotAnInteger`].

use crate::ir::{BinaryOp, Function, InstKind, ValueId};
use crate::result::{Error, Result};
use crate::types::Type;

pub struct Builder<'f> {
    func: &'f mut Function,
    anchor: ValueId,
}

impl<'f> Builder<'f> {
    /// Positions a builder before `anchor`, which must be a placed instruction.
    pub fn before(func: &'f mut Function, anchor: ValueId) -> Result<Self> {
        func.position(anchor)?;
        Ok(Self { func, anchor })
    }

    pub fn func(&self) -> &Function {
        &*self.func
    }

    pub fn ty(&self, value: ValueId) -> Result<Type> {
        self.func.ty(value)
    }

    /// Integer constant of `ty`, truncated to its width.
    pub fn const_int(&mut self, ty: Type, value: i64) -> Result<ValueId> {
        self.func.const_int(ty, value)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        let ty = self.func.ty(lhs)?;
        let rhs_ty = self.func.ty(rhs)?;
        if ty != rhs_ty {
            return Err(Error::TypeMismatch {
                expected: ty,
                found: rhs_ty,
            });
        }
        if op.is_float() != ty.is_float() || !(ty.is_int() || ty.is_float()) {
            return Err(Error::NotAnInteger(ty));
        }
        self.func
            .insert_before(self.anchor, InstKind::Binary(op), vec![lhs, rhs], ty)
    }

    pub fn add(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn sdiv(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::SDiv, lhs, rhs)
    }

    pub fn shl(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::Shl, lhs, rhs)
    }

    pub fn xor(&mut self, lhs: ValueId, rhs: ValueId) -> Result<ValueId> {
        self.binary(BinaryOp::Xor, lhs, rhs)
    }

    /// `x * c` with `c` materialized in the type of `x`.
    pub fn mul_const(&mut self, x: ValueId, c: i64) -> Result<ValueId> {
        let k = self.int_const_like(x, c)?;
        self.mul(x, k)
    }

    pub fn shl_const(&mut self, x: ValueId, amount: i64) -> Result<ValueId> {
        let k = self.int_const_like(x, amount)?;
        self.shl(x, k)
    }

    pub fn add_const(&mut self, x: ValueId, c: i64) -> Result<ValueId> {
        let k = self.int_const_like(x, c)?;
        self.add(x, k)
    }

    pub fn sub_const(&mut self, x: ValueId, c: i64) -> Result<ValueId> {
        let k = self.int_const_like(x, c)?;
        self.sub(x, k)
    }

    /// `sub 0, x`
    pub fn neg(&mut self, x: ValueId) -> Result<ValueId> {
        let zero = self.int_const_like(x, 0)?;
        self.sub(zero, x)
    }

    /// `xor x, -1`
    pub fn not(&mut self, x: ValueId) -> Result<ValueId> {
        let ones = self.int_const_like(x, -1)?;
        self.xor(x, ones)
    }

    /// Constant of the same integer type as `like`.
    pub fn int_const_like(&mut self, like: ValueId, value: i64) -> Result<ValueId> {
        let ty = self.func.ty(like)?;
        if !ty.is_int() {
            return Err(Error::NotAnInteger(ty));
        }
        self.func.const_int(ty, value)
    }
}
