//! Value types and fixed-width integer helpers.

use crate::result::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Widest integer the IR can represent.
pub const MAX_INT_BITS: u32 = 64;

/// Type of a value. Integers are signless; operators decide signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Int(u32),
    F32,
    F64,
    Ptr,
}

impl Type {
    /// Builds an integer type, rejecting widths the IR cannot hold.
    pub fn int(bits: u32) -> Result<Self> {
        if bits == 0 || bits > MAX_INT_BITS {
            return Err(Error::UnsupportedType(format!("i{bits}")));
        }
        Ok(Type::Int(bits))
    }

    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Type::Int(_))
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Bit width for integer types.
    #[inline]
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            Type::Int(bits) => Some(*bits),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int(bits) => write!(f, "i{bits}"),
            Type::F32 => write!(f, "float"),
            Type::F64 => write!(f, "double"),
            Type::Ptr => write!(f, "ptr"),
        }
    }
}

impl FromStr for Type {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "void" => Ok(Type::Void),
            "float" => Ok(Type::F32),
            "double" => Ok(Type::F64),
            "ptr" => Ok(Type::Ptr),
            _ => {
                let bits = s
                    .strip_prefix('i')
                    .and_then(|b| b.parse::<u32>().ok())
                    .ok_or_else(|| Error::UnsupportedType(s.to_string()))?;
                Type::int(bits)
            }
        }
    }
}

/// All-ones mask for a `bits`-wide integer.
#[inline]
pub fn mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Truncates to `bits`, the canonical stored form of an integer.
#[inline]
pub fn truncate(value: u64, bits: u32) -> u64 {
    value & mask(bits)
}

/// Reinterprets the low `bits` of `value` as a two's complement number.
#[inline]
pub fn sign_extend(value: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

/// Smallest signed value of the width, in stored form.
#[inline]
pub fn signed_min(bits: u32) -> u64 {
    1u64 << (bits - 1)
}

/// Largest signed value of the width, in stored form.
#[inline]
pub fn signed_max(bits: u32) -> u64 {
    mask(bits) >> 1
}
