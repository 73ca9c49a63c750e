//! Core results and error types

use crate::types::Type;
use thiserror::Error;

/// Core error type encompassing all core module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A signed division overflowed (`MIN sdiv -1`).
    #[error("signed division overflow")]
    DivisionOverflow,

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Failed to read file at the specified path.
    #[error("could not read file '{path}': {source}")]
    FileRead {
        /// The path to the file that could not be read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Erasing an instruction whose result is still consumed.
    #[error("instruction '{0}' still has uses")]
    InstructionStillUsed(String),

    /// Wrong number or kind of arguments supplied to the interpreter.
    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// Memory access through something that is not a live cell.
    #[error("invalid pointer access: {0}")]
    InvalidPointer(String),

    /// Invalid hexadecimal in seed.
    #[error("invalid hexadecimal in seed")]
    InvalidSeedHex,

    /// Invalid seed length.
    #[error("invalid seed length: expected 64 hex chars, got {0}")]
    InvalidSeedLength(usize),

    /// The validator found a structural problem.
    #[error("malformed function '@{function}': {reason}")]
    MalformedFunction {
        /// Function being validated.
        function: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Control reached the end of a block without a terminator.
    #[error("block '{0}' ends without a terminator")]
    MissingReturn(String),

    /// An integer operation received a non-integer operand.
    #[error("expected an integer type, found {0}")]
    NotAnInteger(Type),

    /// Failed to parse textual IR at the specified line.
    #[error("IR parse error at line {line}: {msg} ⇒ `{raw}`")]
    ParseError {
        /// The line number where parsing failed (1-based).
        line: usize,
        /// Description of the parsing error.
        msg: String,
        /// The raw content that failed to parse.
        raw: String,
    },

    /// A value id refers to an erased slot.
    #[error("value {0} was erased")]
    StaleValue(usize),

    /// A shift amount not smaller than the operand width.
    #[error("shift by {amount} on a {bits}-bit value")]
    ShiftTooLarge {
        /// Requested shift.
        amount: u64,
        /// Operand width.
        bits: u32,
    },

    /// The interpreter exhausted its step budget.
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(usize),

    /// Operand types disagree.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type required by the operation.
        expected: Type,
        /// The type actually supplied.
        found: Type,
    },

    /// A block reference does not resolve.
    #[error("unknown block '{0}'")]
    UnknownBlock(String),

    /// A named function does not exist in the module.
    #[error("unknown function '@{0}'")]
    UnknownFunction(String),

    /// A value name does not resolve.
    #[error("unknown value '%{0}'")]
    UnknownValue(String),

    /// The type is outside what the IR supports.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),
}

/// Core result type
pub type Result<T> = std::result::Result<T, Error>;
