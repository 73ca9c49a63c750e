//! Operand-pair classification.

use obscura_core::{Function, ValueId};

/// Whether the two operands of a binary instruction denote one runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandPattern {
    /// Same value. Carries the base operand the catalogue rewrites in terms of.
    Same(ValueId),
    Distinct,
}

/// Classifies `lhs`/`rhs`. The base of a [`OperandPattern::Same`] is always `lhs`.
///
/// Two loads through the identical pointer value count as the same value. No attempt is made to
/// prove the memory is unchanged between them, so a store to that pointer between the loads makes
/// this answer wrong.
pub fn classify(func: &Function, lhs: ValueId, rhs: ValueId) -> OperandPattern {
    if lhs == rhs || same_load_source(func, lhs, rhs) {
        OperandPattern::Same(lhs)
    } else {
        OperandPattern::Distinct
    }
}

fn same_load_source(func: &Function, lhs: ValueId, rhs: ValueId) -> bool {
    match (func.as_load(lhs), func.as_load(rhs)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
