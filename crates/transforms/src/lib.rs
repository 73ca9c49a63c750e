pub mod function_names;
pub mod math_obfuscator;
pub mod obfuscator;
pub mod pass;

use obscura_core::Function;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use math_obfuscator::{MathConfig, MathObfuscator};

/// Transform error type encompassing all transform module errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Core IR operation failed.
    #[error("core operation failed: {0}")]
    Core(#[from] obscura_core::Error),

    /// Pipeline string names a pass nobody registered.
    #[error("unknown pass '{0}'")]
    UnknownPass(String),

    /// Pipeline string resolved to no passes at all.
    #[error("pipeline is empty")]
    EmptyPipeline,
}

/// Transform result type
pub type Result<T> = std::result::Result<T, Error>;

/// Whether a catalogued rewrite is a true identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Soundness {
    Sound,
    /// Kept for fidelity with the catalogue; changes results for some inputs.
    Unsound,
}

/// One applied rewrite, as recorded in the obfuscation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRecord {
    pub function: String,
    pub block: String,
    /// The replaced instruction as printed before the rewrite.
    pub original: String,
    pub rule: String,
    /// Human-readable identity, e.g. `x + x → x * 2`.
    pub identity: String,
    pub soundness: Soundness,
}

/// A function-level IR transform.
pub trait Transform: Send {
    /// Returns the transform's name for logging and identification.
    fn name(&self) -> &'static str;

    /// Rewrites `func` in place, returning whether anything changed.
    fn apply(&mut self, func: &mut Function) -> Result<bool>;

    /// Hands over the rewrites performed since the last call.
    fn drain_records(&mut self) -> Vec<RewriteRecord> {
        Vec::new()
    }
}
