//! Diagnostic pass that reports which functions the pipeline visits.

use crate::{Result, Transform};
use obscura_core::Function;
use tracing::info;

/// Logs each function's name and leaves the IR untouched.
#[derive(Debug, Default)]
pub struct FunctionNames {
    seen: Vec<String>,
}

impl FunctionNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names logged so far, in visiting order.
    pub fn seen(&self) -> &[String] {
        &self.seen
    }
}

impl Transform for FunctionNames {
    fn name(&self) -> &'static str {
        "function-names"
    }

    fn apply(&mut self, func: &mut Function) -> Result<bool> {
        info!(target: "obscura::names", "function: {}", func.name);
        self.seen.push(func.name.clone());
        Ok(false)
    }
}
