//! Math obfuscator.
//!
//! Replaces integer `add`, `sub`, `mul` and `sdiv` instructions with equivalent instruction
//! sequences drawn from a fixed catalogue, one draw per rewritten instruction:
//!
//! ```text
//! %r = add i32 %x, %x          %t0 = mul i32 %x, 3
//!                        ==>   %t1 = sub i32 %t0, %x
//! ```
//!
//! Each instruction is visited once. Replacements are inserted before the instruction they
//! replace, its consumers are moved to the replacement, and the original is erased. Every
//! rewrite logs its identity under the `obscura::math` target.

pub mod catalogue;
pub mod choice;
pub mod classify;

pub use catalogue::{Entry, Operator, Rule};
pub use choice::{ChoiceSource, FixedChoice, PerFunctionRng};
pub use classify::{OperandPattern, classify};

use crate::{Result, RewriteRecord, Soundness, Transform};
use obscura_core::{Builder, Function, Seed, ValueId};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, info, warn};

/// Tunables for [`MathObfuscator`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathConfig {
    /// Drop catalogue alternatives that are not true identities.
    pub sound_only: bool,
}

/// The rewrite engine. Owns its choice source; use one instance per function at a time.
#[derive(Debug)]
pub struct MathObfuscator<S = StdRng> {
    source: S,
    config: MathConfig,
    records: Vec<RewriteRecord>,
}

struct Applied {
    value: ValueId,
    rule: &'static str,
    identity: Cow<'static, str>,
    soundness: Soundness,
}

impl MathObfuscator<StdRng> {
    /// Engine seeded from OS entropy.
    pub fn new() -> Self {
        Self::from_seed(&Seed::generate())
    }

    pub fn from_seed(seed: &Seed) -> Self {
        Self::with_source(seed.create_deterministic_rng())
    }
}

impl Default for MathObfuscator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl MathObfuscator<PerFunctionRng> {
    /// Engine whose draws for a function depend only on `seed` and the function's name.
    pub fn per_function(seed: Seed) -> Self {
        Self::with_source(PerFunctionRng::new(seed))
    }
}

impl<S: ChoiceSource> MathObfuscator<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            config: MathConfig::default(),
            records: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: MathConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> MathConfig {
        self.config
    }

    /// Rewrites accumulated since the last drain.
    pub fn records(&self) -> &[RewriteRecord] {
        &self.records
    }

    /// Runs the engine over every block of `func`. Returns whether any instruction was replaced.
    pub fn run(&mut self, func: &mut Function) -> Result<bool> {
        debug!("=== MathObfuscator @{} ===", func.name);
        self.source.enter_function(&func.name);

        let mut modified = false;
        let mut rewrites = 0usize;

        for block in func.blocks() {
            // Taken before any mutation: replacements land before the instruction they replace
            // and are never visited.
            let insts = func.block_insts(block).to_vec();
            for id in insts {
                let original = func.display_inst(id);
                let Some(applied) = self.rewrite(func, id)? else {
                    continue;
                };
                func.replace_all_uses(id, applied.value)?;
                func.erase_inst(id)?;

                info!(target: "obscura::math", "{}", applied.identity);
                if applied.soundness == Soundness::Unsound {
                    warn!(
                        target: "obscura::math",
                        "@{}: `{original}` rewritten with non-identity rule {}",
                        func.name,
                        applied.rule
                    );
                }

                self.records.push(RewriteRecord {
                    function: func.name.clone(),
                    block: func.label(block).to_string(),
                    original,
                    rule: applied.rule.to_string(),
                    identity: applied.identity.into_owned(),
                    soundness: applied.soundness,
                });
                modified = true;
                rewrites += 1;
            }
        }

        debug!("@{}: {} instructions rewritten", func.name, rewrites);
        Ok(modified)
    }

    /// Emits a replacement for `id` if it is an integer add/sub/mul/sdiv the catalogue covers.
    fn rewrite(&mut self, func: &mut Function, id: ValueId) -> Result<Option<Applied>> {
        let Some(inst) = func.inst(id) else {
            return Ok(None);
        };
        let Some(op) = inst.kind.binary_op().and_then(Operator::from_binary) else {
            return Ok(None);
        };
        let Some(bits) = func.ty(id)?.int_bits() else {
            return Ok(None);
        };
        let (lhs, rhs) = (inst.operands[0], inst.operands[1]);
        let pattern = classify(func, lhs, rhs);

        let applied = match catalogue::lookup(func, op, pattern, rhs) {
            Entry::Choose(rules) => {
                let eligible: Vec<&Rule> = rules
                    .iter()
                    .filter(|r| r.fits(bits))
                    .filter(|r| !self.config.sound_only || r.soundness == Soundness::Sound)
                    .collect();
                let rule = match eligible.len() {
                    0 => return Ok(None),
                    1 => eligible[0],
                    n => eligible[self.source.choose(n) % n],
                };
                let (a, b) = match pattern {
                    OperandPattern::Same(base) => (base, base),
                    OperandPattern::Distinct => (lhs, rhs),
                };
                let mut builder = Builder::before(func, id)?;
                Applied {
                    value: rule.emit(&mut builder, a, b)?,
                    rule: rule.id,
                    identity: Cow::Borrowed(rule.identity),
                    soundness: rule.soundness,
                }
            }
            Entry::ShiftLeft { shift, factor } => {
                let mut builder = Builder::before(func, id)?;
                Applied {
                    value: builder.shl_const(lhs, shift as i64)?,
                    rule: "mul-diff-shl",
                    identity: Cow::Owned(format!("a * {factor} → a << {shift}")),
                    soundness: Soundness::Sound,
                }
            }
            Entry::Abstain => return Ok(None),
        };
        Ok(Some(applied))
    }
}

impl<S: ChoiceSource + Send> Transform for MathObfuscator<S> {
    fn name(&self) -> &'static str {
        "math-obfuscator"
    }

    fn apply(&mut self, func: &mut Function) -> Result<bool> {
        self.run(func)
    }

    fn drain_records(&mut self) -> Vec<RewriteRecord> {
        std::mem::take(&mut self.records)
    }
}
