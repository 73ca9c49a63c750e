use crate::function_names::FunctionNames;
use crate::math_obfuscator::{MathConfig, MathObfuscator};
use crate::{Error, Result, RewriteRecord, Transform};
use obscura_core::Function;
use obscura_core::seed::Seed;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What a pass run leaves valid for later analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreservedAnalyses {
    All,
    None,
}

impl PreservedAnalyses {
    pub fn from_modified(modified: bool) -> Self {
        if modified {
            PreservedAnalyses::None
        } else {
            PreservedAnalyses::All
        }
    }
}

/// How random streams are assigned to functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Seeding {
    /// One stream for the whole module, consumed in function order.
    #[default]
    Shared,
    /// A stream per function, derived from the seed and the function name.
    PerFunction,
}

/// Resolves pipeline names to configured transforms.
#[derive(Debug, Clone)]
pub struct PassRegistry {
    seed: Seed,
    seeding: Seeding,
    math: MathConfig,
}

impl PassRegistry {
    /// Every name [`PassRegistry::create`] accepts.
    pub const NAMES: &'static [&'static str] = &["function-names", "math-obfuscator"];

    pub fn new(seed: Seed) -> Self {
        Self {
            seed,
            seeding: Seeding::default(),
            math: MathConfig::default(),
        }
    }

    pub fn with_seeding(mut self, seeding: Seeding) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_math_config(mut self, math: MathConfig) -> Self {
        self.math = math;
        self
    }

    /// Builds the transform registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Transform>> {
        let pass: Box<dyn Transform> = match name {
            "function-names" => Box::new(FunctionNames::new()),
            "math-obfuscator" => match self.seeding {
                Seeding::Shared => {
                    Box::new(MathObfuscator::from_seed(&self.seed).with_config(self.math))
                }
                Seeding::PerFunction => Box::new(
                    MathObfuscator::per_function(self.seed.clone()).with_config(self.math),
                ),
            },
            other => return Err(Error::UnknownPass(other.to_string())),
        };
        Ok(pass)
    }

    /// Parses a comma-separated pipeline such as `function-names,math-obfuscator`.
    pub fn parse_pipeline(&self, pipeline: &str) -> Result<FunctionPassManager> {
        let mut manager = FunctionPassManager::new();
        for name in pipeline.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            manager.add_pass(self.create(name)?);
        }
        if manager.is_empty() {
            return Err(Error::EmptyPipeline);
        }
        Ok(manager)
    }
}

/// Runs an ordered list of transforms over one function at a time.
#[derive(Default)]
pub struct FunctionPassManager {
    passes: Vec<Box<dyn Transform>>,
}

impl FunctionPassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pass(&mut self, pass: Box<dyn Transform>) {
        self.passes.push(pass);
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Applies every pass to `func`. A failing pass leaves `func` as it was before that pass.
    pub fn run(&mut self, func: &mut Function) -> Result<PreservedAnalyses> {
        let mut modified = false;
        for pass in &mut self.passes {
            let before = func.instruction_count();
            let mut snapshot = func.clone();

            let mutated = pass.apply(&mut snapshot)?;
            if !mutated {
                debug!("{:>16} @{}: unchanged", pass.name(), func.name);
                continue;
            }

            let after = snapshot.instruction_count();
            info!(
                "{:>16} @{}: {} -> {} instructions",
                pass.name(),
                func.name,
                before,
                after
            );
            *func = snapshot;
            modified = true;
        }
        Ok(PreservedAnalyses::from_modified(modified))
    }

    /// Collects the rewrite records of every pass.
    pub fn drain_records(&mut self) -> Vec<RewriteRecord> {
        self.passes
            .iter_mut()
            .flat_map(|p| p.drain_records())
            .collect()
    }
}

impl std::fmt::Debug for FunctionPassManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionPassManager")
            .field("passes", &self.names())
            .finish()
    }
}
