use crate::math_obfuscator::MathConfig;
use crate::pass::PassRegistry;
use crate::{Result, RewriteRecord, Soundness};
use obscura_core::seed::Seed;
use obscura_core::{Module, parser};
use serde::{Deserialize, Serialize};

pub use crate::pass::Seeding;

/// Pipeline used when none is given.
pub const DEFAULT_PIPELINE: &str = "math-obfuscator";

/// Configuration for the obfuscation pipeline
#[derive(Debug, Clone)]
pub struct ObfuscationConfig {
    /// Seed every random choice derives from
    pub seed: Seed,
    /// Comma-separated pass names
    pub pipeline: String,
    pub seeding: Seeding,
    /// Exclude catalogue rules that are not true identities
    pub sound_only: bool,
}

impl ObfuscationConfig {
    /// Create config with a specific seed
    pub fn with_seed(seed: Seed) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for ObfuscationConfig {
    fn default() -> Self {
        Self {
            seed: Seed::generate(),
            pipeline: DEFAULT_PIPELINE.to_string(),
            seeding: Seeding::default(),
            sound_only: false,
        }
    }
}

/// Per-function outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub name: String,
    pub instructions_before: usize,
    pub instructions_after: usize,
    pub modified: bool,
}

/// Result of the obfuscation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObfuscationResult {
    /// Seed as hex (with 0x prefix); rerunning with it reproduces the output
    pub seed: String,
    /// Names of the passes that ran, in order
    pub pipeline: Vec<String>,
    pub seeding: Seeding,
    pub sound_only: bool,
    pub functions: Vec<FunctionSummary>,
    /// Every applied rewrite, in application order
    pub rewrites: Vec<RewriteRecord>,
}

impl ObfuscationResult {
    pub fn modified(&self) -> bool {
        self.functions.iter().any(|f| f.modified)
    }

    pub fn unsound_rewrites(&self) -> usize {
        self.rewrites
            .iter()
            .filter(|r| r.soundness == Soundness::Unsound)
            .count()
    }
}

/// Runs the configured pipeline over every function of `module`, in order.
pub fn obfuscate_module(module: &mut Module, config: &ObfuscationConfig) -> Result<ObfuscationResult> {
    tracing::debug!("Starting obfuscation pipeline:");
    tracing::debug!("  Pipeline: {}", config.pipeline);
    tracing::debug!("  Seeding: {:?}", config.seeding);
    tracing::debug!("  Functions: {}", module.functions.len());

    let mut manager = PassRegistry::new(config.seed.clone())
        .with_seeding(config.seeding)
        .with_math_config(MathConfig {
            sound_only: config.sound_only,
        })
        .parse_pipeline(&config.pipeline)?;

    let mut functions = Vec::with_capacity(module.functions.len());
    for func in &mut module.functions {
        let instructions_before = func.instruction_count();
        let preserved = manager.run(func)?;
        let instructions_after = func.instruction_count();

        tracing::debug!(
            "  @{}: {} -> {} instructions ({:?} preserved)",
            func.name,
            instructions_before,
            instructions_after,
            preserved
        );
        functions.push(FunctionSummary {
            name: func.name.clone(),
            instructions_before,
            instructions_after,
            modified: preserved == crate::pass::PreservedAnalyses::None,
        });
    }

    let result = ObfuscationResult {
        seed: config.seed.to_hex(),
        pipeline: manager.names().into_iter().map(str::to_string).collect(),
        seeding: config.seeding,
        sound_only: config.sound_only,
        functions,
        rewrites: manager.drain_records(),
    };

    tracing::debug!(
        "Obfuscation complete: {} rewrites ({} unsound)",
        result.rewrites.len(),
        result.unsound_rewrites()
    );
    Ok(result)
}

/// Parses textual IR and obfuscates it.
pub fn obfuscate_source(source: &str, config: &ObfuscationConfig) -> Result<(Module, ObfuscationResult)> {
    let mut module = parser::parse_module(source)?;
    let result = obfuscate_module(&mut module, config)?;
    Ok((module, result))
}
