//! Module for the `obfuscate` subcommand, which rewrites integer arithmetic in textual IR.
//!
//! The IR is parsed, run through the pass pipeline from `obscura-transform`, optionally
//! re-validated, and printed. Rewrite diagnostics go to stderr through `tracing`.

use crate::commands::{CliError, read_input, write_output};
use clap::Args;
use obscura_core::parser::parse_module;
use obscura_core::seed::Seed;
use obscura_core::validator::validate_module;
use obscura_transform::obfuscator::{
    DEFAULT_PIPELINE, ObfuscationConfig, ObfuscationResult, Seeding, obfuscate_module,
};
use std::error::Error;
use std::fs;
use tracing::{info, warn};

/// Arguments for the `obfuscate` subcommand.
#[derive(Args)]
pub struct ObfuscateArgs {
    /// Input IR file, or `-` for stdin.
    pub input: String,
    /// Comma-separated pass pipeline (`math-obfuscator`, `function-names`).
    #[arg(long, default_value = DEFAULT_PIPELINE)]
    pub passes: String,
    /// 256-bit seed as 64 hex characters, for reproducible output. Random when omitted.
    #[arg(long)]
    pub seed: Option<String>,
    /// Derive an independent random stream per function from the seed and function name.
    #[arg(long)]
    pub per_function_seed: bool,
    /// Only apply rewrites that are true identities.
    #[arg(long)]
    pub sound_only: bool,
    /// Write the obfuscated IR here instead of stdout.
    #[arg(long, short)]
    pub output: Option<String>,
    /// Path to emit the rewrite report as JSON.
    #[arg(long, value_name = "PATH")]
    pub emit: Option<String>,
    /// Validate the rewritten IR and fail if it is malformed.
    #[arg(long)]
    pub verify: bool,
}

impl super::Command for ObfuscateArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let ObfuscateArgs {
            input,
            passes,
            seed,
            per_function_seed,
            sound_only,
            output,
            emit,
            verify,
        } = self;

        let source = read_input(&input)?;
        let mut module = parse_module(&source).map_err(CliError::from)?;

        let seed = match seed {
            Some(hex) => Seed::from_hex(&hex)
                .map_err(|e| CliError::InvalidArgument(format!("invalid seed: {e}")))?,
            None => Seed::generate(),
        };
        let config = ObfuscationConfig {
            seed,
            pipeline: passes,
            seeding: if per_function_seed {
                Seeding::PerFunction
            } else {
                Seeding::Shared
            },
            sound_only,
        };

        let result = obfuscate_module(&mut module, &config).map_err(CliError::from)?;
        print_summary(&result);

        if verify {
            validate_module(&module).map_err(CliError::from)?;
            info!("verification passed");
        }

        if let Some(path) = emit.as_deref() {
            fs::write(path, serde_json::to_string_pretty(&result)?)?;
            info!("wrote rewrite report to {path}");
        }

        write_output(output.as_deref(), &module.to_string())?;
        Ok(())
    }
}

fn print_summary(result: &ObfuscationResult) {
    info!("seed: {}", result.seed);
    for func in &result.functions {
        info!(
            "@{}: {} -> {} instructions{}",
            func.name,
            func.instructions_before,
            func.instructions_after,
            if func.modified { "" } else { " (unchanged)" }
        );
    }
    let unsound = result.unsound_rewrites();
    if unsound > 0 {
        warn!(
            "{unsound} of {} rewrites used non-identity rules; rerun with --sound-only to exclude them",
            result.rewrites.len()
        );
    }
}
