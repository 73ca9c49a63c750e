//! Module for the `check` subcommand: parse, validate and reprint IR.

use crate::commands::{CliError, read_input, write_output};
use clap::Args;
use obscura_core::parser::parse_module;
use obscura_core::validator::validate_module;
use std::error::Error;
use tracing::info;

/// Arguments for the `check` subcommand.
#[derive(Args)]
pub struct CheckArgs {
    /// Input IR file, or `-` for stdin.
    pub input: String,
    /// Only validate; do not print the canonical form.
    #[arg(long, short)]
    pub quiet: bool,
}

impl super::Command for CheckArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let source = read_input(&self.input)?;
        let module = parse_module(&source).map_err(CliError::from)?;
        validate_module(&module).map_err(CliError::from)?;

        info!(
            "{}: {} functions, {} instructions, valid",
            self.input,
            module.functions.len(),
            module.instruction_count()
        );
        if !self.quiet {
            write_output(None, &module.to_string())?;
        }
        Ok(())
    }
}
