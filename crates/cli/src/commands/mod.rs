use clap::Subcommand;
use std::error::Error;
use std::fs;
use std::io::Read;

pub mod check;
pub mod eval;
pub mod obfuscate;

use thiserror::Error;

/// Errors raised by the subcommands themselves.
#[derive(Debug, Error)]
pub enum CliError {
    /// File or stream read/write error.
    #[error("file error: {0}")]
    File(#[from] std::io::Error),
    /// IR could not be loaded or executed.
    #[error(transparent)]
    Core(#[from] obscura_core::Error),
    /// Pipeline construction or a pass failed.
    #[error("transform error: {0}")]
    Transform(#[from] obscura_transform::Error),
    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A command-line value could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// CLI subcommands for Obscura.
#[derive(Subcommand)]
pub enum Cmd {
    /// Rewrite integer arithmetic with obfuscating identities.
    Obfuscate(obfuscate::ObfuscateArgs),
    /// Parse and validate IR, then print it in canonical form.
    Check(check::CheckArgs),
    /// Run one function in the reference interpreter.
    Eval(eval::EvalArgs),
}

/// Trait for executing CLI subcommands.
pub trait Command {
    /// Executes the subcommand.
    fn execute(self) -> Result<(), Box<dyn Error>>;
}

impl Command for Cmd {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Obfuscate(args) => args.execute(),
            Cmd::Check(args) => args.execute(),
            Cmd::Eval(args) => args.execute(),
        }
    }
}

/// Reads IR text from a file, or from stdin when `input` is `-`.
pub(crate) fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(input).map_err(|source| {
            CliError::Core(obscura_core::Error::FileRead {
                path: input.to_string(),
                source,
            })
        })
    }
}

/// Writes `text` to `path`, or to stdout when no path is given.
pub(crate) fn write_output(path: Option<&str>, text: &str) -> Result<(), CliError> {
    match path {
        Some(path) => fs::write(path, text)?,
        None => print!("{text}"),
    }
    Ok(())
}
