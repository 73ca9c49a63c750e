//! Module for the `eval` subcommand: run a function in the reference interpreter.
//!
//! Arguments are given in parameter order. Integer and float parameters take a plain literal.
//! Pointer parameters take `iN:V`, which allocates a cell holding `V` as an `iN`; the cell's
//! final content is printed after the call.

use crate::commands::CliError;
use clap::Args;
use obscura_core::eval::{Machine, RuntimeValue};
use obscura_core::parser::parse_module;
use obscura_core::{Function, Type};
use std::error::Error;

use super::read_input;

/// Arguments for the `eval` subcommand.
#[derive(Args)]
pub struct EvalArgs {
    /// Input IR file, or `-` for stdin.
    pub input: String,
    /// Name of the function to run, without `@`.
    #[arg(long, short)]
    pub function: String,
    /// Comma-separated arguments.
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub args: Vec<String>,
    /// Maximum number of instructions to execute.
    #[arg(long, default_value_t = obscura_core::eval::DEFAULT_STEP_LIMIT)]
    pub step_limit: usize,
}

impl super::Command for EvalArgs {
    fn execute(self) -> Result<(), Box<dyn Error>> {
        let source = read_input(&self.input)?;
        let module = parse_module(&source).map_err(CliError::from)?;
        let func = module.function(&self.function).map_err(CliError::from)?;

        let mut machine = Machine::new().with_step_limit(self.step_limit);
        let args = bind_arguments(func, &self.args, &mut machine)?;
        let result = machine.call(func, &args).map_err(CliError::from)?;

        println!("{}", render(result));
        for (index, arg) in args.iter().enumerate() {
            if let RuntimeValue::Ptr(_) = arg {
                let cell = machine.read(*arg).map_err(CliError::from)?;
                println!("arg{index} -> {}", render(cell));
            }
        }
        Ok(())
    }
}

fn bind_arguments(
    func: &Function,
    raw: &[String],
    machine: &mut Machine,
) -> Result<Vec<RuntimeValue>, CliError> {
    let raw: Vec<&str> = raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if raw.len() != func.params().len() {
        return Err(CliError::InvalidArgument(format!(
            "@{} takes {} arguments, {} given",
            func.name,
            func.params().len(),
            raw.len()
        )));
    }

    func.params()
        .iter()
        .zip(raw)
        .map(|(param, text)| -> Result<RuntimeValue, CliError> {
            let ty = func.ty(*param)?;
            match ty {
                Type::Ptr => {
                    let (cell_ty, value) = text.split_once(':').ok_or_else(|| {
                        CliError::InvalidArgument(format!("pointer argument must be `iN:V`, got `{text}`"))
                    })?;
                    let cell_ty: Type = cell_ty.parse()?;
                    Ok(machine.alloc(literal(cell_ty, value)?))
                }
                ty => literal(ty, text),
            }
        })
        .collect()
}

fn literal(ty: Type, text: &str) -> Result<RuntimeValue, CliError> {
    let invalid = || CliError::InvalidArgument(format!("`{text}` is not a valid {ty}"));
    match ty {
        Type::Int(bits) => {
            let value: i128 = text.parse().map_err(|_| invalid())?;
            if !(i64::MIN as i128..=u64::MAX as i128).contains(&value) {
                return Err(invalid());
            }
            // Unsigned spellings above i64::MAX keep their bit pattern.
            Ok(RuntimeValue::int(bits, value as u64 as i64))
        }
        Type::F32 | Type::F64 => Ok(RuntimeValue::Float(text.parse().map_err(|_| invalid())?)),
        _ => Err(invalid()),
    }
}

fn render(value: RuntimeValue) -> String {
    match value {
        RuntimeValue::Int { .. } => value.as_i64().map(|v| v.to_string()).unwrap_or_default(),
        RuntimeValue::Float(f) => format!("{f:?}"),
        RuntimeValue::Ptr(cell) => format!("ptr #{cell}"),
        RuntimeValue::Void => "void".to_string(),
    }
}
