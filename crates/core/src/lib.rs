//! Core IR for obscura: an SSA function representation with a petgraph control-flow graph,
//! a textual parser and printer, a structural validator and a reference interpreter.

pub mod builder;
pub mod eval;
pub mod ir;
pub mod parser;
pub mod printer;
pub mod result;
pub mod seed;
pub mod types;
pub mod validator;

pub use builder::Builder;
pub use ir::{BinaryOp, Function, InstKind, Module, ValueId};
pub use result::{Error, Result};
pub use seed::Seed;
pub use types::Type;

use std::path::Path;

/// Reads and parses a module from an `.ll`-style text file.
pub fn read_module(path: impl AsRef<Path>) -> Result<Module> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    parser::parse_module(&text)
}
