//! Library half of the `obscura` binary: subcommand definitions and their execution.

pub mod commands;
