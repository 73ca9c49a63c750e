use clap::Parser;
use obscura_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Obscura CLI
///
/// Obscura rewrites integer arithmetic in textual SSA IR into equivalent but harder to read
/// instruction sequences. It can also validate IR and run functions in a reference interpreter.
#[derive(Parser)]
#[command(name = "obscura")]
#[command(about = "Obscura: arithmetic-identity obfuscator for SSA IR")]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Obscura CLI with the provided arguments.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    cli.command.execute()
}
