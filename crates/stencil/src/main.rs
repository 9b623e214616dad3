//! Stencil CLI - docx template rendering.
//!
//! Provides commands for:
//! - `render`: Evaluate the directives of an extracted docx package
//! - `fields`: List the merge-field directives of a package

mod commands;
mod error;
mod output;
mod package;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{FieldsArgs, RenderArgs};
use output::Output;

/// Stencil - docx template directive engine.
#[derive(Parser)]
#[command(name = "stencil", version, about)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template package against a JSON context.
    Render(RenderArgs),
    /// List merge-field directives per part.
    Fields(FieldsArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Render(args) => args.execute(),
        Commands::Fields(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
