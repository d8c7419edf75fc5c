//! archlens CLI entry point.

use archlens::cli::{self, Cli, Commands, EXIT_ERROR};
use clap::Parser;
use tracing::Level;

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match &cli.command {
        Commands::Analyze(args) => cli::run_analyze(args),
        Commands::Graph(args) => cli::run_graph(args),
        #[cfg(feature = "tree-sitter")]
        Commands::Parse(args) => cli::run_parse(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
