//! `ttkcc` CLI: compile a C source file to TTK-91-style assembly.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

use ttkcc::CompilerConfig;

#[derive(ClapParser)]
#[command(name = "ttkcc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile a C subset to TTK-91-style assembly", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a C source file to assembly
    Build {
        /// Input .c source file
        input: PathBuf,

        /// Output assembly path (defaults to input filename with a .s extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// TOML configuration file overriding compiler defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Omit section banner comments from the rendered assembly
        #[arg(long)]
        no_comments: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, no_comments } => {
            let output = output.unwrap_or_else(|| input.with_extension("s"));
            run_build(&input, &output, config.as_deref(), no_comments);
        }
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "ttkcc", &mut io::stdout());
}

fn run_build(input: &std::path::Path, output: &std::path::Path, config_path: Option<&std::path::Path>, no_comments: bool) {
    let mut config = match config_path {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => match CompilerConfig::from_toml_str(&text) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(1);
            }
        },
        None => CompilerConfig::default(),
    };
    if no_comments {
        config.comments = false;
    }

    match ttkcc::compile_file(input, output, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), output.display());
        }
        Err(diagnostics) => {
            for d in &diagnostics {
                eprintln!("{d}");
            }
            process::exit(1);
        }
    }
}
