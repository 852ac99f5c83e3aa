//! PicoHaskell Compiler CLI
//!
//! Reads a `serde_json`-encoded `Program` (§6's documented stand-in for a
//! real parser's output) and writes a `serde_json`-encoded `StgProgram`: the
//! lambda-form bindings and data-constructor descriptor table that a code
//! emitter would consume next.

use clap::Parser as ClapParser;
use pico_compiler::Program;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "picoc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PicoHaskell compiler core - infers types and lowers to STG", long_about = None)]
struct Cli {
    /// Input file containing a JSON-encoded Program (defaults to stdin)
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Output file for the JSON-encoded StgProgram (defaults to stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Path to a TOML pipeline configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli);
}

fn run(cli: &Cli) {
    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(message) => {
                eprintln!("Error: {}", message);
                process::exit(1);
            }
        },
        None => pico_compiler::PipelineConfig::default(),
    };

    let source = match read_input(cli.input.as_deref()) {
        Ok(source) => source,
        Err(message) => {
            eprintln!("Error: could not open input file: {}", message);
            process::exit(1);
        }
    };

    let program: Program = match serde_json::from_str(&source) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("Error: parse error: {}", e);
            process::exit(1);
        }
    };
    let program = program.derive_arities();

    let stg_program = match pico_compiler::compile_program_with_config(program, &config) {
        Ok(stg_program) => stg_program,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if config.emit_descriptor_table {
        tracing::info!(
            data_constructors = stg_program.data_constructors.len(),
            "descriptor table computed"
        );
    }

    let rendered = match serde_json::to_string_pretty(&stg_program) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("Error: could not render STG program: {}", e);
            process::exit(1);
        }
    };

    if let Err(message) = write_output(cli.output.as_deref(), &rendered) {
        eprintln!("Error: could not open output file: {}", message);
        process::exit(1);
    }
}

fn load_config(path: &std::path::Path) -> Result<pico_compiler::PipelineConfig, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    pico_compiler::PipelineConfig::from_toml_str(&text).map_err(|e| e.to_string())
}

fn read_input(path: Option<&std::path::Path>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|e| e.to_string()),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| e.to_string())?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, rendered: &str) -> Result<(), String> {
    match path {
        Some(path) => fs::write(path, rendered).map_err(|e| e.to_string()),
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .map_err(|e| e.to_string()),
    }
}
