//! Thin command-line driver over the library, behind the `cli` feature
//! (§6 "Exit codes (host CLI). Out of scope; host-defined."). Reads a PLA
//! file, reports per-output node counts and satisfy counts, and can dump a
//! DOT rendering of one output.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use teddy_mdd::{pla, Fold};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FoldArg {
    Left,
    Tree,
}

impl From<FoldArg> for Fold {
    fn from(value: FoldArg) -> Self {
        match value {
            FoldArg::Left => Fold::Left,
            FoldArg::Tree => Fold::Tree,
        }
    }
}

/// Inspect a PLA file as a decision diagram.
#[derive(Parser, Debug)]
#[command(name = "teddy", version, about)]
struct Cli {
    /// Path to the PLA file to read.
    pla_file: PathBuf,

    /// How to fold the per-product cubes and per-output terms.
    #[arg(long, value_enum, default_value_t = FoldArg::Tree)]
    fold: FoldArg,

    /// Write a DOT rendering of this output column to stdout.
    #[arg(long)]
    dot_output: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("teddy: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let (manager, outputs) = pla::from_pla_file(&cli.pla_file, cli.fold.into())
        .map_err(|e| format!("reading {}: {e}", cli.pla_file.display()))?;

    println!("variables: {}", manager.var_count());
    println!("outputs: {}", outputs.len());
    for (i, f) in outputs.iter().enumerate() {
        let nodes = manager.node_count(f).map_err(|e| e.to_string())?;
        let ones = manager.satisfy_count(f, 1).map_err(|e| e.to_string())?;
        println!("  output {i}: {nodes} nodes, {ones} on-set points");
    }

    if let Some(i) = cli.dot_output {
        let f = outputs
            .get(i)
            .ok_or_else(|| format!("output index {i} out of range ({} outputs)", outputs.len()))?;
        let mut buf = Vec::new();
        manager
            .to_dot(&mut buf, f)
            .map_err(|e| e.to_string())?;
        print!("{}", String::from_utf8_lossy(&buf));
    }

    Ok(())
}
