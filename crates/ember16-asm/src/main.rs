use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ember16_rs::binary::{hexdump, program_to_bytes};
use ember16_rs::parser::parse_source;
use ember16_rs::printer::print_program;
use ember16_rs::{assemble, Program};

#[derive(Parser, Debug)]
#[command(author, version, about = "EMBER-16 assembler")]
struct Opts {
    /// Input files to assemble, concatenated into one program in order
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,
    /// Output file for the binary
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Size of the output binary; shorter programs are zero-padded
    #[arg(short, long)]
    size: Option<usize>,
    /// Print final assembly with resolved addresses and encodings
    #[arg(short = 'v', long)]
    print_assembly: bool,
    /// Print hexdump of final binary
    #[arg(short = 'x', long)]
    print_binary: bool,
    /// Export resolved labels to JSON (Vec<{ addr, name }>)
    #[arg(long, value_name = "FILE")]
    labels_out: Option<PathBuf>,
}

#[derive(Debug, Clone, serde::Serialize)]
struct LabelKV {
    addr: u16,
    name: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();

    // Parse all inputs into one program, in argument order.
    let mut program = Program::new();
    for path in &opts.inputs {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_source(&path.display().to_string(), &text, &mut program)?;
    }

    assemble(&mut program)?;
    tracing::info!(instructions = program.len(), "assembled");

    if opts.print_assembly {
        print!("{}", print_program(&program));
    }

    let binary = program_to_bytes(&program, opts.size)?;

    if let Some(path) = &opts.labels_out {
        let mut labels: Vec<LabelKV> = program
            .iter()
            .filter_map(|inst| {
                let name = inst.label_name()?;
                if name.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                Some(LabelKV {
                    addr: inst.address?,
                    name: name.to_string(),
                })
            })
            .collect();
        labels.sort_by_key(|kv| kv.addr);
        fs::write(path, serde_json::to_string_pretty(&labels)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if let Some(path) = &opts.output {
        fs::write(path, &binary)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    // Fall back to a hexdump when no output file was requested.
    if opts.output.is_none() || opts.print_binary {
        print!("{}", hexdump(&binary, 8));
    }

    Ok(())
}
