//! Command-line toolchain for the G-assembly evolution engine: execute a
//! single program, run the genetic driver against a TOML config, or convert
//! between the codec's text/ASCII/zip representations.

mod config;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gasm_bytecode::{ascii_to_bytecode, bytecode_to_ascii, parse_program, program_to_text, unzip, zip};
use gasm_evolve::crossover::OnePoint;
use gasm_evolve::driver::{Driver, EngineView, FitnessFn};
use gasm_evolve::grow::TreeGrow;
use gasm_evolve::mutation::Hard;
use gasm_evolve::selection::Tournament;
use gasm_vm::Individual;

use config::EngineConfig;

#[derive(Parser)]
#[command(name = "gasm")]
#[command(about = "G-assembly evolution engine toolchain")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a G-assembly program once and print its final inputs/processTime
    Run {
        /// Path to a G-assembly text program
        file: PathBuf,
        /// Comma-separated starting `inputs` values
        #[arg(long, value_delimiter = ',', default_value = "0")]
        inputs: Vec<f64>,
        /// Scratch register count
        #[arg(long, default_value = "4")]
        registers: usize,
        /// Instruction fuel cap
        #[arg(long, default_value = "10000")]
        max_process_time: u64,
        /// Force the reference interpreter instead of the x86-64 JIT
        #[arg(long)]
        no_jit: bool,
    },

    /// Run the genetic evolution driver against a TOML engine config
    Evolve {
        /// Path to the engine config TOML file
        #[arg(long, default_value = "gasm.toml")]
        config: PathBuf,
    },

    /// Convert a text program to its single-character ASCII encoding
    Encode {
        file: PathBuf,
    },

    /// Convert an ASCII-encoded program back to text
    Decode {
        ascii: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { file, inputs, registers, max_process_time, no_jit } => run_program(&file, inputs, registers, max_process_time, no_jit),
        Commands::Evolve { config } => run_evolve(&config),
        Commands::Encode { file } => encode_program(&file),
        Commands::Decode { ascii } => decode_program(&ascii),
    }
}

fn run_program(file: &PathBuf, mut inputs: Vec<f64>, registers: usize, max_process_time: u64, no_jit: bool) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading program {}", file.display()))?;
    let mut individual = Individual::new_from_text(&text, registers).context("parsing program")?;
    individual.set_max_process_time(max_process_time);
    individual.set_use_jit(!no_jit);

    if inputs.is_empty() {
        inputs.push(0.0);
    }
    let process_time = individual.run(&mut inputs).context("running program")?;

    println!("processTime = {process_time}");
    println!("inputs = {inputs:?}");
    Ok(())
}

/// Mean-squared-error against the config's `(input, target)` pairs, with
/// non-finite differences substituted by `nanPenalty` (spec §7).
struct MeanSquaredError;

impl FitnessFn for MeanSquaredError {
    fn evaluate(&self, view: &EngineView<'_>, runner: &mut Individual, bytecode: &[u8]) -> (f64, f64) {
        runner.set_bytecode(bytecode.to_vec());
        let mut total = 0.0;
        let pairs = view.inputs.len().min(view.targets.len()).max(1);
        for i in 0..view.inputs.len() {
            let mut scratch = view.inputs[i].clone();
            let target = view.targets.get(i).and_then(|t| t.first()).copied().unwrap_or(0.0);
            let contribution = match runner.run(&mut scratch) {
                Ok(_) => {
                    let output = scratch.first().copied().unwrap_or(0.0);
                    let diff = output - target;
                    if diff.is_finite() {
                        diff * diff
                    } else {
                        view.nan_penalty
                    }
                }
                Err(_) => view.nan_penalty,
            };
            total += contribution;
        }
        let mse = total / pairs as f64;
        (mse, mse)
    }
}

fn run_evolve(config_path: &PathBuf) -> Result<()> {
    let engine_config = EngineConfig::load(config_path)?;
    let inputs = engine_config.inputs.clone();
    let targets = engine_config.targets.clone();
    let driver_config = engine_config.into_driver_config();

    let mut driver = Driver::new(
        driver_config,
        inputs,
        targets,
        Box::new(TreeGrow::new(4)),
        Box::new(Tournament::new(3)),
        Box::new(OnePoint),
        Box::new(Hard),
        Arc::new(MeanSquaredError),
    )
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    driver.run().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    println!("generations run: {}", driver.generation());
    println!("best fitness: {}", driver.best_fitness());
    println!("best individual: {}", program_to_text(&driver.best_bytecode()));
    Ok(())
}

fn encode_program(file: &PathBuf) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading program {}", file.display()))?;
    let bytecode = parse_program(&text).context("parsing program")?;
    let ascii = bytecode_to_ascii(&bytecode).context("encoding to ASCII")?;
    println!("{ascii}");
    let lanes = zip(&bytecode).context("bit-packing")?;
    println!("zip({} bytes) = {lanes:?}", bytecode.len());
    Ok(())
}

fn decode_program(ascii: &str) -> Result<()> {
    let bytecode = ascii_to_bytecode(ascii).context("decoding ASCII")?;
    println!("{}", program_to_text(&bytecode));
    Ok(())
}
