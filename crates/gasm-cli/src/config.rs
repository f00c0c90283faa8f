//! Engine configuration: a TOML file loaded via `toml` + `serde`, with
//! `clap`-derived CLI flags overriding individual fields afterward
//! (matching `raya-cli`'s own `toml` + `clap` combination).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use gasm_evolve::driver::Config as DriverConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "populationSize", default = "default_population_size")]
    pub population_size: usize,
    #[serde(rename = "individualMaxSize", default = "default_individual_max_size")]
    pub individual_max_size: usize,
    #[serde(rename = "mutationProbability", default = "default_mutation_probability")]
    pub mutation_probability: f64,
    #[serde(rename = "crossoverProbability", default = "default_crossover_probability")]
    pub crossover_probability: f64,
    #[serde(rename = "maxGenerations", default = "default_max_generations")]
    pub max_generations: u64,
    #[serde(rename = "goalFitness", default)]
    pub goal_fitness: f64,
    #[serde(rename = "outputFolder", default = "default_output_folder")]
    pub output_folder: String,
    #[serde(rename = "checkPointInterval", default = "default_checkpoint_interval")]
    pub check_point_interval: u64,
    #[serde(rename = "maxProcessTime", default = "default_max_process_time")]
    pub max_process_time: u64,
    #[serde(rename = "registerLength", default = "default_register_length")]
    pub register_length: usize,
    #[serde(default)]
    pub minimize: bool,
    #[serde(rename = "nanPenalty", default = "default_nan_penalty")]
    pub nan_penalty: f64,
    #[serde(default)]
    pub inputs: Vec<Vec<f64>>,
    #[serde(default)]
    pub targets: Vec<Vec<f64>>,
}

fn default_population_size() -> usize {
    200
}
fn default_individual_max_size() -> usize {
    64
}
fn default_mutation_probability() -> f64 {
    0.05
}
fn default_crossover_probability() -> f64 {
    0.7
}
fn default_max_generations() -> u64 {
    1000
}
fn default_output_folder() -> String {
    "checkpoints".to_string()
}
fn default_checkpoint_interval() -> u64 {
    25
}
fn default_max_process_time() -> u64 {
    10_000
}
fn default_register_length() -> usize {
    4
}
fn default_nan_penalty() -> f64 {
    1e6
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<EngineConfig> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn into_driver_config(self) -> DriverConfig {
        DriverConfig {
            population_size: self.population_size,
            individual_max_size: self.individual_max_size,
            mutation_probability: self.mutation_probability,
            crossover_probability: self.crossover_probability,
            max_generations: self.max_generations,
            goal_fitness: self.goal_fitness,
            output_folder: self.output_folder,
            check_point_interval: self.check_point_interval,
            max_process_time: self.max_process_time,
            register_length: self.register_length,
            minimize: self.minimize,
            nan_penalty: self.nan_penalty,
        }
    }
}
