//! Checkpoint JSON schema and I/O (spec §6). The schema is mandated and
//! must round-trip; only *when* to write one is left to the CLI layer
//! (spec.md frames checkpoint presentation as out of scope, but the format
//! itself is not).

use std::fs;
use std::path::Path;

use gasm_bytecode::{ascii_to_bytecode, bytecode_to_ascii};
use serde::{Deserialize, Serialize};

use crate::error::EvolveError;
use crate::history::HistoryEntry;
use crate::population::Population;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "populationSize")]
    pub population_size: usize,
    #[serde(rename = "individualMaxSize")]
    pub individual_max_size: usize,
    #[serde(rename = "mutationProbability")]
    pub mutation_probability: f64,
    #[serde(rename = "crossoverProbability")]
    pub crossover_probability: f64,
    #[serde(rename = "maxGenerations")]
    pub max_generations: u64,
    #[serde(rename = "goalFitness")]
    pub goal_fitness: f64,
    #[serde(rename = "outputFolder")]
    pub output_folder: String,
    #[serde(rename = "checkPointInterval")]
    pub check_point_interval: u64,
    #[serde(rename = "maxProcessTime")]
    pub max_process_time: u64,
    #[serde(rename = "registerLength")]
    pub register_length: usize,
    pub inputs: Vec<Vec<f64>>,
    pub targets: Vec<Vec<f64>>,
    #[serde(rename = "bestIndividual")]
    pub best_individual: String,
    pub population: Vec<String>,
    pub fitness: Vec<f64>,
    pub rank: Vec<f64>,
    pub history: Vec<HistoryEntry>,
}

impl Checkpoint {
    /// Assembles a checkpoint from the live population plus the driver's
    /// static configuration and accumulated history.
    #[allow(clippy::too_many_arguments)]
    pub fn capture(
        population: &Population,
        inputs: Vec<Vec<f64>>,
        targets: Vec<Vec<f64>>,
        history: Vec<HistoryEntry>,
        population_size: usize,
        individual_max_size: usize,
        mutation_probability: f64,
        crossover_probability: f64,
        max_generations: u64,
        goal_fitness: f64,
        output_folder: String,
        check_point_interval: u64,
        max_process_time: u64,
        register_length: usize,
    ) -> Checkpoint {
        let mut population_ascii = Vec::with_capacity(population.len());
        let mut fitness = Vec::with_capacity(population.len());
        let mut rank = Vec::with_capacity(population.len());
        for i in 0..population.len() {
            let slot = population.read(i);
            population_ascii.push(bytecode_to_ascii(&slot.bytecode).unwrap_or_default());
            fitness.push(slot.fitness);
            rank.push(slot.rank);
        }
        let best_individual = bytecode_to_ascii(&population.best_bytecode()).unwrap_or_default();

        Checkpoint {
            population_size,
            individual_max_size,
            mutation_probability,
            crossover_probability,
            max_generations,
            goal_fitness,
            output_folder,
            check_point_interval,
            max_process_time,
            register_length,
            inputs,
            targets,
            best_individual,
            population: population_ascii,
            fitness,
            rank,
            history,
        }
    }

    pub fn save(&self, output_folder: &str, generation: u64) -> Result<(), EvolveError> {
        fs::create_dir_all(output_folder).map_err(|source| EvolveError::IoError { path: output_folder.to_string(), source })?;
        let path = Path::new(output_folder).join(format!("checkpoint_{generation}.json"));
        let json = serde_json::to_string_pretty(self).map_err(|e| EvolveError::JsonFormat(e.to_string()))?;
        fs::write(&path, json).map_err(|source| EvolveError::IoError { path: path.display().to_string(), source })
    }

    pub fn load(path: &str) -> Result<Checkpoint, EvolveError> {
        let text = fs::read_to_string(path).map_err(|source| EvolveError::IoError { path: path.to_string(), source })?;
        serde_json::from_str(&text).map_err(|e| EvolveError::JsonFormat(e.to_string()))
    }

    /// Decodes `population`'s ASCII strings back into raw bytecode.
    pub fn decode_population(&self) -> Result<Vec<Vec<u8>>, EvolveError> {
        self.population.iter().map(|ascii| ascii_to_bytecode(ascii).map_err(EvolveError::from)).collect()
    }

    pub fn decode_best_individual(&self) -> Result<Vec<u8>, EvolveError> {
        Ok(ascii_to_bytecode(&self.best_individual)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_population() -> Population {
        let population = Population::new(2);
        population.write(0, crate::population::Slot { bytecode: vec![0x00, 0x10], fitness: 1.0, rank: 0.0 });
        population.write(1, crate::population::Slot { bytecode: vec![0x60], fitness: 2.0, rank: 1.0 });
        population.refresh_best(true);
        population
    }

    #[test]
    fn capture_then_decode_population_round_trips() {
        let population = sample_population();
        let checkpoint = Checkpoint::capture(
            &population,
            vec![vec![1.0]],
            vec![vec![2.0]],
            Vec::new(),
            2,
            16,
            0.05,
            0.7,
            100,
            0.0,
            "out".to_string(),
            10,
            10_000,
            4,
        );
        let decoded = checkpoint.decode_population().unwrap();
        assert_eq!(decoded[0], vec![0x00, 0x10]);
        assert_eq!(decoded[1], vec![0x60]);
    }

    #[test]
    fn json_round_trip_preserves_all_fields() {
        let population = sample_population();
        let checkpoint = Checkpoint::capture(
            &population,
            vec![vec![1.0]],
            vec![vec![2.0]],
            Vec::new(),
            2,
            16,
            0.05,
            0.7,
            100,
            0.0,
            "out".to_string(),
            10,
            10_000,
            4,
        );
        let json = serde_json::to_string(&checkpoint).unwrap();
        let restored: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.population, checkpoint.population);
        assert_eq!(restored.register_length, 4);
    }
}
