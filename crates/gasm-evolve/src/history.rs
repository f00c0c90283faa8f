//! Per-generation history (spec §6/§4.7, grounded on `original_source/`'s
//! `Hist.cpp`/`Entry.cpp`): one entry per generation, always available via
//! [`crate::driver::Driver::history`] regardless of whether checkpointing to
//! disk is enabled.

use gasm_bytecode::bytecode_to_ascii;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub generation: u64,
    #[serde(rename = "bestFitness")]
    pub best_fitness: f64,
    #[serde(rename = "avgFitness")]
    pub avg_fitness: f64,
    #[serde(rename = "avgSize")]
    pub avg_size: f64,
    #[serde(rename = "bestIndividual")]
    pub best_individual: String,
}

impl HistoryEntry {
    pub fn new(generation: u64, best_fitness: f64, avg_fitness: f64, avg_size: f64, best_bytecode: &[u8]) -> HistoryEntry {
        HistoryEntry {
            generation,
            best_fitness,
            avg_fitness,
            avg_size,
            // Grow/crossover/mutation only ever synthesize defined opcode
            // bytes, so this never actually hits the undefined-byte case.
            best_individual: bytecode_to_ascii(best_bytecode).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_encodes_best_bytecode_as_ascii() {
        let entry = HistoryEntry::new(3, 0.1, 0.4, 12.5, &[0x00, 0x10]);
        assert_eq!(entry.best_individual, "AG");
    }
}
