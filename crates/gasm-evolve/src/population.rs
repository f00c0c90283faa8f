//! Population storage (spec §4.7, §9 "Parallel population update"): one
//! `parking_lot::Mutex` per slot guards the bytecode-plus-stats commit, but
//! `fitness`/`rank` are also readable lock-free via `AtomicU64` bit
//! patterns — selection strategies sample a fitness snapshot without ever
//! blocking on another worker's in-flight commit. Mild staleness there is
//! intentional (spec §9: "a free race... is fine for selection pressure").

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// One individual's bytecode plus its last-evaluated fitness and rank, as
/// observed together under one slot's lock.
#[derive(Debug, Clone)]
pub struct Slot {
    pub bytecode: Vec<u8>,
    pub fitness: f64,
    pub rank: f64,
}

impl Slot {
    fn empty() -> Slot {
        Slot { bytecode: Vec::new(), fitness: f64::INFINITY, rank: 0.0 }
    }
}

struct SlotCell {
    bytecode: Mutex<Vec<u8>>,
    fitness: AtomicU64,
    rank: AtomicU64,
}

impl SlotCell {
    fn empty() -> SlotCell {
        SlotCell { bytecode: Mutex::new(Vec::new()), fitness: AtomicU64::new(f64::INFINITY.to_bits()), rank: AtomicU64::new(0) }
    }

    fn fitness(&self) -> f64 {
        f64::from_bits(self.fitness.load(Ordering::Relaxed))
    }

    fn rank(&self) -> f64 {
        f64::from_bits(self.rank.load(Ordering::Relaxed))
    }

    /// Replaces bytecode and stats together under the bytecode lock (spec
    /// §9: "a per-slot lock only for the bytecode-plus-stats commit").
    fn commit(&self, slot: Slot) {
        let mut bytecode = self.bytecode.lock();
        *bytecode = slot.bytecode;
        self.fitness.store(slot.fitness.to_bits(), Ordering::Relaxed);
        self.rank.store(slot.rank.to_bits(), Ordering::Relaxed);
    }

    fn read(&self) -> Slot {
        let bytecode = self.bytecode.lock().clone();
        Slot { bytecode, fitness: self.fitness(), rank: self.rank() }
    }
}

pub struct Population {
    slots: Vec<SlotCell>,
    best: Mutex<Option<Slot>>,
}

impl Population {
    pub fn new(population_size: usize) -> Population {
        let slots = (0..population_size).map(|_| SlotCell::empty()).collect();
        Population { slots, best: Mutex::new(None) }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn read(&self, index: usize) -> Slot {
        self.slots[index].read()
    }

    pub fn write(&self, index: usize, slot: Slot) {
        self.slots[index].commit(slot);
    }

    /// Lock-free fitness reads across every slot (spec §9): may race a
    /// concurrent commit and observe either the old or new value, never a
    /// torn one, since `f64::to_bits`/`from_bits` round-trip through a
    /// single atomic word.
    pub fn fitness_snapshot(&self) -> Vec<f64> {
        self.slots.iter().map(|slot| slot.fitness()).collect()
    }

    pub fn avg_fitness(&self) -> f64 {
        let finite: Vec<f64> = self.fitness_snapshot().into_iter().filter(|f| f.is_finite()).collect();
        if finite.is_empty() {
            return f64::NAN;
        }
        finite.iter().sum::<f64>() / finite.len() as f64
    }

    pub fn avg_size(&self) -> f64 {
        let total: usize = self.slots.iter().map(|slot| slot.bytecode.lock().len()).sum();
        total as f64 / self.slots.len().max(1) as f64
    }

    /// Updates the best-seen individual if `candidate` improves on it in the
    /// configured direction, and returns the current best fitness.
    pub fn record_best(&self, candidate: &Slot, minimize: bool) -> f64 {
        let mut best = self.best.lock();
        let improves = match best.as_ref() {
            None => true,
            Some(current) => {
                if minimize {
                    candidate.fitness < current.fitness
                } else {
                    candidate.fitness > current.fitness
                }
            }
        };
        if improves {
            *best = Some(candidate.clone());
        }
        best.as_ref().map(|s| s.fitness).unwrap_or(candidate.fitness)
    }

    pub fn best_bytecode(&self) -> Vec<u8> {
        self.best.lock().as_ref().map(|s| s.bytecode.clone()).unwrap_or_default()
    }

    pub fn best_fitness(&self) -> f64 {
        self.best.lock().as_ref().map(|s| s.fitness).unwrap_or(f64::NAN)
    }

    /// Recomputes `record_best` against the whole population; used after
    /// initialization and at the end of each generation, where the driver
    /// wants the global best rather than one candidate's delta.
    pub fn refresh_best(&self, minimize: bool) {
        for i in 0..self.slots.len() {
            let slot = self.slots[i].read();
            self.record_best(&slot, minimize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let population = Population::new(4);
        population.write(1, Slot { bytecode: vec![1, 2, 3], fitness: 0.5, rank: 2.0 });
        let slot = population.read(1);
        assert_eq!(slot.bytecode, vec![1, 2, 3]);
        assert_eq!(slot.fitness, 0.5);
    }

    #[test]
    fn fitness_snapshot_is_lock_free_and_matches_committed_values() {
        let population = Population::new(3);
        population.write(0, Slot { bytecode: vec![], fitness: 1.0, rank: 0.0 });
        population.write(1, Slot { bytecode: vec![], fitness: 2.0, rank: 0.0 });
        population.write(2, Slot { bytecode: vec![], fitness: 3.0, rank: 0.0 });
        assert_eq!(population.fitness_snapshot(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn avg_fitness_skips_non_finite_values() {
        let population = Population::new(3);
        population.write(0, Slot { bytecode: vec![], fitness: 1.0, rank: 0.0 });
        population.write(1, Slot { bytecode: vec![], fitness: f64::NAN, rank: 0.0 });
        population.write(2, Slot { bytecode: vec![], fitness: 3.0, rank: 0.0 });
        assert_eq!(population.avg_fitness(), 2.0);
    }

    #[test]
    fn refresh_best_tracks_minimum_when_minimizing() {
        let population = Population::new(3);
        population.write(0, Slot { bytecode: vec![9], fitness: 5.0, rank: 0.0 });
        population.write(1, Slot { bytecode: vec![1], fitness: 1.0, rank: 0.0 });
        population.write(2, Slot { bytecode: vec![2], fitness: 3.0, rank: 0.0 });
        population.refresh_best(true);
        assert_eq!(population.best_bytecode(), vec![1]);
    }
}
