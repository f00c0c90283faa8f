//! The evolution driver (spec §4.7): owns the population, dispatches each
//! generation's work across a static pool of worker threads (one per
//! hardware thread, no work-stealing — spec §5), and tracks history.

use std::sync::Arc;

use gasm_vm::Individual;
use rand::Rng;

use crate::checkpoint::Checkpoint;
use crate::crossover::Crossover;
use crate::error::EvolveError;
use crate::grow::Grow;
use crate::history::HistoryEntry;
use crate::mutation::Mutation;
use crate::population::{Population, Slot};
use crate::selection::Selection;

/// Everything a [`FitnessFn`] needs to score one individual: the training
/// pairs and the direction/penalty knobs the driver was configured with.
pub struct EngineView<'a> {
    pub inputs: &'a [Vec<f64>],
    pub targets: &'a [Vec<f64>],
    pub nan_penalty: f64,
    pub minimize: bool,
    pub register_length: usize,
}

/// Runs an individual against `view`'s `(input, target)` pairs and returns
/// `(fitness, rank)` (spec §6). Implementations are expected to recognize
/// non-finite outputs and substitute `view.nan_penalty` rather than letting
/// `NaN`/`Inf` poison the selection math (spec §7).
pub trait FitnessFn: Send + Sync {
    fn evaluate(&self, view: &EngineView, runner: &mut Individual, bytecode: &[u8]) -> (f64, f64);
}

impl<F> FitnessFn for F
where
    F: Fn(&EngineView, &mut Individual, &[u8]) -> (f64, f64) + Send + Sync,
{
    fn evaluate(&self, view: &EngineView, runner: &mut Individual, bytecode: &[u8]) -> (f64, f64) {
        self(view, runner, bytecode)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub population_size: usize,
    pub individual_max_size: usize,
    pub mutation_probability: f64,
    pub crossover_probability: f64,
    pub max_generations: u64,
    pub goal_fitness: f64,
    pub output_folder: String,
    pub check_point_interval: u64,
    pub max_process_time: u64,
    pub register_length: usize,
    pub minimize: bool,
    pub nan_penalty: f64,
}

/// Splits `0..total` into `chunk_count` contiguous, roughly-even ranges
/// (spec §5: "static, contiguous index ranges over the population array").
fn chunk_ranges(total: usize, chunk_count: usize) -> Vec<std::ops::Range<usize>> {
    let chunk_count = chunk_count.max(1);
    let base = total / chunk_count;
    let remainder = total % chunk_count;
    let mut ranges = Vec::with_capacity(chunk_count);
    let mut start = 0;
    for i in 0..chunk_count {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        if start < end {
            ranges.push(start..end);
        }
        start = end;
    }
    ranges
}

pub struct Driver {
    config: Config,
    inputs: Vec<Vec<f64>>,
    targets: Vec<Vec<f64>>,
    population: Population,
    grow: Box<dyn Grow>,
    selection: Box<dyn Selection>,
    crossover: Box<dyn Crossover>,
    mutation: Box<dyn Mutation>,
    fitness_fn: Arc<dyn FitnessFn>,
    history: Vec<HistoryEntry>,
    generation: u64,
}

impl Driver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        inputs: Vec<Vec<f64>>,
        targets: Vec<Vec<f64>>,
        grow: Box<dyn Grow>,
        selection: Box<dyn Selection>,
        crossover: Box<dyn Crossover>,
        mutation: Box<dyn Mutation>,
        fitness_fn: Arc<dyn FitnessFn>,
    ) -> Result<Driver, EvolveError> {
        if config.register_length == 0 {
            return Err(EvolveError::Vm(gasm_vm::VmError::InvalidArgument("registerLength must be >= 1".to_string())));
        }
        let population = Population::new(config.population_size);
        Ok(Driver { config, inputs, targets, population, grow, selection, crossover, mutation, fitness_fn, history: Vec::new(), generation: 0 })
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn best_bytecode(&self) -> Vec<u8> {
        self.population.best_bytecode()
    }

    pub fn best_fitness(&self) -> f64 {
        self.population.best_fitness()
    }

    fn make_runner(&self) -> Individual {
        let mut runner = Individual::new(Vec::new(), self.config.register_length).expect("register_length validated in Driver::new");
        runner.set_max_process_time(self.config.max_process_time);
        runner
    }

    fn engine_view(&self) -> EngineView<'_> {
        EngineView {
            inputs: &self.inputs,
            targets: &self.targets,
            nan_penalty: self.config.nan_penalty,
            minimize: self.config.minimize,
            register_length: self.config.register_length,
        }
    }

    /// Fills every slot via `grow` and scores it, split into static chunks
    /// across one worker thread per hardware core.
    pub fn init(&mut self) {
        let ranges = chunk_ranges(self.population.len(), num_cpus::get());
        let population = &self.population;
        let fitness_fn = &self.fitness_fn;
        let config = &self.config;
        let view = self.engine_view();
        let view = &view;
        std::thread::scope(|scope| {
            for range in ranges {
                let mut grow = self.grow.clone();
                scope.spawn(move || {
                    let mut runner = Individual::new(Vec::new(), config.register_length).expect("register_length validated in Driver::new");
                    runner.set_max_process_time(config.max_process_time);
                    for i in range {
                        let bytecode = grow.grow(config.individual_max_size);
                        let (fitness, rank) = fitness_fn.evaluate(view, &mut runner, &bytecode);
                        population.write(i, Slot { bytecode, fitness, rank });
                    }
                });
            }
        });
        self.population.refresh_best(self.config.minimize);
        self.generation = 0;
        self.log_generation_stats();
        self.history.push(self.make_history_entry());
    }

    /// Runs one generation step (spec §4.7): `populationSize` independent
    /// replacement events, distributed across static worker chunks. Each
    /// event selects a "worst" slot to overwrite and a "best"-leaning parent
    /// (or pair) to breed from, using the same strategy with the direction
    /// flipped between the two roles.
    fn step(&self) {
        let ranges = chunk_ranges(self.population.len(), num_cpus::get());
        let population = &self.population;
        let fitness_fn = &self.fitness_fn;
        let config = &self.config;
        let view = self.engine_view();
        let view = &view;
        std::thread::scope(|scope| {
            for range in ranges {
                let mut selection = self.selection.clone();
                let mut crossover = self.crossover.clone();
                let mut mutation = self.mutation.clone();
                scope.spawn(move || {
                    let mut runner = Individual::new(Vec::new(), config.register_length).expect("register_length validated in Driver::new");
                    runner.set_max_process_time(config.max_process_time);
                    let mut rng = rand::thread_rng();
                    for _ in range {
                        let snapshot = population.fitness_snapshot();
                        let worst_index = selection.select(&snapshot, !config.minimize);
                        let parent1_index = selection.select(&snapshot, config.minimize);

                        let child = if rng.gen_bool(config.crossover_probability.clamp(0.0, 1.0)) {
                            let parent2_index = selection.select(&snapshot, config.minimize);
                            let parent1 = population.read(parent1_index).bytecode;
                            let parent2 = population.read(parent2_index).bytecode;
                            crossover.crossover(&parent1, &parent2, config.individual_max_size)
                        } else {
                            let mut bytecode = population.read(parent1_index).bytecode;
                            mutation.mutate(&mut bytecode, config.mutation_probability);
                            bytecode
                        };

                        let (fitness, rank) = fitness_fn.evaluate(view, &mut runner, &child);
                        population.write(worst_index, Slot { bytecode: child, fitness, rank });
                    }
                });
            }
        });
    }

    fn goal_reached(&self) -> bool {
        let best = self.population.best_fitness();
        if !best.is_finite() {
            return false;
        }
        if self.config.minimize {
            best <= self.config.goal_fitness
        } else {
            best >= self.config.goal_fitness
        }
    }

    fn make_history_entry(&self) -> HistoryEntry {
        HistoryEntry::new(self.generation, self.population.best_fitness(), self.population.avg_fitness(), self.population.avg_size(), &self.population.best_bytecode())
    }

    fn log_generation_stats(&self) {
        eprintln!(
            "[gasm] generation {} best={:.6} avg={:.6} avg_size={:.1}",
            self.generation,
            self.population.best_fitness(),
            self.population.avg_fitness(),
            self.population.avg_size()
        );
    }

    fn checkpoint(&self) -> Result<(), EvolveError> {
        let checkpoint = Checkpoint::capture(
            &self.population,
            self.inputs.clone(),
            self.targets.clone(),
            self.history.clone(),
            self.config.population_size,
            self.config.individual_max_size,
            self.config.mutation_probability,
            self.config.crossover_probability,
            self.config.max_generations,
            self.config.goal_fitness,
            self.config.output_folder.clone(),
            self.config.check_point_interval,
            self.config.max_process_time,
            self.config.register_length,
        );
        checkpoint.save(&self.config.output_folder, self.generation)
    }

    /// Runs generations until `maxGenerations` or `goalFitness` is reached,
    /// checkpointing every `checkPointInterval` generations.
    pub fn run(&mut self) -> Result<(), EvolveError> {
        if self.generation == 0 && self.history.is_empty() {
            self.init();
            if self.goal_reached() {
                return Ok(());
            }
        }
        for gen in (self.generation + 1)..=self.config.max_generations {
            self.step();
            self.generation = gen;
            self.population.refresh_best(self.config.minimize);
            self.log_generation_stats();
            self.history.push(self.make_history_entry());

            if self.config.check_point_interval > 0 && gen % self.config.check_point_interval == 0 {
                self.checkpoint()?;
            }
            if self.goal_reached() {
                break;
            }
        }
        Ok(())
    }

    /// Restores driver state from a loaded [`Checkpoint`] so `run` can
    /// resume from generation `checkpoint.history.last().generation`.
    pub fn restore_from_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<(), EvolveError> {
        let decoded = checkpoint.decode_population()?;
        self.population = Population::new(decoded.len());
        for (i, (bytecode, (&fitness, &rank))) in decoded.into_iter().zip(checkpoint.fitness.iter().zip(checkpoint.rank.iter())).enumerate() {
            self.population.write(i, Slot { bytecode, fitness, rank });
        }
        self.population.refresh_best(self.config.minimize);
        self.history = checkpoint.history.clone();
        self.generation = self.history.last().map(|e| e.generation).unwrap_or(0);
        self.inputs = checkpoint.inputs.clone();
        self.targets = checkpoint.targets.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crossover::OnePoint;
    use crate::grow::SizeGrow;
    use crate::mutation::Hard;
    use crate::selection::Tournament;

    struct SumOfInputsFitness;

    impl FitnessFn for SumOfInputsFitness {
        fn evaluate(&self, view: &EngineView, runner: &mut Individual, bytecode: &[u8]) -> (f64, f64) {
            runner.set_bytecode(bytecode.to_vec());
            let mut total = 0.0;
            for input in view.inputs {
                let mut scratch = input.clone();
                if runner.run(&mut scratch).is_ok() {
                    let value = scratch.iter().sum::<f64>();
                    total += if value.is_finite() { value } else { view.nan_penalty };
                } else {
                    total += view.nan_penalty;
                }
            }
            (total, 0.0)
        }
    }

    fn tiny_config() -> Config {
        Config {
            population_size: 6,
            individual_max_size: 8,
            mutation_probability: 0.1,
            crossover_probability: 0.5,
            max_generations: 3,
            goal_fitness: f64::NEG_INFINITY,
            output_folder: "/tmp/does-not-matter".to_string(),
            check_point_interval: 0,
            max_process_time: 1_000,
            register_length: 2,
            minimize: true,
            nan_penalty: 1_000.0,
        }
    }

    #[test]
    fn chunk_ranges_cover_the_whole_range_without_overlap() {
        let ranges = chunk_ranges(10, 3);
        let mut covered: Vec<usize> = ranges.into_iter().flatten().collect();
        covered.sort_unstable();
        assert_eq!(covered, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn init_then_step_produces_finite_best_fitness() {
        let mut driver = Driver::new(
            tiny_config(),
            vec![vec![1.0, 2.0]],
            vec![vec![0.0]],
            Box::new(SizeGrow::new(4)),
            Box::new(Tournament::new(3)),
            Box::new(OnePoint),
            Box::new(Hard),
            Arc::new(SumOfInputsFitness),
        )
        .unwrap();

        driver.init();
        assert!(driver.best_fitness().is_finite());

        driver.run().unwrap();
        assert!(driver.generation() > 0);
        assert!(!driver.history().is_empty());
    }

    #[test]
    fn new_rejects_zero_register_length() {
        let mut config = tiny_config();
        config.register_length = 0;
        let result = Driver::new(
            config,
            vec![vec![1.0]],
            vec![vec![0.0]],
            Box::new(SizeGrow::new(4)),
            Box::new(Tournament::new(3)),
            Box::new(OnePoint),
            Box::new(Hard),
            Arc::new(SumOfInputsFitness),
        );
        assert!(result.is_err());
    }
}
