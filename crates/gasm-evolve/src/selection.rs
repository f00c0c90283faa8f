//! Selection strategies (spec §4.6): given the population's fitness
//! values, return an index. `select_minimal` toggles direction so the same
//! strategy instance picks the best or the worst individual depending on
//! which the driver currently needs (spec §4.7 step 1-2 flips it mid-step).

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

pub trait Selection: CloneSelection + Send {
    /// `fitness[i]` for every currently-live slot. Returns an index into
    /// that slice. `select_minimal`: when true, the strategy favors the
    /// smallest fitness values; when false, the largest.
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize;
}

pub trait CloneSelection {
    fn clone_box(&self) -> Box<dyn Selection>;
}

impl<T> CloneSelection for T
where
    T: 'static + Selection + Clone,
{
    fn clone_box(&self) -> Box<dyn Selection> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Selection> {
    fn clone(&self) -> Box<dyn Selection> {
        self.clone_box()
    }
}

/// Samples `k` indices uniformly and returns the extremal one.
#[derive(Debug, Clone)]
pub struct Tournament {
    pub k: usize,
}

impl Tournament {
    pub fn new(k: usize) -> Tournament {
        Tournament { k: k.max(1) }
    }
}

impl Selection for Tournament {
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize {
        let mut rng = rand::thread_rng();
        let mut best = rng.gen_range(0..fitness.len());
        for _ in 1..self.k {
            let candidate = rng.gen_range(0..fitness.len());
            let better = if select_minimal { fitness[candidate] < fitness[best] } else { fitness[candidate] > fitness[best] };
            if better {
                best = candidate;
            }
        }
        best
    }
}

/// Fitness-proportional sampling. Weight `1/(fitness+eps)` when minimizing,
/// `fitness+eps` otherwise, so lower-is-better and higher-is-better fitness
/// functions both get monotonically-increasing sampling weight toward the
/// direction `select_minimal` asks for.
#[derive(Debug, Clone, Default)]
pub struct Roulette {
    pub epsilon: f64,
}

impl Roulette {
    pub fn new(epsilon: f64) -> Roulette {
        Roulette { epsilon }
    }
}

const DEFAULT_EPSILON: f64 = 1e-9;

impl Selection for Roulette {
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize {
        let eps = if self.epsilon > 0.0 { self.epsilon } else { DEFAULT_EPSILON };
        weighted_pick(fitness, |f| if select_minimal { 1.0 / (f + eps) } else { f + eps })
    }
}

/// Weight linearly by rank position in fitness order (best rank gets the
/// highest weight).
#[derive(Debug, Clone, Default)]
pub struct Rank;

impl Selection for Rank {
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize {
        let mut order: Vec<usize> = (0..fitness.len()).collect();
        order.sort_by(|&a, &b| {
            let (fa, fb) = (fitness[a], fitness[b]);
            if select_minimal {
                fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        let weights: Vec<f64> = (0..order.len()).map(|rank| (order.len() - rank) as f64).collect();
        let mut rng = rand::thread_rng();
        let dist = WeightedIndex::new(&weights).expect("weights are all positive");
        order[dist.sample(&mut rng)]
    }
}

/// Samples uniformly from the top `max(1, ceil(p * N))` individuals.
#[derive(Debug, Clone)]
pub struct Truncation {
    pub proportion: f64,
}

impl Truncation {
    pub fn new(proportion: f64) -> Truncation {
        Truncation { proportion: proportion.clamp(0.0, 1.0) }
    }
}

impl Selection for Truncation {
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize {
        let mut order: Vec<usize> = (0..fitness.len()).collect();
        order.sort_by(|&a, &b| {
            let (fa, fb) = (fitness[a], fitness[b]);
            if select_minimal {
                fa.partial_cmp(&fb).unwrap_or(std::cmp::Ordering::Equal)
            } else {
                fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
            }
        });
        let cutoff = ((self.proportion * order.len() as f64).ceil() as usize).max(1).min(order.len());
        let mut rng = rand::thread_rng();
        order[rng.gen_range(0..cutoff)]
    }
}

/// Weight `exp(-fitness/T)` when minimizing, `exp(fitness/T)` otherwise.
#[derive(Debug, Clone)]
pub struct Boltzmann {
    pub temperature: f64,
}

impl Boltzmann {
    pub fn new(temperature: f64) -> Boltzmann {
        Boltzmann { temperature: if temperature > 0.0 { temperature } else { 1.0 } }
    }
}

impl Selection for Boltzmann {
    fn select(&mut self, fitness: &[f64], select_minimal: bool) -> usize {
        let t = self.temperature;
        weighted_pick(fitness, |f| if select_minimal { (-f / t).exp() } else { (f / t).exp() })
    }
}

/// Shared proportional-sampling helper: maps each fitness value through
/// `weight_of`, substituting a tiny positive floor for non-finite or
/// non-positive weights so `WeightedIndex` never sees an invalid
/// distribution (a single NaN/Inf fitness must not crash the whole
/// generation step).
fn weighted_pick(fitness: &[f64], weight_of: impl Fn(f64) -> f64) -> usize {
    const FLOOR: f64 = 1e-12;
    let weights: Vec<f64> = fitness.iter().map(|&f| { let w = weight_of(f); if w.is_finite() && w > 0.0 { w } else { FLOOR } }).collect();
    let mut rng = rand::thread_rng();
    let dist = WeightedIndex::new(&weights).expect("weights are floored to a positive minimum");
    dist.sample(&mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tournament_minimal_favors_low_fitness_over_many_trials() {
        let fitness = vec![10.0, 1.0, 5.0, 8.0, 2.0];
        let mut strategy = Tournament::new(5);
        let mut below_median_count = 0;
        for _ in 0..200 {
            let idx = strategy.select(&fitness, true);
            if fitness[idx] <= 5.0 {
                below_median_count += 1;
            }
        }
        assert!(below_median_count as f64 / 200.0 >= 0.5);
    }

    #[test]
    fn truncation_only_returns_top_slice() {
        let fitness = vec![10.0, 1.0, 5.0, 8.0, 2.0];
        let mut strategy = Truncation::new(0.4); // top 2 of 5
        for _ in 0..50 {
            let idx = strategy.select(&fitness, true);
            assert!(fitness[idx] <= 2.0);
        }
    }

    #[test]
    fn roulette_handles_non_finite_fitness_without_panicking() {
        let fitness = vec![f64::NAN, 1.0, f64::INFINITY, 2.0];
        let mut strategy = Roulette::default();
        for _ in 0..20 {
            let idx = strategy.select(&fitness, true);
            assert!(idx < fitness.len());
        }
    }

    #[test]
    fn rank_is_cloneable_across_workers() {
        let boxed: Box<dyn Selection> = Box::new(Rank);
        let mut cloned = boxed.clone();
        let idx = cloned.select(&[3.0, 1.0, 2.0], true);
        assert!(idx < 3);
    }
}
