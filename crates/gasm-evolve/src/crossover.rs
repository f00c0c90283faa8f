//! Crossover strategies (spec §4.6): write a child's bytecode from two
//! parents. Parents are read-only slices; the child is a fresh `Vec<u8>`
//! the driver copies into its scratch buffer before evaluating fitness.

use rand::Rng;

pub trait Crossover: CloneCrossover + Send {
    fn crossover(&mut self, parent1: &[u8], parent2: &[u8], individual_max_size: usize) -> Vec<u8>;
}

pub trait CloneCrossover {
    fn clone_box(&self) -> Box<dyn Crossover>;
}

impl<T> CloneCrossover for T
where
    T: 'static + Crossover + Clone,
{
    fn clone_box(&self) -> Box<dyn Crossover> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn Crossover> {
    fn clone(&self) -> Box<dyn Crossover> {
        self.clone_box()
    }
}

/// Splices the two parents at one random index `<= min(|p1|, |p2|)`:
/// `child = parent1[..cut] ++ parent2[cut..]`.
#[derive(Debug, Clone, Default)]
pub struct OnePoint;

impl Crossover for OnePoint {
    fn crossover(&mut self, parent1: &[u8], parent2: &[u8], individual_max_size: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let bound = parent1.len().min(parent2.len());
        let cut = if bound == 0 { 0 } else { rng.gen_range(0..=bound) };
        let mut child = Vec::with_capacity(parent1.len());
        child.extend_from_slice(&parent1[..cut.min(parent1.len())]);
        child.extend_from_slice(&parent2[cut.min(parent2.len())..]);
        child.truncate(individual_max_size);
        child
    }
}

/// Swaps the middle segment bounded by two cuts taken within `parent1`'s
/// length; the child's length always equals `|parent1|`.
#[derive(Debug, Clone, Default)]
pub struct TwoPoint;

impl Crossover for TwoPoint {
    fn crossover(&mut self, parent1: &[u8], parent2: &[u8], individual_max_size: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let len = parent1.len();
        let mut child = parent1.to_vec();
        if len == 0 || parent2.is_empty() {
            child.truncate(individual_max_size);
            return child;
        }
        let a = rng.gen_range(0..len);
        let b = rng.gen_range(0..len);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        for i in lo..=hi {
            if i < parent2.len() {
                child[i] = parent2[i];
            }
        }
        child.truncate(individual_max_size);
        child
    }
}

/// Like [`TwoPoint`] but the two cut points are independent, one per parent:
/// `child = parent1[..cut1] ++ parent2[cut2..]`, producing children of
/// varying size, capped at `individual_max_size` by truncation. The exact
/// shape isn't pinned down anywhere upstream; this is the literal reading of
/// spec §4.6's "two independent cut points, one per parent" description.
#[derive(Debug, Clone, Default)]
pub struct TwoPointSize;

impl Crossover for TwoPointSize {
    fn crossover(&mut self, parent1: &[u8], parent2: &[u8], individual_max_size: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let cut1 = if parent1.is_empty() { 0 } else { rng.gen_range(0..=parent1.len()) };
        let cut2 = if parent2.is_empty() { 0 } else { rng.gen_range(0..=parent2.len()) };
        let mut child = Vec::with_capacity(cut1 + (parent2.len() - cut2));
        child.extend_from_slice(&parent1[..cut1]);
        child.extend_from_slice(&parent2[cut2..]);
        child.truncate(individual_max_size);
        child
    }
}

/// Per-position Bernoulli(0.5) pick between the two parents; the child's
/// length equals the longer parent, with the shorter parent's tail
/// supplied by the longer parent's remaining bytes.
#[derive(Debug, Clone, Default)]
pub struct Uniform;

impl Crossover for Uniform {
    fn crossover(&mut self, parent1: &[u8], parent2: &[u8], individual_max_size: usize) -> Vec<u8> {
        let mut rng = rand::thread_rng();
        let (longer, shorter) = if parent1.len() >= parent2.len() { (parent1, parent2) } else { (parent2, parent1) };
        let mut child = Vec::with_capacity(longer.len());
        for i in 0..longer.len() {
            if i < shorter.len() && rng.gen_bool(0.5) {
                child.push(shorter[i]);
            } else {
                child.push(longer[i]);
            }
        }
        child.truncate(individual_max_size);
        child
    }
}
