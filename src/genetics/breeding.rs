//! Offspring production from parent chromosomes
//!
//! Selection is the caller's business; these helpers only combine the
//! chromosome operators the way a generation step applies them.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Chromosome, Result};

/// Operator settings for producing offspring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreedingConfig {
    /// Crossover points used when crossing two parents
    pub crossover_points: usize,
    /// Probability that an offspring receives one extra bit flip
    pub mutation_rate: f64,
}

impl Default for BreedingConfig {
    fn default() -> Self {
        Self {
            crossover_points: 4,
            mutation_rate: 0.025,
        }
    }
}

/// Cross two parents, then possibly mutate the child
pub fn cross<R: Rng + ?Sized>(
    first: &Chromosome,
    second: &Chromosome,
    config: &BreedingConfig,
    rng: &mut R,
) -> Result<Chromosome> {
    let child = first.crossover(second, config.crossover_points, rng)?;
    Ok(maybe_mutate(child, config.mutation_rate, rng))
}

/// Copy a parent, then possibly mutate the copy
pub fn clone_with_mutation<R: Rng + ?Sized>(
    parent: &Chromosome,
    config: &BreedingConfig,
    rng: &mut R,
) -> Chromosome {
    maybe_mutate(parent.clone(), config.mutation_rate, rng)
}

/// Copy a parent with a guaranteed single-bit mutation
pub fn mutate<R: Rng + ?Sized>(parent: &Chromosome, rng: &mut R) -> Chromosome {
    parent.mutate(rng)
}

fn maybe_mutate<R: Rng + ?Sized>(child: Chromosome, rate: f64, rng: &mut R) -> Chromosome {
    if rng.random::<f64>() < rate {
        child.mutate(rng)
    } else {
        child
    }
}
