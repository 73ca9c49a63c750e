//! Sources of the per-rewrite alternative index.

use obscura_core::Seed;
use rand::Rng;
use rand::rngs::StdRng;

/// Picks which catalogue alternative a rewrite uses.
pub trait ChoiceSource {
    /// Returns an index in `0..len`. Only called with `len >= 2`.
    fn choose(&mut self, len: usize) -> usize;

    /// Called before the engine starts on `function`.
    fn enter_function(&mut self, _function: &str) {}
}

impl ChoiceSource for StdRng {
    fn choose(&mut self, len: usize) -> usize {
        self.random_range(0..len)
    }
}

/// Always answers the same index, reduced modulo the number of alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedChoice(pub usize);

impl ChoiceSource for FixedChoice {
    fn choose(&mut self, len: usize) -> usize {
        self.0 % len
    }
}

/// Restarts from a function-specific stream whenever a new function begins.
#[derive(Debug)]
pub struct PerFunctionRng {
    seed: Seed,
    rng: StdRng,
}

impl PerFunctionRng {
    pub fn new(seed: Seed) -> Self {
        let rng = seed.create_deterministic_rng();
        Self { seed, rng }
    }
}

impl ChoiceSource for PerFunctionRng {
    fn choose(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }

    fn enter_function(&mut self, function: &str) {
        self.rng = self.seed.rng_for(function);
    }
}
