use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Randomness used by the coordinator (player order, engine seeds).
pub trait RandomSource: Send {
    fn next_u64(&mut self) -> u64;

    fn coin_flip(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }
}

/// Thread-local OS-seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_u64(&mut self) -> u64 {
        rand::rng().random()
    }
}

/// Reproducible generator for the fixed-seed debug option and tests.
#[derive(Debug, Clone)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn next_u64(&mut self) -> u64 {
        self.0.random()
    }
}
