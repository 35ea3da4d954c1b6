//! Synthetic enrollment event generator.
//!
//! Every field is drawn independently per event; the district is drawn from
//! the districts of the chosen region.

use crate::catalog::{GENDERS, MAX_AGE, MIN_AGE, REGIONS, REQUEST_TYPES};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One synthetic enrollment request. Not stored; only its effects are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentEvent {
    pub region: &'static str,
    pub district: &'static str,
    pub request_type: &'static str,
    pub gender: &'static str,
    pub age: u8,
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Smallest batch per tick (inclusive)
    pub batch_min: usize,
    /// Largest batch per tick (inclusive)
    pub batch_max: usize,
    /// Fixed seed for reproducible runs; entropy when `None`
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            batch_min: 20,
            batch_max: 100,
            seed: None,
        }
    }
}

pub struct EventSimulator {
    config: SimulatorConfig,
    rng: StdRng,
}

impl EventSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Shared RNG, also used for classifier confidence draws so a seeded
    /// run is fully reproducible.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn batch_size(&mut self) -> usize {
        let SimulatorConfig {
            batch_min,
            batch_max,
            ..
        } = self.config;
        if batch_min >= batch_max {
            batch_min
        } else {
            self.rng.random_range(batch_min..=batch_max)
        }
    }

    pub fn next_event(&mut self) -> EnrollmentEvent {
        let (region, districts) = pick(&mut self.rng, REGIONS);
        EnrollmentEvent {
            region,
            district: pick(&mut self.rng, districts),
            request_type: pick(&mut self.rng, REQUEST_TYPES),
            gender: pick(&mut self.rng, GENDERS),
            age: self.rng.random_range(MIN_AGE..=MAX_AGE),
        }
    }

    pub fn generate_batch(&mut self) -> Vec<EnrollmentEvent> {
        let n = self.batch_size();
        (0..n).map(|_| self.next_event()).collect()
    }
}

fn pick<T: Copy>(rng: &mut StdRng, items: &[T]) -> T {
    items[rng.random_range(0..items.len())]
}
