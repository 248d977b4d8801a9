//! Sources of identifying markers for operation runs.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;

/// Markers are drawn from this half-open range.
pub const MARKER_RANGE: Range<u32> = 1..1000;

/// Produces the identifying marker attached to each run's progress output.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send + Sync {
    /// Returns a marker in [`MARKER_RANGE`].
    fn next_marker(&self) -> u32;
}

/// Draws markers from the thread-local random number generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_marker(&self) -> u32 {
        rand::thread_rng().gen_range(MARKER_RANGE)
    }
}

/// Draws markers from a seeded generator, for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    /// Creates a generator from a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_marker(&self) -> u32 {
        self.rng.lock().gen_range(MARKER_RANGE)
    }
}

/// Always returns the same marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRandom(pub u32);

impl RandomSource for FixedRandom {
    fn next_marker(&self) -> u32 {
        self.0
    }
}
