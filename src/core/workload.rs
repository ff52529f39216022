//! Workload collaborator and duration sources.
//!
//! The core treats the print job itself as an opaque blocking call. How long
//! each job takes, and how long a requester dawdles before asking for a
//! printer, comes from an injectable [`DurationSource`] so runs can be made
//! reproducible.

use std::collections::BTreeMap;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::util::serde::ResourceClass;

/// The work performed while a permit is held.
pub trait Workload: Send + Sync {
    /// Block the calling thread for roughly `duration`.
    fn run(&self, duration: Duration);
}

/// Sleeps for the requested duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepWorkload;

impl Workload for SleepWorkload {
    fn run(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Produces per-request timings at construction time.
pub trait DurationSource {
    /// How long a request of `class` holds its permit.
    fn workload_duration(&mut self, class: ResourceClass) -> Duration;

    /// Pause before a request starts competing for admission.
    fn arrival_delay(&mut self) -> Duration {
        Duration::ZERO
    }
}

/// Inclusive range of durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationRange {
    /// Lower bound.
    pub min: Duration,
    /// Upper bound.
    pub max: Duration,
}

impl DurationRange {
    /// Create a range, swapping the bounds if they are inverted.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    fn sample(self, rng: &mut StdRng) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let lo = u64::try_from(self.min.as_nanos()).unwrap_or(u64::MAX);
        let hi = u64::try_from(self.max.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rng.random_range(lo..=hi))
    }
}

/// Uniformly random timings from a seedable generator.
#[derive(Debug, Clone)]
pub struct SeededDurations {
    rng: StdRng,
    ranges: BTreeMap<ResourceClass, DurationRange>,
    arrival_jitter: Duration,
}

impl SeededDurations {
    /// Deterministic source for a given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from the operating system.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            ranges: BTreeMap::new(),
            arrival_jitter: Duration::ZERO,
        }
    }

    /// Set the workload range for `class`.
    #[must_use]
    pub fn with_range(mut self, class: ResourceClass, range: DurationRange) -> Self {
        self.ranges.insert(class, range);
        self
    }

    /// Draw arrival delays uniformly from `0..=max`.
    #[must_use]
    pub const fn with_arrival_jitter(mut self, max: Duration) -> Self {
        self.arrival_jitter = max;
        self
    }
}

impl DurationSource for SeededDurations {
    fn workload_duration(&mut self, class: ResourceClass) -> Duration {
        match self.ranges.get(&class) {
            Some(range) => range.sample(&mut self.rng),
            None => {
                tracing::warn!(%class, "no duration range configured, using zero");
                Duration::ZERO
            }
        }
    }

    fn arrival_delay(&mut self) -> Duration {
        DurationRange::new(Duration::ZERO, self.arrival_jitter).sample(&mut self.rng)
    }
}

/// Constant timings, for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct FixedDurations {
    default: Duration,
    per_class: BTreeMap<ResourceClass, Duration>,
    arrival_delay: Duration,
}

impl FixedDurations {
    /// Every request holds its permit for `duration`.
    #[must_use]
    pub fn uniform(duration: Duration) -> Self {
        Self {
            default: duration,
            ..Self::default()
        }
    }

    /// Override the duration for one class.
    #[must_use]
    pub fn with(mut self, class: ResourceClass, duration: Duration) -> Self {
        self.per_class.insert(class, duration);
        self
    }

    /// Every request waits `delay` before competing.
    #[must_use]
    pub const fn with_arrival_delay(mut self, delay: Duration) -> Self {
        self.arrival_delay = delay;
        self
    }
}

impl DurationSource for FixedDurations {
    fn workload_duration(&mut self, class: ResourceClass) -> Duration {
        self.per_class.get(&class).copied().unwrap_or(self.default)
    }

    fn arrival_delay(&mut self) -> Duration {
        self.arrival_delay
    }
}
