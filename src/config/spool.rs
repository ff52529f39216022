//! Printer class and run timing configuration.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::serde::{OrderingPolicy, ResourceClass};

/// Configuration of one printer class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    /// Number of interchangeable printers.
    pub capacity: u32,
    /// Admission policy.
    pub policy: OrderingPolicy,
    /// Requesters created for this class per run.
    #[serde(default)]
    pub requesters: usize,
    /// Shortest print job, in time units.
    pub min_duration_units: f64,
    /// Longest print job, in time units.
    pub max_duration_units: f64,
}

impl ClassConfig {
    /// Validate class configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if !self.min_duration_units.is_finite() || self.min_duration_units <= 0.0 {
            return Err("min_duration_units must be a positive number".into());
        }
        if !self.max_duration_units.is_finite() || self.max_duration_units <= 0.0 {
            return Err("max_duration_units must be a positive number".into());
        }
        if self.min_duration_units > self.max_duration_units {
            return Err("min_duration_units must not exceed max_duration_units".into());
        }
        Ok(())
    }
}

const fn default_time_unit_ms() -> u64 {
    1000
}

const fn default_arrival_jitter_ms() -> u64 {
    100
}

/// Root configuration of a printing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Length of one duration unit in milliseconds.
    #[serde(default = "default_time_unit_ms")]
    pub time_unit_ms: u64,
    /// Upper bound of the random pause before a requester competes.
    #[serde(default = "default_arrival_jitter_ms")]
    pub arrival_jitter_ms: u64,
    /// RNG seed; `None` draws from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Per-class settings.
    pub classes: BTreeMap<ResourceClass, ClassConfig>,
}

impl SpoolConfig {
    /// The shared-printer scenario: three monochrome and two color printers,
    /// six requesters each.
    #[must_use]
    pub fn printers(policy: OrderingPolicy) -> Self {
        let mut classes = BTreeMap::new();
        classes.insert(
            ResourceClass::Monochrome,
            ClassConfig {
                capacity: 3,
                policy,
                requesters: 6,
                min_duration_units: 1.0,
                max_duration_units: 3.0,
            },
        );
        classes.insert(
            ResourceClass::Color,
            ClassConfig {
                capacity: 2,
                policy,
                requesters: 6,
                min_duration_units: 2.0,
                max_duration_units: 4.0,
            },
        );
        Self {
            time_unit_ms: default_time_unit_ms(),
            arrival_jitter_ms: default_arrival_jitter_ms(),
            seed: None,
            classes,
        }
    }

    /// Override the policy of every class.
    #[must_use]
    pub fn with_policy(mut self, policy: OrderingPolicy) -> Self {
        for class in self.classes.values_mut() {
            class.policy = policy;
        }
        self
    }

    /// Validate all classes and ensure at least one class exists.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("at least one resource class must be defined".into());
        }
        if self.time_unit_ms == 0 {
            return Err("time_unit_ms must be greater than 0".into());
        }
        for (class, cfg) in &self.classes {
            cfg.validate()
                .and_then(|()| self.duration_of(cfg.max_duration_units).map(drop))
                .map_err(|e| format!("class `{class}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Convert a length in time units to a `Duration`.
    pub fn duration_of(&self, units: f64) -> Result<Duration, String> {
        Duration::try_from_secs_f64(self.time_unit().as_secs_f64() * units)
            .map_err(|e| format!("{units} time units is not a valid duration: {e}"))
    }

    /// Keep only the listed classes; an empty list keeps every class.
    #[must_use]
    pub fn retain_classes(mut self, classes: &[ResourceClass]) -> Self {
        if !classes.is_empty() {
            self.classes.retain(|class, _| classes.contains(class));
        }
        self
    }

    /// Load `path` if given, else the printer scenario.
    ///
    /// `policy` overrides every class's policy only when present; a file's
    /// per-class policies are kept otherwise. Without a file the scenario
    /// defaults to strict arrival order.
    pub fn load(path: Option<&Path>, policy: Option<OrderingPolicy>) -> Result<Self, String> {
        let cfg = match path {
            Some(path) => Self::from_json_file(path)?,
            None => Self::printers(policy.unwrap_or(OrderingPolicy::StrictArrivalOrder)),
        };
        Ok(match policy {
            Some(policy) => cfg.with_policy(policy),
            None => cfg,
        })
    }

    /// Length of one duration unit.
    #[must_use]
    pub const fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Upper bound of the arrival pause.
    #[must_use]
    pub const fn arrival_jitter(&self) -> Duration {
        Duration::from_millis(self.arrival_jitter_ms)
    }

    /// Total requesters across all classes.
    #[must_use]
    pub fn total_requesters(&self) -> usize {
        self.classes.values().map(|c| c.requesters).sum()
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
        Self::from_json_str(&input)
    }
}
