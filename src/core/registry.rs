//! Resource class registry.

use std::collections::BTreeMap;

use crate::core::{CoordinationError, OrderingGate, PoolStats, ResourcePool, WakePolicy};
use crate::util::serde::{OrderingPolicy, ResourceClass};

/// Pool and optional gate configured for one class.
#[derive(Debug, Clone)]
pub struct ClassEntry {
    policy: OrderingPolicy,
    pool: ResourcePool,
    gate: Option<OrderingGate>,
}

impl ClassEntry {
    /// Build the primitives for one class.
    ///
    /// Strict classes get a FIFO pool behind an ordering gate; unordered
    /// classes get a barging pool and no gate.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] when `capacity` is zero.
    pub fn new(
        class: ResourceClass,
        capacity: u32,
        policy: OrderingPolicy,
    ) -> Result<Self, CoordinationError> {
        let (pool, gate) = match policy {
            OrderingPolicy::StrictArrivalOrder => {
                let pool = ResourcePool::new(class.as_str(), capacity, WakePolicy::Fifo)?;
                let gate = OrderingGate::new(pool.clone())?;
                (pool, Some(gate))
            }
            OrderingPolicy::Unordered => (
                ResourcePool::new(class.as_str(), capacity, WakePolicy::Barging)?,
                None,
            ),
        };
        Ok(Self { policy, pool, gate })
    }

    /// Admission policy.
    #[must_use]
    pub const fn policy(&self) -> OrderingPolicy {
        self.policy
    }

    /// Pool for the class.
    #[must_use]
    pub const fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// Gate for the class, present only under strict ordering.
    #[must_use]
    pub const fn gate(&self) -> Option<&OrderingGate> {
        self.gate.as_ref()
    }
}

/// Maps each resource class to its pool and gate.
///
/// Immutable after construction, so shared references may be read from any
/// number of threads without synchronization.
#[derive(Debug, Clone, Default)]
pub struct ResourceClassRegistry {
    classes: BTreeMap<ResourceClass, ClassEntry>,
}

impl ResourceClassRegistry {
    /// Build a registry from `(class, capacity, policy)` triples.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] for a zero capacity or a
    /// class listed twice.
    pub fn new<I>(classes: I) -> Result<Self, CoordinationError>
    where
        I: IntoIterator<Item = (ResourceClass, u32, OrderingPolicy)>,
    {
        let mut map = BTreeMap::new();
        for (class, capacity, policy) in classes {
            if map.contains_key(&class) {
                return Err(CoordinationError::Configuration(format!(
                    "resource class `{class}` configured twice"
                )));
            }
            map.insert(class, ClassEntry::new(class, capacity, policy)?);
            tracing::debug!(%class, capacity, %policy, "registered resource class");
        }
        Ok(Self { classes: map })
    }

    /// Look up the pool and optional gate for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] if `class` is not configured.
    pub fn resolve(
        &self,
        class: ResourceClass,
    ) -> Result<(ResourcePool, Option<OrderingGate>), CoordinationError> {
        let entry = self.entry(class)?;
        Ok((entry.pool.clone(), entry.gate.clone()))
    }

    /// Borrow the full entry for `class`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Configuration`] if `class` is not configured.
    pub fn entry(&self, class: ResourceClass) -> Result<&ClassEntry, CoordinationError> {
        self.classes.get(&class).ok_or_else(|| {
            CoordinationError::Configuration(format!("unknown resource class `{class}`"))
        })
    }

    /// Configured classes in a stable order.
    pub fn classes(&self) -> impl Iterator<Item = ResourceClass> + '_ {
        self.classes.keys().copied()
    }

    /// Pool counters for every class.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<ResourceClass, PoolStats> {
        self.classes
            .iter()
            .map(|(class, entry)| (*class, entry.pool.stats()))
            .collect()
    }
}
