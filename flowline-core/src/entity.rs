//! Entities travelling through the network.

use std::fmt;

use serde::Serialize;

use crate::SimTime;
use crate::network::ElementId;

/// Unique, monotonically assigned entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates entity id from raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Opaque token representing a customer, vehicle or job.
///
/// The engine only moves entities around. Gate guards, station
/// pre-output transforms and per-class service delays may look at
/// `class`; nothing else does.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Network-wide unique id
    pub id: EntityId,
    /// Simulated time the entity was manufactured or preloaded
    pub created_at: SimTime,
    /// Element that introduced the entity into the network
    pub origin: ElementId,
    /// Operator-defined classification tag
    pub class: u32,
}

impl Entity {
    /// Creates new entity.
    pub fn new(id: EntityId, created_at: SimTime, origin: ElementId, class: u32) -> Self {
        Self {
            id,
            created_at,
            origin,
            class,
        }
    }

    /// Returns a copy of this entity re-tagged with `class`.
    pub fn with_class(mut self, class: u32) -> Self {
        self.class = class;
        self
    }
}
