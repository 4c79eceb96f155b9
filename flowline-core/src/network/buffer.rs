//! Bounded entity store with overflow accounting.

use std::collections::VecDeque;

use tracing::trace;

use super::{ElementId, Network, NodeKind};
use crate::SimTime;
use crate::entity::Entity;

/// Which stored entity `extract` removes.
#[derive(Debug, Clone, Copy, Default)]
pub enum ExtractionPolicy {
    /// Oldest first
    #[default]
    Fifo,
    /// Newest first
    Lifo,
    /// Operator-chosen index; `None` or an out-of-range index falls back to the head
    Custom(fn(&VecDeque<Entity>) -> Option<usize>),
}

/// Buffer state.
#[derive(Debug, Clone)]
pub struct Buffer {
    entities: VecDeque<Entity>,
    capacity: usize,
    priority: f64,
    policy: ExtractionPolicy,
    overflows: u64,
    integrated_length: f64,
}

impl Buffer {
    pub(crate) fn new(capacity: usize, priority: f64, policy: ExtractionPolicy) -> Self {
        Self {
            entities: VecDeque::new(),
            capacity,
            priority,
            policy,
            overflows: 0,
            integrated_length: 0.0,
        }
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Declared capacity, `usize::MAX` when unbounded.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_bounded(&self) -> bool {
        self.capacity != usize::MAX
    }

    /// Priority this buffer registers with on downstream stations.
    pub fn priority(&self) -> f64 {
        self.priority
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    /// Returns true if one more entity fits.
    pub fn has_room(&self) -> bool {
        self.entities.len() < self.capacity
    }

    /// Entities discarded because the buffer was full.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Sum of `length * elapsed` over recorded ticks.
    pub fn integrated_length(&self) -> f64 {
        self.integrated_length
    }

    /// Time-averaged length over `window`.
    pub fn average_length(&self, window: SimTime) -> f64 {
        if window > 0.0 {
            self.integrated_length / window
        } else {
            0.0
        }
    }

    /// Stored entities, head first.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub(crate) fn record(&mut self, elapsed: SimTime) {
        self.integrated_length += self.entities.len() as f64 * elapsed;
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.overflows = 0;
        self.integrated_length = 0.0;
    }

    fn take(&mut self) -> Option<Entity> {
        match self.policy {
            ExtractionPolicy::Fifo => self.entities.pop_front(),
            ExtractionPolicy::Lifo => self.entities.pop_back(),
            ExtractionPolicy::Custom(pick) => match pick(&self.entities) {
                Some(index) if index < self.entities.len() => self.entities.remove(index),
                _ => self.entities.pop_front(),
            },
        }
    }
}

impl Network {
    fn buffer_mut(&mut self, id: ElementId) -> Option<&mut Buffer> {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.kind) {
            Some(NodeKind::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// Forwards straight through when the chosen successor accepts, stores
    /// otherwise, and counts an overflow when full.
    pub(super) fn admit_to_buffer(&mut self, id: ElementId, entity: Entity) -> bool {
        let bypass = self
            .choose_successor(id, Some(&entity))
            .filter(|&target| self.can_accept(target));
        if let Some(target) = bypass {
            trace!("{} forwards {} to {}", self.name(id), entity.id, self.name(target));
            return self.admit(target, entity);
        }

        let Some(buffer) = self.buffer_mut(id) else {
            return false;
        };
        if buffer.has_room() {
            buffer.entities.push_back(entity);
            true
        } else {
            buffer.overflows += 1;
            trace!("{} overflow, {} lost", self.name(id), entity.id);
            false
        }
    }

    /// Removes one entity according to the extraction policy and refills
    /// the freed slot from the first registered upstream buffer.
    pub fn extract(&mut self, id: ElementId) -> Option<Entity> {
        self.extract_within(id, self.nodes.len())
    }

    fn extract_within(&mut self, id: ElementId, hops: usize) -> Option<Entity> {
        let entity = self.buffer_mut(id)?.take()?;
        if let Some(base) = self.base_mut(id) {
            base.completed += 1;
        }

        let upstream = self
            .base(id)
            .and_then(|base| base.inputs.first())
            .map(|input| input.buffer)
            .filter(|&input| input != id);
        if let Some(upstream) = upstream
            && hops > 0
            && let Some(refill) = self.extract_within(upstream, hops - 1)
            && let Some(buffer) = self.buffer_mut(id)
        {
            buffer.entities.push_back(refill);
        }

        Some(entity)
    }

    /// Appends to the tail. Gives the entity back if the buffer is full.
    pub fn push_back(&mut self, id: ElementId, entity: Entity) -> Result<(), Entity> {
        match self.buffer_mut(id) {
            Some(buffer) if buffer.has_room() => {
                buffer.entities.push_back(entity);
                Ok(())
            }
            _ => Err(entity),
        }
    }

    /// Inserts at the head. Gives the entity back if the buffer is full.
    pub fn push_front(&mut self, id: ElementId, entity: Entity) -> Result<(), Entity> {
        match self.buffer_mut(id) {
            Some(buffer) if buffer.has_room() => {
                buffer.entities.push_front(entity);
                Ok(())
            }
            _ => Err(entity),
        }
    }

    /// Removes the tail without touching counters or refilling.
    pub fn pop_back(&mut self, id: ElementId) -> Option<Entity> {
        self.buffer_mut(id)?.entities.pop_back()
    }

    /// Removes the head without touching counters or refilling.
    pub fn pop_front(&mut self, id: ElementId) -> Option<Entity> {
        self.buffer_mut(id)?.entities.pop_front()
    }
}
