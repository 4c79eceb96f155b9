//! Element arena and the operations elements perform on each other.
//!
//! Every element lives in a single arena owned by [`Network`] and is
//! addressed by a stable [`ElementId`]. Successor lists and input-buffer
//! registrations store ids, never references, so operator-wired cycles do
//! not create ownership cycles. Cross-element operations (forwarding an
//! entity, pulling from a buffer) are methods on `Network` that take ids.

mod buffer;
mod builder;
mod gate;
mod routing;
mod source;
mod station;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::Serialize;

pub use buffer::{Buffer, ExtractionPolicy};
pub use builder::{BufferSpec, GateSpec, NetworkBuilder, SourceSpec, StationSpec};
pub use gate::{Gate, Guard};
pub use routing::{InputBuffer, SelectionMode, Successor, Successors};
pub use source::Source;
pub use station::{Station, Transform, WorkerTask};

use crate::SimTime;
use crate::delay::Delay;
use crate::entity::{Entity, EntityId};
use crate::errors::ConfigError;
use crate::random::RandomSource;

/// Stable arena index of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(usize);

impl ElementId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The closed set of element variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    Source,
    Gate,
    Buffer,
    Station,
}

impl ElementKind {
    /// Returns lowercase kind name.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementKind::Source => "source",
            ElementKind::Gate => "gate",
            ElementKind::Buffer => "buffer",
            ElementKind::Station => "station",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State shared by every element.
#[derive(Debug)]
pub struct ElementBase {
    name: String,
    clock: SimTime,
    next_event: Option<SimTime>,
    delay: Option<Delay>,
    completed: u64,
    successors: Successors,
    inputs: Vec<InputBuffer>,
}

impl ElementBase {
    fn new(name: String, delay: Option<Delay>) -> Self {
        Self {
            name,
            clock: 0.0,
            next_event: None,
            delay,
            completed: 0,
            successors: Successors::default(),
            inputs: Vec::new(),
        }
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local mirror of the global clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Time of the next self-triggered event, `None` when not scheduled.
    pub fn next_event(&self) -> Option<SimTime> {
        self.next_event
    }

    /// Default delay distribution.
    pub fn delay(&self) -> Option<&Delay> {
        self.delay.as_ref()
    }

    /// Completion counter.
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Weighted successor candidates.
    pub fn successors(&self) -> &Successors {
        &self.successors
    }

    /// Registered input buffers, in registration order.
    pub fn inputs(&self) -> &[InputBuffer] {
        &self.inputs
    }
}

#[derive(Debug)]
pub(crate) enum NodeKind {
    Source(Source),
    Gate(Gate),
    Buffer(Buffer),
    Station(Station),
}

impl NodeKind {
    fn kind(&self) -> ElementKind {
        match self {
            NodeKind::Source(_) => ElementKind::Source,
            NodeKind::Gate(_) => ElementKind::Gate,
            NodeKind::Buffer(_) => ElementKind::Buffer,
            NodeKind::Station(_) => ElementKind::Station,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    base: ElementBase,
    kind: NodeKind,
}

/// Read-only view of the network handed to gate guards.
#[derive(Clone, Copy)]
pub struct NetworkView<'a> {
    nodes: &'a [Node],
    clock: SimTime,
}

impl<'a> NetworkView<'a> {
    /// Current global clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Number of entities stored in a buffer, 0 for anything else.
    pub fn buffer_len(&self, id: ElementId) -> usize {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Buffer(buffer)) => buffer.len(),
            _ => 0,
        }
    }

    /// Active plus held entities of a station, stored entities of a buffer.
    pub fn occupancy(&self, id: ElementId) -> usize {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Buffer(buffer)) => buffer.len(),
            Some(NodeKind::Station(station)) => station.occupancy(),
            _ => 0,
        }
    }

    /// Completion counter of any element.
    pub fn completed(&self, id: ElementId) -> u64 {
        self.nodes
            .get(id.index())
            .map_or(0, |node| node.base.completed)
    }

    /// Returns true if `target` is a gate whose guard currently blocks `entity`.
    fn blocks(&self, target: ElementId, entity: Option<&Entity>) -> bool {
        match self.nodes.get(target.index()).map(|node| &node.kind) {
            Some(NodeKind::Gate(gate)) => gate.blocks(self, entity),
            _ => false,
        }
    }
}

impl fmt::Debug for NetworkView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkView")
            .field("elements", &self.nodes.len())
            .field("clock", &self.clock)
            .finish()
    }
}

/// Validated, wired set of elements plus the shared random source.
///
/// Built by [`NetworkBuilder`]; the wiring is fixed afterwards. Element
/// state changes only through the operations below, which the
/// [`Model`](crate::Model) invokes once per tick and which per-tick hooks
/// may invoke between ticks.
#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    rng: RandomSource,
    clock: SimTime,
    next_entity: u64,
}

impl Network {
    fn new(nodes: Vec<Node>, rng: RandomSource) -> Self {
        Self {
            nodes,
            rng,
            clock: 0.0,
            next_entity: 0,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the network has no elements.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All element ids in arena order.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + use<> {
        (0..self.nodes.len()).map(ElementId::new)
    }

    /// Ids of all elements of `kind`, in arena order.
    pub fn ids_of(&self, kind: ElementKind) -> Vec<ElementId> {
        self.ids().filter(|&id| self.kind(id) == Some(kind)).collect()
    }

    /// Looks an element up by display name.
    pub fn find(&self, name: &str) -> Option<ElementId> {
        self.nodes
            .iter()
            .position(|node| node.base.name == name)
            .map(ElementId::new)
    }

    /// Global clock.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    /// Read-only view for guard evaluation.
    pub fn view(&self) -> NetworkView<'_> {
        NetworkView {
            nodes: &self.nodes,
            clock: self.clock,
        }
    }

    /// Shared random source, for hooks that need randomness.
    pub fn rng_mut(&mut self) -> &mut RandomSource {
        &mut self.rng
    }

    /// Base state of an element.
    pub fn base(&self, id: ElementId) -> Option<&ElementBase> {
        self.nodes.get(id.index()).map(|node| &node.base)
    }

    /// Kind of an element.
    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.nodes.get(id.index()).map(|node| node.kind.kind())
    }

    /// Display name of an element, empty for unknown ids.
    pub fn name(&self, id: ElementId) -> &str {
        self.base(id).map_or("", ElementBase::name)
    }

    /// Completion counter of an element.
    pub fn completed(&self, id: ElementId) -> u64 {
        self.base(id).map_or(0, ElementBase::completed)
    }

    /// Time of the element's next self-triggered event.
    pub fn next_event_time(&self, id: ElementId) -> Option<SimTime> {
        self.base(id).and_then(ElementBase::next_event)
    }

    /// Buffer state, `None` if `id` is not a buffer.
    pub fn buffer(&self, id: ElementId) -> Option<&Buffer> {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }

    /// Station state, `None` if `id` is not a station.
    pub fn station(&self, id: ElementId) -> Option<&Station> {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Station(station)) => Some(station),
            _ => None,
        }
    }

    /// Source state, `None` if `id` is not a source.
    pub fn source(&self, id: ElementId) -> Option<&Source> {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Source(source)) => Some(source),
            _ => None,
        }
    }

    /// Gate state, `None` if `id` is not a gate.
    pub fn gate(&self, id: ElementId) -> Option<&Gate> {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Gate(gate)) => Some(gate),
            _ => None,
        }
    }

    /// Number of entities stored in a buffer, 0 for anything else.
    pub fn buffer_len(&self, id: ElementId) -> usize {
        self.view().buffer_len(id)
    }

    /// Active plus held entities of a station, stored entities of a buffer.
    pub fn occupancy(&self, id: ElementId) -> usize {
        self.view().occupancy(id)
    }

    /// Entities currently inside buffers and stations.
    pub fn in_flight(&self) -> usize {
        self.ids().map(|id| self.occupancy(id)).sum()
    }

    /// Schedules the element's next self-triggered event.
    ///
    /// Only stations and sources drive the clock; returns false for
    /// buffers, gates and unknown ids.
    pub fn schedule_self_at(&mut self, id: ElementId, time: SimTime) -> bool {
        let Some(node) = self.nodes.get_mut(id.index()) else {
            return false;
        };
        match node.kind {
            NodeKind::Source(_) | NodeKind::Station(_) => {
                node.base.next_event = Some(time);
                true
            }
            NodeKind::Gate(_) | NodeKind::Buffer(_) => false,
        }
    }

    /// Time the element is currently scheduled to fire.
    pub fn current_self_scheduled_time(&self, id: ElementId) -> Option<SimTime> {
        self.next_event_time(id)
    }

    /// Samples a delay from `override_delay` or the element's default.
    ///
    /// # Errors
    ///
    /// - `ConfigError::MissingDistribution` - Neither is configured
    pub fn sample_delay(
        &mut self,
        id: ElementId,
        override_delay: Option<&Delay>,
    ) -> Result<f64, ConfigError> {
        let node = self
            .nodes
            .get(id.index())
            .ok_or(ConfigError::UnknownElement { id: id.index() })?;
        let delay = override_delay
            .or(node.base.delay.as_ref())
            .ok_or_else(|| ConfigError::MissingDistribution {
                element: node.base.name.clone(),
            })?;
        Ok(delay.sample(&mut self.rng))
    }

    /// Offers an entity to an element. Returns true if it was taken in.
    ///
    /// Rejections are counted by the receiving element (buffer overflow,
    /// station failure); the entity is discarded.
    pub fn admit(&mut self, id: ElementId, entity: Entity) -> bool {
        match self.kind(id) {
            Some(ElementKind::Gate) => self.admit_to_gate(id, entity),
            Some(ElementKind::Buffer) => self.admit_to_buffer(id, entity),
            Some(ElementKind::Station) => self.admit_to_station(id, entity),
            Some(ElementKind::Source) | None => false,
        }
    }

    /// Returns true if the element would currently take an entity in.
    pub fn can_accept(&self, id: ElementId) -> bool {
        self.can_accept_within(id, self.nodes.len())
    }

    fn can_accept_within(&self, id: ElementId, hops: usize) -> bool {
        match self.nodes.get(id.index()).map(|node| &node.kind) {
            Some(NodeKind::Buffer(buffer)) => buffer.has_room(),
            Some(NodeKind::Station(station)) => station.has_capacity(),
            Some(NodeKind::Gate(_)) if hops > 0 => self
                .gate_target(id)
                .is_some_and(|target| self.can_accept_within(target, hops - 1)),
            _ => false,
        }
    }

    /// Fires the element's scheduled event.
    pub fn on_self_event(&mut self, id: ElementId) {
        match self.kind(id) {
            Some(ElementKind::Source) => self.fire_source(id),
            Some(ElementKind::Station) => self.complete_task(id),
            Some(ElementKind::Gate | ElementKind::Buffer) => {
                if let Some(node) = self.nodes.get_mut(id.index()) {
                    node.base.completed += 1;
                }
            }
            None => {}
        }
    }

    /// Picks the successor for `entity` according to the element's
    /// selection mode, skipping gates whose guard blocks it.
    pub fn choose_successor(
        &mut self,
        id: ElementId,
        entity: Option<&Entity>,
    ) -> Option<ElementId> {
        let node = self.nodes.get(id.index())?;
        let view = NetworkView {
            nodes: &self.nodes,
            clock: self.clock,
        };
        let open: Vec<Successor> = node
            .base
            .successors
            .entries()
            .iter()
            .filter(|successor| !view.blocks(successor.target, entity))
            .copied()
            .collect();
        let mode = node.base.successors.mode();

        routing::select(mode, &open, &mut self.rng)
    }

    /// Returns true if at least one successor of `id` is not blocked, or
    /// if it has none.
    pub fn has_open_path(&self, id: ElementId) -> bool {
        let Some(node) = self.nodes.get(id.index()) else {
            return false;
        };
        let view = self.view();
        let successors = node.base.successors.entries();
        successors.is_empty()
            || successors
                .iter()
                .any(|successor| !view.blocks(successor.target, None))
    }

    /// Accumulates time-weighted statistics for one element.
    pub fn record_occupancy(&mut self, id: ElementId, elapsed: SimTime) {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.kind) {
            Some(NodeKind::Buffer(buffer)) => buffer.record(elapsed),
            Some(NodeKind::Station(station)) => station.record(elapsed),
            _ => {}
        }
    }

    /// Discards statistics of one element. Stored entities and in-flight
    /// tasks are kept.
    pub fn reset_statistics(&mut self, id: ElementId) {
        let Some(node) = self.nodes.get_mut(id.index()) else {
            return;
        };
        node.base.completed = 0;
        match &mut node.kind {
            NodeKind::Buffer(buffer) => buffer.reset_statistics(),
            NodeKind::Station(station) => station.reset_statistics(),
            NodeKind::Source(source) => source.reset_statistics(),
            NodeKind::Gate(_) => {}
        }
    }

    /// Earliest scheduled event and the first element (arena order)
    /// scheduled at that time.
    pub fn earliest_event(&self) -> Option<(ElementId, SimTime)> {
        let mut earliest: Option<(ElementId, SimTime)> = None;
        for (index, node) in self.nodes.iter().enumerate() {
            let Some(time) = node.base.next_event else {
                continue;
            };
            if earliest.is_none_or(|(_, best)| time < best) {
                earliest = Some((ElementId::new(index), time));
            }
        }
        earliest
    }

    /// Moves the global clock and every element's mirror to `time`.
    pub(crate) fn advance_clock(&mut self, time: SimTime) {
        self.clock = time;
        for node in &mut self.nodes {
            node.base.clock = time;
        }
    }

    /// Manufactures a fresh entity attributed to `origin`.
    pub fn create_entity(&mut self, origin: ElementId, class: u32) -> Entity {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        Entity::new(id, self.clock, origin, class)
    }

    fn base_mut(&mut self, id: ElementId) -> Option<&mut ElementBase> {
        self.nodes.get_mut(id.index()).map(|node| &mut node.base)
    }
}
