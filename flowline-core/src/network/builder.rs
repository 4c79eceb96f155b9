//! Imperative network assembly with build-time validation.
//!
//! Elements are added one at a time and receive their [`ElementId`]
//! immediately, so wiring calls can refer to them. Nothing is validated
//! until [`NetworkBuilder::build`], which either returns a fully wired
//! [`Network`] or the first configuration error it finds.

use std::fmt;

use tracing::debug;

use super::{
    Buffer, ElementBase, ElementId, ElementKind, ExtractionPolicy, Gate, Guard, InputBuffer,
    Network, NetworkView, Node, NodeKind, SelectionMode, Source, Station, Transform,
};
use crate::SimTime;
use crate::delay::{Delay, Distribution};
use crate::entity::Entity;
use crate::errors::ConfigError;
use crate::random::RandomSource;

/// Source declaration.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    name: String,
    delay: Distribution,
    first_arrival: SimTime,
    class: u32,
}

impl SourceSpec {
    /// Source whose inter-arrival times follow `delay`. First arrival at 0.
    pub fn new(name: impl Into<String>, delay: Distribution) -> Self {
        Self {
            name: name.into(),
            delay,
            first_arrival: 0.0,
            class: 0,
        }
    }

    pub fn first_arrival(mut self, time: SimTime) -> Self {
        self.first_arrival = time;
        self
    }

    /// Class tag for manufactured entities.
    pub fn class(mut self, class: u32) -> Self {
        self.class = class;
        self
    }
}

/// Gate declaration.
pub struct GateSpec {
    name: String,
    guard: Option<Guard>,
}

impl GateSpec {
    /// Gate that never blocks until a guard is installed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guard: None,
        }
    }

    /// Installs a guard; the gate blocks while it returns true.
    pub fn guard(
        mut self,
        guard: impl Fn(&NetworkView<'_>, Option<&Entity>) -> bool + 'static,
    ) -> Self {
        self.guard = Some(Box::new(guard));
        self
    }
}

impl fmt::Debug for GateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GateSpec")
            .field("name", &self.name)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Buffer declaration.
#[derive(Debug, Clone)]
pub struct BufferSpec {
    name: String,
    capacity: Option<usize>,
    priority: f64,
    policy: ExtractionPolicy,
}

impl BufferSpec {
    /// FIFO buffer holding at most `capacity` entities.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: Some(capacity),
            priority: 0.0,
            policy: ExtractionPolicy::Fifo,
        }
    }

    pub fn unbounded(name: impl Into<String>) -> Self {
        Self {
            capacity: None,
            ..Self::new(name, 0)
        }
    }

    /// Priority this buffer registers with on downstream stations.
    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn policy(mut self, policy: ExtractionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Station declaration.
pub struct StationSpec {
    name: String,
    workers: Option<usize>,
    delay: Distribution,
    hold_outputs: bool,
    recover_when_idle: bool,
    transform: Option<Transform>,
    class_delays: Vec<(u32, Distribution)>,
}

impl StationSpec {
    /// Station with `workers` parallel servers and service time `delay`.
    pub fn new(name: impl Into<String>, workers: usize, delay: Distribution) -> Self {
        Self {
            name: name.into(),
            workers: Some(workers),
            delay,
            hold_outputs: false,
            recover_when_idle: false,
            transform: None,
            class_delays: Vec::new(),
        }
    }

    /// Station that never rejects an entity.
    pub fn unbounded(name: impl Into<String>, delay: Distribution) -> Self {
        Self {
            workers: None,
            ..Self::new(name, 1, delay)
        }
    }

    /// Keep completed entities when the chosen successor cannot take them.
    pub fn hold_outputs(mut self) -> Self {
        self.hold_outputs = true;
        self
    }

    /// Let the scheduler restart this station from its inputs when idle.
    pub fn recover_when_idle(mut self) -> Self {
        self.recover_when_idle = true;
        self
    }

    pub fn transform(mut self, transform: impl Fn(Entity) -> Entity + 'static) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Service time for entities tagged `class`, overriding the default.
    pub fn class_delay(mut self, class: u32, delay: Distribution) -> Self {
        self.class_delays.push((class, delay));
        self
    }
}

impl fmt::Debug for StationSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StationSpec")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .field("delay", &self.delay)
            .field("hold_outputs", &self.hold_outputs)
            .field("recover_when_idle", &self.recover_when_idle)
            .field("transform", &self.transform.is_some())
            .field("class_delays", &self.class_delays)
            .finish()
    }
}

#[derive(Debug)]
enum Pending {
    Source(SourceSpec),
    Gate(GateSpec),
    Buffer(BufferSpec),
    Station(StationSpec),
}

impl Pending {
    fn name(&self) -> &str {
        match self {
            Pending::Source(spec) => &spec.name,
            Pending::Gate(spec) => &spec.name,
            Pending::Buffer(spec) => &spec.name,
            Pending::Station(spec) => &spec.name,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Link {
    from: ElementId,
    to: ElementId,
    weight: f64,
}

/// Collects elements and wiring, then validates everything at once.
///
/// ```
/// use flowline_core::{BufferSpec, Distribution, NetworkBuilder, SourceSpec, StationSpec};
///
/// let mut builder = NetworkBuilder::new(7);
/// let arrivals = builder.add_source(SourceSpec::new("arrivals", Distribution::exponential_mean(0.5)));
/// let queue = builder.add_buffer(BufferSpec::new("queue", 1));
/// let server = builder.add_station(StationSpec::new("server", 1, Distribution::exponential_mean(0.3)));
/// builder.connect(arrivals, queue).connect(queue, server);
///
/// let network = builder.build().unwrap();
/// assert_eq!(network.len(), 3);
/// ```
#[derive(Debug)]
pub struct NetworkBuilder {
    seed: u64,
    pending: Vec<Pending>,
    links: Vec<Link>,
    modes: Vec<(ElementId, SelectionMode)>,
    inputs: Vec<(ElementId, ElementId, f64)>,
    schedules: Vec<(ElementId, SimTime)>,
    preloads: Vec<(ElementId, usize)>,
    seeded_tasks: Vec<(ElementId, usize)>,
}

impl NetworkBuilder {
    /// Empty builder; `seed` drives every random draw of the built network.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            pending: Vec::new(),
            links: Vec::new(),
            modes: Vec::new(),
            inputs: Vec::new(),
            schedules: Vec::new(),
            preloads: Vec::new(),
            seeded_tasks: Vec::new(),
        }
    }

    fn push(&mut self, pending: Pending) -> ElementId {
        self.pending.push(pending);
        ElementId::new(self.pending.len() - 1)
    }

    pub fn add_source(&mut self, spec: SourceSpec) -> ElementId {
        self.push(Pending::Source(spec))
    }

    pub fn add_gate(&mut self, spec: GateSpec) -> ElementId {
        self.push(Pending::Gate(spec))
    }

    pub fn add_buffer(&mut self, spec: BufferSpec) -> ElementId {
        self.push(Pending::Buffer(spec))
    }

    pub fn add_station(&mut self, spec: StationSpec) -> ElementId {
        self.push(Pending::Station(spec))
    }

    /// Adds `to` as a successor candidate of `from` with weight 1.
    pub fn connect(&mut self, from: ElementId, to: ElementId) -> &mut Self {
        self.connect_weighted(from, to, 1.0)
    }

    /// Adds `to` as a successor candidate of `from`. The weight is a
    /// priority or a probability depending on the selection mode.
    pub fn connect_weighted(&mut self, from: ElementId, to: ElementId, weight: f64) -> &mut Self {
        self.links.push(Link { from, to, weight });
        self
    }

    pub fn set_selection_mode(&mut self, id: ElementId, mode: SelectionMode) -> &mut Self {
        self.modes.push((id, mode));
        self
    }

    /// Registers `buffer` as an input of `target` in addition to the
    /// registrations derived from the wiring.
    pub fn add_input_buffer(
        &mut self,
        target: ElementId,
        buffer: ElementId,
        priority: f64,
    ) -> &mut Self {
        self.inputs.push((target, buffer, priority));
        self
    }

    /// Initial self-event time of a source or station.
    pub fn schedule_at(&mut self, id: ElementId, time: SimTime) -> &mut Self {
        self.schedules.push((id, time));
        self
    }

    /// Stores `count` fresh entities in a buffer before the first tick.
    pub fn preload(&mut self, buffer: ElementId, count: usize) -> &mut Self {
        self.preloads.push((buffer, count));
        self
    }

    /// Starts `count` tasks on a station before the first tick.
    pub fn seed_tasks(&mut self, station: ElementId, count: usize) -> &mut Self {
        self.seeded_tasks.push((station, count));
        self
    }

    /// Validates the declarations and wires the network.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownElement` - Wiring refers to an id this builder never issued
    /// - `ConfigError::ZeroWorkers` / `ZeroCapacity` - Degenerate station or buffer
    /// - `ConfigError::InvalidParameter` - Distribution parameters out of range
    /// - `ConfigError::GateFanOut` / `GateCycle` - Gate without a single resolvable target
    /// - `ConfigError::SourceAsSuccessor` - A source is wired as a successor
    /// - `ConfigError::InvalidWeight` / `InvalidScheduleTime` - Non-finite or negative values
    /// - `ConfigError::ZeroArrivalDelay` - Source delay that mostly samples zero
    /// - `ConfigError::WrongElementKind` / `NotSchedulable` - Operation on the wrong element kind
    /// - `ConfigError::SeedExceedsCapacity` - Initial entities do not fit
    pub fn build(self) -> Result<Network, ConfigError> {
        let len = self.pending.len();
        let check = |id: ElementId| {
            if id.index() < len {
                Ok(id)
            } else {
                Err(ConfigError::UnknownElement { id: id.index() })
            }
        };

        let mut nodes = Vec::with_capacity(len);
        for pending in self.pending {
            nodes.push(build_node(pending)?);
        }

        for link in &self.links {
            let (from, to) = (check(link.from)?, check(link.to)?);
            if let NodeKind::Source(_) = nodes[to.index()].kind {
                return Err(ConfigError::SourceAsSuccessor {
                    from: nodes[from.index()].base.name.clone(),
                    source_name: nodes[to.index()].base.name.clone(),
                });
            }
            nodes[from.index()].base.successors.push(to, link.weight);
        }

        for &(id, mode) in &self.modes {
            nodes[check(id)?.index()].base.successors.set_mode(mode);
        }
        for node in &nodes {
            let successors = &node.base.successors;
            let chance = successors.mode() == SelectionMode::Chance;
            for successor in successors.entries() {
                let weight = successor.weight;
                if weight.is_nan() || (chance && (!weight.is_finite() || weight < 0.0)) {
                    return Err(ConfigError::InvalidWeight {
                        from: node.base.name.clone(),
                        weight,
                    });
                }
            }
        }

        for node in &nodes {
            if let NodeKind::Gate(_) = node.kind {
                let count = node.base.successors.len();
                if count != 1 {
                    return Err(ConfigError::GateFanOut {
                        gate: node.base.name.clone(),
                        count,
                    });
                }
            }
        }
        for index in 0..nodes.len() {
            if let NodeKind::Gate(_) = nodes[index].kind {
                resolve_target(&nodes, ElementId::new(index))?;
            }
        }

        register_inputs(&mut nodes)?;
        for &(target, buffer, priority) in &self.inputs {
            let (target, buffer) = (check(target)?, check(buffer)?);
            expect_kind(&nodes[buffer.index()], ElementKind::Buffer)?;
            if !matches!(
                nodes[target.index()].kind,
                NodeKind::Station(_) | NodeKind::Buffer(_)
            ) {
                expect_kind(&nodes[target.index()], ElementKind::Station)?;
            }
            let inputs = &mut nodes[target.index()].base.inputs;
            if !inputs.iter().any(|input| input.buffer == buffer) {
                inputs.push(InputBuffer { buffer, priority });
            }
        }

        let mut network = Network::new(nodes, RandomSource::from_seed(self.seed));

        for &(buffer, count) in &self.preloads {
            let buffer = check(buffer)?;
            let node = &network.nodes[buffer.index()];
            expect_kind(node, ElementKind::Buffer)?;
            let room = network
                .buffer(buffer)
                .map_or(0, |state| state.capacity() - state.len());
            if count > room {
                return Err(ConfigError::SeedExceedsCapacity {
                    element: node.base.name.clone(),
                    requested: count,
                    capacity: room,
                });
            }
            for _ in 0..count {
                let entity = network.create_entity(buffer, 0);
                let _ = network.push_back(buffer, entity);
            }
        }

        for &(station, count) in &self.seeded_tasks {
            let station = check(station)?;
            let node = &network.nodes[station.index()];
            expect_kind(node, ElementKind::Station)?;
            let room = network.station(station).map_or(0, |state| {
                state.workers().saturating_sub(state.occupancy())
            });
            if count > room {
                return Err(ConfigError::SeedExceedsCapacity {
                    element: node.base.name.clone(),
                    requested: count,
                    capacity: room,
                });
            }
            for _ in 0..count {
                let entity = network.create_entity(station, 0);
                network.start_task(station, entity);
            }
        }

        for &(id, time) in &self.schedules {
            let id = check(id)?;
            let name = network.name(id).to_string();
            if !time.is_finite() || time < 0.0 {
                return Err(ConfigError::InvalidScheduleTime {
                    element: name,
                    time,
                });
            }
            if !network.schedule_self_at(id, time) {
                return Err(ConfigError::NotSchedulable { element: name });
            }
        }

        debug!(
            "Built network with {} elements, seed {}",
            network.len(),
            self.seed
        );
        Ok(network)
    }
}

fn build_node(pending: Pending) -> Result<Node, ConfigError> {
    let name = pending.name().to_string();
    let node = match pending {
        Pending::Source(spec) => {
            let delay = Delay::new(spec.delay)?;
            if spec.delay.mostly_zero() {
                return Err(ConfigError::ZeroArrivalDelay {
                    source_name: name,
                    distribution: spec.delay.to_string(),
                });
            }
            if !spec.first_arrival.is_finite() || spec.first_arrival < 0.0 {
                return Err(ConfigError::InvalidScheduleTime {
                    element: name,
                    time: spec.first_arrival,
                });
            }
            let mut base = ElementBase::new(name, Some(delay));
            base.next_event = Some(spec.first_arrival);
            Node {
                base,
                kind: NodeKind::Source(Source::new(spec.class)),
            }
        }
        Pending::Gate(spec) => Node {
            base: ElementBase::new(name, None),
            kind: NodeKind::Gate(Gate::new(spec.guard)),
        },
        Pending::Buffer(spec) => {
            let capacity = match spec.capacity {
                Some(0) => return Err(ConfigError::ZeroCapacity { buffer: name }),
                Some(capacity) => capacity,
                None => usize::MAX,
            };
            Node {
                base: ElementBase::new(name, None),
                kind: NodeKind::Buffer(Buffer::new(capacity, spec.priority, spec.policy)),
            }
        }
        Pending::Station(spec) => {
            let workers = match spec.workers {
                Some(0) => return Err(ConfigError::ZeroWorkers { station: name }),
                Some(workers) => workers,
                None => usize::MAX,
            };
            let delay = Delay::new(spec.delay)?;
            let class_delays = spec
                .class_delays
                .into_iter()
                .map(|(class, distribution)| Ok((class, Delay::new(distribution)?)))
                .collect::<Result<Vec<_>, ConfigError>>()?;
            Node {
                base: ElementBase::new(name, Some(delay)),
                kind: NodeKind::Station(Station::new(
                    workers,
                    spec.hold_outputs,
                    spec.recover_when_idle,
                    spec.transform,
                    class_delays,
                )),
            }
        }
    };
    Ok(node)
}

fn expect_kind(node: &Node, expected: ElementKind) -> Result<(), ConfigError> {
    let actual = node.kind.kind();
    if actual == expected {
        Ok(())
    } else {
        Err(ConfigError::WrongElementKind {
            element: node.base.name.clone(),
            expected: expected.as_str(),
            actual: actual.as_str(),
        })
    }
}

/// Follows gate chains to the element that actually receives entities.
fn resolve_target(nodes: &[Node], start: ElementId) -> Result<ElementId, ConfigError> {
    let mut current = start;
    for _ in 0..=nodes.len() {
        let node = &nodes[current.index()];
        let NodeKind::Gate(_) = node.kind else {
            return Ok(current);
        };
        match node.base.successors.entries().first() {
            Some(successor) => current = successor.target,
            None => return Ok(current),
        }
    }
    Err(ConfigError::GateCycle {
        gate: nodes[start.index()].base.name.clone(),
    })
}

/// Registers every buffer on the stations and buffers it feeds, looking
/// through gates, in buffer index order.
fn register_inputs(nodes: &mut [Node]) -> Result<(), ConfigError> {
    for index in 0..nodes.len() {
        let NodeKind::Buffer(buffer) = &nodes[index].kind else {
            continue;
        };
        let priority = buffer.priority();
        let buffer_id = ElementId::new(index);
        let targets: Vec<ElementId> = nodes[index]
            .base
            .successors
            .entries()
            .iter()
            .map(|successor| resolve_target(nodes, successor.target))
            .collect::<Result<_, _>>()?;

        for target in targets {
            if target == buffer_id
                || !matches!(
                    nodes[target.index()].kind,
                    NodeKind::Station(_) | NodeKind::Buffer(_)
                )
            {
                continue;
            }
            let inputs = &mut nodes[target.index()].base.inputs;
            if !inputs.iter().any(|input| input.buffer == buffer_id) {
                inputs.push(InputBuffer {
                    buffer: buffer_id,
                    priority,
                });
            }
        }
    }
    Ok(())
}
