//! Multi-worker service station.
//!
//! A station with `W` workers holds at most `W` entities at once, counting
//! both in-service tasks and completed outputs it is holding back because
//! the downstream element cannot take them yet. Admission beyond that is a
//! counted failure.
//!
//! On each completion the station first dispatches the finished entity
//! (forward, hold or drop) and only then refills one worker from its
//! highest-priority input buffer, so the held output always occupies the
//! slot its task just freed.

use std::collections::VecDeque;
use std::fmt;

use tracing::{trace, warn};

use super::{ElementId, InputBuffer, Network, Node, NodeKind};
use crate::SimTime;
use crate::delay::Delay;
use crate::entity::Entity;

/// One in-service entity.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerTask {
    pub entity: Entity,
    pub start: SimTime,
    pub end: SimTime,
}

/// Pre-output transform applied to every completed entity.
pub type Transform = Box<dyn Fn(Entity) -> Entity>;

/// Station state.
pub struct Station {
    workers: usize,
    tasks: Vec<WorkerTask>,
    held: VecDeque<Entity>,
    hold_outputs: bool,
    recover_when_idle: bool,
    transform: Option<Transform>,
    class_delays: Vec<(u32, Delay)>,
    failures: u64,
    dropped: u64,
    busy_time: SimTime,
}

impl Station {
    pub(crate) fn new(
        workers: usize,
        hold_outputs: bool,
        recover_when_idle: bool,
        transform: Option<Transform>,
        class_delays: Vec<(u32, Delay)>,
    ) -> Self {
        Self {
            workers,
            tasks: Vec::new(),
            held: VecDeque::new(),
            hold_outputs,
            recover_when_idle,
            transform,
            class_delays,
            failures: 0,
            dropped: 0,
            busy_time: 0.0,
        }
    }

    /// Worker count, `usize::MAX` when unbounded.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// In-service tasks.
    pub fn tasks(&self) -> &[WorkerTask] {
        &self.tasks
    }

    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    /// Completed entities waiting for a downstream slot.
    pub fn held(&self) -> impl Iterator<Item = &Entity> {
        self.held.iter()
    }

    pub fn held_len(&self) -> usize {
        self.held.len()
    }

    /// Active tasks plus held outputs.
    pub fn occupancy(&self) -> usize {
        self.tasks.len() + self.held.len()
    }

    /// Returns true if one more entity can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.occupancy() < self.workers
    }

    pub fn hold_outputs(&self) -> bool {
        self.hold_outputs
    }

    pub fn recover_when_idle(&self) -> bool {
        self.recover_when_idle
    }

    /// Entities rejected because every worker was occupied.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Completed entities discarded because no successor could be chosen
    /// and outputs are not held.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Time with at least one occupied worker.
    pub fn busy_time(&self) -> SimTime {
        self.busy_time
    }

    /// Busy time as a share of `window`.
    pub fn utilization(&self, window: SimTime) -> f64 {
        if window > 0.0 {
            self.busy_time / window
        } else {
            0.0
        }
    }

    /// Earliest task end time.
    pub fn earliest_end(&self) -> Option<SimTime> {
        self.tasks.iter().map(|task| task.end).reduce(f64::min)
    }

    fn delay_for(&self, class: u32) -> Option<&Delay> {
        self.class_delays
            .iter()
            .find(|(tagged, _)| *tagged == class)
            .map(|(_, delay)| delay)
    }

    pub(crate) fn record(&mut self, elapsed: SimTime) {
        if self.occupancy() > 0 {
            self.busy_time += elapsed;
        }
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.failures = 0;
        self.dropped = 0;
        self.busy_time = 0.0;
    }
}

impl fmt::Debug for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Station")
            .field("workers", &self.workers)
            .field("tasks", &self.tasks)
            .field("held", &self.held)
            .field("hold_outputs", &self.hold_outputs)
            .field("recover_when_idle", &self.recover_when_idle)
            .field("transform", &self.transform.is_some())
            .field("failures", &self.failures)
            .field("dropped", &self.dropped)
            .field("busy_time", &self.busy_time)
            .finish()
    }
}

impl Network {
    fn station_mut(&mut self, id: ElementId) -> Option<&mut Station> {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.kind) {
            Some(NodeKind::Station(station)) => Some(station),
            _ => None,
        }
    }

    /// Completions plus admission failures.
    pub fn processed(&self, id: ElementId) -> u64 {
        self.station(id)
            .map_or(0, |station| self.completed(id) + station.failures)
    }

    pub(super) fn admit_to_station(&mut self, id: ElementId, entity: Entity) -> bool {
        let Some(station) = self.station_mut(id) else {
            return false;
        };
        if !station.has_capacity() {
            station.failures += 1;
            trace!("{} busy, {} lost", self.name(id), entity.id);
            return false;
        }
        self.start_task(id, entity);
        true
    }

    /// Puts `entity` into service and moves the station's next event to
    /// the earliest task end.
    pub(super) fn start_task(&mut self, id: ElementId, entity: Entity) {
        let start = self.clock;
        let end = start + self.service_delay(id, &entity);
        trace!("{} starts {} until {:.4}", self.name(id), entity.id, end);

        let Some(Node { base, kind }) = self.nodes.get_mut(id.index()) else {
            return;
        };
        let NodeKind::Station(station) = kind else {
            return;
        };
        station.tasks.push(WorkerTask { entity, start, end });
        base.next_event = station.earliest_end();
    }

    fn service_delay(&mut self, id: ElementId, entity: &Entity) -> SimTime {
        let Some(node) = self.nodes.get(id.index()) else {
            return 0.0;
        };
        let NodeKind::Station(station) = &node.kind else {
            return 0.0;
        };
        match station.delay_for(entity.class).or(node.base.delay.as_ref()) {
            Some(delay) => delay.sample(&mut self.rng),
            None => {
                warn!("{} has no service delay, serving instantly", node.base.name);
                0.0
            }
        }
    }

    /// Highest-priority non-empty input buffer whose own path onward is
    /// open. Ties go to the longer buffer, then to the first registered.
    pub fn priority_input(&self, id: ElementId) -> Option<ElementId> {
        let base = self.base(id)?;
        let mut best: Option<(InputBuffer, usize)> = None;
        for input in base.inputs() {
            let len = self.buffer_len(input.buffer);
            if len == 0 || !self.has_open_path(input.buffer) {
                continue;
            }
            let better = match best {
                None => true,
                Some((current, current_len)) => {
                    input.priority > current.priority
                        || (input.priority == current.priority && len > current_len)
                }
            };
            if better {
                best = Some((*input, len));
            }
        }
        best.map(|(input, _)| input.buffer)
    }

    /// Starts one task from the priority input buffer if a worker is free.
    fn pull_from_inputs(&mut self, id: ElementId) -> bool {
        if !self.station(id).is_some_and(Station::has_capacity) {
            return false;
        }
        let Some(input) = self.priority_input(id) else {
            return false;
        };
        let Some(entity) = self.extract(input) else {
            return false;
        };
        self.start_task(id, entity);
        true
    }

    /// Finishes the first task due at the current clock, dispatches its
    /// output and refills the freed worker.
    pub(super) fn complete_task(&mut self, id: ElementId) {
        let clock = self.clock;
        let Some(Node { base, kind }) = self.nodes.get_mut(id.index()) else {
            return;
        };
        let NodeKind::Station(station) = kind else {
            return;
        };

        let finished = station
            .tasks
            .iter()
            .position(|task| task.end <= clock)
            .map(|index| station.tasks.remove(index));
        base.next_event = station.earliest_end();

        if let Some(task) = finished {
            let output = match &station.transform {
                Some(transform) => transform(task.entity),
                None => task.entity,
            };
            self.dispatch_output(id, output);
        }

        self.pull_from_inputs(id);
    }

    fn dispatch_output(&mut self, id: ElementId, entity: Entity) {
        let Some(base) = self.base(id) else {
            return;
        };
        if base.successors.is_empty() {
            if let Some(base) = self.base_mut(id) {
                base.completed += 1;
            }
            trace!("{} finished {} at sink", self.name(id), entity.id);
            return;
        }

        let hold = self.station(id).is_some_and(Station::hold_outputs);
        match self.choose_successor(id, Some(&entity)) {
            Some(target) if !hold || self.can_accept(target) => {
                if let Some(base) = self.base_mut(id) {
                    base.completed += 1;
                }
                trace!("{} sends {} to {}", self.name(id), entity.id, self.name(target));
                self.admit(target, entity);
            }
            Some(_) | None if hold => {
                trace!("{} holds {}", self.name(id), entity.id);
                if let Some(station) = self.station_mut(id) {
                    station.held.push_back(entity);
                }
            }
            _ => {
                trace!("{} has nowhere to send {}, dropped", self.name(id), entity.id);
                if let Some(station) = self.station_mut(id) {
                    station.dropped += 1;
                }
            }
        }
    }

    /// Forwards the oldest held output if its successor can take it now,
    /// then refills the freed worker. Returns true if an output left.
    pub fn drain_held(&mut self, id: ElementId) -> bool {
        let Some(head) = self
            .station(id)
            .and_then(|station| station.held.front())
            .cloned()
        else {
            return false;
        };
        let Some(target) = self
            .choose_successor(id, Some(&head))
            .filter(|&target| self.can_accept(target))
        else {
            return false;
        };

        let Some(entity) = self.station_mut(id).and_then(|station| station.held.pop_front()) else {
            return false;
        };
        if let Some(base) = self.base_mut(id) {
            base.completed += 1;
        }
        trace!("{} releases {} to {}", self.name(id), entity.id, self.name(target));
        self.admit(target, entity);
        self.pull_from_inputs(id);
        true
    }

    /// Admits from the priority input buffer when the station has nothing
    /// scheduled. Returns true if a task was started.
    pub fn recover_if_idle(&mut self, id: ElementId) -> bool {
        if self.station(id).is_none() || self.next_event_time(id).is_some() {
            return false;
        }
        let started = self.pull_from_inputs(id);
        if started {
            trace!("{} recovered from idle", self.name(id));
        }
        started
    }
}
