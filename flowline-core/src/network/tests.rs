use super::*;
use crate::delay::Distribution;

fn constant(value: f64) -> Distribution {
    Distribution::constant(value)
}

fn fire(network: &mut Network, id: ElementId) {
    let time = network.next_event_time(id).unwrap();
    network.advance_clock(time);
    network.on_self_event(id);
}

fn entity(network: &mut Network, origin: ElementId) -> Entity {
    network.create_entity(origin, 0)
}

#[test]
fn test_buffer_overflow_counts_and_discards() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 2));
    let mut network = builder.build().unwrap();

    for _ in 0..3 {
        let e = entity(&mut network, buffer);
        network.admit(buffer, e);
    }

    let state = network.buffer(buffer).unwrap();
    assert_eq!(state.len(), 2);
    assert_eq!(state.overflows(), 1);
}

#[test]
fn test_buffer_forwards_to_free_station() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 5));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder.connect(buffer, station);
    let mut network = builder.build().unwrap();

    let first = entity(&mut network, buffer);
    assert!(network.admit(buffer, first));
    assert_eq!(network.station(station).unwrap().active(), 1);
    assert_eq!(network.buffer_len(buffer), 0);
    assert_eq!(network.next_event_time(station), Some(1.0));

    let second = entity(&mut network, buffer);
    assert!(network.admit(buffer, second));
    assert_eq!(network.buffer_len(buffer), 1);
    assert_eq!(network.station(station).unwrap().failures(), 0);
}

#[test]
fn test_station_rejects_when_all_workers_busy() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 2, constant(1.0)));
    let mut network = builder.build().unwrap();

    for _ in 0..3 {
        let e = entity(&mut network, station);
        network.admit(station, e);
    }

    let state = network.station(station).unwrap();
    assert_eq!(state.active(), 2);
    assert_eq!(state.failures(), 1);
    assert_eq!(network.processed(station), 1);
}

#[test]
fn test_completion_refills_from_input_buffer() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 5));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder.connect(buffer, station);
    let mut network = builder.build().unwrap();

    for _ in 0..3 {
        let e = entity(&mut network, buffer);
        network.admit(buffer, e);
    }
    assert_eq!(network.buffer_len(buffer), 2);

    fire(&mut network, station);

    assert_eq!(network.completed(station), 1);
    assert_eq!(network.station(station).unwrap().active(), 1);
    assert_eq!(network.buffer_len(buffer), 1);
    assert_eq!(network.completed(buffer), 1);
    assert_eq!(network.next_event_time(station), Some(2.0));
}

#[test]
fn test_idle_station_is_unscheduled() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);

    assert_eq!(network.next_event_time(station), None);
    assert_eq!(network.occupancy(station), 0);
}

#[test]
fn test_wake_up_without_tasks_only_refills() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 3));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder
        .connect(buffer, station)
        .preload(buffer, 2)
        .schedule_at(station, 0.5);
    let mut network = builder.build().unwrap();

    fire(&mut network, station);

    assert_eq!(network.completed(station), 0);
    assert_eq!(network.station(station).unwrap().active(), 1);
    assert_eq!(network.buffer_len(buffer), 1);
    assert_eq!(network.next_event_time(station), Some(1.5));
}

#[test]
fn test_held_output_when_successor_is_blocked() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)).hold_outputs());
    let gate = builder.add_gate(GateSpec::new("closed").guard(|_, _| true));
    let sink = builder.add_station(StationSpec::unbounded("sink", constant(1.0)));
    builder.connect(station, gate).connect(gate, sink);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);

    let state = network.station(station).unwrap();
    assert_eq!(state.held_len(), 1);
    assert_eq!(state.active(), 0);
    assert!(!state.has_capacity());
    assert_eq!(network.completed(station), 0);

    let rejected = entity(&mut network, station);
    assert!(!network.admit(station, rejected));
    assert_eq!(network.station(station).unwrap().failures(), 1);
}

#[test]
fn test_held_output_when_successor_is_full() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("first", 1, constant(1.0)).hold_outputs());
    let next = builder.add_station(StationSpec::new("second", 1, constant(10.0)));
    builder.connect(station, next).seed_tasks(next, 1);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);

    assert_eq!(network.station(station).unwrap().held_len(), 1);
    assert_eq!(network.station(next).unwrap().failures(), 0);
}

#[test]
fn test_dead_end_without_hold_is_counted() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    let gate = builder.add_gate(GateSpec::new("closed").guard(|_, _| true));
    let sink = builder.add_station(StationSpec::unbounded("sink", constant(1.0)));
    builder.connect(station, gate).connect(gate, sink);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);

    let state = network.station(station).unwrap();
    assert_eq!(state.dropped(), 1);
    assert_eq!(state.held_len(), 0);
    assert_eq!(network.completed(station), 0);
}

#[test]
fn test_forward_to_full_successor_without_hold() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("first", 1, constant(1.0)));
    let next = builder.add_station(StationSpec::new("second", 1, constant(10.0)));
    builder.connect(station, next).seed_tasks(next, 1);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);

    assert_eq!(network.completed(station), 1);
    assert_eq!(network.station(next).unwrap().failures(), 1);
}

#[test]
fn test_drain_held_once_successor_frees_up() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 3));
    let station = builder.add_station(StationSpec::new("first", 1, constant(1.0)).hold_outputs());
    let next = builder.add_station(StationSpec::new("second", 1, constant(2.0)));
    builder
        .connect(buffer, station)
        .connect(station, next)
        .seed_tasks(next, 1)
        .preload(buffer, 1);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, station);
    network.admit(station, e);
    fire(&mut network, station);
    assert_eq!(network.station(station).unwrap().held_len(), 1);
    assert_eq!(network.buffer_len(buffer), 1);
    assert!(!network.drain_held(station));

    fire(&mut network, next);
    assert!(network.drain_held(station));

    let state = network.station(station).unwrap();
    assert_eq!(state.held_len(), 0);
    assert_eq!(state.active(), 1);
    assert_eq!(network.buffer_len(buffer), 0);
    assert_eq!(network.completed(station), 1);
    assert_eq!(network.station(next).unwrap().active(), 1);
}

#[test]
fn test_recover_if_idle_admits_waiting_work() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 3));
    let station =
        builder.add_station(StationSpec::new("server", 1, constant(1.0)).recover_when_idle());
    builder.connect(buffer, station).preload(buffer, 2);
    let mut network = builder.build().unwrap();

    assert_eq!(network.next_event_time(station), None);
    assert!(network.recover_if_idle(station));
    assert_eq!(network.station(station).unwrap().active(), 1);
    assert_eq!(network.buffer_len(buffer), 1);

    assert!(!network.recover_if_idle(station));
}

#[test]
fn test_priority_input_prefers_higher_priority() {
    let mut builder = NetworkBuilder::new(1);
    let low = builder.add_buffer(BufferSpec::new("low", 5));
    let high = builder.add_buffer(BufferSpec::new("high", 5).priority(10.0));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder
        .connect(low, station)
        .connect(high, station)
        .preload(low, 3)
        .preload(high, 1);
    let network = builder.build().unwrap();

    assert_eq!(network.priority_input(station), Some(high));
}

#[test]
fn test_priority_input_ties_go_to_longer_then_first() {
    let mut builder = NetworkBuilder::new(1);
    let first = builder.add_buffer(BufferSpec::new("first", 5));
    let second = builder.add_buffer(BufferSpec::new("second", 5));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder
        .connect(first, station)
        .connect(second, station)
        .preload(first, 1)
        .preload(second, 2);
    let mut network = builder.build().unwrap();

    assert_eq!(network.priority_input(station), Some(second));

    let e = entity(&mut network, first);
    network.push_back(first, e).unwrap();
    assert_eq!(network.priority_input(station), Some(first));
}

#[test]
fn test_priority_input_skips_blocked_buffers() {
    let mut builder = NetworkBuilder::new(1);
    let blocked = builder.add_buffer(BufferSpec::new("blocked", 5).priority(10.0));
    let open = builder.add_buffer(BufferSpec::new("open", 5));
    let gate = builder.add_gate(GateSpec::new("closed").guard(|_, _| true));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder
        .connect(blocked, gate)
        .connect(gate, station)
        .connect(open, station)
        .preload(blocked, 1)
        .preload(open, 1);
    let network = builder.build().unwrap();

    assert_eq!(
        network.base(station).unwrap().inputs()[0].buffer,
        blocked,
        "gate chains register the buffer on the station behind them"
    );
    assert_eq!(network.priority_input(station), Some(open));
}

#[test]
fn test_choose_successor_skips_blocking_gates() {
    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let closed = builder.add_gate(GateSpec::new("closed").guard(|_, _| true));
    let open = builder.add_gate(GateSpec::new("open"));
    let left = builder.add_buffer(BufferSpec::new("left", 5));
    let right = builder.add_buffer(BufferSpec::new("right", 5));
    builder
        .connect(source, closed)
        .connect(source, open)
        .connect(closed, left)
        .connect(open, right);
    let mut network = builder.build().unwrap();

    for _ in 0..50 {
        assert_eq!(network.choose_successor(source, None), Some(open));
    }
}

#[test]
fn test_guard_sees_network_state() {
    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let buffer = builder.add_buffer(BufferSpec::new("queue", 5));
    let gate = builder.add_gate(GateSpec::new("full").guard(move |view, _| view.buffer_len(buffer) >= 2));
    builder.connect(source, gate).connect(gate, buffer);
    let mut network = builder.build().unwrap();

    for _ in 0..2 {
        fire(&mut network, source);
    }
    assert_eq!(network.buffer_len(buffer), 2);

    fire(&mut network, source);
    assert_eq!(network.buffer_len(buffer), 2);
    assert_eq!(network.source(source).unwrap().unrouted(), 1);
    assert_eq!(network.completed(source), 3);
}

#[test]
fn test_extract_refills_from_upstream_buffer() {
    let mut builder = NetworkBuilder::new(1);
    let upstream = builder.add_buffer(BufferSpec::new("upstream", 5));
    let downstream = builder.add_buffer(BufferSpec::new("downstream", 2));
    builder
        .connect(upstream, downstream)
        .preload(upstream, 3)
        .preload(downstream, 2);
    let mut network = builder.build().unwrap();

    assert!(network.extract(downstream).is_some());

    assert_eq!(network.buffer_len(downstream), 2);
    assert_eq!(network.buffer_len(upstream), 2);
    assert_eq!(network.completed(downstream), 1);
    assert_eq!(network.completed(upstream), 1);
}

#[test]
fn test_extraction_policies() {
    let mut builder = NetworkBuilder::new(1);
    let fifo = builder.add_buffer(BufferSpec::new("fifo", 3));
    let lifo = builder.add_buffer(BufferSpec::new("lifo", 3).policy(ExtractionPolicy::Lifo));
    let custom = builder.add_buffer(
        BufferSpec::new("middle", 3).policy(ExtractionPolicy::Custom(|entities| {
            (entities.len() > 1).then_some(1)
        })),
    );
    builder.preload(fifo, 3).preload(lifo, 3).preload(custom, 3);
    let mut network = builder.build().unwrap();

    let first_of = |network: &Network, id| network.buffer(id).unwrap().entities().next().unwrap().id;
    let last_of = |network: &Network, id| network.buffer(id).unwrap().entities().last().unwrap().id;
    let middle_of =
        |network: &Network, id| network.buffer(id).unwrap().entities().nth(1).unwrap().id;

    let expected = first_of(&network, fifo);
    assert_eq!(network.extract(fifo).unwrap().id, expected);
    let expected = last_of(&network, lifo);
    assert_eq!(network.extract(lifo).unwrap().id, expected);
    let expected = middle_of(&network, custom);
    assert_eq!(network.extract(custom).unwrap().id, expected);
}

#[test]
fn test_push_and_pop_respect_capacity() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 2));
    builder.preload(buffer, 1);
    let mut network = builder.build().unwrap();

    let front = entity(&mut network, buffer);
    let front_id = front.id;
    network.push_front(buffer, front).unwrap();
    let extra = entity(&mut network, buffer);
    assert!(network.push_back(buffer, extra).is_err());

    assert_eq!(network.pop_front(buffer).unwrap().id, front_id);
    assert!(network.pop_back(buffer).is_some());
    assert!(network.pop_back(buffer).is_none());
    assert_eq!(network.completed(buffer), 0);
}

#[test]
fn test_transform_and_class_delay() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(
        StationSpec::new("server", 2, constant(1.0))
            .class_delay(3, constant(5.0))
            .transform(|entity| entity.with_class(7)),
    );
    let out = builder.add_buffer(BufferSpec::unbounded("out"));
    builder.connect(station, out);
    let mut network = builder.build().unwrap();

    let regular = entity(&mut network, station);
    let special = network.create_entity(station, 3);
    network.admit(station, regular);
    network.admit(station, special);

    let ends: Vec<f64> = network
        .station(station)
        .unwrap()
        .tasks()
        .iter()
        .map(|task| task.end)
        .collect();
    assert_eq!(ends, vec![1.0, 5.0]);

    fire(&mut network, station);
    let classes: Vec<u32> = network
        .buffer(out)
        .unwrap()
        .entities()
        .map(|entity| entity.class)
        .collect();
    assert_eq!(classes, vec![7]);
}

#[test]
fn test_reset_statistics_keeps_contents() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder.preload(buffer, 1).seed_tasks(station, 1);
    let mut network = builder.build().unwrap();

    let e = entity(&mut network, buffer);
    network.admit(buffer, e);
    let e = entity(&mut network, station);
    network.admit(station, e);
    network.record_occupancy(buffer, 2.0);
    network.record_occupancy(station, 2.0);

    network.reset_statistics(buffer);
    network.reset_statistics(station);

    let queue = network.buffer(buffer).unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.overflows(), 0);
    assert_eq!(queue.integrated_length(), 0.0);
    let server = network.station(station).unwrap();
    assert_eq!(server.active(), 1);
    assert_eq!(server.failures(), 0);
    assert_eq!(server.busy_time(), 0.0);
}

#[test]
fn test_earliest_event_ties_go_to_first_element() {
    let mut builder = NetworkBuilder::new(1);
    let first = builder.add_station(StationSpec::new("first", 1, constant(1.0)));
    let second = builder.add_station(StationSpec::new("second", 1, constant(1.0)));
    builder.schedule_at(second, 2.0).schedule_at(first, 2.0);
    let network = builder.build().unwrap();

    assert_eq!(network.earliest_event(), Some((first, 2.0)));
}

#[test]
fn test_schedule_overrides_seeded_tasks() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 2, constant(4.0)));
    builder.seed_tasks(station, 2).schedule_at(station, 1.0);
    let network = builder.build().unwrap();

    assert_eq!(network.next_event_time(station), Some(1.0));
    assert_eq!(network.station(station).unwrap().active(), 2);
}

#[test]
fn test_build_rejects_degenerate_elements() {
    let mut builder = NetworkBuilder::new(1);
    builder.add_station(StationSpec::new("idle", 0, constant(1.0)));
    assert!(matches!(builder.build(), Err(ConfigError::ZeroWorkers { .. })));

    let mut builder = NetworkBuilder::new(1);
    builder.add_buffer(BufferSpec::new("none", 0));
    assert!(matches!(builder.build(), Err(ConfigError::ZeroCapacity { .. })));

    let mut builder = NetworkBuilder::new(1);
    builder.add_station(StationSpec::new(
        "bad",
        1,
        Distribution::Exponential { lambda: -1.0 },
    ));
    assert!(matches!(
        builder.build(),
        Err(ConfigError::InvalidParameter { .. })
    ));
}

#[test]
fn test_build_rejects_bad_wiring() {
    let mut builder = NetworkBuilder::new(1);
    builder.add_gate(GateSpec::new("dangling"));
    assert!(matches!(
        builder.build(),
        Err(ConfigError::GateFanOut { count: 0, .. })
    ));

    let mut builder = NetworkBuilder::new(1);
    let first = builder.add_gate(GateSpec::new("first"));
    let second = builder.add_gate(GateSpec::new("second"));
    builder.connect(first, second).connect(second, first);
    assert!(matches!(builder.build(), Err(ConfigError::GateCycle { .. })));

    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    builder.connect(buffer, source);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::SourceAsSuccessor { .. })
    ));

    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    builder.connect(buffer, ElementId::new(9));
    assert_eq!(
        builder.build().unwrap_err(),
        ConfigError::UnknownElement { id: 9 }
    );

    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    builder
        .connect_weighted(source, buffer, f64::INFINITY)
        .set_selection_mode(source, SelectionMode::Chance);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::InvalidWeight { .. })
    ));
}

#[test]
fn test_weight_checks_follow_selection_mode() {
    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let low = builder.add_buffer(BufferSpec::new("low", 1));
    let high = builder.add_buffer(BufferSpec::new("high", 1));
    builder
        .connect_weighted(source, low, -2.0)
        .connect_weighted(source, high, -1.0)
        .set_selection_mode(source, SelectionMode::Priority);
    let mut network = builder.build().unwrap();
    assert_eq!(network.choose_successor(source, None), Some(high));

    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    builder
        .connect_weighted(source, buffer, -0.5)
        .set_selection_mode(source, SelectionMode::Chance);
    assert_eq!(
        builder.build().unwrap_err(),
        ConfigError::InvalidWeight {
            from: "arrivals".to_string(),
            weight: -0.5,
        }
    );

    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let buffer = builder.add_buffer(BufferSpec::new("queue", 1));
    builder.connect_weighted(source, buffer, f64::NAN);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::InvalidWeight { .. })
    ));
}

#[test]
fn test_build_rejects_zero_arrival_delay() {
    for delay in [
        constant(0.0),
        Distribution::Normal {
            mean: -1.0,
            std: 1.0,
        },
    ] {
        let mut builder = NetworkBuilder::new(1);
        builder.add_source(SourceSpec::new("arrivals", delay));
        assert!(matches!(
            builder.build(),
            Err(ConfigError::ZeroArrivalDelay { .. })
        ));
    }

    let mut builder = NetworkBuilder::new(1);
    builder.add_source(SourceSpec::new(
        "arrivals",
        Distribution::Uniform {
            range_start: 0.0,
            range_end: 0.5,
        },
    ));
    assert!(builder.build().is_ok());
}

#[test]
fn test_sample_delay_override_and_missing() {
    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    let gate = builder.add_gate(GateSpec::new("gate"));
    builder.connect(gate, station);
    let mut network = builder.build().unwrap();

    let slow = Delay::new(constant(2.0)).unwrap();
    assert_eq!(network.sample_delay(station, Some(&slow)), Ok(2.0));
    assert_eq!(network.sample_delay(station, None), Ok(1.0));
    assert_eq!(network.sample_delay(gate, Some(&slow)), Ok(2.0));
    assert_eq!(
        network.sample_delay(gate, None),
        Err(ConfigError::MissingDistribution {
            element: "gate".to_string(),
        })
    );
    assert_eq!(
        network.sample_delay(ElementId::new(7), None),
        Err(ConfigError::UnknownElement { id: 7 })
    );
}

#[test]
fn test_source_without_delay_stops_arriving() {
    let mut builder = NetworkBuilder::new(1);
    let source = builder.add_source(SourceSpec::new("arrivals", constant(1.0)));
    let buffer = builder.add_buffer(BufferSpec::new("queue", 5));
    builder.connect(source, buffer);
    let mut network = builder.build().unwrap();
    network.nodes[source.index()].base.delay = None;

    fire(&mut network, source);

    assert_eq!(network.completed(source), 1);
    assert_eq!(network.buffer_len(buffer), 1);
    assert_eq!(network.next_event_time(source), None);
    assert_eq!(network.earliest_event(), None);
}

#[test]
fn test_build_rejects_bad_seeding() {
    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 2));
    builder.schedule_at(buffer, 1.0);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::NotSchedulable { .. })
    ));

    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder.schedule_at(station, -1.0);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::InvalidScheduleTime { .. })
    ));

    let mut builder = NetworkBuilder::new(1);
    let buffer = builder.add_buffer(BufferSpec::new("queue", 2));
    builder.preload(buffer, 3);
    assert_eq!(
        builder.build().unwrap_err(),
        ConfigError::SeedExceedsCapacity {
            element: "queue".to_string(),
            requested: 3,
            capacity: 2,
        }
    );

    let mut builder = NetworkBuilder::new(1);
    let station = builder.add_station(StationSpec::new("server", 1, constant(1.0)));
    builder.preload(station, 1);
    assert!(matches!(
        builder.build(),
        Err(ConfigError::WrongElementKind {
            expected: "buffer",
            actual: "station",
            ..
        })
    ));
}
