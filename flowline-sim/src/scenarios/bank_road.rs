//! Bank whose clients leave by car through a narrow exit onto a road.
//!
//! ```text
//! Cashier1 ─┐                                 Block4
//!           ├─► Block3 ─► Queue3 (prio 10) ──► (road busy?) ─► narrow exit
//! Cashier2 ─┘
//!
//! ROAD ─► crossing (unbounded)
//! ```
//!
//! Cashiers hold finished clients while the exit queue is full. Cars wait
//! in Queue3 for the road crossing to empty before taking the narrow exit.

use flowline_core::{
    BufferSpec, ConfigError, Distribution, ElementId, GateSpec, Network, NetworkBuilder, SimTime,
    SourceSpec, StationSpec,
};

use super::ScenarioConfig;
use super::bank::{BankLayout, declare_bank, schedule_cashiers};
use super::types::HeldOutputDrainer;

/// Capacity of the exit queue.
pub const EXIT_QUEUE_CAPACITY: usize = 3;
/// Input priority of the exit queue at the narrow exit.
pub const EXIT_QUEUE_PRIORITY: f64 = 10.0;
/// Mean time a car needs to pass the narrow exit.
pub const NARROW_EXIT_MEAN: SimTime = 0.2;
/// Mean time a road car occupies the crossing.
pub const CROSSING_MEAN: SimTime = 0.2;
/// Gap between road cars.
pub const ROAD_TRAFFIC: Distribution = Distribution::Uniform {
    range_start: 0.3,
    range_end: 0.5,
};
/// Probability that Cashier1 hands over its held client first.
pub const CASHIER1_FIRST_PROBABILITY: f64 = 0.7;

/// Element ids of the bank-plus-road network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankRoadLayout {
    /// The bank in front of the exit
    pub bank: BankLayout,
    /// Blocks while the exit queue is full
    pub exit_gate: ElementId,
    /// Cars waiting to leave
    pub exit_queue: ElementId,
    /// Blocks while a road car is on the crossing
    pub road_gate: ElementId,
    /// Single-lane exit onto the road
    pub narrow_exit: ElementId,
    /// Road traffic source
    pub road: ElementId,
    /// Unbounded crossing the road cars occupy
    pub crossing: ElementId,
}

impl BankRoadLayout {
    /// Hook that hands held clients from the cashiers to the exit.
    pub fn drainer(&self) -> HeldOutputDrainer {
        HeldOutputDrainer::new(self.bank.cashiers, CASHIER1_FIRST_PROBABILITY)
    }
}

/// Builds the bank-plus-road network.
///
/// # Errors
///
/// - `ConfigError` - Invalid delay override or wiring
pub fn build_bank_road(config: &ScenarioConfig) -> Result<(Network, BankRoadLayout), ConfigError> {
    let mut builder = NetworkBuilder::new(config.seed());
    let bank = declare_bank(&mut builder, config, true)?;

    let road = builder.add_source(SourceSpec::new("ROAD", ROAD_TRAFFIC));
    let crossing = builder.add_station(StationSpec::unbounded(
        "Crossing",
        Distribution::exponential_mean(CROSSING_MEAN),
    ));
    let exit_queue = builder.add_buffer(
        BufferSpec::new("Queue3", EXIT_QUEUE_CAPACITY).priority(EXIT_QUEUE_PRIORITY),
    );
    let exit_gate = builder.add_gate(
        GateSpec::new("Block3")
            .guard(move |view, _| view.buffer_len(exit_queue) >= EXIT_QUEUE_CAPACITY),
    );
    let road_gate = builder.add_gate(
        GateSpec::new("Block4").guard(move |view, _| view.occupancy(crossing) > 0),
    );
    let narrow_exit = builder.add_station(
        StationSpec::new(
            "Narrow exit",
            1,
            Distribution::exponential_mean(NARROW_EXIT_MEAN),
        )
        .recover_when_idle(),
    );

    let [cashier1, cashier2] = bank.cashiers;
    builder
        .connect(cashier1, exit_gate)
        .connect(cashier2, exit_gate)
        .connect(exit_gate, exit_queue)
        .connect(exit_queue, road_gate)
        .connect(road_gate, narrow_exit)
        .connect(road, crossing);

    let mut network = builder.build()?;
    schedule_cashiers(&mut network, &bank)?;

    Ok((
        network,
        BankRoadLayout {
            bank,
            exit_gate,
            exit_queue,
            road_gate,
            narrow_exit,
            road,
            crossing,
        },
    ))
}

#[cfg(test)]
mod tests {
    use flowline_core::{Model, RunConfig, TickAction};

    use super::*;

    #[test]
    fn test_bank_road_layout() {
        let (network, layout) = build_bank_road(&ScenarioConfig::default()).unwrap();

        assert_eq!(network.len(), 13);
        for cashier in layout.bank.cashiers {
            assert!(network.station(cashier).unwrap().hold_outputs());
        }
        assert!(network.station(layout.narrow_exit).unwrap().recover_when_idle());
        assert_eq!(network.station(layout.crossing).unwrap().workers(), usize::MAX);

        // The exit queue is registered on the narrow exit through Block4
        let inputs = network.base(layout.narrow_exit).unwrap().inputs();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].buffer, layout.exit_queue);
        assert_eq!(inputs[0].priority, EXIT_QUEUE_PRIORITY);
    }

    #[test]
    fn test_road_gate_follows_crossing() {
        let (mut network, layout) = build_bank_road(&ScenarioConfig::default()).unwrap();
        let client = network.create_entity(layout.bank.creator, 0);
        network.push_back(layout.exit_queue, client).unwrap();
        assert!(network.has_open_path(layout.exit_queue));
        assert_eq!(
            network.priority_input(layout.narrow_exit),
            Some(layout.exit_queue)
        );

        let car = network.create_entity(layout.road, 0);
        assert!(network.admit(layout.crossing, car));
        assert!(!network.has_open_path(layout.exit_queue));
        assert_eq!(network.priority_input(layout.narrow_exit), None);
    }

    #[test]
    fn test_cashiers_hold_while_exit_queue_full() {
        let config = ScenarioConfig::new(200.0, 0.0, 5);
        let (network, layout) = build_bank_road(&config).unwrap();
        let mut drainer = layout.drainer();
        let mut model = Model::new(network, RunConfig::new(200.0, 0.0).unwrap());

        {
            let mut actions: [&mut dyn TickAction; 1] = [&mut drainer];
            while model.step(&mut (), &mut actions).is_some() {
                let network = model.network();
                assert!(network.buffer_len(layout.exit_queue) <= EXIT_QUEUE_CAPACITY);
                for cashier in layout.bank.cashiers {
                    let station = network.station(cashier).unwrap();
                    assert!(station.occupancy() <= 1);
                    if station.held_len() > 0 {
                        // Held clients only wait on a full exit queue
                        assert_eq!(network.buffer_len(layout.exit_queue), EXIT_QUEUE_CAPACITY);
                    }
                }
            }
        }

        let network = model.network();
        assert!(network.completed(layout.narrow_exit) > 0);
        assert!(network.completed(layout.crossing) > 0);
        assert_eq!(network.station(layout.narrow_exit).unwrap().dropped(), 0);
    }
}
