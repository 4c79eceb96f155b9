//! Two-cashier bank.
//!
//! ```text
//!            ┌─► Block1 ─► Queue1 ─► Cashier1
//! CREATOR ───┤
//!            └─► Block2 ─► Queue2 ─► Cashier2
//! ```
//!
//! Each block lets a client through only toward the shorter queue (ties
//! go to Queue1). Clients that find their queue full are lost.

use flowline_core::{
    BufferSpec, ConfigError, Delay, Distribution, ElementId, GateSpec, Network, NetworkBuilder,
    SimTime, SourceSpec, StationSpec,
};

use super::ScenarioConfig;
use super::types::{BankMetrics, BankStatistics, LaneChanges, QueueBalancer};

/// Time of the first client arrival.
pub const FIRST_ARRIVAL: SimTime = 0.1;
/// Capacity of each cashier queue.
pub const QUEUE_CAPACITY: usize = 3;
/// Clients waiting in each queue when the bank opens.
pub const PRELOADED_CLIENTS: usize = 2;
/// Cashiers start work at a time drawn from this distribution.
pub const CASHIER_START: Distribution = Distribution::Normal {
    mean: 1.0,
    std: 0.3,
};

/// Element ids of the bank part of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankLayout {
    /// Client source
    pub creator: ElementId,
    /// Lane-selection gates, one per queue
    pub gates: [ElementId; 2],
    /// Cashier queues
    pub queues: [ElementId; 2],
    /// Single-worker cashiers
    pub cashiers: [ElementId; 2],
}

impl BankLayout {
    /// Clients-inside statistics over this bank.
    pub fn statistics(&self, lane_changes: LaneChanges) -> BankStatistics {
        BankStatistics::new(self.queues, self.cashiers, lane_changes)
    }

    /// Lane-change hook over this bank's queues.
    pub fn balancer(&self, lane_changes: LaneChanges) -> QueueBalancer {
        QueueBalancer::new(self.queues, lane_changes)
    }

    /// Bank figures at the end of a run.
    pub fn metrics(
        &self,
        network: &Network,
        statistics: &BankStatistics,
        window: SimTime,
    ) -> BankMetrics {
        BankMetrics::compute(
            network,
            self.creator,
            self.queues,
            self.cashiers,
            statistics,
            window,
        )
    }
}

/// Declares the bank on `builder`.
///
/// With `hold_outputs` the cashiers keep finished clients until their
/// exit path opens instead of completing them on the spot.
pub(super) fn declare_bank(
    builder: &mut NetworkBuilder,
    config: &ScenarioConfig,
    hold_outputs: bool,
) -> Result<BankLayout, ConfigError> {
    let arrivals = config.arrival_distribution()?;
    let service = config.service_distribution()?;

    let creator =
        builder.add_source(SourceSpec::new("CREATOR", arrivals).first_arrival(FIRST_ARRIVAL));
    let queue1 = builder.add_buffer(BufferSpec::new("Queue1", QUEUE_CAPACITY));
    let queue2 = builder.add_buffer(BufferSpec::new("Queue2", QUEUE_CAPACITY));
    let block1 = builder.add_gate(
        GateSpec::new("Block1")
            .guard(move |view, _| view.buffer_len(queue1) > view.buffer_len(queue2)),
    );
    let block2 = builder.add_gate(
        GateSpec::new("Block2")
            .guard(move |view, _| view.buffer_len(queue1) <= view.buffer_len(queue2)),
    );

    let mut cashier = |name: &str| {
        let spec = StationSpec::new(name, 1, service);
        builder.add_station(if hold_outputs {
            spec.hold_outputs()
        } else {
            spec
        })
    };
    let cashier1 = cashier("Cashier1");
    let cashier2 = cashier("Cashier2");

    builder
        .connect(creator, block1)
        .connect(creator, block2)
        .connect(block1, queue1)
        .connect(block2, queue2)
        .connect(queue1, cashier1)
        .connect(queue2, cashier2)
        .preload(queue1, PRELOADED_CLIENTS)
        .preload(queue2, PRELOADED_CLIENTS);

    Ok(BankLayout {
        creator,
        gates: [block1, block2],
        queues: [queue1, queue2],
        cashiers: [cashier1, cashier2],
    })
}

/// Draws each cashier's first wake-up from [`CASHIER_START`].
pub(super) fn schedule_cashiers(
    network: &mut Network,
    layout: &BankLayout,
) -> Result<(), ConfigError> {
    let start = Delay::new(CASHIER_START)?;
    for cashier in layout.cashiers {
        let time = start.sample(network.rng_mut());
        network.schedule_self_at(cashier, time);
    }
    Ok(())
}

/// Builds the bank network.
///
/// # Errors
///
/// - `ConfigError` - Invalid delay override or wiring
pub fn build_bank(config: &ScenarioConfig) -> Result<(Network, BankLayout), ConfigError> {
    let mut builder = NetworkBuilder::new(config.seed());
    let layout = declare_bank(&mut builder, config, false)?;
    let mut network = builder.build()?;
    schedule_cashiers(&mut network, &layout)?;
    Ok((network, layout))
}
