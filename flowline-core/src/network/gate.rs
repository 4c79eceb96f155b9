//! Zero-storage conditional pass-through.

use std::fmt;

use tracing::trace;

use super::{ElementId, Network, NetworkView};
use crate::entity::Entity;

/// Guard predicate. Returns true while the gate blocks the entity.
///
/// Guards see the whole network read-only, so a gate can block on the
/// length of some buffer or the occupancy of some station.
pub type Guard = Box<dyn Fn(&NetworkView<'_>, Option<&Entity>) -> bool>;

/// Gate state: only the guard. Forwarding target is the single successor.
pub struct Gate {
    guard: Option<Guard>,
}

impl Gate {
    pub(crate) fn new(guard: Option<Guard>) -> Self {
        Self { guard }
    }

    /// Returns true if a guard is installed.
    pub fn has_guard(&self) -> bool {
        self.guard.is_some()
    }

    /// Evaluates the guard. Gates without one never block.
    pub fn blocks(&self, view: &NetworkView<'_>, entity: Option<&Entity>) -> bool {
        self.guard.as_ref().is_some_and(|guard| guard(view, entity))
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl Network {
    /// The element a gate forwards to.
    pub(crate) fn gate_target(&self, id: ElementId) -> Option<ElementId> {
        self.base(id)
            .and_then(|base| base.successors.entries().first())
            .map(|successor| successor.target)
    }

    /// Forwards unconditionally. The guard was already consulted by the
    /// upstream element when it picked this gate.
    pub(super) fn admit_to_gate(&mut self, id: ElementId, entity: Entity) -> bool {
        let Some(target) = self.gate_target(id) else {
            return false;
        };
        trace!("{} passes {} to {}", self.name(id), entity.id, self.name(target));
        self.admit(target, entity)
    }
}
