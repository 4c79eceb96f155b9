//! Periodic entity generator.

use tracing::{trace, warn};

use super::{ElementId, Network, NodeKind};

/// Source state.
#[derive(Debug, Clone, Default)]
pub struct Source {
    class: u32,
    unrouted: u64,
}

impl Source {
    pub(crate) fn new(class: u32) -> Self {
        Self { class, unrouted: 0 }
    }

    /// Class tag stamped on every manufactured entity.
    pub fn class(&self) -> u32 {
        self.class
    }

    /// Entities for which no successor could be chosen.
    pub fn unrouted(&self) -> u64 {
        self.unrouted
    }

    pub(crate) fn reset_statistics(&mut self) {
        self.unrouted = 0;
    }
}

impl Network {
    /// Manufactures one entity, reschedules and forwards it.
    pub(super) fn fire_source(&mut self, id: ElementId) {
        let Some(class) = self.source(id).map(Source::class) else {
            return;
        };

        let entity = self.create_entity(id, class);
        let next = match self.sample_delay(id, None) {
            Ok(delay) => Some(self.clock + delay),
            Err(e) => {
                warn!("{e}, no further arrivals from {}", self.name(id));
                None
            }
        };
        if let Some(base) = self.base_mut(id) {
            base.completed += 1;
            base.next_event = next;
        }
        trace!("{} created {}, next at {:?}", self.name(id), entity.id, next);

        match self.choose_successor(id, Some(&entity)) {
            Some(target) => {
                self.admit(target, entity);
            }
            None => {
                if let Some(NodeKind::Source(source)) =
                    self.nodes.get_mut(id.index()).map(|node| &mut node.kind)
                {
                    source.unrouted += 1;
                }
            }
        }
    }
}
