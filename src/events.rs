//! Lifecycle notifications for the host.
//!
//! Events are collected while a tick runs and delivered, in order, once the
//! tick has been committed. The simulation never waits on a reply.

use glam::Vec2;
use serde::Serialize;

use crate::villager::Gender;
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalCause {
    OldAge,
    Predation,
    Exhaustion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    VillagerSpawned {
        id: EntityId,
        position: Vec2,
        gender: Gender,
        age: u32,
    },
    VillagerRemoved {
        id: EntityId,
        cause: RemovalCause,
    },
    HouseBuilt {
        id: EntityId,
        position: Vec2,
    },
    WolfSpawned {
        id: EntityId,
        position: Vec2,
    },
    WolfRemoved {
        id: EntityId,
        cause: RemovalCause,
    },
    TreeSpawned {
        id: EntityId,
        position: Vec2,
    },
    TreeRemoved {
        id: EntityId,
        position: Vec2,
    },
}

/// Receives committed events. Any `FnMut(&SimEvent)` closure qualifies.
pub trait EventSink {
    fn on_event(&mut self, event: &SimEvent);
}

impl<F> EventSink for F
where
    F: FnMut(&SimEvent),
{
    fn on_event(&mut self, event: &SimEvent) {
        self(event)
    }
}
