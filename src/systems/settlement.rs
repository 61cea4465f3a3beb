use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    events::SimEvent,
    rng::SystemRng,
    world::World,
};

/// Keeps the house count in step with the stock.
pub struct SettlementSystem;

impl SettlementSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SettlementSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SettlementSystem {
    fn name(&self) -> &str {
        "settlement"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let Some(settlement) = world.settlement.as_mut() else {
            return Ok(());
        };
        for (id, position) in settlement.ensure_houses(&mut world.ids, rng) {
            debug!(tick = ctx.tick, house = %id, "settlement caught up on housing");
            world.pending.events.push(SimEvent::HouseBuilt { id, position });
        }
        Ok(())
    }
}
