use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    events::SimEvent,
    rng::SystemRng,
    wolf::Wolf,
    world::World,
};

pub struct ForestSystem;

impl ForestSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ForestSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ForestSystem {
    fn name(&self) -> &str {
        "forest"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        for forest in &mut world.forests {
            let growth = forest.update(ctx.dt_secs, &mut world.ids, rng);
            if let Some((id, position)) = growth.tree {
                world.pending.events.push(SimEvent::TreeSpawned { id, position });
            }
            if let Some((id, position)) = growth.wolf {
                debug!(forest = %forest.id, wolf = %id, "wolf spawned");
                world
                    .pending
                    .wolf_birth(Wolf::new(id, position, &world.params.wolf));
            }
        }
        Ok(())
    }
}
