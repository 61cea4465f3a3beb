use std::collections::BTreeMap;

use anyhow::Result;
use glam::Vec2;
use rand::Rng;
use tracing::debug;

use crate::{
    config::WolfParams,
    engine::{System, SystemContext},
    events::RemovalCause,
    rng::{RngExt, SystemRng},
    settlement::Settlement,
    spatial::{step_toward, EntityKind, SpatialIndex},
    villager::Villager,
    wolf::{Wolf, WolfState},
    world::{EntityId, TickBuffer, World},
};

pub struct WolfSystem;

impl WolfSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WolfSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WolfSystem {
    fn name(&self) -> &str {
        "wolves"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let mut territory = Territory {
            params: &world.params.wolf,
            index: &world.index,
            settlement: world.settlement.as_ref(),
            villagers: &mut world.villagers,
            pending: &mut world.pending,
        };
        for wolf in world.wolves.values_mut() {
            if wolf.alive {
                step(wolf, &mut territory, ctx.dt_secs, rng);
            }
        }
        Ok(())
    }
}

struct Territory<'a> {
    params: &'a WolfParams,
    index: &'a SpatialIndex,
    settlement: Option<&'a Settlement>,
    villagers: &'a mut BTreeMap<EntityId, Villager>,
    pending: &'a mut TickBuffer,
}

impl Territory<'_> {
    /// The wolf's current prey, if it is still fair game.
    fn prey(&self, wolf: &Wolf) -> Option<&Villager> {
        wolf.target
            .and_then(|id| self.villagers.get(&id))
            .filter(|v| v.alive && !v.is_grouped())
    }
}

fn step(wolf: &mut Wolf, t: &mut Territory<'_>, dt: f32, rng: &mut impl Rng) {
    let params = t.params;
    if wolf.advance_age(dt, params.secs_per_year) {
        debug!(wolf = %wolf.id, "wolf died of old age");
        t.pending.kill(wolf.id, RemovalCause::OldAge, EntityKind::Wolf);
        return;
    }

    if let Some(settlement) = t.settlement {
        if wolf.state != WolfState::Flee
            && settlement.distance_to_edge(wolf.position) <= params.avoidance_margin
        {
            debug!(wolf = %wolf.id, from = ?wolf.state, "too close to the settlement");
            wolf.set_state(WolfState::Flee);
        }
    }

    match wolf.state {
        WolfState::Patrol => patrol(wolf, t, dt, rng),
        WolfState::Chase => chase(wolf, t, dt),
        WolfState::Attack => attack(wolf, t, dt),
        WolfState::Eat => {
            wolf.timer += dt;
            if wolf.timer >= params.eat_secs {
                wolf.set_state(WolfState::Patrol);
            }
        }
        WolfState::Flee => flee(wolf, t, dt, rng),
        WolfState::FailedHunt => {
            wolf.timer += dt;
            wander(wolf, params, dt, rng);
            if wolf.timer >= params.failed_hunt_secs {
                wolf.set_state(WolfState::Patrol);
            }
        }
    }
}

fn wander(wolf: &mut Wolf, params: &WolfParams, dt: f32, rng: &mut impl Rng) {
    if wolf.position.distance(wolf.destination) <= params.waypoint_threshold {
        wolf.destination = rng.point_in_circle(wolf.position, params.patrol_radius);
    }
    wolf.position = step_toward(wolf.position, wolf.destination, params.speed * dt);
}

fn patrol(wolf: &mut Wolf, t: &mut Territory<'_>, dt: f32, rng: &mut impl Rng) {
    let villagers = &*t.villagers;
    let prey = t.index.nearest_matching(
        EntityKind::Villager,
        wolf.position,
        t.params.vision_range,
        |id| villagers.get(&id).is_some_and(|v| v.alive && !v.is_grouped()),
    );
    match prey {
        Some(prey) => {
            debug!(wolf = %wolf.id, villager = %prey, "prey spotted");
            wolf.set_state(WolfState::Chase);
            wolf.target = Some(prey);
        }
        None => wander(wolf, t.params, dt, rng),
    }
}

fn chase(wolf: &mut Wolf, t: &mut Territory<'_>, dt: f32) {
    let params = t.params;
    let Some(target) = t.prey(wolf).map(|v| v.position) else {
        wolf.set_state(WolfState::Patrol);
        return;
    };
    if t.settlement.is_some_and(|s| s.contains(target)) {
        debug!(wolf = %wolf.id, "prey reached the settlement");
        wolf.set_state(WolfState::FailedHunt);
        return;
    }
    if wolf.position.distance(target) <= params.attack_range {
        wolf.set_state(WolfState::Attack);
        return;
    }
    wolf.destination = target;
    wolf.position = step_toward(wolf.position, target, params.speed * dt);
}

fn attack(wolf: &mut Wolf, t: &mut Territory<'_>, dt: f32) {
    let params = t.params;
    let Some(target) = t.prey(wolf).map(|v| (v.id, v.position)) else {
        wolf.set_state(WolfState::Patrol);
        return;
    };
    let (target_id, position) = target;
    if wolf.position.distance(position) > params.attack_range {
        wolf.set_state(WolfState::Chase);
        return;
    }
    wolf.timer += dt;
    if wolf.timer < params.attack_cooldown_secs {
        return;
    }
    if let Some(victim) = t.villagers.get_mut(&target_id) {
        victim.die();
    }
    debug!(wolf = %wolf.id, villager = %target_id, "villager killed");
    t.pending
        .kill(target_id, RemovalCause::Predation, EntityKind::Villager);
    wolf.set_state(WolfState::Eat);
}

fn flee(wolf: &mut Wolf, t: &mut Territory<'_>, dt: f32, rng: &mut impl Rng) {
    let params = t.params;
    let Some(settlement) = t.settlement else {
        wolf.set_state(WolfState::Patrol);
        return;
    };
    wolf.timer += dt;
    let away = (wolf.position - settlement.position()).normalize_or_zero();
    let away = if away == Vec2::ZERO {
        rng.unit_direction()
    } else {
        away
    };
    wolf.destination = wolf.position + away * params.flee_distance;
    wolf.position = step_toward(wolf.position, wolf.destination, params.speed * dt);

    let clear = settlement.distance_to_edge(wolf.position)
        > params.avoidance_margin + params.flee_clear_buffer;
    if clear || wolf.timer >= params.max_flee_secs {
        wolf.set_state(WolfState::Patrol);
    }
}
