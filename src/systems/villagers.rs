//! The villager state machine.
//!
//! Each villager ages, pays or regains energy, reacts to any wolf it can see
//! and then acts on its current state. Spatial lookups read the index built at
//! the start of the tick; deaths and births go through the tick buffer.

use anyhow::Result;
use glam::Vec2;
use rand::Rng;
use tracing::debug;

use crate::{
    config::VillagerParams,
    engine::{System, SystemContext},
    events::{RemovalCause, SimEvent},
    forest::Forest,
    rng::{RngExt, SystemRng},
    settlement::Settlement,
    spatial::{step_toward, EntityKind, SpatialIndex},
    villager::{Villager, VillagerState},
    world::{EntityId, IdAllocator, TickBuffer, World},
};

pub struct VillagerSystem;

impl VillagerSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VillagerSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for VillagerSystem {
    fn name(&self) -> &str {
        "villagers"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let mut env = Surroundings {
            params: &world.params.villager,
            detection_radius: world.params.house.detection_radius,
            index: &world.index,
            settlement: world.settlement.as_mut(),
            forests: &mut world.forests,
            ids: &mut world.ids,
            pending: &mut world.pending,
        };
        for villager in world.villagers.values_mut() {
            if villager.alive {
                step(villager, &mut env, ctx.dt_secs, rng);
            }
        }
        Ok(())
    }
}

struct Surroundings<'a> {
    params: &'a VillagerParams,
    detection_radius: f32,
    index: &'a SpatialIndex,
    settlement: Option<&'a mut Settlement>,
    forests: &'a mut Vec<Forest>,
    ids: &'a mut IdAllocator,
    pending: &'a mut TickBuffer,
}

fn step(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    if v.advance_age(dt, params.secs_per_year) {
        debug!(villager = %v.id, age = v.age, "died of old age");
        env.pending
            .kill(v.id, RemovalCause::OldAge, EntityKind::Villager);
        return;
    }
    v.state_timer += dt;

    update_energy(v, env, dt);
    if v.energy <= 0.0 {
        v.die();
        debug!(villager = %v.id, "died of exhaustion");
        env.pending
            .kill(v.id, RemovalCause::Exhaustion, EntityKind::Villager);
        return;
    }

    if v.state.needs_working_age() && !params.working_band.contains(v.age) {
        v.set_state(VillagerState::Returning);
    }

    v.nearby_peers = peers_nearby(v, env);
    react_to_wolves(v, env);

    match v.state {
        VillagerState::Resting => rest(v, env, dt, rng),
        VillagerState::Reproducing => seek_pairing(v, env, dt, rng),
        VillagerState::Traveling => travel(v, env, dt),
        VillagerState::Gathering => gather(v, env, dt),
        VillagerState::Returning => return_home(v, env, dt, rng),
        VillagerState::Fleeing => flee(v, env, dt, rng),
        VillagerState::Grouped => keep_with_group(v, env, dt, rng),
        VillagerState::Dead => {}
    }
}

fn update_energy(v: &mut Villager, env: &Surroundings<'_>, dt: f32) {
    let Some(settlement) = env.settlement.as_deref() else {
        return;
    };
    let params = env.params;
    let at_home = settlement.distance_to_centre(v.position) <= settlement.wander_radius();
    if !at_home {
        v.energy = (v.energy - params.energy_drain_per_sec * dt).max(0.0);
    } else if matches!(v.state, VillagerState::Resting | VillagerState::Reproducing) {
        v.energy = (v.energy + params.energy_regen_per_sec * dt).min(params.max_energy);
    }
}

/// Inside the home circle wolves are not worth running from.
fn is_sheltered(v: &Villager, env: &Surroundings<'_>) -> bool {
    env.settlement.as_deref().is_some_and(|s| {
        s.distance_to_centre(v.position) <= s.wander_radius().max(env.params.arrival_threshold)
    })
}

fn peers_nearby(v: &Villager, env: &Surroundings<'_>) -> usize {
    env.index
        .query_radius(EntityKind::Villager, v.position, env.params.group_radius)
        .into_iter()
        .filter(|&id| id != v.id)
        .count()
}

fn react_to_wolves(v: &mut Villager, env: &Surroundings<'_>) {
    if v.state.is_protected() || matches!(v.state, VillagerState::Fleeing | VillagerState::Grouped) {
        return;
    }
    let Some(wolf) = env
        .index
        .nearest(EntityKind::Wolf, v.position, env.params.vision_range)
    else {
        return;
    };
    if is_sheltered(v, env) {
        return;
    }
    let next = if v.nearby_peers > 0 {
        VillagerState::Grouped
    } else {
        VillagerState::Fleeing
    };
    debug!(villager = %v.id, wolf = %wolf, from = ?v.state, to = ?next, "wolf spotted");
    v.set_state(next);
}

fn move_toward(v: &mut Villager, target: Vec2, speed: f32, dt: f32) {
    v.destination = target;
    v.position = step_toward(v.position, target, speed * dt);
}

/// Moves at the villager's own pace.
fn walk(v: &mut Villager, target: Vec2, params: &VillagerParams, dt: f32) {
    let speed = v.speed(params);
    move_toward(v, target, speed, dt);
}

/// Drifts between random points of the home circle. Without a settlement the
/// villager stays put.
fn wander(
    v: &mut Villager,
    home: Option<(Vec2, f32)>,
    params: &VillagerParams,
    dt: f32,
    rng: &mut impl Rng,
) {
    let Some((centre, radius)) = home else {
        return;
    };
    let reached = v.position.distance(v.destination) <= params.waypoint_threshold;
    let outside = v.destination.distance(centre) > radius;
    if reached || outside {
        v.destination = rng.point_in_circle(centre, radius);
    }
    let destination = v.destination;
    walk(v, destination, params, dt);
}

fn home_circle(env: &Surroundings<'_>) -> Option<(Vec2, f32)> {
    env.settlement
        .as_deref()
        .map(|s| (s.position(), s.wander_radius()))
}

fn rest(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    let has_houses = env
        .settlement
        .as_deref()
        .is_some_and(|s| !s.houses().is_empty());
    if params.fertile_band.contains(v.age)
        && has_houses
        && rng.chance_over(params.reproduction_rate, dt)
    {
        v.dwelling = None;
        v.set_state(VillagerState::Reproducing);
        return;
    }
    if params.working_band.contains(v.age)
        && v.energy > params.low_energy
        && !env.forests.is_empty()
        && rng.chance_over(params.departure_rate, dt)
    {
        let forest = &env.forests[rng.gen_range(0..env.forests.len())];
        v.forest = Some(forest.id);
        v.destination = rng.point_in_circle(forest.position(), forest.radius());
        v.set_state(VillagerState::Traveling);
        return;
    }
    wander(v, home_circle(env), params, dt, rng);
}

fn seek_pairing(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    let home = home_circle(env);
    let Some(settlement) = env.settlement.as_deref_mut() else {
        v.set_state(VillagerState::Resting);
        return;
    };

    if v.state_timer >= params.reproduction_patience_secs {
        if let Some(house) = v.dwelling.take().and_then(|id| settlement.house_mut(id)) {
            house.leave(v.id);
        }
        v.set_state(VillagerState::Resting);
        return;
    }

    if let Some(house_id) = v.dwelling {
        match settlement.house(house_id) {
            Some(house) if house.holds(v.id) => {
                let position = house.position;
                walk(v, position, params, dt);
            }
            _ => v.dwelling = None,
        }
        return;
    }

    let gender = v.gender;
    let candidate = env
        .index
        .nearest_matching(EntityKind::House, v.position, f32::INFINITY, |id| {
            settlement.house(id).is_some_and(|h| h.accepts(gender))
        })
        .and_then(|id| settlement.house(id))
        .map(|h| (h.id, h.position));
    let Some((house_id, position)) = candidate else {
        wander(v, home, params, dt, rng);
        return;
    };

    walk(v, position, params, dt);
    if position.distance(v.position) <= env.detection_radius {
        let joined = settlement
            .house_mut(house_id)
            .is_some_and(|house| house.join(v.id, gender));
        if joined {
            v.dwelling = Some(house_id);
            v.state_timer = 0.0;
            debug!(villager = %v.id, house = %house_id, "moved into house");
        }
    }
}

fn travel(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32) {
    let params = env.params;
    let forest_known = v
        .forest
        .is_some_and(|id| env.forests.iter().any(|f| f.id == id));
    if !forest_known {
        v.forest = None;
        v.set_state(VillagerState::Returning);
        return;
    }
    let destination = v.destination;
    walk(v, destination, params, dt);
    if v.position.distance(destination) <= params.forest_arrival_threshold {
        v.set_state(VillagerState::Gathering);
    }
}

fn gather(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32) {
    let params = env.params;
    if v.energy < params.low_energy || v.is_full(params.carry_capacity) {
        v.set_state(VillagerState::Returning);
        return;
    }

    let forests = &*env.forests;
    let tree = env
        .index
        .nearest_matching(
            EntityKind::Tree,
            v.position,
            params.tree_search_radius,
            |id| live_tree(forests, id).is_some(),
        )
        .and_then(|id| live_tree(forests, id));
    let Some((tree_id, position)) = tree else {
        v.set_state(VillagerState::Returning);
        return;
    };

    walk(v, position, params, dt);
    if v.position.distance(position) > params.harvest_reach {
        return;
    }
    let Some(tree) = env.forests.iter_mut().find_map(|f| f.harvest(tree_id)) else {
        return;
    };
    let taken = v.load(tree.yield_left, params.carry_capacity);
    debug!(
        villager = %v.id,
        tree = %tree.id,
        taken,
        lost = tree.yield_left - taken,
        "tree harvested"
    );
    env.pending.events.push(SimEvent::TreeRemoved {
        id: tree.id,
        position: tree.position,
    });
    if v.is_full(params.carry_capacity) {
        v.set_state(VillagerState::Returning);
    }
}

fn live_tree(forests: &[Forest], id: EntityId) -> Option<(EntityId, Vec2)> {
    forests
        .iter()
        .find_map(|f| f.tree(id))
        .map(|t| (t.id, t.position))
}

fn return_home(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    let Some(settlement) = env.settlement.as_deref_mut() else {
        v.set_state(VillagerState::Resting);
        return;
    };
    let centre = settlement.position();
    walk(v, centre, params, dt);
    if v.position.distance(centre) <= params.arrival_threshold {
        deposit(v, settlement, env.ids, env.pending, rng);
        v.set_state(VillagerState::Resting);
    }
}

fn deposit(
    v: &mut Villager,
    settlement: &mut Settlement,
    ids: &mut IdAllocator,
    pending: &mut TickBuffer,
    rng: &mut impl Rng,
) {
    let amount = v.unload();
    if amount == 0 {
        return;
    }
    for (id, position) in settlement.deposit(amount, ids, rng) {
        pending.events.push(SimEvent::HouseBuilt { id, position });
    }
}

fn flee(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    if v.state_timer >= params.flee_timeout_secs {
        v.set_state(VillagerState::Resting);
        return;
    }
    let mut speed = v.speed(params);
    if v.state_timer < params.flee_boost_secs {
        speed *= params.flee_speed_multiplier;
    }

    match env.settlement.as_deref_mut() {
        Some(settlement) => {
            let centre = settlement.position();
            move_toward(v, centre, speed, dt);
            if v.position.distance(centre) <= params.arrival_threshold {
                deposit(v, settlement, env.ids, env.pending, rng);
                v.set_state(VillagerState::Resting);
            }
        }
        None => {
            let threat = env
                .index
                .nearest(EntityKind::Wolf, v.position, params.vision_range)
                .and_then(|id| env.index.position(id));
            if let Some(threat) = threat {
                let away = (v.position - threat).normalize_or_zero();
                let away = if away == Vec2::ZERO {
                    rng.unit_direction()
                } else {
                    away
                };
                v.destination = v.position + away * params.vision_range;
            }
            let destination = v.destination;
            move_toward(v, destination, speed, dt);
        }
    }
}

/// Grouped villagers follow the lowest-id member of their group, who always
/// heads for the settlement centre; with no settlement the group holds still.
fn keep_with_group(v: &mut Villager, env: &mut Surroundings<'_>, dt: f32, rng: &mut impl Rng) {
    let params = env.params;
    if v.nearby_peers == 0 {
        v.set_state(VillagerState::Resting);
        return;
    }
    let Some(settlement) = env.settlement.as_deref_mut() else {
        v.destination = v.position;
        return;
    };
    let centre = settlement.position();
    walk(v, centre, params, dt);
    if v.position.distance(centre) <= params.arrival_threshold {
        deposit(v, settlement, env.ids, env.pending, rng);
        v.set_state(VillagerState::Resting);
    }
}
