use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    rng::{RngExt, SystemRng},
    villager::{Gender, Villager, VillagerState},
    world::{EntityId, World},
};

/// Runs the reproduction timer of every house and delivers the children.
pub struct HouseSystem;

impl HouseSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HouseSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for HouseSystem {
    fn name(&self) -> &str {
        "houses"
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
        let house_params = &world.params.house;

        for house in settlement.houses_mut() {
            let house_id = house.id;
            let footprint = house_params.detection_radius;
            let stale: Vec<EntityId> = house
                .occupants()
                .iter()
                .filter(|o| {
                    !world.villagers.get(&o.id).is_some_and(|v| {
                        v.alive
                            && v.dwelling == Some(house_id)
                            && house.contains_point(v.position, footprint)
                    })
                })
                .map(|o| o.id)
                .collect();
            for id in stale {
                house.leave(id);
            }

            let pair_ready = match house.occupants() {
                [a, b] => {
                    a.gender != b.gender
                        && [a.id, b.id].iter().all(|id| {
                            world
                                .villagers
                                .get(id)
                                .is_some_and(|v| v.alive && v.age >= house_params.min_parent_age)
                        })
                }
                _ => false,
            };
            if !house.advance(ctx.dt_secs, pair_ready, house_params.reproduction_secs) {
                continue;
            }

            let id = world.ids.allocate();
            let position = rng.point_in_circle(house.position, house_params.child_spawn_radius);
            let gender = Gender::random(rng);
            for occupant in house.evict_all() {
                if let Some(parent) = world.villagers.get_mut(&occupant.id) {
                    parent.dwelling = None;
                    parent.destination = parent.position;
                    parent.set_state(VillagerState::Resting);
                }
            }
            debug!(house = %house_id, child = %id, ?gender, "villager born");
            world
                .pending
                .birth(Villager::newborn(id, position, gender, &world.params.villager));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::config::AgentParams;
    use crate::engine::{Engine, EngineBuilder, EngineSettings};
    use crate::rng::RngManager;
    use crate::settlement::SettlementSettings;

    fn engine() -> Engine {
        EngineBuilder::new(EngineSettings {
            scenario_name: "houses".into(),
            seed: 12,
            dt_secs: 0.5,
            snapshot_interval_ticks: 0,
            snapshot_dir: "unused".into(),
        })
        .with_system(HouseSystem::new())
        .build()
    }

    /// A world with one house and the given villagers already moved in.
    fn occupied(residents: &[(u32, Gender)]) -> (World, EntityId, Vec<EntityId>) {
        let mut world = World::new(AgentParams::default());
        let mut setup = RngManager::new(6);
        world.found_settlement(SettlementSettings::default(), &mut setup.stream("setup"));
        let (house_id, position) = {
            let house = &world.settlement().unwrap().houses()[0];
            (house.id, house.position)
        };
        let mut ids = Vec::new();
        for &(age, gender) in residents {
            let id = world.spawn_villager(position, age, gender);
            let v = world.villager_mut(id).unwrap();
            v.set_state(VillagerState::Reproducing);
            v.dwelling = Some(house_id);
            let house = world.settlement_mut().unwrap().house_mut(house_id).unwrap();
            assert!(house.join(id, gender));
            ids.push(id);
        }
        world.commit();
        (world, house_id, ids)
    }

    fn run_past_reproduction(world: &mut World) {
        let mut engine = engine();
        let ticks = (world.params().house.reproduction_secs / 0.5) as usize * 3;
        for _ in 0..ticks {
            engine.tick(world, 0.5).unwrap();
        }
    }

    #[test]
    fn mixed_pair_has_a_child() {
        let (mut world, house, _) = occupied(&[(30, Gender::Male), (30, Gender::Female)]);
        run_past_reproduction(&mut world);
        assert_eq!(world.population(), 3);
        assert!(world.settlement().unwrap().house(house).unwrap().occupants().is_empty());
    }

    #[test]
    fn same_gender_pair_never_reproduces() {
        let (mut world, house, _) = occupied(&[(30, Gender::Female), (30, Gender::Female)]);
        run_past_reproduction(&mut world);
        assert_eq!(world.population(), 2);
        let house = world.settlement().unwrap().house(house).unwrap();
        assert_eq!(house.occupants().len(), 2);
        assert_eq!(house.timer(), 0.0);
    }

    #[test]
    fn underage_pair_never_reproduces() {
        let min_age = AgentParams::default().house.min_parent_age;
        let (mut world, house, _) =
            occupied(&[(min_age - 1, Gender::Male), (30, Gender::Female)]);
        run_past_reproduction(&mut world);
        assert_eq!(world.population(), 2);
        assert_eq!(world.settlement().unwrap().house(house).unwrap().timer(), 0.0);
    }

    #[test]
    fn walking_out_of_the_footprint_leaves_the_house() {
        let (mut world, house, ids) = occupied(&[(30, Gender::Male), (30, Gender::Female)]);
        let mut engine = engine();
        engine.tick(&mut world, 0.5).unwrap();
        assert!(world.settlement().unwrap().house(house).unwrap().timer() > 0.0);

        world.villager_mut(ids[0]).unwrap().position = Vec2::new(40.0, 40.0);
        engine.tick(&mut world, 0.5).unwrap();
        let house = world.settlement().unwrap().house(house).unwrap();
        assert!(!house.holds(ids[0]));
        assert!(house.holds(ids[1]));
        assert_eq!(house.timer(), 0.0);
    }
}
