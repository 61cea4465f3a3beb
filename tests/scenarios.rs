use glam::Vec2;
use hamlet::{
    config::AgentParams,
    dwelling::House,
    engine::{Engine, EngineBuilder, EngineSettings},
    rng::RngManager,
    scenario::ScenarioLoader,
    settlement::{Settlement, SettlementSettings},
    villager::{Gender, VillagerState},
    world::IdAllocator,
    World,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn engine(seed: u64, dt: f32) -> Engine {
    EngineBuilder::new(EngineSettings {
        scenario_name: "scenarios".into(),
        seed,
        dt_secs: dt,
        snapshot_interval_ticks: 0,
        snapshot_dir: "unused".into(),
    })
    .with_default_systems()
    .build()
}

fn meadow() -> (World, Engine) {
    let scenario = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
        .load("scenarios/meadow.yaml")
        .expect("scenario should load");
    let world = scenario.build_world();
    (world, engine(scenario.seed, scenario.dt_secs))
}

fn calm_params() -> AgentParams {
    let mut params = AgentParams::default();
    params.villager.departure_rate = 0.0;
    params.villager.reproduction_rate = 0.0;
    params
}

#[test]
fn deposits_of_25_then_20_build_one_then_two_houses() {
    let mut ids = IdAllocator::default();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut settlement = Settlement::new(
        ids.allocate(),
        SettlementSettings {
            resources_per_house: 20,
            initial_stock: 0,
            initial_houses: 0,
            ..SettlementSettings::default()
        },
    );
    settlement.deposit(25, &mut ids, &mut rng);
    assert_eq!(settlement.houses().len(), 1);
    settlement.deposit(20, &mut ids, &mut rng);
    assert_eq!(settlement.houses().len(), 2);
}

#[test]
fn meadow_invariants_hold_every_tick() {
    let (mut world, mut engine) = meadow();
    let params = world.params().clone();
    let mut last_houses = 0;

    for _ in 0..1500 {
        engine.tick(&mut world, 0.1).unwrap();

        for v in world.villagers() {
            assert!(v.alive, "dead villagers are pruned at commit");
            assert!(v.age <= v.max_age);
            assert!(v.carried <= params.villager.carry_capacity);
            assert!((0.0..=params.villager.max_energy).contains(&v.energy));
        }

        let settlement = world.settlement().unwrap();
        assert!(settlement.stock() <= settlement.capacity());
        let houses = settlement.houses();
        assert!(houses.len() >= last_houses, "houses are never destroyed");
        assert!(houses.len() >= settlement.expected_houses());
        last_houses = houses.len();
        for house in houses {
            assert!(house.occupants().len() <= House::CAPACITY);
        }

        for forest in world.forests() {
            assert!(forest.trees().len() <= forest.settings().max_trees);
            assert!(forest.wolf_count() <= forest.settings().max_wolves);
        }
    }
}

#[test]
fn fleeing_villager_rests_on_the_tick_it_arrives() {
    let mut world = World::new(calm_params());
    let mut setup = RngManager::new(3);
    world.found_settlement(SettlementSettings::default(), &mut setup.stream("setup"));
    let arrival = world.params().villager.arrival_threshold;
    let villager = world.spawn_villager(Vec2::new(2.0, 0.0), 30, Gender::Female);
    world.spawn_wolf(Vec2::new(5.5, 0.0));
    world
        .villager_mut(villager)
        .unwrap()
        .set_state(VillagerState::Fleeing);
    let mut engine = engine(3, 0.1);

    let mut arrived = false;
    for _ in 0..30 {
        engine.tick(&mut world, 0.1).unwrap();
        let v = world.villager(villager).unwrap();
        let inside = v.position.length() <= arrival;
        if arrived || inside {
            assert_eq!(v.state, VillagerState::Resting);
        }
        if inside && !arrived {
            arrived = true;
        }
        if arrived {
            assert_ne!(v.state, VillagerState::Fleeing, "no flee oscillation");
        }
        if world.tick() > 12 {
            break;
        }
    }
    assert!(arrived);
}

#[test]
fn zero_step_changes_nothing() {
    let (mut world, mut engine) = meadow();
    for _ in 0..200 {
        engine.tick(&mut world, 0.1).unwrap();
    }
    let villagers: Vec<_> = world.villagers().cloned().collect();
    let wolves: Vec<_> = world.wolves().cloned().collect();
    let before = world.snapshot("meadow");

    for _ in 0..5 {
        let summary = engine.tick(&mut world, 0.0).unwrap();
        assert!(summary.events.is_empty());
    }

    let after = world.snapshot("meadow");
    assert_eq!(villagers, world.villagers().cloned().collect::<Vec<_>>());
    assert_eq!(wolves, world.wolves().cloned().collect::<Vec<_>>());
    assert_eq!(before.settlement, after.settlement);
    assert_eq!(before.forests, after.forests);
    assert_eq!(before.elapsed_secs, after.elapsed_secs);
}

fn paired_world(ticks_to_birth: u32) -> (World, Engine, [hamlet::EntityId; 2], f32) {
    let mut params = calm_params();
    params.house.reproduction_secs = ticks_to_birth as f32 * 0.5;
    let mut world = World::new(params);
    let mut setup = RngManager::new(4);
    world.found_settlement(SettlementSettings::default(), &mut setup.stream("setup"));
    let house = world.settlement().unwrap().houses()[0].position;
    let a = world.spawn_villager(house, 30, Gender::Male);
    let b = world.spawn_villager(house, 30, Gender::Female);
    for id in [a, b] {
        world
            .villager_mut(id)
            .unwrap()
            .set_state(VillagerState::Reproducing);
    }
    (world, engine(4, 0.5), [a, b], 0.5)
}

#[test]
fn a_pair_in_a_house_has_a_child() {
    let (mut world, mut engine, parents, dt) = paired_world(20);
    for _ in 0..19 {
        engine.tick(&mut world, dt).unwrap();
    }
    assert_eq!(world.population(), 2);
    let house = &world.settlement().unwrap().houses()[0];
    assert_eq!(house.occupants().len(), 2);
    assert_eq!(house.timer(), 19.0 * dt);

    engine.tick(&mut world, dt).unwrap();
    assert_eq!(world.population(), 3);
    let child = world
        .villagers()
        .find(|v| !parents.contains(&v.id))
        .expect("child");
    assert_eq!(child.age, 0);
    for id in parents {
        let parent = world.villager(id).unwrap();
        assert_eq!(parent.state, VillagerState::Resting);
        assert_eq!(parent.dwelling, None);
    }
    assert!(world.settlement().unwrap().houses()[0].occupants().is_empty());
}

#[test]
fn losing_a_partner_restarts_the_timer() {
    let (mut world, mut engine, [a, _], dt) = paired_world(20);
    for _ in 0..10 {
        engine.tick(&mut world, dt).unwrap();
    }
    assert!(world.settlement().unwrap().houses()[0].timer() > 0.0);

    world.villager_mut(a).unwrap().die();
    engine.tick(&mut world, dt).unwrap();
    let house = &world.settlement().unwrap().houses()[0];
    assert_eq!(house.timer(), 0.0);
    assert_eq!(house.occupants().len(), 1);
}

#[test]
fn a_huge_step_finishes_and_ages_everyone_out() {
    let (mut world, mut engine) = meadow();
    let villagers = world.population();
    let wolves = world.wolf_count();

    let summary = engine.tick(&mut world, 1e8).unwrap();
    let old_age = summary
        .events
        .iter()
        .filter(|e| {
            matches!(
                e,
                hamlet::SimEvent::VillagerRemoved {
                    cause: hamlet::RemovalCause::OldAge,
                    ..
                } | hamlet::SimEvent::WolfRemoved {
                    cause: hamlet::RemovalCause::OldAge,
                    ..
                }
            )
        })
        .count();
    assert_eq!(old_age, villagers + wolves);
    assert_eq!(world.population(), 0);
    assert!(
        world.wolves().all(|w| w.age == 0),
        "only wolves the forests bred this tick remain"
    );
}
