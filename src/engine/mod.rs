use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::{
    events::{EventSink, SimEvent},
    rng::{RngManager, SystemRng},
    snapshot::SnapshotWriter,
    systems::{ForestSystem, HouseSystem, SettlementSystem, VillagerSystem, WolfSystem},
    world::World,
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub seed: u64,
    /// Step used by [`Engine::run`].
    pub dt_secs: f32,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
    observers: Vec<Box<dyn EventSink>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// settlement, forests, villagers, wolves, houses.
    pub fn with_default_systems(self) -> Self {
        self.with_system(SettlementSystem::new())
            .with_system(ForestSystem::new())
            .with_system(VillagerSystem::new())
            .with_system(WolfSystem::new())
            .with_system(HouseSystem::new())
    }

    pub fn with_observer(mut self, observer: impl EventSink + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            observers: self.observers,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemRunReport {
    pub name: String,
    pub elapsed: Duration,
}

/// What one call to [`Engine::tick`] did.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// Ticks completed, counting this one.
    pub tick: u64,
    pub dt_secs: f32,
    pub systems: Vec<SystemRunReport>,
    pub events: Vec<SimEvent>,
    pub population: usize,
    pub wolves: usize,
    pub houses: usize,
    pub stock: Option<u32>,
    pub snapshot: Option<PathBuf>,
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    observers: Vec<Box<dyn EventSink>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    /// Advances the world by `dt` seconds.
    ///
    /// Systems see the spatial index as it was at the start of the tick;
    /// deaths and births they request are applied once all of them ran. A
    /// zero step runs no system at all.
    pub fn tick(&mut self, world: &mut World, dt: f32) -> Result<TickSummary> {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!(dt, "invalid time step, clamping to zero");
            0.0
        };

        world.refresh_index();
        let mut reports = Vec::with_capacity(self.systems.len());
        if dt > 0.0 {
            for system in &mut self.systems {
                let mut rng_stream = self.rng.stream(system.name());
                let ctx = SystemContext {
                    tick: world.tick(),
                    dt_secs: dt,
                    scenario_name: &self.settings.scenario_name,
                };
                let started = Instant::now();
                system
                    .run(&ctx, world, &mut rng_stream)
                    .with_context(|| format!("system '{}' failed", system.name()))?;
                reports.push(SystemRunReport {
                    name: system.name().to_string(),
                    elapsed: started.elapsed(),
                });
            }
        }

        let events = world.commit();
        world.advance_time(dt);

        for event in &events {
            for observer in &mut self.observers {
                observer.on_event(event);
            }
        }

        let snapshot = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;

        let summary = TickSummary {
            tick: world.tick(),
            dt_secs: dt,
            systems: reports,
            population: world.population(),
            wolves: world.wolf_count(),
            houses: world.settlement().map_or(0, |s| s.houses().len()),
            stock: world.settlement().map(|s| s.stock()),
            events,
            snapshot,
        };
        debug!(
            tick = summary.tick,
            population = summary.population,
            wolves = summary.wolves,
            events = summary.events.len(),
            "tick complete"
        );
        Ok(summary)
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&TickSummary),
    {
        info!(
            scenario = %self.settings.scenario_name,
            ticks,
            dt = self.settings.dt_secs,
            "simulation started"
        );
        for _ in 0..ticks {
            let summary = self.tick(world, self.settings.dt_secs)?;
            hook(&summary);
        }
        info!(
            scenario = %self.settings.scenario_name,
            population = world.population(),
            wolves = world.wolf_count(),
            "simulation finished"
        );
        Ok(())
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

pub struct SystemContext<'a> {
    /// Ticks completed before this one.
    pub tick: u64,
    pub dt_secs: f32,
    pub scenario_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::config::AgentParams;
    use crate::villager::Gender;

    struct Counter {
        runs: Rc<RefCell<u32>>,
    }

    impl System for Counter {
        fn name(&self) -> &str {
            "counter"
        }

        fn run(&mut self, _: &SystemContext, _: &mut World, _: &mut SystemRng<'_>) -> Result<()> {
            *self.runs.borrow_mut() += 1;
            Ok(())
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            scenario_name: "unit".into(),
            seed: 1,
            dt_secs: 0.1,
            snapshot_interval_ticks: 0,
            snapshot_dir: PathBuf::from("unused"),
        }
    }

    #[test]
    fn zero_and_negative_steps_skip_systems() {
        let runs = Rc::new(RefCell::new(0));
        let mut engine = EngineBuilder::new(settings())
            .with_system(Counter { runs: runs.clone() })
            .build();
        let mut world = World::new(AgentParams::default());

        engine.tick(&mut world, 0.0).unwrap();
        let summary = engine.tick(&mut world, -1.0).unwrap();
        assert_eq!(*runs.borrow(), 0);
        assert_eq!(summary.dt_secs, 0.0);

        engine.tick(&mut world, 0.5).unwrap();
        assert_eq!(*runs.borrow(), 1);
        assert_eq!(world.tick(), 3);
    }

    #[test]
    fn observers_see_committed_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut engine = EngineBuilder::new(settings())
            .with_observer(move |event: &SimEvent| sink.borrow_mut().push(event.clone()))
            .build();
        let mut world = World::new(AgentParams::default());
        let id = world.spawn_villager(Vec2::ZERO, 20, Gender::Male);

        let summary = engine.tick(&mut world, 0.0).unwrap();
        assert_eq!(summary.events.len(), 1);
        assert!(matches!(
            seen.borrow().as_slice(),
            [SimEvent::VillagerSpawned { id: spawned, .. }] if *spawned == id
        ));
    }

    #[test]
    fn run_with_hook_reports_every_tick() {
        let mut engine = EngineBuilder::new(settings()).with_default_systems().build();
        let mut world = World::new(AgentParams::default());
        let mut ticks = Vec::new();
        engine
            .run_with_hook(&mut world, 4, |summary| ticks.push(summary.tick))
            .unwrap();
        assert_eq!(ticks, vec![1, 2, 3, 4]);
    }
}
