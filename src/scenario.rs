use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use glam::Vec2;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    config::{AgentParams, AgeBand, HouseParams, VillagerParams, WolfParams},
    error::{self, ScenarioError},
    forest::ForestSettings,
    rng::{RngExt, RngManager},
    settlement::SettlementSettings,
    villager::Gender,
    world::World,
};

fn default_dt_secs() -> f32 {
    0.1
}

fn default_log_level() -> String {
    "info".into()
}

fn default_min_age() -> u32 {
    18
}

fn default_max_age() -> u32 {
    40
}

fn default_spawn_radius() -> f32 {
    3.0
}

/// Setup draws come from their own seed so they never mirror a system stream.
const SETUP_SEED_SALT: u64 = 0x5e7u64 << 48;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_dt_secs")]
    pub dt_secs: f32,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub settlement: Option<SettlementSettings>,
    #[serde(default)]
    pub forests: Vec<ForestSettings>,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub villager: VillagerParams,
    #[serde(default)]
    pub wolf: WolfParams,
    #[serde(default)]
    pub house: HouseParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The villagers present at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct PopulationConfig {
    #[serde(default)]
    pub count: u32,
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    /// Exact number of males; genders are drawn at random when omitted.
    #[serde(default)]
    pub males: Option<u32>,
    /// Spawn radius around the settlement centre, or the origin without one.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            count: 0,
            min_age: default_min_age(),
            max_age: default_max_age(),
            males: None,
            spawn_radius: default_spawn_radius(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml(&data)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn from_yaml(data: &str) -> Result<Self> {
        let scenario: Scenario = serde_yaml::from_str(data).context("Failed to parse scenario")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> error::Result<()> {
        if !(self.dt_secs.is_finite() && self.dt_secs > 0.0) {
            return Err(ScenarioError::NonPositiveTimeStep(self.dt_secs));
        }
        if let Some(settlement) = &self.settlement {
            positive("settlement.radius", settlement.radius)?;
            positive("settlement.wander_radius", settlement.wander_radius)?;
            positive(
                "settlement.house_placement_radius",
                settlement.house_placement_radius,
            )?;
            if settlement.capacity == 0 {
                return Err(ScenarioError::ZeroCapacity);
            }
            if settlement.resources_per_house == 0 {
                return Err(ScenarioError::ZeroResourcesPerHouse);
            }
        }
        for (index, forest) in self.forests.iter().enumerate() {
            if !(forest.radius > 0.0) {
                return Err(ScenarioError::EmptyForest {
                    index,
                    radius: forest.radius,
                });
            }
        }
        band("villager.fertile_band", self.villager.fertile_band)?;
        band("villager.working_band", self.villager.working_band)?;
        positive("house.detection_radius", self.house.detection_radius)?;

        let population = &self.population;
        if population.count > 0
            && (population.min_age > population.max_age
                || population.max_age >= self.villager.max_age)
        {
            return Err(ScenarioError::InvalidPopulationAges {
                min: population.min_age,
                max: population.max_age,
                max_age: self.villager.max_age,
            });
        }
        if let Some(males) = population.males {
            if males > population.count {
                return Err(ScenarioError::TooManyMales {
                    males,
                    count: population.count,
                });
            }
        }
        Ok(())
    }

    pub fn agent_params(&self) -> AgentParams {
        AgentParams {
            villager: self.villager.clone(),
            wolf: self.wolf.clone(),
            house: self.house.clone(),
        }
    }

    pub fn build_world(&self) -> World {
        let mut rng_manager = RngManager::new(self.seed ^ SETUP_SEED_SALT);
        let mut rng = rng_manager.stream("setup");
        let mut world = World::new(self.agent_params());

        let centre = match &self.settlement {
            Some(settings) => {
                world.found_settlement(settings.clone(), &mut rng);
                settings.position
            }
            None => {
                warn!(scenario = %self.name, "no settlement configured; housing and deposits are skipped");
                Vec2::ZERO
            }
        };
        for forest in &self.forests {
            world.add_forest(forest.clone(), &mut rng);
        }

        let population = &self.population;
        for n in 0..population.count {
            let gender = match population.males {
                Some(males) if n < males => Gender::Male,
                Some(_) => Gender::Female,
                None => Gender::random(&mut rng),
            };
            let age = rng.gen_range(population.min_age..=population.max_age);
            let position = rng.point_in_circle(centre, population.spawn_radius);
            world.spawn_villager(position, age, gender);
        }

        info!(
            scenario = %self.name,
            villagers = world.population(),
            wolves = world.wolf_count(),
            forests = world.forests().len(),
            "world built"
        );
        world
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(600)
    }
}

fn positive(field: &'static str, value: f32) -> error::Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ScenarioError::NonPositiveRadius { field, value })
    }
}

fn band(name: &'static str, band: AgeBand) -> error::Result<()> {
    if band.is_valid() {
        Ok(())
    } else {
        Err(ScenarioError::InvertedAgeBand {
            name,
            min: band.min,
            max: band.max,
        })
    }
}
