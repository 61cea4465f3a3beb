//! Tunable parameters for the agents.
//!
//! Every field has a serde default, so a scenario only needs to spell out the
//! values it wants to change.

use serde::{Deserialize, Serialize};

/// Inclusive age range in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min: u32,
    pub max: u32,
}

impl AgeBand {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

fn default_secs_per_year() -> f32 {
    2.0
}

fn default_villager_max_age() -> u32 {
    100
}

fn default_carry_capacity() -> u32 {
    10
}

fn default_villager_speed() -> f32 {
    2.0
}

fn default_fertile_band() -> AgeBand {
    AgeBand::new(20, 60)
}

fn default_working_band() -> AgeBand {
    AgeBand::new(15, 60)
}

fn default_departure_rate() -> f32 {
    0.06
}

fn default_reproduction_rate() -> f32 {
    0.03
}

fn default_villager_vision() -> f32 {
    4.0
}

fn default_group_radius() -> f32 {
    2.0
}

fn default_arrival_threshold() -> f32 {
    1.5
}

fn default_waypoint_threshold() -> f32 {
    0.25
}

fn default_forest_arrival() -> f32 {
    0.5
}

fn default_harvest_reach() -> f32 {
    0.5
}

fn default_tree_search_radius() -> f32 {
    f32::INFINITY
}

fn default_flee_multiplier() -> f32 {
    1.5
}

fn default_flee_boost_secs() -> f32 {
    3.0
}

fn default_flee_timeout_secs() -> f32 {
    8.0
}

fn default_max_energy() -> f32 {
    100.0
}

fn default_energy_drain() -> f32 {
    0.5
}

fn default_energy_regen() -> f32 {
    5.0
}

fn default_low_energy() -> f32 {
    20.0
}

fn default_patience_secs() -> f32 {
    30.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VillagerParams {
    /// Seconds of simulated time per year of age.
    #[serde(default = "default_secs_per_year")]
    pub secs_per_year: f32,
    #[serde(default = "default_villager_max_age")]
    pub max_age: u32,
    #[serde(default = "default_carry_capacity")]
    pub carry_capacity: u32,
    #[serde(default = "default_villager_speed")]
    pub base_speed: f32,
    #[serde(default = "default_fertile_band")]
    pub fertile_band: AgeBand,
    #[serde(default = "default_working_band")]
    pub working_band: AgeBand,
    /// Per-second hazard of leaving the settlement to gather.
    #[serde(default = "default_departure_rate")]
    pub departure_rate: f32,
    /// Per-second hazard of going to look for a house to pair up in.
    #[serde(default = "default_reproduction_rate")]
    pub reproduction_rate: f32,
    #[serde(default = "default_villager_vision")]
    pub vision_range: f32,
    #[serde(default = "default_group_radius")]
    pub group_radius: f32,
    #[serde(default = "default_arrival_threshold")]
    pub arrival_threshold: f32,
    #[serde(default = "default_waypoint_threshold")]
    pub waypoint_threshold: f32,
    #[serde(default = "default_forest_arrival")]
    pub forest_arrival_threshold: f32,
    #[serde(default = "default_harvest_reach")]
    pub harvest_reach: f32,
    #[serde(default = "default_tree_search_radius")]
    pub tree_search_radius: f32,
    #[serde(default = "default_flee_multiplier")]
    pub flee_speed_multiplier: f32,
    #[serde(default = "default_flee_boost_secs")]
    pub flee_boost_secs: f32,
    #[serde(default = "default_flee_timeout_secs")]
    pub flee_timeout_secs: f32,
    #[serde(default = "default_max_energy")]
    pub max_energy: f32,
    /// Drain while away from the settlement.
    #[serde(default = "default_energy_drain")]
    pub energy_drain_per_sec: f32,
    /// Regeneration while resting near the settlement centre.
    #[serde(default = "default_energy_regen")]
    pub energy_regen_per_sec: f32,
    /// Gatherers below this head home early.
    #[serde(default = "default_low_energy")]
    pub low_energy: f32,
    #[serde(default = "default_patience_secs")]
    pub reproduction_patience_secs: f32,
}

impl Default for VillagerParams {
    fn default() -> Self {
        Self {
            secs_per_year: default_secs_per_year(),
            max_age: default_villager_max_age(),
            carry_capacity: default_carry_capacity(),
            base_speed: default_villager_speed(),
            fertile_band: default_fertile_band(),
            working_band: default_working_band(),
            departure_rate: default_departure_rate(),
            reproduction_rate: default_reproduction_rate(),
            vision_range: default_villager_vision(),
            group_radius: default_group_radius(),
            arrival_threshold: default_arrival_threshold(),
            waypoint_threshold: default_waypoint_threshold(),
            forest_arrival_threshold: default_forest_arrival(),
            harvest_reach: default_harvest_reach(),
            tree_search_radius: default_tree_search_radius(),
            flee_speed_multiplier: default_flee_multiplier(),
            flee_boost_secs: default_flee_boost_secs(),
            flee_timeout_secs: default_flee_timeout_secs(),
            max_energy: default_max_energy(),
            energy_drain_per_sec: default_energy_drain(),
            energy_regen_per_sec: default_energy_regen(),
            low_energy: default_low_energy(),
            reproduction_patience_secs: default_patience_secs(),
        }
    }
}

fn default_wolf_speed() -> f32 {
    2.0
}

fn default_wolf_vision() -> f32 {
    5.0
}

fn default_attack_range() -> f32 {
    1.0
}

fn default_attack_cooldown() -> f32 {
    1.0
}

fn default_eat_secs() -> f32 {
    2.0
}

fn default_flee_distance() -> f32 {
    5.0
}

fn default_avoidance_margin() -> f32 {
    1.0
}

fn default_flee_clear_buffer() -> f32 {
    1.0
}

fn default_max_flee_secs() -> f32 {
    3.0
}

fn default_failed_hunt_secs() -> f32 {
    2.0
}

fn default_patrol_radius() -> f32 {
    4.0
}

fn default_wolf_max_age() -> u32 {
    40
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WolfParams {
    #[serde(default = "default_wolf_speed")]
    pub speed: f32,
    #[serde(default = "default_wolf_vision")]
    pub vision_range: f32,
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
    #[serde(default = "default_attack_cooldown")]
    pub attack_cooldown_secs: f32,
    #[serde(default = "default_eat_secs")]
    pub eat_secs: f32,
    #[serde(default = "default_flee_distance")]
    pub flee_distance: f32,
    /// Distance from the settlement collider edge that triggers a flee.
    #[serde(default = "default_avoidance_margin")]
    pub avoidance_margin: f32,
    #[serde(default = "default_flee_clear_buffer")]
    pub flee_clear_buffer: f32,
    #[serde(default = "default_max_flee_secs")]
    pub max_flee_secs: f32,
    #[serde(default = "default_failed_hunt_secs")]
    pub failed_hunt_secs: f32,
    #[serde(default = "default_patrol_radius")]
    pub patrol_radius: f32,
    #[serde(default = "default_waypoint_threshold")]
    pub waypoint_threshold: f32,
    #[serde(default = "default_secs_per_year")]
    pub secs_per_year: f32,
    #[serde(default = "default_wolf_max_age")]
    pub max_age: u32,
}

impl Default for WolfParams {
    fn default() -> Self {
        Self {
            speed: default_wolf_speed(),
            vision_range: default_wolf_vision(),
            attack_range: default_attack_range(),
            attack_cooldown_secs: default_attack_cooldown(),
            eat_secs: default_eat_secs(),
            flee_distance: default_flee_distance(),
            avoidance_margin: default_avoidance_margin(),
            flee_clear_buffer: default_flee_clear_buffer(),
            max_flee_secs: default_max_flee_secs(),
            failed_hunt_secs: default_failed_hunt_secs(),
            patrol_radius: default_patrol_radius(),
            waypoint_threshold: default_waypoint_threshold(),
            secs_per_year: default_secs_per_year(),
            max_age: default_wolf_max_age(),
        }
    }
}

fn default_detection_radius() -> f32 {
    2.0
}

fn default_reproduction_secs() -> f32 {
    10.0
}

fn default_min_parent_age() -> u32 {
    20
}

fn default_child_spawn_radius() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseParams {
    #[serde(default = "default_detection_radius")]
    pub detection_radius: f32,
    #[serde(default = "default_reproduction_secs")]
    pub reproduction_secs: f32,
    #[serde(default = "default_min_parent_age")]
    pub min_parent_age: u32,
    #[serde(default = "default_child_spawn_radius")]
    pub child_spawn_radius: f32,
}

impl Default for HouseParams {
    fn default() -> Self {
        Self {
            detection_radius: default_detection_radius(),
            reproduction_secs: default_reproduction_secs(),
            min_parent_age: default_min_parent_age(),
            child_spawn_radius: default_child_spawn_radius(),
        }
    }
}

/// Everything the agent systems read, bundled so the world carries one copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentParams {
    #[serde(default)]
    pub villager: VillagerParams,
    #[serde(default)]
    pub wolf: WolfParams,
    #[serde(default)]
    pub house: HouseParams,
}
