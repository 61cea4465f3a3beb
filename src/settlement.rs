//! The village: resource stock, houses and the collider wolves keep away from.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dwelling::House;
use crate::rng::RngExt;
use crate::world::{EntityId, IdAllocator};

fn default_radius() -> f32 {
    1.5
}

fn default_capacity() -> u32 {
    200
}

fn default_resources_per_house() -> u32 {
    20
}

fn default_initial_houses() -> u32 {
    1
}

fn default_min_distance_from_center() -> f32 {
    1.0
}

fn default_house_spacing() -> f32 {
    1.0
}

fn default_placement_radius() -> f32 {
    3.0
}

fn default_placement_attempts() -> u32 {
    40
}

fn default_wander_radius() -> f32 {
    3.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSettings {
    #[serde(default)]
    pub position: Vec2,
    /// Collider radius. Wolves measure their avoidance margin from its edge.
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default = "default_resources_per_house")]
    pub resources_per_house: u32,
    #[serde(default)]
    pub initial_stock: u32,
    #[serde(default = "default_initial_houses")]
    pub initial_houses: u32,
    #[serde(default = "default_min_distance_from_center")]
    pub house_min_distance_from_center: f32,
    #[serde(default = "default_house_spacing")]
    pub house_min_spacing: f32,
    #[serde(default = "default_placement_radius")]
    pub house_placement_radius: f32,
    #[serde(default = "default_placement_attempts")]
    pub house_placement_attempts: u32,
    /// Resting villagers wander inside this radius.
    #[serde(default = "default_wander_radius")]
    pub wander_radius: f32,
}

impl Default for SettlementSettings {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            radius: default_radius(),
            capacity: default_capacity(),
            resources_per_house: default_resources_per_house(),
            initial_stock: 0,
            initial_houses: default_initial_houses(),
            house_min_distance_from_center: default_min_distance_from_center(),
            house_min_spacing: default_house_spacing(),
            house_placement_radius: default_placement_radius(),
            house_placement_attempts: default_placement_attempts(),
            wander_radius: default_wander_radius(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settlement {
    pub id: EntityId,
    settings: SettlementSettings,
    stock: u32,
    houses: Vec<House>,
}

impl Settlement {
    pub fn new(id: EntityId, settings: SettlementSettings) -> Self {
        let stock = settings.initial_stock.min(settings.capacity);
        Self {
            id,
            settings,
            stock,
            houses: Vec::new(),
        }
    }

    /// Builds the starting houses plus whatever the initial stock pays for.
    pub fn build_initial_houses(
        &mut self,
        ids: &mut IdAllocator,
        rng: &mut impl Rng,
    ) -> Vec<(EntityId, Vec2)> {
        let mut built = Vec::new();
        for _ in 0..self.settings.initial_houses {
            built.push(self.build_house(ids, rng));
        }
        built.extend(self.ensure_houses(ids, rng));
        built
    }

    /// Adds to the stock, clamped to capacity, then builds the houses the new
    /// stock pays for. Returns the houses built.
    pub fn deposit(
        &mut self,
        amount: u32,
        ids: &mut IdAllocator,
        rng: &mut impl Rng,
    ) -> Vec<(EntityId, Vec2)> {
        self.stock = self.stock.saturating_add(amount).min(self.settings.capacity);
        debug!(amount, stock = self.stock, "resources deposited");
        self.ensure_houses(ids, rng)
    }

    pub fn expected_houses(&self) -> usize {
        if self.settings.resources_per_house == 0 {
            return 0;
        }
        (self.stock / self.settings.resources_per_house) as usize
    }

    /// Builds houses until the count matches what the stock pays for.
    pub fn ensure_houses(
        &mut self,
        ids: &mut IdAllocator,
        rng: &mut impl Rng,
    ) -> Vec<(EntityId, Vec2)> {
        let mut built = Vec::new();
        while self.houses.len() < self.expected_houses() {
            built.push(self.build_house(ids, rng));
        }
        built
    }

    fn build_house(&mut self, ids: &mut IdAllocator, rng: &mut impl Rng) -> (EntityId, Vec2) {
        let position = self.place_house(rng);
        let id = ids.allocate();
        self.houses.push(House::new(id, position));
        debug!(house = %id, x = position.x, y = position.y, "house built");
        (id, position)
    }

    fn place_house(&self, rng: &mut impl Rng) -> Vec2 {
        let centre = self.settings.position;
        let mut candidate = centre;
        for _ in 0..self.settings.house_placement_attempts.max(1) {
            candidate = rng.point_in_circle(centre, self.settings.house_placement_radius);
            let clear_of_centre =
                candidate.distance(centre) >= self.settings.house_min_distance_from_center;
            let spaced = self
                .houses
                .iter()
                .all(|h| h.position.distance(candidate) >= self.settings.house_min_spacing);
            if clear_of_centre && spaced {
                return candidate;
            }
        }
        warn!(
            attempts = self.settings.house_placement_attempts,
            "no house site satisfied the spacing rules, using the last sample"
        );
        candidate
    }

    /// Removes a villager from whichever house holds it.
    pub fn evict(&mut self, villager: EntityId) {
        for house in &mut self.houses {
            house.leave(villager);
        }
    }

    pub fn position(&self) -> Vec2 {
        self.settings.position
    }

    pub fn radius(&self) -> f32 {
        self.settings.radius
    }

    pub fn wander_radius(&self) -> f32 {
        self.settings.wander_radius
    }

    /// Inside the collider.
    pub fn contains(&self, point: Vec2) -> bool {
        self.distance_to_centre(point) <= self.settings.radius
    }

    pub fn distance_to_centre(&self, point: Vec2) -> f32 {
        point.distance(self.settings.position)
    }

    /// Distance from the collider edge; negative inside.
    pub fn distance_to_edge(&self, point: Vec2) -> f32 {
        self.distance_to_centre(point) - self.settings.radius
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn capacity(&self) -> u32 {
        self.settings.capacity
    }

    pub fn settings(&self) -> &SettlementSettings {
        &self.settings
    }

    pub fn houses(&self) -> &[House] {
        &self.houses
    }

    pub fn house(&self, id: EntityId) -> Option<&House> {
        self.houses.iter().find(|h| h.id == id)
    }

    pub fn house_mut(&mut self, id: EntityId) -> Option<&mut House> {
        self.houses.iter_mut().find(|h| h.id == id)
    }

    pub(crate) fn houses_mut(&mut self) -> &mut [House] {
        &mut self.houses
    }
}
