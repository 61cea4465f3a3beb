//! Forests regrow trees and breed wolves, each on its own timer.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rng::RngExt;
use crate::world::{EntityId, IdAllocator};

fn default_radius() -> f32 {
    5.0
}

fn default_max_trees() -> usize {
    20
}

fn default_tree_yield() -> u32 {
    5
}

fn default_regeneration_secs() -> f32 {
    10.0
}

fn default_max_wolves() -> usize {
    5
}

fn default_wolf_spawn_secs() -> f32 {
    15.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestSettings {
    #[serde(default)]
    pub position: Vec2,
    #[serde(default = "default_radius")]
    pub radius: f32,
    #[serde(default = "default_max_trees")]
    pub max_trees: usize,
    #[serde(default)]
    pub initial_trees: usize,
    /// Resources a fresh tree holds.
    #[serde(default = "default_tree_yield")]
    pub tree_yield: u32,
    #[serde(default = "default_regeneration_secs")]
    pub regeneration_secs: f32,
    #[serde(default = "default_max_wolves")]
    pub max_wolves: usize,
    #[serde(default = "default_wolf_spawn_secs")]
    pub wolf_spawn_secs: f32,
    /// Wolves placed at setup; they count toward `max_wolves`.
    #[serde(default)]
    pub initial_wolves: usize,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            radius: default_radius(),
            max_trees: default_max_trees(),
            initial_trees: 0,
            tree_yield: default_tree_yield(),
            regeneration_secs: default_regeneration_secs(),
            max_wolves: default_max_wolves(),
            wolf_spawn_secs: default_wolf_spawn_secs(),
            initial_wolves: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub id: EntityId,
    pub position: Vec2,
    /// Remaining resources; the tree is gone once harvested.
    pub yield_left: u32,
}

/// What a forest produced during one update.
#[derive(Debug, Default, PartialEq)]
pub struct ForestGrowth {
    pub tree: Option<(EntityId, Vec2)>,
    /// Id and position for a wolf the caller must add to the roster.
    pub wolf: Option<(EntityId, Vec2)>,
}

#[derive(Debug, Clone)]
pub struct Forest {
    pub id: EntityId,
    settings: ForestSettings,
    trees: Vec<Tree>,
    wolves: BTreeSet<EntityId>,
    regen_timer: f32,
    spawn_timer: f32,
}

impl Forest {
    pub fn new(id: EntityId, settings: ForestSettings) -> Self {
        Self {
            id,
            settings,
            trees: Vec::new(),
            wolves: BTreeSet::new(),
            regen_timer: 0.0,
            spawn_timer: 0.0,
        }
    }

    /// Advances both timers. Each one resets only when it actually produces
    /// something, so a forest at its cap spawns as soon as room frees up.
    pub fn update(&mut self, dt: f32, ids: &mut IdAllocator, rng: &mut impl Rng) -> ForestGrowth {
        let mut growth = ForestGrowth::default();

        self.regen_timer += dt;
        if self.regen_timer >= self.settings.regeneration_secs {
            if let Some(tree) = self.plant_tree(ids, rng) {
                self.regen_timer = 0.0;
                growth.tree = Some(tree);
            }
        }

        self.spawn_timer += dt;
        if self.spawn_timer >= self.settings.wolf_spawn_secs
            && self.wolves.len() < self.settings.max_wolves
        {
            let id = ids.allocate();
            let position = rng.point_in_circle(self.settings.position, self.settings.radius);
            self.wolves.insert(id);
            self.spawn_timer = 0.0;
            growth.wolf = Some((id, position));
        }

        growth
    }

    /// Plants a tree at a random spot unless the forest is full.
    pub fn plant_tree(&mut self, ids: &mut IdAllocator, rng: &mut impl Rng) -> Option<(EntityId, Vec2)> {
        if self.trees.len() >= self.settings.max_trees {
            return None;
        }
        let id = ids.allocate();
        let position = rng.point_in_circle(self.settings.position, self.settings.radius);
        self.trees.push(Tree {
            id,
            position,
            yield_left: self.settings.tree_yield,
        });
        Some((id, position))
    }

    /// Takes the whole tree. Returns `None` if it is already gone.
    pub fn harvest(&mut self, tree: EntityId) -> Option<Tree> {
        let slot = self.trees.iter().position(|t| t.id == tree)?;
        Some(self.trees.remove(slot))
    }

    pub fn tree(&self, id: EntityId) -> Option<&Tree> {
        self.trees.iter().find(|t| t.id == id)
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Registers a wolf that belongs to this forest's cap.
    pub fn adopt_wolf(&mut self, wolf: EntityId) {
        self.wolves.insert(wolf);
    }

    pub fn forget_wolf(&mut self, wolf: EntityId) -> bool {
        self.wolves.remove(&wolf)
    }

    pub fn wolf_count(&self) -> usize {
        self.wolves.len()
    }

    pub fn position(&self) -> Vec2 {
        self.settings.position
    }

    pub fn radius(&self) -> f32 {
        self.settings.radius
    }

    pub fn settings(&self) -> &ForestSettings {
        &self.settings
    }
}
