use std::collections::BTreeMap;
use std::fmt;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AgentParams;
use crate::events::{RemovalCause, SimEvent};
use crate::forest::{Forest, ForestSettings};
use crate::rng::RngExt;
use crate::settlement::{Settlement, SettlementSettings};
use crate::snapshot::WorldSnapshot;
use crate::spatial::{EntityKind, SpatialIndex};
use crate::villager::{Gender, Villager};
use crate::wolf::Wolf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out ids in creation order, shared by every entity kind.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }
}

/// Structural changes collected while systems run and applied by
/// [`World::commit`].
#[derive(Debug, Default)]
pub struct TickBuffer {
    pub kills: Vec<(EntityId, RemovalCause)>,
    pub villager_births: Vec<Villager>,
    pub wolf_births: Vec<Wolf>,
    /// Lifecycle events in the order they happened.
    pub events: Vec<SimEvent>,
}

impl TickBuffer {
    pub fn kill(&mut self, id: EntityId, cause: RemovalCause, kind: EntityKind) {
        self.kills.push((id, cause));
        let event = match kind {
            EntityKind::Wolf => SimEvent::WolfRemoved { id, cause },
            _ => SimEvent::VillagerRemoved { id, cause },
        };
        self.events.push(event);
    }

    pub fn birth(&mut self, villager: Villager) {
        self.events.push(SimEvent::VillagerSpawned {
            id: villager.id,
            position: villager.position,
            gender: villager.gender,
            age: villager.age,
        });
        self.villager_births.push(villager);
    }

    pub fn wolf_birth(&mut self, wolf: Wolf) {
        self.events.push(SimEvent::WolfSpawned {
            id: wolf.id,
            position: wolf.position,
        });
        self.wolf_births.push(wolf);
    }

    pub fn is_empty(&self) -> bool {
        self.kills.is_empty()
            && self.villager_births.is_empty()
            && self.wolf_births.is_empty()
            && self.events.is_empty()
    }
}

pub struct World {
    pub(crate) ids: IdAllocator,
    pub(crate) tick: u64,
    pub(crate) elapsed_secs: f64,
    pub(crate) params: AgentParams,
    pub(crate) settlement: Option<Settlement>,
    pub(crate) forests: Vec<Forest>,
    pub(crate) villagers: BTreeMap<EntityId, Villager>,
    pub(crate) wolves: BTreeMap<EntityId, Wolf>,
    pub(crate) index: SpatialIndex,
    pub(crate) pending: TickBuffer,
}

impl World {
    pub fn new(params: AgentParams) -> Self {
        Self {
            ids: IdAllocator::default(),
            tick: 0,
            elapsed_secs: 0.0,
            params,
            settlement: None,
            forests: Vec::new(),
            villagers: BTreeMap::new(),
            wolves: BTreeMap::new(),
            index: SpatialIndex::new(),
            pending: TickBuffer::default(),
        }
    }

    /// Builds the settlement and its starting houses. Replaces any previous one.
    pub fn found_settlement(&mut self, settings: SettlementSettings, rng: &mut impl Rng) -> EntityId {
        let id = self.ids.allocate();
        let mut settlement = Settlement::new(id, settings);
        for (house_id, position) in settlement.build_initial_houses(&mut self.ids, rng) {
            self.index.insert(house_id, EntityKind::House, position);
            self.pending.events.push(SimEvent::HouseBuilt {
                id: house_id,
                position,
            });
        }
        self.settlement = Some(settlement);
        id
    }

    pub fn add_forest(&mut self, settings: ForestSettings, rng: &mut impl Rng) -> EntityId {
        let id = self.ids.allocate();
        let mut forest = Forest::new(id, settings);
        for _ in 0..forest.settings().initial_trees {
            if let Some((tree_id, position)) = forest.plant_tree(&mut self.ids, rng) {
                self.index.insert(tree_id, EntityKind::Tree, position);
                self.pending
                    .events
                    .push(SimEvent::TreeSpawned { id: tree_id, position });
            }
        }
        for _ in 0..forest.settings().initial_wolves {
            let position = rng.point_in_circle(forest.position(), forest.radius());
            let wolf = self.spawn_wolf(position);
            forest.adopt_wolf(wolf);
        }
        self.forests.push(forest);
        id
    }

    /// Adds a villager to the roster immediately. Meant for world setup;
    /// systems go through [`TickBuffer::birth`] instead.
    pub fn spawn_villager(&mut self, position: Vec2, age: u32, gender: Gender) -> EntityId {
        let id = self.ids.allocate();
        let villager = Villager::new(id, position, age, gender, &self.params.villager);
        self.pending.events.push(SimEvent::VillagerSpawned {
            id,
            position,
            gender,
            age,
        });
        self.index.insert(id, EntityKind::Villager, position);
        self.villagers.insert(id, villager);
        id
    }

    pub fn spawn_wolf(&mut self, position: Vec2) -> EntityId {
        let id = self.ids.allocate();
        self.pending.events.push(SimEvent::WolfSpawned { id, position });
        self.index.insert(id, EntityKind::Wolf, position);
        self.wolves.insert(id, Wolf::new(id, position, &self.params.wolf));
        id
    }

    /// Rebuilds the spatial index from committed positions.
    pub fn refresh_index(&mut self) {
        let villagers = self
            .villagers
            .values()
            .filter(|v| v.alive)
            .map(|v| (v.id, EntityKind::Villager, v.position));
        let wolves = self
            .wolves
            .values()
            .filter(|w| w.alive)
            .map(|w| (w.id, EntityKind::Wolf, w.position));
        let houses = self
            .settlement
            .iter()
            .flat_map(|s| s.houses())
            .map(|h| (h.id, EntityKind::House, h.position));
        let trees = self
            .forests
            .iter()
            .flat_map(|f| f.trees())
            .map(|t| (t.id, EntityKind::Tree, t.position));
        let entries: Vec<_> = villagers.chain(wolves).chain(houses).chain(trees).collect();
        self.index.rebuild(entries);
    }

    /// Applies the deferred kills and births and returns the tick's events.
    pub fn commit(&mut self) -> Vec<SimEvent> {
        let pending = std::mem::take(&mut self.pending);

        for (id, cause) in pending.kills {
            if self.villagers.remove(&id).is_some() {
                if let Some(settlement) = self.settlement.as_mut() {
                    settlement.evict(id);
                }
                for wolf in self.wolves.values_mut() {
                    if wolf.target == Some(id) {
                        wolf.target = None;
                    }
                }
                debug!(villager = %id, ?cause, "villager removed");
            } else if self.wolves.remove(&id).is_some() {
                for forest in &mut self.forests {
                    forest.forget_wolf(id);
                }
                debug!(wolf = %id, ?cause, "wolf removed");
            }
            self.index.remove(id);
        }

        for villager in pending.villager_births {
            self.index
                .insert(villager.id, EntityKind::Villager, villager.position);
            self.villagers.insert(villager.id, villager);
        }
        for wolf in pending.wolf_births {
            self.index.insert(wolf.id, EntityKind::Wolf, wolf.position);
            self.wolves.insert(wolf.id, wolf);
        }

        for event in &pending.events {
            match *event {
                SimEvent::HouseBuilt { id, position } => {
                    self.index.insert(id, EntityKind::House, position)
                }
                SimEvent::TreeSpawned { id, position } => {
                    self.index.insert(id, EntityKind::Tree, position)
                }
                SimEvent::TreeRemoved { id, .. } => {
                    self.index.remove(id);
                }
                _ => {}
            }
        }

        pending.events
    }

    pub fn advance_time(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed_secs += f64::from(dt);
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut AgentParams {
        &mut self.params
    }

    pub fn villager(&self, id: EntityId) -> Option<&Villager> {
        self.villagers.get(&id)
    }

    pub fn villager_mut(&mut self, id: EntityId) -> Option<&mut Villager> {
        self.villagers.get_mut(&id)
    }

    pub fn villagers(&self) -> impl Iterator<Item = &Villager> {
        self.villagers.values()
    }

    pub fn wolf(&self, id: EntityId) -> Option<&Wolf> {
        self.wolves.get(&id)
    }

    pub fn wolf_mut(&mut self, id: EntityId) -> Option<&mut Wolf> {
        self.wolves.get_mut(&id)
    }

    pub fn wolves(&self) -> impl Iterator<Item = &Wolf> {
        self.wolves.values()
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub fn settlement_mut(&mut self) -> Option<&mut Settlement> {
        self.settlement.as_mut()
    }

    pub fn forests(&self) -> &[Forest] {
        &self.forests
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn population(&self) -> usize {
        self.villagers.values().filter(|v| v.alive).count()
    }

    pub fn wolf_count(&self) -> usize {
        self.wolves.values().filter(|w| w.alive).count()
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        WorldSnapshot::capture(self, scenario)
    }
}
