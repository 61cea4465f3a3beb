//! Spatial index over every live entity.
//!
//! Backed by an R*-tree of points. The engine rebuilds it from committed
//! positions at the start of each tick, so agents stepping during a tick all
//! query the same snapshot; births and deaths are applied to it only at
//! commit time.

use std::collections::HashMap;

use glam::Vec2;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Villager,
    Wolf,
    House,
    Tree,
}

#[derive(Debug, Clone, PartialEq)]
struct IndexedEntity {
    id: EntityId,
    kind: EntityKind,
    position: [f32; 2],
}

impl RTreeObject for IndexedEntity {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl IndexedEntity {
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<IndexedEntity>,
    entries: HashMap<EntityId, IndexedEntity>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole index in one bulk load.
    pub fn rebuild(&mut self, entities: impl IntoIterator<Item = (EntityId, EntityKind, Vec2)>) {
        self.entries = entities
            .into_iter()
            .map(|(id, kind, position)| {
                (
                    id,
                    IndexedEntity {
                        id,
                        kind,
                        position: position.to_array(),
                    },
                )
            })
            .collect();
        self.tree = RTree::bulk_load(self.entries.values().cloned().collect());
    }

    /// Inserts an entity, replacing any previous entry with the same id.
    pub fn insert(&mut self, id: EntityId, kind: EntityKind, position: Vec2) {
        self.remove(id);
        let entry = IndexedEntity {
            id,
            kind,
            position: position.to_array(),
        };
        self.tree.insert(entry.clone());
        self.entries.insert(id, entry);
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.tree.remove(&entry);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn position(&self, id: EntityId) -> Option<Vec2> {
        self.entries.get(&id).map(|e| Vec2::from_array(e.position))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest entity of `kind` within `max_radius` (inclusive) of `point`.
    /// Equidistant candidates resolve to the lowest id.
    pub fn nearest(&self, kind: EntityKind, point: Vec2, max_radius: f32) -> Option<EntityId> {
        self.nearest_matching(kind, point, max_radius, |_| true)
    }

    /// Like [`nearest`](Self::nearest), skipping candidates rejected by `accept`.
    pub fn nearest_matching<F>(
        &self,
        kind: EntityKind,
        point: Vec2,
        max_radius: f32,
        mut accept: F,
    ) -> Option<EntityId>
    where
        F: FnMut(EntityId) -> bool,
    {
        let origin = point.to_array();
        let candidates: Box<dyn Iterator<Item = &IndexedEntity> + '_> = if max_radius.is_finite() {
            if max_radius < 0.0 {
                return None;
            }
            Box::new(self.tree.locate_in_envelope_intersecting(&envelope_around(point, max_radius)))
        } else {
            Box::new(self.tree.iter())
        };
        let max_d2 = max_radius * max_radius;
        let mut best: Option<(f32, EntityId)> = None;
        for entry in candidates {
            if entry.kind != kind {
                continue;
            }
            let d2 = entry.distance_2(&origin);
            if d2 > max_d2 || !accept(entry.id) {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_d2, best_id)) => d2 < best_d2 || (d2 == best_d2 && entry.id < best_id),
            };
            if better {
                best = Some((d2, entry.id));
            }
        }
        best.map(|(_, id)| id)
    }

    /// Every entity of `kind` within `radius` (inclusive) of `point`, ordered by id.
    pub fn query_radius(&self, kind: EntityKind, point: Vec2, radius: f32) -> Vec<EntityId> {
        if radius < 0.0 {
            return Vec::new();
        }
        let origin = point.to_array();
        let r2 = radius * radius;
        let mut ids: Vec<EntityId> = self
            .tree
            .locate_in_envelope_intersecting(&envelope_around(point, radius))
            .filter(|entry| entry.kind == kind && entry.distance_2(&origin) <= r2)
            .map(|entry| entry.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Moves from `from` toward `to` by at most `max_step`, never overshooting.
pub fn step_toward(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let offset = to - from;
    let distance = offset.length();
    if max_step <= 0.0 || distance <= f32::EPSILON {
        return from;
    }
    if distance <= max_step {
        to
    } else {
        from + offset / distance * max_step
    }
}

fn envelope_around(point: Vec2, radius: f32) -> AABB<[f32; 2]> {
    AABB::from_corners(
        [point.x - radius, point.y - radius],
        [point.x + radius, point.y + radius],
    )
}
