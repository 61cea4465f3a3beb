use glam::Vec2;
use serde::Serialize;

use crate::villager::Gender;
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub id: EntityId,
    pub gender: Gender,
}

/// A two-person house where pairs wait out the reproduction timer.
#[derive(Debug, Clone)]
pub struct House {
    pub id: EntityId,
    pub position: Vec2,
    occupants: Vec<Occupant>,
    timer: f32,
}

impl House {
    pub const CAPACITY: usize = 2;

    pub fn new(id: EntityId, position: Vec2) -> Self {
        Self {
            id,
            position,
            occupants: Vec::with_capacity(Self::CAPACITY),
            timer: 0.0,
        }
    }

    pub fn occupants(&self) -> &[Occupant] {
        &self.occupants
    }

    pub fn is_full(&self) -> bool {
        self.occupants.len() >= Self::CAPACITY
    }

    pub fn holds(&self, id: EntityId) -> bool {
        self.occupants.iter().any(|o| o.id == id)
    }

    /// Whether a villager of `gender` could still form a pair here.
    pub fn accepts(&self, gender: Gender) -> bool {
        match self.occupants.as_slice() {
            [] => true,
            [single] => single.gender != gender,
            _ => false,
        }
    }

    pub fn contains_point(&self, point: Vec2, detection_radius: f32) -> bool {
        self.position.distance(point) <= detection_radius
    }

    /// Returns `false` if the house is full or the villager is already inside.
    pub fn join(&mut self, id: EntityId, gender: Gender) -> bool {
        if self.is_full() || self.holds(id) {
            return false;
        }
        self.occupants.push(Occupant { id, gender });
        self.timer = 0.0;
        true
    }

    pub fn leave(&mut self, id: EntityId) -> bool {
        let before = self.occupants.len();
        self.occupants.retain(|o| o.id != id);
        let left = self.occupants.len() != before;
        if left {
            self.timer = 0.0;
        }
        left
    }

    pub fn evict_all(&mut self) -> Vec<Occupant> {
        self.timer = 0.0;
        std::mem::take(&mut self.occupants)
    }

    /// Advances the reproduction timer while `pair_ready` holds and resets it
    /// otherwise. Returns `true` when the timer completes.
    pub fn advance(&mut self, dt: f32, pair_ready: bool, duration: f32) -> bool {
        if !pair_ready {
            self.timer = 0.0;
            return false;
        }
        self.timer += dt;
        if self.timer >= duration {
            self.timer = 0.0;
            return true;
        }
        false
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::IdAllocator;

    fn house() -> (House, IdAllocator) {
        let mut ids = IdAllocator::default();
        let house = House::new(ids.allocate(), Vec2::ZERO);
        (house, ids)
    }

    #[test]
    fn holds_at_most_two() {
        let (mut house, mut ids) = house();
        let (a, b, c) = (ids.allocate(), ids.allocate(), ids.allocate());
        assert!(house.join(a, Gender::Male));
        assert!(!house.join(a, Gender::Male), "no duplicates");
        assert!(house.join(b, Gender::Female));
        assert!(!house.join(c, Gender::Female));
        assert_eq!(house.occupants().len(), House::CAPACITY);
    }

    #[test]
    fn accepts_only_the_opposite_gender_once_occupied() {
        let (mut house, mut ids) = house();
        assert!(house.accepts(Gender::Female));
        house.join(ids.allocate(), Gender::Male);
        assert!(house.accepts(Gender::Female));
        assert!(!house.accepts(Gender::Male));
    }

    #[test]
    fn interruption_restarts_the_timer() {
        let (mut house, _) = house();
        assert!(!house.advance(4.0, true, 10.0));
        assert!(!house.advance(4.0, true, 10.0));
        assert!(!house.advance(1.0, false, 10.0));
        assert_eq!(house.timer(), 0.0);
        assert!(!house.advance(9.0, true, 10.0));
        assert!(house.advance(1.0, true, 10.0));
        assert_eq!(house.timer(), 0.0);
    }

    #[test]
    fn leaving_resets_progress() {
        let (mut house, mut ids) = house();
        let a = ids.allocate();
        house.join(a, Gender::Male);
        house.advance(3.0, true, 10.0);
        assert!(house.leave(a));
        assert!(!house.leave(a));
        assert_eq!(house.timer(), 0.0);
    }
}
