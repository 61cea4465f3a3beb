use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::config::WolfParams;
use crate::villager::accrue_years;
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WolfState {
    Patrol,
    Chase,
    Attack,
    Eat,
    /// Backing away from the settlement.
    Flee,
    /// The prey made it into the settlement.
    FailedHunt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wolf {
    pub id: EntityId,
    pub position: Vec2,
    pub age: u32,
    pub max_age: u32,
    pub alive: bool,
    pub state: WolfState,
    /// Prey being chased or attacked. Re-resolved every tick.
    pub target: Option<EntityId>,
    pub destination: Vec2,
    /// Seconds in the current state; doubles as the attack cooldown.
    pub timer: f32,
    age_timer: f32,
}

impl Wolf {
    pub fn new(id: EntityId, position: Vec2, params: &WolfParams) -> Self {
        Self {
            id,
            position,
            age: 0,
            max_age: params.max_age,
            alive: true,
            state: WolfState::Patrol,
            target: None,
            destination: position,
            timer: 0.0,
            age_timer: 0.0,
        }
    }

    /// Switches state and restarts the state timer, even when re-entering the
    /// same state.
    pub fn set_state(&mut self, state: WolfState) {
        self.state = state;
        self.timer = 0.0;
        if !matches!(state, WolfState::Chase | WolfState::Attack) {
            self.target = None;
        }
    }

    /// Returns `true` once the wolf has reached its max age.
    pub fn advance_age(&mut self, dt: f32, secs_per_year: f32) -> bool {
        if !self.alive {
            return false;
        }
        let years = accrue_years(&mut self.age_timer, dt, secs_per_year);
        self.age = self.age.saturating_add(years);
        if self.age >= self.max_age {
            self.age = self.max_age;
            self.alive = false;
            self.target = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::IdAllocator;

    #[test]
    fn leaving_the_hunt_clears_the_target() {
        let params = WolfParams::default();
        let mut ids = IdAllocator::default();
        let mut wolf = Wolf::new(ids.allocate(), Vec2::ZERO, &params);
        let prey = ids.allocate();
        wolf.target = Some(prey);
        wolf.set_state(WolfState::Chase);
        assert_eq!(wolf.target, Some(prey));
        wolf.set_state(WolfState::Attack);
        assert_eq!(wolf.target, Some(prey));
        wolf.set_state(WolfState::Eat);
        assert_eq!(wolf.target, None);
    }

    #[test]
    fn huge_step_kills_without_spinning() {
        let params = WolfParams::default();
        let mut ids = IdAllocator::default();
        let mut wolf = Wolf::new(ids.allocate(), Vec2::ZERO, &params);
        assert!(wolf.advance_age(1e8, params.secs_per_year));
        assert_eq!(wolf.age, wolf.max_age);
    }

    #[test]
    fn dies_of_old_age() {
        let params = WolfParams {
            max_age: 2,
            ..WolfParams::default()
        };
        let mut ids = IdAllocator::default();
        let mut wolf = Wolf::new(ids.allocate(), Vec2::ZERO, &params);
        assert!(!wolf.advance_age(params.secs_per_year, params.secs_per_year));
        assert!(wolf.advance_age(params.secs_per_year, params.secs_per_year));
        assert!(!wolf.alive);
    }
}
