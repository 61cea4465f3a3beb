use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{AgeBand, VillagerParams};
use crate::world::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        if rng.gen_bool(0.5) {
            Gender::Male
        } else {
            Gender::Female
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VillagerState {
    /// Wandering inside the settlement.
    Resting,
    /// Looking for, or waiting inside, a house.
    Reproducing,
    /// Walking to a point inside a forest.
    Traveling,
    Gathering,
    /// Carrying resources home.
    Returning,
    Fleeing,
    /// Moving with nearby peers; wolves ignore grouped villagers.
    Grouped,
    Dead,
}

impl VillagerState {
    /// States a wolf sighting may not interrupt.
    pub fn is_protected(self) -> bool {
        matches!(self, VillagerState::Reproducing | VillagerState::Dead)
    }

    /// States that need a villager of working age.
    pub fn needs_working_age(self) -> bool {
        matches!(self, VillagerState::Traveling | VillagerState::Gathering)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Villager {
    pub id: EntityId,
    pub position: Vec2,
    pub age: u32,
    pub max_age: u32,
    pub alive: bool,
    pub gender: Gender,
    pub energy: f32,
    pub carried: u32,
    pub state: VillagerState,
    pub destination: Vec2,
    /// House this villager currently occupies.
    pub dwelling: Option<EntityId>,
    /// Forest picked for the current gathering trip.
    pub forest: Option<EntityId>,
    pub nearby_peers: usize,
    /// Seconds spent in the current state.
    pub state_timer: f32,
    age_timer: f32,
}

impl Villager {
    pub fn new(id: EntityId, position: Vec2, age: u32, gender: Gender, params: &VillagerParams) -> Self {
        Self {
            id,
            position,
            age,
            max_age: params.max_age,
            alive: true,
            gender,
            energy: params.max_energy,
            carried: 0,
            state: VillagerState::Resting,
            destination: position,
            dwelling: None,
            forest: None,
            nearby_peers: 0,
            state_timer: 0.0,
            age_timer: 0.0,
        }
    }

    pub fn newborn(id: EntityId, position: Vec2, gender: Gender, params: &VillagerParams) -> Self {
        Self::new(id, position, 0, gender, params)
    }

    pub fn set_state(&mut self, state: VillagerState) {
        if self.state != state {
            self.state = state;
            self.state_timer = 0.0;
        }
    }

    /// Wolves leave a villager alone while it is grouped or has a peer within
    /// the group radius.
    pub fn is_grouped(&self) -> bool {
        self.state == VillagerState::Grouped || self.nearby_peers > 0
    }

    /// Advances the aging clock. Returns `true` when the villager reached its
    /// max age and is now dead.
    pub fn advance_age(&mut self, dt: f32, secs_per_year: f32) -> bool {
        if !self.alive {
            return false;
        }
        let years = accrue_years(&mut self.age_timer, dt, secs_per_year);
        self.age = self.age.saturating_add(years);
        if self.age >= self.max_age {
            self.age = self.max_age;
            self.die();
            return true;
        }
        false
    }

    pub fn die(&mut self) {
        self.alive = false;
        self.state = VillagerState::Dead;
        self.dwelling = None;
    }

    /// Adds to the carried load, capped at `capacity`. Returns how much was accepted.
    pub fn load(&mut self, amount: u32, capacity: u32) -> u32 {
        let room = capacity.saturating_sub(self.carried);
        let accepted = amount.min(room);
        self.carried += accepted;
        accepted
    }

    pub fn unload(&mut self) -> u32 {
        std::mem::take(&mut self.carried)
    }

    pub fn is_full(&self, capacity: u32) -> bool {
        self.carried >= capacity
    }

    /// Locomotion speed for the current state and age, before flee boosts.
    pub fn speed(&self, params: &VillagerParams) -> f32 {
        if self.state.needs_working_age() && !params.working_band.contains(self.age) {
            return 0.0;
        }
        params.base_speed * age_speed_factor(self.age, params.working_band, self.max_age)
    }
}

/// Adds `dt` to an aging clock and returns the whole years it completed,
/// keeping only the remainder. Runs in constant time for any step length.
pub(crate) fn accrue_years(timer: &mut f32, dt: f32, secs_per_year: f32) -> u32 {
    if !(secs_per_year > 0.0) || !dt.is_finite() {
        return 0;
    }
    *timer += dt;
    if *timer < secs_per_year {
        return 0;
    }
    let years = (*timer / secs_per_year).floor();
    *timer %= secs_per_year;
    // float-to-int casts saturate
    years as u32
}

/// 1.0 inside the working band; children ramp up towards it and elders slow
/// down to a quarter speed at max age.
pub fn age_speed_factor(age: u32, band: AgeBand, max_age: u32) -> f32 {
    if band.contains(age) {
        1.0
    } else if age < band.min {
        0.4 + 0.6 * age as f32 / band.min.max(1) as f32
    } else {
        let span = max_age.saturating_sub(band.max).max(1) as f32;
        let over = (age - band.max) as f32 / span;
        1.0 - 0.75 * over.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::IdAllocator;

    fn villager(age: u32) -> (Villager, VillagerParams) {
        let params = VillagerParams::default();
        let mut ids = IdAllocator::default();
        let v = Villager::new(ids.allocate(), Vec2::ZERO, age, Gender::Female, &params);
        (v, params)
    }

    #[test]
    fn ages_on_fixed_cadence() {
        let (mut v, params) = villager(10);
        for _ in 0..3 {
            assert!(!v.advance_age(0.5, params.secs_per_year));
        }
        assert_eq!(v.age, 10);
        v.advance_age(0.5, params.secs_per_year);
        assert_eq!(v.age, 11);
        v.advance_age(4.0, params.secs_per_year);
        assert_eq!(v.age, 13);
    }

    #[test]
    fn reaching_max_age_kills() {
        let (mut v, params) = villager(99);
        assert!(v.advance_age(2.0, params.secs_per_year));
        assert!(!v.alive);
        assert_eq!(v.state, VillagerState::Dead);
        assert_eq!(v.age, v.max_age);
    }

    #[test]
    fn huge_step_ages_in_one_go() {
        let (mut v, params) = villager(10);
        assert!(v.advance_age(1e8, params.secs_per_year));
        assert_eq!(v.age, v.max_age);
        assert!(!v.alive);
    }

    #[test]
    fn accrue_years_keeps_the_remainder() {
        let mut timer = 0.5;
        assert_eq!(accrue_years(&mut timer, 4.0, 2.0), 2);
        assert_eq!(timer, 0.5);
        assert_eq!(accrue_years(&mut timer, 1.0, 2.0), 0);
        assert_eq!(timer, 1.5);
        assert_eq!(accrue_years(&mut timer, 1e30, 2.0), u32::MAX);
        assert!((0.0..2.0).contains(&timer));
    }

    #[test]
    fn load_is_capped() {
        let (mut v, params) = villager(30);
        assert_eq!(v.load(7, params.carry_capacity), 7);
        assert_eq!(v.load(7, params.carry_capacity), 3);
        assert!(v.is_full(params.carry_capacity));
        assert_eq!(v.unload(), 10);
        assert_eq!(v.carried, 0);
    }

    #[test]
    fn speed_peaks_in_working_band() {
        let params = VillagerParams::default();
        let band = params.working_band;
        assert_eq!(age_speed_factor(30, band, 100), 1.0);
        assert!(age_speed_factor(5, band, 100) < 1.0);
        assert!(age_speed_factor(90, band, 100) < age_speed_factor(70, band, 100));
        assert!((age_speed_factor(100, band, 100) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn out_of_band_villagers_cannot_travel() {
        let (mut v, params) = villager(70);
        v.set_state(VillagerState::Traveling);
        assert_eq!(v.speed(&params), 0.0);
        v.set_state(VillagerState::Returning);
        assert!(v.speed(&params) > 0.0);
    }
}
