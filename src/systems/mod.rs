mod forest;
mod houses;
mod settlement;
mod villagers;
mod wolves;

pub use forest::ForestSystem;
pub use houses::HouseSystem;
pub use settlement::SettlementSystem;
pub use villagers::VillagerSystem;
pub use wolves::WolfSystem;
