pub mod config;
pub mod dwelling;
pub mod engine;
pub mod error;
pub mod events;
pub mod forest;
pub mod rng;
pub mod scenario;
pub mod settlement;
pub mod snapshot;
pub mod spatial;
pub mod systems;
pub mod villager;
pub mod wolf;
pub mod world;

pub use engine::{Engine, EngineBuilder, EngineSettings, TickSummary};
pub use events::{EventSink, RemovalCause, SimEvent};
pub use scenario::{Scenario, ScenarioLoader};
pub use world::{EntityId, World};
