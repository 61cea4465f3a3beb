use thiserror::Error;

/// Problems found while validating a scenario.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("dt_secs must be positive, got {0}")]
    NonPositiveTimeStep(f32),

    #[error("{field} must be positive, got {value}")]
    NonPositiveRadius { field: &'static str, value: f32 },

    #[error("settlement capacity must be greater than zero")]
    ZeroCapacity,

    #[error("resources_per_house must be greater than zero")]
    ZeroResourcesPerHouse,

    #[error("forest {index} has a non-positive radius {radius}")]
    EmptyForest { index: usize, radius: f32 },

    #[error("age band {name} is inverted: {min} > {max}")]
    InvertedAgeBand { name: &'static str, min: u32, max: u32 },

    #[error("initial ages {min}..={max} are invalid for max_age {max_age}")]
    InvalidPopulationAges { min: u32, max: u32, max_age: u32 },

    #[error("population has {males} males but only {count} villagers")]
    TooManyMales { males: u32, count: u32 },
}

pub type Result<T> = std::result::Result<T, ScenarioError>;
