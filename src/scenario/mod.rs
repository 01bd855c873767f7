//! Self-contained reconstruction scenarios loaded from JSON.
//!
//! A scenario bundles constant-rate Euler poles, time-windowed plate
//! polygons, seed points and collision settings, enough to run the engine
//! without external plate model data.

mod config;

pub use config::{
    ChainConfig, CollisionConfig, KinematicConfig, PlateConfig, PointConfig, PointSource, Scenario, ScenarioError,
    SubSegmentConfig, TopologyConfig,
};
