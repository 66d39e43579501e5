//! Per-turn decision engine for a grid resource game.
//!
//! Each turn the snapshot is turned into influence fields, a tagged
//! navigation graph and two advisory dispatch plans; systems then issue
//! actions while committing every move to the shared graph.

pub mod actions;
pub mod clusters;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod fields;
pub mod nav;
pub mod rng;
pub mod scenario;
pub mod spatial;
pub mod systems;
pub mod world;

pub use actions::Action;
pub use config::Tuning;
pub use engine::{Engine, EngineBuilder, EngineSettings, TurnReport};
pub use world::TurnSnapshot;
