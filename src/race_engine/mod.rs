//! Race Engine Module
//!
//! Bezier racing-line sampling, racer physics and the fixed-timestep race
//! session that drives it. Rendering and input live outside this crate.

pub mod balance;
pub mod config;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod race;
pub mod racer;
pub mod simulation;
pub mod track;

pub use balance::{run_balance, BalanceConfig, BalanceReport};
pub use config::GameConfig;
pub use error::{ConfigError, TrackError};
pub use geometry::{cubic_bezier, generate_path, BezierNode, PathPoint};
pub use physics::{resolve_collisions, update_racer};
pub use race::{Race, RaceConfig, RaceStatus};
pub use racer::{BikeArchetype, Racer, RacerSpec, StrategyParams};
pub use simulation::{DebugOptions, GameState, RaceSession};
pub use track::{get_nodes, get_start_pose, visual_path, StartPose, TrackLayout};
