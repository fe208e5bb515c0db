//! Bike Racer - Simulation core
//!
//! Racers follow a closed racing line sampled from editable cubic Bezier
//! nodes. The physics step handles strategy, fuel and tire wear, bike
//! archetypes and collision separation; a fixed-timestep session drives it
//! and a headless harness batches races for balance testing.

pub mod race_engine;

pub use race_engine::*;
