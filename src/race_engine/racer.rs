//! Racer - Individual racer state, strategy and bike archetype
//!
//! Each racer carries kinematic state, race progress, consumable resources
//! and a handful of per-racer behaviour constants drawn once at creation.
//! The physics step mutates everything except identity and strategy.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::race_engine::config::GameConfig;
use crate::race_engine::geometry::PathPoint;

/// Full tank / fresh tires
pub const RESOURCE_MAX: f32 = 100.0;

/// Multipliers that define a class of bike
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStats {
    pub top_speed: f32,
    pub acceleration: f32,
    pub cornering: f32,
    pub steering: f32,
}

/// Bike class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BikeArchetype {
    Balanced,
    Speeder,
    Turner,
    Sprinter,
}

static ARCHETYPE_TABLE: [ArchetypeStats; 4] = [
    // Balanced
    ArchetypeStats {
        top_speed: 1.0,
        acceleration: 1.0,
        cornering: 1.0,
        steering: 1.0,
    },
    // Speeder
    ArchetypeStats {
        top_speed: 1.08,
        acceleration: 0.95,
        cornering: 0.9,
        steering: 0.9,
    },
    // Turner
    ArchetypeStats {
        top_speed: 0.95,
        acceleration: 1.0,
        cornering: 1.1,
        steering: 1.15,
    },
    // Sprinter
    ArchetypeStats {
        top_speed: 0.98,
        acceleration: 1.3,
        cornering: 1.0,
        steering: 1.0,
    },
];

impl BikeArchetype {
    pub const ALL: [BikeArchetype; 4] = [
        BikeArchetype::Balanced,
        BikeArchetype::Speeder,
        BikeArchetype::Turner,
        BikeArchetype::Sprinter,
    ];

    /// Static multiplier record for this class
    pub fn stats(self) -> &'static ArchetypeStats {
        &ARCHETYPE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        match self {
            BikeArchetype::Balanced => "balanced",
            BikeArchetype::Speeder => "speeder",
            BikeArchetype::Turner => "turner",
            BikeArchetype::Sprinter => "sprinter",
        }
    }

    /// Uniform pick over every class
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Player-settable race strategy, each value in [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub tire_aggression: f32,
    pub engine_map: f32,
    pub risk: f32,
}

impl StrategyParams {
    pub fn new(tire_aggression: f32, engine_map: f32, risk: f32) -> Self {
        Self {
            tire_aggression: tire_aggression.clamp(0.0, RESOURCE_MAX),
            engine_map: engine_map.clamp(0.0, RESOURCE_MAX),
            risk: risk.clamp(0.0, RESOURCE_MAX),
        }
    }

    /// AI personality: each value drawn independently from its sub-range
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            tire_aggression: rng.gen_range(40.0..=80.0),
            engine_map: rng.gen_range(40.0..=80.0),
            risk: rng.gen_range(30.0..=70.0),
        }
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self::new(60.0, 60.0, 50.0)
    }
}

/// Display color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Where a racer is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacerStatus {
    /// Before the lights or the racer's own launch stagger
    Waiting,
    Racing,
    Finished,
}

/// Everything needed to put a racer on the grid
#[derive(Debug, Clone)]
pub struct RacerSpec {
    pub id: u32,
    pub name: String,
    pub color: RgbColor,
    pub racing_number: u32,
    pub start_position: PathPoint,
    pub start_angle: f32,
    pub is_player: bool,
    /// Randomized AI personality when `None`
    pub params: Option<StrategyParams>,
    /// Random class when `None`
    pub bike: Option<BikeArchetype>,
}

/// Complete state for a single racer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Racer {
    pub id: u32,
    pub name: String,
    pub color: RgbColor,
    pub racing_number: u32,
    pub is_player: bool,

    pub x: f32,
    pub y: f32,
    /// Heading in radians, kept in (-PI, PI]
    pub angle: f32,
    /// Pixels per tick
    pub current_speed: f32,

    /// Index of the last path point the racer was matched to
    pub path_index: usize,
    pub lap: u32,
    /// Laps plus fractional lap, or the finish sentinel once finished
    pub progress: f32,
    pub finished: bool,
    /// Frame the racer crossed the line on its final lap
    pub finish_time: Option<u64>,

    pub fuel: f32,
    pub tires: f32,
    pub params: StrategyParams,

    /// Extra frames after the lights before this racer moves
    pub launch_delay: u32,
    pub launch_accel: f32,
    /// Fixed lateral bias from the racing line (pixels)
    pub lane_offset: f32,
    pub wobble_phase: f32,

    pub bike: BikeArchetype,
}

impl Racer {
    /// Create a racer on its grid slot
    pub fn new<R: Rng + ?Sized>(spec: RacerSpec, config: &GameConfig, rng: &mut R) -> Self {
        let params = spec.params.unwrap_or_else(|| StrategyParams::random(rng));
        let bike = spec.bike.unwrap_or_else(|| BikeArchetype::random(rng));

        Self {
            id: spec.id,
            name: spec.name,
            color: spec.color,
            racing_number: spec.racing_number,
            is_player: spec.is_player,
            x: spec.start_position.x,
            y: spec.start_position.y,
            angle: spec.start_angle,
            current_speed: 0.0,
            path_index: 0,
            lap: 0,
            progress: 0.0,
            finished: false,
            finish_time: None,
            fuel: RESOURCE_MAX,
            tires: RESOURCE_MAX,
            params,
            launch_delay: rng.gen_range(0..=config.max_launch_delay),
            launch_accel: rng.gen_range(config.launch_accel_min..=config.launch_accel_max),
            lane_offset: rng.gen_range(-config.lane_offset_range..=config.lane_offset_range),
            wobble_phase: rng.gen_range(0.0..TAU),
            bike,
        }
    }

    /// Multipliers of this racer's bike class
    pub fn bike_archetype(&self) -> &'static ArchetypeStats {
        self.bike.stats()
    }

    /// Change strategy mid-race; values are clamped into [0, 100]
    pub fn set_params(&mut self, params: StrategyParams) {
        self.params = StrategyParams::new(params.tire_aggression, params.engine_map, params.risk);
    }

    pub fn position(&self) -> PathPoint {
        PathPoint::new(self.x, self.y)
    }

    pub fn status(&self, frame_count: u64, config: &GameConfig) -> RacerStatus {
        if self.finished {
            RacerStatus::Finished
        } else if frame_count < config.start_delay_frames + u64::from(self.launch_delay) {
            RacerStatus::Waiting
        } else {
            RacerStatus::Racing
        }
    }
}

/// Compact racer state for renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RacerSnapshot {
    pub id: u32,
    pub racing_number: u32,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub speed: f32,
    pub lap: u32,
    pub progress: f32,
    pub fuel: f32,
    pub tires: f32,
    pub finished: bool,
}

impl From<&Racer> for RacerSnapshot {
    fn from(racer: &Racer) -> Self {
        Self {
            id: racer.id,
            racing_number: racer.racing_number,
            x: racer.x,
            y: racer.y,
            angle: racer.angle,
            speed: racer.current_speed,
            lap: racer.lap,
            progress: racer.progress,
            fuel: racer.fuel,
            tires: racer.tires,
            finished: racer.finished,
        }
    }
}
