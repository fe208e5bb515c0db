//! Config - Tunable simulation constants
//!
//! One flat record injected into every engine call. Nothing here is mutated
//! while a race runs. Partial JSON files override only the fields they name.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::path::Path;

use crate::race_engine::error::{ConfigError, ConfigResult};

/// Progress assigned to finished racers on top of the lap total, so they
/// always sort ahead of racers still on track
pub const FINISH_PROGRESS_SENTINEL: f32 = 1000.0;

/// Simulation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Physics ticks per second
    pub tick_rate: f32,
    /// Most ticks run for one `advance` call before the backlog is dropped
    pub max_catch_up_ticks: u32,

    /// Red-light countdown shared by every racer (frames)
    pub start_delay_frames: u64,
    /// Upper bound of the per-racer launch stagger (frames, inclusive)
    pub max_launch_delay: u32,
    /// Range of the per-racer launch acceleration
    pub launch_accel_min: f32,
    pub launch_accel_max: f32,
    /// Per-racer lateral bias is drawn from +/- this many pixels
    pub lane_offset_range: f32,

    /// Pixels per tick at a speed multiplier of 1.0
    pub base_velocity: f32,
    pub speed_base_multiplier: f32,
    pub speed_engine_bonus: f32,
    pub fuel_exhausted_multiplier: f32,
    pub low_tire_threshold: f32,
    /// Share of the multiplier lost at zero tires
    pub low_tire_penalty: f32,
    pub speed_variation: f32,
    pub finished_speed_multiplier: f32,
    pub acceleration: f32,
    pub deceleration: f32,

    pub fuel_drain_base: f32,
    pub fuel_drain_engine_multiplier: f32,
    pub tire_drain_base: f32,
    pub tire_drain_tire_multiplier: f32,

    /// Path indices between the racer's index and its steering target
    pub look_ahead_distance: usize,
    /// Indices either side of the target used for the local tangent
    pub tangent_sample_offset: usize,
    /// Extra indices for the emergency retarget
    pub safety_look_ahead: usize,
    pub wobble_amplitude: f32,
    pub wobble_frequency: f32,

    pub corner_threshold: f32,
    pub turner_corner_boost: f32,
    /// Lowest fraction of its speed a racer keeps per tick in a corner
    pub corner_decay_floor: f32,
    pub emergency_steer_threshold: f32,
    pub snap_turn_damping: f32,
    pub max_steer_angle: f32,
    pub steering_noise: f32,

    pub path_check_skip: usize,
    pub path_check_distance: f32,
    /// A lap counts when the index wraps from above this fraction of the
    /// path to below `1 - fraction`
    pub lap_wrap_high_fraction: f32,
    pub lap_wrap_min_gap: f32,

    pub racer_radius: f32,
    pub risk_buffer_scale: f32,
    pub collision_force: f32,

    pub grid_columns: usize,
    pub grid_lane_spacing: f32,
    pub grid_row_spacing: f32,
    pub grid_column_stagger: f32,
    /// Gap between the start line and the first grid row
    pub grid_line_offset: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_catch_up_ticks: 5,

            start_delay_frames: 180,
            max_launch_delay: 14,
            launch_accel_min: 0.08,
            launch_accel_max: 0.12,
            lane_offset_range: 20.0,

            base_velocity: 4.5,
            speed_base_multiplier: 0.8,
            speed_engine_bonus: 0.4,
            fuel_exhausted_multiplier: 0.4,
            low_tire_threshold: 30.0,
            low_tire_penalty: 0.5,
            speed_variation: 0.04,
            finished_speed_multiplier: 0.4,
            acceleration: 0.05,
            deceleration: 0.08,

            fuel_drain_base: 0.003,
            fuel_drain_engine_multiplier: 0.004,
            tire_drain_base: 0.003,
            tire_drain_tire_multiplier: 0.004,

            look_ahead_distance: 20,
            tangent_sample_offset: 5,
            safety_look_ahead: 20,
            wobble_amplitude: 6.0,
            wobble_frequency: 0.03,

            corner_threshold: 0.15,
            turner_corner_boost: 1.01,
            corner_decay_floor: 0.98,
            emergency_steer_threshold: PI / 1.9,
            snap_turn_damping: 0.1,
            max_steer_angle: 0.05,
            steering_noise: 0.01,

            path_check_skip: 100,
            path_check_distance: 60.0,
            lap_wrap_high_fraction: 0.9,
            lap_wrap_min_gap: 30.0,

            racer_radius: 10.0,
            risk_buffer_scale: 12.0,
            collision_force: 0.5,

            grid_columns: 3,
            grid_lane_spacing: 36.0,
            grid_row_spacing: 45.0,
            grid_column_stagger: 12.0,
            grid_line_offset: 30.0,
        }
    }
}

impl GameConfig {
    /// Fixed physics step in seconds
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Parse a (possibly partial) JSON document over the defaults
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON tuning file
    pub fn from_json_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.tick_rate > 0.0) {
            return Err(ConfigError::InvalidValue("tick_rate must be positive".into()));
        }
        if self.max_catch_up_ticks == 0 {
            return Err(ConfigError::InvalidValue(
                "max_catch_up_ticks must be at least 1".into(),
            ));
        }
        if self.path_check_skip == 0 || self.look_ahead_distance == 0 {
            return Err(ConfigError::InvalidValue(
                "path_check_skip and look_ahead_distance must be at least 1".into(),
            ));
        }
        if !(0.5..1.0).contains(&self.lap_wrap_high_fraction) {
            return Err(ConfigError::InvalidValue(
                "lap_wrap_high_fraction must be in [0.5, 1)".into(),
            ));
        }
        if self.grid_columns == 0 {
            return Err(ConfigError::InvalidValue("grid_columns must be at least 1".into()));
        }
        if self.launch_accel_min > self.launch_accel_max {
            return Err(ConfigError::InvalidValue(
                "launch_accel_min exceeds launch_accel_max".into(),
            ));
        }

        // Used as sampling ranges, clamp bounds or divisors
        let non_negative = [
            ("launch_accel_min", self.launch_accel_min),
            ("lane_offset_range", self.lane_offset_range),
            ("base_velocity", self.base_velocity),
            ("speed_variation", self.speed_variation),
            ("low_tire_penalty", self.low_tire_penalty),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("max_steer_angle", self.max_steer_angle),
            ("steering_noise", self.steering_noise),
            ("racer_radius", self.racer_radius),
            ("risk_buffer_scale", self.risk_buffer_scale),
            ("collision_force", self.collision_force),
            ("lap_wrap_min_gap", self.lap_wrap_min_gap),
        ];
        for (name, value) in non_negative {
            check_non_negative(name, value)?;
        }
        if !(self.low_tire_threshold > 0.0) {
            return Err(ConfigError::InvalidValue(
                "low_tire_threshold must be positive".into(),
            ));
        }
        if !(self.path_check_distance > self.lap_wrap_min_gap) {
            return Err(ConfigError::InvalidValue(
                "path_check_distance must exceed lap_wrap_min_gap or no lap is ever counted"
                    .into(),
            ));
        }
        Ok(())
    }
}

fn check_non_negative(name: &str, value: f32) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}
