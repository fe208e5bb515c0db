//! Physics - Per-tick racer integration and collision separation
//!
//! `update_racer` moves one racer one fixed tick along the sampled racing
//! line: start gating, resource drain, speed model, look-ahead steering,
//! Euler integration, then path-index tracking with lap detection.
//! `resolve_collisions` pushes overlapping racers apart once per tick.
//!
//! All randomness comes from the injected RNG so seeded runs replay exactly.

use rand::Rng;
use std::f32::consts::FRAC_PI_2;

use crate::race_engine::config::{GameConfig, FINISH_PROGRESS_SENTINEL};
use crate::race_engine::geometry::{distance, heading_to, wrap_angle, PathPoint};
use crate::race_engine::racer::{ArchetypeStats, Racer};

/// Below this speed a racer still uses its launch acceleration
const LAUNCH_SPEED: f32 = 0.5;

/// Distances below this are treated as coincident racers
const COLLISION_EPSILON: f32 = 1e-4;

/// Advance one racer by one fixed tick.
///
/// Panics if `path` is empty or the racer's `path_index` is out of range;
/// both mean the caller broke the path/racer pairing.
pub fn update_racer<R: Rng + ?Sized>(
    racer: &mut Racer,
    path: &[PathPoint],
    frame_count: u64,
    total_laps: u32,
    config: &GameConfig,
    rng: &mut R,
) {
    assert!(!path.is_empty(), "racer update on an empty path");
    assert!(
        racer.path_index < path.len(),
        "path index {} out of range for path of {} points",
        racer.path_index,
        path.len()
    );

    // Lights are red for everyone
    if frame_count < config.start_delay_frames {
        racer.current_speed = 0.0;
        return;
    }
    // Per-racer launch stagger
    if frame_count < config.start_delay_frames + u64::from(racer.launch_delay) {
        return;
    }

    if !racer.finished {
        drain_resources(racer, config);
    }

    let bike = racer.bike_archetype();
    let max_speed = config.base_velocity * speed_multiplier(racer, config, rng) * bike.top_speed;
    accelerate(racer, max_speed, bike, config);

    let target_index = (racer.path_index + config.look_ahead_distance) % path.len();
    let target = steering_target(racer, path, target_index, frame_count, config);
    steer(racer, path, target, target_index, max_speed, bike, config, rng);

    racer.x += racer.angle.cos() * racer.current_speed;
    racer.y += racer.angle.sin() * racer.current_speed;

    advance_path_index(racer, path, frame_count, total_laps, config);

    if !racer.finished {
        racer.progress = racer.lap as f32 + racer.path_index as f32 / path.len() as f32;
    }
}

/// Fuel and tire wear proportional to distance covered this tick
fn drain_resources(racer: &mut Racer, config: &GameConfig) {
    let speed = racer.current_speed;
    let params = racer.params;

    let fuel_rate =
        config.fuel_drain_base + config.fuel_drain_engine_multiplier * params.engine_map / 100.0;
    racer.fuel = (racer.fuel - speed * fuel_rate).max(0.0);

    let tire_rate =
        config.tire_drain_base + config.tire_drain_tire_multiplier * params.tire_aggression / 100.0;
    racer.tires = (racer.tires - speed * tire_rate).max(0.0);
}

fn speed_multiplier<R: Rng + ?Sized>(racer: &Racer, config: &GameConfig, rng: &mut R) -> f32 {
    if racer.finished {
        return config.finished_speed_multiplier;
    }

    let mut multiplier = if racer.fuel > 0.0 {
        config.speed_base_multiplier + config.speed_engine_bonus * racer.params.engine_map / 100.0
    } else {
        config.fuel_exhausted_multiplier
    };

    if racer.tires < config.low_tire_threshold {
        let worn = 1.0 - racer.tires / config.low_tire_threshold;
        multiplier *= 1.0 - config.low_tire_penalty * worn;
    }

    multiplier + (rng.gen::<f32>() - 0.5) * config.speed_variation
}

fn accelerate(racer: &mut Racer, max_speed: f32, bike: &ArchetypeStats, config: &GameConfig) {
    if racer.current_speed < max_speed {
        let accel = if racer.current_speed < LAUNCH_SPEED && !racer.finished {
            racer.launch_accel * bike.acceleration
        } else {
            config.acceleration * bike.acceleration
        };
        racer.current_speed = (racer.current_speed + accel).min(max_speed);
    } else {
        racer.current_speed = (racer.current_speed - config.deceleration).max(max_speed);
    }
}

/// Look-ahead point shifted sideways by the racer's lane bias and wobble.
///
/// The tangent is measured around the target, not the racer, so the offset
/// direction is stable through corners.
fn steering_target(
    racer: &Racer,
    path: &[PathPoint],
    target_index: usize,
    frame_count: u64,
    config: &GameConfig,
) -> PathPoint {
    let len = path.len();
    let span = config.tangent_sample_offset % len;
    let ahead = path[(target_index + span) % len];
    let behind = path[(target_index + len - span) % len];
    let normal = ahead.sub(behind).normalize().perpendicular();

    let wobble = config.wobble_amplitude
        * (frame_count as f32 * config.wobble_frequency + racer.wobble_phase).sin();
    let offset = racer.lane_offset + wobble;

    path[target_index].add(normal.scale(offset))
}

#[allow(clippy::too_many_arguments)]
fn steer<R: Rng + ?Sized>(
    racer: &mut Racer,
    path: &[PathPoint],
    target: PathPoint,
    target_index: usize,
    max_speed: f32,
    bike: &ArchetypeStats,
    config: &GameConfig,
    rng: &mut R,
) {
    let position = racer.position();
    let mut error = wrap_angle(heading_to(position, target) - racer.angle);

    if error.abs() > config.corner_threshold {
        corner_speed(racer, max_speed, bike, config);
    }

    // Target is behind us: aim further down the line instead of u-turning
    if error.abs() > config.emergency_steer_threshold {
        let safety = path[(target_index + config.safety_look_ahead) % path.len()];
        error = wrap_angle(heading_to(position, safety) - racer.angle);
    }

    if error.abs() > FRAC_PI_2 {
        error *= config.snap_turn_damping;
    }

    let max_steer = config.max_steer_angle * bike.steering;
    let steer = error.clamp(-max_steer, max_steer);
    let noise = (rng.gen::<f32>() - 0.5) * config.steering_noise;

    racer.angle = wrap_angle(racer.angle + steer + noise);
}

/// Cornering feel: agile bikes carry a little extra speed through bends,
/// fast bikes bleed speed towards a penalized cap, at most 2% per tick.
fn corner_speed(racer: &mut Racer, max_speed: f32, bike: &ArchetypeStats, config: &GameConfig) {
    if bike.cornering > 1.0 {
        racer.current_speed = (racer.current_speed * config.turner_corner_boost).min(max_speed);
    } else if bike.cornering < 1.0 {
        let penalized = max_speed * bike.cornering;
        if racer.current_speed > penalized {
            racer.current_speed = (racer.current_speed * config.corner_decay_floor).max(penalized);
        }
    }
}

/// Match the racer to the first path point within range ahead of its
/// current index, counting a lap when the index wraps end-to-start.
fn advance_path_index(
    racer: &mut Racer,
    path: &[PathPoint],
    frame_count: u64,
    total_laps: u32,
    config: &GameConfig,
) {
    let len = path.len();
    let position = racer.position();
    let high_mark = config.lap_wrap_high_fraction * len as f32;
    let low_mark = (1.0 - config.lap_wrap_high_fraction) * len as f32;

    for step in 0..config.path_check_skip.min(len) {
        let candidate = (racer.path_index + step) % len;
        let gap = distance(position, path[candidate]);
        if gap >= config.path_check_distance {
            continue;
        }

        let wrapped = racer.path_index as f32 > high_mark
            && (candidate as f32) < low_mark
            && gap > config.lap_wrap_min_gap;
        if wrapped && !racer.finished {
            complete_lap(racer, frame_count, total_laps);
        }

        racer.path_index = candidate;
        break;
    }
}

fn complete_lap(racer: &mut Racer, frame_count: u64, total_laps: u32) {
    racer.lap += 1;
    log::debug!(
        "Racer {} (#{}) completed lap {} at frame {}",
        racer.id,
        racer.racing_number,
        racer.lap,
        frame_count
    );

    if racer.lap >= total_laps {
        racer.finished = true;
        racer.finish_time.get_or_insert(frame_count);
        racer.progress = total_laps as f32 + FINISH_PROGRESS_SENTINEL;
        log::debug!("Racer {} finished at frame {}", racer.id, frame_count);
    }
}

/// Push apart every pair of racers closer than their required separation.
///
/// Higher combined risk shrinks the buffer. Both racers move the same
/// distance in opposite directions; there is no momentum exchange.
pub fn resolve_collisions(racers: &mut [Racer], config: &GameConfig) {
    for j in 1..racers.len() {
        let (before, rest) = racers.split_at_mut(j);
        let b = &mut rest[0];
        for a in before.iter_mut() {
            separate_pair(a, b, config);
        }
    }
}

fn separate_pair(a: &mut Racer, b: &mut Racer, config: &GameConfig) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let dist = dx.hypot(dy);

    let buffer = config.risk_buffer_scale * (1.0 - (a.params.risk + b.params.risk) / 200.0);
    let required = 2.0 * config.racer_radius + buffer;
    if dist >= required {
        return;
    }

    // Coincident racers get a fixed axis so they still come apart
    let axis = if dist > COLLISION_EPSILON {
        PathPoint::new(dx / dist, dy / dist)
    } else {
        PathPoint::new(1.0, 0.0)
    };
    let push = (required - dist) * config.collision_force / 2.0;

    a.x -= axis.x * push;
    a.y -= axis.y * push;
    b.x += axis.x * push;
    b.y += axis.y * push;
}
