//! Race - Race configuration, grid setup and per-tick bookkeeping
//!
//! A race owns its racers, a shared handle to the physics path and the frame
//! counter the engine's timing depends on. Each tick runs the engine for
//! every racer, separates overlaps once, then records new finishers.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::race_engine::config::GameConfig;
use crate::race_engine::geometry::PathPoint;
use crate::race_engine::physics::{resolve_collisions, update_racer};
use crate::race_engine::racer::{
    BikeArchetype, Racer, RacerSnapshot, RacerSpec, RgbColor, StrategyParams,
};
use crate::race_engine::track::{StartPose, TrackLayout, DEFAULT_TRACK_ID};

const RACER_COLORS: [RgbColor; 8] = [
    RgbColor::new(230, 57, 70),
    RgbColor::new(29, 53, 87),
    RgbColor::new(42, 157, 143),
    RgbColor::new(244, 162, 97),
    RgbColor::new(131, 56, 236),
    RgbColor::new(255, 190, 11),
    RgbColor::new(58, 134, 255),
    RgbColor::new(6, 214, 160),
];

/// How bikes are handed out when racers are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BikeAssignment {
    /// Uniform random pick per racer
    Random,
    /// Cycle through every archetype so each class gets equal starts
    RoundRobin,
}

/// Race configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Track to load
    pub track_id: String,
    /// Number of racers, player included
    pub racer_count: u32,
    /// Laps to finish; fixed for the whole race
    pub total_laps: u32,
    /// Racer 0 is the player when set
    pub include_player: bool,
    /// Player strategy; AI racers always get a random personality
    pub player_params: Option<StrategyParams>,
    pub bike_assignment: BikeAssignment,
    /// Seed for every random draw of the race; entropy when `None`
    pub seed: Option<u64>,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            track_id: DEFAULT_TRACK_ID.to_string(),
            racer_count: 8,
            total_laps: 3,
            include_player: false,
            player_params: None,
            bike_assignment: BikeAssignment::Random,
            seed: None,
        }
    }
}

/// Race status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    NotStarted,
    Countdown,
    Racing,
    Finished,
}

/// Finishing record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub racer_id: u32,
    pub racer_name: String,
    pub bike: BikeArchetype,
    /// Frame the racer finished on
    pub finish_time: u64,
    pub position: u32,
}

/// Grid slot positions and heading behind the start line.
///
/// Rows of `grid_columns` racers, spread sideways along the start line and
/// staggered back per column so no two bikes start level.
pub fn grid_slots(pose: &StartPose, count: usize, config: &GameConfig) -> Vec<(PathPoint, f32)> {
    let forward = pose.forward.normalize();
    let across = forward.perpendicular();
    let heading = pose.heading();
    let columns = config.grid_columns.max(1);
    let center_column = (columns - 1) as f32 / 2.0;

    (0..count)
        .map(|i| {
            let row = i / columns;
            let col = i % columns;

            let back = config.grid_line_offset
                + row as f32 * config.grid_row_spacing
                + col as f32 * config.grid_column_stagger;
            let side = (col as f32 - center_column) * config.grid_lane_spacing;

            let position = pose
                .center
                .sub(forward.scale(back))
                .add(across.scale(side));
            (position, heading)
        })
        .collect()
}

/// Complete race state
#[derive(Debug, Clone)]
pub struct Race {
    /// Race configuration
    pub config: RaceConfig,
    /// Current race status
    pub status: RaceStatus,
    /// All racers in the race
    pub racers: Vec<Racer>,
    /// Physics ticks since the lights came on
    pub frame_count: u64,
    /// Finish order
    pub finish_order: Vec<RaceResult>,
    path: Arc<[PathPoint]>,
    start_pose: StartPose,
}

impl Race {
    /// Create a race on the given layout, with no racers yet
    pub fn new(config: RaceConfig, layout: &TrackLayout) -> Self {
        Self {
            config,
            status: RaceStatus::NotStarted,
            racers: Vec::new(),
            frame_count: 0,
            finish_order: Vec::new(),
            path: layout.shared_path(),
            start_pose: layout.start_pose(),
        }
    }

    /// Fill the grid: names, colors, strategies and bikes, with shuffled slots
    pub fn generate_racers<R: Rng + ?Sized>(&mut self, game: &GameConfig, rng: &mut R) {
        self.racers.clear();

        let count = self.config.racer_count as usize;
        let mut slots = grid_slots(&self.start_pose, count, game);
        slots.shuffle(rng);

        for (i, (position, angle)) in slots.into_iter().enumerate() {
            let is_player = self.config.include_player && i == 0;
            let bike = match self.config.bike_assignment {
                BikeAssignment::Random => None,
                BikeAssignment::RoundRobin => Some(BikeArchetype::ALL[i % BikeArchetype::ALL.len()]),
            };
            let spec = RacerSpec {
                id: i as u32,
                name: if is_player {
                    "Player".to_string()
                } else {
                    format!("Rider {}", i + 1)
                },
                color: RACER_COLORS[i % RACER_COLORS.len()],
                racing_number: i as u32 + 1,
                start_position: position,
                start_angle: angle,
                is_player,
                params: if is_player { self.config.player_params } else { None },
                bike,
            };
            self.racers.push(Racer::new(spec, game, rng));
        }
    }

    /// Put the lights on; frame counting starts here
    pub fn start_countdown(&mut self) {
        self.status = RaceStatus::Countdown;
        self.frame_count = 0;
    }

    /// Physics path currently raced on
    pub fn path(&self) -> &[PathPoint] {
        &self.path
    }

    /// Swap in a regenerated path between ticks.
    ///
    /// Racer indices are wrapped into the new length.
    pub fn set_path(&mut self, path: Arc<[PathPoint]>) {
        assert!(!path.is_empty(), "race path cannot be empty");
        let len = path.len();
        for racer in &mut self.racers {
            racer.path_index %= len;
        }
        self.path = path;
    }

    /// Run one fixed physics tick
    pub fn step<R: Rng + ?Sized>(&mut self, game: &GameConfig, rng: &mut R) {
        if self.status == RaceStatus::NotStarted {
            return;
        }

        for racer in &mut self.racers {
            update_racer(
                racer,
                &self.path,
                self.frame_count,
                self.config.total_laps,
                game,
                rng,
            );
        }
        resolve_collisions(&mut self.racers, game);

        self.record_finishers();
        self.frame_count += 1;

        match self.status {
            RaceStatus::Countdown if self.frame_count >= game.start_delay_frames => {
                self.status = RaceStatus::Racing;
                log::info!("Lights out at frame {}", self.frame_count);
            }
            RaceStatus::Racing if self.all_finished() => {
                self.status = RaceStatus::Finished;
                log::info!(
                    "Race finished at frame {}: {} racers classified",
                    self.frame_count,
                    self.finish_order.len()
                );
            }
            _ => {}
        }
    }

    fn record_finishers(&mut self) {
        for racer in &self.racers {
            let Some(finish_time) = racer.finish_time else {
                continue;
            };
            if self.finish_order.iter().any(|r| r.racer_id == racer.id) {
                continue;
            }
            let position = self.finish_order.len() as u32 + 1;
            log::info!(
                "{} (#{}) finished P{} at frame {}",
                racer.name,
                racer.racing_number,
                position,
                finish_time
            );
            self.finish_order.push(RaceResult {
                racer_id: racer.id,
                racer_name: racer.name.clone(),
                bike: racer.bike,
                finish_time,
                position,
            });
        }
    }

    pub fn all_finished(&self) -> bool {
        !self.racers.is_empty() && self.finish_order.len() == self.racers.len()
    }

    /// Red-light frames left before the start
    pub fn countdown_frames(&self, game: &GameConfig) -> u64 {
        game.start_delay_frames.saturating_sub(self.frame_count)
    }

    /// Racers ordered by race position (progress, highest first)
    pub fn standings(&self) -> Vec<&Racer> {
        let mut order: Vec<&Racer> = self.racers.iter().collect();
        order.sort_by(|a, b| b.progress.total_cmp(&a.progress));
        order
    }

    /// Get compact snapshot for renderers
    pub fn get_snapshot(&self, game: &GameConfig) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            frame_count: self.frame_count,
            countdown_frames: self.countdown_frames(game),
            total_laps: self.config.total_laps,
            racers: self.racers.iter().map(RacerSnapshot::from).collect(),
            finisher_count: self.finish_order.len() as u32,
        }
    }

    /// Get current leader
    pub fn get_leader(&self) -> Option<&Racer> {
        self.racers
            .iter()
            .max_by(|a, b| a.progress.total_cmp(&b.progress))
    }

    /// Get racer by ID
    pub fn get_racer(&self, id: u32) -> Option<&Racer> {
        self.racers.iter().find(|r| r.id == id)
    }

    pub fn get_racer_mut(&mut self, id: u32) -> Option<&mut Racer> {
        self.racers.iter_mut().find(|r| r.id == id)
    }
}

/// Compact race snapshot for renderers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub frame_count: u64,
    pub countdown_frames: u64,
    pub total_laps: u32,
    pub racers: Vec<RacerSnapshot>,
    pub finisher_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::race_engine::geometry::distance;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn race(count: u32, laps: u32) -> (Race, GameConfig, StdRng) {
        let layout = TrackLayout::load("stadium").unwrap();
        let config = RaceConfig {
            racer_count: count,
            total_laps: laps,
            ..Default::default()
        };
        let game = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut race = Race::new(config, &layout);
        race.generate_racers(&game, &mut rng);
        (race, game, rng)
    }

    #[test]
    fn grid_rows_of_three_behind_the_line() {
        let game = GameConfig::default();
        let pose = StartPose {
            center: PathPoint::new(100.0, 100.0),
            forward: PathPoint::new(1.0, 0.0),
        };
        let slots = grid_slots(&pose, 7, &game);

        assert_eq!(slots.len(), 7);
        for (position, heading) in &slots {
            assert!(position.x < pose.center.x);
            assert_relative_eq!(*heading, 0.0);
        }
        // first row: three lanes across the line
        assert_relative_eq!(slots[0].0.y, 100.0 - game.grid_lane_spacing);
        assert_relative_eq!(slots[1].0.y, 100.0);
        assert_relative_eq!(slots[2].0.y, 100.0 + game.grid_lane_spacing);
        // staggered columns, rows further back
        assert!(slots[1].0.x < slots[0].0.x);
        assert_relative_eq!(slots[3].0.x, slots[0].0.x - game.grid_row_spacing);
        // no two slots overlap
        for (i, a) in slots.iter().enumerate() {
            for b in &slots[i + 1..] {
                assert!(distance(a.0, b.0) > 2.0 * game.racer_radius);
            }
        }
    }

    #[test]
    fn generated_grid_is_complete() {
        let (race, _, _) = race(6, 3);
        assert_eq!(race.racers.len(), 6);
        let mut ids: Vec<u32> = race.racers.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
        assert!(race.racers.iter().all(|r| !r.is_player));
    }

    #[test]
    fn player_and_round_robin_bikes() {
        let layout = TrackLayout::load("stadium").unwrap();
        let params = StrategyParams::new(90.0, 90.0, 90.0);
        let config = RaceConfig {
            racer_count: 8,
            include_player: true,
            player_params: Some(params),
            bike_assignment: BikeAssignment::RoundRobin,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut race = Race::new(config, &layout);
        race.generate_racers(&GameConfig::default(), &mut rng);

        let player = race.get_racer(0).unwrap();
        assert!(player.is_player);
        assert_eq!(player.params, params);
        for archetype in BikeArchetype::ALL {
            assert_eq!(race.racers.iter().filter(|r| r.bike == archetype).count(), 2);
        }
    }

    #[test]
    fn not_started_race_does_not_tick() {
        let (mut race, game, mut rng) = race(3, 3);
        race.step(&game, &mut rng);
        assert_eq!(race.frame_count, 0);
        assert_eq!(race.status, RaceStatus::NotStarted);
    }

    #[test]
    fn countdown_then_racing() {
        let (mut race, game, mut rng) = race(3, 3);
        race.start_countdown();
        let start: Vec<PathPoint> = race.racers.iter().map(Racer::position).collect();

        for _ in 0..game.start_delay_frames - 1 {
            race.step(&game, &mut rng);
        }
        assert_eq!(race.status, RaceStatus::Countdown);
        assert_eq!(race.countdown_frames(&game), 1);
        let held: Vec<PathPoint> = race.racers.iter().map(Racer::position).collect();
        assert_eq!(start, held);

        race.step(&game, &mut rng);
        assert_eq!(race.status, RaceStatus::Racing);

        for _ in 0..120 {
            race.step(&game, &mut rng);
        }
        assert!(race.racers.iter().all(|r| r.current_speed > 0.0));
    }

    #[test]
    fn full_race_classifies_everyone_once() {
        let (mut race, game, mut rng) = race(5, 1);
        race.start_countdown();

        let mut frames = 0;
        while race.status != RaceStatus::Finished && frames < 20_000 {
            race.step(&game, &mut rng);
            frames += 1;
        }

        assert_eq!(race.status, RaceStatus::Finished);
        assert_eq!(race.finish_order.len(), 5);
        let positions: Vec<u32> = race.finish_order.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        for pair in race.finish_order.windows(2) {
            assert!(pair[0].finish_time <= pair[1].finish_time);
        }
        let leader = race.standings()[0];
        assert!(leader.finished);
        assert!(race.get_leader().is_some());

        let snapshot = race.get_snapshot(&game);
        assert_eq!(snapshot.finisher_count, 5);
        assert_eq!(snapshot.countdown_frames, 0);
    }

    #[test]
    fn set_path_wraps_indices() {
        let (mut race, _, _) = race(2, 3);
        race.racers[0].path_index = 400;
        let shorter = TrackLayout::from_nodes(
            "short",
            crate::race_engine::track::get_nodes("stadium").unwrap()[..4].to_vec(),
            None,
        )
        .unwrap();
        race.set_path(shorter.shared_path());
        assert_eq!(race.path().len(), 240);
        assert_eq!(race.racers[0].path_index, 400 % 240);
    }
}
