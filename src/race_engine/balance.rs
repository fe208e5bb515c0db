//! Balance - Headless batch races for bike archetype tuning
//!
//! Runs many independent races back to back and aggregates finishing
//! positions per archetype. Every trial gets its own race, racers and RNG
//! stream derived from the base seed, so a report is reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::race_engine::config::GameConfig;
use crate::race_engine::error::TrackResult;
use crate::race_engine::race::{BikeAssignment, Race, RaceConfig};
use crate::race_engine::racer::BikeArchetype;
use crate::race_engine::track::{TrackLayout, DEFAULT_TRACK_ID};

/// Batch run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub trials: u32,
    pub racers_per_race: u32,
    pub total_laps: u32,
    /// Ticks after which a race is abandoned and unfinished racers are DNF
    pub frame_cap: u64,
    pub track_id: String,
    pub seed: u64,
    pub bike_assignment: BikeAssignment,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            trials: 50,
            racers_per_race: 8,
            total_laps: 3,
            frame_cap: 20_000,
            track_id: DEFAULT_TRACK_ID.to_string(),
            seed: 1,
            bike_assignment: BikeAssignment::RoundRobin,
        }
    }
}

/// Aggregated results for one archetype
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeStanding {
    pub archetype: Option<BikeArchetype>,
    pub starts: u32,
    pub wins: u32,
    pub podiums: u32,
    pub finishes: u32,
    pub dnfs: u32,
    pub average_position: f32,
    /// Mean finish frame over racers that finished
    pub average_finish_frame: Option<f32>,
    #[serde(skip)]
    position_sum: u64,
    #[serde(skip)]
    finish_frame_sum: u64,
}

impl ArchetypeStanding {
    fn record(&mut self, position: u32, finish_frame: Option<u64>) {
        self.starts += 1;
        self.position_sum += u64::from(position);
        if position == 1 {
            self.wins += 1;
        }
        if position <= 3 {
            self.podiums += 1;
        }
        match finish_frame {
            Some(frame) => {
                self.finishes += 1;
                self.finish_frame_sum += frame;
            }
            None => self.dnfs += 1,
        }
    }

    fn finalize(&mut self) {
        if self.starts > 0 {
            self.average_position = self.position_sum as f32 / self.starts as f32;
        }
        if self.finishes > 0 {
            self.average_finish_frame = Some(self.finish_frame_sum as f32 / self.finishes as f32);
        }
    }
}

/// One racer's classification in one trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub bike: BikeArchetype,
    pub position: u32,
    pub finish_frame: Option<u64>,
}

/// Outcome of a single headless race
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub placements: Vec<Placement>,
    pub frames: u64,
    /// Race was cut off by the frame cap
    pub capped: bool,
}

/// Full batch report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub track_id: String,
    pub trials: u32,
    pub capped_trials: u32,
    pub standings: Vec<ArchetypeStanding>,
}

impl BalanceReport {
    /// Plain-text table, one line per archetype
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "track '{}': {} trials ({} hit the frame cap)",
            self.track_id, self.trials, self.capped_trials
        );
        let _ = writeln!(
            out,
            "{:<10} {:>6} {:>5} {:>7} {:>5} {:>8} {:>12}",
            "bike", "starts", "wins", "podiums", "dnfs", "avg pos", "avg finish"
        );
        for standing in &self.standings {
            let name = standing.archetype.map(BikeArchetype::name).unwrap_or("-");
            let finish = standing
                .average_finish_frame
                .map(|f| format!("{f:.0}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<10} {:>6} {:>5} {:>7} {:>5} {:>8.2} {:>12}",
                name,
                standing.starts,
                standing.wins,
                standing.podiums,
                standing.dnfs,
                standing.average_position,
                finish
            );
        }
        out
    }
}

/// Run one race to completion or the frame cap
pub fn run_trial(
    layout: &TrackLayout,
    balance: &BalanceConfig,
    game: &GameConfig,
    seed: u64,
) -> TrialOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    let race_config = RaceConfig {
        track_id: layout.track_id().to_string(),
        racer_count: balance.racers_per_race,
        total_laps: balance.total_laps,
        bike_assignment: balance.bike_assignment,
        seed: Some(seed),
        ..Default::default()
    };

    let mut race = Race::new(race_config, layout);
    race.generate_racers(game, &mut rng);
    race.start_countdown();

    while !race.all_finished() && race.frame_count < balance.frame_cap {
        race.step(game, &mut rng);
    }

    let capped = !race.all_finished();
    if capped {
        log::warn!(
            "Trial with seed {} hit the frame cap ({} of {} racers finished)",
            seed,
            race.finish_order.len(),
            race.racers.len()
        );
    }

    // Finishers in finish order, then everyone else by progress
    let mut placements: Vec<Placement> = race
        .finish_order
        .iter()
        .filter_map(|result| {
            race.get_racer(result.racer_id).map(|racer| Placement {
                bike: racer.bike,
                position: result.position,
                finish_frame: Some(result.finish_time),
            })
        })
        .collect();

    let classified = placements.len() as u32;
    let unfinished = race.standings().into_iter().filter(|r| !r.finished);
    for (offset, racer) in unfinished.enumerate() {
        placements.push(Placement {
            bike: racer.bike,
            position: classified + offset as u32 + 1,
            finish_frame: None,
        });
    }

    TrialOutcome {
        placements,
        frames: race.frame_count,
        capped,
    }
}

/// Run the whole batch and aggregate per archetype
pub fn run_balance(balance: &BalanceConfig, game: &GameConfig) -> TrackResult<BalanceReport> {
    let layout = TrackLayout::load(&balance.track_id)?;
    log::info!(
        "Balance run: {} trials x {} racers, {} laps on '{}'",
        balance.trials,
        balance.racers_per_race,
        balance.total_laps,
        balance.track_id
    );

    let mut standings: BTreeMap<BikeArchetype, ArchetypeStanding> = BikeArchetype::ALL
        .iter()
        .map(|&bike| {
            (
                bike,
                ArchetypeStanding {
                    archetype: Some(bike),
                    ..Default::default()
                },
            )
        })
        .collect();
    let mut capped_trials = 0;

    for trial in 0..balance.trials {
        let outcome = run_trial(&layout, balance, game, balance.seed.wrapping_add(u64::from(trial)));
        if outcome.capped {
            capped_trials += 1;
        }
        for placement in &outcome.placements {
            if let Some(standing) = standings.get_mut(&placement.bike) {
                standing.record(placement.position, placement.finish_frame);
            }
        }
        log::debug!("Trial {} done in {} frames", trial + 1, outcome.frames);
    }

    let standings = standings
        .into_values()
        .map(|mut standing| {
            standing.finalize();
            standing
        })
        .collect();

    Ok(BalanceReport {
        track_id: balance.track_id.clone(),
        trials: balance.trials,
        capped_trials,
        standings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> BalanceConfig {
        BalanceConfig {
            trials: 3,
            racers_per_race: 4,
            total_laps: 1,
            ..Default::default()
        }
    }

    #[test]
    fn every_start_is_counted_once() {
        let balance = small();
        let report = run_balance(&balance, &GameConfig::default()).unwrap();

        let starts: u32 = report.standings.iter().map(|s| s.starts).sum();
        assert_eq!(starts, balance.trials * balance.racers_per_race);
        let wins: u32 = report.standings.iter().map(|s| s.wins).sum();
        assert_eq!(wins, balance.trials);
        // round robin: four racers, four classes, one start each per trial
        for standing in &report.standings {
            assert_eq!(standing.starts, balance.trials);
            assert!(standing.average_position >= 1.0);
        }
        assert_eq!(report.capped_trials, 0);
    }

    #[test]
    fn frame_cap_marks_dnfs() {
        let balance = BalanceConfig {
            trials: 1,
            racers_per_race: 4,
            frame_cap: 300,
            ..Default::default()
        };
        let layout = TrackLayout::load("stadium").unwrap();
        let outcome = run_trial(&layout, &balance, &GameConfig::default(), 5);

        assert!(outcome.capped);
        assert_eq!(outcome.frames, 300);
        assert_eq!(outcome.placements.len(), 4);
        assert!(outcome.placements.iter().all(|p| p.finish_frame.is_none()));
        let mut positions: Vec<u32> = outcome.placements.iter().map(|p| p.position).collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn reports_are_reproducible() {
        let balance = small();
        let game = GameConfig::default();
        let a = run_balance(&balance, &game).unwrap();
        let b = run_balance(&balance, &game).unwrap();
        assert_eq!(a.standings, b.standings);
        assert!(a.render_table().contains("speeder"));
    }

    #[test]
    fn unknown_track_fails() {
        let balance = BalanceConfig {
            track_id: "nowhere".into(),
            ..small()
        };
        assert!(run_balance(&balance, &GameConfig::default()).is_err());
    }
}
