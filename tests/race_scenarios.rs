//! End-to-end race scenarios through the public API only.

#![allow(clippy::unwrap_used)]

use approx::assert_relative_eq;
use bike_racer_lib::geometry::{distance, SEGMENT_SAMPLES};
use bike_racer_lib::racer::{BikeArchetype, RacerSpec, RgbColor, StrategyParams};
use bike_racer_lib::track::track_ids;
use bike_racer_lib::{
    cubic_bezier, generate_path, get_nodes, get_start_pose, resolve_collisions, update_racer,
    GameConfig, PathPoint, Racer, StartPose, TrackError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn spec(id: u32, position: PathPoint, angle: f32, bike: BikeArchetype) -> RacerSpec {
    RacerSpec {
        id,
        name: format!("Rider {id}"),
        color: RgbColor::new(10, 20, 30),
        racing_number: id,
        start_position: position,
        start_angle: angle,
        is_player: false,
        params: Some(StrategyParams::new(60.0, 60.0, 50.0)),
        bike: Some(bike),
    }
}

mod sampler {
    use super::*;

    #[test]
    fn path_length_and_first_point_for_every_track() {
        for id in track_ids() {
            let nodes = get_nodes(id).unwrap();
            let path = generate_path(&nodes);
            assert_eq!(path.len(), SEGMENT_SAMPLES * nodes.len());
            assert_relative_eq!(path[0].x, nodes[0].x, epsilon = 1e-4);
            assert_relative_eq!(path[0].y, nodes[0].y, epsilon = 1e-4);
        }
    }

    #[test]
    fn endpoint_law_for_arbitrary_controls() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let mut point = || {
                use rand::Rng;
                PathPoint::new(rng.gen_range(-1000.0..1000.0), rng.gen_range(-1000.0..1000.0))
            };
            let (p0, cp1, cp2, p3) = (point(), point(), point(), point());
            let start = cubic_bezier(p0, cp1, cp2, p3, 0.0);
            let end = cubic_bezier(p0, cp1, cp2, p3, 1.0);
            assert_eq!(start, p0);
            assert_relative_eq!(end.x, p3.x, epsilon = 1e-3);
            assert_relative_eq!(end.y, p3.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn provider_fails_fast_on_unknown_track() {
        assert!(matches!(get_nodes("void"), Err(TrackError::UnknownTrack(_))));
        assert!(matches!(get_start_pose("void"), Err(TrackError::UnknownTrack(_))));
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn lone_racer_finishes_three_laps_on_stadium() {
        let config = GameConfig::default();
        let path = generate_path(&get_nodes("stadium").unwrap());
        let pose = StartPose::from_path(&path);
        let mut rng = StdRng::seed_from_u64(31);
        let mut racer = Racer::new(
            spec(1, path[0], pose.heading(), BikeArchetype::Balanced),
            &config,
            &mut rng,
        );

        let total_laps = 3;
        let mut finish_time = None;
        let mut finish_changes = 0;
        let mut last_progress = 0.0;

        for frame in 0..20_000u64 {
            update_racer(&mut racer, &path, frame, total_laps, &config, &mut rng);
            if racer.finish_time != finish_time {
                finish_changes += 1;
                finish_time = racer.finish_time;
            }
            if !racer.finished {
                assert!(racer.lap < total_laps);
                assert!(racer.progress >= last_progress, "progress went backwards");
                last_progress = racer.progress;
            }
        }

        assert!(racer.finished, "stuck at lap {} index {}", racer.lap, racer.path_index);
        assert_eq!(racer.lap, total_laps);
        assert_eq!(finish_changes, 1);
        assert!(finish_time.unwrap() > config.start_delay_frames);
    }

    #[test]
    fn coincident_racers_drift_apart() {
        let config = GameConfig::default();
        let mut rng = StdRng::seed_from_u64(4);
        let spot = PathPoint::new(400.0, 400.0);
        let mut racers = vec![
            Racer::new(spec(1, spot, 0.0, BikeArchetype::Turner), &config, &mut rng),
            Racer::new(spec(2, spot, 0.0, BikeArchetype::Sprinter), &config, &mut rng),
        ];

        let mut gap = 0.0;
        for _ in 0..4 {
            resolve_collisions(&mut racers, &config);
            let next = distance(racers[0].position(), racers[1].position());
            assert!(next > gap);
            gap = next;
        }
    }

    #[test]
    fn resources_never_increase_or_go_negative() {
        let config = GameConfig::default();
        let path = generate_path(&get_nodes("hairpin").unwrap());
        let mut rng = StdRng::seed_from_u64(12);
        let mut racer = Racer::new(
            spec(1, path[0], 0.0, BikeArchetype::Speeder),
            &config,
            &mut rng,
        );
        racer.set_params(StrategyParams::new(100.0, 100.0, 100.0));

        let (mut fuel, mut tires) = (racer.fuel, racer.tires);
        for frame in 0..15_000u64 {
            update_racer(&mut racer, &path, frame, 50, &config, &mut rng);
            assert!(racer.fuel <= fuel && racer.fuel >= 0.0);
            assert!(racer.tires <= tires && racer.tires >= 0.0);
            assert!(racer.angle.sin().is_finite() && racer.angle.cos().is_finite());
            fuel = racer.fuel;
            tires = racer.tires;
        }
        assert!(racer.fuel < 50.0);
        assert!(racer.tires < 100.0);
        assert!(racer.current_speed > 0.0);
    }
}
