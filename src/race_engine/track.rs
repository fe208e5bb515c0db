//! Track - Built-in track data and the editable racing-line layout
//!
//! Tracks are static node tables looked up by id. A [`TrackLayout`] owns a
//! working copy of the nodes plus the sampled physics path and regenerates
//! the path after every edit.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::race_engine::error::{TrackError, TrackResult};
use crate::race_engine::geometry::{generate_path, BezierNode, PathPoint};

/// Minimum node count for a closed racing line
pub const MIN_TRACK_NODES: usize = 3;

/// Track used when no id is given
pub const DEFAULT_TRACK_ID: &str = "stadium";

/// Start/finish line placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPose {
    /// Centre of the start line
    pub center: PathPoint,
    /// Unit vector pointing in the direction of travel
    pub forward: PathPoint,
}

impl StartPose {
    /// Derive a pose from the first two path points.
    ///
    /// Panics on a path with fewer than two points.
    pub fn from_path(path: &[PathPoint]) -> Self {
        assert!(path.len() >= 2, "start pose needs at least two path points");
        Self {
            center: path[0],
            forward: path[1].sub(path[0]).normalize(),
        }
    }

    /// Heading of the forward vector in radians
    pub fn heading(&self) -> f32 {
        self.forward.y.atan2(self.forward.x)
    }
}

/// How a track is drawn. Rendering is external; this only picks the geometry.
#[derive(Debug, Clone, Copy)]
enum VisualStyle {
    /// Draw the racing line itself
    RacingLine,
    /// A background image carries the artwork, nothing to draw
    BackgroundImage,
    /// Draw the racing line scaled about its centroid (outer kerb)
    Kerb(f32),
}

struct TrackDef {
    id: &'static str,
    nodes: &'static [BezierNode],
    start_pose: Option<StartPose>,
    visual: VisualStyle,
}

const fn node(x: f32, y: f32, hin: (f32, f32), hout: (f32, f32)) -> BezierNode {
    BezierNode::new(x, y, PathPoint::new(hin.0, hin.1), PathPoint::new(hout.0, hout.1))
}

// Oval with two 350px radius ends; no explicit start pose.
const STADIUM: [BezierNode; 7] = [
    node(950.0, 200.0, (-117.0, 0.0), (117.0, 0.0)),
    node(1300.0, 200.0, (-117.0, 0.0), (193.0, 0.0)),
    node(1650.0, 550.0, (0.0, -193.0), (0.0, 193.0)),
    node(1300.0, 900.0, (193.0, 0.0), (-233.0, 0.0)),
    node(600.0, 900.0, (233.0, 0.0), (-193.0, 0.0)),
    node(250.0, 550.0, (0.0, 193.0), (0.0, -193.0)),
    node(600.0, 200.0, (-193.0, 0.0), (117.0, 0.0)),
];

const COASTLINE: [BezierNode; 7] = [
    node(700.0, 150.0, (-150.0, 0.0), (150.0, 0.0)),
    node(1400.0, 150.0, (-200.0, 0.0), (180.0, 0.0)),
    node(1750.0, 450.0, (0.0, -170.0), (0.0, 170.0)),
    node(1400.0, 850.0, (180.0, 0.0), (-150.0, 0.0)),
    node(1000.0, 800.0, (150.0, 0.0), (-150.0, 0.0)),
    node(600.0, 850.0, (150.0, 0.0), (-180.0, 0.0)),
    node(250.0, 500.0, (0.0, 170.0), (0.0, -170.0)),
];

const HAIRPIN: [BezierNode; 7] = [
    node(500.0, 300.0, (-150.0, 0.0), (150.0, 0.0)),
    node(1300.0, 300.0, (-250.0, 0.0), (120.0, 0.0)),
    node(1500.0, 450.0, (0.0, -90.0), (0.0, 90.0)),
    node(1300.0, 600.0, (120.0, 0.0), (-200.0, 0.0)),
    node(800.0, 620.0, (200.0, 0.0), (-200.0, 0.0)),
    node(400.0, 640.0, (150.0, 0.0), (-130.0, 0.0)),
    node(200.0, 470.0, (0.0, 110.0), (0.0, -110.0)),
];

static TRACKS: [TrackDef; 3] = [
    TrackDef {
        id: "stadium",
        nodes: &STADIUM,
        start_pose: None,
        visual: VisualStyle::RacingLine,
    },
    TrackDef {
        id: "coastline",
        nodes: &COASTLINE,
        start_pose: Some(StartPose {
            center: PathPoint::new(760.0, 150.0),
            forward: PathPoint::new(1.0, 0.0),
        }),
        visual: VisualStyle::BackgroundImage,
    },
    TrackDef {
        id: "hairpin",
        nodes: &HAIRPIN,
        start_pose: Some(StartPose {
            center: PathPoint::new(560.0, 300.0),
            forward: PathPoint::new(1.0, 0.0),
        }),
        visual: VisualStyle::Kerb(1.08),
    },
];

fn find_track(track_id: &str) -> TrackResult<&'static TrackDef> {
    let track = TRACKS
        .iter()
        .find(|t| t.id == track_id)
        .ok_or_else(|| TrackError::unknown_track(track_id))?;
    validate_nodes(track.nodes)?;
    Ok(track)
}

/// Ids of every built-in track
pub fn track_ids() -> impl Iterator<Item = &'static str> {
    TRACKS.iter().map(|t| t.id)
}

/// Reject node lists that cannot form a closed loop
pub fn validate_nodes(nodes: &[BezierNode]) -> TrackResult<()> {
    if nodes.len() < MIN_TRACK_NODES {
        return Err(TrackError::TooFewNodes {
            required: MIN_TRACK_NODES,
            actual: nodes.len(),
        });
    }
    Ok(())
}

/// Control nodes of a built-in track, in travel order
pub fn get_nodes(track_id: &str) -> TrackResult<Vec<BezierNode>> {
    Ok(find_track(track_id)?.nodes.to_vec())
}

/// Explicit start pose, if the track defines one.
///
/// `None` means the consumer derives the pose from the path
/// ([`StartPose::from_path`]).
pub fn get_start_pose(track_id: &str) -> TrackResult<Option<StartPose>> {
    Ok(find_track(track_id)?.start_pose)
}

/// Cosmetic geometry for renderers. Never used by the physics.
pub fn visual_path(track_id: &str) -> TrackResult<Vec<PathPoint>> {
    let track = find_track(track_id)?;
    let path = match track.visual {
        VisualStyle::RacingLine => generate_path(track.nodes),
        VisualStyle::BackgroundImage => Vec::new(),
        VisualStyle::Kerb(factor) => generate_path(&scale_nodes(track.nodes, factor)),
    };
    Ok(path)
}

fn scale_nodes(nodes: &[BezierNode], factor: f32) -> Vec<BezierNode> {
    let n = nodes.len() as f32;
    let centroid = nodes
        .iter()
        .fold(PathPoint::default(), |acc, node| acc.add(node.anchor()))
        .scale(1.0 / n);

    nodes
        .iter()
        .map(|node| {
            let anchor = centroid.add(node.anchor().sub(centroid).scale(factor));
            BezierNode::new(
                anchor.x,
                anchor.y,
                node.handle_in.scale(factor),
                node.handle_out.scale(factor),
            )
        })
        .collect()
}

/// Which handle of a node an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleSide {
    In,
    Out,
}

/// Editable racing line: working nodes plus the physics path sampled from
/// them. The path is shared read-only with the race and replaced wholesale
/// on every edit.
#[derive(Debug, Clone)]
pub struct TrackLayout {
    track_id: String,
    nodes: Vec<BezierNode>,
    path: Arc<[PathPoint]>,
    start_pose: Option<StartPose>,
}

impl TrackLayout {
    /// Load a built-in track
    pub fn load(track_id: &str) -> TrackResult<Self> {
        let track = find_track(track_id)?;
        Self::from_nodes(track.id, track.nodes.to_vec(), track.start_pose)
    }

    /// Build a layout from arbitrary nodes
    pub fn from_nodes(
        track_id: impl Into<String>,
        nodes: Vec<BezierNode>,
        start_pose: Option<StartPose>,
    ) -> TrackResult<Self> {
        validate_nodes(&nodes)?;
        let path = generate_path(&nodes).into();
        Ok(Self {
            track_id: track_id.into(),
            nodes,
            path,
            start_pose,
        })
    }

    pub fn track_id(&self) -> &str {
        &self.track_id
    }

    pub fn nodes(&self) -> &[BezierNode] {
        &self.nodes
    }

    /// Current physics path
    pub fn path(&self) -> &[PathPoint] {
        &self.path
    }

    /// Shared handle to the current physics path
    pub fn shared_path(&self) -> Arc<[PathPoint]> {
        Arc::clone(&self.path)
    }

    /// Explicit start pose, or one derived from the first two path points
    pub fn start_pose(&self) -> StartPose {
        self.start_pose
            .unwrap_or_else(|| StartPose::from_path(&self.path))
    }

    /// Move a node's anchor; its handles move with it
    pub fn move_anchor(&mut self, index: usize, position: PathPoint) -> TrackResult<()> {
        let node = self.node_mut(index)?;
        node.x = position.x;
        node.y = position.y;
        self.regenerate();
        Ok(())
    }

    /// Set one handle offset of a node
    pub fn set_handle(
        &mut self,
        index: usize,
        side: HandleSide,
        offset: PathPoint,
    ) -> TrackResult<()> {
        let node = self.node_mut(index)?;
        match side {
            HandleSide::In => node.handle_in = offset,
            HandleSide::Out => node.handle_out = offset,
        }
        self.regenerate();
        Ok(())
    }

    /// Replace every node at once
    pub fn replace_nodes(&mut self, nodes: Vec<BezierNode>) -> TrackResult<()> {
        validate_nodes(&nodes)?;
        self.nodes = nodes;
        self.regenerate();
        Ok(())
    }

    fn node_mut(&mut self, index: usize) -> TrackResult<&mut BezierNode> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(TrackError::NodeIndexOutOfRange { index, len })
    }

    fn regenerate(&mut self) {
        self.path = generate_path(&self.nodes).into();
        log::debug!(
            "Regenerated path for '{}': {} points",
            self.track_id,
            self.path.len()
        );
    }
}
