//! Level descriptors
//!
//! Levels are authored as RON files (`level.ron` in the level folder) naming
//! the art assets and placing every spawnable. Descriptors are validated
//! after parsing; a descriptor that parses but lies about its content is as
//! recoverable an error as one that does not parse.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::message::PickupKind;
use crate::services::AssetError;

/// Validation bounds for descriptor content.
pub mod limits {
    /// Total spawn entries a single level may carry.
    pub const MAX_SPAWNS: usize = 1024;
    /// Coordinates beyond this are authoring mistakes.
    pub const MAX_COORD: f32 = 1_000_000.0;
    /// Shots per burst a canon may be configured with.
    pub const MAX_BURST: u32 = 32;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonSpawn {
    pub pos: (f32, f32),
    pub burst_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSpawn {
    pub pos: (f32, f32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupSpawn {
    pub pos: (f32, f32),
    pub content: PickupKind,
}

/// Everything needed to build one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDescriptor {
    /// Background image; its width defines the level width.
    pub background: String,
    /// Alpha mask defining the walkable floor height per column.
    pub floor_mask: String,
    pub player_sheet: String,
    pub enemies_sheet: String,
    pub pickups_sheet: String,
    #[serde(default = "default_player_start")]
    pub player_start: (f32, f32),
    #[serde(default)]
    pub rotating_canons: Vec<CanonSpawn>,
    #[serde(default)]
    pub gulcans: Vec<PointSpawn>,
    #[serde(default)]
    pub covered_pickups: Vec<PickupSpawn>,
    #[serde(default)]
    pub flying_pickups: Vec<PickupSpawn>,
}

fn default_player_start() -> (f32, f32) {
    (50.0 * crate::consts::PIXELS_ZOOM, 0.0)
}

impl LevelDescriptor {
    pub fn spawn_count(&self) -> usize {
        self.rotating_canons.len()
            + self.gulcans.len()
            + self.covered_pickups.len()
            + self.flying_pickups.len()
    }
}

/// Errors from loading or building a level. All recoverable: the caller
/// falls back to an unloaded level.
#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    Parse(ron::error::SpannedError),
    Validation(String),
    Asset(AssetError),
}

impl From<std::io::Error> for LevelError {
    fn from(err: std::io::Error) -> Self {
        LevelError::Io(err)
    }
}

impl From<ron::error::SpannedError> for LevelError {
    fn from(err: ron::error::SpannedError) -> Self {
        LevelError::Parse(err)
    }
}

impl From<AssetError> for LevelError {
    fn from(err: AssetError) -> Self {
        LevelError::Asset(err)
    }
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "io error: {err}"),
            LevelError::Parse(err) => write!(f, "descriptor parse error: {err}"),
            LevelError::Validation(msg) => write!(f, "invalid descriptor: {msg}"),
            LevelError::Asset(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for LevelError {}

/// Read and validate `folder/level.ron`.
pub fn load(folder: &Path) -> Result<LevelDescriptor, LevelError> {
    let text = std::fs::read_to_string(folder.join("level.ron"))?;
    let descriptor: LevelDescriptor = ron::from_str(&text)?;
    validate(&descriptor)?;
    Ok(descriptor)
}

pub fn validate(descriptor: &LevelDescriptor) -> Result<(), LevelError> {
    let fail = |msg: String| Err(LevelError::Validation(msg));
    for (name, path) in [
        ("background", &descriptor.background),
        ("floor_mask", &descriptor.floor_mask),
        ("player_sheet", &descriptor.player_sheet),
        ("enemies_sheet", &descriptor.enemies_sheet),
        ("pickups_sheet", &descriptor.pickups_sheet),
    ] {
        if path.is_empty() {
            return fail(format!("{name} path is empty"));
        }
    }
    if descriptor.spawn_count() > limits::MAX_SPAWNS {
        return fail(format!(
            "{} spawns exceed the limit of {}",
            descriptor.spawn_count(),
            limits::MAX_SPAWNS
        ));
    }
    let mut positions = vec![descriptor.player_start];
    positions.extend(descriptor.rotating_canons.iter().map(|s| s.pos));
    positions.extend(descriptor.gulcans.iter().map(|s| s.pos));
    positions.extend(descriptor.covered_pickups.iter().map(|s| s.pos));
    positions.extend(descriptor.flying_pickups.iter().map(|s| s.pos));
    for (x, y) in positions {
        if !x.is_finite() || !y.is_finite() || x.abs() > limits::MAX_COORD || y.abs() > limits::MAX_COORD
        {
            return fail(format!("spawn position ({x}, {y}) out of range"));
        }
    }
    for canon in &descriptor.rotating_canons {
        if canon.burst_length == 0 || canon.burst_length > limits::MAX_BURST {
            return fail(format!("canon burst length {} out of range", canon.burst_length));
        }
    }
    Ok(())
}
