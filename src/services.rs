//! External collaborator interfaces
//!
//! The simulation core does not render, poll hardware or decode assets. It
//! talks to those services through the narrow traits in this module, passed
//! explicitly at creation time. `backend` provides macroquad-based
//! implementations; tests provide stubs.

use macroquad::math::Rect;
use std::rc::Rc;

/// Point-in-time snapshot of the named input flags, read once per frame.
///
/// The core treats this as truth for the whole frame; edge detection beyond
/// pause toggling is the responsibility of the behaviour that needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyStatus {
    pub fire: bool,
    pub jump: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub pause: bool,
    pub start: bool,
    pub esc: bool,
    pub debug: bool,
}

/// Identifies a loaded sprite sheet on the rendering side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteSheetId(pub usize);

/// A sprite sheet handle plus its dimensions (the level needs the background
/// width to derive its own width).
#[derive(Debug, Clone, Copy)]
pub struct SpriteSheet {
    pub id: SpriteSheetId,
    pub width: f32,
    pub height: f32,
}

/// One draw request: copy `src` (sheet pixels) to `dst` (screen pixels),
/// optionally mirrored horizontally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRequest {
    pub sheet: SpriteSheetId,
    pub src: Rect,
    pub dst: Rect,
    pub mirror: bool,
}

/// Receives the core's draw requests. Pixel formats, device contexts and
/// presentation are the implementor's problem.
pub trait SpriteBatch {
    fn draw(&mut self, request: &DrawRequest);
}

/// Walkable surface queried by entities that fall.
pub trait Floor {
    /// Height (screen y, growing downward) of the walkable surface at `x`.
    fn height_at(&self, x: f32) -> f32;
}

/// A floor at a constant height. Useful for tests and barebones levels.
#[derive(Debug, Clone, Copy)]
pub struct FlatFloor(pub f32);

impl Floor for FlatFloor {
    fn height_at(&self, _x: f32) -> f32 {
        self.0
    }
}

/// Error from the asset-loading collaborator.
#[derive(Debug)]
pub struct AssetError(pub String);

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset error: {}", self.0)
    }
}

impl std::error::Error for AssetError {}

/// Loads sprite sheets and floor masks. Internal formats are irrelevant to
/// the core; failures are recoverable configuration errors.
pub trait AssetStore {
    fn create_sprite(&mut self, path: &str) -> Result<SpriteSheet, AssetError>;
    fn create_floor(&mut self, path: &str) -> Result<Rc<dyn Floor>, AssetError>;
}

/// A batch that drops every request. Lets the simulation run headless.
#[derive(Debug, Default)]
pub struct NullBatch;

impl SpriteBatch for NullBatch {
    fn draw(&mut self, _request: &DrawRequest) {}
}
