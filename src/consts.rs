//! Simulation constants
//!
//! Numbers that define the feel of the game. Distances are in screen pixels
//! after zoom; the original art is authored at 1/4 scale and blown up by
//! `PIXELS_ZOOM`.

/// Horizontal size of the visible window, in zoomed pixels.
pub const WINDOW_WIDTH: f32 = 1020.0;
/// Vertical size of the visible window, in zoomed pixels.
pub const WINDOW_HEIGHT: f32 = 896.0;
/// Art is authored at NES-ish resolution and scaled up by this factor.
pub const PIXELS_ZOOM: f32 = 4.0;

/// Distance beyond the viewport within which entities are pre-spawned and
/// behind which enemies are culled.
pub const STREAMING_MARGIN: f32 = 200.0;

/// Width of one collision grid bucket (34 source pixels, zoomed).
pub const COLLISION_CELL_WIDTH: f32 = 34.0 * PIXELS_ZOOM;

/// Player run speed in source pixels per second (pre-zoom).
pub const PLAYER_SPEED: f32 = 110.0;
/// Initial vertical speed of a jump, zoomed pixels per second.
pub const PLAYER_JUMP: f32 = 400.0 * PIXELS_ZOOM / 2.0;
/// Gravity applied to airborne entities, zoomed pixels per second squared.
pub const GRAVITY: f32 = 2200.0;

/// Speed of player bullets, zoomed pixels per second.
pub const PLAYER_BULLET_SPEED: f32 = 160.0 * PIXELS_ZOOM;
/// Speed of enemy bullets, zoomed pixels per second.
pub const ENEMY_BULLET_SPEED: f32 = 60.0 * PIXELS_ZOOM;

/// Capacity of the player bullet pool.
pub const MAX_PLAYER_BULLETS: usize = 10;
/// Capacity of the shared enemy bullet pool.
pub const MAX_ENEMY_BULLETS: usize = 40;

/// Vertical correction from the player's feet (its position) to the point
/// enemies aim at.
pub const AIM_FOOT_OFFSET: f32 = 18.0;

/// Fixed simulation timestep, seconds.
pub const FIXED_STEP: f32 = 1.0 / 60.0;
