//! RUNGUN: runtime simulation core for a side-scrolling run-and-gun game
//!
//! This crate owns the hard part of the game: entities and their behaviour
//! units, spatial collision queries, reusable projectile pools, and the level
//! streaming logic that spawns and culls content as the camera advances.
//! Everything runs single-threaded at a fixed timestep with strict per-frame
//! ordering (spawn before update, collision rebuild before queries, update
//! before removal, removal before addition).
//!
//! Rendering, audio, input polling and asset decoding are external
//! collaborators reached through the narrow interfaces in [`services`]; a
//! macroquad adapter lives in [`backend`].

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod backend;
pub mod behaviour;
pub mod behaviours;
pub mod consts;
pub mod entity;
pub mod game;
pub mod grid;
pub mod level;
pub mod message;
pub mod pool;
pub mod services;

// Re-export main types
pub use behaviour::{Behaviour, BehaviourUnit, UpdateCtx};
pub use entity::{Arena, Entity, EntityCore, EntityId, RemovalPolicy};
pub use game::{FrameOutcome, Game};
pub use grid::CollisionGrid;
pub use level::{Layer, Level, LevelConfig};
pub use message::Message;
pub use pool::{ObjectPool, PoolExhausted, PoolKind, PoolRegistry};
pub use services::{DrawRequest, KeyStatus, SpriteBatch, SpriteSheet};
