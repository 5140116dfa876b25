//! Concrete behaviour units
//!
//! Each submodule is one capability an entity can carry. The closed set of
//! variants lives in [`crate::behaviour::Behaviour`].

pub mod animation;
pub mod bullet;
pub mod canon;
pub mod collider;
pub mod movement;
pub mod pickup;
pub mod player;
