//! Entity messages
//!
//! Entities communicate through synchronous typed-payload messages delivered
//! immediately to registered receivers — there is no queueing or cross-frame
//! delay. Disabled receivers are skipped, not deferred.

use macroquad::math::Vec2;
use serde::{Deserialize, Serialize};

/// What a pickup grants when collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    MachineGun,
    Spread,
    Rapid,
    Barrier,
    ExtraLife,
}

/// Payloads delivered through `UpdateCtx::send` / `UpdateCtx::deliver`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Message {
    /// The receiver was struck for `damage` points.
    Hit { damage: i32 },
    /// The sender died at `at` (score/effects hooks listen for this).
    Killed { at: Vec2 },
    /// The receiver collected a pickup.
    PickupCollected { kind: PickupKind },
    /// The player ran out of lives.
    PlayerDied,
}
