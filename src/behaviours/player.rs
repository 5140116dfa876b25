//! Player control
//!
//! Reads the frame's input snapshot and drives running, jumping, aiming and
//! firing. The player fires from the shared player-bullet pool; with the
//! default rifle, holding fire does not autofire (one shot per press).
//! Collected weapon pickups change the firing pattern; the barrier and the
//! extra life change survival instead. Dying drops the carried weapon.

use std::rc::Rc;

use macroquad::math::{vec2, Vec2};

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::consts::{GRAVITY, PIXELS_ZOOM, PLAYER_BULLET_SPEED, PLAYER_JUMP, PLAYER_SPEED};
use crate::entity::{EntityCore, Units};
use crate::message::{Message, PickupKind};
use crate::pool::PoolKind;
use crate::services::Floor;

const START_LIVES: i32 = 2;
const RESPAWN_DELAY: f32 = 1.0;
const RESPAWN_INVINCIBILITY: f32 = 2.0;
/// Muzzle height above the feet, source pixels.
const GUN_HEIGHT: f32 = 26.0;
/// Seconds between machine-gun rounds while fire is held.
const MACHINE_GUN_INTERVAL: f32 = 0.12;
/// Rapid rounds fly this much faster than regular ones.
const RAPID_SPEED_FACTOR: f32 = 1.6;
/// Half-angle of the spread fan, radians (15 degrees a side).
const SPREAD_ARC: f32 = 15.0 * std::f32::consts::PI / 180.0;
const BARRIER_TIME: f32 = 10.0;

/// The gun the player currently carries. Set by weapon pickups, reset to the
/// rifle on death.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weapon {
    Rifle,
    MachineGun,
    Spread,
    Rapid,
}

pub struct PlayerControl {
    floor: Rc<dyn Floor>,
    lives: i32,
    weapon: Weapon,
    facing_right: bool,
    grounded: bool,
    vertical_speed: f32,
    fire_held: bool,
    refire_in: f32,
    invincible_for: f32,
    respawn_in: Option<f32>,
    announce_death: bool,
}

impl PlayerControl {
    pub fn new(floor: Rc<dyn Floor>) -> Self {
        Self {
            floor,
            lives: START_LIVES,
            weapon: Weapon::Rifle,
            facing_right: true,
            grounded: false,
            vertical_speed: 0.0,
            fire_held: false,
            refire_in: 0.0,
            invincible_for: 0.0,
            respawn_in: None,
            announce_death: false,
        }
    }

    pub fn lives(&self) -> i32 {
        self.lives
    }

    pub fn weapon(&self) -> Weapon {
        self.weapon
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_for > 0.0
    }

    fn aim_direction(&self, ctx: &UpdateCtx) -> Vec2 {
        let keys = ctx.input;
        let mut dir = Vec2::ZERO;
        if keys.up {
            dir.y -= 1.0;
        }
        if keys.down && !self.grounded {
            dir.y += 1.0;
        }
        if keys.right {
            dir.x += 1.0;
        } else if keys.left {
            dir.x -= 1.0;
        } else if dir.y == 0.0 {
            dir.x = if self.facing_right { 1.0 } else { -1.0 };
        }
        if dir == Vec2::ZERO {
            dir.x = if self.facing_right { 1.0 } else { -1.0 };
        }
        dir.normalize()
    }

    fn step_movement(&mut self, core: &mut EntityCore, ctx: &UpdateCtx, dt: f32) {
        let keys = ctx.input;
        let run = PLAYER_SPEED * PIXELS_ZOOM;
        if keys.right {
            core.position.x += run * dt;
            self.facing_right = true;
        } else if keys.left {
            core.position.x -= run * dt;
            self.facing_right = false;
        }
        // The camera never scrolls back; neither does the player.
        let right_limit = (ctx.camera_x + ctx.viewport_width).min(ctx.level_width);
        core.position.x = core.position.x.clamp(ctx.camera_x, right_limit);

        if keys.jump && self.grounded {
            self.vertical_speed = -PLAYER_JUMP;
            self.grounded = false;
        }
        let floor_y = self.floor.height_at(core.position.x);
        if self.grounded {
            // Walked off a ledge?
            if floor_y > core.position.y + 1.0 {
                self.grounded = false;
            } else {
                core.position.y = floor_y;
            }
        }
        if !self.grounded {
            self.vertical_speed += GRAVITY * dt;
            core.position.y += self.vertical_speed * dt;
            if self.vertical_speed > 0.0 && core.position.y >= floor_y {
                core.position.y = floor_y;
                self.vertical_speed = 0.0;
                self.grounded = true;
            }
        }
    }

    fn step_firing(&mut self, core: &EntityCore, ctx: &mut UpdateCtx, dt: f32) {
        self.refire_in = (self.refire_in - dt).max(0.0);
        let pressed = ctx.input.fire && !self.fire_held;
        self.fire_held = ctx.input.fire;
        let trigger = match self.weapon {
            // The machine gun is the one gun that autofires on hold.
            Weapon::MachineGun => ctx.input.fire && self.refire_in <= 0.0,
            _ => pressed,
        };
        if !trigger {
            return;
        }
        self.refire_in = MACHINE_GUN_INTERVAL;

        let dir = self.aim_direction(ctx);
        let origin = core.position + vec2(0.0, -GUN_HEIGHT * PIXELS_ZOOM / 2.0);
        let speed = match self.weapon {
            Weapon::Rapid => PLAYER_BULLET_SPEED * RAPID_SPEED_FACTOR,
            _ => PLAYER_BULLET_SPEED,
        };
        match self.weapon {
            Weapon::Spread => {
                for arc in [-SPREAD_ARC, 0.0, SPREAD_ARC] {
                    let spread = Vec2::from_angle(arc).rotate(dir);
                    ctx.fire_bullet(PoolKind::PlayerBullets, origin, spread * speed);
                }
            }
            _ => {
                ctx.fire_bullet(PoolKind::PlayerBullets, origin, dir * speed);
            }
        }
    }

    fn drive_animation(&self, siblings: &Units, airborne: bool, moving: bool) {
        if let Some(mut animator) = siblings.animator_mut() {
            animator.mirror = !self.facing_right;
            if airborne {
                animator.play_named("Jump");
            } else if moving {
                animator.play_named("Run");
            } else {
                animator.play_named("Idle");
            }
        }
    }
}

impl BehaviourUnit for PlayerControl {
    fn init(&mut self, core: &mut EntityCore, _siblings: &Units) {
        core.position.y = self.floor.height_at(core.position.x);
        self.grounded = true;
    }

    fn update(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        if self.announce_death {
            self.announce_death = false;
            ctx.send(core, &Message::PlayerDied);
            core.mark_for_removal();
            return;
        }

        if let Some(delay) = &mut self.respawn_in {
            *delay -= dt;
            if *delay <= 0.0 {
                self.respawn_in = None;
                self.invincible_for = RESPAWN_INVINCIBILITY;
                core.position = vec2(ctx.camera_x + ctx.viewport_width * 0.25, 0.0);
                self.vertical_speed = 0.0;
                self.grounded = false;
                if let Some(mut collider) = siblings.collider_mut() {
                    collider.enabled = true;
                }
            }
            return;
        }

        self.invincible_for = (self.invincible_for - dt).max(0.0);
        self.step_movement(core, ctx, dt);
        self.step_firing(core, ctx, dt);
        let moving = ctx.input.left || ctx.input.right;
        self.drive_animation(siblings, !self.grounded, moving);
    }

    fn receive(&mut self, _core: &mut EntityCore, siblings: &Units, msg: &Message) {
        match msg {
            Message::Hit { .. } => {
                if self.invincible_for > 0.0 || self.respawn_in.is_some() {
                    return;
                }
                self.lives -= 1;
                self.weapon = Weapon::Rifle;
                if self.lives < 0 {
                    // Announced (and marked) from the next update, where the
                    // frame context is available.
                    self.announce_death = true;
                } else {
                    self.respawn_in = Some(RESPAWN_DELAY);
                    if let Some(mut collider) = siblings.collider_mut() {
                        collider.enabled = false;
                    }
                    if let Some(mut animator) = siblings.animator_mut() {
                        animator.play_named("Die");
                    }
                }
            }
            Message::PickupCollected { kind } => match kind {
                PickupKind::ExtraLife => self.lives += 1,
                PickupKind::Barrier => self.invincible_for = self.invincible_for.max(BARRIER_TIME),
                PickupKind::MachineGun => self.weapon = Weapon::MachineGun,
                PickupKind::Spread => self.weapon = Weapon::Spread,
                PickupKind::Rapid => self.weapon = Weapon::Rapid,
            },
            _ => {}
        }
    }
}
