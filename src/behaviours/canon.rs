//! Turret state machine
//!
//! Canons cycle through shield phases: Hidden (shielded, invulnerable),
//! Showing (opening up), Shown (tracking and firing), Hiding (closing), and
//! a terminal Dying once life runs out. While Shown the barrel tracks the
//! player through twelve 30-degree sectors, stepping one sector per rotation
//! interval, and fires bursts of pooled bullets along the current sector.

use macroquad::math::{vec2, Vec2};

use crate::behaviour::{BehaviourUnit, UpdateCtx};
use crate::consts::{AIM_FOOT_OFFSET, ENEMY_BULLET_SPEED, PIXELS_ZOOM, WINDOW_WIDTH};
use crate::entity::{EntityCore, Units};
use crate::message::Message;
use crate::pool::PoolKind;

/// Sector animation strips, one per barrel direction. Sector 0 points right,
/// indices grow clockwise (3 straight down, 6 left, 9 straight up).
const DIR_ANIMS: [&str; 12] = [
    "Dir0", "Dir1", "Dir2", "Dir3", "Dir4", "Dir5", "Dir6", "Dir7", "Dir8", "Dir9", "Dir10",
    "Dir11",
];

/// Distance from the canon center to the muzzle, source pixels.
const MUZZLE_OFFSET: f32 = 12.0;

const CANON_LIFE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonState {
    Hidden,
    Showing,
    Shown,
    Hiding,
    Dying,
}

/// Tuning for one canon variant.
#[derive(Debug, Clone)]
pub struct CanonConfig {
    /// Lowest sector the barrel may reach.
    pub min_dir: i32,
    /// Highest sector the barrel may reach.
    pub max_dir: i32,
    /// Sector taken when the shield opens.
    pub default_dir: i32,
    /// Seconds between one-sector rotation steps.
    pub rotation_interval: f32,
    /// Shots per burst.
    pub burst_length: u32,
    /// Pause between bursts.
    pub burst_cooldown: f32,
    /// Pause between shots within a burst.
    pub shot_cooldown: f32,
    /// Minimum time spent shielded before reopening.
    pub time_hidden: f32,
    /// Time spent open before re-shielding.
    pub time_shown: f32,
    /// The shield only opens when the player is within this distance.
    pub activation_range: f32,
}

impl CanonConfig {
    /// The free-rotating wall canon.
    pub fn rotating(burst_length: u32) -> Self {
        Self {
            min_dir: 0,
            max_dir: 11,
            default_dir: 3,
            rotation_interval: 0.35,
            burst_length,
            burst_cooldown: 2.0,
            shot_cooldown: 0.25,
            time_hidden: 1.0,
            time_shown: 4.0,
            activation_range: WINDOW_WIDTH / 2.0,
        }
    }

    /// The embedded gun that only covers the left-facing arc and stays open
    /// once the player gets close.
    pub fn gulcan() -> Self {
        Self {
            min_dir: 5,
            max_dir: 7,
            default_dir: 6,
            rotation_interval: 0.5,
            burst_length: 3,
            burst_cooldown: 1.5,
            shot_cooldown: 0.3,
            time_hidden: 0.5,
            time_shown: 3600.0,
            activation_range: WINDOW_WIDTH * 0.4,
        }
    }
}

/// Sector of an aim vector. `dir` is in screen coordinates (y grows down);
/// sector 0 is straight right, 3 straight down, 6 left, 9 up.
pub fn aim_sector(dir: Vec2) -> i32 {
    let angle = (-dir.y).atan2(dir.x).to_degrees();
    if angle <= -155.0 || angle > 155.0 {
        6
    } else if angle <= -126.0 {
        5
    } else if angle <= -105.0 {
        4
    } else if angle <= -75.0 {
        3
    } else if angle <= -50.0 {
        2
    } else if angle <= -25.0 {
        1
    } else if angle <= 25.0 {
        0
    } else if angle <= 50.0 {
        11
    } else if angle <= 75.0 {
        10
    } else if angle <= 105.0 {
        9
    } else if angle <= 126.0 {
        8
    } else {
        7
    }
}

/// Unit firing direction for a sector, in screen coordinates.
pub fn sector_to_dir(sector: i32) -> Vec2 {
    let angle = (-(sector as f32) * 30.0).to_radians();
    vec2(angle.cos(), -angle.sin())
}

/// One rotation step from `current` toward `target`, the short way around
/// the twelve-sector wheel, refusing to leave the configured arc.
fn step_toward(current: i32, target: i32, min_dir: i32, max_dir: i32) -> i32 {
    if current == target {
        return current;
    }
    let diff = (target - current).rem_euclid(12);
    let step = if diff <= 6 { 1 } else { -1 };
    let next = (current + step).rem_euclid(12);
    if next < min_dir || next > max_dir {
        current
    } else {
        next
    }
}

pub struct CanonBehaviour {
    config: CanonConfig,
    state: CanonState,
    dir: i32,
    life: i32,
    state_time: f32,
    rotate_in: f32,
    shot_cooldown_left: f32,
    burst_cooldown_left: f32,
    shots_left: u32,
}

impl CanonBehaviour {
    pub fn new(config: CanonConfig) -> Self {
        let shots_left = config.burst_length;
        let burst_cooldown_left = config.burst_cooldown;
        Self {
            dir: config.default_dir,
            config,
            state: CanonState::Hidden,
            life: CANON_LIFE,
            state_time: 0.0,
            rotate_in: 0.0,
            shot_cooldown_left: 0.0,
            burst_cooldown_left,
            shots_left,
        }
    }

    pub fn state(&self) -> CanonState {
        self.state
    }

    pub fn life(&self) -> i32 {
        self.life
    }

    pub fn dir(&self) -> i32 {
        self.dir
    }

    fn enter(&mut self, state: CanonState) {
        self.state = state;
        self.state_time = 0.0;
    }

    fn set_collider(&self, siblings: &Units, enabled: bool) {
        if let Some(mut collider) = siblings.collider_mut() {
            collider.enabled = enabled;
        }
    }

    fn enter_dying(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx) {
        self.enter(CanonState::Dying);
        self.set_collider(siblings, false);
        if let Some(mut animator) = siblings.animator_mut() {
            animator.play_named("Dying");
        }
        ctx.send(core, &Message::Killed { at: core.position });
    }

    fn fire(&mut self, core: &EntityCore, ctx: &mut UpdateCtx) {
        let dir = sector_to_dir(self.dir);
        let origin = core.position + dir * MUZZLE_OFFSET * PIXELS_ZOOM;
        ctx.fire_bullet(PoolKind::EnemyBullets, origin, dir * ENEMY_BULLET_SPEED);
    }

    fn step_shown(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx, aim: Vec2, dt: f32) {
        let target = aim_sector(aim);
        self.rotate_in -= dt;
        if self.rotate_in <= 0.0 && self.dir != target {
            self.dir = step_toward(self.dir, target, self.config.min_dir, self.config.max_dir);
            self.rotate_in = self.config.rotation_interval;
        }
        if let Some(mut animator) = siblings.animator_mut() {
            animator.play_named(DIR_ANIMS[self.dir.rem_euclid(12) as usize]);
        }

        if self.burst_cooldown_left > 0.0 {
            self.burst_cooldown_left -= dt;
            return;
        }
        self.shot_cooldown_left -= dt;
        if self.shot_cooldown_left <= 0.0 {
            self.fire(core, ctx);
            self.shot_cooldown_left = self.config.shot_cooldown;
            self.shots_left = self.shots_left.saturating_sub(1);
            if self.shots_left == 0 {
                self.shots_left = self.config.burst_length;
                self.burst_cooldown_left = self.config.burst_cooldown;
            }
        }
    }
}

impl BehaviourUnit for CanonBehaviour {
    fn init(&mut self, _core: &mut EntityCore, siblings: &Units) {
        // Shielded until the shield opens for the first time.
        self.set_collider(siblings, false);
        if let Some(mut animator) = siblings.animator_mut() {
            animator.play_named("Closed");
        }
    }

    fn update(&mut self, core: &mut EntityCore, siblings: &Units, ctx: &mut UpdateCtx, dt: f32) {
        if self.state == CanonState::Dying {
            let finished = siblings.animator_mut().map_or(true, |a| a.is_finished());
            if finished {
                core.mark_for_removal();
            }
            return;
        }
        if self.life <= 0 {
            self.enter_dying(core, siblings, ctx);
            return;
        }
        let Some(player_pos) = ctx.player_position() else {
            return;
        };
        let aim = player_pos - vec2(0.0, AIM_FOOT_OFFSET * PIXELS_ZOOM) - core.position;

        self.state_time += dt;
        match self.state {
            CanonState::Hidden => {
                if self.state_time >= self.config.time_hidden
                    && aim.length() <= self.config.activation_range
                {
                    self.enter(CanonState::Showing);
                    if let Some(mut animator) = siblings.animator_mut() {
                        animator.play_named("Opening");
                    }
                }
            }
            CanonState::Showing => {
                let finished = siblings.animator_mut().map_or(true, |a| a.is_finished());
                if finished {
                    self.enter(CanonState::Shown);
                    self.dir = self.config.default_dir;
                    self.rotate_in = self.config.rotation_interval;
                    self.set_collider(siblings, true);
                }
            }
            CanonState::Shown => {
                self.step_shown(core, siblings, ctx, aim, dt);
                if self.state_time >= self.config.time_shown {
                    self.enter(CanonState::Hiding);
                    self.set_collider(siblings, false);
                    // The reveal frames, played in reverse.
                    if let Some(mut animator) = siblings.animator_mut() {
                        animator.restart_named("Closing");
                    }
                }
            }
            CanonState::Hiding => {
                let finished = siblings.animator_mut().map_or(true, |a| a.is_finished());
                if finished {
                    self.enter(CanonState::Hidden);
                    if let Some(mut animator) = siblings.animator_mut() {
                        animator.play_named("Closed");
                    }
                }
            }
            CanonState::Dying => unreachable!("handled before the player check"),
        }
    }

    fn receive(&mut self, _core: &mut EntityCore, _siblings: &Units, msg: &Message) {
        if let Message::Hit { damage } = msg {
            if self.state != CanonState::Dying {
                self.life -= damage;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, RemovalPolicy};
    use crate::level::factory::rotating_canon_at;
    use crate::level::{Layer, Level};
    use crate::services::{NullBatch, SpriteSheetId};
    use crate::{Behaviour, KeyStatus, LevelConfig};

    #[test]
    fn sector_table_matches_the_aiming_chart() {
        let deg = |d: f32| vec2(d.to_radians().cos(), -d.to_radians().sin());
        assert_eq!(aim_sector(deg(0.0)), 0);
        assert_eq!(aim_sector(deg(25.0)), 0);
        assert_eq!(aim_sector(deg(25.001)), 11);
        assert_eq!(aim_sector(deg(90.0)), 9);
        assert_eq!(aim_sector(deg(155.0)), 7);
        assert_eq!(aim_sector(deg(179.0)), 6);
        assert_eq!(aim_sector(deg(-179.0)), 6);
        assert_eq!(aim_sector(deg(-90.0)), 3);
        assert_eq!(aim_sector(deg(-25.0)), 1);
        assert_eq!(aim_sector(deg(-24.999)), 0);
    }

    #[test]
    fn sector_to_dir_covers_the_cardinals() {
        assert!((sector_to_dir(0) - vec2(1.0, 0.0)).length() < 1e-5);
        assert!((sector_to_dir(3) - vec2(0.0, 1.0)).length() < 1e-5);
        assert!((sector_to_dir(6) - vec2(-1.0, 0.0)).length() < 1e-5);
        assert!((sector_to_dir(9) - vec2(0.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_steps_take_the_short_way_around() {
        assert_eq!(step_toward(11, 1, 0, 11), 0);
        assert_eq!(step_toward(1, 11, 0, 11), 0);
        assert_eq!(step_toward(3, 6, 0, 11), 4);
        assert_eq!(step_toward(6, 6, 0, 11), 6);
    }

    #[test]
    fn rotation_respects_the_configured_arc() {
        // Gulcan arc is 5..=7; stepping toward sector 0 pins at the edge.
        assert_eq!(step_toward(5, 0, 5, 7), 5);
        assert_eq!(step_toward(7, 0, 5, 7), 7);
        assert_eq!(step_toward(6, 7, 5, 7), 7);
    }

    fn canon_state(level: &Level, id: crate::EntityId) -> CanonState {
        match &*level.arena().get(id).unwrap().units().0[0].borrow() {
            Behaviour::Canon(c) => c.state(),
            _ => panic!("canon unit first"),
        }
    }

    fn level_with_canon_and_player() -> (Level, crate::EntityId) {
        let mut level = Level::new(4000.0, LevelConfig::default());
        level.install_test_bullet_pool(PoolKind::EnemyBullets, 4);
        let player = Entity::new(vec2(600.0, 700.0), RemovalPolicy::Destroy);
        let player_id = level.add_live(player, Layer::Player);
        level.set_player(player_id);
        let canon = rotating_canon_at(SpriteSheetId(0), vec2(500.0, 700.0), 3);
        let id = level.add_live(canon, Layer::Enemies);
        (level, id)
    }

    fn run(level: &mut Level, frames: usize) {
        for _ in 0..frames {
            level.update(&KeyStatus::default(), &mut NullBatch, 1.0 / 60.0);
        }
    }

    #[test]
    fn shield_opens_near_the_player_and_fires() {
        let (mut level, id) = level_with_canon_and_player();
        assert_eq!(canon_state(&level, id), CanonState::Hidden);
        // Stays shielded through the minimum hidden time.
        run(&mut level, 30);
        assert_eq!(canon_state(&level, id), CanonState::Hidden);
        // Opens once the hidden time elapses with the player in range.
        run(&mut level, 60);
        assert!(matches!(
            canon_state(&level, id),
            CanonState::Showing | CanonState::Shown
        ));
        // After the opening animation and the first burst cooldown, bullets
        // fly; the shown window (4 seconds) has not run out yet.
        run(&mut level, 200);
        assert_eq!(canon_state(&level, id), CanonState::Shown);
        assert!(level.pools_mut().get_mut(PoolKind::EnemyBullets).active_count() > 0);
    }

    #[test]
    fn re_shielding_walks_the_reveal_backward() {
        let (mut level, id) = level_with_canon_and_player();
        // Through the hidden delay, the opening and the full shown window.
        run(&mut level, 330);
        assert_eq!(canon_state(&level, id), CanonState::Hiding);
        let name = level
            .arena()
            .get(id)
            .unwrap()
            .units()
            .animator_mut()
            .unwrap()
            .current_name();
        assert_eq!(name, Some("Closing"));
        // The close plays out and the shield settles.
        run(&mut level, 40);
        assert_eq!(canon_state(&level, id), CanonState::Hidden);
        let shielded = !level
            .arena()
            .get(id)
            .unwrap()
            .units()
            .collider_ref()
            .unwrap()
            .enabled;
        assert!(shielded);
    }

    #[test]
    fn lethal_damage_plays_out_the_death_and_removes_the_canon() {
        let (mut level, id) = level_with_canon_and_player();
        level.test_deliver(id, &Message::Hit { damage: CANON_LIFE });
        run(&mut level, 120);
        assert!(level.arena().get(id).is_none());
    }

    #[test]
    fn hidden_canon_keeps_its_collider_off() {
        let (mut level, id) = level_with_canon_and_player();
        run(&mut level, 10);
        let enabled = level
            .arena()
            .get(id)
            .unwrap()
            .units()
            .collider_ref()
            .unwrap()
            .enabled;
        assert!(!enabled);
    }
}
