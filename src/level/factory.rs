//! Entity assembly
//!
//! One place knows how each game object is put together: which units, in
//! which order (logic first, renderer, then collider), which animation
//! strips, which collision layers. Spawn data comes from the level
//! descriptor; sheets and the floor come from the asset store.

use std::path::Path;
use std::rc::Rc;

use macroquad::math::{vec2, Rect, Vec2};

use crate::behaviour::Behaviour;
use crate::behaviours::animation::{Animation, AnimationRenderer, Playback};
use crate::behaviours::bullet::Bullet;
use crate::behaviours::canon::{CanonBehaviour, CanonConfig};
use crate::behaviours::collider::BoxCollider;
use crate::behaviours::movement::{Bob, LinearMovement};
use crate::behaviours::pickup::{Pickup, PickupHolder};
use crate::behaviours::player::PlayerControl;
use crate::consts::{MAX_ENEMY_BULLETS, MAX_PLAYER_BULLETS, PIXELS_ZOOM};
use crate::entity::{Entity, RemovalPolicy};
use crate::grid::layers;
use crate::level::descriptor::LevelDescriptor;
use crate::level::{Layer, Level, LevelConfig, LevelError};
use crate::message::PickupKind;
use crate::pool::{ObjectPool, PoolKind, PoolRegistry};
use crate::services::{AssetStore, Floor, SpriteSheetId};

fn strip(
    name: &'static str,
    sheet_x: f32,
    sheet_y: f32,
    frame_w: f32,
    frame_h: f32,
    anchor_x: f32,
    anchor_y: f32,
    frames: usize,
    frame_time: f32,
    playback: Playback,
) -> Animation {
    Animation {
        name,
        sheet_x,
        sheet_y,
        frame_w,
        frame_h,
        anchor_x,
        anchor_y,
        frames,
        frame_time,
        playback,
    }
}

// ----- projectiles ------------------------------------------------------

/// A parked pool projectile. `DoNotDestroy`: leaving play returns it to the
/// pool instead of tearing it down.
pub fn bullet_entity(kind: PoolKind, sheet: SpriteSheetId) -> Entity {
    let (damage, collider) = match kind {
        PoolKind::PlayerBullets => (
            1,
            BoxCollider::new(
                Rect::new(-4.0, -4.0, 12.0, 12.0),
                layers::PLAYER_BULLETS,
                layers::ENEMIES,
            ),
        ),
        PoolKind::EnemyBullets => (
            1,
            BoxCollider::new(
                Rect::new(-6.0, -6.0, 12.0, 12.0),
                layers::ENEMY_BULLETS,
                layers::PLAYER,
            ),
        ),
    };
    let renderer = match kind {
        PoolKind::PlayerBullets => AnimationRenderer::new(sheet)
            .with_animation(strip("Bullet", 82.0, 10.0, 3.0, 3.0, 1.0, 1.0, 1, 0.2, Playback::Loop)),
        PoolKind::EnemyBullets => AnimationRenderer::new(sheet)
            .with_animation(strip("Bullet", 199.0, 72.0, 3.0, 3.0, 1.0, 1.0, 1, 0.2, Playback::Loop)),
    };
    Entity::new(Vec2::ZERO, RemovalPolicy::DoNotDestroy)
        .with_unit(Behaviour::Bullet(Bullet::new(kind, damage)))
        .with_unit(Behaviour::Render(renderer))
        .with_unit(Behaviour::Collider(collider))
}

/// Build both bullet pools. Slot entities are initialized once, parked
/// disabled, and live in the arena for the lifetime of the level.
pub fn install_bullet_pools(
    level: &mut Level,
    player_sheet: SpriteSheetId,
    enemies_sheet: SpriteSheetId,
) {
    let park = |level: &mut Level, kind: PoolKind, sheet: SpriteSheetId, count: usize| {
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let id = level.arena_mut().insert(bullet_entity(kind, sheet));
            if let Some(entity) = level.arena_mut().get_mut(id) {
                entity.init();
                entity.set_enabled(false);
            }
            slots.push(id);
        }
        ObjectPool::create(slots)
    };
    let player_pool = park(level, PoolKind::PlayerBullets, player_sheet, MAX_PLAYER_BULLETS);
    let enemy_pool = park(level, PoolKind::EnemyBullets, enemies_sheet, MAX_ENEMY_BULLETS);
    *level.pools_mut() = PoolRegistry::new(player_pool, enemy_pool);
}

// ----- the player -------------------------------------------------------

pub fn player_at(sheet: SpriteSheetId, floor: Rc<dyn Floor>, pos: Vec2) -> Entity {
    let renderer = AnimationRenderer::new(sheet)
        .with_animation(strip("Idle", 8.0, 0.0, 24.0, 34.0, 12.0, 33.0, 1, 0.2, Playback::Loop))
        .with_animation(strip("Run", 49.0, 0.0, 24.0, 34.0, 12.0, 33.0, 6, 0.1, Playback::Loop))
        .with_animation(strip("Jump", 224.0, 0.0, 20.0, 20.0, 10.0, 26.0, 4, 0.1, Playback::Loop))
        .with_animation(strip("Die", 0.0, 69.0, 34.0, 34.0, 17.0, 33.0, 5, 0.15, Playback::StopAndLast));
    Entity::new(pos, RemovalPolicy::Destroy)
        .with_unit(Behaviour::PlayerControl(PlayerControl::new(floor)))
        .with_unit(Behaviour::Render(renderer))
        .with_unit(Behaviour::Collider(BoxCollider::new(
            Rect::new(-6.0 * PIXELS_ZOOM, -33.0 * PIXELS_ZOOM, 12.0 * PIXELS_ZOOM, 33.0 * PIXELS_ZOOM),
            layers::PLAYER,
            layers::NONE,
        )))
}

// ----- canons -----------------------------------------------------------

fn canon_renderer(sheet: SpriteSheetId, base_x: f32, base_y: f32) -> AnimationRenderer {
    let mut renderer = AnimationRenderer::new(sheet)
        .with_animation(strip("Closed", base_x, base_y, 32.0, 32.0, 16.0, 16.0, 1, 0.2, Playback::Loop))
        .with_animation(strip("Opening", base_x + 32.0, base_y, 32.0, 32.0, 16.0, 16.0, 4, 0.1, Playback::StopAndLast))
        // The same frames as Opening, walked backward for the re-shield.
        .with_animation(strip("Closing", base_x + 32.0, base_y, 32.0, 32.0, 16.0, 16.0, 4, 0.1, Playback::Reverse))
        .with_animation(strip("Dying", base_x, base_y + 64.0, 32.0, 32.0, 16.0, 16.0, 5, 0.1, Playback::StopAndLast));
    // One static pose per barrel sector, left to right on the sheet.
    const DIR_ANIMS: [&str; 12] = [
        "Dir0", "Dir1", "Dir2", "Dir3", "Dir4", "Dir5", "Dir6", "Dir7", "Dir8", "Dir9", "Dir10",
        "Dir11",
    ];
    for (sector, name) in DIR_ANIMS.iter().enumerate() {
        renderer.add_animation(strip(
            name,
            base_x + sector as f32 * 32.0,
            base_y + 32.0,
            32.0,
            32.0,
            16.0,
            16.0,
            1,
            0.2,
            Playback::Loop,
        ));
    }
    renderer
}

fn canon_entity(config: CanonConfig, sheet: SpriteSheetId, pos: Vec2) -> Entity {
    Entity::new(pos, RemovalPolicy::Destroy)
        .with_unit(Behaviour::Canon(CanonBehaviour::new(config)))
        .with_unit(Behaviour::Render(canon_renderer(sheet, 0.0, 110.0)))
        .with_unit(Behaviour::Collider(BoxCollider::disabled(
            Rect::new(-10.0 * PIXELS_ZOOM, -10.0 * PIXELS_ZOOM, 20.0 * PIXELS_ZOOM, 20.0 * PIXELS_ZOOM),
            layers::ENEMIES,
            layers::NONE,
        )))
}

pub fn rotating_canon_at(sheet: SpriteSheetId, pos: Vec2, burst_length: u32) -> Entity {
    canon_entity(CanonConfig::rotating(burst_length), sheet, pos)
}

pub fn gulcan_at(sheet: SpriteSheetId, pos: Vec2) -> Entity {
    canon_entity(CanonConfig::gulcan(), sheet, pos)
}

// ----- pickups ----------------------------------------------------------

fn pickup_strip(kind: PickupKind) -> Animation {
    let slot = match kind {
        PickupKind::MachineGun => 0,
        PickupKind::Spread => 1,
        PickupKind::Rapid => 2,
        PickupKind::Barrier => 3,
        PickupKind::ExtraLife => 4,
    } as f32;
    strip("Pickup", 1.0 + slot * 25.0, 40.0, 24.0, 15.0, 12.0, 14.0, 1, 0.2, Playback::Loop)
}

/// The released pickup itself: falls to the floor, waits for the player.
pub fn pickup_at(
    sheet: SpriteSheetId,
    floor: Rc<dyn Floor>,
    pos: Vec2,
    kind: PickupKind,
) -> Entity {
    Entity::new(pos, RemovalPolicy::Destroy)
        .with_unit(Behaviour::Pickup(Pickup::new(kind, floor)))
        .with_unit(Behaviour::Render(AnimationRenderer::new(sheet).with_animation(pickup_strip(kind))))
        .with_unit(Behaviour::Collider(BoxCollider::new(
            Rect::new(-8.0 * PIXELS_ZOOM, -8.0 * PIXELS_ZOOM, 16.0 * PIXELS_ZOOM, 16.0 * PIXELS_ZOOM),
            layers::NONE,
            layers::PLAYER,
        )))
}

fn holder_entity(
    sheet: SpriteSheetId,
    floor: Rc<dyn Floor>,
    pos: Vec2,
    content: PickupKind,
) -> Entity {
    let renderer = AnimationRenderer::new(sheet)
        .with_animation(strip("Closed", 1.0, 76.0, 22.0, 23.0, 11.0, 11.0, 1, 0.2, Playback::Loop))
        .with_animation(strip("Dying", 24.0, 76.0, 22.0, 23.0, 11.0, 11.0, 4, 0.15, Playback::StopAndLast));
    Entity::new(pos, RemovalPolicy::Destroy)
        .with_unit(Behaviour::PickupHolder(PickupHolder::new(content, sheet, floor)))
        .with_unit(Behaviour::Render(renderer))
        .with_unit(Behaviour::Collider(BoxCollider::new(
            Rect::new(-11.0 * PIXELS_ZOOM, -11.0 * PIXELS_ZOOM, 22.0 * PIXELS_ZOOM, 22.0 * PIXELS_ZOOM),
            layers::ENEMIES,
            layers::NONE,
        )))
}

/// A grounded capsule holding a pickup.
pub fn covered_pickup_at(
    sheet: SpriteSheetId,
    floor: Rc<dyn Floor>,
    pos: Vec2,
    content: PickupKind,
) -> Entity {
    holder_entity(sheet, floor, pos, content)
}

/// A carrier drifting in from the right, bobbing as it goes.
pub fn flying_pickup_at(
    sheet: SpriteSheetId,
    floor: Rc<dyn Floor>,
    pos: Vec2,
    content: PickupKind,
) -> Entity {
    holder_entity(sheet, floor, pos, content)
        .with_unit(Behaviour::Movement(LinearMovement::new(vec2(
            -40.0 * PIXELS_ZOOM,
            0.0,
        ))))
        .with_unit(Behaviour::Bob(Bob::new(12.0 * PIXELS_ZOOM, 0.5)))
}

// ----- whole levels -----------------------------------------------------

/// Assemble a level from a validated descriptor: load assets, build pools,
/// place the player, queue every spawnable, prime the initial window.
pub fn build_level(
    descriptor: &LevelDescriptor,
    folder: &Path,
    assets: &mut dyn AssetStore,
    config: LevelConfig,
) -> Result<Level, LevelError> {
    let path_of = |rel: &str| folder.join(rel).to_string_lossy().into_owned();
    let background = assets.create_sprite(&path_of(&descriptor.background))?;
    let floor = assets.create_floor(&path_of(&descriptor.floor_mask))?;
    let player_sheet = assets.create_sprite(&path_of(&descriptor.player_sheet))?;
    let enemies_sheet = assets.create_sprite(&path_of(&descriptor.enemies_sheet))?;
    let pickups_sheet = assets.create_sprite(&path_of(&descriptor.pickups_sheet))?;

    let level_width = background.width * PIXELS_ZOOM;
    let mut level = Level::new(level_width, config);
    level.set_background(background);
    install_bullet_pools(&mut level, player_sheet.id, enemies_sheet.id);

    let start = vec2(descriptor.player_start.0, descriptor.player_start.1);
    let player_id = level.add_live(player_at(player_sheet.id, floor.clone(), start), Layer::Player);
    level.set_player(player_id);

    for spawn in &descriptor.rotating_canons {
        let entity = rotating_canon_at(
            enemies_sheet.id,
            vec2(spawn.pos.0, spawn.pos.1),
            spawn.burst_length,
        );
        level.add_to_backlog(entity, Layer::Enemies);
    }
    for spawn in &descriptor.gulcans {
        let entity = gulcan_at(enemies_sheet.id, vec2(spawn.pos.0, spawn.pos.1));
        level.add_to_backlog(entity, Layer::Enemies);
    }
    for spawn in &descriptor.covered_pickups {
        let entity = covered_pickup_at(
            pickups_sheet.id,
            floor.clone(),
            vec2(spawn.pos.0, spawn.pos.1),
            spawn.content,
        );
        level.add_to_backlog(entity, Layer::Enemies);
    }
    for spawn in &descriptor.flying_pickups {
        let entity = flying_pickup_at(
            pickups_sheet.id,
            floor.clone(),
            vec2(spawn.pos.0, spawn.pos.1),
            spawn.content,
        );
        level.add_to_backlog(entity, Layer::Enemies);
    }

    log::info!(
        "level {} loaded: width {level_width}, {} queued spawns",
        folder.display(),
        level.backlog_len()
    );
    level.init();
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AssetError, FlatFloor, SpriteSheet};

    /// Asset store that fabricates sheets without touching the filesystem.
    struct StubAssets {
        created: usize,
    }

    impl AssetStore for StubAssets {
        fn create_sprite(&mut self, _path: &str) -> Result<SpriteSheet, AssetError> {
            let id = self.created;
            self.created += 1;
            Ok(SpriteSheet {
                id: SpriteSheetId(id),
                width: 2000.0,
                height: 224.0,
            })
        }

        fn create_floor(&mut self, _path: &str) -> Result<Rc<dyn Floor>, AssetError> {
            Ok(Rc::new(FlatFloor(800.0)))
        }
    }

    /// Asset store whose sprites all fail to load.
    struct BrokenAssets;

    impl AssetStore for BrokenAssets {
        fn create_sprite(&mut self, path: &str) -> Result<SpriteSheet, AssetError> {
            Err(AssetError(format!("no such sprite: {path}")))
        }

        fn create_floor(&mut self, path: &str) -> Result<Rc<dyn Floor>, AssetError> {
            Err(AssetError(format!("no such floor: {path}")))
        }
    }

    fn descriptor() -> LevelDescriptor {
        LevelDescriptor {
            background: "bg.png".into(),
            floor_mask: "floor.png".into(),
            player_sheet: "player.png".into(),
            enemies_sheet: "enemies.png".into(),
            pickups_sheet: "pickups.png".into(),
            player_start: (200.0, 0.0),
            rotating_canons: vec![crate::level::descriptor::CanonSpawn {
                pos: (3000.0, 700.0),
                burst_length: 3,
            }],
            gulcans: Vec::new(),
            covered_pickups: Vec::new(),
            flying_pickups: Vec::new(),
        }
    }

    #[test]
    fn build_level_wires_the_whole_thing() {
        let mut assets = StubAssets { created: 0 };
        let level = build_level(
            &descriptor(),
            Path::new("levels/one"),
            &mut assets,
            LevelConfig::default(),
        )
        .unwrap();
        // Background is 2000 source pixels wide.
        assert_eq!(level.level_width(), 8000.0);
        assert!(level.is_initialized());
        assert!(level.player().is_some());
        // The canon at 3000 is beyond the initial window and still queued.
        assert_eq!(level.backlog_len(), 1);
        // Pool slots plus the player are alive in the arena.
        assert_eq!(
            level.arena().alive_count(),
            MAX_PLAYER_BULLETS + MAX_ENEMY_BULLETS + 1
        );
    }

    #[test]
    fn missing_level_file_yields_an_unloaded_level() {
        let dir = tempfile::tempdir().unwrap();
        let mut assets = StubAssets { created: 0 };
        let level = Level::create(dir.path(), &mut assets, LevelConfig::default());
        assert!(!level.is_initialized());
        assert_eq!(level.arena().alive_count(), 0);
    }

    #[test]
    fn broken_assets_yield_an_unloaded_level() {
        let dir = tempfile::tempdir().unwrap();
        let text = ron::to_string(&descriptor()).unwrap();
        std::fs::write(dir.path().join("level.ron"), text).unwrap();
        let level = Level::create(dir.path(), &mut BrokenAssets, LevelConfig::default());
        assert!(!level.is_initialized());
    }
}
