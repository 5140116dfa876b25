//! macroquad adapter
//!
//! The only module that talks to the windowing/input/GPU side. It polls the
//! keyboard into a [`KeyStatus`] snapshot, decodes PNG sheets into textures,
//! derives the walkable floor from an alpha mask, and replays the core's
//! draw requests through macroquad.

use std::rc::Rc;

use macroquad::prelude::{
    draw_texture_ex, is_key_down, vec2, DrawTextureParams, FilterMode, KeyCode, Texture2D, WHITE,
};

use crate::consts::PIXELS_ZOOM;
use crate::services::{
    AssetError, AssetStore, DrawRequest, Floor, KeyStatus, SpriteBatch, SpriteSheet, SpriteSheetId,
};

/// Read the keyboard into this frame's input snapshot.
pub fn poll_key_status() -> KeyStatus {
    KeyStatus {
        fire: is_key_down(KeyCode::Z),
        jump: is_key_down(KeyCode::X),
        left: is_key_down(KeyCode::Left),
        right: is_key_down(KeyCode::Right),
        up: is_key_down(KeyCode::Up),
        down: is_key_down(KeyCode::Down),
        pause: is_key_down(KeyCode::P),
        start: is_key_down(KeyCode::Enter),
        esc: is_key_down(KeyCode::Escape),
        debug: is_key_down(KeyCode::G),
    }
}

/// Floor built from a mask image: per source column, the first opaque pixel
/// from the top is the walkable height.
struct MaskFloor {
    heights: Vec<f32>,
}

impl Floor for MaskFloor {
    fn height_at(&self, x: f32) -> f32 {
        if self.heights.is_empty() {
            return 0.0;
        }
        let column = ((x / PIXELS_ZOOM) as usize).min(self.heights.len() - 1);
        self.heights[column]
    }
}

/// Texture-backed asset store.
pub struct MacroquadAssets {
    textures: Vec<Texture2D>,
}

impl MacroquadAssets {
    pub fn new() -> Self {
        Self {
            textures: Vec::new(),
        }
    }

    fn decode(path: &str) -> Result<image::RgbaImage, AssetError> {
        let bytes =
            std::fs::read(path).map_err(|e| AssetError(format!("read {path}: {e}")))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| AssetError(format!("decode {path}: {e}")))?;
        Ok(decoded.to_rgba8())
    }
}

impl Default for MacroquadAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MacroquadAssets {
    fn create_sprite(&mut self, path: &str) -> Result<SpriteSheet, AssetError> {
        let image = Self::decode(path)?;
        let (width, height) = image.dimensions();
        let texture = Texture2D::from_rgba8(width as u16, height as u16, &image);
        // Scaled pixel art: no smoothing.
        texture.set_filter(FilterMode::Nearest);
        let id = SpriteSheetId(self.textures.len());
        self.textures.push(texture);
        log::debug!("sprite sheet {path} loaded as {id:?} ({width}x{height})");
        Ok(SpriteSheet {
            id,
            width: width as f32,
            height: height as f32,
        })
    }

    fn create_floor(&mut self, path: &str) -> Result<Rc<dyn Floor>, AssetError> {
        let image = Self::decode(path)?;
        let (width, height) = image.dimensions();
        let mut heights = Vec::with_capacity(width as usize);
        for x in 0..width {
            let solid_from = (0..height)
                .find(|&y| image.get_pixel(x, y).0[3] > 0)
                .unwrap_or(height);
            heights.push(solid_from as f32 * PIXELS_ZOOM);
        }
        Ok(Rc::new(MaskFloor { heights }))
    }
}

/// Replays draw requests through macroquad, looking textures up by sheet id.
pub struct MacroquadBatch<'a> {
    assets: &'a MacroquadAssets,
}

impl<'a> MacroquadBatch<'a> {
    pub fn new(assets: &'a MacroquadAssets) -> Self {
        Self { assets }
    }
}

impl SpriteBatch for MacroquadBatch<'_> {
    fn draw(&mut self, request: &DrawRequest) {
        let Some(texture) = self.assets.textures.get(request.sheet.0) else {
            debug_assert!(false, "draw request for unknown sheet {:?}", request.sheet);
            return;
        };
        draw_texture_ex(
            texture,
            request.dst.x,
            request.dst.y,
            WHITE,
            DrawTextureParams {
                dest_size: Some(vec2(request.dst.w, request.dst.h)),
                source: Some(request.src),
                flip_x: request.mirror,
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_floor_reads_column_heights() {
        let floor = MaskFloor {
            heights: vec![100.0, 100.0, 60.0, 60.0],
        };
        // Zoomed x 0..4 is source column 0.
        assert_eq!(floor.height_at(0.0), 100.0);
        assert_eq!(floor.height_at(8.5), 60.0);
        // Beyond the mask: clamp to the last column.
        assert_eq!(floor.height_at(500.0), 60.0);
    }

    #[test]
    fn empty_mask_is_a_flat_zero_floor() {
        let floor = MaskFloor { heights: vec![] };
        assert_eq!(floor.height_at(42.0), 0.0);
    }
}
