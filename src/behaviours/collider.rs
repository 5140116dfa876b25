//! Axis-aligned collision box
//!
//! A data-only unit: the collision grid reads it at rebuild time, other units
//! toggle it. It never acts on its own during update.

use macroquad::math::{Rect, Vec2};

use crate::behaviour::BehaviourUnit;

/// Collision box attached to an entity.
///
/// `rect` is relative to the entity position; `layer` is the single bit this
/// box occupies and `check_mask` the layers its queries test against.
pub struct BoxCollider {
    pub rect: Rect,
    pub layer: u8,
    pub check_mask: u8,
    /// Disabled boxes are skipped at grid rebuild. Canons toggle this while
    /// shielded.
    pub enabled: bool,
}

impl BoxCollider {
    pub fn new(rect: Rect, layer: u8, check_mask: u8) -> Self {
        Self {
            rect,
            layer,
            check_mask,
            enabled: true,
        }
    }

    pub fn disabled(rect: Rect, layer: u8, check_mask: u8) -> Self {
        Self {
            enabled: false,
            ..Self::new(rect, layer, check_mask)
        }
    }

    /// Absolute bounds for an entity at `position`.
    pub fn bounds_at(&self, position: Vec2) -> Rect {
        Rect::new(
            position.x + self.rect.x,
            position.y + self.rect.y,
            self.rect.w,
            self.rect.h,
        )
    }
}

impl BehaviourUnit for BoxCollider {}

#[cfg(test)]
mod tests {
    use super::*;
    use macroquad::math::vec2;

    #[test]
    fn bounds_follow_the_entity() {
        let c = BoxCollider::new(Rect::new(-8.0, -16.0, 16.0, 16.0), 1, 0);
        let b = c.bounds_at(vec2(100.0, 50.0));
        assert_eq!((b.x, b.y, b.w, b.h), (92.0, 34.0, 16.0, 16.0));
    }
}
