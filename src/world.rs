//! Heading to scroll-velocity mapping and the tiled backdrop.
//!
//! The rider never moves on screen. The world scrolls the other way instead:
//! every tick each road position has the velocity subtracted from it.

use glam::Vec2;

use crate::heading::Heading;

pub fn world_velocity(heading: Heading, speed: f32) -> Vec2 {
    heading.unit() * speed
}

/// Infinite grass tiling, shifted with the road and wrapped to one tile.
#[derive(Debug, Clone, Copy)]
pub struct Backdrop {
    shift: Vec2,
    tile: f32,
}

impl Backdrop {
    pub fn new(tile: f32) -> Self {
        Self {
            shift: Vec2::ZERO,
            tile,
        }
    }

    pub fn advance(&mut self, velocity: Vec2) {
        self.shift = (self.shift - velocity).rem_euclid(Vec2::splat(self.tile));
    }

    /// Offset into the tile, each axis in `0..tile`.
    pub fn shift(&self) -> Vec2 {
        self.shift
    }

    pub fn tile(&self) -> f32 {
        self.tile
    }
}
