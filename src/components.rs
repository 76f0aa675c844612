use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileKind {
    #[default]
    Empty = 0,
    Solid = 1,
    /// Permanent level boundary. Collides exactly like `Solid`.
    Wall = 2,
}

impl TileKind {
    pub fn is_solid(self) -> bool {
        matches!(self, TileKind::Solid | TileKind::Wall)
    }
}

/// Axis-aligned box in world pixels, `(x, y)` is the top-left corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Viewport size in pixels. Everything simulated is clamped inside it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Horizontal steering intent shared by input-driven and AI-driven bodies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Right,
    #[default]
    None,
}

impl Horizontal {
    pub fn from_sign(sign: i32) -> Self {
        match sign.signum() {
            -1 => Horizontal::Left,
            1 => Horizontal::Right,
            _ => Horizontal::None,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Horizontal::Left => -1.0,
            Horizontal::Right => 1.0,
            Horizontal::None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_collides_like_solid() {
        assert!(TileKind::Wall.is_solid());
        assert!(TileKind::Solid.is_solid());
        assert!(!TileKind::Empty.is_solid());
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        let c = Bounds::new(9.5, 9.5, 10.0, 10.0);
        assert!(a.intersects(&c));
    }
}
