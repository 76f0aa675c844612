use bevy::math::Vec2;

use crate::components::{Bounds, Canvas};
use crate::physics_core::is_solid_at;
use crate::tilemap::TileGrid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProjectileOwner {
    /// Index into the world's player list.
    Player(usize),
    Enemy,
}

/// A round bullet. Speeds are pixels per second.
#[derive(Clone, Debug, PartialEq)]
pub struct Projectile {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub owner: ProjectileOwner,
    pub active: bool,
}

impl Projectile {
    /// `direction` need not be normalized. A zero direction yields a bullet at rest.
    pub fn new(origin: Vec2, direction: Vec2, speed: f32, radius: f32, damage: f32, owner: ProjectileOwner) -> Self {
        let velocity = direction.normalize_or_zero() * speed;
        Self {
            position: origin,
            velocity,
            radius,
            damage,
            owner,
            active: true,
        }
    }

    pub fn update(&mut self, dt: f32, canvas: &Canvas) {
        self.position += self.velocity * dt;
        if self.is_offscreen(canvas) {
            self.active = false;
        }
    }

    pub fn is_offscreen(&self, canvas: &Canvas) -> bool {
        let p = self.position;
        let r = self.radius;
        p.x < -r || p.x > canvas.width + r || p.y < -r || p.y > canvas.height + r
    }

    /// Center plus four points a quarter radius out.
    pub fn hits_tiles(&self, grid: &TileGrid) -> bool {
        let q = self.radius / 4.0;
        let p = self.position;
        [
            p,
            p + Vec2::new(q, 0.0),
            p - Vec2::new(q, 0.0),
            p + Vec2::new(0.0, q),
            p - Vec2::new(0.0, q),
        ]
        .iter()
        .any(|s| is_solid_at(grid, s.x, s.y))
    }

    /// Circle-vs-rectangle overlap using the closest point on the rectangle.
    pub fn intersects(&self, rect: &Bounds) -> bool {
        let closest = Vec2::new(
            self.position.x.clamp(rect.x, rect.right()),
            self.position.y.clamp(rect.y, rect.bottom()),
        );
        self.position.distance_squared(closest) <= self.radius * self.radius
    }
}

/// Moves every live projectile and retires those that left the canvas or hit a tile.
pub fn advance_projectiles(projectiles: &mut [Projectile], dt: f32, canvas: &Canvas, grid: &TileGrid) {
    for projectile in projectiles.iter_mut().filter(|p| p.active) {
        projectile.update(dt, canvas);
        if projectile.active && projectile.hits_tiles(grid) {
            projectile.active = false;
        }
    }
}
