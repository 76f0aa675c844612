use bevy::math::Vec2;

use crate::ai::{direction_toward, FollowParams, PathFollower};
use crate::components::{Bounds, Canvas, Horizontal};
use crate::config::{Constants, EnemyConstants, SeekerConstants, ShooterConstants};
use crate::generation::Rng;
use crate::pathfinding::NavGraph;
use crate::physics::{BodyParams, KinematicBody, StepContext};
use crate::projectile::{Projectile, ProjectileOwner};
use crate::tilemap::TileGrid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnemyPhase {
    /// Descending from above the canvas toward `target_y`.
    Spawning { target_y: f32 },
    Active,
    Dying { started_ms: f64 },
    /// Finished dying; ready to be dropped.
    Gone,
}

/// State every enemy kind shares.
#[derive(Clone, Debug, PartialEq)]
pub struct EnemyCommon {
    pub bounds: Bounds,
    pub health: f32,
    pub phase: EnemyPhase,
    pub last_hit_ms: Option<f64>,
    pub descent_speed: f32,
    pub death_duration_ms: f64,
    pub damage_flash_ms: f64,
}

impl EnemyCommon {
    /// An enemy entering from above the canvas at a random column.
    pub fn descending(width: f32, height: f32, health: f32, stats: &EnemyConstants, canvas: &Canvas, rng: &mut Rng) -> Self {
        let x = rng.float() * (canvas.width - width).max(1.0);
        let target_y = descent_target(height, canvas, rng);
        Self {
            bounds: Bounds::new(x, -height, width, height),
            health,
            phase: EnemyPhase::Spawning { target_y },
            last_hit_ms: None,
            descent_speed: stats.spawn_descent_speed,
            death_duration_ms: stats.death_animation_ms,
            damage_flash_ms: stats.damage_flash_ms,
        }
    }

    fn placed(bounds: Bounds, health: f32, stats: &EnemyConstants) -> Self {
        Self {
            bounds,
            health,
            phase: EnemyPhase::Active,
            last_hit_ms: None,
            descent_speed: stats.spawn_descent_speed,
            death_duration_ms: stats.death_animation_ms,
            damage_flash_ms: stats.damage_flash_ms,
        }
    }
}

/// Resting height for a descending spawn: a little below the top, never lower
/// than about a third of the canvas.
pub fn descent_target(height: f32, canvas: &Canvas, rng: &mut Rng) -> f32 {
    let min_target = height * 1.2;
    let max_target = (canvas.height * 0.35).min(min_target + height * 2.5);
    let range = (height * 0.5).max(max_target - min_target);
    (canvas.height - height).min(min_target + rng.float() * range)
}

/// Moves a spawning enemy down. Returns true once it has arrived.
pub fn advance_spawn(common: &mut EnemyCommon, dt: f32) -> bool {
    let EnemyPhase::Spawning { target_y } = common.phase else {
        return true;
    };
    common.bounds.y += common.descent_speed * dt;
    if common.bounds.y >= target_y {
        common.bounds.y = target_y;
        common.phase = EnemyPhase::Active;
        return true;
    }
    false
}

/// Applies damage. Returns true when this hit started the death animation.
pub fn take_hit(common: &mut EnemyCommon, damage: f32, now_ms: f64) -> bool {
    if matches!(common.phase, EnemyPhase::Dying { .. } | EnemyPhase::Gone) {
        return false;
    }
    common.health -= damage;
    common.last_hit_ms = Some(now_ms);
    if common.health <= 0.0 {
        common.phase = EnemyPhase::Dying { started_ms: now_ms };
        return true;
    }
    false
}

pub fn advance_death(common: &mut EnemyCommon, now_ms: f64) {
    if let EnemyPhase::Dying { started_ms } = common.phase {
        if now_ms - started_ms >= common.death_duration_ms {
            common.phase = EnemyPhase::Gone;
        }
    }
}

/// Death animation progress in `[0, 1]`, 0 when not dying.
pub fn death_progress(common: &EnemyCommon, now_ms: f64) -> f32 {
    match common.phase {
        EnemyPhase::Dying { started_ms } if common.death_duration_ms > 0.0 => {
            ((now_ms - started_ms) / common.death_duration_ms).clamp(0.0, 1.0) as f32
        }
        EnemyPhase::Dying { .. } | EnemyPhase::Gone => 1.0,
        _ => 0.0,
    }
}

pub fn is_flashing(common: &EnemyCommon, now_ms: f64) -> bool {
    common
        .last_hit_ms
        .is_some_and(|hit| now_ms - hit < common.damage_flash_ms)
}

/// Keeps damage already taken when the base health changes.
pub fn rebase_health(common: &mut EnemyCommon, old_base: f32, new_base: f32) {
    common.health += new_base - old_base;
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnemyKind {
    /// Hovers level with the target and fires horizontally.
    Shooter {
        stats: ShooterConstants,
        facing: Horizontal,
        last_shot_ms: Option<f64>,
    },
    /// Flies at the target, turning at a bounded rate.
    Seeker { stats: SeekerConstants, velocity: Vec2 },
    /// Ground enemy that pathfinds across the tile grid.
    Walker {
        body: KinematicBody,
        follower: PathFollower,
        follow: FollowParams,
        base_health: f32,
    },
}

/// Everything an enemy reads during its update.
#[derive(Clone, Copy)]
pub struct EnemyContext<'a> {
    pub dt: f32,
    pub target: Bounds,
    pub now_ms: f64,
    pub canvas: Canvas,
    pub grid: &'a TileGrid,
    pub max_jump_pixels: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Enemy {
    pub common: EnemyCommon,
    pub kind: EnemyKind,
}

impl Enemy {
    pub fn shooter(stats: &EnemyConstants, canvas: &Canvas, rng: &mut Rng) -> Self {
        let s = &stats.shooter;
        Self {
            common: EnemyCommon::descending(s.width, s.height, s.health, stats, canvas, rng),
            kind: EnemyKind::Shooter {
                stats: s.clone(),
                facing: Horizontal::Right,
                last_shot_ms: None,
            },
        }
    }

    pub fn seeker(stats: &EnemyConstants, canvas: &Canvas, rng: &mut Rng) -> Self {
        let s = &stats.seeker;
        Self {
            common: EnemyCommon::descending(s.size, s.size, s.health, stats, canvas, rng),
            kind: EnemyKind::Seeker {
                stats: s.clone(),
                velocity: Vec2::ZERO,
            },
        }
    }

    /// A walker already standing with its top-left corner at `(x, y)`.
    pub fn walker(stats: &EnemyConstants, constants: &Constants, x: f32, y: f32) -> Self {
        let w = &stats.walker;
        let mut body = KinematicBody::new(x, y, w.size, w.size, BodyParams::walker(constants, w));
        body.on_ground = true;
        let mut follow = FollowParams::walker(constants);
        follow.jump_cooldown_ms = w.jump_cooldown_ms;
        Self {
            common: EnemyCommon::placed(body.bounds(), w.health, stats),
            kind: EnemyKind::Walker {
                body,
                follower: PathFollower::default(),
                follow,
                base_health: w.health,
            },
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.common.bounds
    }

    pub fn is_active(&self) -> bool {
        self.common.phase != EnemyPhase::Gone
    }

    pub fn is_spawning(&self) -> bool {
        matches!(self.common.phase, EnemyPhase::Spawning { .. })
    }

    pub fn is_dying(&self) -> bool {
        matches!(self.common.phase, EnemyPhase::Dying { .. })
    }

    /// Only enemies that can hurt by touch.
    pub fn deals_contact_damage(&self) -> bool {
        matches!(self.kind, EnemyKind::Seeker { .. } | EnemyKind::Walker { .. })
            && self.common.phase == EnemyPhase::Active
    }

    pub fn take_hit(&mut self, damage: f32, now_ms: f64) -> bool {
        take_hit(&mut self.common, damage, now_ms)
    }

    pub fn update(&mut self, ctx: &EnemyContext, projectiles: &mut Vec<Projectile>) {
        match self.common.phase {
            EnemyPhase::Gone => return,
            EnemyPhase::Dying { .. } => {
                advance_death(&mut self.common, ctx.now_ms);
                return;
            }
            EnemyPhase::Spawning { .. } => {
                advance_spawn(&mut self.common, ctx.dt);
                return;
            }
            EnemyPhase::Active => {}
        }

        let common = &mut self.common;
        match &mut self.kind {
            EnemyKind::Shooter {
                stats,
                facing,
                last_shot_ms,
            } => {
                if let Some(shot) = update_shooter(common, stats, facing, last_shot_ms, ctx) {
                    projectiles.push(shot);
                }
            }
            EnemyKind::Seeker { stats, velocity } => update_seeker(common, stats, velocity, ctx),
            EnemyKind::Walker {
                body,
                follower,
                follow,
                ..
            } => {
                let nav = NavGraph::new(ctx.grid, ctx.max_jump_pixels);
                let steering = follower.steer(body, &ctx.target, &nav, ctx.grid, follow, ctx.now_ms);
                if steering.jump {
                    body.queue_jump();
                }
                let step = StepContext {
                    grid: ctx.grid,
                    world_width: ctx.canvas.width,
                    world_height: ctx.canvas.height,
                };
                body.update(steering.horizontal, &step);
                common.bounds = body.bounds();
            }
        }
    }

    /// Swaps in scaled stats. Health moves by the change in base health.
    pub fn update_stats(&mut self, stats: &EnemyConstants, constants: &Constants) {
        let common = &mut self.common;
        common.descent_speed = stats.spawn_descent_speed;
        common.death_duration_ms = stats.death_animation_ms;
        common.damage_flash_ms = stats.damage_flash_ms;
        match &mut self.kind {
            EnemyKind::Shooter { stats: current, .. } => {
                rebase_health(common, current.health, stats.shooter.health);
                *current = stats.shooter.clone();
            }
            EnemyKind::Seeker { stats: current, .. } => {
                rebase_health(common, current.health, stats.seeker.health);
                *current = stats.seeker.clone();
            }
            EnemyKind::Walker {
                body,
                follow,
                base_health,
                ..
            } => {
                rebase_health(common, *base_health, stats.walker.health);
                *base_health = stats.walker.health;
                body.params = BodyParams::walker(constants, &stats.walker);
                follow.jump_cooldown_ms = stats.walker.jump_cooldown_ms;
                follow.collision_offset = stats.walker.collision_offset;
            }
        }
    }
}

fn clamp_to_canvas(bounds: &mut Bounds, canvas: &Canvas) {
    bounds.x = bounds.x.clamp(0.0, (canvas.width - bounds.width).max(0.0));
    bounds.y = bounds.y.clamp(0.0, (canvas.height - bounds.height).max(0.0));
}

fn update_shooter(
    common: &mut EnemyCommon,
    stats: &ShooterConstants,
    facing: &mut Horizontal,
    last_shot_ms: &mut Option<f64>,
    ctx: &EnemyContext,
) -> Option<Projectile> {
    let target = ctx.target.center();
    let center = common.bounds.center();

    let horizontal = direction_toward(center.x, target.x, 4.0);
    if horizontal != Horizontal::None {
        common.bounds.x += horizontal.sign() * stats.move_speed * ctx.dt;
        *facing = horizontal;
    }
    if target.y > center.y + 6.0 {
        common.bounds.y += stats.vertical_adjust_speed * ctx.dt;
    } else if target.y < center.y - 6.0 {
        common.bounds.y -= stats.vertical_adjust_speed * ctx.dt;
    }
    clamp_to_canvas(&mut common.bounds, &ctx.canvas);

    let same_layer = (target.y - common.bounds.center().y).abs() < common.bounds.height / 2.0;
    let cooled = last_shot_ms.map_or(true, |last| ctx.now_ms - last >= stats.fire_cooldown_ms);
    if !same_layer || !cooled {
        return None;
    }
    *last_shot_ms = Some(ctx.now_ms);
    let b = common.bounds;
    let origin_x = match facing {
        Horizontal::Left => b.x - stats.bullet_radius,
        _ => b.right() + stats.bullet_radius,
    };
    let dir = match facing {
        Horizontal::Left => -1.0,
        _ => 1.0,
    };
    Some(Projectile::new(
        Vec2::new(origin_x, b.center().y),
        Vec2::new(dir, 0.0),
        stats.bullet_speed,
        stats.bullet_radius,
        1.0,
        ProjectileOwner::Enemy,
    ))
}

/// Rotates the current heading toward the target by at most `turn_rate * dt`.
fn update_seeker(common: &mut EnemyCommon, stats: &SeekerConstants, velocity: &mut Vec2, ctx: &EnemyContext) {
    let to_target = ctx.target.center() - common.bounds.center();
    let desired = if to_target.length() > 0.01 {
        to_target.normalize()
    } else {
        Vec2::ZERO
    };
    let current = if velocity.length() > 0.01 {
        velocity.normalize()
    } else {
        desired
    };

    let angle = current.dot(desired).clamp(-1.0, 1.0).acos();
    let mut heading = current;
    if angle > 0.001 {
        let turn = angle.min(stats.turn_rate * ctx.dt);
        let turn = if current.perp_dot(desired) > 0.0 { turn } else { -turn };
        heading = Vec2::from_angle(turn).rotate(current);
    }
    let heading = heading.normalize_or_zero();

    *velocity = Vec2::new(heading.x * stats.move_speed, heading.y * stats.vertical_adjust_speed);
    common.bounds.x += velocity.x * ctx.dt;
    common.bounds.y += velocity.y * ctx.dt;
    clamp_to_canvas(&mut common.bounds, &ctx.canvas);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::max_jump_pixels;

    fn open_grid() -> TileGrid {
        TileGrid::from_rows(
            &[
                "W..................W",
                "W..................W",
                "W..................W",
                "W..................W",
                "W..................W",
                "####################",
            ],
            60.0,
        )
    }

    fn ctx<'a>(grid: &'a TileGrid, target: Bounds, now_ms: f64) -> EnemyContext<'a> {
        EnemyContext {
            dt: 1.0 / 60.0,
            target,
            now_ms,
            canvas: Canvas::new(grid.width(), grid.height()),
            grid,
            max_jump_pixels: max_jump_pixels(&Constants::default()),
        }
    }

    #[test]
    fn descent_target_stays_near_top() {
        let canvas = Canvas::new(1280.0, 720.0);
        let mut rng = Rng::new(11);
        for _ in 0..50 {
            let y = descent_target(36.0, &canvas, &mut rng);
            assert!(y >= 36.0 * 1.2);
            assert!(y <= 36.0 * 1.2 + 36.0 * 2.5);
        }
    }

    #[test]
    fn spawn_descends_then_activates() {
        let stats = EnemyConstants::default();
        let canvas = Canvas::new(1200.0, 360.0);
        let mut enemy = Enemy::shooter(&stats, &canvas, &mut Rng::new(5));
        let grid = open_grid();
        let EnemyPhase::Spawning { target_y } = enemy.common.phase else {
            panic!("shooter should spawn descending");
        };
        assert_eq!(enemy.bounds().y, -36.0);
        let target = Bounds::new(600.0, 250.0, 34.0, 48.0);
        let mut shots = Vec::new();
        let mut frames = 0;
        while enemy.is_spawning() {
            enemy.update(&ctx(&grid, target, 0.0), &mut shots);
            frames += 1;
            assert!(frames < 1000);
        }
        assert_eq!(enemy.bounds().y, target_y);
        assert!(!enemy.deals_contact_damage());
        assert!(shots.is_empty());
    }

    #[test]
    fn hits_kill_then_animation_removes() {
        let stats = EnemyConstants::default();
        let mut enemy = Enemy::seeker(&stats, &Canvas::default(), &mut Rng::new(1));
        enemy.common.phase = EnemyPhase::Active;
        assert!(!enemy.take_hit(1.0, 100.0));
        assert!(is_flashing(&enemy.common, 200.0));
        assert!(!is_flashing(&enemy.common, 400.0));
        assert!(enemy.take_hit(1.0, 500.0));
        assert!(enemy.is_dying());
        assert!(!enemy.take_hit(5.0, 510.0), "dying enemies ignore hits");

        let grid = open_grid();
        let target = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let mut shots = Vec::new();
        enemy.update(&ctx(&grid, target, 700.0), &mut shots);
        assert!(enemy.is_active());
        assert!((death_progress(&enemy.common, 660.0) - 0.5).abs() < 1e-3);
        enemy.update(&ctx(&grid, target, 820.0), &mut shots);
        assert!(!enemy.is_active());
    }

    #[test]
    fn shooter_fires_on_target_layer_with_cooldown() {
        let stats = EnemyConstants::default();
        let grid = open_grid();
        let mut enemy = Enemy::shooter(&stats, &Canvas::default(), &mut Rng::new(2));
        enemy.common.phase = EnemyPhase::Active;
        enemy.common.bounds.x = 100.0;
        enemy.common.bounds.y = 100.0;
        // Target level with the shooter, off to the left.
        let target = Bounds::new(20.0, 118.0 - 24.0, 34.0, 48.0);
        let mut shots = Vec::new();
        enemy.update(&ctx(&grid, target, 0.0), &mut shots);
        assert_eq!(shots.len(), 1);
        assert!(shots[0].velocity.x < 0.0);
        assert_eq!(shots[0].owner, ProjectileOwner::Enemy);
        assert!(shots[0].position.x < enemy.bounds().x);

        enemy.update(&ctx(&grid, target, 500.0), &mut shots);
        assert_eq!(shots.len(), 1);
        enemy.update(&ctx(&grid, target, 1400.0), &mut shots);
        assert_eq!(shots.len(), 2);

        // Far above: no shot.
        let high = Bounds::new(20.0, -400.0, 34.0, 48.0);
        enemy.update(&ctx(&grid, high, 5000.0), &mut shots);
        assert_eq!(shots.len(), 2);
    }

    #[test]
    fn seeker_turns_gradually() {
        let stats = EnemyConstants::default();
        let grid = open_grid();
        let mut enemy = Enemy::seeker(&stats, &Canvas::default(), &mut Rng::new(4));
        enemy.common.phase = EnemyPhase::Active;
        enemy.common.bounds.x = 500.0;
        enemy.common.bounds.y = 150.0;
        let EnemyKind::Seeker { velocity, .. } = &mut enemy.kind else {
            unreachable!();
        };
        *velocity = Vec2::new(110.0, 0.0);

        // Target straight behind: one frame can only turn 2.5/60 rad.
        let target = Bounds::new(100.0, 150.0, 30.0, 30.0);
        let mut shots = Vec::new();
        enemy.update(&ctx(&grid, target, 0.0), &mut shots);
        let EnemyKind::Seeker { velocity, .. } = &enemy.kind else {
            unreachable!();
        };
        let heading = Vec2::new(velocity.x / 110.0, velocity.y / 80.0);
        let turned = heading.angle_to(Vec2::X).abs();
        assert!((turned - 2.5 / 60.0).abs() < 1e-3, "turned {turned}");
        assert!(enemy.deals_contact_damage());
    }

    #[test]
    fn walker_walks_toward_target_on_floor() {
        let constants = Constants::default();
        let grid = open_grid();
        let mut enemy = Enemy::walker(&constants.enemies, &constants, 70.0, 300.0 - 40.0 - 0.01);
        let target = Bounds::new(900.0, 300.0 - 48.0 - 0.01, 34.0, 48.0);
        let mut shots = Vec::new();
        for frame in 0..300 {
            enemy.update(&ctx(&grid, target, frame as f64 * 16.7), &mut shots);
            assert!(!crate::physics_core::collides(&grid, &enemy.bounds()));
        }
        assert!((enemy.bounds().center().x - target.center().x).abs() < 60.0);
        assert!(enemy.deals_contact_damage());
    }

    #[test]
    fn update_stats_rebases_health() {
        let constants = Constants::default();
        let mut stats = constants.enemies.clone();
        let mut enemy = Enemy::walker(&stats, &constants, 70.0, 200.0);
        enemy.take_hit(1.0, 0.0);
        stats.walker.health += 2.0;
        stats.walker.max_speed = 5.0;
        stats.walker.collision_offset = 0.5;
        stats.walker.jump_cooldown_ms = 900.0;
        enemy.update_stats(&stats, &constants);
        assert_eq!(enemy.common.health, constants.enemies.walker.health + 1.0);
        let EnemyKind::Walker { body, follow, .. } = &enemy.kind else {
            unreachable!();
        };
        assert_eq!(body.params.max_speed, 5.0);
        assert_eq!(body.params.collision_offset, 0.5);
        assert_eq!(follow.collision_offset, 0.5);
        assert_eq!(follow.jump_cooldown_ms, 900.0);

        let mut shooter = Enemy::shooter(&constants.enemies, &Canvas::default(), &mut Rng::new(9));
        stats.shooter.health = 10.0;
        shooter.update_stats(&stats, &constants);
        assert_eq!(shooter.common.health, 10.0);
    }
}
