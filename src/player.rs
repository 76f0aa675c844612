use bevy::math::Vec2;

use crate::components::Bounds;
use crate::config::{Constants, KeyBindings, ShootConstants};
use crate::generation::{player_spawn, GeneratedMap};
use crate::input::InputState;
use crate::physics::{BodyParams, KinematicBody, StepContext, StepOutcome};
use crate::projectile::{Projectile, ProjectileOwner};

/// One player: a kinematic body steered by raw key input, with lives and a gun.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub id: usize,
    pub body: KinematicBody,
    pub bindings: KeyBindings,
    pub lives: u32,
    pub max_lives: u32,
    pub invulnerability_ms: f64,
    pub shoot: ShootConstants,
    pub last_hit_ms: Option<f64>,
    pub last_shot_ms: Option<f64>,
}

impl Player {
    /// Standing on the floor at the generator's player spawn.
    pub fn spawn(id: usize, map: &GeneratedMap, constants: &Constants, bindings: KeyBindings) -> Self {
        let (x, y) = player_spawn(map, constants);
        let p = &constants.player;
        let mut body =
            KinematicBody::new(x, y, p.width, p.height, BodyParams::player(constants)).with_wall_jump(p.wall_jump.clone());
        body.on_ground = true;
        Self {
            id,
            body,
            bindings,
            lives: p.max_lives,
            max_lives: p.max_lives,
            invulnerability_ms: p.invulnerability_ms,
            shoot: p.shoot.clone(),
            last_hit_ms: None,
            last_shot_ms: None,
        }
    }

    /// Moves the player back onto a fresh level, keeping lives.
    pub fn respawn(&mut self, map: &GeneratedMap, constants: &Constants) {
        let (x, y) = player_spawn(map, constants);
        self.body.x = x;
        self.body.y = y;
        self.body.vx = 0.0;
        self.body.vy = 0.0;
        self.body.on_ground = true;
        self.body.jump_buffer_frames = 0;
    }

    pub fn bounds(&self) -> Bounds {
        self.body.bounds()
    }

    pub fn is_dead(&self) -> bool {
        self.lives == 0
    }

    pub fn is_invulnerable(&self, now_ms: f64) -> bool {
        self.last_hit_ms
            .is_some_and(|hit| now_ms - hit < self.invulnerability_ms)
    }

    /// Costs a life unless dead or still invulnerable. Returns whether it did.
    pub fn take_hit(&mut self, now_ms: f64) -> bool {
        if self.is_dead() || self.is_invulnerable(now_ms) {
            return false;
        }
        self.lives -= 1;
        self.last_hit_ms = Some(now_ms);
        true
    }

    pub fn update(
        &mut self,
        input: &InputState,
        ctx: &StepContext,
        now_ms: f64,
        projectiles: &mut Vec<Projectile>,
    ) -> StepOutcome {
        if self.is_dead() {
            return StepOutcome::default();
        }
        if input.jump_pressed(&self.bindings) {
            self.body.queue_jump();
        }
        let outcome = self.body.update(input.horizontal(&self.bindings), ctx);
        if let Some(direction) = input.shoot_direction(&self.bindings) {
            self.try_shoot(direction, now_ms, projectiles);
        }
        outcome
    }

    pub fn try_shoot(&mut self, direction: Vec2, now_ms: f64, projectiles: &mut Vec<Projectile>) -> bool {
        let ready = self
            .last_shot_ms
            .map_or(true, |last| now_ms - last >= self.shoot.cooldown_ms);
        if !ready || direction == Vec2::ZERO {
            return false;
        }
        self.last_shot_ms = Some(now_ms);
        projectiles.push(Projectile::new(
            self.bounds().center(),
            direction,
            self.shoot.bullet_speed,
            self.shoot.bullet_radius,
            self.shoot.damage,
            ProjectileOwner::Player(self.id),
        ));
        true
    }
}
