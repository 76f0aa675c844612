use crate::components::{Bounds, Horizontal};
use crate::config::{Constants, WalkerConstants, WallJumpConstants};
use crate::physics_core::{
    collides, resolve_horizontal, resolve_vertical, touching_wall, try_jump, update_coyote_timer,
};
use crate::tilemap::TileGrid;

/// Per-body tunables. Velocities are pixels per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyParams {
    pub acceleration: f32,
    pub max_speed: f32,
    pub deceleration_factor: f32,
    pub min_speed_threshold: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_force: f32,
    pub jump_impulse_multiplier: f32,
    pub collision_offset: f32,
    pub coyote_frames: u32,
    pub jump_buffer_frames: u32,
}

impl BodyParams {
    pub fn player(constants: &Constants) -> Self {
        let p = &constants.player;
        Self {
            acceleration: p.speed,
            max_speed: p.max_speed,
            deceleration_factor: p.deceleration_factor,
            min_speed_threshold: p.min_speed_threshold,
            gravity: constants.gravity,
            max_fall_speed: p.max_fall_speed,
            jump_force: constants.jump_force,
            jump_impulse_multiplier: p.jump_impulse_multiplier,
            collision_offset: p.collision_offset,
            coyote_frames: constants.coyote_frames,
            jump_buffer_frames: constants.jump_buffer_frames,
        }
    }

    /// Walkers share gravity with the player but carry their own movement and jump numbers.
    pub fn walker(constants: &Constants, walker: &WalkerConstants) -> Self {
        Self {
            acceleration: walker.move_acceleration,
            max_speed: walker.max_speed,
            deceleration_factor: walker.deceleration_factor,
            min_speed_threshold: walker.min_speed_threshold,
            gravity: constants.gravity,
            max_fall_speed: walker.max_fall_speed,
            jump_force: walker.jump_force,
            jump_impulse_multiplier: constants.player.jump_impulse_multiplier,
            collision_offset: walker.collision_offset,
            coyote_frames: constants.coyote_frames,
            jump_buffer_frames: constants.jump_buffer_frames,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WallJumpState {
    pub config: WallJumpConstants,
    pub cooldown: u32,
    pub rotation_frames: u32,
    /// Direction of the launch that started the current rotation.
    pub rotation_direction: Horizontal,
}

impl WallJumpState {
    pub fn new(config: WallJumpConstants) -> Self {
        Self {
            config,
            cooldown: 0,
            rotation_frames: 0,
            rotation_direction: Horizontal::None,
        }
    }

    /// Spin progress of the wall-jump flip in `[0, 1]`, 0 when idle.
    pub fn rotation_progress(&self) -> f32 {
        if self.rotation_frames == 0 || self.config.rotation_frames == 0 {
            return 0.0;
        }
        1.0 - self.rotation_frames as f32 / self.config.rotation_frames as f32
    }

    fn tick(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.rotation_frames = self.rotation_frames.saturating_sub(1);
        if self.rotation_frames == 0 {
            self.rotation_direction = Horizontal::None;
        }
    }
}

/// What the body is integrated against this frame.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub grid: &'a TileGrid,
    pub world_width: f32,
    pub world_height: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub jumped: bool,
    pub wall_jumped: bool,
    pub landed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct KinematicBody {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub vx: f32,
    pub vy: f32,
    pub on_ground: bool,
    pub coyote_frames: u32,
    pub jump_buffer_frames: u32,
    pub params: BodyParams,
    pub wall_jump: Option<WallJumpState>,
}

impl KinematicBody {
    pub fn new(x: f32, y: f32, width: f32, height: f32, params: BodyParams) -> Self {
        Self {
            x,
            y,
            width,
            height,
            vx: 0.0,
            vy: 0.0,
            on_ground: false,
            coyote_frames: 0,
            jump_buffer_frames: 0,
            params,
            wall_jump: None,
        }
    }

    pub fn with_wall_jump(mut self, config: WallJumpConstants) -> Self {
        if config.enabled {
            self.wall_jump = Some(WallJumpState::new(config));
        }
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }

    /// Opens the jump buffer. The jump itself happens inside `update`.
    pub fn queue_jump(&mut self) {
        self.jump_buffer_frames = self.params.jump_buffer_frames;
    }

    pub fn update(&mut self, intent: Horizontal, ctx: &StepContext) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let was_on_ground = self.on_ground;

        if try_jump(
            self.on_ground,
            &mut self.coyote_frames,
            &mut self.jump_buffer_frames,
            self.params.jump_force,
            &mut self.vy,
        ) {
            self.on_ground = false;
            self.apply_jump_impulse(intent);
            outcome.jumped = true;
        } else if self.try_wall_jump(ctx.grid) {
            outcome.wall_jumped = true;
        }

        self.integrate_horizontal(intent);

        self.vy = (self.vy + self.params.gravity).min(self.params.max_fall_speed);

        let x_res = resolve_horizontal(ctx.grid, &self.bounds(), self.vx, self.params.collision_offset);
        self.x = x_res.position;
        if x_res.blocked {
            self.vx = 0.0;
        }

        self.on_ground = false;
        let y_res = resolve_vertical(ctx.grid, &self.bounds(), self.vy, self.params.collision_offset);
        self.y = y_res.position;
        if y_res.blocked {
            if self.vy > 0.0 {
                self.land();
            }
            self.vy = 0.0;
        }

        self.clamp_to_world(ctx);

        if !self.on_ground {
            update_coyote_timer(false, &mut self.coyote_frames, self.params.coyote_frames);
        }
        self.jump_buffer_frames = self.jump_buffer_frames.saturating_sub(1);
        if let Some(wall) = self.wall_jump.as_mut() {
            wall.tick();
        }

        outcome.landed = self.on_ground && !was_on_ground;
        outcome
    }

    fn land(&mut self) {
        self.on_ground = true;
        update_coyote_timer(true, &mut self.coyote_frames, self.params.coyote_frames);
    }

    /// Raises speed toward the input direction without slowing a faster body.
    fn apply_jump_impulse(&mut self, intent: Horizontal) {
        let impulse = self.params.max_speed * self.params.jump_impulse_multiplier;
        match intent {
            Horizontal::Left => self.vx = self.vx.min(-impulse),
            Horizontal::Right => self.vx = self.vx.max(impulse),
            Horizontal::None => {}
        }
    }

    fn try_wall_jump(&mut self, grid: &TileGrid) -> bool {
        let bounds = self.bounds();
        let Some(wall) = self.wall_jump.as_mut() else {
            return false;
        };
        if self.on_ground || self.coyote_frames > 0 || self.jump_buffer_frames == 0 || wall.cooldown > 0 {
            return false;
        }
        let probe = wall.config.probe_distance;
        let away = if touching_wall(grid, &bounds, -1.0, probe) {
            Horizontal::Right
        } else if touching_wall(grid, &bounds, 1.0, probe) {
            Horizontal::Left
        } else {
            return false;
        };
        self.vy = self.params.jump_force;
        self.vx = away.sign() * wall.config.horizontal_impulse;
        self.jump_buffer_frames = 0;
        wall.cooldown = wall.config.cooldown_frames;
        wall.rotation_frames = wall.config.rotation_frames;
        wall.rotation_direction = away;
        true
    }

    fn integrate_horizontal(&mut self, intent: Horizontal) {
        let p = &self.params;
        match intent {
            Horizontal::Left | Horizontal::Right => self.vx += intent.sign() * p.acceleration,
            Horizontal::None => {
                self.vx *= p.deceleration_factor;
                if self.vx.abs() < p.min_speed_threshold {
                    self.vx = 0.0;
                }
            }
        }
        self.vx = self.vx.clamp(-p.max_speed, p.max_speed);
    }

    /// Keeps the body inside the world rectangle; the bottom edge counts as ground.
    /// A clamp that would push the body into a tile is skipped.
    fn clamp_to_world(&mut self, ctx: &StepContext) {
        let max_x = (ctx.world_width - self.width).max(0.0);
        let clamped_x = self.x.clamp(0.0, max_x);
        if clamped_x != self.x && !collides(ctx.grid, &Bounds::new(clamped_x, self.y, self.width, self.height)) {
            self.x = clamped_x;
            self.vx = 0.0;
        }

        let floor_y = ctx.world_height - self.height;
        if self.y >= floor_y {
            if self.y == floor_y || !collides(ctx.grid, &Bounds::new(self.x, floor_y, self.width, self.height)) {
                self.y = floor_y;
                if self.vy > 0.0 {
                    self.vy = 0.0;
                }
                self.land();
            }
        } else if self.y < 0.0 && !collides(ctx.grid, &Bounds::new(self.x, 0.0, self.width, self.height)) {
            self.y = 0.0;
            if self.vy < 0.0 {
                self.vy = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Canvas;
    use crate::generation::{generate_map, Rng};
    use crate::physics_core::check_collision;

    fn params() -> BodyParams {
        BodyParams::player(&Constants::default())
    }

    fn ctx(grid: &TileGrid) -> StepContext<'_> {
        StepContext {
            grid,
            world_width: grid.width(),
            world_height: grid.height(),
        }
    }

    /// Floor on row 5 with a one-tile gap at column 5, pit floor on row 6.
    fn gap_grid() -> TileGrid {
        TileGrid::from_rows(
            &[
                "W........W",
                "W........W",
                "W........W",
                "W........W",
                "W........W",
                "W####.###W",
                "##########",
            ],
            60.0,
        )
    }

    fn standing_y(floor_row: i32, height: f32) -> f32 {
        floor_row as f32 * 60.0 - height - 0.01
    }

    #[test]
    fn landing_sets_ground_and_full_coyote() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(70.0, 100.0, 34.0, 48.0, params());
        let mut landed = false;
        for _ in 0..120 {
            let outcome = body.update(Horizontal::None, &ctx(&grid));
            if outcome.landed {
                landed = true;
                assert!(body.on_ground);
                assert_eq!(body.coyote_frames, body.params.coyote_frames);
                break;
            }
        }
        assert!(landed);
        assert!((body.y - standing_y(5, 48.0)).abs() < 1e-3);
    }

    #[test]
    fn buffered_jump_fires_once_after_landing() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(70.0, standing_y(5, 48.0) - 3.0, 34.0, 48.0, params());
        body.queue_jump();

        let mut jumps = 0;
        let mut jump_frame = None;
        for frame in 1..=30 {
            let outcome = body.update(Horizontal::None, &ctx(&grid));
            if outcome.jumped {
                jumps += 1;
                jump_frame = Some(frame);
            }
        }
        assert_eq!(jumps, 1);
        assert_eq!(jump_frame, Some(4));
    }

    #[test]
    fn expired_buffer_does_not_jump() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(70.0, 60.0, 34.0, 48.0, params());
        body.queue_jump();
        for _ in 0..60 {
            assert!(!body.update(Horizontal::None, &ctx(&grid)).jumped);
        }
        assert!(body.on_ground);
    }

    #[test]
    fn coyote_time_allows_late_jump() {
        let grid = gap_grid();
        // Right edge just short of the gap, moving right at full speed.
        let mut body = KinematicBody::new(262.0, standing_y(5, 48.0), 34.0, 48.0, params());
        body.on_ground = true;
        body.coyote_frames = body.params.coyote_frames;
        body.vx = body.params.max_speed;
        let mut left_ground_at = None;
        for frame in 0..30 {
            body.update(Horizontal::Right, &ctx(&grid));
            if !body.on_ground {
                left_ground_at = Some(frame);
                break;
            }
        }
        assert!(left_ground_at.is_some());
        assert!(body.coyote_frames > 0);
        body.queue_jump();
        assert!(body.update(Horizontal::Right, &ctx(&grid)).jumped);
        assert!(body.vy < 0.0);
    }

    #[test]
    fn walking_into_gap_without_jump_falls_in() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(313.0, standing_y(5, 48.0), 34.0, 48.0, params());
        body.on_ground = true;
        for _ in 0..60 {
            body.update(Horizontal::None, &ctx(&grid));
        }
        assert!(body.y > 300.0, "body should sit in the pit, y = {}", body.y);
        assert!(body.on_ground);
    }

    #[test]
    fn running_off_ledge_without_jump_falls_in() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(200.0, standing_y(5, 48.0), 34.0, 48.0, params());
        body.on_ground = true;
        body.vx = body.params.max_speed;
        for _ in 0..120 {
            body.update(Horizontal::Right, &ctx(&grid));
        }
        assert!(body.y > 300.0, "body should end in the pit, y = {}", body.y);
    }

    #[test]
    fn queued_jump_at_ledge_clears_gap() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(200.0, standing_y(5, 48.0), 34.0, 48.0, params());
        body.on_ground = true;
        body.vx = body.params.max_speed;
        let mut queued = false;
        for _ in 0..120 {
            if !queued && body.x + body.width >= 296.0 {
                body.queue_jump();
                queued = true;
            }
            body.update(Horizontal::Right, &ctx(&grid));
        }
        assert!(queued);
        assert!(body.x >= 360.0, "body should land past the gap, x = {}", body.x);
        assert!((body.y - standing_y(5, 48.0)).abs() < 1e-3);
    }

    #[test]
    fn jump_impulse_keeps_larger_speed() {
        let grid = gap_grid();
        let mut body = KinematicBody::new(100.0, standing_y(5, 48.0), 34.0, 48.0, params());
        body.on_ground = true;
        body.vx = 0.0;
        body.queue_jump();
        body.update(Horizontal::Right, &ctx(&grid));
        let impulse = body.params.max_speed * body.params.jump_impulse_multiplier;
        assert!(body.vx >= impulse);

        let mut fast = KinematicBody::new(100.0, standing_y(5, 48.0), 34.0, 48.0, params());
        fast.on_ground = true;
        fast.vx = 4.0;
        fast.queue_jump();
        fast.update(Horizontal::Right, &ctx(&grid));
        assert_eq!(fast.vx, fast.params.max_speed);
    }

    #[test]
    fn wall_jump_launches_away_from_wall() {
        let grid = gap_grid();
        let config = Constants::default().player.wall_jump;
        let mut body = KinematicBody::new(60.01, 100.0, 34.0, 48.0, params()).with_wall_jump(config.clone());
        body.queue_jump();
        let outcome = body.update(Horizontal::Left, &ctx(&grid));
        assert!(outcome.wall_jumped);
        assert!(!outcome.jumped);
        assert!(body.vy < 0.0);
        assert!(body.vx > 0.0);
        let wall = body.wall_jump.as_ref().unwrap();
        assert_eq!(wall.rotation_direction, Horizontal::Right);
        assert!(wall.cooldown > 0);
        assert!(wall.rotation_progress() > 0.0 && wall.rotation_progress() < 1.0);

        // Cooldown blocks an immediate second wall-jump.
        body.x = 60.01;
        body.queue_jump();
        assert!(!body.update(Horizontal::Left, &ctx(&grid)).wall_jumped);
    }

    #[test]
    fn random_play_never_tunnels_and_respects_clamps() {
        let constants = Constants::default();
        let canvas = Canvas::new(1280.0, 720.0);
        let mut rng = Rng::new(7);
        let map = generate_map(&canvas, &constants, &mut rng);
        let (sx, sy) = crate::generation::player_spawn(&map, &constants);
        let mut body = KinematicBody::new(sx, sy, constants.player.width, constants.player.height, params())
            .with_wall_jump(constants.player.wall_jump.clone());
        let ctx = StepContext {
            grid: &map.grid,
            world_width: canvas.width,
            world_height: canvas.height,
        };
        assert!(!check_collision(&map.grid, body.x, body.y, body.width, body.height));

        let mut intent = Horizontal::None;
        for _ in 0..2000 {
            if rng.chance(0.05) {
                intent = Horizontal::from_sign(rng.range(-1, 1));
            }
            if rng.chance(0.1) {
                body.queue_jump();
            }
            body.update(intent, &ctx);
            assert!(!check_collision(&map.grid, body.x, body.y, body.width, body.height));
            assert!(body.vx.abs() <= body.params.max_speed);
            assert!(body.vy <= body.params.max_fall_speed);
            assert!(body.x >= 0.0 && body.x + body.width <= canvas.width);
        }
    }
}
