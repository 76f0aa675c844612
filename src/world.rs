use bevy::log::{debug, info, warn};

use crate::components::{Bounds, Canvas};
use crate::config::{Constants, EnemyConstants};
use crate::enemy::{Enemy, EnemyContext};
use crate::generation::{generate_map, max_jump_pixels, unreachable_layers, GeneratedMap, Rng};
use crate::input::InputState;
use crate::leveller::Leveller;
use crate::physics::StepContext;
use crate::player::Player;
use crate::projectile::{advance_projectiles, Projectile};
use crate::spawn::spawn_enemy_group;

/// What happened during one `step`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub dt: f32,
    pub paused: bool,
    pub level: u32,
    pub leveled_up: bool,
    pub map_regenerated: bool,
    pub spawned: usize,
    pub enemies_killed: u32,
    pub player_hits: u32,
    pub jumps: u32,
    pub alive_enemies: usize,
    pub game_over: bool,
}

/// All state for one round, threaded explicitly through each frame.
pub struct WorldState {
    pub canvas: Canvas,
    pub constants: Constants,
    pub map: GeneratedMap,
    pub players: Vec<Player>,
    pub enemies: Vec<Enemy>,
    pub player_projectiles: Vec<Projectile>,
    pub enemy_projectiles: Vec<Projectile>,
    pub leveller: Leveller,
    pub enemy_stats: EnemyConstants,
    pub score: u64,
    pub paused: bool,
    pub rng: Rng,
    /// Milliseconds since the last enemy group.
    pub spawn_timer_ms: f64,
}

impl WorldState {
    /// One player per configured key binding set, up to `player_count`.
    pub fn new(canvas: Canvas, constants: Constants, player_count: usize, seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let map = build_map(&canvas, &constants, &mut rng);
        let available = constants.input.bindings.len();
        if player_count > available {
            warn!("[Tilerun] {player_count} players requested but only {available} key binding sets are configured");
        }
        let players = constants
            .input
            .bindings
            .iter()
            .take(player_count.max(1))
            .enumerate()
            .map(|(id, bindings)| Player::spawn(id, &map, &constants, bindings.clone()))
            .collect();
        let enemy_stats = constants.enemies.clone();
        let leveller = Leveller::new(&constants.leveling, enemy_stats.clone());
        Self {
            canvas,
            constants,
            map,
            players,
            enemies: Vec::new(),
            player_projectiles: Vec::new(),
            enemy_projectiles: Vec::new(),
            leveller,
            enemy_stats,
            score: 0,
            paused: false,
            rng,
            spawn_timer_ms: 0.0,
        }
    }

    pub fn is_game_over(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(Player::is_dead)
    }

    /// Fresh level: new grid, players back on the floor, field cleared.
    pub fn regenerate_map(&mut self) {
        self.map = build_map(&self.canvas, &self.constants, &mut self.rng);
        for player in &mut self.players {
            player.respawn(&self.map, &self.constants);
        }
        self.enemies.clear();
        self.player_projectiles.clear();
        self.enemy_projectiles.clear();
        self.spawn_timer_ms = 0.0;
    }

    /// The enemies' target: the first living player, else the first player.
    fn target_bounds(&self) -> Option<Bounds> {
        self.players
            .iter()
            .find(|p| !p.is_dead())
            .or_else(|| self.players.first())
            .map(Player::bounds)
    }

    pub fn step(&mut self, input: &InputState, dt: f32, timestamp_ms: f64) -> FrameReport {
        let dt = dt.clamp(0.0, self.constants.max_delta_seconds);
        let mut report = FrameReport {
            dt,
            paused: self.paused,
            level: self.leveller.level,
            ..FrameReport::default()
        };
        if self.paused {
            return report;
        }
        if self.is_game_over() {
            report.game_over = true;
            return report;
        }

        self.advance_level(dt, &mut report);
        self.advance_players(input, timestamp_ms, &mut report);
        self.advance_spawning(dt, &mut report);
        self.advance_enemies(dt, timestamp_ms);
        self.advance_player_projectiles(dt, timestamp_ms, &mut report);
        self.advance_enemy_projectiles(dt, timestamp_ms, &mut report);
        self.apply_contact_damage(timestamp_ms, &mut report);

        self.enemies.retain(Enemy::is_active);
        self.player_projectiles.retain(|p| p.active);
        self.enemy_projectiles.retain(|p| p.active);

        report.alive_enemies = self.enemies.len();
        report.game_over = self.is_game_over();
        if report.game_over {
            info!("[Tilerun] Game over at level {} with score {}", self.leveller.level, self.score);
        }
        report
    }

    fn advance_level(&mut self, dt: f32, report: &mut FrameReport) {
        let tick = self.leveller.update(dt);
        report.level = tick.level;
        let Some(stats) = tick.new_stats else {
            return;
        };
        report.leveled_up = true;
        self.enemy_stats = stats;
        if self.constants.leveling.regenerate_map_on_level_up {
            self.regenerate_map();
            report.map_regenerated = true;
        } else {
            for enemy in &mut self.enemies {
                enemy.update_stats(&self.enemy_stats, &self.constants);
            }
        }
    }

    fn advance_players(&mut self, input: &InputState, now_ms: f64, report: &mut FrameReport) {
        let ctx = StepContext {
            grid: &self.map.grid,
            world_width: self.canvas.width,
            world_height: self.canvas.height,
        };
        for player in &mut self.players {
            let outcome = player.update(input, &ctx, now_ms, &mut self.player_projectiles);
            if outcome.jumped || outcome.wall_jumped {
                report.jumps += 1;
            }
        }
    }

    fn advance_spawning(&mut self, dt: f32, report: &mut FrameReport) {
        self.spawn_timer_ms += dt as f64 * 1000.0;
        if self.spawn_timer_ms < self.enemy_stats.spawn_interval_ms {
            return;
        }
        self.spawn_timer_ms = 0.0;
        let room = (self.enemy_stats.max_alive as usize).saturating_sub(self.enemies.len());
        if room == 0 {
            return;
        }
        let mut group = spawn_enemy_group(&self.enemy_stats, &self.constants, &self.canvas, &self.map, &mut self.rng);
        group.truncate(room);
        debug!("[Tilerun] Spawned {} enemies", group.len());
        report.spawned = group.len();
        self.enemies.extend(group);
    }

    fn advance_enemies(&mut self, dt: f32, now_ms: f64) {
        let Some(target) = self.target_bounds() else {
            return;
        };
        let ctx = EnemyContext {
            dt,
            target,
            now_ms,
            canvas: self.canvas,
            grid: &self.map.grid,
            max_jump_pixels: max_jump_pixels(&self.constants),
        };
        for enemy in &mut self.enemies {
            enemy.update(&ctx, &mut self.enemy_projectiles);
        }
    }

    fn advance_player_projectiles(&mut self, dt: f32, now_ms: f64, report: &mut FrameReport) {
        advance_projectiles(&mut self.player_projectiles, dt, &self.canvas, &self.map.grid);
        for projectile in self.player_projectiles.iter_mut().filter(|p| p.active) {
            let hit = self
                .enemies
                .iter_mut()
                .find(|e| e.is_active() && !e.is_dying() && projectile.intersects(&e.bounds()));
            if let Some(enemy) = hit {
                projectile.active = false;
                if enemy.take_hit(projectile.damage, now_ms) {
                    report.enemies_killed += 1;
                    self.score += 1;
                }
            }
        }
    }

    fn advance_enemy_projectiles(&mut self, dt: f32, now_ms: f64, report: &mut FrameReport) {
        advance_projectiles(&mut self.enemy_projectiles, dt, &self.canvas, &self.map.grid);
        for projectile in self.enemy_projectiles.iter_mut().filter(|p| p.active) {
            let hit = self
                .players
                .iter_mut()
                .find(|p| !p.is_dead() && projectile.intersects(&p.bounds()));
            if let Some(player) = hit {
                projectile.active = false;
                if player.take_hit(now_ms) {
                    report.player_hits += 1;
                }
            }
        }
    }

    fn apply_contact_damage(&mut self, now_ms: f64, report: &mut FrameReport) {
        for enemy in self.enemies.iter().filter(|e| e.deals_contact_damage()) {
            let bounds = enemy.bounds();
            for player in self.players.iter_mut().filter(|p| !p.is_dead()) {
                if bounds.intersects(&player.bounds()) && player.take_hit(now_ms) {
                    report.player_hits += 1;
                }
            }
        }
    }
}

fn build_map(canvas: &Canvas, constants: &Constants, rng: &mut Rng) -> GeneratedMap {
    let map = generate_map(canvas, constants, rng);
    let unreachable = unreachable_layers(&map, constants);
    if unreachable.is_empty() {
        info!(
            "[Tilerun] Generated {}x{} level with {} platforms",
            map.grid.rows,
            map.grid.cols,
            map.platforms.len()
        );
    } else {
        warn!("[Tilerun] Generated level has layers out of jump reach: rows {unreachable:?}");
    }
    map
}
