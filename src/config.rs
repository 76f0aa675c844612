use std::path::Path;

use bevy::log::{info, warn};
use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::leveller::{ScaleRule, ScalingTable};

/// Every tunable the simulation reads. Velocities of kinematic bodies are in
/// pixels per frame; free-flying enemies and projectiles use pixels per second.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    pub tile_size: f32,
    pub gravity: f32,
    pub jump_force: f32,
    pub coyote_frames: u32,
    pub jump_buffer_frames: u32,
    pub max_delta_seconds: f32,
    pub general: GeneralConstants,
    pub map: MapConstants,
    pub player: PlayerConstants,
    pub enemies: EnemyConstants,
    pub pathfinding: PathfindingConstants,
    pub leveling: LevelingConstants,
    pub input: InputConstants,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            tile_size: 60.0,
            gravity: 0.65,
            jump_force: -14.0,
            coyote_frames: 6,
            jump_buffer_frames: 6,
            max_delta_seconds: 0.05,
            general: GeneralConstants::default(),
            map: MapConstants::default(),
            player: PlayerConstants::default(),
            enemies: EnemyConstants::default(),
            pathfinding: PathfindingConstants::default(),
            leveling: LevelingConstants::default(),
            input: InputConstants::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConstants {
    pub min_grid_dimension: usize,
    pub min_vertical_offset: f32,
    /// `k` in `|jump_force * k|^p / (c * gravity)`.
    pub jump_height_scale: f32,
    /// `p` in the jump-height formula.
    pub jump_height_exponent: f32,
    /// `c` in the jump-height formula.
    pub gravity_divisor: f32,
}

impl Default for GeneralConstants {
    fn default() -> Self {
        Self {
            min_grid_dimension: 5,
            min_vertical_offset: 0.0,
            jump_height_scale: 0.9,
            jump_height_exponent: 2.0,
            gravity_divisor: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConstants {
    pub last_row_offset: usize,
    pub edge_margin: usize,
    pub column_end_limit_adjustment: usize,
    pub min_vertical_gap_tiles: i32,
    pub max_vertical_gap_tiles: i32,
    pub gap_reduction_tiles: i32,
    pub layer_count: usize,
    pub top_margin: usize,
    pub segment_start_max_offset: usize,
    pub segment_min_length: usize,
    pub segment_max_fraction: f32,
    pub segment_skip_min: usize,
    pub segment_skip_max: usize,
    pub safe_landing_length: usize,
    pub fallback_segment_length: usize,
    pub fallback_platform_divisor: usize,
    pub segment_end_offset: f32,
}

impl Default for MapConstants {
    fn default() -> Self {
        Self {
            last_row_offset: 1,
            edge_margin: 1,
            column_end_limit_adjustment: 1,
            min_vertical_gap_tiles: 2,
            max_vertical_gap_tiles: 3,
            gap_reduction_tiles: 0,
            layer_count: 3,
            top_margin: 2,
            segment_start_max_offset: 3,
            segment_min_length: 3,
            segment_max_fraction: 0.3,
            segment_skip_min: 2,
            segment_skip_max: 4,
            safe_landing_length: 2,
            fallback_segment_length: 4,
            fallback_platform_divisor: 2,
            segment_end_offset: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConstants {
    pub width: f32,
    pub height: f32,
    pub speed: f32,
    pub max_speed: f32,
    pub deceleration_factor: f32,
    pub min_speed_threshold: f32,
    pub max_fall_speed: f32,
    pub jump_impulse_multiplier: f32,
    pub collision_offset: f32,
    pub max_lives: u32,
    pub invulnerability_ms: f64,
    pub wall_jump: WallJumpConstants,
    pub shoot: ShootConstants,
}

impl Default for PlayerConstants {
    fn default() -> Self {
        Self {
            width: 34.0,
            height: 48.0,
            speed: 0.75,
            max_speed: 4.2,
            deceleration_factor: 0.82,
            min_speed_threshold: 0.05,
            max_fall_speed: 14.0,
            jump_impulse_multiplier: 0.6,
            collision_offset: 0.01,
            max_lives: 3,
            invulnerability_ms: 1000.0,
            wall_jump: WallJumpConstants::default(),
            shoot: ShootConstants::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallJumpConstants {
    pub enabled: bool,
    pub horizontal_impulse: f32,
    pub cooldown_frames: u32,
    pub rotation_frames: u32,
    pub probe_distance: f32,
}

impl Default for WallJumpConstants {
    fn default() -> Self {
        Self {
            enabled: true,
            horizontal_impulse: 4.2,
            cooldown_frames: 18,
            rotation_frames: 12,
            probe_distance: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootConstants {
    pub cooldown_ms: f64,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    pub damage: f32,
}

impl Default for ShootConstants {
    fn default() -> Self {
        Self {
            cooldown_ms: 250.0,
            bullet_speed: 600.0,
            bullet_radius: 5.0,
            damage: 1.0,
        }
    }
}

/// Enemy tunables. This whole subtree is what the leveller scales.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConstants {
    pub group_size: GroupSize,
    pub max_alive: u32,
    pub spawn_interval_ms: f64,
    pub spawn_descent_speed: f32,
    pub death_animation_ms: f64,
    pub damage_flash_ms: f64,
    pub shooter: ShooterConstants,
    pub seeker: SeekerConstants,
    pub walker: WalkerConstants,
}

impl Default for EnemyConstants {
    fn default() -> Self {
        Self {
            group_size: GroupSize::default(),
            max_alive: 12,
            spawn_interval_ms: 4000.0,
            spawn_descent_speed: 120.0,
            death_animation_ms: 320.0,
            damage_flash_ms: 220.0,
            shooter: ShooterConstants::default(),
            seeker: SeekerConstants::default(),
            walker: WalkerConstants::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupSize {
    pub min: u32,
    pub max: u32,
}

impl Default for GroupSize {
    fn default() -> Self {
        Self { min: 2, max: 4 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShooterConstants {
    pub width: f32,
    pub height: f32,
    pub health: f32,
    pub move_speed: f32,
    pub vertical_adjust_speed: f32,
    pub fire_cooldown_ms: f64,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
}

impl Default for ShooterConstants {
    fn default() -> Self {
        Self {
            width: 36.0,
            height: 36.0,
            health: 3.0,
            move_speed: 90.0,
            vertical_adjust_speed: 60.0,
            fire_cooldown_ms: 1400.0,
            bullet_speed: 320.0,
            bullet_radius: 6.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekerConstants {
    pub size: f32,
    pub health: f32,
    pub move_speed: f32,
    pub vertical_adjust_speed: f32,
    /// Radians per second.
    pub turn_rate: f32,
}

impl Default for SeekerConstants {
    fn default() -> Self {
        Self {
            size: 30.0,
            health: 2.0,
            move_speed: 110.0,
            vertical_adjust_speed: 80.0,
            turn_rate: 2.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConstants {
    pub size: f32,
    pub health: f32,
    pub move_acceleration: f32,
    pub max_speed: f32,
    pub deceleration_factor: f32,
    pub min_speed_threshold: f32,
    pub max_fall_speed: f32,
    pub jump_force: f32,
    pub jump_cooldown_ms: f64,
    pub collision_offset: f32,
}

impl Default for WalkerConstants {
    fn default() -> Self {
        Self {
            size: 40.0,
            health: 4.0,
            move_acceleration: 0.5,
            max_speed: 3.0,
            deceleration_factor: 0.8,
            min_speed_threshold: 0.05,
            max_fall_speed: 14.0,
            jump_force: -14.0,
            jump_cooldown_ms: 450.0,
            collision_offset: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfindingConstants {
    pub replan_interval_ms: f64,
    pub waypoint_tolerance_x: f32,
    /// Fraction of a tile.
    pub waypoint_band_y: f32,
    pub node_search_rows: i32,
    pub steering_deadzone: f32,
}

impl Default for PathfindingConstants {
    fn default() -> Self {
        Self {
            replan_interval_ms: 180.0,
            waypoint_tolerance_x: 8.0,
            waypoint_band_y: 1.0,
            node_search_rows: 3,
            steering_deadzone: 4.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelingConstants {
    pub level_up_seconds: f32,
    pub time_multiplier: f32,
    pub regenerate_map_on_level_up: bool,
    pub scaling: ScalingTable,
}

impl Default for LevelingConstants {
    fn default() -> Self {
        let scaling = ScalingTable::default()
            .with_rule(
                "group_size",
                ScaleRule::Step {
                    step: 1.0,
                    interval: Some(2),
                },
            )
            .with_rule(
                "spawn_interval_ms",
                ScaleRule::Exponential {
                    factor: 0.92,
                    interval: None,
                },
            )
            .with_rule(
                "shooter.health",
                ScaleRule::Linear {
                    factor: 1.0,
                    interval: Some(2),
                },
            )
            .with_rule(
                "seeker.move_speed",
                ScaleRule::Exponential {
                    factor: 1.05,
                    interval: None,
                },
            )
            .with_rule(
                "walker.health",
                ScaleRule::Linear {
                    factor: 1.0,
                    interval: None,
                },
            );
        Self {
            level_up_seconds: 30.0,
            time_multiplier: 1.15,
            regenerate_map_on_level_up: true,
            scaling,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConstants {
    pub bindings: Vec<KeyBindings>,
}

impl Default for InputConstants {
    fn default() -> Self {
        Self {
            bindings: vec![KeyBindings::default(), KeyBindings::second_player()],
        }
    }
}

/// Raw key identifiers (DOM-style codes such as `KeyA`, `ArrowLeft`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub move_left: Vec<String>,
    pub move_right: Vec<String>,
    pub jump: Vec<String>,
    /// Up, down, left, right.
    pub shoot: [String; 4],
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            move_left: keys(&["KeyA"]),
            move_right: keys(&["KeyD"]),
            jump: keys(&["Space", "KeyW"]),
            shoot: [
                "ArrowUp".to_string(),
                "ArrowDown".to_string(),
                "ArrowLeft".to_string(),
                "ArrowRight".to_string(),
            ],
        }
    }
}

impl KeyBindings {
    /// IJKL movement with numpad aiming.
    pub fn second_player() -> Self {
        let keys = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            move_left: keys(&["KeyJ"]),
            move_right: keys(&["KeyL"]),
            jump: keys(&["KeyI"]),
            shoot: [
                "Numpad8".to_string(),
                "Numpad5".to_string(),
                "Numpad4".to_string(),
                "Numpad6".to_string(),
            ],
        }
    }
}

impl Constants {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.tile_size > 0.0) {
            return Err(format!("tile_size must be positive, got {}", self.tile_size));
        }
        if !(self.gravity > 0.0) {
            return Err(format!("gravity must be positive, got {}", self.gravity));
        }
        if self.jump_force >= 0.0 {
            return Err(format!(
                "jump_force must point upward (negative), got {}",
                self.jump_force
            ));
        }
        if self.max_delta_seconds <= 0.0 {
            return Err("max_delta_seconds must be positive".to_string());
        }
        if self.map.min_vertical_gap_tiles > self.map.max_vertical_gap_tiles {
            return Err(format!(
                "min_vertical_gap_tiles ({}) exceeds max_vertical_gap_tiles ({})",
                self.map.min_vertical_gap_tiles, self.map.max_vertical_gap_tiles
            ));
        }
        if self.map.segment_skip_min > self.map.segment_skip_max {
            return Err("segment_skip_min exceeds segment_skip_max".to_string());
        }
        if self.enemies.group_size.min > self.enemies.group_size.max {
            return Err(format!(
                "enemy group_size.min ({}) exceeds group_size.max ({})",
                self.enemies.group_size.min, self.enemies.group_size.max
            ));
        }
        if self.input.bindings.is_empty() {
            return Err("at least one set of key bindings is required".to_string());
        }
        Ok(())
    }
}

pub fn parse_constants(contents: &str) -> Result<Constants, String> {
    let constants: Constants =
        serde_json::from_str(contents).map_err(|e| format!("invalid constants JSON: {e}"))?;
    constants.validate()?;
    Ok(constants)
}

pub fn load_constants_from(path: &Path) -> Result<Constants, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    parse_constants(&contents)
}

/// Resolves `TILERUN_CONFIG` (or `tilerun.json`) and falls back to defaults
/// when the file is missing or invalid.
pub fn load_constants() -> Constants {
    let path = std::env::var("TILERUN_CONFIG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "tilerun.json".to_string());
    let path = Path::new(&path);
    if !path.exists() {
        return Constants::default();
    }
    match load_constants_from(path) {
        Ok(constants) => {
            info!("[Tilerun] Loaded constants from {}", path.display());
            constants
        }
        Err(err) => {
            warn!("[Tilerun] {err}; using default constants");
            Constants::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(Constants::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let constants = parse_constants(r#"{ "gravity": 0.8, "player": { "max_speed": 5.0 } }"#)
            .expect("partial config should parse");
        assert_eq!(constants.gravity, 0.8);
        assert_eq!(constants.player.max_speed, 5.0);
        assert_eq!(constants.player.width, PlayerConstants::default().width);
        assert_eq!(constants.tile_size, 60.0);
    }

    #[test]
    fn rejects_downward_jump_force() {
        let err = parse_constants(r#"{ "jump_force": 3.0 }"#).unwrap_err();
        assert!(err.contains("jump_force"), "{err}");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_constants("{ not json").is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let constants = Constants::default();
        let text = serde_json::to_string(&constants).unwrap();
        assert_eq!(parse_constants(&text).unwrap(), constants);
    }
}
