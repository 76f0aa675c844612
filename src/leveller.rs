use std::collections::BTreeMap;

use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::config::{EnemyConstants, LevelingConstants};

/// How one stat grows with the level. `interval` spaces the increments: with
/// `Some(3)` the stat only moves every third level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScaleRule {
    Linear {
        factor: f64,
        #[serde(default)]
        interval: Option<u32>,
    },
    Exponential {
        factor: f64,
        #[serde(default)]
        interval: Option<u32>,
    },
    Step {
        step: f64,
        #[serde(default)]
        interval: Option<u32>,
    },
}

impl ScaleRule {
    pub fn apply(&self, base: f64, level: u32) -> f64 {
        match *self {
            ScaleRule::Linear { factor, interval } => base + increments(level, interval) * factor,
            ScaleRule::Exponential { factor, interval } => base * factor.powf(increments(level, interval)),
            ScaleRule::Step { step, interval } => base + increments(level, interval) * step,
        }
    }
}

fn increments(level: u32, interval: Option<u32>) -> f64 {
    let steps = level.saturating_sub(1);
    match interval {
        Some(n) if n > 1 => (steps / n) as f64,
        _ => steps as f64,
    }
}

/// Rules keyed by dotted path into the enemy stats, e.g. `walker.health` or
/// `group_size`. A key also covers everything nested under it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScalingTable {
    rules: BTreeMap<String, ScaleRule>,
}

impl ScalingTable {
    pub fn with_rule(mut self, path: &str, rule: ScaleRule) -> Self {
        self.rules.insert(path.to_string(), rule);
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule with the longest key that equals `path` or is a dotted prefix of it.
    pub fn rule_for(&self, path: &str) -> Option<&ScaleRule> {
        let mut candidate = path;
        loop {
            if let Some(rule) = self.rules.get(candidate) {
                return Some(rule);
            }
            let (parent, _) = candidate.rsplit_once('.')?;
            candidate = parent;
        }
    }
}

/// Receives every numeric leaf of a JSON tree with its dotted path.
pub trait NumberVisitor {
    fn visit(&mut self, path: &str, value: f64) -> f64;
}

/// Rebuilds `value` with each number passed through `visitor`. Integer leaves
/// are rounded back to integers so integer fields still deserialize.
pub fn transform_numbers(value: &Value, visitor: &mut impl NumberVisitor) -> Value {
    transform_at(value, "", visitor)
}

fn transform_at(value: &Value, path: &str, visitor: &mut impl NumberVisitor) -> Value {
    match value {
        Value::Number(n) => {
            let Some(f) = n.as_f64() else {
                return value.clone();
            };
            let scaled = visitor.visit(path, f);
            if n.is_u64() || n.is_i64() {
                let rounded = scaled.round();
                if rounded >= 0.0 {
                    Value::Number(Number::from(rounded as u64))
                } else {
                    Value::Number(Number::from(rounded as i64))
                }
            } else {
                Number::from_f64(scaled).map_or_else(|| value.clone(), Value::Number)
            }
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| transform_at(item, &join_path(path, &i.to_string()), visitor))
                .collect(),
        ),
        Value::Object(obj) => {
            let mut out = serde_json::Map::new();
            for (k, v) in obj {
                out.insert(k.clone(), transform_at(v, &join_path(path, k), visitor));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

struct LevelScaler<'a> {
    table: &'a ScalingTable,
    level: u32,
}

impl NumberVisitor for LevelScaler<'_> {
    fn visit(&mut self, path: &str, value: f64) -> f64 {
        match self.table.rule_for(path) {
            Some(rule) => rule.apply(value, self.level),
            None => value,
        }
    }
}

/// Enemy stats for `level`, always scaled from `base` so levels never compound.
pub fn scale_enemy_stats(base: &EnemyConstants, table: &ScalingTable, level: u32) -> Result<EnemyConstants, String> {
    let tree = serde_json::to_value(base).map_err(|e| format!("failed to serialize enemy stats: {e}"))?;
    let mut scaler = LevelScaler { table, level };
    let scaled = transform_numbers(&tree, &mut scaler);
    serde_json::from_value(scaled).map_err(|e| format!("scaled enemy stats are invalid: {e}"))
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelTick {
    pub level: u32,
    pub seconds_to_next_level: f32,
    /// Set on the frame a level-up happened.
    pub new_stats: Option<EnemyConstants>,
}

/// Level timer. Each level takes `time_multiplier` times longer than the last.
#[derive(Clone, Debug)]
pub struct Leveller {
    pub level: u32,
    pub timer: f32,
    pub level_up_seconds: f32,
    time_multiplier: f32,
    scaling: ScalingTable,
    base: EnemyConstants,
}

impl Leveller {
    pub fn new(leveling: &LevelingConstants, base: EnemyConstants) -> Self {
        Self {
            level: 1,
            timer: 0.0,
            level_up_seconds: leveling.level_up_seconds,
            time_multiplier: leveling.time_multiplier,
            scaling: leveling.scaling.clone(),
            base,
        }
    }

    pub fn update(&mut self, dt: f32) -> LevelTick {
        self.timer += dt;
        let mut new_stats = None;
        if self.level_up_seconds > 0.0 && self.timer >= self.level_up_seconds {
            self.timer -= self.level_up_seconds;
            self.level += 1;
            self.level_up_seconds *= self.time_multiplier;
            match scale_enemy_stats(&self.base, &self.scaling, self.level) {
                Ok(stats) => {
                    info!(
                        "[Tilerun] Level {} reached; next level in {:.1}s",
                        self.level, self.level_up_seconds
                    );
                    new_stats = Some(stats);
                }
                Err(err) => warn!("[Tilerun] {err}; keeping previous enemy stats"),
            }
        }
        LevelTick {
            level: self.level,
            seconds_to_next_level: self.level_up_seconds,
            new_stats,
        }
    }
}
