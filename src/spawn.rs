use crate::components::Canvas;
use crate::config::{Constants, EnemyConstants};
use crate::enemy::Enemy;
use crate::generation::{spawn_point_on_platform, GeneratedMap, Platform, Rng};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyChoice {
    Shooter,
    Seeker,
    Walker,
}

const CHOICES: [EnemyChoice; 3] = [EnemyChoice::Shooter, EnemyChoice::Seeker, EnemyChoice::Walker];

/// `rand[group_size.min, group_size.max]` enemies of uniformly random kinds.
pub fn spawn_enemy_group(
    stats: &EnemyConstants,
    constants: &Constants,
    canvas: &Canvas,
    map: &GeneratedMap,
    rng: &mut Rng,
) -> Vec<Enemy> {
    let count = rng.range(stats.group_size.min as i32, stats.group_size.max as i32).max(0) as usize;
    (0..count)
        .map(|_| {
            let choice = rng.pick(&CHOICES).copied().unwrap_or(EnemyChoice::Seeker);
            spawn_enemy(choice, stats, constants, canvas, map, rng)
        })
        .collect()
}

pub fn spawn_enemy(
    choice: EnemyChoice,
    stats: &EnemyConstants,
    constants: &Constants,
    canvas: &Canvas,
    map: &GeneratedMap,
    rng: &mut Rng,
) -> Enemy {
    match choice {
        EnemyChoice::Shooter => Enemy::shooter(stats, canvas, rng),
        EnemyChoice::Seeker => Enemy::seeker(stats, canvas, rng),
        EnemyChoice::Walker => {
            let platform = pick_platform(map, rng);
            let size = stats.walker.size;
            let (x, y) = spawn_point_on_platform(&map.grid, &platform, size, size, stats.walker.collision_offset, rng);
            Enemy::walker(stats, constants, x, y)
        }
    }
}

/// Any generated platform, or the whole floor when there are none.
fn pick_platform(map: &GeneratedMap, rng: &mut Rng) -> Platform {
    rng.pick(&map.platforms).copied().unwrap_or(Platform {
        row: map.floor_row,
        col_start: 0,
        col_end: map.cols as i32 - 1,
    })
}
