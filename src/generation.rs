use crate::components::{Canvas, TileKind};
use crate::config::Constants;
use crate::pathfinding::{NavGraph, NavNode};
use crate::tilemap::TileGrid;
use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};
use serde::{Deserialize, Serialize};

/// Seeded RNG shared by generation, spawning and enemy behaviour.
#[derive(Clone, Debug)]
pub struct Rng(SmallRng);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }

    /// Uniform in `[0, 1)`.
    pub fn float(&mut self) -> f32 {
        self.0.gen()
    }

    /// Uniform in `[min, max]`. Returns `min` for an empty range.
    pub fn range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        self.0.gen_range(min..=max)
    }

    pub fn chance(&mut self, probability: f32) -> bool {
        self.float() < probability
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.range(0, items.len() as i32 - 1) as usize;
        items.get(idx)
    }
}

/// A horizontal run of solid tiles, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub row: i32,
    pub col_start: i32,
    pub col_end: i32,
}

impl Platform {
    pub fn len(&self) -> i32 {
        self.col_end - self.col_start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMap {
    pub grid: TileGrid,
    pub platforms: Vec<Platform>,
    pub floor_row: i32,
    pub cols: usize,
    pub vertical_offset: f32,
    /// Floor first, then each layer above it in generation order.
    pub layer_rows: Vec<i32>,
}

/// Apex height of a full jump in pixels.
pub fn max_jump_pixels(constants: &Constants) -> f32 {
    let g = &constants.general;
    (constants.jump_force * g.jump_height_scale)
        .abs()
        .powf(g.jump_height_exponent)
        / (g.gravity_divisor * constants.gravity)
}

/// `(min_gap, max_gap)` in tiles between consecutive layers.
pub fn layer_gap_bounds(constants: &Constants) -> (i32, i32) {
    let map = &constants.map;
    let jump_tiles = (max_jump_pixels(constants) / constants.tile_size).floor() as i32;
    let floor = map.min_vertical_gap_tiles;
    let ceiling = map.max_vertical_gap_tiles.max(floor);
    let max_gap = jump_tiles.max(floor).min(ceiling);
    let min_gap = (jump_tiles - map.gap_reduction_tiles).max(floor).min(max_gap);
    (min_gap, max_gap)
}

pub fn generate_map(canvas: &Canvas, constants: &Constants, rng: &mut Rng) -> GeneratedMap {
    let ts = constants.tile_size;
    let map = &constants.map;
    let min_dim = constants.general.min_grid_dimension;
    let rows = min_dim.max((canvas.height / ts).floor() as usize);
    let cols = min_dim.max((canvas.width / ts).ceil() as usize);
    let vertical_offset = constants
        .general
        .min_vertical_offset
        .max(canvas.height - rows as f32 * ts);

    let mut grid = TileGrid::new(rows, cols, ts, vertical_offset).with_segment_end_offset(map.segment_end_offset);

    let floor_row = rows.saturating_sub(map.last_row_offset) as i32;
    grid.fill_row(floor_row, 0, cols as i32 - 1, TileKind::Solid);

    let play_start = map.edge_margin as i32;
    let play_end = cols as i32 - 1 - map.column_end_limit_adjustment as i32;
    let mut platforms = vec![Platform {
        row: floor_row,
        col_start: play_start,
        col_end: play_end,
    }];

    let layer_rows = pick_layer_rows(floor_row, constants, rng);
    for &row in layer_rows.iter().skip(1) {
        carve_layer(&mut grid, &mut platforms, row, play_start, play_end, constants, rng);
    }

    for row in 0..rows as i32 {
        grid.set(row, 0, TileKind::Wall);
        grid.set(row, cols as i32 - 1, TileKind::Wall);
    }

    GeneratedMap {
        grid,
        platforms,
        floor_row,
        cols,
        vertical_offset,
        layer_rows,
    }
}

/// Walks up from the floor, spacing layers by jump-reachable gaps and leaving
/// room for the layers still to come below the top margin.
fn pick_layer_rows(floor_row: i32, constants: &Constants, rng: &mut Rng) -> Vec<i32> {
    let map = &constants.map;
    let (min_gap, max_gap) = layer_gap_bounds(constants);
    let top_margin = map.top_margin as i32;
    let target_layers = map.layer_count + 1;

    let mut layer_rows = vec![floor_row];
    let mut last = floor_row;
    while layer_rows.len() < target_layers {
        if last - min_gap < top_margin {
            break;
        }
        let remaining = (target_layers - layer_rows.len()) as i32;
        let room = last - (top_margin + (remaining - 1) * min_gap);
        let upper = room.max(min_gap).min(max_gap);

        let gap = rng.range(min_gap, upper);
        let mut next = (last - gap).max(top_margin);
        if last - next < min_gap {
            next = last - min_gap;
        }
        if next < top_margin {
            break;
        }
        layer_rows.push(next);
        last = next;
    }
    layer_rows
}

fn carve_layer(
    grid: &mut TileGrid,
    platforms: &mut Vec<Platform>,
    row: i32,
    play_start: i32,
    play_end: i32,
    constants: &Constants,
    rng: &mut Rng,
) {
    let map = &constants.map;
    let min_len = map.segment_min_length.max(1) as i32;
    let max_len = min_len.max((grid.cols as f32 * map.segment_max_fraction).floor() as i32);

    let mut segments = Vec::new();
    let mut col = play_start + rng.range(0, map.segment_start_max_offset as i32);
    while col <= play_end {
        let len = rng.range(min_len, max_len);
        let end = (col + len - 1).min(play_end);
        segments.push(Platform {
            row,
            col_start: col,
            col_end: end,
        });
        col = end + 1 + rng.range(map.segment_skip_min as i32, map.segment_skip_max as i32);
    }

    let safe = map.safe_landing_length as i32;
    if !segments.iter().any(|s| s.len() >= safe) {
        let width = play_end - play_start + 1;
        let len = (map.fallback_segment_length as i32).min(width).max(1);
        let start = play_start + (width - len) / 2;
        segments.push(Platform {
            row,
            col_start: start,
            col_end: start + len - 1,
        });
    }

    for segment in &segments {
        grid.fill_row(row, segment.col_start, segment.col_end, TileKind::Solid);
    }
    platforms.extend(segments);
}

/// Top-left position for a `width × height` body standing somewhere on `platform`.
pub fn spawn_point_on_platform(
    grid: &TileGrid,
    platform: &Platform,
    width: f32,
    height: f32,
    collision_offset: f32,
    rng: &mut Rng,
) -> (f32, f32) {
    let min_x = grid.col_left(platform.col_start);
    let max_x = grid.col_left(platform.col_end + 1) - width - collision_offset;
    let x = (min_x + rng.float() * (max_x - min_x).max(1.0)).clamp(min_x, max_x.max(min_x));
    let y = grid.row_top(platform.row) - height - collision_offset;
    (x, y)
}

/// Player start: centered in column `cols / fallback_platform_divisor` on the floor.
pub fn player_spawn(map: &GeneratedMap, constants: &Constants) -> (f32, f32) {
    let ts = constants.tile_size;
    let divisor = constants.map.fallback_platform_divisor.max(1);
    let col = (map.cols / divisor) as i32;
    let width = constants.player.width;
    let height = constants.player.height;
    let x = map.grid.col_left(col) + (ts - width) / 2.0;
    let y = map.grid.row_top(map.floor_row) - height - constants.player.collision_offset;
    (x, y)
}

/// Layers with no standable cell reachable from the floor. Generation does not
/// enforce reachability; this is reported for logging.
pub fn unreachable_layers(map: &GeneratedMap, constants: &Constants) -> Vec<i32> {
    let nav = NavGraph::new(&map.grid, max_jump_pixels(constants));
    let Some(start) = map
        .platforms
        .first()
        .map(|p| NavNode::new(p.row - 1, (p.col_start + p.col_end) / 2))
        .filter(|n| nav.is_walkable(n.row, n.col))
    else {
        return map.layer_rows.iter().skip(1).copied().collect();
    };
    let reachable = nav.reachable_from(start);
    map.layer_rows
        .iter()
        .skip(1)
        .copied()
        .filter(|&row| !reachable.iter().any(|n| n.row == row - 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics_core::check_collision;

    fn generate(width: f32, height: f32, seed: u64) -> GeneratedMap {
        let mut rng = Rng::new(seed);
        generate_map(&Canvas::new(width, height), &Constants::default(), &mut rng)
    }

    #[test]
    fn jump_reach_matches_physics() {
        let constants = Constants::default();
        let px = max_jump_pixels(&constants);
        assert!((px - 122.1).abs() < 0.1, "{px}");
        assert_eq!(layer_gap_bounds(&constants), (2, 2));
    }

    #[test]
    fn floor_is_solid_and_every_layer_has_a_platform() {
        for (w, h) in [(100.0, 100.0), (640.0, 480.0), (1280.0, 720.0), (1920.0, 1080.0)] {
            for seed in 0..8 {
                let map = generate(w, h, seed);
                for col in 0..map.cols as i32 {
                    assert!(map.grid.is_solid(map.floor_row, col), "{w}x{h} seed {seed} col {col}");
                }
                for &row in &map.layer_rows {
                    assert!(
                        map.platforms.iter().any(|p| p.row == row),
                        "{w}x{h} seed {seed}: layer {row} has no platform"
                    );
                }
            }
        }
    }

    #[test]
    fn grid_dimensions_clamp_to_minimum() {
        let map = generate(100.0, 100.0, 1);
        assert_eq!(map.grid.rows, 5);
        assert_eq!(map.cols, 5);
        assert_eq!(map.vertical_offset, 0.0);
    }

    #[test]
    fn vertical_offset_takes_leftover_pixels() {
        let map = generate(640.0, 500.0, 1);
        assert_eq!(map.grid.rows, 8);
        assert_eq!(map.vertical_offset, 20.0);
        assert_eq!(map.cols, 11);
    }

    #[test]
    fn boundary_columns_are_walls() {
        let map = generate(1280.0, 720.0, 3);
        for row in 0..map.grid.rows as i32 {
            assert_eq!(map.grid.get(row, 0), TileKind::Wall);
            assert_eq!(map.grid.get(row, map.cols as i32 - 1), TileKind::Wall);
        }
    }

    #[test]
    fn layer_gaps_stay_within_jump_reach() {
        let constants = Constants::default();
        let (_, max_gap) = layer_gap_bounds(&constants);
        for seed in 0..16 {
            let map = generate(1920.0, 1080.0, seed);
            for pair in map.layer_rows.windows(2) {
                let gap = pair[0] - pair[1];
                assert!(gap >= 1 && gap <= max_gap, "seed {seed}: gap {gap}");
            }
            assert!(map.layer_rows.iter().all(|&r| r >= constants.map.top_margin as i32));
        }
    }

    #[test]
    fn same_seed_same_map() {
        assert_eq!(generate(1280.0, 720.0, 99), generate(1280.0, 720.0, 99));
    }

    #[test]
    fn spawn_points_are_clear() {
        let constants = Constants::default();
        let map = generate(1280.0, 720.0, 5);
        let (px, py) = player_spawn(&map, &constants);
        assert!(!check_collision(&map.grid, px, py, constants.player.width, constants.player.height));
        assert!(check_collision(&map.grid, px, py + 1.0, constants.player.width, constants.player.height));

        let mut rng = Rng::new(11);
        let size = constants.enemies.walker.size;
        for platform in &map.platforms {
            let (x, y) = spawn_point_on_platform(&map.grid, platform, size, size, 0.01, &mut rng);
            assert!(!check_collision(&map.grid, x, y, size, size), "{platform:?}");
        }
    }

    fn hand_built(rows: &[&str], layer_rows: Vec<i32>) -> GeneratedMap {
        let grid = TileGrid::from_rows(rows, 60.0);
        let cols = grid.cols;
        let floor_row = rows.len() as i32 - 1;
        GeneratedMap {
            grid,
            platforms: vec![Platform {
                row: floor_row,
                col_start: 1,
                col_end: cols as i32 - 2,
            }],
            floor_row,
            cols,
            vertical_offset: 0.0,
            layer_rows,
        }
    }

    #[test]
    fn reachability_report_flags_high_layer() {
        let constants = Constants::default();
        let reachable = hand_built(
            &["W.......W", "W.......W", "W...##..W", "W.......W", "#########"],
            vec![4, 2],
        );
        assert!(unreachable_layers(&reachable, &constants).is_empty());

        // Three rows up is beyond a two-tile jump.
        let too_high = hand_built(
            &["W.......W", "W...##..W", "W.......W", "W.......W", "#########"],
            vec![4, 1],
        );
        assert_eq!(unreachable_layers(&too_high, &constants), vec![1]);
    }
}
