use crate::components::Bounds;
use crate::tilemap::TileGrid;
use bevy::prelude::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap, VecDeque};

/// A standable cell: open, with a solid cell directly below.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NavNode {
    pub row: i32,
    pub col: i32,
}

impl NavNode {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Implicit graph over a tile grid. Nodes and edges are derived on demand.
pub struct NavGraph<'a> {
    grid: &'a TileGrid,
    pub max_jump_tiles: i32,
    pub max_jump_horizontal_tiles: i32,
}

impl<'a> NavGraph<'a> {
    pub fn new(grid: &'a TileGrid, max_jump_pixels: f32) -> Self {
        let tiles = max_jump_pixels / grid.tile_size;
        Self {
            grid,
            max_jump_tiles: tiles.floor() as i32,
            max_jump_horizontal_tiles: tiles.round() as i32,
        }
    }

    /// Cells off the grid count as solid so paths never leave the level.
    pub fn is_solid_cell(&self, row: i32, col: i32) -> bool {
        !self.grid.in_bounds(row, col) || self.grid.is_solid(row, col)
    }

    pub fn is_walkable(&self, row: i32, col: i32) -> bool {
        !self.is_solid_cell(row, col) && self.is_solid_cell(row + 1, col)
    }

    pub fn neighbors(&self, node: NavNode) -> Vec<NavNode> {
        let mut out = Vec::new();
        for dc in [-1, 1] {
            let col = node.col + dc;
            if self.is_walkable(node.row, col) {
                out.push(NavNode::new(node.row, col));
            } else if let Some(landing) = self.drop_target(node.row, col) {
                out.push(landing);
            }
        }
        self.push_jump_targets(node, &mut out);
        out
    }

    /// First standable cell straight down from `(row, col)`, if nothing solid
    /// is hit on the way.
    fn drop_target(&self, row: i32, col: i32) -> Option<NavNode> {
        if self.is_solid_cell(row, col) {
            return None;
        }
        let mut r = row + 1;
        while self.grid.in_bounds(r, col) {
            if self.is_solid_cell(r, col) {
                return None;
            }
            if self.is_walkable(r, col) {
                return Some(NavNode::new(r, col));
            }
            r += 1;
        }
        None
    }

    fn push_jump_targets(&self, node: NavNode, out: &mut Vec<NavNode>) {
        for rise in 1..=self.max_jump_tiles {
            let target_row = node.row - rise;
            let reach = self.max_jump_horizontal_tiles.min(rise + 1);
            for dx in -reach..=reach {
                if dx == 0 {
                    continue;
                }
                let target_col = node.col + dx;
                if self.is_walkable(target_row, target_col)
                    && self.jump_corridor_clear(node, target_row, target_col)
                {
                    out.push(NavNode::new(target_row, target_col));
                }
            }
        }
    }

    /// Straight up the source column, then across the target row.
    fn jump_corridor_clear(&self, from: NavNode, target_row: i32, target_col: i32) -> bool {
        let column_clear = (target_row..=from.row).all(|r| !self.is_solid_cell(r, from.col));
        let (lo, hi) = if from.col <= target_col {
            (from.col, target_col)
        } else {
            (target_col, from.col)
        };
        column_clear && (lo..=hi).all(|c| !self.is_solid_cell(target_row, c))
    }

    /// Breadth-first search; the returned path includes both ends.
    pub fn find_path(&self, start: NavNode, target: NavNode) -> Option<Vec<NavNode>> {
        if !self.is_walkable(start.row, start.col) || !self.is_walkable(target.row, target.col) {
            return None;
        }
        let mut visited: HashMap<NavNode, Option<NavNode>> = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(start, None);
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return Some(reconstruct_path(&visited, target));
            }
            for next in self.neighbors(current) {
                enqueue_if_new(&mut visited, &mut queue, next, current);
            }
        }
        None
    }

    /// Every node reachable from `start`, including `start`.
    pub fn reachable_from(&self, start: NavNode) -> Vec<NavNode> {
        let mut visited: HashMap<NavNode, Option<NavNode>> = HashMap::new();
        let mut queue = VecDeque::new();
        let mut order = Vec::new();
        visited.insert(start, None);
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            order.push(current);
            for next in self.neighbors(current) {
                enqueue_if_new(&mut visited, &mut queue, next, current);
            }
        }
        order
    }

    /// The standable cell a body is standing in, or about to land in.
    pub fn node_for_bounds(&self, bounds: &Bounds, search_rows: i32) -> Option<NavNode> {
        let foot_row = self.grid.row_at(bounds.bottom() - 0.01);
        let center_col = self.grid.col_at(bounds.center().x);
        let left_col = self.grid.col_at(bounds.x);
        let right_col = self.grid.col_at(bounds.right() - 0.01);

        let mut columns = vec![center_col];
        for col in [left_col, right_col, center_col - 1, center_col + 1] {
            if !columns.contains(&col) {
                columns.push(col);
            }
        }
        for col in columns {
            for row in foot_row..=foot_row + search_rows.max(0) {
                if self.is_walkable(row, col) {
                    return Some(NavNode::new(row, col));
                }
            }
        }
        None
    }

    /// Feet position of a body standing centered in `node`.
    pub fn waypoint(&self, node: NavNode, collision_offset: f32) -> Vec2 {
        let ts = self.grid.tile_size;
        Vec2::new(
            (node.col as f32 + 0.5) * ts,
            self.grid.row_top(node.row + 1) - collision_offset,
        )
    }
}

fn insert_parent_if_new(
    visited: &mut HashMap<NavNode, Option<NavNode>>,
    node: NavNode,
    parent: NavNode,
) -> bool {
    match visited.entry(node) {
        Entry::Vacant(entry) => {
            entry.insert(Some(parent));
            true
        }
        Entry::Occupied(_) => false,
    }
}

fn enqueue_if_new(
    visited: &mut HashMap<NavNode, Option<NavNode>>,
    queue: &mut VecDeque<NavNode>,
    node: NavNode,
    parent: NavNode,
) -> bool {
    if insert_parent_if_new(visited, node, parent) {
        queue.push_back(node);
        return true;
    }
    false
}

fn reconstruct_path(visited: &HashMap<NavNode, Option<NavNode>>, goal: NavNode) -> Vec<NavNode> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(Some(parent)) = visited.get(&current) {
        path.push(*parent);
        current = *parent;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const JUMP_PX: f32 = 122.1;

    fn grid(rows: &[&str]) -> TileGrid {
        TileGrid::from_rows(rows, 60.0)
    }

    #[test]
    fn jump_reach_from_pixels() {
        let g = grid(&["....."]);
        let nav = NavGraph::new(&g, JUMP_PX);
        assert_eq!(nav.max_jump_tiles, 2);
        assert_eq!(nav.max_jump_horizontal_tiles, 2);
    }

    #[test]
    fn off_grid_counts_as_solid() {
        let g = grid(&["...", "..."]);
        let nav = NavGraph::new(&g, JUMP_PX);
        assert!(nav.is_solid_cell(-1, 0));
        assert!(nav.is_solid_cell(0, 3));
        // The bottom row stands on the grid edge.
        assert!(nav.is_walkable(1, 1));
        assert!(!nav.is_walkable(0, 1));
    }

    #[test]
    fn reaches_platform_two_up_one_over() {
        let g = grid(&[".....", ".....", "...#.", ".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        let path = nav
            .find_path(NavNode::new(3, 1), NavNode::new(1, 3))
            .expect("platform within jump reach");
        assert_eq!(path.first(), Some(&NavNode::new(3, 1)));
        assert_eq!(path.last(), Some(&NavNode::new(1, 3)));
        for node in &path {
            assert!(nav.is_walkable(node.row, node.col));
        }
    }

    #[test]
    fn single_jump_two_up_one_across() {
        let g = grid(&[".....", ".....", "...#.", ".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        assert_eq!(
            nav.find_path(NavNode::new(3, 2), NavNode::new(1, 3)),
            Some(vec![NavNode::new(3, 2), NavNode::new(1, 3)])
        );
    }

    #[test]
    fn platform_beyond_jump_reach_is_unreachable() {
        let g = grid(&[".....", "...#.", ".....", ".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        assert!(nav.find_path(NavNode::new(3, 1), NavNode::new(0, 3)).is_none());
    }

    #[test]
    fn platform_beyond_horizontal_reach_is_unreachable() {
        // Pillar top at (1, 2); the ledge at (0, 5) is one row up but three
        // columns across, one more than a single-row jump covers.
        let far = grid(&[".......", ".....#.", "..#....", "......."]);
        let nav = NavGraph::new(&far, JUMP_PX);
        assert!(nav.is_walkable(1, 2));
        assert!(nav.is_walkable(0, 5));
        assert!(nav.find_path(NavNode::new(1, 2), NavNode::new(0, 5)).is_none());

        let near = grid(&[".......", "....#..", "..#....", "......."]);
        let nav = NavGraph::new(&near, JUMP_PX);
        assert_eq!(
            nav.find_path(NavNode::new(1, 2), NavNode::new(0, 4)),
            Some(vec![NavNode::new(1, 2), NavNode::new(0, 4)])
        );
    }

    #[test]
    fn ceiling_blocks_jump() {
        // Overhang above the source column closes the corridor.
        let g = grid(&[".....", ".##..", "...#.", ".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        let jumps: Vec<_> = nav
            .neighbors(NavNode::new(3, 2))
            .into_iter()
            .filter(|n| n.row < 3)
            .collect();
        assert!(jumps.is_empty(), "{jumps:?}");
    }

    #[test]
    fn drop_edge_lands_on_lower_floor() {
        let ledge = grid(&[".....", "##...", ".....", "#####"]);
        let nav = NavGraph::new(&ledge, JUMP_PX);
        let next = nav.neighbors(NavNode::new(0, 1));
        assert!(next.contains(&NavNode::new(2, 2)));
        let path = nav.find_path(NavNode::new(0, 0), NavNode::new(2, 4)).unwrap();
        assert_eq!(path.last(), Some(&NavNode::new(2, 4)));
    }

    #[test]
    fn start_equals_target() {
        let g = grid(&[".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        assert_eq!(nav.find_path(NavNode::new(0, 2), NavNode::new(0, 2)), Some(vec![NavNode::new(0, 2)]));
    }

    #[test]
    fn node_for_standing_body() {
        let g = grid(&[".....", ".....", "#####"]);
        let nav = NavGraph::new(&g, JUMP_PX);
        let standing = Bounds::new(70.0, 120.0 - 48.0 - 0.01, 34.0, 48.0);
        assert_eq!(nav.node_for_bounds(&standing, 3), Some(NavNode::new(1, 1)));

        let airborne = Bounds::new(70.0, 10.0, 34.0, 40.0);
        assert_eq!(nav.node_for_bounds(&airborne, 3), Some(NavNode::new(1, 1)));

        let wp = nav.waypoint(NavNode::new(1, 1), 0.01);
        assert_eq!(wp.x, 90.0);
        assert!((wp.y - 119.99).abs() < 1e-3);
    }
}
