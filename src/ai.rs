use bevy::prelude::Vec2;

use crate::components::{Bounds, Horizontal};
use crate::config::Constants;
use crate::pathfinding::{NavGraph, NavNode};
use crate::physics::KinematicBody;
use crate::physics_core::is_solid_at;
use crate::tilemap::TileGrid;

/// Tunables for following a planned path, in pixels and milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FollowParams {
    pub replan_interval_ms: f64,
    pub waypoint_tolerance_x: f32,
    pub waypoint_band_y: f32,
    pub node_search_rows: i32,
    pub steering_deadzone: f32,
    pub collision_offset: f32,
    pub jump_cooldown_ms: f64,
    /// Horizontal speed below which a body counts as settled for a straight-up jump.
    pub settle_speed: f32,
}

impl FollowParams {
    pub fn walker(constants: &Constants) -> Self {
        let pf = &constants.pathfinding;
        let walker = &constants.enemies.walker;
        Self {
            replan_interval_ms: pf.replan_interval_ms,
            waypoint_tolerance_x: pf.waypoint_tolerance_x,
            waypoint_band_y: pf.waypoint_band_y * constants.tile_size,
            node_search_rows: pf.node_search_rows,
            steering_deadzone: pf.steering_deadzone,
            collision_offset: walker.collision_offset,
            jump_cooldown_ms: walker.jump_cooldown_ms,
            settle_speed: walker.move_acceleration,
        }
    }
}

/// What a ground enemy wants to do this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Steering {
    pub horizontal: Horizontal,
    pub jump: bool,
}

/// Per-enemy path state. Owned by the enemy that planned it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathFollower {
    pub nodes: Vec<NavNode>,
    pub waypoints: Vec<Vec2>,
    pub index: usize,
    pub target_node: Option<NavNode>,
    pub last_plan_ms: Option<f64>,
    pub last_jump_ms: Option<f64>,
}

impl PathFollower {
    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.index).copied()
    }

    pub fn needs_replan(&self, target_node: NavNode, now_ms: f64, interval_ms: f64) -> bool {
        self.waypoints.is_empty()
            || self.index >= self.waypoints.len()
            || self.target_node != Some(target_node)
            || self
                .last_plan_ms
                .map_or(true, |last| now_ms - last > interval_ms)
    }

    pub fn replan(&mut self, nav: &NavGraph, start: NavNode, target: NavNode, now_ms: f64, collision_offset: f32) {
        self.nodes = nav.find_path(start, target).unwrap_or_default();
        self.waypoints = self
            .nodes
            .iter()
            .map(|&node| nav.waypoint(node, collision_offset))
            .collect();
        // The first node is the cell we already stand in. Keep it as the
        // takeoff point when the first edge is a jump.
        let first_edge_is_jump = self.nodes.len() > 1 && self.nodes[1].row < self.nodes[0].row;
        self.index = if self.nodes.len() > 1 && !first_edge_is_jump { 1 } else { 0 };
        self.target_node = Some(target);
        self.last_plan_ms = Some(now_ms);
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.waypoints.clear();
        self.index = 0;
        self.target_node = None;
    }

    fn advance_past_reached(&mut self, feet: Vec2, params: &FollowParams) {
        while let Some(wp) = self.current_waypoint() {
            let reached = (wp.x - feet.x).abs() <= params.waypoint_tolerance_x
                && (wp.y - feet.y).abs() <= params.waypoint_band_y;
            if !reached {
                break;
            }
            self.index += 1;
        }
    }

    /// Plans when needed, then picks a direction and decides whether to jump.
    /// Replanning waits for the ground so a jump in flight keeps its waypoint.
    pub fn steer(
        &mut self,
        body: &KinematicBody,
        target: &Bounds,
        nav: &NavGraph,
        grid: &TileGrid,
        params: &FollowParams,
        now_ms: f64,
    ) -> Steering {
        let bounds = body.bounds();
        let start = nav.node_for_bounds(&bounds, params.node_search_rows);
        let goal = nav.node_for_bounds(target, params.node_search_rows);
        match (start, goal) {
            (Some(start), Some(goal)) => {
                if body.on_ground && self.needs_replan(goal, now_ms, params.replan_interval_ms) {
                    self.replan(nav, start, goal, now_ms, params.collision_offset);
                }
            }
            _ => self.clear(),
        }

        let feet = Vec2::new(bounds.center().x, bounds.bottom());
        self.advance_past_reached(feet, params);

        let waypoint = self.current_waypoint();
        let mut horizontal = match waypoint {
            Some(wp) => direction_toward(feet.x, wp.x, params.waypoint_tolerance_x),
            None => direction_toward(bounds.center().x, target.center().x, params.steering_deadzone),
        };

        let cooled = self
            .last_jump_ms
            .map_or(true, |last| now_ms - last >= params.jump_cooldown_ms);
        let wants_jump = match waypoint.and_then(|wp| overhang_ahead(grid, &bounds, horizontal, wp)) {
            Some(support_y) => {
                // Climbing onto a ledge right overhead: settle under open sky,
                // go straight up, and only steer across once above the ledge.
                let edge_x = match horizontal {
                    Horizontal::Right => bounds.right() + params.steering_deadzone,
                    _ => bounds.x - params.steering_deadzone,
                };
                let under_ledge = body.on_ground && is_solid_at(grid, edge_x, support_y);
                horizontal = if under_ledge {
                    opposite(horizontal)
                } else {
                    Horizontal::None
                };
                !under_ledge
                    && body.vx.abs() <= params.settle_speed
                    && !is_solid_at(grid, bounds.center().x, bounds.y - grid.tile_size * 0.5)
            }
            None => should_attempt_jump(grid, &bounds, horizontal, waypoint, target, params.collision_offset),
        };

        let jump = body.on_ground && cooled && wants_jump;
        if jump {
            self.last_jump_ms = Some(now_ms);
        }
        Steering { horizontal, jump }
    }
}

fn opposite(direction: Horizontal) -> Horizontal {
    match direction {
        Horizontal::Left => Horizontal::Right,
        Horizontal::Right => Horizontal::Left,
        Horizontal::None => Horizontal::None,
    }
}

/// World `y` inside the tile supporting a higher waypoint, if that tile sits
/// within half a tile in front of the body.
fn overhang_ahead(grid: &TileGrid, body: &Bounds, direction: Horizontal, waypoint: Vec2) -> Option<f32> {
    let ts = grid.tile_size;
    if direction == Horizontal::None || waypoint.y >= body.bottom() - ts * 0.5 {
        return None;
    }
    let probe_x = match direction {
        Horizontal::Right => body.right() + ts * 0.5,
        _ => body.x - ts * 0.5,
    };
    let support_y = waypoint.y + ts * 0.5;
    is_solid_at(grid, probe_x, support_y).then_some(support_y)
}

/// Proportional steering with a deadzone around the goal.
pub fn direction_toward(from_x: f32, to_x: f32, deadzone: f32) -> Horizontal {
    if to_x > from_x + deadzone {
        Horizontal::Right
    } else if to_x < from_x - deadzone {
        Horizontal::Left
    } else {
        Horizontal::None
    }
}

/// Jump triggers for a ground enemy: a wall or gap in front, or a goal above.
/// With no horizontal intent it only jumps for a goal above with clear headroom.
pub fn should_attempt_jump(
    grid: &TileGrid,
    body: &Bounds,
    direction: Horizontal,
    waypoint: Option<Vec2>,
    target: &Bounds,
    collision_offset: f32,
) -> bool {
    let ts = grid.tile_size;
    let feet_y = body.bottom();
    let above = |y: f32| y < feet_y - ts * 0.5;
    let goal_higher = match waypoint {
        Some(wp) => above(wp.y),
        None => above(target.bottom()),
    };

    if direction == Horizontal::None {
        let headroom_clear = !is_solid_at(grid, body.center().x, body.y - ts * 0.5);
        return goal_higher && headroom_clear;
    }

    let front_x = match direction {
        Horizontal::Right => body.right() + collision_offset,
        _ => body.x - collision_offset,
    };
    let mid_y = body.y + body.height / 2.0;
    let foot_y = feet_y + collision_offset;
    let gap_check_y = foot_y + ts * 0.25;

    let obstacle_ahead = is_solid_at(grid, front_x, mid_y) || is_solid_at(grid, front_x, foot_y - 1.0);
    // A planned drop walks off the edge instead of jumping it.
    let planned_drop = waypoint.is_some_and(|wp| wp.y > feet_y + ts * 0.5);
    let gap_ahead = !is_solid_at(grid, front_x, gap_check_y) && !planned_drop;

    obstacle_ahead || gap_ahead || goal_higher
}
