use crate::components::Bounds;
use crate::tilemap::TileGrid;

/// Solid or wall at `(row, col)`. Cells outside the grid are open space.
pub fn is_solid_tile(grid: &TileGrid, row: i32, col: i32) -> bool {
    grid.is_solid(row, col)
}

pub fn is_solid_at(grid: &TileGrid, x: f32, y: f32) -> bool {
    is_solid_tile(grid, grid.row_at(y), grid.col_at(x))
}

/// True if the box `(x, y, width, height)` overlaps any solid cell.
pub fn check_collision(grid: &TileGrid, x: f32, y: f32, width: f32, height: f32) -> bool {
    let ts = grid.tile_size;
    let left = (x / ts).floor() as i32;
    let right = ((x + width - grid.segment_end_offset) / ts).floor() as i32;
    let top = ((y - grid.vertical_offset) / ts).floor() as i32;
    let bottom = ((y + height - grid.segment_end_offset - grid.vertical_offset) / ts).floor() as i32;

    if bottom < top {
        return false;
    }
    for row in top..=bottom {
        for col in left..=right {
            if is_solid_tile(grid, row, col) {
                return true;
            }
        }
    }
    false
}

pub fn collides(grid: &TileGrid, bounds: &Bounds) -> bool {
    check_collision(grid, bounds.x, bounds.y, bounds.width, bounds.height)
}

/// Left edge placed just right of the cell column the body currently starts in.
pub fn snap_left(grid: &TileGrid, x: f32, collision_offset: f32) -> f32 {
    let ts = grid.tile_size;
    (x / ts).floor() * ts + collision_offset
}

/// Right edge placed just left of the column hit when moving by `vx`.
pub fn snap_right(grid: &TileGrid, x: f32, width: f32, vx: f32, collision_offset: f32) -> f32 {
    let ts = grid.tile_size;
    let hit_col = ((x + width + vx - grid.segment_end_offset) / ts).floor();
    hit_col * ts - width - collision_offset
}

/// Feet placed just above the row hit when falling by `vy`.
pub fn snap_down(grid: &TileGrid, y: f32, height: f32, vy: f32, collision_offset: f32) -> f32 {
    let ts = grid.tile_size;
    let off = grid.vertical_offset;
    let hit_row = ((y + height + vy - grid.segment_end_offset - off) / ts).floor();
    hit_row * ts + off - height - collision_offset
}

/// Head placed just below the row hit when rising.
pub fn snap_up(grid: &TileGrid, y: f32, collision_offset: f32) -> f32 {
    let ts = grid.tile_size;
    let off = grid.vertical_offset;
    ((y - off) / ts).floor() * ts + off + collision_offset
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisResolution {
    pub position: f32,
    pub blocked: bool,
}

/// Moves `bounds.x` by `vx`, snapping to the tile boundary on contact. If the
/// snapped spot still overlaps (a body already wedged in), it stays put.
pub fn resolve_horizontal(grid: &TileGrid, bounds: &Bounds, vx: f32, collision_offset: f32) -> AxisResolution {
    let Bounds {
        x,
        y,
        width,
        height,
    } = *bounds;
    let next = x + vx;
    if !check_collision(grid, next, y, width, height) {
        return AxisResolution {
            position: next,
            blocked: false,
        };
    }
    let snapped = if vx > 0.0 {
        snap_right(grid, x, width, vx, collision_offset)
    } else if vx < 0.0 {
        snap_left(grid, x, collision_offset)
    } else {
        x
    };
    let position = if check_collision(grid, snapped, y, width, height) {
        x
    } else {
        snapped
    };
    AxisResolution {
        position,
        blocked: true,
    }
}

pub fn resolve_vertical(grid: &TileGrid, bounds: &Bounds, vy: f32, collision_offset: f32) -> AxisResolution {
    let Bounds {
        x,
        y,
        width,
        height,
    } = *bounds;
    let next = y + vy;
    if !check_collision(grid, x, next, width, height) {
        return AxisResolution {
            position: next,
            blocked: false,
        };
    }
    let snapped = if vy > 0.0 {
        snap_down(grid, y, height, vy, collision_offset)
    } else if vy < 0.0 {
        snap_up(grid, y, collision_offset)
    } else {
        y
    };
    let position = if check_collision(grid, x, snapped, width, height) {
        y
    } else {
        snapped
    };
    AxisResolution {
        position,
        blocked: true,
    }
}

/// Whether a solid cell sits within `distance` of the body's left or right side.
pub fn touching_wall(grid: &TileGrid, bounds: &Bounds, direction: f32, distance: f32) -> bool {
    let probe_x = if direction < 0.0 {
        bounds.x - distance
    } else {
        bounds.x + distance
    };
    check_collision(grid, probe_x, bounds.y, bounds.width, bounds.height)
}

pub fn update_coyote_timer(grounded: bool, coyote: &mut u32, coyote_frames: u32) {
    if grounded {
        *coyote = coyote_frames;
    } else if *coyote > 0 {
        *coyote -= 1;
    }
}

/// Consumes a buffered jump when grounded or inside the coyote window.
pub fn try_jump(grounded: bool, coyote: &mut u32, jump_buffer: &mut u32, jump_velocity: f32, vy: &mut f32) -> bool {
    let can_jump = grounded || *coyote > 0;
    if can_jump && *jump_buffer > 0 {
        *vy = jump_velocity;
        *coyote = 0;
        *jump_buffer = 0;
        return true;
    }
    false
}
