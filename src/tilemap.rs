use crate::components::TileKind;
use serde::{Deserialize, Serialize};

/// Level grid. Row 0 is the top row; world `y` maps to rows after subtracting
/// `vertical_offset`, the unused strip at the top of the canvas.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub rows: usize,
    pub cols: usize,
    pub tiles: Vec<TileKind>,
    pub tile_size: f32,
    pub vertical_offset: f32,
    /// Shaved off the right and bottom edges of a box before it is mapped to
    /// cells, so a box that ends exactly on a tile boundary does not touch the
    /// next cell.
    pub segment_end_offset: f32,
}

impl TileGrid {
    pub fn new(rows: usize, cols: usize, tile_size: f32, vertical_offset: f32) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![TileKind::Empty; rows * cols],
            tile_size,
            vertical_offset,
            segment_end_offset: 0.01,
        }
    }

    pub fn with_segment_end_offset(mut self, offset: f32) -> Self {
        self.segment_end_offset = offset;
        self
    }

    pub fn in_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    /// Out-of-range cells read as `Empty`.
    pub fn get(&self, row: i32, col: i32) -> TileKind {
        if !self.in_bounds(row, col) {
            return TileKind::Empty;
        }
        self.tiles[row as usize * self.cols + col as usize]
    }

    pub fn set(&mut self, row: i32, col: i32, tile: TileKind) {
        if self.in_bounds(row, col) {
            self.tiles[row as usize * self.cols + col as usize] = tile;
        }
    }

    pub fn fill_row(&mut self, row: i32, col_start: i32, col_end: i32, tile: TileKind) {
        for col in col_start..=col_end {
            self.set(row, col, tile);
        }
    }

    pub fn is_solid(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_solid()
    }

    pub fn width(&self) -> f32 {
        self.cols as f32 * self.tile_size
    }

    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_size + self.vertical_offset
    }

    pub fn row_at(&self, y: f32) -> i32 {
        ((y - self.vertical_offset) / self.tile_size).floor() as i32
    }

    pub fn col_at(&self, x: f32) -> i32 {
        (x / self.tile_size).floor() as i32
    }

    /// World `y` of the top edge of `row`.
    pub fn row_top(&self, row: i32) -> f32 {
        self.vertical_offset + row as f32 * self.tile_size
    }

    pub fn col_left(&self, col: i32) -> f32 {
        col as f32 * self.tile_size
    }

    /// Builds a grid from ASCII rows: `#` solid, `W` wall, anything else empty.
    pub fn from_rows(rows: &[&str], tile_size: f32) -> Self {
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut grid = Self::new(rows.len(), cols, tile_size, 0.0);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let tile = match ch {
                    '#' => TileKind::Solid,
                    'W' => TileKind::Wall,
                    _ => TileKind::Empty,
                };
                grid.set(row as i32, col as i32, tile);
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_empty() {
        let grid = TileGrid::from_rows(&["###", "###"], 10.0);
        assert!(grid.is_solid(0, 0));
        assert!(!grid.is_solid(-1, 0));
        assert!(!grid.is_solid(0, 3));
        assert!(!grid.is_solid(2, 1));
    }

    #[test]
    fn world_to_cell_respects_vertical_offset() {
        let grid = TileGrid::new(4, 4, 60.0, 30.0);
        assert_eq!(grid.row_at(29.0), -1);
        assert_eq!(grid.row_at(30.0), 0);
        assert_eq!(grid.row_at(90.0), 1);
        assert_eq!(grid.col_at(59.9), 0);
        assert_eq!(grid.row_top(2), 150.0);
    }

    #[test]
    fn ascii_builder_reads_walls() {
        let grid = TileGrid::from_rows(&["W..W", "####"], 60.0);
        assert_eq!(grid.get(0, 0), TileKind::Wall);
        assert_eq!(grid.get(0, 1), TileKind::Empty);
        assert_eq!(grid.get(1, 2), TileKind::Solid);
        assert_eq!(grid.cols, 4);
    }
}
