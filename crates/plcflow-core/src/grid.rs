//! The expanding ruled grid behind the flowchart.
//!
//! Column 0 and row 0 hold the labels; cell A1 starts at `(cell, cell)`.
//! The grid grows whenever a block reaches past its drawn extent and never
//! shrinks during a session.

use crate::config::CanvasConfig;
use kurbo::{Point, Rect, Size};

/// Spreadsheet-style label for a 1-based column index (1 → "A", 27 → "AA").
///
/// Returns an empty string for column 0, the label gutter.
pub fn column_label(index: u32) -> String {
    let mut label = Vec::new();
    let mut col = index;
    while col > 0 {
        let rem = (col - 1) % 26;
        label.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}

/// Label for a 1-based row index.
pub fn row_label(index: u32) -> String {
    index.to_string()
}

/// Upper bound on either grid dimension.
pub const MAX_GRID_CELLS: u32 = 100_000;

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    cell_size: f64,
    cols: u32,
    rows: u32,
    grow_cols: u32,
    grow_rows: u32,
}

impl Grid {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            cell_size: config.cell_size,
            cols: config.min_cols,
            rows: config.min_rows,
            grow_cols: config.grow_cols,
            grow_rows: config.grow_rows,
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Grow to at least `cols` x `rows`, as when loading a project.
    pub(crate) fn expand_to(&mut self, cols: u32, rows: u32) {
        self.cols = self.cols.max(cols.min(MAX_GRID_CELLS));
        self.rows = self.rows.max(rows.min(MAX_GRID_CELLS));
    }

    /// Scene rectangle covered by the grid, label gutter included.
    pub fn scene_rect(&self) -> Rect {
        Rect::new(
            0.0,
            0.0,
            f64::from(self.cols.saturating_add(1)) * self.cell_size,
            f64::from(self.rows.saturating_add(1)) * self.cell_size,
        )
    }

    /// Largest scene coordinate a block edge may reach.
    pub fn max_extent(&self) -> f64 {
        f64::from(MAX_GRID_CELLS) * self.cell_size
    }

    /// Area blocks may occupy: everything right of and below the labels.
    pub fn placement_area(&self) -> Rect {
        let scene = self.scene_rect();
        Rect::new(self.cell_size, self.cell_size, scene.x1, scene.y1)
    }

    /// Clamp a block's top-left corner so the block lies in the placement area.
    pub fn clamp(&self, position: Point, size: Size) -> Point {
        let area = self.placement_area();
        let max_x = (area.x1 - size.width).max(area.x0);
        let max_y = (area.y1 - size.height).max(area.y0);
        Point::new(position.x.clamp(area.x0, max_x), position.y.clamp(area.y0, max_y))
    }

    /// Whether `rect` lies entirely within the placement area.
    pub fn contains(&self, rect: Rect) -> bool {
        let area = self.placement_area();
        rect.x0 >= area.x0 && rect.y0 >= area.y0 && rect.x1 <= area.x1 && rect.y1 <= area.y1
    }

    /// Grow so that `far_corner` (the largest block edge) fits with margin.
    ///
    /// Returns true when the grid grew.
    pub fn ensure_extent(&mut self, far_corner: Point) -> bool {
        let required_cols = self.cells_for(far_corner.x);
        let required_rows = self.cells_for(far_corner.y);
        let mut grew = false;
        if required_cols > self.cols {
            self.cols = required_cols.saturating_add(self.grow_cols).min(MAX_GRID_CELLS);
            grew = true;
        }
        if required_rows > self.rows {
            self.rows = required_rows.saturating_add(self.grow_rows).min(MAX_GRID_CELLS);
            grew = true;
        }
        if grew {
            log::debug!("grid expanded to {}x{}", self.cols, self.rows);
        }
        grew
    }

    fn cells_for(&self, coord: f64) -> u32 {
        let cells = (coord / self.cell_size).floor();
        if cells.is_nan() {
            return 1;
        }
        (cells.clamp(0.0, f64::from(MAX_GRID_CELLS - 1)) as u32) + 1
    }

    /// Name of the cell containing `point`, e.g. "A1". `None` in the label gutter.
    pub fn cell_name(&self, point: Point) -> Option<String> {
        let col = (point.x / self.cell_size).floor();
        let row = (point.y / self.cell_size).floor();
        if col < 1.0 || row < 1.0 {
            return None;
        }
        Some(format!("{}{}", column_label(col as u32), row_label(row as u32)))
    }

    /// Top-left corner of a 1-based cell.
    pub fn cell_origin(&self, col: u32, row: u32) -> Point {
        Point::new(f64::from(col) * self.cell_size, f64::from(row) * self.cell_size)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}
