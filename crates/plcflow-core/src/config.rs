//! Canvas tunables.

use kurbo::Vec2;
use serde::{Deserialize, Serialize};

/// Settings that shape placement, hit testing and grid growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Side length of a grid cell.
    pub cell_size: f64,
    /// Minimum number of grid columns.
    pub min_cols: u32,
    /// Minimum number of grid rows.
    pub min_rows: u32,
    /// Columns added beyond the required extent when the grid grows.
    pub grow_cols: u32,
    /// Rows added beyond the required extent when the grid grows.
    pub grow_rows: u32,
    /// Exact hit radius of a port.
    pub port_hit_radius: f64,
    /// Manhattan distance used to find a wire target when no port is hit
    /// exactly. Zero disables the fallback.
    pub port_snap_tolerance: f64,
    /// Offset applied to pasted blocks.
    pub paste_offset: Vec2,
    /// Horizontal gap left when a block is nudged off another.
    pub placement_gap: f64,
    /// Upper bound on displacement steps while settling a dragged block.
    pub max_resolve_steps: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            cell_size: 50.0,
            min_cols: 78,
            min_rows: 130,
            grow_cols: 10,
            grow_rows: 50,
            port_hit_radius: crate::port::PORT_HIT_RADIUS,
            port_snap_tolerance: 25.0,
            paste_offset: Vec2::new(50.0, 50.0),
            placement_gap: 10.0,
            max_resolve_steps: 64,
        }
    }
}

impl CanvasConfig {
    /// Config with the proximity fallback turned off.
    pub fn exact_ports_only() -> Self {
        Self {
            port_snap_tolerance: 0.0,
            ..Self::default()
        }
    }
}
