//! Project document format and the canvas serializer.
//!
//! A project file is a JSON object with `blocks`, `wires` and `canvas_data`
//! plus optional `tags_configuration` and `metadata`. Block identifiers in a
//! document are plain integers assigned at export time; they only tie wire
//! records to block records within one file.

use crate::block::{Block, BlockId, BlockKind};
use crate::canvas::Canvas;
use crate::grid::MAX_GRID_CELLS;
use crate::port::PortName;
use crate::wire::{AutoRouted, Endpoint, Segmented, WireGeometry, WireKind, WireShape};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Version written to the document and its metadata.
pub const DOCUMENT_VERSION: &str = "1.0";

/// File extension of project files.
pub const PROJECT_EXTENSION: &str = "plc";

const REQUIRED_KEYS: [&str; 3] = ["blocks", "wires", "canvas_data"];

/// Errors that reject a whole document.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Invalid project JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Project data must be a JSON object")]
    NotAnObject,
    #[error("Missing required keys in project data: {0:?}")]
    MissingKeys(Vec<&'static str>),
    #[error("Project '{key}' must be {expected}")]
    WrongType { key: &'static str, expected: &'static str },
}

/// A record that could not be rebuilt. The rest of the document still loads.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportWarning {
    #[error("block record {index} is invalid: {reason}")]
    InvalidBlock { index: usize, reason: String },
    #[error("block id {0} appears more than once")]
    DuplicateBlock(u64),
    #[error("block {0} is a second start block")]
    ExtraStart(u64),
    #[error("wire record {index} is invalid: {reason}")]
    InvalidWire { index: usize, reason: String },
    #[error("wire record {index} references unknown block {id}")]
    UnresolvedBlock { index: usize, id: u64 },
    #[error("wire record {index} uses an inactive port")]
    InactivePort { index: usize },
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub blocks: usize,
    pub wires: usize,
    pub warnings: Vec<ImportWarning>,
}

impl ImportReport {
    pub fn skipped(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, warning: ImportWarning) {
        log::warn!("Skipping entity on import: {warning}");
        self.warnings.push(warning);
    }
}

/// Grid extent recorded with a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cols: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_size: Option<f64>,
}

/// Descriptive header written alongside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub version: String,
    pub created_by: String,
    pub file_format: String,
    pub description: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION.to_string(),
            created_by: "ESP32 PLC GUI".to_string(),
            file_format: "PLC Project File".to_string(),
            description: "Complete ESP32 PLC project with flowchart logic and tag configuration".to_string(),
        }
    }
}

/// One block as stored in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: u64,
    #[serde(rename = "type", default = "default_block_kind")]
    pub kind: BlockKind,
    #[serde(default)]
    pub text: String,
    pub position: [f64; 2],
    #[serde(default)]
    pub input_ports: Vec<PortName>,
    #[serde(default)]
    pub output_port: Option<PortName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 2]>,
}

fn default_block_kind() -> BlockKind {
    BlockKind::Logic
}

/// One wire as stored in a document.
///
/// Auto-routed wires carry `start_point`/`end_point`; segmented wires carry
/// every point in `points`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(rename = "type", default = "default_wire_kind")]
    pub kind: WireKind,
    pub from_block: u64,
    pub from_port: PortName,
    pub to_block: u64,
    pub to_port: PortName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_point: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_point: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f64; 2]>>,
}

fn default_wire_kind() -> WireKind {
    WireKind::AutoRouted
}

impl WireRecord {
    fn geometry(&self) -> WireGeometry {
        let point = |p: [f64; 2]| Point::new(p[0], p[1]);
        match self.kind {
            WireKind::AutoRouted => {
                let start = self.start_point.map(point).unwrap_or(Point::ZERO);
                let end = self.end_point.map(point).unwrap_or(Point::ZERO);
                WireGeometry::AutoRouted(AutoRouted::new(start, end))
            }
            WireKind::Segmented => {
                let points = match &self.points {
                    Some(points) => points.iter().copied().map(point).collect(),
                    None => vec![Point::ZERO, Point::new(100.0, 100.0)],
                };
                WireGeometry::Segmented(Segmented::new(points))
            }
        }
    }
}

/// A complete project file.
///
/// Block and wire records stay as raw JSON until import so that one bad
/// record does not reject the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    #[serde(default = "default_version")]
    pub version: String,
    pub blocks: Vec<Value>,
    pub wires: Vec<Value>,
    pub canvas_data: CanvasData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_configuration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl ProjectDocument {
    /// Parse and structurally validate a document.
    pub fn from_json(json: &str) -> Result<Self, ProjectError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validate the top-level shape, then decode.
    pub fn from_value(value: Value) -> Result<Self, ProjectError> {
        let object = value.as_object().ok_or(ProjectError::NotAnObject)?;
        let missing: Vec<&'static str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !object.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            return Err(ProjectError::MissingKeys(missing));
        }
        for key in ["blocks", "wires"] {
            if !object[key].is_array() {
                return Err(ProjectError::WrongType { key, expected: "a list" });
            }
        }
        if !object["canvas_data"].is_object() {
            return Err(ProjectError::WrongType {
                key: "canvas_data",
                expected: "an object",
            });
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String, ProjectError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Serialize the canvas.
///
/// Blocks are numbered from 1 in stacking order; wires follow creation order.
pub fn export(canvas: &Canvas) -> ProjectDocument {
    let mut ids: HashMap<BlockId, u64> = HashMap::new();
    let mut blocks = Vec::with_capacity(canvas.block_count());
    for block in canvas.blocks() {
        let id = ids.len() as u64 + 1;
        ids.insert(block.id(), id);
        let record = BlockRecord {
            id,
            kind: block.kind(),
            text: block.text.clone(),
            position: [block.position().x, block.position().y],
            input_ports: block.ports().input_ports().iter().copied().collect(),
            output_port: block.ports().output_port(),
            size: Some([block.size().width, block.size().height]),
        };
        blocks.extend(to_value(&record));
    }

    let mut wires = Vec::with_capacity(canvas.wire_count());
    for wire in canvas.wires() {
        let (Some(&from_block), Some(&to_block)) = (ids.get(&wire.source().block), ids.get(&wire.target().block))
        else {
            continue;
        };
        let geometry = wire.geometry();
        let (start, end) = geometry.endpoints();
        let mut record = WireRecord {
            kind: geometry.kind(),
            from_block,
            from_port: wire.source().port,
            to_block,
            to_port: wire.target().port,
            start_point: None,
            end_point: None,
            points: None,
        };
        match geometry.kind() {
            WireKind::AutoRouted => {
                record.start_point = Some([start.x, start.y]);
                record.end_point = Some([end.x, end.y]);
            }
            WireKind::Segmented => {
                record.points = Some(geometry.points().iter().map(|p| [p.x, p.y]).collect());
            }
        }
        wires.extend(to_value(&record));
    }

    let grid = canvas.grid();
    ProjectDocument {
        version: DOCUMENT_VERSION.to_string(),
        blocks,
        wires,
        canvas_data: CanvasData {
            cols: Some(grid.cols()),
            rows: Some(grid.rows()),
            cell_size: Some(grid.cell_size()),
        },
        tags_configuration: None,
        metadata: Some(Metadata::default()),
    }
}

fn to_value<T: Serialize>(record: &T) -> Option<Value> {
    match serde_json::to_value(record) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Failed to serialize record: {e}");
            None
        }
    }
}

/// Replace the canvas contents with a document.
///
/// Port roles come from the block records. Wires are then attached as
/// recorded; only a wire that names a missing block or an inactive port is
/// dropped.
pub fn import(canvas: &mut Canvas, document: &ProjectDocument) -> ImportReport {
    let mut report = ImportReport::default();

    let config = canvas.config().clone();
    let cols = document.canvas_data.cols.unwrap_or(config.min_cols).clamp(config.min_cols, MAX_GRID_CELLS);
    let rows = document.canvas_data.rows.unwrap_or(config.min_rows).clamp(config.min_rows, MAX_GRID_CELLS);
    canvas.begin_import(cols, rows);
    let max_extent = canvas.grid().max_extent();

    let mut ids: HashMap<u64, BlockId> = HashMap::new();
    let mut start_seen = false;

    for (index, value) in document.blocks.iter().enumerate() {
        let record: BlockRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                report.warn(ImportWarning::InvalidBlock {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if ids.contains_key(&record.id) {
            report.warn(ImportWarning::DuplicateBlock(record.id));
            continue;
        }
        if let Err(reason) = check_geometry(&record, max_extent) {
            report.warn(ImportWarning::InvalidBlock { index, reason });
            continue;
        }

        let position = Point::new(record.position[0], record.position[1]);
        let id = match record.kind {
            BlockKind::Start if start_seen => {
                report.warn(ImportWarning::ExtraStart(record.id));
                continue;
            }
            BlockKind::Start => {
                start_seen = true;
                canvas.import_start(position)
            }
            BlockKind::Logic => {
                let size = match record.size {
                    Some([w, h]) if w > 0.0 && h > 0.0 => Size::new(w, h),
                    _ => canvas.size_of(&record.text),
                };
                let mut block = Block::new(record.text.clone(), position, size);
                block.ports.set_hit_radius(config.port_hit_radius);
                canvas.import_block(block)
            }
        };
        ids.insert(record.id, id);
        canvas.seed_roles(id, &record.input_ports, record.output_port);
        report.blocks += 1;
    }

    for (index, value) in document.wires.iter().enumerate() {
        let record: WireRecord = match serde_json::from_value(value.clone()) {
            Ok(record) => record,
            Err(e) => {
                report.warn(ImportWarning::InvalidWire {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let Some(&from) = ids.get(&record.from_block) else {
            report.warn(ImportWarning::UnresolvedBlock {
                index,
                id: record.from_block,
            });
            continue;
        };
        let Some(&to) = ids.get(&record.to_block) else {
            report.warn(ImportWarning::UnresolvedBlock {
                index,
                id: record.to_block,
            });
            continue;
        };
        let restored = canvas.restore_wire(
            Endpoint::new(from, record.from_port),
            Endpoint::new(to, record.to_port),
            record.geometry(),
        );
        match restored {
            Some(_) => report.wires += 1,
            None => report.warn(ImportWarning::InactivePort { index }),
        }
    }

    canvas.finish_import();

    log::info!(
        "Imported {} blocks and {} wires ({} skipped)",
        report.blocks,
        report.wires,
        report.skipped()
    );
    report
}

fn check_geometry(record: &BlockRecord, max_extent: f64) -> Result<(), String> {
    let [x, y] = record.position;
    if !x.is_finite() || !y.is_finite() || x.abs() > max_extent || y.abs() > max_extent {
        return Err(format!("position [{x}, {y}] is outside the grid"));
    }
    if let Some([w, h]) = record.size {
        if !w.is_finite() || !h.is_finite() || w > max_extent || h > max_extent {
            return Err(format!("size [{w}, {h}] is out of range"));
        }
    }
    Ok(())
}

/// Validate raw JSON and import it. On a structural error the canvas is left untouched.
pub fn import_json(canvas: &mut Canvas, json: &str) -> Result<ImportReport, ProjectError> {
    let document = ProjectDocument::from_json(json)?;
    Ok(import(canvas, &document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::PortRole;
    use kurbo::Vec2;
    use serde_json::json;

    fn sample() -> Canvas {
        let mut canvas = Canvas::default();
        let a = canvas.drop_block("Timer/Clock", Point::new(175.0, 120.0)).unwrap();
        let b = canvas.drop_block("PID", Point::new(450.0, 120.0)).unwrap();
        let c = canvas.drop_block("Counter", Point::new(450.0, 320.0)).unwrap();
        canvas
            .connect(Endpoint::new(a, PortName::Right), Endpoint::new(b, PortName::Left))
            .unwrap();
        canvas
            .connect(Endpoint::new(b, PortName::Bottom), Endpoint::new(c, PortName::Top))
            .unwrap();
        canvas
    }

    fn roles(canvas: &Canvas) -> Vec<(String, Vec<PortName>, Option<PortName>)> {
        canvas
            .blocks()
            .map(|b| {
                (
                    b.text.clone(),
                    b.ports().input_ports().iter().copied().collect(),
                    b.ports().output_port(),
                )
            })
            .collect()
    }

    #[test]
    fn test_export_shape() {
        let doc = export(&sample());
        assert_eq!(doc.blocks.len(), 4);
        assert_eq!(doc.wires.len(), 2);

        let start = &doc.blocks[0];
        assert_eq!(start["type"], "StartBlock");
        assert_eq!(start["text"], "START");
        assert_eq!(start["output_port"], Value::Null);

        let timer = &doc.blocks[1];
        assert_eq!(timer["type"], "DraggableBlock");
        assert_eq!(timer["position"], json!([100.0, 100.0]));
        assert_eq!(timer["size"], json!([150.0, 40.0]));
        assert_eq!(timer["output_port"], "right");

        let wire = &doc.wires[0];
        assert_eq!(wire["type"], "AutoRoutedWire");
        assert_eq!(wire["from_block"], timer["id"]);
        assert_eq!(wire["to_port"], "left");
        assert_eq!(wire["start_point"], json!([250.0, 120.0]));

        let text = doc.to_json().unwrap();
        assert!(text.find("\"blocks\"").unwrap() < text.find("\"wires\"").unwrap());
    }

    #[test]
    fn test_round_trip_after_clear() {
        let mut canvas = sample();
        let before = export(&canvas);
        let before_roles = roles(&canvas);

        canvas.clear();
        let report = import(&mut canvas, &before);
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(report.blocks, 4);
        assert_eq!(report.wires, 2);
        assert_eq!(canvas.block_count(), 4);
        assert_eq!(canvas.wire_count(), 2);
        assert_eq!(roles(&canvas), before_roles);
        assert_eq!(export(&canvas), before);
    }

    #[test]
    fn test_round_trip_through_json_text() {
        let canvas = sample();
        let text = export(&canvas).to_json().unwrap();
        let mut fresh = Canvas::default();
        import_json(&mut fresh, &text).unwrap();
        assert_eq!(export(&fresh), export(&canvas));
    }

    #[test]
    fn test_round_trip_keeps_output_without_wire() {
        let mut canvas = sample();
        let b = canvas.blocks().find(|b| b.text == "PID").unwrap().id();
        let c = canvas.blocks().find(|b| b.text == "Counter").unwrap().id();
        let out = canvas.block(b).unwrap().out_wires()[0];
        canvas.delete_wire(out);
        assert_eq!(canvas.block(b).unwrap().ports().output_port(), Some(PortName::Bottom));
        assert!(!canvas.block(c).unwrap().has_wires());

        let doc = export(&canvas);
        let mut fresh = Canvas::default();
        import(&mut fresh, &doc);
        assert_eq!(roles(&fresh), roles(&canvas));
    }

    #[test]
    fn test_round_trip_keeps_wire_on_former_output() {
        let mut canvas = Canvas::default();
        let a = canvas.drop_block("Timer/Clock", Point::new(175.0, 220.0)).unwrap();
        let x = canvas.drop_block("PID", Point::new(450.0, 220.0)).unwrap();
        let z = canvas.drop_block("Counter", Point::new(175.0, 420.0)).unwrap();
        let y = canvas.drop_block("Scale", Point::new(450.0, 620.0)).unwrap();
        let end = |block, port| Endpoint::new(block, port);

        canvas.connect(end(a, PortName::Right), end(x, PortName::Left)).unwrap();
        let down = canvas.connect(end(a, PortName::Bottom), end(z, PortName::Top)).unwrap();
        assert_eq!(canvas.block(a).unwrap().ports().output_port(), Some(PortName::Bottom));
        assert!(canvas.delete_wire(down));
        assert_eq!(canvas.block(a).unwrap().ports().output_port(), Some(PortName::Bottom));
        canvas.connect(end(y, PortName::Right), end(a, PortName::Right)).unwrap();
        assert_eq!(canvas.wire_count(), 2);

        let doc = export(&canvas);
        let before_roles = roles(&canvas);
        canvas.clear();
        let report = import(&mut canvas, &doc);
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert_eq!(report.wires, 2);
        assert_eq!(canvas.wire_count(), 2);
        assert_eq!(roles(&canvas), before_roles);
        assert_eq!(export(&canvas), doc);
    }

    #[test]
    fn test_out_of_range_geometry_is_skipped() {
        let doc = json!({
            "blocks": [
                {"id": 1, "type": "DraggableBlock", "text": "PID", "position": [1e300, 100.0]},
                {"id": 2, "type": "DraggableBlock", "text": "PID", "position": [100.0, -1e300]},
                {"id": 3, "type": "DraggableBlock", "text": "PID", "position": [100.0, 100.0], "size": [1e300, 40.0]},
                {"id": 4, "type": "DraggableBlock", "text": "PID", "position": [300.0, 100.0]}
            ],
            "wires": [],
            "canvas_data": {"cols": u32::MAX, "rows": u32::MAX}
        });
        let mut canvas = Canvas::default();
        let report = import_json(&mut canvas, &doc.to_string()).unwrap();

        assert_eq!(report.blocks, 2);
        assert_eq!(report.skipped(), 3);
        for (warning, index) in report.warnings.iter().zip(0..) {
            assert!(matches!(warning, ImportWarning::InvalidBlock { index: i, .. } if *i == index));
        }
        assert_eq!(canvas.grid().cols(), MAX_GRID_CELLS);
        assert_eq!(canvas.grid().rows(), MAX_GRID_CELLS);
        assert!(canvas.grid().scene_rect().x1.is_finite());
    }

    #[test]
    fn test_import_never_shrinks_grid() {
        let mut canvas = Canvas::default();
        let wide = json!({"blocks": [], "wires": [], "canvas_data": {"cols": 120, "rows": 130}});
        import_json(&mut canvas, &wide.to_string()).unwrap();
        assert_eq!(canvas.grid().cols(), 120);

        let narrow = json!({"blocks": [], "wires": [], "canvas_data": {"cols": 78, "rows": 130}});
        import_json(&mut canvas, &narrow.to_string()).unwrap();
        assert_eq!(canvas.grid().cols(), 120);
    }

    #[test]
    fn test_structural_errors_leave_canvas_untouched() {
        let mut canvas = sample();
        let before = export(&canvas);

        let missing = import_json(&mut canvas, r#"{"blocks": [], "wires": []}"#);
        assert!(matches!(missing, Err(ProjectError::MissingKeys(keys)) if keys == vec!["canvas_data"]));

        let wrong = import_json(&mut canvas, r#"{"blocks": {}, "wires": [], "canvas_data": {}}"#);
        assert!(matches!(wrong, Err(ProjectError::WrongType { key: "blocks", .. })));

        assert!(matches!(import_json(&mut canvas, "[]"), Err(ProjectError::NotAnObject)));
        assert!(matches!(import_json(&mut canvas, "{"), Err(ProjectError::Json(_))));

        assert_eq!(export(&canvas), before);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let doc = json!({
            "blocks": [
                {"id": 1, "type": "DraggableBlock", "text": "PID", "position": [100.0, 100.0]},
                {"id": 2, "type": "DraggableBlock", "text": "Scale", "position": [400.0, 100.0], "size": [100.0, 40.0]},
                {"id": 3, "text": "broken"},
                {"id": 2, "type": "DraggableBlock", "text": "dup", "position": [700.0, 100.0]},
                {"id": 4, "type": "StartBlock", "text": "START", "position": [50.0, 50.0]}
            ],
            "wires": [
                {"type": "AutoRoutedWire", "from_block": 1, "from_port": "right", "to_block": 2, "to_port": "left"},
                {"type": "AutoRoutedWire", "from_block": 1, "from_port": "right", "to_block": 99, "to_port": "left"},
                {"type": "AutoRoutedWire", "from_block": 2, "from_port": "right", "to_block": 4, "to_port": "top"}
            ],
            "canvas_data": {}
        });
        let mut canvas = Canvas::default();
        let report = import_json(&mut canvas, &doc.to_string()).unwrap();

        assert_eq!(report.blocks, 3);
        assert_eq!(report.wires, 1);
        assert_eq!(report.skipped(), 4);
        assert!(matches!(report.warnings[0], ImportWarning::InvalidBlock { index: 2, .. }));
        assert_eq!(report.warnings[1], ImportWarning::DuplicateBlock(2));
        assert_eq!(report.warnings[2], ImportWarning::UnresolvedBlock { index: 1, id: 99 });
        assert_eq!(report.warnings[3], ImportWarning::InactivePort { index: 2 });

        // Block without a recorded size takes its catalog size.
        let pid = canvas.blocks().find(|b| b.text == "PID").unwrap();
        assert_eq!(pid.size(), Size::new(100.0, 40.0));
        // The start record maps onto the live start block.
        assert_eq!(canvas.block_count(), 3);
        assert!(canvas.start_block().is_some());
    }

    #[test]
    fn test_start_record_maps_onto_live_start() {
        let doc = json!({
            "blocks": [
                {"id": 10, "type": "StartBlock", "text": "START", "position": [200.0, 200.0], "output_port": "bottom"},
                {"id": 11, "type": "StartBlock", "text": "START", "position": [600.0, 600.0]},
                {"id": 12, "type": "DraggableBlock", "text": "PID", "position": [200.0, 400.0], "size": [100.0, 40.0]}
            ],
            "wires": [
                {"type": "AutoRoutedWire", "from_block": 10, "from_port": "bottom", "to_block": 12, "to_port": "top"}
            ],
            "canvas_data": {"cols": 78, "rows": 130}
        });
        let mut canvas = Canvas::default();
        let report = import_json(&mut canvas, &doc.to_string()).unwrap();

        assert_eq!(report.warnings, vec![ImportWarning::ExtraStart(11)]);
        assert_eq!(canvas.block_count(), 2);
        let start = canvas.start_block().unwrap();
        assert_eq!(start.position(), Point::new(200.0, 200.0));
        assert_eq!(start.ports().role(PortName::Bottom), PortRole::Output);
        assert_eq!(start.out_wires().len(), 1);
    }

    #[test]
    fn test_segmented_wire_follows_ports() {
        let doc = json!({
            "blocks": [
                {"id": 1, "type": "DraggableBlock", "text": "A", "position": [100.0, 100.0], "size": [100.0, 40.0]},
                {"id": 2, "type": "DraggableBlock", "text": "B", "position": [400.0, 300.0], "size": [100.0, 40.0]}
            ],
            "wires": [
                {"type": "WireSegment", "from_block": 1, "from_port": "right", "to_block": 2, "to_port": "left",
                 "points": [[0.0, 0.0], [300.0, 120.0], [300.0, 320.0], [1.0, 1.0]]}
            ],
            "canvas_data": {}
        });
        let mut canvas = Canvas::default();
        import_json(&mut canvas, &doc.to_string()).unwrap();

        let wire = canvas.wires().next().unwrap();
        assert_eq!(wire.geometry().kind(), WireKind::Segmented);
        assert_eq!(
            wire.geometry().points(),
            vec![
                Point::new(200.0, 120.0),
                Point::new(300.0, 120.0),
                Point::new(300.0, 320.0),
                Point::new(400.0, 320.0),
            ]
        );

        let a = canvas.blocks().find(|b| b.text == "A").unwrap().id();
        canvas.move_block(a, Vec2::new(0.0, 50.0));
        let wire = canvas.wires().next().unwrap();
        assert_eq!(wire.geometry().points()[0], Point::new(200.0, 170.0));
        assert_eq!(wire.geometry().points()[1], Point::new(300.0, 120.0));

        let exported = export(&canvas);
        assert_eq!(exported.wires[0]["type"], "WireSegment");
        assert_eq!(exported.wires[0]["points"][1], json!([300.0, 120.0]));
    }

    #[test]
    fn test_canvas_data_sets_grid() {
        let doc = json!({"blocks": [], "wires": [], "canvas_data": {"cols": 120, "rows": 40}});
        let mut canvas = Canvas::default();
        import_json(&mut canvas, &doc.to_string()).unwrap();
        assert_eq!(canvas.grid().cols(), 120);
        // Never smaller than the minimum extent.
        assert_eq!(canvas.grid().rows(), 130);
    }

    #[test]
    fn test_import_emits_loaded_only() {
        use crate::events::CanvasEvent;
        use std::cell::RefCell;
        use std::rc::Rc;

        let doc = export(&sample());
        let mut canvas = Canvas::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        canvas.subscribe(move |e| sink.borrow_mut().push(*e));
        import(&mut canvas, &doc);
        assert_eq!(*seen.borrow(), vec![CanvasEvent::Loaded]);
    }
}
