//! Flowchart blocks.

use crate::port::{PortName, PortSet};
use crate::wire::WireId;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for blocks within an editing session.
pub type BlockId = Uuid;

/// Label of the start block.
pub const START_LABEL: &str = "START";

/// Size of the start block.
pub const START_SIZE: Size = Size::new(80.0, 40.0);

/// Hit radius of the start block's bottom port.
const START_PORT_RADIUS: f64 = 7.0;

/// Block kind, serialized as the document's `type` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// The single mandatory entry point.
    #[serde(rename = "StartBlock")]
    Start,
    /// An ordinary logic block dropped from the palette.
    #[serde(rename = "DraggableBlock")]
    Logic,
}

impl BlockKind {
    pub fn type_tag(self) -> &'static str {
        match self {
            BlockKind::Start => "StartBlock",
            BlockKind::Logic => "DraggableBlock",
        }
    }
}

/// A positioned, labeled node of the flowchart.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) id: BlockId,
    pub(crate) kind: BlockKind,
    pub text: String,
    pub(crate) position: Point,
    pub(crate) size: Size,
    pub(crate) ports: PortSet,
    pub(crate) in_wires: Vec<WireId>,
    pub(crate) out_wires: Vec<WireId>,
}

impl Block {
    /// Create a logic block with a fresh id.
    pub fn new(text: impl Into<String>, position: Point, size: Size) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: BlockKind::Logic,
            text: text.into(),
            position,
            size,
            ports: PortSet::new(size),
            in_wires: Vec::new(),
            out_wires: Vec::new(),
        }
    }

    /// Create the start block. Only its bottom port is usable.
    pub fn start(position: Point) -> Self {
        let mut ports = PortSet::single(START_SIZE, PortName::Bottom);
        ports.set_anchor(
            PortName::Bottom,
            Point::new(START_SIZE.width / 2.0, START_SIZE.height + 3.0),
            START_PORT_RADIUS,
        );
        Self {
            id: Uuid::new_v4(),
            kind: BlockKind::Start,
            text: START_LABEL.to_string(),
            position,
            size: START_SIZE,
            ports,
            in_wires: Vec::new(),
            out_wires: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn is_start(&self) -> bool {
        self.kind == BlockKind::Start
    }

    /// Top-left corner in canvas coordinates.
    pub fn position(&self) -> Point {
        self.position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    pub fn in_wires(&self) -> &[WireId] {
        &self.in_wires
    }

    pub fn out_wires(&self) -> &[WireId] {
        &self.out_wires
    }

    pub fn has_wires(&self) -> bool {
        !self.in_wires.is_empty() || !self.out_wires.is_empty()
    }

    /// Scene position of a port's anchor.
    pub fn port_position(&self, name: PortName) -> Point {
        self.position + self.ports.port(name).anchor.to_vec2()
    }

    /// Active port whose hit target contains the scene point.
    pub fn port_at(&self, point: Point) -> Option<PortName> {
        self.ports.hit_test(point - self.position.to_vec2())
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds().contains(point)
    }

    /// Forget a wire in both incident lists.
    pub(crate) fn detach_wire(&mut self, wire: WireId) {
        self.in_wires.retain(|w| *w != wire);
        self.out_wires.retain(|w| *w != wire);
    }
}
