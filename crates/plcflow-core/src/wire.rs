//! Wires: directed edges from a block's output port to another block's input port.
//!
//! A wire's geometry is always derived from the scene positions of its two
//! ports. Both wire kinds implement [`WireShape`], whose single required
//! operation rebuilds the path from fresh endpoints.

use crate::block::BlockId;
use crate::geometry::{self, point_to_polyline_dist, polyline_path};
use crate::port::PortName;
use kurbo::{BezPath, Point};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for wires within an editing session.
pub type WireId = Uuid;

/// Distance from a wire's path within which a click selects it.
pub const WIRE_HIT_TOLERANCE: f64 = 5.0;

/// One end of a wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub block: BlockId,
    pub port: PortName,
}

impl Endpoint {
    pub fn new(block: BlockId, port: PortName) -> Self {
        Self { block, port }
    }
}

/// Common interface of wire geometries.
pub trait WireShape {
    /// Rebuild the geometry for new endpoint positions and return the path.
    fn recompute(&mut self, start: Point, end: Point) -> BezPath;

    /// The current path.
    fn path(&self) -> BezPath;

    /// First and last point of the geometry.
    fn endpoints(&self) -> (Point, Point);

    /// Corner points used for hit testing and persistence.
    fn points(&self) -> Vec<Point>;

    /// Distance from `point` to the wire.
    fn distance_to(&self, point: Point) -> f64 {
        point_to_polyline_dist(point, &self.points())
    }
}

/// Orthogonal wire with rounded bends, routed from its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoRouted {
    start: Point,
    end: Point,
    path: BezPath,
}

impl AutoRouted {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            path: geometry::route(start, end),
        }
    }
}

impl WireShape for AutoRouted {
    fn recompute(&mut self, start: Point, end: Point) -> BezPath {
        *self = Self::new(start, end);
        self.path.clone()
    }

    fn path(&self) -> BezPath {
        self.path.clone()
    }

    fn endpoints(&self) -> (Point, Point) {
        (self.start, self.end)
    }

    fn points(&self) -> Vec<Point> {
        geometry::route_skeleton(self.start, self.end)
    }
}

/// Legacy multi-bend wire. Interior bends are user-placed and survive
/// endpoint moves; only the first and last points follow the ports.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmented {
    points: Vec<Point>,
}

impl Segmented {
    /// Build from a recorded point list. Fewer than two points is padded.
    pub fn new(points: Vec<Point>) -> Self {
        let points = match points.len() {
            0 => vec![Point::ZERO, Point::ZERO],
            1 => vec![points[0], points[0]],
            _ => points,
        };
        Self { points }
    }

    /// Insert a bend just before the end point.
    pub fn add_bend(&mut self, point: Point) {
        let at = self.points.len() - 1;
        self.points.insert(at, point);
    }

    pub fn bends(&self) -> &[Point] {
        &self.points[1..self.points.len() - 1]
    }
}

impl WireShape for Segmented {
    fn recompute(&mut self, start: Point, end: Point) -> BezPath {
        let last = self.points.len() - 1;
        self.points[0] = start;
        self.points[last] = end;
        self.path()
    }

    fn path(&self) -> BezPath {
        polyline_path(&self.points)
    }

    fn endpoints(&self) -> (Point, Point) {
        (self.points[0], self.points[self.points.len() - 1])
    }

    fn points(&self) -> Vec<Point> {
        self.points.clone()
    }
}

/// Wire geometry, serialized as the document's wire `type` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum WireGeometry {
    AutoRouted(AutoRouted),
    Segmented(Segmented),
}

/// Wire kind tag as it appears in project documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireKind {
    #[serde(rename = "AutoRoutedWire")]
    AutoRouted,
    #[serde(rename = "WireSegment")]
    Segmented,
}

impl WireGeometry {
    pub fn kind(&self) -> WireKind {
        match self {
            WireGeometry::AutoRouted(_) => WireKind::AutoRouted,
            WireGeometry::Segmented(_) => WireKind::Segmented,
        }
    }

    fn shape(&self) -> &dyn WireShape {
        match self {
            WireGeometry::AutoRouted(w) => w,
            WireGeometry::Segmented(w) => w,
        }
    }

    fn shape_mut(&mut self) -> &mut dyn WireShape {
        match self {
            WireGeometry::AutoRouted(w) => w,
            WireGeometry::Segmented(w) => w,
        }
    }
}

impl WireShape for WireGeometry {
    fn recompute(&mut self, start: Point, end: Point) -> BezPath {
        self.shape_mut().recompute(start, end)
    }

    fn path(&self) -> BezPath {
        self.shape().path()
    }

    fn endpoints(&self) -> (Point, Point) {
        self.shape().endpoints()
    }

    fn points(&self) -> Vec<Point> {
        self.shape().points()
    }
}

/// A placed wire between two blocks.
#[derive(Debug, Clone)]
pub struct Wire {
    pub(crate) id: WireId,
    pub(crate) source: Endpoint,
    pub(crate) target: Endpoint,
    pub(crate) geometry: WireGeometry,
    pub selected: bool,
}

impl Wire {
    /// Auto-routed wire between two scene points.
    pub fn new(source: Endpoint, target: Endpoint, start: Point, end: Point) -> Self {
        Self::with_geometry(source, target, WireGeometry::AutoRouted(AutoRouted::new(start, end)))
    }

    pub fn with_geometry(source: Endpoint, target: Endpoint, geometry: WireGeometry) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            geometry,
            selected: false,
        }
    }

    pub fn id(&self) -> WireId {
        self.id
    }

    pub fn source(&self) -> Endpoint {
        self.source
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }

    pub fn geometry(&self) -> &WireGeometry {
        &self.geometry
    }

    pub fn touches(&self, block: BlockId) -> bool {
        self.source.block == block || self.target.block == block
    }

    /// Append a bend to a segmented wire. Returns false for auto-routed wires.
    pub fn add_bend(&mut self, point: Point) -> bool {
        match &mut self.geometry {
            WireGeometry::Segmented(seg) => {
                seg.add_bend(point);
                true
            }
            WireGeometry::AutoRouted(_) => false,
        }
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.geometry.distance_to(point) <= WIRE_HIT_TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    fn endpoints() -> (Endpoint, Endpoint) {
        (
            Endpoint::new(Uuid::new_v4(), PortName::Right),
            Endpoint::new(Uuid::new_v4(), PortName::Left),
        )
    }

    #[test]
    fn test_auto_routed_recompute_matches_route() {
        let mut geom = AutoRouted::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let a = Point::new(200.0, 70.0);
        let b = Point::new(400.0, 170.0);
        let path = geom.recompute(a, b);
        assert_eq!(path, geometry::route(a, b));
        assert_eq!(geom.endpoints(), (a, b));
    }

    #[test]
    fn test_segmented_keeps_bends() {
        let mut seg = Segmented::new(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 0.0),
            Point::new(50.0, 80.0),
            Point::new(100.0, 80.0),
        ]);
        seg.recompute(Point::new(10.0, 5.0), Point::new(120.0, 90.0));
        assert_eq!(seg.bends(), &[Point::new(50.0, 0.0), Point::new(50.0, 80.0)]);
        assert_eq!(seg.endpoints(), (Point::new(10.0, 5.0), Point::new(120.0, 90.0)));
        assert_eq!(seg.path().elements().len(), 4);
        assert!(matches!(seg.path().elements()[1], PathEl::LineTo(_)));
    }

    #[test]
    fn test_segmented_pads_short_point_lists() {
        let seg = Segmented::new(vec![Point::new(3.0, 4.0)]);
        assert_eq!(seg.points().len(), 2);
        assert!(seg.bends().is_empty());
    }

    #[test]
    fn test_add_bend_only_on_segmented() {
        let (s, t) = endpoints();
        let mut auto = Wire::new(s, t, Point::ZERO, Point::new(100.0, 100.0));
        assert!(!auto.add_bend(Point::new(50.0, 50.0)));

        let seg = Segmented::new(vec![Point::ZERO, Point::new(100.0, 0.0)]);
        let mut wire = Wire::with_geometry(s, t, WireGeometry::Segmented(seg));
        assert!(wire.add_bend(Point::new(50.0, 20.0)));
        assert_eq!(wire.geometry().points().len(), 3);
        assert_eq!(wire.geometry().kind(), WireKind::Segmented);
    }

    #[test]
    fn test_hit_test_along_route() {
        let (s, t) = endpoints();
        let wire = Wire::new(s, t, Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        assert!(wire.hit_test(Point::new(60.0, 3.0)));
        assert!(wire.hit_test(Point::new(122.0, 50.0)));
        assert!(!wire.hit_test(Point::new(60.0, 50.0)));
    }

    #[test]
    fn test_touches() {
        let (s, t) = endpoints();
        let wire = Wire::new(s, t, Point::ZERO, Point::ZERO);
        assert!(wire.touches(s.block));
        assert!(wire.touches(t.block));
        assert!(!wire.touches(Uuid::new_v4()));
    }
}
