//! Wire routing geometry.
//!
//! Wires are drawn as orthogonal three-leg paths between two port anchors,
//! with rounded joins at each bend. Everything here is a pure function of
//! its inputs so a wire's path can always be rebuilt from its endpoints.

use kurbo::{BezPath, Point, Rect, Vec2};

/// Radius of the rounded join inserted at each bend.
pub const CORNER_RADIUS: f64 = 15.0;

/// Perpendicular offset below which two points are treated as aligned.
pub const ALIGN_TOLERANCE: f64 = 10.0;

/// Fraction of the primary span at which the intermediate leg is placed.
pub const BEND_FRACTION: f64 = 0.6;

/// Axis along which a routed wire leaves its start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BendAxis {
    /// Horizontal first, vertical middle leg.
    Horizontal,
    /// Vertical first, horizontal middle leg.
    Vertical,
}

/// Pick the bend axis for a route, or `None` when a straight line suffices.
pub fn bend_axis(start: Point, end: Point) -> Option<BendAxis> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.abs() < ALIGN_TOLERANCE || dy.abs() < ALIGN_TOLERANCE {
        return None;
    }
    if dx.abs() > dy.abs() {
        Some(BendAxis::Horizontal)
    } else {
        Some(BendAxis::Vertical)
    }
}

/// Corner points of the orthogonal route between `start` and `end`.
///
/// Returns two points for a straight wire and four points (start, two bends,
/// end) for an S/Z/L shaped wire.
pub fn route_skeleton(start: Point, end: Point) -> Vec<Point> {
    match bend_axis(start, end) {
        None => vec![start, end],
        Some(BendAxis::Horizontal) => {
            let mid_x = start.x + (end.x - start.x) * BEND_FRACTION;
            vec![start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
        }
        Some(BendAxis::Vertical) => {
            let mid_y = start.y + (end.y - start.y) * BEND_FRACTION;
            vec![start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
        }
    }
}

/// Route a wire from `start` to `end` with rounded corners.
pub fn route(start: Point, end: Point) -> BezPath {
    rounded_path(&route_skeleton(start, end), CORNER_RADIUS)
}

/// Build a path through `points`, rounding every interior vertex.
///
/// A vertex is rounded only when both incident legs are longer than twice
/// the radius; otherwise it is emitted as a sharp corner.
pub fn rounded_path(points: &[Point], radius: f64) -> BezPath {
    let mut path = BezPath::new();
    let Some((&first, rest)) = points.split_first() else {
        return path;
    };
    path.move_to(first);
    if rest.is_empty() {
        return path;
    }

    for i in 1..points.len() - 1 {
        let prev = points[i - 1];
        let corner = points[i];
        let next = points[i + 1];
        let leg_in = corner - prev;
        let leg_out = next - corner;

        if leg_in.hypot() > radius * 2.0 && leg_out.hypot() > radius * 2.0 {
            let dir_in = leg_in / leg_in.hypot();
            let dir_out = leg_out / leg_out.hypot();
            path.line_to(corner - dir_in * radius);
            path.quad_to(corner, corner + dir_out * radius);
        } else {
            path.line_to(corner);
        }
    }

    path.line_to(points[points.len() - 1]);
    path
}

/// Build a path through `points` with sharp corners.
pub fn polyline_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((&first, rest)) = points.split_first() {
        path.move_to(first);
        for p in rest {
            path.line_to(*p);
        }
    }
    path
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = a + seg * t;
    (point - proj).hypot()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| point_to_segment_dist(point, w[0], w[1]))
        .fold(f64::INFINITY, f64::min)
}

/// Manhattan length of a vector.
pub fn manhattan(v: Vec2) -> f64 {
    v.x.abs() + v.y.abs()
}

/// Strict rectangle intersection: rectangles that only share an edge do not overlap.
pub fn rects_overlap(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    fn quad_count(path: &BezPath) -> usize {
        path.elements()
            .iter()
            .filter(|el| matches!(el, PathEl::QuadTo(..)))
            .count()
    }

    #[test]
    fn test_aligned_points_route_straight() {
        let path = route(Point::new(0.0, 0.0), Point::new(200.0, 5.0));
        assert_eq!(
            path.elements(),
            &[
                PathEl::MoveTo(Point::new(0.0, 0.0)),
                PathEl::LineTo(Point::new(200.0, 5.0)),
            ]
        );

        let vertical = route_skeleton(Point::new(10.0, 0.0), Point::new(19.0, 300.0));
        assert_eq!(vertical.len(), 2);
    }

    #[test]
    fn test_coincident_points() {
        let p = Point::new(42.0, 42.0);
        let skeleton = route_skeleton(p, p);
        assert_eq!(skeleton, vec![p, p]);
    }

    #[test]
    fn test_horizontal_first_bends_at_sixty_percent() {
        let skeleton = route_skeleton(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        assert_eq!(
            skeleton,
            vec![
                Point::new(0.0, 0.0),
                Point::new(120.0, 0.0),
                Point::new(120.0, 100.0),
                Point::new(200.0, 100.0),
            ]
        );
    }

    #[test]
    fn test_vertical_first_when_taller_than_wide() {
        let skeleton = route_skeleton(Point::new(0.0, 0.0), Point::new(-50.0, 300.0));
        assert_eq!(bend_axis(Point::new(0.0, 0.0), Point::new(-50.0, 300.0)), Some(BendAxis::Vertical));
        assert_eq!(skeleton[1], Point::new(0.0, 180.0));
        assert_eq!(skeleton[2], Point::new(-50.0, 180.0));
    }

    #[test]
    fn test_rounded_corners() {
        let path = route(Point::new(0.0, 0.0), Point::new(200.0, 100.0));
        assert_eq!(quad_count(&path), 2);
        assert_eq!(
            path.elements(),
            &[
                PathEl::MoveTo(Point::new(0.0, 0.0)),
                PathEl::LineTo(Point::new(105.0, 0.0)),
                PathEl::QuadTo(Point::new(120.0, 0.0), Point::new(120.0, 15.0)),
                PathEl::LineTo(Point::new(120.0, 85.0)),
                PathEl::QuadTo(Point::new(120.0, 100.0), Point::new(135.0, 100.0)),
                PathEl::LineTo(Point::new(200.0, 100.0)),
            ]
        );
    }

    #[test]
    fn test_short_legs_degrade_to_sharp_corners() {
        // Legs of 24, 20 and 16 units are all shorter than 2 * radius.
        let path = route(Point::new(0.0, 0.0), Point::new(40.0, 20.0));
        assert_eq!(quad_count(&path), 0);
        assert_eq!(path.elements().len(), 4);
    }

    #[test]
    fn test_short_final_leg_keeps_first_corner_round() {
        // Legs: 42 (horizontal), 50 (vertical), 28 (horizontal).
        let path = route(Point::new(0.0, 0.0), Point::new(70.0, 50.0));
        assert_eq!(quad_count(&path), 1);
        assert_eq!(path.elements().last(), Some(&PathEl::LineTo(Point::new(70.0, 50.0))));
    }

    #[test]
    fn test_route_is_deterministic() {
        let a = Point::new(13.0, 77.0);
        let b = Point::new(410.0, -35.5);
        assert_eq!(route(a, b), route(a, b));
    }

    #[test]
    fn test_polyline_distance() {
        let pts = [Point::new(0.0, 0.0), Point::new(100.0, 0.0), Point::new(100.0, 100.0)];
        assert!((point_to_polyline_dist(Point::new(50.0, 3.0), &pts) - 3.0).abs() < 1e-9);
        assert!((point_to_polyline_dist(Point::new(104.0, 50.0), &pts) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_touching_rects_do_not_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 40.0);
        let b = Rect::new(100.0, 0.0, 200.0, 40.0);
        assert!(!rects_overlap(a, b));
        assert!(rects_overlap(a, Rect::new(99.0, 39.0, 150.0, 80.0)));
    }
}
