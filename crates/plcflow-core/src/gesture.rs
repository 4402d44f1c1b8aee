//! Pointer interaction state for the canvas.
//!
//! Only one interaction is live at a time: idle, drawing a wire, or dragging
//! the selected blocks.

use crate::block::BlockId;
use crate::port::PortName;
use crate::wire::{AutoRouted, Endpoint, WireId, WireShape};
use kurbo::{BezPath, Point};

/// The in-progress wire shown while a connection gesture is active.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalWire {
    from: Endpoint,
    previous_output: Option<PortName>,
    anchor: Point,
    geometry: AutoRouted,
}

impl ProvisionalWire {
    /// Start a wire at `anchor`, remembering the output the source block had
    /// before the gesture so a cancel can put it back.
    pub(crate) fn new(from: Endpoint, previous_output: Option<PortName>, anchor: Point) -> Self {
        Self {
            from,
            previous_output,
            anchor,
            geometry: AutoRouted::new(anchor, anchor),
        }
    }

    /// Re-route the free end to `pointer`.
    pub(crate) fn track(&mut self, pointer: Point) {
        self.geometry.recompute(self.anchor, pointer);
    }

    pub fn from(&self) -> Endpoint {
        self.from
    }

    pub fn anchor(&self) -> Point {
        self.anchor
    }

    pub fn free_end(&self) -> Point {
        self.geometry.endpoints().1
    }

    pub fn path(&self) -> BezPath {
        self.geometry.path()
    }

    pub(crate) fn previous_output(&self) -> Option<PortName> {
        self.previous_output
    }
}

/// Current pointer interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Interaction {
    #[default]
    Idle,
    /// A provisional wire follows the pointer.
    Routing(ProvisionalWire),
    /// Selected blocks follow the pointer.
    Dragging { last: Point },
}

impl Interaction {
    pub fn is_idle(&self) -> bool {
        matches!(self, Interaction::Idle)
    }

    pub fn provisional(&self) -> Option<&ProvisionalWire> {
        match self {
            Interaction::Routing(wire) => Some(wire),
            _ => None,
        }
    }
}

/// What a pointer or key event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Nothing happened.
    Ignored,
    /// A wired port was clicked and the wire removed.
    Disconnected(WireId),
    /// A provisional wire now starts at this port.
    Started(Endpoint),
    /// The provisional wire followed the pointer, or a release missed every
    /// eligible port and the wire stays live.
    StillRouting,
    /// The provisional wire was placed.
    Connected(WireId),
    /// The provisional wire was discarded.
    Cancelled,
    /// A block was selected and a drag began.
    BlockPressed(BlockId),
    /// A wire was selected.
    WireSelected(WireId),
    /// Selected blocks moved.
    Dragged,
    /// A drag ended.
    Released,
    /// Selection was cleared by a press on empty canvas.
    Deselected,
}

/// Pick the wire target among candidate ports.
///
/// An exact hit wins. Otherwise the nearest candidate within `tolerance`
/// (manhattan distance) is chosen; a zero tolerance disables the fallback.
pub(crate) fn pick_target(
    exact: Option<Endpoint>,
    candidates: impl IntoIterator<Item = (Endpoint, Point)>,
    pointer: Point,
    tolerance: f64,
) -> Option<Endpoint> {
    if exact.is_some() {
        return exact;
    }
    if tolerance <= 0.0 {
        return None;
    }
    candidates
        .into_iter()
        .map(|(endpoint, at)| (endpoint, crate::geometry::manhattan(pointer - at)))
        .filter(|(_, dist)| *dist <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(endpoint, _)| endpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_provisional_tracks_pointer() {
        let from = Endpoint::new(Uuid::new_v4(), PortName::Right);
        let mut wire = ProvisionalWire::new(from, None, Point::new(100.0, 100.0));
        assert_eq!(wire.free_end(), Point::new(100.0, 100.0));
        wire.track(Point::new(300.0, 200.0));
        assert_eq!(wire.free_end(), Point::new(300.0, 200.0));
        assert_eq!(wire.path(), crate::geometry::route(Point::new(100.0, 100.0), Point::new(300.0, 200.0)));
    }

    #[test]
    fn test_exact_hit_beats_nearer_candidate() {
        let a = Endpoint::new(Uuid::new_v4(), PortName::Left);
        let b = Endpoint::new(Uuid::new_v4(), PortName::Top);
        let picked = pick_target(Some(a), [(b, Point::new(0.0, 0.0))], Point::new(0.0, 0.0), 25.0);
        assert_eq!(picked, Some(a));
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let a = Endpoint::new(Uuid::new_v4(), PortName::Left);
        let b = Endpoint::new(Uuid::new_v4(), PortName::Top);
        let candidates = [(a, Point::new(20.0, 0.0)), (b, Point::new(5.0, 5.0))];
        assert_eq!(pick_target(None, candidates, Point::ZERO, 25.0), Some(b));
        assert_eq!(pick_target(None, candidates, Point::new(100.0, 0.0), 25.0), None);
    }

    #[test]
    fn test_zero_tolerance_disables_fallback() {
        let a = Endpoint::new(Uuid::new_v4(), PortName::Left);
        assert_eq!(pick_target(None, [(a, Point::new(1.0, 0.0))], Point::ZERO, 0.0), None);
    }
}
