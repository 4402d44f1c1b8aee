//! Directional ports and the port role state machine.
//!
//! Every block carries four ports (top, left, right, bottom). A port starts
//! out unassigned and takes the input or output role when a wire is attached.
//! A block has at most one output port; any other active port may be an input.

use kurbo::{Point, Size};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Radius of a port's circular hit target, in canvas units.
pub const PORT_HIT_RADIUS: f64 = 6.0;

/// The four fixed port positions of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortName {
    Top,
    Left,
    Right,
    Bottom,
}

impl PortName {
    /// All port names in declaration order.
    pub const ALL: [PortName; 4] = [PortName::Top, PortName::Left, PortName::Right, PortName::Bottom];

    pub fn as_str(self) -> &'static str {
        match self {
            PortName::Top => "top",
            PortName::Left => "left",
            PortName::Right => "right",
            PortName::Bottom => "bottom",
        }
    }

    fn index(self) -> usize {
        match self {
            PortName::Top => 0,
            PortName::Left => 1,
            PortName::Right => 2,
            PortName::Bottom => 3,
        }
    }

    /// Anchor of this port in the local frame of a block of the given size.
    pub fn anchor(self, size: Size) -> Point {
        match self {
            PortName::Top => Point::new(size.width / 2.0, 0.0),
            PortName::Left => Point::new(0.0, size.height / 2.0),
            PortName::Right => Point::new(size.width, size.height / 2.0),
            PortName::Bottom => Point::new(size.width / 2.0, size.height),
        }
    }
}

impl fmt::Display for PortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top" => Ok(PortName::Top),
            "left" => Ok(PortName::Left),
            "right" => Ok(PortName::Right),
            "bottom" => Ok(PortName::Bottom),
            other => Err(format!("unknown port '{other}'")),
        }
    }
}

/// Role a port currently plays for its block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortRole {
    #[default]
    Unassigned,
    Input,
    Output,
}

/// Visual state of a port, derived from its role and whether a wire uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortVisual {
    /// No wire attached; the port may be reassigned.
    #[default]
    Available,
    /// Input port with at least one wire.
    ConnectedInput,
    /// Output port with at least one wire.
    ConnectedOutput,
}

impl PortVisual {
    /// Fill color for this state.
    pub fn color(self) -> Color {
        match self {
            PortVisual::Available => Color::from_rgba8(0, 0, 139, 255),
            PortVisual::ConnectedInput => Color::from_rgba8(255, 165, 0, 255),
            PortVisual::ConnectedOutput => Color::from_rgba8(0, 128, 0, 255),
        }
    }

    /// Fill color while the pointer hovers the port.
    ///
    /// Only available ports highlight; connected ports keep their color.
    pub fn hover_color(self) -> Color {
        match self {
            PortVisual::Available => Color::from_rgba8(173, 216, 230, 255),
            other => other.color(),
        }
    }
}

/// A single attachment point on a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Port {
    pub name: PortName,
    /// Center of the port in the block's local frame.
    pub anchor: Point,
    pub hit_radius: f64,
    /// Inactive ports are hidden and refuse every role.
    pub active: bool,
    pub visual: PortVisual,
}

impl Port {
    fn new(name: PortName, anchor: Point, hit_radius: f64, active: bool) -> Self {
        Self {
            name,
            anchor,
            hit_radius,
            active,
            visual: PortVisual::Available,
        }
    }
}

/// The four ports of a block plus their role assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSet {
    ports: [Port; 4],
    input_ports: BTreeSet<PortName>,
    output_port: Option<PortName>,
}

impl PortSet {
    /// All four ports active, laid out on the edges of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            ports: PortName::ALL.map(|name| Port::new(name, name.anchor(size), PORT_HIT_RADIUS, true)),
            input_ports: BTreeSet::new(),
            output_port: None,
        }
    }

    /// Only `active` is usable; the other three ports are hidden.
    pub fn single(size: Size, active: PortName) -> Self {
        let mut set = Self::new(size);
        for port in &mut set.ports {
            port.active = port.name == active;
        }
        set
    }

    /// Move a port's anchor and hit radius (used by the start block).
    pub fn set_anchor(&mut self, name: PortName, anchor: Point, hit_radius: f64) {
        let port = &mut self.ports[name.index()];
        port.anchor = anchor;
        port.hit_radius = hit_radius;
    }

    pub fn set_hit_radius(&mut self, hit_radius: f64) {
        for port in &mut self.ports {
            port.hit_radius = hit_radius;
        }
    }

    pub fn port(&self, name: PortName) -> &Port {
        &self.ports[name.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn is_active(&self, name: PortName) -> bool {
        self.ports[name.index()].active
    }

    pub fn input_ports(&self) -> &BTreeSet<PortName> {
        &self.input_ports
    }

    pub fn output_port(&self) -> Option<PortName> {
        self.output_port
    }

    pub fn role(&self, name: PortName) -> PortRole {
        if self.output_port == Some(name) {
            PortRole::Output
        } else if self.input_ports.contains(&name) {
            PortRole::Input
        } else {
            PortRole::Unassigned
        }
    }

    /// Make `name` the block's output port.
    ///
    /// Refused when the port is inactive or already an input. Any previous
    /// output assignment is replaced.
    pub fn assign_output(&mut self, name: PortName) -> bool {
        if !self.is_active(name) || self.input_ports.contains(&name) {
            log::debug!("refusing output role for port {name}");
            return false;
        }
        self.output_port = Some(name);
        true
    }

    /// Add `name` to the block's input ports.
    ///
    /// Refused when the port is inactive or is the current output port.
    pub fn assign_input(&mut self, name: PortName) -> bool {
        if !self.accepts_input(name) {
            log::debug!("refusing input role for port {name}");
            return false;
        }
        self.input_ports.insert(name);
        true
    }

    /// Whether [`PortSet::assign_input`] would succeed for `name`.
    pub fn accepts_input(&self, name: PortName) -> bool {
        self.is_active(name) && self.output_port != Some(name)
    }

    /// Drop the input role from a single port.
    pub fn release_input(&mut self, name: PortName) {
        self.input_ports.remove(&name);
    }

    /// Put back an output assignment captured before a cancelled gesture.
    pub(crate) fn restore_output(&mut self, previous: Option<PortName>) {
        self.output_port = previous.filter(|p| !self.input_ports.contains(p));
    }

    /// Clear roles once their wires are gone.
    ///
    /// Inputs are cleared when the block has no incoming wires and the
    /// output when it has no outgoing wires.
    pub fn reset(&mut self, has_in_wires: bool, has_out_wires: bool) {
        if !has_in_wires {
            self.input_ports.clear();
        }
        if !has_out_wires {
            self.output_port = None;
        }
    }

    /// Active ports that carry neither role.
    pub fn available_ports(&self) -> Vec<PortName> {
        self.ports
            .iter()
            .filter(|p| p.active && self.role(p.name) == PortRole::Unassigned)
            .map(|p| p.name)
            .collect()
    }

    /// Recompute every port's visual state from the ports actually carrying wires.
    pub fn refresh_visuals(&mut self, wired_inputs: &BTreeSet<PortName>, wired_outputs: &BTreeSet<PortName>) {
        for i in 0..self.ports.len() {
            let name = self.ports[i].name;
            let visual = match self.role(name) {
                PortRole::Input if wired_inputs.contains(&name) => PortVisual::ConnectedInput,
                PortRole::Output if wired_outputs.contains(&name) => PortVisual::ConnectedOutput,
                _ => PortVisual::Available,
            };
            self.ports[i].visual = visual;
        }
    }

    pub fn visual(&self, name: PortName) -> PortVisual {
        self.ports[name.index()].visual
    }

    /// Active port whose hit target contains `local` (a point in the block's frame).
    pub fn hit_test(&self, local: Point) -> Option<PortName> {
        self.ports
            .iter()
            .filter(|p| p.active)
            .find(|p| (local - p.anchor).hypot() <= p.hit_radius)
            .map(|p| p.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> PortSet {
        PortSet::new(Size::new(100.0, 40.0))
    }

    #[test]
    fn test_new_ports_are_unassigned() {
        let set = ports();
        for name in PortName::ALL {
            assert_eq!(set.role(name), PortRole::Unassigned);
            assert_eq!(set.visual(name), PortVisual::Available);
        }
        assert_eq!(set.available_ports().len(), 4);
    }

    #[test]
    fn test_anchor_layout() {
        let set = ports();
        assert_eq!(set.port(PortName::Top).anchor, Point::new(50.0, 0.0));
        assert_eq!(set.port(PortName::Left).anchor, Point::new(0.0, 20.0));
        assert_eq!(set.port(PortName::Right).anchor, Point::new(100.0, 20.0));
        assert_eq!(set.port(PortName::Bottom).anchor, Point::new(50.0, 40.0));
    }

    #[test]
    fn test_single_output_last_writer_wins() {
        let mut set = ports();
        assert!(set.assign_output(PortName::Right));
        assert!(set.assign_output(PortName::Bottom));
        assert_eq!(set.output_port(), Some(PortName::Bottom));
        assert_eq!(set.role(PortName::Right), PortRole::Unassigned);
    }

    #[test]
    fn test_input_cannot_become_output() {
        let mut set = ports();
        assert!(set.assign_input(PortName::Left));
        let before = set.clone();
        assert!(!set.assign_output(PortName::Left));
        assert_eq!(set, before);
    }

    #[test]
    fn test_output_cannot_become_input() {
        let mut set = ports();
        assert!(set.assign_output(PortName::Right));
        assert!(!set.assign_input(PortName::Right));
        assert!(set.assign_input(PortName::Left));
        assert!(set.assign_input(PortName::Top));
        assert_eq!(set.input_ports().len(), 2);
    }

    #[test]
    fn test_inactive_port_refuses_roles() {
        let mut set = PortSet::single(Size::new(80.0, 40.0), PortName::Bottom);
        assert!(!set.assign_output(PortName::Top));
        assert!(!set.assign_input(PortName::Left));
        assert!(set.assign_output(PortName::Bottom));
        assert_eq!(set.available_ports(), Vec::<PortName>::new());
    }

    #[test]
    fn test_reset_keeps_roles_with_live_wires() {
        let mut set = ports();
        set.assign_output(PortName::Right);
        set.assign_input(PortName::Left);

        set.reset(true, false);
        assert_eq!(set.output_port(), None);
        assert!(set.input_ports().contains(&PortName::Left));

        set.reset(false, false);
        assert!(set.input_ports().is_empty());
    }

    #[test]
    fn test_visuals_follow_wires() {
        let mut set = ports();
        set.assign_output(PortName::Right);
        set.assign_input(PortName::Left);
        set.assign_input(PortName::Top);

        let inputs = BTreeSet::from([PortName::Left]);
        let outputs = BTreeSet::new();
        set.refresh_visuals(&inputs, &outputs);

        assert_eq!(set.visual(PortName::Left), PortVisual::ConnectedInput);
        assert_eq!(set.visual(PortName::Top), PortVisual::Available);
        assert_eq!(set.visual(PortName::Right), PortVisual::Available);
    }

    #[test]
    fn test_hit_test() {
        let set = ports();
        assert_eq!(set.hit_test(Point::new(98.0, 22.0)), Some(PortName::Right));
        assert_eq!(set.hit_test(Point::new(50.0, 20.0)), None);
    }

    #[test]
    fn test_port_name_parsing() {
        assert_eq!("left".parse::<PortName>(), Ok(PortName::Left));
        assert!("north".parse::<PortName>().is_err());
        assert_eq!(PortName::Bottom.to_string(), "bottom");
    }

    #[test]
    fn test_hover_color_only_for_available() {
        let connected = PortVisual::ConnectedOutput;
        assert_eq!(connected.hover_color().to_rgba8(), connected.color().to_rgba8());
        let available = PortVisual::Available;
        assert_ne!(available.hover_color().to_rgba8(), available.color().to_rgba8());
    }
}
