//! In-process copy buffer for blocks and the wires between them.

use crate::block::{Block, BlockId};
use crate::port::PortName;
use crate::wire::Wire;
use kurbo::{Point, Size};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CopiedBlock {
    pub text: String,
    pub position: Point,
    pub size: Size,
}

/// A wire between two copied blocks, by index into the copied block list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopiedWire {
    pub source: usize,
    pub target: usize,
    pub from_port: PortName,
    pub to_port: PortName,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Clipboard {
    blocks: Vec<CopiedBlock>,
    wires: Vec<CopiedWire>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer with `blocks` and the wires running between them.
    ///
    /// The start block is never copied. Wires with an endpoint outside the
    /// copied set are dropped.
    pub fn capture<'a>(&mut self, blocks: &[&Block], wires: impl IntoIterator<Item = &'a Wire>) {
        self.blocks.clear();
        self.wires.clear();

        let mut index: HashMap<BlockId, usize> = HashMap::new();
        for block in blocks.iter().filter(|b| !b.is_start()) {
            index.insert(block.id(), self.blocks.len());
            self.blocks.push(CopiedBlock {
                text: block.text.clone(),
                position: block.position(),
                size: block.size(),
            });
        }

        for wire in wires {
            let (Some(&source), Some(&target)) = (index.get(&wire.source().block), index.get(&wire.target().block))
            else {
                continue;
            };
            self.wires.push(CopiedWire {
                source,
                target,
                from_port: wire.source().port,
                to_port: wire.target().port,
            });
        }
        log::debug!("copied {} blocks and {} wires", self.blocks.len(), self.wires.len());
    }

    pub fn blocks(&self) -> &[CopiedBlock] {
        &self.blocks
    }

    pub fn wires(&self) -> &[CopiedWire] {
        &self.wires
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.wires.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::Endpoint;

    #[test]
    fn test_capture_keeps_internal_wires_only() {
        let size = Size::new(100.0, 40.0);
        let a = Block::new("A", Point::new(100.0, 100.0), size);
        let b = Block::new("B", Point::new(300.0, 100.0), size);
        let c = Block::new("C", Point::new(500.0, 100.0), size);
        let start = Block::start(Point::new(50.0, 50.0));

        let ab = Wire::new(
            Endpoint::new(a.id(), PortName::Right),
            Endpoint::new(b.id(), PortName::Left),
            Point::ZERO,
            Point::ZERO,
        );
        let bc = Wire::new(
            Endpoint::new(b.id(), PortName::Right),
            Endpoint::new(c.id(), PortName::Left),
            Point::ZERO,
            Point::ZERO,
        );

        let mut clipboard = Clipboard::new();
        clipboard.capture(&[&start, &a, &b], [&ab, &bc]);

        assert_eq!(clipboard.blocks().len(), 2);
        assert_eq!(clipboard.blocks()[0].text, "A");
        assert_eq!(
            clipboard.wires(),
            &[CopiedWire {
                source: 0,
                target: 1,
                from_port: PortName::Right,
                to_port: PortName::Left,
            }]
        );
    }

    #[test]
    fn test_capture_replaces_buffer() {
        let a = Block::new("A", Point::ZERO, Size::new(10.0, 10.0));
        let mut clipboard = Clipboard::new();
        clipboard.capture(&[&a], std::iter::empty::<&Wire>());
        assert!(!clipboard.is_empty());
        clipboard.capture(&[], std::iter::empty::<&Wire>());
        assert!(clipboard.is_empty());
    }
}
