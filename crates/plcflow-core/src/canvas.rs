//! The interactive flowchart surface.
//!
//! [`Canvas`] owns every block and wire and is the only place they are
//! mutated. Each mutation settles block positions first, then rebuilds the
//! geometry of affected wires, then notifies listeners.

use crate::block::{Block, BlockId};
use crate::catalog::{BlockCatalog, SizeLookup};
use crate::clipboard::Clipboard;
use crate::config::CanvasConfig;
use crate::events::{CanvasEvent, EventBus};
use crate::geometry::rects_overlap;
use crate::gesture::{GestureOutcome, Interaction, ProvisionalWire, pick_target};
use crate::grid::Grid;
use crate::input::{KeyCommand, Modifiers, MouseButton, PointerEvent};
use crate::port::{PortName, PortRole};
use crate::wire::{Endpoint, Wire, WireGeometry, WireId, WireShape};
use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use std::collections::{BTreeSet, HashMap};

/// The flowchart editing surface.
pub struct Canvas {
    config: CanvasConfig,
    sizes: Box<dyn SizeLookup>,
    grid: Grid,
    blocks: HashMap<BlockId, Block>,
    /// Blocks back to front.
    block_order: Vec<BlockId>,
    wires: HashMap<WireId, Wire>,
    wire_order: Vec<WireId>,
    start: BlockId,
    selection: Vec<BlockId>,
    hovered: Option<Endpoint>,
    interaction: Interaction,
    clipboard: Clipboard,
    events: EventBus,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(CanvasConfig::default(), BlockCatalog::builtin())
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("blocks", &self.blocks.len())
            .field("wires", &self.wires.len())
            .field("grid", &self.grid)
            .field("interaction", &self.interaction)
            .finish_non_exhaustive()
    }
}

impl Canvas {
    /// Create a canvas holding only the start block at cell A1.
    pub fn new(config: CanvasConfig, sizes: impl SizeLookup + 'static) -> Self {
        let grid = Grid::new(&config);
        let start = Block::start(grid.cell_origin(1, 1));
        let start_id = start.id();
        let mut canvas = Self {
            config,
            sizes: Box::new(sizes),
            grid,
            blocks: HashMap::new(),
            block_order: Vec::new(),
            wires: HashMap::new(),
            wire_order: Vec::new(),
            start: start_id,
            selection: Vec::new(),
            hovered: None,
            interaction: Interaction::Idle,
            clipboard: Clipboard::new(),
            events: EventBus::new(),
        };
        canvas.insert_block(start);
        canvas
    }

    /// Register a callback run after every structural change.
    pub fn subscribe(&mut self, listener: impl FnMut(&CanvasEvent) + 'static) {
        self.events.subscribe(listener);
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    /// The wire being drawn, if any.
    pub fn provisional_wire(&self) -> Option<&ProvisionalWire> {
        self.interaction.provisional()
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Blocks back to front.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.block_order.iter().filter_map(|id| self.blocks.get(id))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn start_block(&self) -> Option<&Block> {
        self.blocks.get(&self.start)
    }

    pub fn start_id(&self) -> BlockId {
        self.start
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    /// Wires in creation order.
    pub fn wires(&self) -> impl Iterator<Item = &Wire> {
        self.wire_order.iter().filter_map(|id| self.wires.get(id))
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    /// Size for a new block of the given type.
    pub fn size_of(&self, type_name: &str) -> Size {
        self.sizes.size_of(type_name)
    }

    /// Reload the block size table if its source supports reloading.
    pub fn refresh_block_types(&mut self) -> bool {
        match self.sizes.as_refreshable() {
            Some(source) => source.refresh(),
            None => false,
        }
    }

    /// Scene position of a wire endpoint.
    pub fn port_position(&self, endpoint: Endpoint) -> Option<Point> {
        self.blocks.get(&endpoint.block).map(|b| b.port_position(endpoint.port))
    }

    // --- placement -------------------------------------------------------

    fn insert_block(&mut self, block: Block) -> BlockId {
        let id = block.id();
        self.grid.ensure_extent(Point::new(block.bounds().x1, block.bounds().y1));
        self.blocks.insert(id, block);
        self.block_order.push(id);
        id
    }

    fn overlaps_any(&self, rect: Rect, ignore: BlockId) -> bool {
        self.blocks
            .values()
            .any(|b| b.id() != ignore && rects_overlap(b.bounds(), rect))
    }

    /// Find a free spot for a new block near `candidate`.
    ///
    /// The candidate is clamped to the grid, nudged once to the right if it
    /// overlaps, and clamped again. Returns `None` if it still overlaps.
    fn place(&self, candidate: Point, size: Size) -> Option<Point> {
        let mut pos = self.grid.clamp(candidate, size);
        if self.overlaps_any(Rect::from_origin_size(pos, size), BlockId::nil()) {
            pos.x += size.width + self.config.placement_gap;
            pos = self.grid.clamp(pos, size);
        }
        if self.overlaps_any(Rect::from_origin_size(pos, size), BlockId::nil()) {
            log::debug!("no free spot for block near ({}, {})", candidate.x, candidate.y);
            return None;
        }
        Some(pos)
    }

    fn place_new(&mut self, text: &str, candidate: Point, size: Size) -> Option<BlockId> {
        let pos = self.place(candidate, size)?;
        let mut block = Block::new(text, pos, size);
        block.ports.set_hit_radius(self.config.port_hit_radius);
        let id = self.insert_block(block);
        self.events.emit(CanvasEvent::BlockAdded(id));
        Some(id)
    }

    /// Drop a block of `type_name` centered on `point`.
    ///
    /// Returns `None` when no overlap-free position is found.
    pub fn drop_block(&mut self, type_name: &str, point: Point) -> Option<BlockId> {
        let size = self.size_of(type_name);
        let candidate = point - size.to_vec2() / 2.0;
        self.place_new(type_name, candidate, size)
    }

    /// Move a block to the top of the stacking order.
    pub fn bring_to_front(&mut self, id: BlockId) {
        if self.blocks.contains_key(&id) {
            self.block_order.retain(|b| *b != id);
            self.block_order.push(id);
        }
    }

    // --- dragging --------------------------------------------------------

    /// Push a block right until it clears every other block.
    fn resolve_overlap(&self, id: BlockId, candidate: Point, size: Size) -> Option<Point> {
        let mut pos = candidate;
        for _ in 0..=self.config.max_resolve_steps {
            if !self.overlaps_any(Rect::from_origin_size(pos, size), id) {
                return Some(pos);
            }
            pos.x += size.width + self.config.placement_gap;
            pos = self.grid.clamp(pos, size);
        }
        None
    }

    /// Translate blocks by `delta`, clamping and resolving overlaps.
    ///
    /// If any block cannot be settled, every block returns to where it was.
    fn drag_blocks(&mut self, ids: &[BlockId], delta: Vec2) -> bool {
        let mut originals = Vec::with_capacity(ids.len());
        for &id in ids {
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            let (origin, size) = (block.position(), block.size());
            let candidate = self.grid.clamp(origin + delta, size);
            originals.push((id, origin));

            let Some(settled) = self.resolve_overlap(id, candidate, size) else {
                log::debug!("drag refused: block {id} cannot avoid overlap");
                for (moved, pos) in originals {
                    if let Some(b) = self.blocks.get_mut(&moved) {
                        b.position = pos;
                    }
                }
                return false;
            };
            if let Some(b) = self.blocks.get_mut(&id) {
                b.position = settled;
            }
        }

        let moved: Vec<BlockId> = originals
            .iter()
            .filter(|(id, origin)| self.blocks.get(id).is_some_and(|b| b.position() != *origin))
            .map(|(id, _)| *id)
            .collect();
        self.settle(&moved);
        !moved.is_empty()
    }

    /// Post-move hook: grow the grid, rebuild wire geometry, then notify.
    fn settle(&mut self, moved: &[BlockId]) {
        for id in moved {
            if let Some(b) = self.blocks.get(id) {
                let far = Point::new(b.bounds().x1, b.bounds().y1);
                self.grid.ensure_extent(far);
            }
        }
        self.recompute_wires(moved);
        for id in moved {
            self.events.emit(CanvasEvent::BlockMoved(*id));
        }
    }

    /// Move the selected blocks.
    pub fn move_selected(&mut self, delta: Vec2) -> bool {
        let ids = self.selection.clone();
        self.drag_blocks(&ids, delta)
    }

    /// Move a single block.
    pub fn move_block(&mut self, id: BlockId, delta: Vec2) -> bool {
        self.drag_blocks(&[id], delta)
    }

    /// Rebuild geometry of every wire touching `blocks` from current port positions.
    fn recompute_wires(&mut self, blocks: &[BlockId]) {
        let affected: Vec<WireId> = self
            .wire_order
            .iter()
            .filter(|w| self.wires.get(*w).is_some_and(|w| blocks.iter().any(|b| w.touches(*b))))
            .copied()
            .collect();
        for id in affected {
            self.reroute(id);
        }
    }

    fn reroute(&mut self, id: WireId) {
        let Some(wire) = self.wires.get(&id) else {
            return;
        };
        let (Some(start), Some(end)) = (self.port_position(wire.source), self.port_position(wire.target)) else {
            return;
        };
        if let Some(wire) = self.wires.get_mut(&id) {
            wire.geometry.recompute(start, end);
        }
    }

    // --- wiring ----------------------------------------------------------

    /// Recompute port visuals of a block from the wires attached to it.
    fn refresh_visuals(&mut self, id: BlockId) {
        let Some(block) = self.blocks.get(&id) else {
            return;
        };
        let inputs: BTreeSet<PortName> = block
            .in_wires
            .iter()
            .filter_map(|w| self.wires.get(w))
            .map(|w| w.target.port)
            .collect();
        let outputs: BTreeSet<PortName> = block
            .out_wires
            .iter()
            .filter_map(|w| self.wires.get(w))
            .map(|w| w.source.port)
            .collect();
        if let Some(block) = self.blocks.get_mut(&id) {
            block.ports.refresh_visuals(&inputs, &outputs);
        }
    }

    /// Assign roles for a new wire; on refusal nothing changes.
    fn assign_roles(&mut self, from: Endpoint, to: Endpoint) -> bool {
        if from.block == to.block || !self.blocks.contains_key(&to.block) {
            return false;
        }
        let Some(src) = self.blocks.get_mut(&from.block) else {
            return false;
        };
        let previous = src.ports.output_port();
        if !src.ports.assign_output(from.port) {
            return false;
        }
        let accepted = self
            .blocks
            .get_mut(&to.block)
            .is_some_and(|dst| dst.ports.assign_input(to.port));
        if !accepted {
            if let Some(src) = self.blocks.get_mut(&from.block) {
                src.ports.restore_output(previous);
            }
        }
        accepted
    }

    /// Create the wire record once roles are assigned. Does not notify.
    fn attach_wire(&mut self, from: Endpoint, to: Endpoint, geometry: Option<WireGeometry>) -> Option<WireId> {
        let start = self.port_position(from)?;
        let end = self.port_position(to)?;
        let wire = match geometry {
            Some(mut geometry) => {
                geometry.recompute(start, end);
                Wire::with_geometry(from, to, geometry)
            }
            None => Wire::new(from, to, start, end),
        };
        let id = wire.id();
        self.wires.insert(id, wire);
        self.wire_order.push(id);
        if let Some(src) = self.blocks.get_mut(&from.block) {
            src.out_wires.push(id);
        }
        if let Some(dst) = self.blocks.get_mut(&to.block) {
            dst.in_wires.push(id);
        }
        self.refresh_visuals(from.block);
        self.refresh_visuals(to.block);
        Some(id)
    }

    /// Connect two ports directly, applying the same role rules as the
    /// pointer gesture.
    pub fn connect(&mut self, from: Endpoint, to: Endpoint) -> Option<WireId> {
        if !self.assign_roles(from, to) {
            log::debug!("refused wire {}:{} -> {}:{}", from.block, from.port, to.block, to.port);
            return None;
        }
        let id = self.attach_wire(from, to, None)?;
        self.events.emit(CanvasEvent::WireAdded(id));
        Some(id)
    }

    /// Rebuild a wire from a document.
    ///
    /// Roles were seeded from the block records, so a port that already has
    /// one keeps it. A port with none takes the role the wire implies. Only
    /// inactive ports are refused.
    pub(crate) fn restore_wire(&mut self, from: Endpoint, to: Endpoint, geometry: WireGeometry) -> Option<WireId> {
        let active = |e: Endpoint| self.blocks.get(&e.block).is_some_and(|b| b.ports.is_active(e.port));
        if !active(from) || !active(to) {
            return None;
        }
        if let Some(src) = self.blocks.get_mut(&from.block) {
            if src.ports.output_port().is_none() && src.ports.role(from.port) == PortRole::Unassigned {
                src.ports.assign_output(from.port);
            }
        }
        if let Some(dst) = self.blocks.get_mut(&to.block) {
            if dst.ports.role(to.port) == PortRole::Unassigned {
                dst.ports.assign_input(to.port);
            }
        }
        self.attach_wire(from, to, Some(geometry))
    }

    /// Remove a wire and release the ports it held.
    ///
    /// The destination port loses its input role when no other wire ends on
    /// it. A block left with no wires at all has every role reset.
    pub fn delete_wire(&mut self, id: WireId) -> bool {
        let Some(wire) = self.wires.remove(&id) else {
            return false;
        };
        self.wire_order.retain(|w| *w != id);

        if let Some(dst) = self.blocks.get_mut(&wire.target.block) {
            dst.detach_wire(id);
        }
        let port_still_used = self.blocks.get(&wire.target.block).is_some_and(|dst| {
            dst.in_wires
                .iter()
                .filter_map(|w| self.wires.get(w))
                .any(|w| w.target.port == wire.target.port)
        });
        if let Some(dst) = self.blocks.get_mut(&wire.target.block) {
            if !port_still_used {
                dst.ports.release_input(wire.target.port);
            }
        }
        if let Some(src) = self.blocks.get_mut(&wire.source.block) {
            src.detach_wire(id);
        }

        for block_id in [wire.source.block, wire.target.block] {
            if let Some(block) = self.blocks.get_mut(&block_id) {
                if !block.has_wires() {
                    block.ports.reset(false, false);
                }
            }
            self.refresh_visuals(block_id);
        }

        self.events.emit(CanvasEvent::WireRemoved(id));
        true
    }

    /// Add an interior bend to a segmented wire.
    pub fn add_wire_bend(&mut self, id: WireId, point: Point) -> bool {
        let added = self.wires.get_mut(&id).is_some_and(|w| w.add_bend(point));
        if added {
            self.reroute(id);
            self.events.emit(CanvasEvent::WireReshaped(id));
        }
        added
    }

    /// First wire attached at a port, outgoing wires first.
    fn wire_on_port(&self, endpoint: Endpoint) -> Option<WireId> {
        let block = self.blocks.get(&endpoint.block)?;
        let outgoing = block
            .out_wires
            .iter()
            .find(|w| self.wires.get(*w).is_some_and(|w| w.source == endpoint));
        let incoming = || {
            block
                .in_wires
                .iter()
                .find(|w| self.wires.get(*w).is_some_and(|w| w.target == endpoint))
        };
        outgoing.or_else(incoming).copied()
    }

    // --- deletion --------------------------------------------------------

    /// Delete a block and every wire attached to it. The start block is kept.
    pub fn delete_block(&mut self, id: BlockId) -> bool {
        if id == self.start {
            log::debug!("the start block cannot be deleted");
            return false;
        }
        let Some(block) = self.blocks.get(&id) else {
            return false;
        };
        let attached: Vec<WireId> = block.in_wires.iter().chain(block.out_wires.iter()).copied().collect();
        if self.provisional_wire().is_some_and(|w| w.from().block == id) {
            self.cancel_wire();
        }
        for wire in attached {
            self.delete_wire(wire);
        }
        self.blocks.remove(&id);
        self.block_order.retain(|b| *b != id);
        self.selection.retain(|b| *b != id);
        if self.hovered.is_some_and(|h| h.block == id) {
            self.hovered = None;
        }
        self.events.emit(CanvasEvent::BlockRemoved(id));
        true
    }

    /// Delete selected wires, then selected blocks. Returns how many items went.
    pub fn delete_selected(&mut self) -> usize {
        let wires: Vec<WireId> = self.selected_wires();
        let blocks: Vec<BlockId> = self.selection.clone();
        let mut removed = 0;
        for id in wires {
            removed += usize::from(self.delete_wire(id));
        }
        for id in blocks {
            removed += usize::from(self.delete_block(id));
        }
        removed
    }

    /// Remove everything and put a fresh start block at A1.
    ///
    /// The grid keeps its current size.
    pub fn clear(&mut self) {
        self.reset_contents();
        self.events.emit(CanvasEvent::Cleared);
    }

    fn reset_contents(&mut self) {
        self.interaction = Interaction::Idle;
        self.blocks.clear();
        self.block_order.clear();
        self.wires.clear();
        self.wire_order.clear();
        self.selection.clear();
        self.hovered = None;
        let start = Block::start(self.grid.cell_origin(1, 1));
        self.start = start.id();
        self.insert_block(start);
    }

    // --- import support --------------------------------------------------

    /// Empty the canvas ahead of an import and grow the grid to the
    /// recorded size. The grid never shrinks.
    pub(crate) fn begin_import(&mut self, cols: u32, rows: u32) {
        self.reset_contents();
        self.grid.expand_to(cols, rows);
    }

    pub(crate) fn import_block(&mut self, block: Block) -> BlockId {
        self.insert_block(block)
    }

    /// Move the live start block to its recorded position and stacking slot.
    pub(crate) fn import_start(&mut self, position: Point) -> BlockId {
        let start = self.start;
        if let Some(block) = self.blocks.get_mut(&start) {
            block.position = position;
            let far = Point::new(block.bounds().x1, block.bounds().y1);
            self.grid.ensure_extent(far);
        }
        self.bring_to_front(start);
        start
    }

    /// Restore the roles a block record carried: inputs first, then the
    /// output unless it is also listed as an input.
    pub(crate) fn seed_roles(&mut self, id: BlockId, inputs: &[PortName], output: Option<PortName>) {
        let Some(block) = self.blocks.get_mut(&id) else {
            return;
        };
        for &port in inputs {
            block.ports.assign_input(port);
        }
        if let Some(port) = output {
            block.ports.assign_output(port);
        }
    }

    pub(crate) fn finish_import(&mut self) {
        let ids: Vec<BlockId> = self.block_order.clone();
        for id in &ids {
            self.refresh_visuals(*id);
        }
        self.events.emit(CanvasEvent::Loaded);
    }

    // --- selection -------------------------------------------------------

    pub fn selection(&self) -> &[BlockId] {
        &self.selection
    }

    pub fn is_selected(&self, id: BlockId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selected_wires(&self) -> Vec<WireId> {
        self.wires().filter(|w| w.selected).map(|w| w.id()).collect()
    }

    /// Select a block. With `extend` the block is toggled in the selection.
    pub fn select_block(&mut self, id: BlockId, extend: bool) {
        if !self.blocks.contains_key(&id) {
            return;
        }
        if extend {
            if self.is_selected(id) {
                self.selection.retain(|b| *b != id);
            } else {
                self.selection.push(id);
            }
        } else {
            self.clear_selection();
            self.selection.push(id);
        }
    }

    pub fn select_wire(&mut self, id: WireId, extend: bool) {
        if !self.wires.contains_key(&id) {
            return;
        }
        if !extend {
            self.clear_selection();
        }
        if let Some(wire) = self.wires.get_mut(&id) {
            wire.selected = !extend || !wire.selected;
        }
    }

    pub fn select_all(&mut self) {
        self.selection = self.block_order.clone();
        for wire in self.wires.values_mut() {
            wire.selected = true;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        for wire in self.wires.values_mut() {
            wire.selected = false;
        }
    }

    // --- clipboard -------------------------------------------------------

    /// Copy selected blocks (never the start block) and the wires between them.
    pub fn copy_selection(&mut self) -> usize {
        let blocks: Vec<&Block> = self
            .block_order
            .iter()
            .filter(|id| self.selection.contains(*id))
            .filter_map(|id| self.blocks.get(id))
            .collect();
        let wires = self.wire_order.iter().filter_map(|id| self.wires.get(id));
        self.clipboard.capture(&blocks, wires);
        self.clipboard.blocks().len()
    }

    /// Paste the clipboard at a fixed offset and select the new blocks.
    ///
    /// Blocks that find no free spot are skipped along with their wires.
    pub fn paste(&mut self) -> Vec<BlockId> {
        let copied = self.clipboard.clone();
        let offset = self.config.paste_offset;
        let placed: Vec<Option<BlockId>> = copied
            .blocks()
            .iter()
            .map(|b| self.place_new(&b.text, b.position + offset, b.size))
            .collect();

        for wire in copied.wires() {
            let (Some(Some(src)), Some(Some(dst))) = (placed.get(wire.source), placed.get(wire.target)) else {
                continue;
            };
            self.connect(Endpoint::new(*src, wire.from_port), Endpoint::new(*dst, wire.to_port));
        }

        let pasted: Vec<BlockId> = placed.into_iter().flatten().collect();
        self.clear_selection();
        self.selection = pasted.clone();
        pasted
    }

    // --- hit testing -----------------------------------------------------

    /// Topmost active port under `point`.
    pub fn port_at(&self, point: Point) -> Option<Endpoint> {
        self.block_order.iter().rev().find_map(|id| {
            let block = self.blocks.get(id)?;
            block.port_at(point).map(|port| Endpoint::new(*id, port))
        })
    }

    /// Topmost block whose body contains `point`.
    pub fn block_at(&self, point: Point) -> Option<BlockId> {
        self.block_order
            .iter()
            .rev()
            .find(|id| self.blocks.get(*id).is_some_and(|b| b.contains(point)))
            .copied()
    }

    /// Most recent wire passing near `point`.
    pub fn wire_at(&self, point: Point) -> Option<WireId> {
        self.wire_order
            .iter()
            .rev()
            .find(|id| self.wires.get(*id).is_some_and(|w| w.hit_test(point)))
            .copied()
    }

    /// Update the hovered port.
    pub fn hover(&mut self, point: Point) -> Option<Endpoint> {
        self.hovered = self.port_at(point);
        self.hovered
    }

    pub fn hovered_port(&self) -> Option<Endpoint> {
        self.hovered
    }

    /// Fill color of a port, including hover feedback.
    pub fn port_color(&self, endpoint: Endpoint) -> Option<Color> {
        let visual = self.blocks.get(&endpoint.block)?.ports.visual(endpoint.port);
        if self.hovered == Some(endpoint) {
            Some(visual.hover_color())
        } else {
            Some(visual.color())
        }
    }

    // --- pointer and keys ------------------------------------------------

    /// Feed a pointer event through the interaction state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> GestureOutcome {
        match event {
            PointerEvent::Down {
                button: MouseButton::Right,
                ..
            } => {
                if self.cancel_wire() {
                    GestureOutcome::Cancelled
                } else {
                    GestureOutcome::Ignored
                }
            }
            PointerEvent::Down {
                position,
                button: MouseButton::Left,
                modifiers,
            } => self.press(position, modifiers),
            PointerEvent::Move { position } => self.pointer_moved(position),
            PointerEvent::Up {
                position,
                button: MouseButton::Left,
            } => self.release(position),
            _ => GestureOutcome::Ignored,
        }
    }

    fn press(&mut self, position: Point, modifiers: Modifiers) -> GestureOutcome {
        if !self.interaction.is_idle() {
            return GestureOutcome::Ignored;
        }

        if let Some(endpoint) = self.port_at(position) {
            if let Some(wire) = self.wire_on_port(endpoint) {
                self.delete_wire(wire);
                return GestureOutcome::Disconnected(wire);
            }
            let Some(block) = self.blocks.get_mut(&endpoint.block) else {
                return GestureOutcome::Ignored;
            };
            let previous = block.ports.output_port();
            if !block.ports.assign_output(endpoint.port) {
                return GestureOutcome::Ignored;
            }
            let anchor = block.port_position(endpoint.port);
            self.interaction = Interaction::Routing(ProvisionalWire::new(endpoint, previous, anchor));
            return GestureOutcome::Started(endpoint);
        }

        let extend = modifiers.extends_selection();
        if let Some(id) = self.block_at(position) {
            self.select_block(id, extend);
            if self.is_selected(id) {
                self.interaction = Interaction::Dragging { last: position };
            }
            return GestureOutcome::BlockPressed(id);
        }

        if let Some(wire) = self.wire_at(position) {
            self.select_wire(wire, extend);
            return GestureOutcome::WireSelected(wire);
        }

        if !extend {
            self.clear_selection();
        }
        GestureOutcome::Deselected
    }

    fn pointer_moved(&mut self, position: Point) -> GestureOutcome {
        match &mut self.interaction {
            Interaction::Routing(wire) => {
                wire.track(position);
                GestureOutcome::StillRouting
            }
            Interaction::Dragging { last } => {
                let delta = position - *last;
                *last = position;
                self.move_selected(delta);
                GestureOutcome::Dragged
            }
            Interaction::Idle => {
                self.hover(position);
                GestureOutcome::Ignored
            }
        }
    }

    fn release(&mut self, position: Point) -> GestureOutcome {
        match &self.interaction {
            Interaction::Routing(_) => self.complete_wire(position),
            Interaction::Dragging { .. } => {
                self.interaction = Interaction::Idle;
                GestureOutcome::Released
            }
            Interaction::Idle => GestureOutcome::Ignored,
        }
    }

    /// Candidate target for the provisional wire at `position`.
    fn find_target(&self, from: BlockId, position: Point) -> Option<Endpoint> {
        let eligible = |block: &Block, port: PortName| block.id() != from && block.ports.accepts_input(port);

        let exact = self.block_order.iter().rev().find_map(|id| {
            let block = self.blocks.get(id)?;
            let port = block.port_at(position)?;
            eligible(block, port).then(|| Endpoint::new(*id, port))
        });

        let candidates = self.blocks().flat_map(|block| {
            block
                .ports
                .iter()
                .filter(move |p| p.active && eligible(block, p.name))
                .map(move |p| (Endpoint::new(block.id(), p.name), block.port_position(p.name)))
        });

        pick_target(exact, candidates, position, self.config.port_snap_tolerance)
    }

    fn complete_wire(&mut self, position: Point) -> GestureOutcome {
        let Some(from) = self.provisional_wire().map(|w| w.from()) else {
            return GestureOutcome::Ignored;
        };
        let Some(to) = self.find_target(from.block, position) else {
            if let Interaction::Routing(wire) = &mut self.interaction {
                wire.track(position);
            }
            return GestureOutcome::StillRouting;
        };
        let accepted = self
            .blocks
            .get_mut(&to.block)
            .is_some_and(|dst| dst.ports.assign_input(to.port));
        if !accepted {
            return GestureOutcome::StillRouting;
        }
        self.interaction = Interaction::Idle;
        match self.attach_wire(from, to, None) {
            Some(id) => {
                self.events.emit(CanvasEvent::WireAdded(id));
                GestureOutcome::Connected(id)
            }
            None => GestureOutcome::Ignored,
        }
    }

    /// Abort the wire being drawn and restore the source block's output role.
    pub fn cancel_wire(&mut self) -> bool {
        if self.provisional_wire().is_none() {
            return false;
        }
        let Interaction::Routing(wire) = std::mem::take(&mut self.interaction) else {
            return false;
        };
        let from = wire.from();
        if let Some(block) = self.blocks.get_mut(&from.block) {
            block.ports.restore_output(wire.previous_output());
        }
        self.refresh_visuals(from.block);
        true
    }

    /// Run a key command. Returns true when it changed anything.
    pub fn handle_key(&mut self, command: KeyCommand) -> bool {
        match command {
            KeyCommand::Escape => self.cancel_wire(),
            KeyCommand::Delete => self.delete_selected() > 0,
            KeyCommand::Copy => self.copy_selection() > 0,
            KeyCommand::Paste => !self.paste().is_empty(),
            KeyCommand::SelectAll => {
                self.select_all();
                true
            }
        }
    }
}
