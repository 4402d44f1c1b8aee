//! PLCFlow Core Library
//!
//! Platform-agnostic flowchart editor model for ESP32 PLC logic: blocks with
//! directional ports, wires routed between them, a growing cell grid, and the
//! project file format shared with the tag configuration.

pub mod block;
pub mod canvas;
pub mod catalog;
pub mod clipboard;
pub mod config;
pub mod events;
pub mod geometry;
pub mod gesture;
pub mod grid;
pub mod input;
pub mod port;
pub mod project;
pub mod storage;
pub mod tags;
pub mod wire;

pub use block::{Block, BlockId, BlockKind};
pub use canvas::Canvas;
pub use catalog::{BlockCatalog, SizeLookup};
pub use config::CanvasConfig;
pub use events::{CanvasEvent, Refreshable};
pub use geometry::route;
pub use gesture::{GestureOutcome, Interaction};
pub use grid::{Grid, MAX_GRID_CELLS};
pub use input::{KeyCommand, Modifiers, MouseButton, PointerEvent};
pub use port::{PortName, PortRole, PortVisual};
pub use project::{ImportReport, ImportWarning, ProjectDocument, ProjectError};
pub use storage::{FileStorage, MemoryStorage, ProjectSession, Storage, StorageError};
pub use tags::{DataType, Tag, TagLookup, TagRegistry};
pub use wire::{Endpoint, Wire, WireId};
