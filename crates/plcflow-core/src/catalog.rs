//! Block type catalog: maps palette names to block sizes.
//!
//! The catalog is read from a `block_config.json` file of the form
//! `{"block_types": {"<name>": {"width": w, "height": h}}}`. When no file is
//! available the built-in palette is used. Unknown names resolve to
//! [`DEFAULT_BLOCK_SIZE`].

use crate::events::Refreshable;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Size used for any block type the catalog does not know.
pub const DEFAULT_BLOCK_SIZE: Size = Size::new(150.0, 40.0);

/// File name of the block configuration.
pub const BLOCK_CONFIG_FILE: &str = "block_config.json";

/// Palette shipped with the editor.
pub const BUILTIN_BLOCK_TYPES: [&str; 26] = [
    "Wire Router",
    "ON?",
    "OFF?",
    "<",
    ">",
    "<=",
    ">=",
    "=",
    "≠",
    "Turn On/Off",
    "Calculator",
    "Copy",
    "Counter",
    "Filter",
    "Motion In",
    "Motion Out",
    "PID",
    "PWM",
    "Ramp",
    "Scale",
    "Shift / Rotate",
    "Statistics",
    "Subroutine",
    "Timer / Clock",
    "Note",
    "Code Block",
];

/// Errors reading a block configuration.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read block configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid block configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only size lookup consumed by the canvas.
pub trait SizeLookup {
    /// Size of a block of the given type.
    fn size_of(&self, type_name: &str) -> Size;

    /// Reload capability, for lookups backed by a file.
    fn as_refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        None
    }
}

fn default_width() -> f64 {
    DEFAULT_BLOCK_SIZE.width
}

fn default_height() -> f64 {
    DEFAULT_BLOCK_SIZE.height
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BlockTypeEntry {
    #[serde(default = "default_width")]
    width: f64,
    #[serde(default = "default_height")]
    height: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BlockConfigFile {
    #[serde(default)]
    block_types: serde_json::Map<String, serde_json::Value>,
}

/// Ordered table of block types and their sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCatalog {
    entries: Vec<(String, Size)>,
    source: Option<PathBuf>,
}

impl BlockCatalog {
    /// The built-in palette.
    pub fn builtin() -> Self {
        let entries = BUILTIN_BLOCK_TYPES
            .iter()
            .map(|name| {
                let width = if *name == "Wire Router" { 75.0 } else { 100.0 };
                (name.to_string(), Size::new(width, 40.0))
            })
            .collect();
        Self { entries, source: None }
    }

    /// Parse a block configuration document.
    ///
    /// Entries that are not objects are skipped; missing dimensions default.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: BlockConfigFile = serde_json::from_str(json)?;
        let mut entries = Vec::with_capacity(file.block_types.len());
        for (name, value) in file.block_types {
            match serde_json::from_value::<BlockTypeEntry>(value) {
                Ok(entry) => entries.push((name, Size::new(entry.width, entry.height))),
                Err(e) => log::warn!("Skipping block type '{name}': {e}"),
            }
        }
        Ok(Self { entries, source: None })
    }

    /// Load a block configuration file and remember it for [`Refreshable::refresh`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut catalog = Self::from_json(&json)?;
        catalog.source = Some(path.to_path_buf());
        log::info!("Loaded {} block types from {}", catalog.entries.len(), path.display());
        Ok(catalog)
    }

    /// Load `path`, falling back to the built-in palette.
    ///
    /// The path is kept either way so a later refresh can pick up the file.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                log::warn!("{e}; using built-in block palette");
                let mut catalog = Self::builtin();
                catalog.source = Some(path.to_path_buf());
                catalog
            }
        }
    }

    /// Default location of the block configuration in the user's data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_local_dir().map(|dir| dir.join("plcflow").join(BLOCK_CONFIG_FILE))
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn entries(&self) -> &[(String, Size)] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, type_name: &str) -> Option<Size> {
        self.entries.iter().find(|(name, _)| name == type_name).map(|(_, size)| *size)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize in the block configuration format.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let mut file = BlockConfigFile::default();
        for (name, size) in &self.entries {
            let entry = BlockTypeEntry {
                width: size.width,
                height: size.height,
            };
            file.block_types.insert(name.clone(), serde_json::to_value(entry)?);
        }
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

impl Default for BlockCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SizeLookup for BlockCatalog {
    fn size_of(&self, type_name: &str) -> Size {
        self.get(type_name).unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    fn as_refreshable(&mut self) -> Option<&mut dyn Refreshable> {
        Some(self)
    }
}

impl Refreshable for BlockCatalog {
    /// Re-read the source file. A failed read keeps the current table.
    fn refresh(&mut self) -> bool {
        let Some(path) = self.source.clone() else {
            return false;
        };
        match Self::load(&path) {
            Ok(fresh) => {
                let changed = fresh.entries != self.entries;
                self.entries = fresh.entries;
                changed
            }
            Err(e) => {
                log::warn!("Keeping previous block palette: {e}");
                false
            }
        }
    }
}
