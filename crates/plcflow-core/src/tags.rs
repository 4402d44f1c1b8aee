//! Tag registry: the named PLC variables blocks refer to.
//!
//! The registry is owned by the application and handed to whoever needs it;
//! components that display tags subscribe as [`Refreshable`] and are told
//! when the set of tags changes. Its contents travel inside a project
//! document as the `tags_configuration` object.

use crate::events::Refreshable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use thiserror::Error;

/// Longest accepted tag name.
pub const MAX_TAG_NAME_LEN: usize = 32;

/// Words that cannot be used as tag names, compared case-insensitively.
pub const RESERVED_WORDS: [&str; 11] = [
    "IF", "THEN", "ELSE", "END", "FOR", "WHILE", "TRUE", "FALSE", "AND", "OR", "NOT",
];

const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("Tag name cannot be empty")]
    Empty,
    #[error("Tag name '{0}' must start with a letter or underscore")]
    BadStart(String),
    #[error("Tag name '{0}' can only contain letters, numbers, and underscores")]
    BadCharacter(String),
    #[error("Tag name '{0}' exceeds 32 characters")]
    TooLong(String),
    #[error("Tag name '{0}' is a reserved keyword")]
    Reserved(String),
    #[error("Tag '{0}' already exists")]
    Duplicate(String),
    #[error("Unknown data type '{0}'")]
    UnknownDataType(String),
    #[error("Invalid tag configuration: {0}")]
    Parse(String),
}

/// Check a tag name against PLC naming rules.
pub fn validate_tag_name(name: &str) -> Result<(), TagError> {
    let Some(first) = name.chars().next() else {
        return Err(TagError::Empty);
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err(TagError::BadStart(name.to_string()));
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(TagError::BadCharacter(name.to_string()));
    }
    if name.chars().count() > MAX_TAG_NAME_LEN {
        return Err(TagError::TooLong(name.to_string()));
    }
    if RESERVED_WORDS.iter().any(|w| w.eq_ignore_ascii_case(name)) {
        return Err(TagError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Storage type of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Bool,
    Byte,
    Int,
    Word,
    Dword,
    Float,
    String,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bool => "BOOL",
            DataType::Byte => "BYTE",
            DataType::Int => "INT",
            DataType::Word => "WORD",
            DataType::Dword => "DWORD",
            DataType::Float => "FLOAT",
            DataType::String => "STRING",
        }
    }

    /// Bytes the controller reserves for one value.
    pub fn size_bytes(self) -> usize {
        match self {
            DataType::Bool | DataType::Byte => 1,
            DataType::Int | DataType::Word => 2,
            DataType::Dword | DataType::Float => 4,
            DataType::String => 256,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize_tag_type(s).ok_or_else(|| TagError::UnknownDataType(s.to_string()))
    }
}

/// Map a display type ("Digital Input", "Integer", ...) to its storage type.
pub fn normalize_tag_type(display: &str) -> Option<DataType> {
    let data_type = match display.trim() {
        "Digital Input" | "Digital Output" | "BOOL" | "Boolean" => DataType::Bool,
        "Analog Input" | "Analog Output" | "INT" | "Integer" => DataType::Int,
        "FLOAT" | "Float" => DataType::Float,
        "STRING" | "String" => DataType::String,
        "BYTE" | "Byte" => DataType::Byte,
        "WORD" | "Word" => DataType::Word,
        "DWORD" | "Double Word" => DataType::Dword,
        _ => return None,
    };
    Some(data_type)
}

/// Where a tag's value lives.
#[derive(Debug, Clone, PartialEq)]
pub enum TagSource {
    /// Bound to a controller pin.
    PhysicalIo {
        io_type: String,
        gpio_pin: String,
        physical_address: String,
    },
    /// A variable in controller memory.
    Software {
        memory_address: String,
        persistent: bool,
        array_size: u32,
        min_value: String,
        max_value: String,
    },
}

impl TagSource {
    pub fn software() -> Self {
        TagSource::Software {
            memory_address: String::new(),
            persistent: false,
            array_size: 1,
            min_value: "-32768".to_string(),
            max_value: "32767".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub name: String,
    pub data_type: DataType,
    pub initial_value: String,
    pub description: String,
    pub source: TagSource,
}

impl Tag {
    /// A software variable with default settings.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            initial_value: match data_type {
                DataType::Bool => "FALSE".to_string(),
                DataType::String => String::new(),
                _ => "0".to_string(),
            },
            description: String::new(),
            source: TagSource::software(),
        }
    }

    pub fn is_physical(&self) -> bool {
        matches!(self.source, TagSource::PhysicalIo { .. })
    }

    /// Bytes reserved in controller memory. Physical tags use none.
    pub fn memory_bytes(&self) -> usize {
        match self.source {
            TagSource::PhysicalIo { .. } => 0,
            TagSource::Software { array_size, .. } => self.data_type.size_bytes() * array_size.max(1) as usize,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct PhysicalIoRecord {
    name: String,
    io_type: String,
    gpio_pin: String,
    physical_address: String,
    data_type: String,
    initial_value: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct SoftwareVariableRecord {
    name: String,
    data_type: String,
    initial_value: String,
    memory_address: String,
    persistent: bool,
    array_size: u32,
    min_value: String,
    max_value: String,
    description: String,
}

impl Default for SoftwareVariableRecord {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: "INT".to_string(),
            initial_value: "0".to_string(),
            memory_address: String::new(),
            persistent: false,
            array_size: 1,
            min_value: "-32768".to_string(),
            max_value: "32767".to_string(),
            description: String::new(),
        }
    }
}

/// The `tags_configuration` object of a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
struct TagConfiguration {
    version: String,
    physical_io: Vec<PhysicalIoRecord>,
    hardware_registers: Vec<Value>,
    software_variables: Vec<SoftwareVariableRecord>,
    memory_allocation: serde_json::Map<String, Value>,
}

impl Default for TagConfiguration {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            physical_io: Vec::new(),
            hardware_registers: Vec::new(),
            software_variables: Vec::new(),
            memory_allocation: serde_json::Map::new(),
        }
    }
}

fn starter_tags() -> Vec<Tag> {
    [
        ("on", DataType::Bool),
        ("off", DataType::Bool),
        ("timer", DataType::Int),
        ("counter", DataType::Int),
        ("lessthan", DataType::Bool),
        ("bit", DataType::Bool),
    ]
    .into_iter()
    .map(|(name, data_type)| Tag::new(name, data_type))
    .collect()
}

/// Read access to tags, for components that only look names up.
pub trait TagLookup {
    fn tag(&self, name: &str) -> Option<&Tag>;

    fn tag_names(&self) -> Vec<&str>;

    /// Names of tags whose type is one of `types`.
    fn compatible_tags(&self, types: &[DataType]) -> Vec<&str>;
}

/// Ordered set of tags plus the components watching it.
#[derive(Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
    hardware_registers: Vec<Value>,
    memory_allocation: serde_json::Map<String, Value>,
    listeners: Vec<Rc<RefCell<dyn Refreshable>>>,
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagRegistry")
            .field("tags", &self.tags.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the starter tags of a new project.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.tags = starter_tags();
        registry
    }

    /// Replace every tag with the starter set, keeping subscribers.
    pub fn reset_to_defaults(&mut self) {
        self.tags = starter_tags();
        self.hardware_registers.clear();
        self.memory_allocation.clear();
        self.notify();
    }

    /// Register a component to be refreshed whenever tags change.
    pub fn subscribe(&mut self, listener: Rc<RefCell<dyn Refreshable>>) {
        self.listeners.push(listener);
    }

    fn notify(&self) {
        for listener in &self.listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => {
                    listener.refresh();
                }
                Err(_) => log::warn!("Tag listener is busy; skipping refresh"),
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.name == name)
    }

    /// Add a tag after validating its name.
    pub fn add(&mut self, tag: Tag) -> Result<(), TagError> {
        validate_tag_name(&tag.name)?;
        if self.contains(&tag.name) {
            return Err(TagError::Duplicate(tag.name));
        }
        log::debug!("Adding tag {} ({})", tag.name, tag.data_type);
        self.tags.push(tag);
        self.notify();
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.name != name);
        let removed = self.tags.len() != before;
        if removed {
            self.notify();
        }
        removed
    }

    /// Drop every software variable, keeping pin-bound tags.
    pub fn clear_software(&mut self) {
        self.tags.retain(Tag::is_physical);
        self.notify();
    }

    /// Bytes of controller memory claimed by software variables.
    pub fn memory_usage(&self) -> usize {
        self.tags.iter().map(Tag::memory_bytes).sum()
    }

    /// Serialize as a `tags_configuration` object.
    pub fn to_value(&self) -> Value {
        let mut config = TagConfiguration {
            hardware_registers: self.hardware_registers.clone(),
            memory_allocation: self.memory_allocation.clone(),
            ..TagConfiguration::default()
        };
        for tag in &self.tags {
            match &tag.source {
                TagSource::PhysicalIo {
                    io_type,
                    gpio_pin,
                    physical_address,
                } => config.physical_io.push(PhysicalIoRecord {
                    name: tag.name.clone(),
                    io_type: io_type.clone(),
                    gpio_pin: gpio_pin.clone(),
                    physical_address: physical_address.clone(),
                    data_type: tag.data_type.to_string(),
                    initial_value: tag.initial_value.clone(),
                    description: tag.description.clone(),
                }),
                TagSource::Software {
                    memory_address,
                    persistent,
                    array_size,
                    min_value,
                    max_value,
                } => config.software_variables.push(SoftwareVariableRecord {
                    name: tag.name.clone(),
                    data_type: tag.data_type.to_string(),
                    initial_value: tag.initial_value.clone(),
                    memory_address: memory_address.clone(),
                    persistent: *persistent,
                    array_size: *array_size,
                    min_value: min_value.clone(),
                    max_value: max_value.clone(),
                    description: tag.description.clone(),
                }),
            }
        }
        serde_json::to_value(config).unwrap_or(Value::Null)
    }

    /// Replace all tags with a `tags_configuration` object.
    ///
    /// Entries with an invalid name or unknown type are skipped. Returns the
    /// number of tags loaded.
    pub fn load_value(&mut self, value: &Value) -> Result<usize, TagError> {
        let config: TagConfiguration =
            serde_json::from_value(value.clone()).map_err(|e| TagError::Parse(e.to_string()))?;

        let mut tags: Vec<Tag> = Vec::new();
        let mut push = |tag: Tag| {
            let checked = validate_tag_name(&tag.name).and_then(|()| {
                if tags.iter().any(|t| t.name == tag.name) {
                    Err(TagError::Duplicate(tag.name.clone()))
                } else {
                    Ok(())
                }
            });
            match checked {
                Ok(()) => tags.push(tag),
                Err(e) => log::warn!("Skipping tag: {e}"),
            }
        };

        for record in config.physical_io {
            let Some(data_type) = normalize_tag_type(&record.data_type).or_else(|| normalize_tag_type(&record.io_type))
            else {
                log::warn!("Skipping tag {}: unknown data type '{}'", record.name, record.data_type);
                continue;
            };
            push(Tag {
                name: record.name,
                data_type,
                initial_value: record.initial_value,
                description: record.description,
                source: TagSource::PhysicalIo {
                    io_type: record.io_type,
                    gpio_pin: record.gpio_pin,
                    physical_address: record.physical_address,
                },
            });
        }
        for record in config.software_variables {
            let Some(data_type) = normalize_tag_type(&record.data_type) else {
                log::warn!("Skipping tag {}: unknown data type '{}'", record.name, record.data_type);
                continue;
            };
            push(Tag {
                name: record.name,
                data_type,
                initial_value: record.initial_value,
                description: record.description,
                source: TagSource::Software {
                    memory_address: record.memory_address,
                    persistent: record.persistent,
                    array_size: record.array_size,
                    min_value: record.min_value,
                    max_value: record.max_value,
                },
            });
        }

        self.tags = tags;
        self.hardware_registers = config.hardware_registers;
        self.memory_allocation = config.memory_allocation;
        log::info!("Loaded {} tags", self.tags.len());
        self.notify();
        Ok(self.tags.len())
    }
}

impl TagLookup for TagRegistry {
    fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }

    fn compatible_tags(&self, types: &[DataType]) -> Vec<&str> {
        self.tags
            .iter()
            .filter(|t| types.contains(&t.data_type))
            .map(|t| t.name.as_str())
            .collect()
    }
}
