//! Project files on disk.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::canvas::Canvas;
use crate::project::{self, ImportReport, PROJECT_EXTENSION, ProjectDocument};
use crate::tags::TagRegistry;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each project as `<id>.plc` in a base directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| StorageError::Io(format!("Failed to create storage directory: {}", e)))?;
        }
        Ok(Self { base_path })
    }

    /// File storage under the user's data directory (`<data-local>/plcflow/projects`).
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("plcflow").join("projects"))
    }

    fn project_path(&self, id: &str) -> PathBuf {
        let safe_id: String = id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{safe_id}.{PROJECT_EXTENSION}"))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Write through a temporary sibling and rename it into place, so a failed
/// write never leaves a truncated project behind.
fn write_atomic(path: &Path, contents: &str) -> StorageResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents).map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
    })
}

fn read_document(path: &Path) -> StorageResult<ProjectDocument> {
    let json =
        fs::read_to_string(path).map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    ProjectDocument::from_json(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e)))
}

impl Storage for FileStorage {
    fn save(&self, id: &str, document: &ProjectDocument) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.project_path(id);
        let json = match document.to_json() {
            Ok(j) => j,
            Err(e) => return Box::pin(async move { Err(StorageError::Serialization(e.to_string())) }),
        };

        Box::pin(async move { write_atomic(&path, &json) })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<ProjectDocument>> {
        let path = self.project_path(id);
        let id_owned = id.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id_owned));
            }
            read_document(&path)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.project_path(id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::Io(format!("Failed to delete {}: {}", path.display(), e)))?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries =
                fs::read_dir(&base).map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut ids = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == PROJECT_EXTENSION) {
                    if let Some(name) = path.file_stem().and_then(|n| n.to_str()) {
                        ids.push(name.to_string());
                    }
                }
            }
            ids.sort();
            Ok(ids)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.project_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}

/// Export the canvas and tags to an arbitrary file.
pub fn save_to_path(path: impl AsRef<Path>, canvas: &Canvas, tags: &TagRegistry) -> StorageResult<()> {
    let path = path.as_ref();
    let mut document = project::export(canvas);
    document.tags_configuration = Some(tags.to_value());
    let json = document
        .to_json()
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    write_atomic(path, &json)?;
    log::info!("Saved project to {}", path.display());
    Ok(())
}

/// Load a project file into the canvas and tag registry.
///
/// Nothing is touched unless the file reads and validates.
pub fn load_from_path(path: impl AsRef<Path>, canvas: &mut Canvas, tags: &mut TagRegistry) -> StorageResult<ImportReport> {
    let path = path.as_ref();
    let document = read_document(path)?;
    let report = project::import(canvas, &document);
    if let Some(config) = &document.tags_configuration {
        if let Err(e) = tags.load_value(config) {
            log::warn!("Ignoring tag configuration in {}: {e}", path.display());
        }
    }
    log::info!("Loaded project from {}", path.display());
    Ok(report)
}
