//! The open project: which document is being edited and whether it has
//! unsaved changes.

use super::{Storage, StorageResult};
use crate::canvas::Canvas;
use crate::project::{self, ImportReport, ProjectDocument};
use crate::tags::TagRegistry;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Name given to a project that has never been saved.
pub const DEFAULT_PROJECT_NAME: &str = "Untitled";

/// Tracks the project being edited and persists it through a [`Storage`] backend.
pub struct ProjectSession<S: Storage> {
    storage: Arc<S>,
    project_id: Option<String>,
    name: String,
    dirty: Rc<Cell<bool>>,
}

impl<S: Storage> ProjectSession<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            project_id: None,
            name: DEFAULT_PROJECT_NAME.to_string(),
            dirty: Rc::new(Cell::new(false)),
        }
    }

    /// Follow the canvas's modification events to keep the dirty flag current.
    pub fn attach(&self, canvas: &mut Canvas) {
        let dirty = Rc::clone(&self.dirty);
        canvas.subscribe(move |event| {
            if event.is_modification() {
                dirty.set(true);
            }
        });
    }

    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Window title: the project name with a trailing `*` while unsaved.
    pub fn title(&self) -> String {
        if self.is_dirty() {
            format!("{}*", self.name)
        } else {
            self.name.clone()
        }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Start over with an empty canvas and the starter tags.
    pub fn new_project(&mut self, canvas: &mut Canvas, tags: &mut TagRegistry) {
        canvas.clear();
        tags.reset_to_defaults();
        self.project_id = None;
        self.name = DEFAULT_PROJECT_NAME.to_string();
        self.dirty.set(false);
    }

    /// The full document for the current state.
    pub fn snapshot(canvas: &Canvas, tags: &TagRegistry) -> ProjectDocument {
        let mut document = project::export(canvas);
        document.tags_configuration = Some(tags.to_value());
        document
    }

    /// Save under the current id, or the project name if never saved.
    ///
    /// On failure the dirty flag is left set.
    pub async fn save(&mut self, canvas: &Canvas, tags: &TagRegistry) -> StorageResult<()> {
        let id = self.project_id.clone().unwrap_or_else(|| self.name.clone());
        self.save_as(&id, canvas, tags).await
    }

    pub async fn save_as(&mut self, id: &str, canvas: &Canvas, tags: &TagRegistry) -> StorageResult<()> {
        let document = Self::snapshot(canvas, tags);
        self.storage.save(id, &document).await?;
        log::info!("Saved project {id}");
        self.project_id = Some(id.to_string());
        self.name = id.to_string();
        self.dirty.set(false);
        Ok(())
    }

    /// Load a stored project into the canvas and tags.
    ///
    /// A missing or malformed document fails before anything is replaced.
    pub async fn open(&mut self, id: &str, canvas: &mut Canvas, tags: &mut TagRegistry) -> StorageResult<ImportReport> {
        let document = self.storage.load(id).await?;
        let report = project::import(canvas, &document);
        if let Some(config) = &document.tags_configuration {
            if let Err(e) = tags.load_value(config) {
                log::warn!("Ignoring tag configuration of {id}: {e}");
            }
        }
        log::info!("Opened project {id}");
        self.project_id = Some(id.to_string());
        self.name = id.to_string();
        self.dirty.set(false);
        Ok(report)
    }

    pub async fn list_projects(&self) -> StorageResult<Vec<String>> {
        self.storage.list().await
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{BoxFuture, MemoryStorage, StorageError, block_on};
    use crate::port::PortName;
    use crate::wire::Endpoint;
    use kurbo::{Point, Vec2};

    /// Storage whose writes always fail.
    struct ReadOnly;

    impl Storage for ReadOnly {
        fn save(&self, _: &str, _: &ProjectDocument) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("read-only".to_string())) })
        }
        fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<ProjectDocument>> {
            let id = id.to_string();
            Box::pin(async move { Err(StorageError::NotFound(id)) })
        }
        fn delete(&self, _: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }
        fn exists(&self, _: &str) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    fn session() -> (ProjectSession<MemoryStorage>, Canvas) {
        let session = ProjectSession::new(Arc::new(MemoryStorage::new()));
        let mut canvas = Canvas::default();
        session.attach(&mut canvas);
        (session, canvas)
    }

    #[test]
    fn test_edits_mark_dirty() {
        let (mut session, mut canvas) = session();
        assert!(!session.is_dirty());
        assert_eq!(session.title(), "Untitled");

        let id = canvas.drop_block("PID", Point::new(400.0, 400.0)).unwrap();
        assert!(session.is_dirty());
        assert_eq!(session.title(), "Untitled*");

        let tags = TagRegistry::with_defaults();
        block_on(session.save(&canvas, &tags)).unwrap();
        assert!(!session.is_dirty());

        canvas.move_block(id, Vec2::new(100.0, 0.0));
        assert!(session.is_dirty());
    }

    #[test]
    fn test_save_and_open_round_trip() {
        let (mut session, mut canvas) = session();
        let a = canvas.drop_block("Timer / Clock", Point::new(200.0, 200.0)).unwrap();
        let b = canvas.drop_block("Counter", Point::new(500.0, 200.0)).unwrap();
        canvas
            .connect(Endpoint::new(a, PortName::Right), Endpoint::new(b, PortName::Left))
            .unwrap();
        let mut tags = TagRegistry::with_defaults();
        block_on(session.save_as("mixer", &canvas, &tags)).unwrap();
        assert_eq!(session.project_id(), Some("mixer"));
        assert_eq!(session.title(), "mixer");
        let saved = project::export(&canvas);

        session.new_project(&mut canvas, &mut tags);
        assert_eq!(canvas.block_count(), 1);
        assert_eq!(session.project_id(), None);

        let report = block_on(session.open("mixer", &mut canvas, &mut tags)).unwrap();
        assert!(report.is_clean());
        assert!(!session.is_dirty());
        assert_eq!(project::export(&canvas), saved);
        assert_eq!(tags.len(), 6);
        assert_eq!(block_on(session.list_projects()).unwrap(), vec!["mixer"]);
    }

    #[test]
    fn test_failed_save_keeps_dirty() {
        let mut session = ProjectSession::new(Arc::new(ReadOnly));
        let mut canvas = Canvas::default();
        session.attach(&mut canvas);
        canvas.drop_block("PID", Point::new(400.0, 400.0)).unwrap();

        let result = block_on(session.save(&canvas, &TagRegistry::new()));
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(session.is_dirty());
        assert_eq!(session.project_id(), None);
        assert_eq!(canvas.block_count(), 2);
    }

    #[test]
    fn test_open_missing_leaves_canvas() {
        let (mut session, mut canvas) = session();
        canvas.drop_block("PID", Point::new(400.0, 400.0)).unwrap();
        let mut tags = TagRegistry::with_defaults();

        let result = block_on(session.open("nope", &mut canvas, &mut tags));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert_eq!(canvas.block_count(), 2);
        assert!(session.is_dirty());
    }

    #[test]
    fn test_open_malformed_leaves_canvas() {
        let (mut session, mut canvas) = session();
        session
            .storage()
            .insert_json("legacy", r#"{"blocks": [], "canvas_data": {}}"#)
            .unwrap();
        canvas.drop_block("PID", Point::new(400.0, 400.0)).unwrap();
        let mut tags = TagRegistry::with_defaults();

        let result = block_on(session.open("legacy", &mut canvas, &mut tags));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
        assert_eq!(canvas.block_count(), 2);
        assert_eq!(session.project_id(), None);
        assert!(session.is_dirty());
    }
}
