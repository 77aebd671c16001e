//! Form/dialog controller: one instance per open editing dialog.
//!
//! The controller exclusively owns its draft. Nothing reaches the store
//! until [`FormController::submit`], which validates, uploads the selected
//! file (if any), and then performs exactly one store mutation. Any failure
//! before or during that mutation leaves the draft, the selected file and
//! the dialog as they were, with a notification set.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use folio_shared::{ContentError, Entity, Location, Record, TagField, ValidationError};
use folio_store::{ContentStore, DocumentStore};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::blob::{BlobKey, BlobUploader};
use crate::error::ControllerError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// New collection item; the store assigns the id.
    Add,
    /// Existing collection item.
    Edit(String),
    /// The single document at the entity's fixed path.
    Singleton,
}

/// A file picked in the dialog, held in memory until submit.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Inline `data:` URL for showing the file before it is uploaded.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.bytes))
    }
}

/// Pending delete, shown as a separate confirmation dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: String,
    pub entity: &'static str,
}

impl DeleteConfirmation {
    pub fn prompt(&self) -> String {
        format!("Delete this {}? This cannot be undone.", self.entity)
    }
}

pub struct FormController<E, S: ?Sized = ContentStore> {
    store: Arc<S>,
    blobs: Arc<dyn BlobUploader>,
    mode: Option<FormMode>,
    draft: E,
    file: Option<SelectedFile>,
    pending_delete: Option<String>,
    notification: Option<String>,
}

impl<E: Entity, S: DocumentStore + ?Sized> FormController<E, S> {
    pub fn new(store: Arc<S>, blobs: Arc<dyn BlobUploader>) -> Self {
        Self {
            store,
            blobs,
            mode: None,
            draft: E::default(),
            file: None,
            pending_delete: None,
            notification: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.mode.is_some()
    }

    pub fn mode(&self) -> Option<&FormMode> {
        self.mode.as_ref()
    }

    pub fn draft(&self) -> &E {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut E {
        &mut self.draft
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    /// Message from the last failed operation.
    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn open_add(&mut self) -> Result<(), ControllerError> {
        self.require_collection("add")?;
        self.open(FormMode::Add, E::default());
        Ok(())
    }

    pub fn open_edit(&mut self, record: Record<E>) -> Result<(), ControllerError> {
        self.require_collection("edit")?;
        self.open(FormMode::Edit(record.id), record.entity);
        Ok(())
    }

    /// Open the dialog for a singleton document, seeded from its current
    /// value when there is one.
    pub fn open_singleton(&mut self, current: Option<E>) -> Result<(), ControllerError> {
        if E::LOCATION.is_collection() {
            return Err(ControllerError::WrongMode(format!(
                "{} is a collection, open an item instead",
                E::NAME
            )));
        }
        self.open(FormMode::Singleton, current.unwrap_or_default());
        Ok(())
    }

    /// Keep `file` for the next submit and return its preview URL.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<String, ControllerError> {
        if E::UPLOAD_CATEGORY.is_none() || !E::accepts_file(&file.content_type) {
            return Err(ValidationError::UnsupportedFileType(file.content_type).into());
        }
        let preview = file.preview_url();
        debug!(entity = E::NAME, file = %file.file_name, size = file.bytes.len(), "file selected");
        self.file = Some(file);
        Ok(preview)
    }

    pub fn add_tag(&mut self, field: TagField, input: &str) -> Result<bool, ControllerError> {
        Ok(self.tags(field)?.add(input))
    }

    pub fn remove_tag(&mut self, field: TagField, tag: &str) -> Result<bool, ControllerError> {
        Ok(self.tags(field)?.remove(tag))
    }

    /// Commit the draft. Returns the item id for collection entities.
    pub async fn submit(&mut self) -> Result<Option<String>, ControllerError> {
        let mode = self.mode.clone().ok_or(ControllerError::NotOpen)?;

        match self.commit(&mode).await {
            Ok(id) => {
                info!(entity = E::NAME, ?mode, id = ?id, "draft committed");
                self.reset();
                Ok(id)
            }
            Err(e) => {
                warn!(entity = E::NAME, ?mode, error = %e, "submit failed");
                self.notification = Some(format!("Could not save {}: {e}", E::NAME));
                Err(e)
            }
        }
    }

    pub fn request_delete(&mut self, id: &str) -> Result<DeleteConfirmation, ControllerError> {
        self.require_collection("delete")?;
        self.pending_delete = Some(id.to_string());
        Ok(DeleteConfirmation {
            id: id.to_string(),
            entity: E::NAME,
        })
    }

    pub async fn confirm_delete(
        &mut self,
        confirmation: DeleteConfirmation,
    ) -> Result<(), ControllerError> {
        if self.pending_delete.as_deref() != Some(confirmation.id.as_str()) {
            return Err(ControllerError::WrongMode(format!(
                "no pending delete for {}",
                confirmation.id
            )));
        }

        let result = match E::LOCATION.path().child(&confirmation.id) {
            Ok(path) => self.store.delete(&path).await.map_err(ControllerError::from),
            Err(e) => Err(ContentError::from(e).into()),
        };

        match result {
            Ok(()) => {
                info!(entity = E::NAME, id = %confirmation.id, "deleted");
                self.pending_delete = None;
                Ok(())
            }
            Err(e) => {
                warn!(entity = E::NAME, id = %confirmation.id, error = %e, "delete failed");
                self.notification = Some(format!("Could not delete {}: {e}", E::NAME));
                Err(e)
            }
        }
    }

    /// Discard the draft and close the dialog.
    pub fn close(&mut self) {
        self.reset();
    }

    fn open(&mut self, mode: FormMode, draft: E) {
        debug!(entity = E::NAME, ?mode, "dialog opened");
        self.mode = Some(mode);
        self.draft = draft;
        self.file = None;
        self.notification = None;
    }

    fn reset(&mut self) {
        self.mode = None;
        self.draft = E::default();
        self.file = None;
        self.notification = None;
    }

    fn require_collection(&self, action: &str) -> Result<(), ControllerError> {
        match E::LOCATION {
            Location::Collection(_) => Ok(()),
            Location::Singleton(path) => Err(ControllerError::WrongMode(format!(
                "cannot {action} {} at singleton path {path}",
                E::NAME
            ))),
        }
    }

    fn tags(&mut self, field: TagField) -> Result<&mut folio_shared::TagList, ControllerError> {
        self.draft
            .tags_mut(field)
            .ok_or_else(|| ValidationError::UnknownTagField(E::NAME, field.to_string()).into())
    }

    async fn commit(&self, mode: &FormMode) -> Result<Option<String>, ControllerError> {
        self.draft.validate()?;

        let mut entity = self.draft.clone();
        if let Some(file) = &self.file {
            entity.set_attachment_url(self.upload(file).await?);
        }

        let mut document = entity.to_document()?;
        let base = E::LOCATION.path();

        match mode {
            FormMode::Add => Ok(Some(self.store.push(&base, document).await?)),
            FormMode::Edit(id) => {
                keep_stored_attachment::<E>(&mut document);
                let path = base.child(id).map_err(ContentError::from)?;
                self.store.update(&path, document).await?;
                Ok(Some(id.clone()))
            }
            FormMode::Singleton if document.is_object() => {
                keep_stored_attachment::<E>(&mut document);
                self.store.update(&base, document).await?;
                Ok(None)
            }
            // A scalar document has no fields to merge.
            FormMode::Singleton => {
                self.store.write(&base, document).await?;
                Ok(None)
            }
        }
    }

    async fn upload(&self, file: &SelectedFile) -> Result<String, ControllerError> {
        let category = E::UPLOAD_CATEGORY
            .ok_or_else(|| ValidationError::UnsupportedFileType(file.content_type.clone()))?;
        let key = BlobKey::for_upload(category, &file.file_name)?;
        let handle = self.blobs.upload(file.bytes.clone(), &key).await?;
        let url = self.blobs.public_url(&handle).await?;
        debug!(entity = E::NAME, key = %key, url = %url, "attachment uploaded");
        Ok(url)
    }
}

/// An empty attachment URL in a merge patch would blank the stored one.
fn keep_stored_attachment<E: Entity>(document: &mut Value) {
    if let Value::Object(map) = document {
        if map.get(E::ATTACHMENT_FIELD).and_then(Value::as_str) == Some("") {
            map.remove(E::ATTACHMENT_FIELD);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use folio_shared::{
        AboutText, Home, Profile, Project, Rating, ResumePointer, StorePath, ToolGroup,
    };
    use folio_store::{Result as StoreResult, StoreError, Subscription};
    use serde_json::json;

    use crate::blob::BlobHandle;
    use crate::error::BlobError;

    /// Counts mutations and can be told to reject them.
    struct CountingStore {
        inner: ContentStore,
        mutations: AtomicUsize,
        fail: bool,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: ContentStore::open_in_memory().unwrap(),
                mutations: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                inner: ContentStore::open_in_memory().unwrap(),
                mutations: AtomicUsize::new(0),
                fail: true,
            })
        }

        fn mutations(&self) -> usize {
            self.mutations.load(Ordering::SeqCst)
        }

        fn count(&self) -> StoreResult<()> {
            self.mutations.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::InvalidValue("permission denied".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DocumentStore for CountingStore {
        async fn read(&self, path: &StorePath) -> StoreResult<Value> {
            self.inner.read(path).await
        }

        async fn subscribe(&self, path: &StorePath) -> StoreResult<Subscription> {
            self.inner.subscribe(path).await
        }

        async fn write(&self, path: &StorePath, value: Value) -> StoreResult<()> {
            self.count()?;
            self.inner.write(path, value).await
        }

        async fn update(&self, path: &StorePath, patch: Value) -> StoreResult<()> {
            self.count()?;
            self.inner.update(path, patch).await
        }

        async fn push(&self, collection: &StorePath, value: Value) -> StoreResult<String> {
            self.count()?;
            self.inner.push(collection, value).await
        }

        async fn delete(&self, path: &StorePath) -> StoreResult<()> {
            self.count()?;
            self.inner.delete(path).await
        }
    }

    #[derive(Default)]
    struct FakeUploader {
        fail: bool,
        keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobUploader for FakeUploader {
        async fn upload(&self, _bytes: Bytes, key: &BlobKey) -> Result<BlobHandle, BlobError> {
            if self.fail {
                return Err(BlobError::Rejected("network down".into()));
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(BlobHandle::new(key.as_str()))
        }

        async fn public_url(&self, handle: &BlobHandle) -> Result<String, BlobError> {
            Ok(format!("https://cdn.test/{}", handle.as_str()))
        }
    }

    fn uploader(fail: bool) -> Arc<FakeUploader> {
        Arc::new(FakeUploader {
            fail,
            ..Default::default()
        })
    }

    fn png() -> SelectedFile {
        SelectedFile::new("shot.png", "image/png", Bytes::from_static(b"png"))
    }

    #[tokio::test]
    async fn test_add_pushes_and_resets() {
        let store = CountingStore::new();
        let mut form: FormController<Project, _> = FormController::new(store.clone(), uploader(false));

        form.open_add().unwrap();
        form.draft_mut().project_name = "Folio".into();
        form.add_tag(TagField::Tools(ToolGroup::Backend), "axum").unwrap();
        let preview = form.select_file(png()).unwrap();
        assert!(preview.starts_with("data:image/png;base64,"));

        let id = form.submit().await.unwrap().unwrap();
        assert!(!form.is_open());
        assert_eq!(form.draft(), &Project::default());
        assert_eq!(store.mutations(), 1);

        let path = StorePath::parse("MyProjects").unwrap().child(&id).unwrap();
        let stored = Project::from_document(&path, store.read(&path).await.unwrap()).unwrap();
        assert_eq!(stored.project_name, "Folio");
        assert_eq!(stored.backend_tools.as_slice(), ["axum"]);
        assert!(stored.image_url.starts_with("https://cdn.test/projectImages/"));
        assert!(stored.image_url.ends_with("-shot.png"));
    }

    #[tokio::test]
    async fn test_duplicate_tags_persist_once() {
        let store = CountingStore::new();
        let mut form: FormController<Home, _> = FormController::new(store.clone(), uploader(false));

        form.open_singleton(None).unwrap();
        assert!(form.add_tag(TagField::Tags, "Rust").unwrap());
        assert!(!form.add_tag(TagField::Tags, "  Rust ").unwrap());
        form.submit().await.unwrap();

        let value = store.read(&StorePath::from_static("MyHome/tags")).await.unwrap();
        assert_eq!(value, json!(["Rust"]));
    }

    #[tokio::test]
    async fn test_remove_tag_exact_match() {
        let store = CountingStore::new();
        let mut form: FormController<Home, _> = FormController::new(store, uploader(false));
        form.open_singleton(None).unwrap();
        for tag in ["a", "b", "B", "c"] {
            form.add_tag(TagField::Tags, tag).unwrap();
        }

        assert!(form.remove_tag(TagField::Tags, "b").unwrap());
        assert!(!form.remove_tag(TagField::Tags, "x").unwrap());
        assert_eq!(form.draft().tags.as_slice(), ["a", "B", "c"]);
    }

    #[tokio::test]
    async fn test_unknown_tag_field_rejected() {
        let store = CountingStore::new();
        let mut form: FormController<Home, _> = FormController::new(store, uploader(false));
        form.open_singleton(None).unwrap();
        let err = form.add_tag(TagField::LearnedTags, "x").unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Validation(ValidationError::UnknownTagField("home", _))
        ));
    }

    #[tokio::test]
    async fn test_upload_failure_aborts_before_store() {
        let store = CountingStore::new();
        let projects = StorePath::from_static("MyProjects");
        let id = store
            .inner
            .push(&projects, json!({ "projectName": "Old", "imageUrl": "https://cdn.test/old.png" }))
            .await
            .unwrap();
        let path = projects.child(&id).unwrap();
        let existing = Project::from_document(&path, store.read(&path).await.unwrap()).unwrap();

        let mut form = FormController::new(store.clone(), uploader(true));
        form.open_edit(Record::new(id.clone(), existing)).unwrap();
        form.draft_mut().project_name = "New".into();
        form.select_file(png()).unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(err, ControllerError::Upload(_)));
        assert_eq!(store.mutations(), 0);
        assert!(form.is_open());
        assert_eq!(form.draft().project_name, "New");
        assert!(form.selected_file().is_some());
        assert!(form.notification().is_some());

        let stored = store.read(&path).await.unwrap();
        assert_eq!(stored["imageUrl"], "https://cdn.test/old.png");
        assert_eq!(stored["projectName"], "Old");
    }

    #[tokio::test]
    async fn test_edit_without_image_keeps_stored_url() {
        let store = CountingStore::new();
        let projects = StorePath::from_static("MyProjects");
        let id = store
            .inner
            .push(&projects, json!({ "projectName": "Old", "imageUrl": "https://cdn.test/old.png" }))
            .await
            .unwrap();

        let mut form: FormController<Project, _> = FormController::new(store.clone(), uploader(false));
        form.open_edit(Record::new(id.clone(), Project {
            project_name: "Renamed".into(),
            ..Default::default()
        }))
        .unwrap();
        form.submit().await.unwrap();

        let stored = store.read(&projects.child(&id).unwrap()).await.unwrap();
        assert_eq!(stored["projectName"], "Renamed");
        assert_eq!(stored["imageUrl"], "https://cdn.test/old.png");
    }

    #[tokio::test]
    async fn test_rating_out_of_range_never_reaches_store() {
        let store = CountingStore::new();
        let blobs = uploader(false);
        let mut form: FormController<Rating, _> = FormController::new(store.clone(), blobs.clone());

        form.open_add().unwrap();
        form.draft_mut().name = "Grace".into();
        form.draft_mut().rating = 7.0;
        form.select_file(png()).unwrap();

        let err = form.submit().await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Validation(ValidationError::RatingOutOfRange(_))
        ));
        assert_eq!(store.mutations(), 0);
        assert!(blobs.keys.lock().unwrap().is_empty());
        assert!(form.is_open());
    }

    #[tokio::test]
    async fn test_store_failure_keeps_draft() {
        let store = CountingStore::failing();
        let mut form: FormController<Profile, _> = FormController::new(store.clone(), uploader(false));
        form.open_singleton(None).unwrap();
        form.draft_mut().name = "Ada".into();

        assert!(matches!(form.submit().await, Err(ControllerError::Store(_))));
        assert_eq!(store.mutations(), 1);
        assert_eq!(form.draft().name, "Ada");
        assert!(form.notification().unwrap().contains("profile"));
    }

    #[tokio::test]
    async fn test_singleton_submit_merges() {
        let store = CountingStore::new();
        store
            .inner
            .write(
                &StorePath::from_static("MyProfile"),
                json!({ "name": "Ada", "legacyField": "keep" }),
            )
            .await
            .unwrap();

        let mut form: FormController<Profile, _> = FormController::new(store.clone(), uploader(false));
        form.open_singleton(Some(Profile {
            name: "Ada L.".into(),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(form.submit().await.unwrap(), None);

        let stored = store.read(&StorePath::from_static("MyProfile")).await.unwrap();
        assert_eq!(stored["name"], "Ada L.");
        assert_eq!(stored["legacyField"], "keep");
    }

    #[tokio::test]
    async fn test_singleton_rejects_collection_modes() {
        let store = CountingStore::new();
        let mut form: FormController<Profile, _> = FormController::new(store.clone(), uploader(false));
        assert!(matches!(form.open_add(), Err(ControllerError::WrongMode(_))));
        assert!(form.request_delete("x").is_err());

        let mut projects: FormController<Project, _> = FormController::new(store, uploader(false));
        assert!(projects.open_singleton(None).is_err());
    }

    #[tokio::test]
    async fn test_submit_requires_open_dialog() {
        let store = CountingStore::new();
        let mut form: FormController<Project, _> = FormController::new(store, uploader(false));
        assert!(matches!(form.submit().await, Err(ControllerError::NotOpen)));
    }

    #[tokio::test]
    async fn test_file_type_checks() {
        let store = CountingStore::new();
        let pdf = SelectedFile::new("cv.pdf", "application/pdf", Bytes::from_static(b"%PDF"));

        let mut resume: FormController<ResumePointer, _> =
            FormController::new(store.clone(), uploader(false));
        resume.open_singleton(None).unwrap();
        assert!(resume.select_file(png()).is_err());
        assert!(resume.select_file(pdf.clone()).is_ok());
        resume.submit().await.unwrap();
        let url = store
            .read(&StorePath::from_static("Downloadresume/resumeUrl"))
            .await
            .unwrap();
        assert!(url.as_str().unwrap().contains("resumeFiles/"));

        let mut project: FormController<Project, _> = FormController::new(store, uploader(false));
        project.open_add().unwrap();
        assert!(project.select_file(pdf).is_err());
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let store = CountingStore::new();
        let projects = StorePath::from_static("MyProjects");
        let id = store
            .inner
            .push(&projects, json!({ "projectName": "Gone" }))
            .await
            .unwrap();

        let mut form: FormController<Project, _> = FormController::new(store.clone(), uploader(false));
        let stale = DeleteConfirmation {
            id: id.clone(),
            entity: "project",
        };
        assert!(form.confirm_delete(stale).await.is_err());
        assert_eq!(store.mutations(), 0);

        let confirmation = form.request_delete(&id).unwrap();
        assert!(confirmation.prompt().contains("project"));
        form.confirm_delete(confirmation).await.unwrap();

        assert_eq!(store.mutations(), 1);
        assert!(!store.inner.exists(&projects.child(&id).unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_scalar_singleton_is_replaced() {
        let store = CountingStore::new();
        let mut form: FormController<AboutText, _> = FormController::new(store.clone(), uploader(false));
        let path = StorePath::from_static("your-about-text");

        form.open_singleton(None).unwrap();
        form.draft_mut().text = "First".into();
        form.submit().await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), json!("First"));

        form.open_singleton(None).unwrap();
        form.draft_mut().text = "Second".into();
        form.submit().await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), json!("Second"));
        assert_eq!(store.mutations(), 2);

        form.open_singleton(None).unwrap();
        assert!(form.submit().await.is_err());
        assert_eq!(store.mutations(), 2);
    }
}
