//! Flyer uploads collected for one analysis run.
//!
//! Every entry owns a [`PreviewHandle`]. The handle is released when the entry
//! leaves the collection (remove, clear, or drop), never twice.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use base64ct::{Base64, Encoding};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::errors::ValidationError;

pub const PDF_MIME: &str = "application/pdf";

/// One uploaded file: name, MIME type and contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlyerFile {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl FlyerFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Bytes>,
    ) -> Result<Self, ValidationError> {
        let content_type = content_type.into();
        if !is_supported_mime(&content_type) {
            return Err(ValidationError::UnsupportedFileType(content_type));
        }
        Ok(Self {
            file_name: file_name.into(),
            content_type,
            body: body.into(),
        })
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type == PDF_MIME
    }

    fn membership_key(&self) -> (&str, &str, &[u8]) {
        (&self.file_name, &self.content_type, &self.body)
    }
}

pub fn is_supported_mime(ct: &str) -> bool {
    ct.starts_with("image/") || ct == PDF_MIME
}

/// Hands out preview URLs and tracks which ones are still alive.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<u64, Option<String>>>,
    released: AtomicU64,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn create(self: &Arc<Self>, file: &FlyerFile) -> PreviewHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        // PDFs get an icon instead of a thumbnail.
        let url = (!file.is_pdf())
            .then(|| format!("data:{};base64,{}", file.content_type, Base64::encode_string(&file.body)));
        self.live_map().insert(id, url.clone());
        debug!(preview_id = id, file = %file.file_name, "preview created");
        PreviewHandle {
            id,
            url,
            registry: Arc::clone(self),
        }
    }

    fn release(&self, id: u64) {
        if self.live_map().remove(&id).is_some() {
            self.released.fetch_add(1, Ordering::Relaxed);
            debug!(preview_id = id, "preview released");
        } else {
            warn!(preview_id = id, "preview already released");
        }
    }

    /// Number of previews currently held by some collection entry.
    pub fn live_count(&self) -> usize {
        self.live_map().len()
    }

    /// Total number of releases since the registry was created.
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    fn live_map(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Option<String>>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Thumbnail reference for one collection entry. Released on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    url: Option<String>,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

#[derive(Debug)]
pub struct FlyerEntry {
    pub file: FlyerFile,
    pub preview: PreviewHandle,
}

/// Ordered set of flyer files. Membership is keyed by name, type and content.
#[derive(Debug)]
pub struct FlyerFiles {
    entries: Vec<FlyerEntry>,
    previews: Arc<PreviewRegistry>,
}

impl Default for FlyerFiles {
    fn default() -> Self {
        Self::new(PreviewRegistry::new())
    }
}

impl FlyerFiles {
    pub fn new(previews: Arc<PreviewRegistry>) -> Self {
        Self {
            entries: Vec::new(),
            previews,
        }
    }

    /// Appends files not already in the collection. Returns how many were added.
    pub fn add(&mut self, files: impl IntoIterator<Item = FlyerFile>) -> usize {
        let mut added = 0;
        for file in files {
            if self
                .entries
                .iter()
                .any(|e| e.file.membership_key() == file.membership_key())
            {
                debug!(file = %file.file_name, "duplicate flyer file skipped");
                continue;
            }
            let preview = self.previews.create(&file);
            self.entries.push(FlyerEntry { file, preview });
            added += 1;
        }
        added
    }

    pub fn remove(&mut self, index: usize) -> Option<FlyerFile> {
        if index >= self.entries.len() {
            return None;
        }
        let FlyerEntry { file, preview } = self.entries.remove(index);
        drop(preview);
        Some(file)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FlyerEntry] {
        &self.entries
    }

    /// Cheap copy of the files (bodies are reference counted).
    pub fn snapshot(&self) -> Vec<FlyerFile> {
        self.entries.iter().map(|e| e.file.clone()).collect()
    }

    pub fn previews(&self) -> &Arc<PreviewRegistry> {
        &self.previews
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(name: &str, len: usize) -> FlyerFile {
        FlyerFile::new(name, "image/jpeg", vec![0xFFu8; len]).unwrap()
    }

    #[test]
    fn rejects_unsupported_types() {
        let err = FlyerFile::new("notes.txt", "text/plain", Bytes::from_static(b"hi")).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedFileType("text/plain".into()));
        assert!(FlyerFile::new("a.pdf", PDF_MIME, Bytes::from_static(b"%PDF")).is_ok());
    }

    #[test]
    fn duplicates_are_skipped() {
        let mut files = FlyerFiles::default();
        assert_eq!(files.add([jpeg("a.jpg", 4), jpeg("b.jpg", 4)]), 2);
        assert_eq!(files.add([jpeg("a.jpg", 4)]), 0);
        assert_eq!(files.len(), 2);
        assert_eq!(files.previews().live_count(), 2);
    }

    #[test]
    fn same_name_and_size_with_different_bytes_are_distinct() {
        let pasted = |body: &'static [u8]| {
            FlyerFile::new("pasted-image.png", "image/png", Bytes::from_static(body)).unwrap()
        };
        let mut files = FlyerFiles::default();
        assert_eq!(files.add([pasted(b"AAAA"), pasted(b"BBBB")]), 2);
        assert_eq!(files.add([pasted(b"AAAA")]), 0);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn remove_releases_preview_exactly_once() {
        let registry = PreviewRegistry::new();
        let mut files = FlyerFiles::new(Arc::clone(&registry));
        files.add([jpeg("a.jpg", 4), jpeg("b.jpg", 8), jpeg("c.jpg", 16)]);

        let removed = files.remove(1).unwrap();
        assert_eq!(removed.file_name, "b.jpg");
        assert_eq!(registry.released_count(), 1);
        assert_eq!(registry.live_count(), 2);

        assert!(files.remove(5).is_none());
        assert_eq!(registry.released_count(), 1);
        assert_eq!(
            files.snapshot().iter().map(|f| f.file_name.as_str()).collect::<Vec<_>>(),
            vec!["a.jpg", "c.jpg"]
        );
    }

    #[test]
    fn repeated_cycles_do_not_leak() {
        let registry = PreviewRegistry::new();
        let mut files = FlyerFiles::new(Arc::clone(&registry));
        for round in 0..10 {
            files.add([jpeg(&format!("{round}.jpg"), 4)]);
            files.remove(0);
        }
        files.add([jpeg("x.jpg", 1), jpeg("y.jpg", 2)]);
        files.clear();

        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 12);
    }

    #[test]
    fn dropping_collection_releases_everything() {
        let registry = PreviewRegistry::new();
        {
            let mut files = FlyerFiles::new(Arc::clone(&registry));
            files.add([jpeg("a.jpg", 1), jpeg("b.jpg", 2)]);
        }
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.released_count(), 2);
    }

    #[test]
    fn pdf_has_no_thumbnail() {
        let mut files = FlyerFiles::default();
        files.add([
            FlyerFile::new("a.pdf", PDF_MIME, Bytes::from_static(b"%PDF")).unwrap(),
            FlyerFile::new("b.png", "image/png", Bytes::from_static(b"png")).unwrap(),
        ]);
        assert!(files.entries()[0].preview.url().is_none());
        assert_eq!(files.entries()[1].preview.url(), Some("data:image/png;base64,cG5n"));
    }
}
