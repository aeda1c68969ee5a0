use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

const BLOB_PREFIX: &str = "blob:voice-assistant/";

/// Revocable reference to bytes held in a [`BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blob(reference: &str) -> bool {
        reference.starts_with(BLOB_PREFIX)
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub bytes: Arc<[u8]>,
    pub mime: Option<String>,
}

/// Process-wide table of downloaded binaries. Whoever calls `create` owns the
/// returned reference and must `revoke` it when it is discarded.
#[derive(Clone, Default)]
pub struct BlobStore {
    entries: Arc<RwLock<HashMap<String, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, bytes: Vec<u8>, mime: Option<String>) -> BlobUrl {
        let url = BlobUrl(format!("{BLOB_PREFIX}{}", Uuid::new_v4()));
        let blob = Blob {
            bytes: Arc::from(bytes),
            mime,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.0.clone(), blob);
        url
    }

    pub fn get(&self, reference: &str) -> Option<Blob> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
    }

    /// Releases the bytes behind `reference`. Returns false if it was not live.
    pub fn revoke(&self, reference: &str) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(reference)
            .is_some()
    }

    pub fn revoke_all<'a>(&self, urls: impl IntoIterator<Item = &'a BlobUrl>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        urls.into_iter()
            .filter(|url| entries.remove(url.as_str()).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::{BlobStore, BlobUrl};
    use std::collections::HashSet;

    #[test]
    fn created_blobs_are_readable_until_revoked() {
        let store = BlobStore::new();
        let url = store.create(vec![1, 2, 3], Some("audio/wav".to_string()));

        assert!(BlobUrl::is_blob(url.as_str()));
        let blob = store.get(url.as_str()).expect("blob should be live");
        assert_eq!(&blob.bytes[..], &[1, 2, 3]);
        assert_eq!(blob.mime.as_deref(), Some("audio/wav"));

        assert!(store.revoke(url.as_str()));
        assert!(store.get(url.as_str()).is_none());
        assert!(!store.revoke(url.as_str()));
    }

    #[test]
    fn references_are_unique() {
        let store = BlobStore::new();
        let urls: HashSet<String> = (0..64)
            .map(|_| store.create(Vec::new(), None).to_string())
            .collect();
        assert_eq!(urls.len(), 64);
        assert_eq!(store.len(), 64);
    }

    #[test]
    fn revoke_all_counts_only_live_handles() {
        let store = BlobStore::new();
        let a = store.create(vec![0], None);
        let b = store.create(vec![1], None);
        store.revoke(b.as_str());

        assert_eq!(store.revoke_all([&a, &b]), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn remote_urls_are_not_blobs() {
        assert!(!BlobUrl::is_blob("https://img.example.com/a.png"));
    }
}
