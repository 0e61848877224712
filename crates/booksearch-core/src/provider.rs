//! Document providers: local files, in-memory fixtures and a per-URL cache.
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::resolve_with_base;
use crate::error::{Error, Result};
use crate::traits::DocumentProvider;

/// Reads documents from disk. Accepts plain paths and `file://` URLs;
/// relative paths resolve against `base_dir`.
#[derive(Debug, Clone)]
pub struct FileDocumentProvider {
    base_dir: PathBuf,
}

impl FileDocumentProvider {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self { Self { base_dir: base_dir.into() } }

    pub fn resolve(&self, url: &str) -> PathBuf {
        let path = url.strip_prefix("file://").unwrap_or(url);
        resolve_with_base(&self.base_dir, path)
    }
}

impl DocumentProvider for FileDocumentProvider {
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        let path = self.resolve(url);
        let url = url.to_string();
        async move {
            debug!(url = %url, path = %path.display(), "Reading document");
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Error::Fetch { url: url.clone(), reason: format!("{}: {}", path.display(), e) })?;
            match String::from_utf8(bytes) {
                Ok(text) => Ok(text),
                Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
            }
        }
    }
}

/// Serves documents from memory; unknown URLs fail like a missing remote file.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentProvider {
    documents: HashMap<String, String>,
}

impl StaticDocumentProvider {
    pub fn new() -> Self { Self::default() }

    pub fn with_document(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents.insert(url.into(), text.into());
        self
    }
}

impl DocumentProvider for StaticDocumentProvider {
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        let found = self
            .documents
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Fetch { url: url.to_string(), reason: "no such document".to_string() });
        async move { found }
    }
}

/// Memoizes fetched documents per URL for the lifetime of the provider.
/// Failed fetches are not cached.
pub struct CachingProvider<P> {
    inner: P,
    cache: RwLock<HashMap<String, String>>,
}

impl<P: DocumentProvider> CachingProvider<P> {
    pub fn new(inner: P) -> Self { Self { inner, cache: RwLock::new(HashMap::new()) } }

    pub async fn cached_len(&self) -> usize { self.cache.read().await.len() }
}

impl<P: DocumentProvider> DocumentProvider for CachingProvider<P> {
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        async move {
            if let Some(text) = self.cache.read().await.get(url) {
                debug!(url = %url, "Document cache hit");
                return Ok(text.clone());
            }
            let text = self.inner.fetch_document(url).await?;
            self.cache.write().await.insert(url.to_string(), text.clone());
            Ok(text)
        }
    }
}
