use std::future::Future;

use crate::error::Result;

/// Source of raw document text, addressed by URL or path.
///
/// One call returns the whole text blob. Failures must be reported as
/// [`crate::error::Error::Fetch`].
pub trait DocumentProvider: Send + Sync {
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}
