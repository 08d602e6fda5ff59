use std::future::Future;

pub mod postgres;

/// Maximum number of prior posts returned per lookup
pub const MAX_CONTEXT_POSTS: usize = 5;

pub trait ContextStore {
    /// Returns up to [`MAX_CONTEXT_POSTS`] recent posts published by `handle` on `platform`,
    /// newest first
    fn get_context_posts(
        &self,
        handle: &str,
        platform: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

impl<T: ContextStore + Send + Sync> ContextStore for &T {
    async fn get_context_posts(&self, handle: &str, platform: &str) -> anyhow::Result<Vec<String>> {
        (**self).get_context_posts(handle, platform).await
    }
}

/// Store used when no user-context backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContextStore;

impl ContextStore for NoContextStore {
    async fn get_context_posts(&self, _handle: &str, _platform: &str) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}
