use std::sync::{Arc, Mutex};

use context_store::ContextStore;

#[derive(Clone, Default)]
pub struct MockContextStore {
    pub posts: Vec<String>,
    pub calls: Arc<Mutex<Vec<(String, String)>>>,
    pub fail_with: Option<String>,
}

impl MockContextStore {
    pub fn new(posts: &[&str]) -> Self {
        Self {
            posts: posts.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Default::default()
        }
    }
}

impl ContextStore for MockContextStore {
    async fn get_context_posts(&self, handle: &str, platform: &str) -> anyhow::Result<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .push((handle.to_string(), platform.to_string()));
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.posts.clone())
    }
}
