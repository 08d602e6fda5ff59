use std::sync::{Arc, Mutex};

use post_pulse::{AudienceAnalyzer, Error, Result, Stage};

pub const AUDIENCE: &str = "Core audience: remote-first team leads.";

#[derive(Clone)]
pub struct MockAudienceAnalyzer {
    pub summary: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    /// Message and fatal flag of the upstream error every call fails with
    pub fail_with: Option<(String, bool)>,
}

impl Default for MockAudienceAnalyzer {
    fn default() -> Self {
        Self {
            summary: AUDIENCE.to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }
}

impl MockAudienceAnalyzer {
    pub fn failing(msg: &str, fatal: bool) -> Self {
        Self {
            fail_with: Some((msg.to_string(), fatal)),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl AudienceAnalyzer for MockAudienceAnalyzer {
    async fn describe_audience(&self, text: &str) -> Result<String> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some((ref message, fatal)) = self.fail_with {
            return Err(Error::Upstream {
                stage: Stage::Audience,
                message: message.clone(),
                fatal,
            });
        }
        Ok(self.summary.clone())
    }
}
