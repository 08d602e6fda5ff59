use std::sync::{Arc, Mutex};

use post_pulse::{Error, Platform, Result, Stage, StyleMatcher};

/// Marker the mock appends to every restyled post
pub const STYLED: &str = "(in your voice)";

#[derive(Clone, Default)]
pub struct MockStyleMatcher {
    /// Examples handed to each style analysis
    pub examples: Arc<Mutex<Vec<Vec<String>>>>,
    pub adapt_calls: Arc<Mutex<Vec<(String, Platform)>>>,
    /// Message and fatal flag of the upstream error every adaptation fails with
    pub fail_with: Option<(String, bool)>,
}

impl MockStyleMatcher {
    pub fn failing(msg: &str, fatal: bool) -> Self {
        Self {
            fail_with: Some((msg.to_string(), fatal)),
            ..Default::default()
        }
    }

    pub fn adapt_count(&self) -> usize {
        self.adapt_calls.lock().unwrap().len()
    }
}

impl StyleMatcher for MockStyleMatcher {
    async fn describe_style(&self, examples: &[&str], _platform: Platform) -> Result<String> {
        self.examples
            .lock()
            .unwrap()
            .push(examples.iter().map(|e| e.to_string()).collect());
        Ok("Short sentences, lots of energy.".into())
    }

    async fn adapt_post(
        &self,
        body: &str,
        _style_guide: &str,
        _examples: &[&str],
        platform: Platform,
        _max_chars: usize,
    ) -> Result<String> {
        self.adapt_calls
            .lock()
            .unwrap()
            .push((body.to_string(), platform));
        if let Some((ref message, fatal)) = self.fail_with {
            return Err(Error::Upstream {
                stage: Stage::StyleMatching,
                message: message.clone(),
                fatal,
            });
        }
        Ok(format!("{body} {STYLED}"))
    }

    async fn shorten_adapted(&self, body: &str, _platform: Platform, max_chars: usize) -> Result<String> {
        Ok(body.chars().take(max_chars).collect())
    }
}
