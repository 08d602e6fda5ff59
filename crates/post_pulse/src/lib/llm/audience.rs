use std::future::Future;

use crate::{error::Result, text::char_len};

/// Identifies who a source text is written for. The summary is threaded into the
/// analyzer and generator prompts of every pair in the run.
pub trait AudienceAnalyzer {
    /// Texts shorter than this carry too little signal to describe an audience
    const MIN_TEXT_CHARS: usize = 100;

    /// Free-form summary of the core audience of `text`
    fn describe_audience(&self, text: &str) -> impl Future<Output = Result<String>> + Send;

    /// Returns `None` when the text is too short or the model has nothing to say
    fn extract_audience(&self, text: &str) -> impl Future<Output = Result<Option<String>>> + Send
    where
        Self: Sync,
    {
        async move {
            if char_len(text.trim()) < Self::MIN_TEXT_CHARS {
                tracing::debug!("Text too short for audience analysis, skipping");
                return Ok(None);
            }

            let summary = self.describe_audience(text).await?;
            let summary = summary.trim();
            Ok((!summary.is_empty()).then(|| summary.to_string()))
        }
    }
}

/// Leaves every run without an audience summary
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudienceAnalysis;

impl AudienceAnalyzer for NoAudienceAnalysis {
    async fn describe_audience(&self, _text: &str) -> Result<String> {
        Ok(String::new())
    }

    async fn extract_audience(&self, _text: &str) -> Result<Option<String>> {
        Ok(None)
    }
}
