use std::{future::Future, time::Instant};

use crate::{
    error::{Error, Result, Stage},
    platform::Platform,
    text::{char_len, trim_to_sentence},
    types::{Annotation, PlatformPost, Topic},
};

pub trait PostGenerator {
    /// Drafts the post body, aiming for at most `max_chars` characters
    fn write_post(
        &self,
        topic: &Topic,
        annotation: &Annotation,
        platform: Platform,
        max_chars: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Corrective pass for a draft that came back over `max_chars`
    fn shorten_post(
        &self,
        draft: &str,
        platform: Platform,
        max_chars: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Produces a finished post that is guaranteed to respect the platform's
    /// character limit, `original_url` included.
    ///
    /// An over-long draft gets one `shorten_post` pass; if that is still too long it
    /// is cut at the last whole sentence that fits, and failing that the call errors
    /// with [`Error::ConstraintViolation`].
    fn generate(
        &self,
        topic: &Topic,
        annotation: &Annotation,
        platform: Platform,
        original_url: Option<&str>,
    ) -> impl Future<Output = Result<PlatformPost>> + Send
    where
        Self: Sync,
    {
        async move {
            let started = Instant::now();
            let budget = PostBudget::new(platform, original_url)?;

            let raw = self
                .write_post(topic, annotation, platform, budget.body_chars)
                .await?;
            let draft = clean_draft(&raw, Stage::Generation)?;
            let body = if budget.fits(&draft) {
                draft
            } else {
                tracing::debug!(
                    topic_id = topic.id,
                    %platform,
                    length = char_len(&draft),
                    budget = budget.body_chars,
                    "Draft over budget, requesting shorter version"
                );
                let raw = self
                    .shorten_post(&draft, platform, budget.body_chars)
                    .await?;
                budget.settle(clean_draft(&raw, Stage::Generation)?)?
            };

            Ok(PlatformPost {
                post_content: budget.finish(body, original_url),
                topic_id: topic.id,
                topic_name: topic.name.clone(),
                primary_emotion: annotation.primary_emotion,
                content_strategy: annotation.content_strategy,
                processing_time: started.elapsed().as_secs_f64(),
                platform,
            })
        }
    }
}

/// Characters left for the post body once an appended URL is accounted for
#[derive(Debug, Clone, Copy)]
pub(crate) struct PostBudget {
    platform: Platform,
    limit: usize,
    url_chars: usize,
    pub(crate) body_chars: usize,
}

impl PostBudget {
    pub(crate) fn new(platform: Platform, original_url: Option<&str>) -> Result<Self> {
        let limit = platform.config().character_limit;
        let url_chars = original_url.map(|url| char_len(url) + 1).unwrap_or(0);
        let body_chars = limit.saturating_sub(url_chars);
        if body_chars == 0 {
            return Err(Error::ConstraintViolation {
                platform,
                length: url_chars,
                limit,
            });
        }
        Ok(PostBudget {
            platform,
            limit,
            url_chars,
            body_chars,
        })
    }

    pub(crate) fn fits(&self, body: &str) -> bool {
        char_len(body) <= self.body_chars
    }

    /// Last resort for a body that is still too long after its corrective pass:
    /// cut at the last whole sentence that fits
    pub(crate) fn settle(&self, body: String) -> Result<String> {
        if self.fits(&body) {
            return Ok(body);
        }
        let trimmed =
            trim_to_sentence(&body, self.body_chars).ok_or(Error::ConstraintViolation {
                platform: self.platform,
                length: char_len(&body) + self.url_chars,
                limit: self.limit,
            })?;
        tracing::warn!(
            platform = %self.platform,
            "Shortened draft still over budget, trimmed at sentence boundary"
        );
        Ok(trimmed.to_string())
    }

    pub(crate) fn finish(&self, body: String, original_url: Option<&str>) -> String {
        match original_url {
            Some(url) => format!("{body} {url}"),
            None => body,
        }
    }
}

/// Strips whitespace and wrapping quotes models like to add
pub(crate) fn clean_draft(raw: &str, stage: Stage) -> Result<String> {
    let mut s = raw.trim();
    for (open, close) in [('"', '"'), ('“', '”')] {
        if s.len() > 1 && s.starts_with(open) && s.ends_with(close) {
            s = s[open.len_utf8()..s.len() - close.len_utf8()].trim();
        }
    }
    if s.is_empty() {
        return Err(Error::upstream(stage, "model returned an empty post"));
    }
    Ok(s.to_string())
}
