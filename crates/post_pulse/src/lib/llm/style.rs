use std::future::Future;

use itertools::Itertools;

use crate::{
    error::{Result, Stage},
    llm::generator::{clean_draft, PostBudget},
    platform::Platform,
    text::{char_len, words},
    types::{PlatformPost, UserContext},
};

/// Rewrites a finished post in the voice of the user's own prior posts
pub trait StyleMatcher {
    /// Prior posts used as style examples
    const MAX_EXAMPLES: usize = 3;

    /// Condenses the examples into a short style guide
    fn describe_style(
        &self,
        examples: &[&str],
        platform: Platform,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Rewrites `body` to follow the guide without changing its meaning
    fn adapt_post(
        &self,
        body: &str,
        style_guide: &str,
        examples: &[&str],
        platform: Platform,
        max_chars: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Corrective pass for an adaptation that came back over `max_chars`
    fn shorten_adapted(
        &self,
        body: &str,
        platform: Platform,
        max_chars: usize,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Returns `post` restyled after the closest prior posts, or unchanged when the user
    /// has none. The result is held to the same ceiling as a freshly generated post.
    fn match_style(
        &self,
        post: &PlatformPost,
        user_context: Option<&UserContext>,
        original_url: Option<&str>,
    ) -> impl Future<Output = Result<PlatformPost>> + Send
    where
        Self: Sync,
    {
        async move {
            let prior_posts = user_context.map(|c| c.prior_posts.as_slice()).unwrap_or_default();
            let body = strip_url(&post.post_content, original_url);
            let examples = closest_posts(body, prior_posts, Self::MAX_EXAMPLES);
            if examples.is_empty() {
                return Ok(post.clone());
            }

            let platform = post.platform;
            let budget = PostBudget::new(platform, original_url)?;
            let style_guide = self.describe_style(&examples, platform).await?;
            let raw = self
                .adapt_post(body, &style_guide, &examples, platform, budget.body_chars)
                .await?;
            let adapted = clean_draft(&raw, Stage::StyleMatching)?;

            let styled = if budget.fits(&adapted) {
                adapted
            } else {
                tracing::debug!(
                    topic_id = post.topic_id,
                    %platform,
                    length = char_len(&adapted),
                    "Styled post over budget, requesting shorter version"
                );
                let raw = self
                    .shorten_adapted(&adapted, platform, budget.body_chars)
                    .await?;
                budget.settle(clean_draft(&raw, Stage::StyleMatching)?)?
            };

            Ok(PlatformPost {
                post_content: budget.finish(styled, original_url),
                ..post.clone()
            })
        }
    }
}

/// Leaves every post as generated
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStyleMatching;

impl StyleMatcher for NoStyleMatching {
    async fn describe_style(&self, _examples: &[&str], _platform: Platform) -> Result<String> {
        Ok(String::new())
    }

    async fn adapt_post(
        &self,
        body: &str,
        _style_guide: &str,
        _examples: &[&str],
        _platform: Platform,
        _max_chars: usize,
    ) -> Result<String> {
        Ok(body.to_string())
    }

    async fn shorten_adapted(&self, body: &str, _platform: Platform, _max_chars: usize) -> Result<String> {
        Ok(body.to_string())
    }

    async fn match_style(
        &self,
        post: &PlatformPost,
        _user_context: Option<&UserContext>,
        _original_url: Option<&str>,
    ) -> Result<PlatformPost> {
        Ok(post.clone())
    }
}

fn strip_url<'a>(content: &'a str, original_url: Option<&str>) -> &'a str {
    original_url
        .and_then(|url| content.strip_suffix(url))
        .map(str::trim_end)
        .unwrap_or(content)
}

/// Word-set similarity in `[0, 1]`
fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (words(a), words(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// The `limit` non-blank posts most similar to `body`, most similar first
fn closest_posts<'a>(body: &str, posts: &'a [String], limit: usize) -> Vec<&'a str> {
    posts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| (similarity(body, p), p))
        .sorted_by(|a, b| b.0.total_cmp(&a.0))
        .take(limit)
        .map(|(_, p)| p)
        .collect()
}
