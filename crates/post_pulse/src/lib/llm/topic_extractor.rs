use std::future::Future;

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    text::{char_len, clip_chars, collapse_whitespace, leading_excerpt, sentences, words},
    types::Topic,
};

pub const DEFAULT_MAX_TOPICS: usize = 5;

const FALLBACK_TOPIC_NAME: &str = "Main theme from the provided text";
const FALLBACK_CONFIDENCE: f32 = 0.7;
const DEFAULT_CONFIDENCE: f32 = 0.8;
const FALLBACK_EXCERPT_CHARS: usize = 200;

/// A topic as proposed by a model, before ids are assigned and the excerpt is
/// grounded in the source text
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TopicCandidate {
    #[serde(alias = "topic_name")]
    pub name: String,
    #[serde(default, alias = "content_excerpt")]
    pub excerpt: String,
    #[serde(default, alias = "confidence_score")]
    pub confidence: Option<f32>,
}

impl TopicCandidate {
    pub fn new(name: impl Into<String>, excerpt: impl Into<String>, confidence: f32) -> Self {
        TopicCandidate {
            name: name.into(),
            excerpt: excerpt.into(),
            confidence: Some(confidence),
        }
    }
}

pub trait TopicExtractor {
    /// Input beyond this many characters is clipped before the upstream call
    const CONTEXT_WINDOW_LIMIT: usize = 48_000;

    /// Proposes up to `max_topics` candidates, ordered by appearance in `text`
    fn extract_candidates(
        &self,
        text: &str,
        max_topics: usize,
    ) -> impl Future<Output = Result<Vec<TopicCandidate>>> + Send;

    /// Extracts between 1 and `max_topics` topics with sequential ids starting at 1
    fn extract(
        &self,
        text: &str,
        max_topics: usize,
    ) -> impl Future<Output = Result<Vec<Topic>>> + Send
    where
        Self: Sync,
    {
        async move {
            if text.trim().is_empty() {
                return Err(Error::EmptyInput);
            }
            let max_topics = max_topics.max(1);
            let text = clip_chars(text, Self::CONTEXT_WINDOW_LIMIT);

            let candidates = self.extract_candidates(text, max_topics).await?;
            Ok(normalize_topics(text, candidates, max_topics))
        }
    }
}

/// Cleans model candidates into the final topic list.
///
/// Drops nameless candidates, clamps confidence, grounds every excerpt in `text`,
/// truncates to `max_topics` and assigns ids. Produces a single fallback topic when
/// nothing usable remains.
pub fn normalize_topics(text: &str, candidates: Vec<TopicCandidate>, max_topics: usize) -> Vec<Topic> {
    let mut topics = candidates
        .into_iter()
        .filter_map(|candidate| {
            let name = candidate.name.trim().to_string();
            if name.is_empty() {
                return None;
            }
            Some((
                name,
                ground_excerpt(text, &candidate.excerpt),
                candidate
                    .confidence
                    .filter(|c| c.is_finite())
                    .unwrap_or(DEFAULT_CONFIDENCE)
                    .clamp(0.0, 1.0),
            ))
        })
        .take(max_topics.max(1))
        .zip(1..)
        .map(|((name, excerpt, confidence), id)| Topic {
            id,
            name,
            excerpt,
            confidence,
        })
        .collect::<Vec<_>>();

    if topics.is_empty() {
        tracing::warn!("No usable topics in model output, using fallback topic");
        topics.push(Topic {
            id: 1,
            name: FALLBACK_TOPIC_NAME.to_string(),
            excerpt: leading_excerpt(text, FALLBACK_EXCERPT_CHARS),
            confidence: FALLBACK_CONFIDENCE,
        });
    }
    topics
}

/// Returns `excerpt` when it occurs in `text` (ignoring case and whitespace runs),
/// otherwise the sentence of `text` sharing the most words with it
pub fn ground_excerpt(text: &str, excerpt: &str) -> String {
    let excerpt = excerpt.trim();
    if !excerpt.is_empty() {
        if text.contains(excerpt) {
            return excerpt.to_string();
        }
        let haystack = collapse_whitespace(text).to_lowercase();
        let needle = collapse_whitespace(excerpt).to_lowercase();
        if haystack.contains(&needle) {
            return excerpt.to_string();
        }
    }

    let wanted = words(excerpt);
    let best = sentences(text)
        .into_iter()
        .enumerate()
        .max_by_key(|(idx, sentence)| {
            let overlap = words(sentence).intersection(&wanted).count();
            // earliest sentence wins ties
            (overlap, std::cmp::Reverse(*idx))
        })
        .map(|(_, sentence)| sentence);

    match best {
        Some(sentence) if char_len(sentence) <= FALLBACK_EXCERPT_CHARS * 2 => sentence.to_string(),
        Some(sentence) => leading_excerpt(sentence, FALLBACK_EXCERPT_CHARS * 2),
        None => leading_excerpt(text, FALLBACK_EXCERPT_CHARS),
    }
}
