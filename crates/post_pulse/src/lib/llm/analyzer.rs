use std::future::Future;

use serde::Deserialize;

use crate::{
    error::Result,
    llm::json::extract_json,
    platform::Platform,
    types::{Annotation, ContentStrategy, Emotion, Topic, UserContext},
};

pub trait EmotionAnalyzer {
    /// Assigns one emotion and one content strategy to `topic` for `platform`.
    ///
    /// `user_context` and `audience` are advisory. Implementations only fail on upstream
    /// errors and degrade to fallback labels on anything ambiguous.
    fn annotate(
        &self,
        topic: &Topic,
        platform: Platform,
        user_context: Option<&UserContext>,
        audience: Option<&str>,
    ) -> impl Future<Output = Result<Annotation>> + Send;
}

#[derive(Debug, Default, Deserialize)]
struct AnnotationPayload {
    #[serde(default)]
    primary_emotion: Option<String>,
    #[serde(default)]
    content_strategy: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Maps raw model output onto an [`Annotation`], never failing
pub fn parse_annotation(topic_id: u32, raw: &str) -> Annotation {
    let payload = extract_json::<AnnotationPayload>(raw)
        .inspect_err(|e| tracing::warn!(error = %e, topic_id, "Unparseable annotation, using fallback labels"))
        .unwrap_or_default();

    if let Some(reasoning) = payload.reasoning.as_deref() {
        tracing::debug!(topic_id, reasoning, "Annotation reasoning");
    }

    Annotation {
        topic_id,
        primary_emotion: payload
            .primary_emotion
            .as_deref()
            .map(Emotion::from_label)
            .unwrap_or(Emotion::FALLBACK),
        content_strategy: payload
            .content_strategy
            .as_deref()
            .map(ContentStrategy::from_label)
            .unwrap_or(ContentStrategy::FALLBACK),
        audience: None,
    }
}
