use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use post_pulse::{
    Annotation, ContentStrategy, Emotion, EmotionAnalyzer, Error, Platform, Result, Stage, Topic,
    UserContext,
};

#[derive(Clone)]
pub struct MockAnalyzer {
    pub emotion: Emotion,
    pub strategy: ContentStrategy,
    pub calls: Arc<Mutex<Vec<(u32, Platform, Option<UserContext>)>>>,
    pub audiences: Arc<Mutex<Vec<Option<String>>>>,
    pub fail_for_topics: HashSet<u32>,
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self {
            emotion: Emotion::AllayFears,
            strategy: ContentStrategy::ProfessionalInsight,
            calls: Arc::new(Mutex::new(Vec::new())),
            audiences: Arc::new(Mutex::new(Vec::new())),
            fail_for_topics: HashSet::new(),
        }
    }
}

impl MockAnalyzer {
    /// Fails with an upstream error for the given topic ids only
    pub fn failing_for(topic_ids: &[u32]) -> Self {
        Self {
            fail_for_topics: topic_ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl EmotionAnalyzer for MockAnalyzer {
    async fn annotate(
        &self,
        topic: &Topic,
        platform: Platform,
        user_context: Option<&UserContext>,
        audience: Option<&str>,
    ) -> Result<Annotation> {
        self.calls
            .lock()
            .unwrap()
            .push((topic.id, platform, user_context.cloned()));
        self.audiences
            .lock()
            .unwrap()
            .push(audience.map(str::to_string));

        if self.fail_for_topics.contains(&topic.id) {
            return Err(Error::upstream(Stage::Analysis, "model timed out"));
        }
        Ok(Annotation {
            topic_id: topic.id,
            primary_emotion: self.emotion,
            content_strategy: self.strategy,
            // the pipeline attaches the audience itself
            audience: None,
        })
    }
}
