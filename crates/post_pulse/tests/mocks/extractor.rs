use std::sync::{Arc, Mutex};

use post_pulse::{Error, Result, Stage, TopicCandidate, TopicExtractor};

pub const TWO_TOPIC_TEXT: &str = "Remote work is reshaping how teams collaborate across time zones. \
Async updates replace most standing meetings. \
Meanwhile, small business owners are adopting AI bookkeeping tools. \
Owners report saving hours every week on reconciliation.";

#[derive(Clone)]
pub struct MockTopicExtractor {
    pub candidates: Vec<TopicCandidate>,
    pub calls: Arc<Mutex<Vec<(String, usize)>>>,
    pub fail_with: Option<String>,
    pub fatal: bool,
}

impl MockTopicExtractor {
    pub fn new(candidates: Vec<TopicCandidate>) -> Self {
        Self {
            candidates,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
            fatal: false,
        }
    }

    /// Two topics grounded in [`TWO_TOPIC_TEXT`]
    pub fn two_topics() -> Self {
        Self::new(vec![
            TopicCandidate::new(
                "Remote collaboration",
                "Remote work is reshaping how teams collaborate across time zones.",
                0.9,
            ),
            TopicCandidate::new(
                "AI bookkeeping",
                "Meanwhile, small business owners are adopting AI bookkeeping tools.",
                0.85,
            ),
        ])
    }

    pub fn with_topics(count: usize) -> Self {
        Self::new(
            (1..=count)
                .map(|i| TopicCandidate::new(format!("Topic {i}"), format!("Excerpt {i}"), 0.8))
                .collect(),
        )
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl TopicExtractor for MockTopicExtractor {
    async fn extract_candidates(&self, text: &str, max_topics: usize) -> Result<Vec<TopicCandidate>> {
        self.calls.lock().unwrap().push((text.to_string(), max_topics));
        if let Some(ref msg) = self.fail_with {
            return Err(Error::Upstream {
                stage: Stage::Extraction,
                message: msg.clone(),
                fatal: self.fatal,
            });
        }
        Ok(self.candidates.iter().take(max_topics).cloned().collect())
    }
}
