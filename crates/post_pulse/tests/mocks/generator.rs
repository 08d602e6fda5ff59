use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use post_pulse::{Annotation, Error, Platform, PostGenerator, Result, Stage, Topic};

#[derive(Clone, Default)]
pub struct MockGenerator {
    pub calls: Arc<Mutex<Vec<(u32, Platform)>>>,
    /// Audience found on each annotation the generator was handed
    pub audiences: Arc<Mutex<Vec<Option<String>>>>,
    pub shorten_calls: Arc<Mutex<Vec<(Platform, usize)>>>,
    /// Ignore the budget and return drafts of this many characters
    pub draft_len: Option<usize>,
    /// Topics with lower ids take longer, so completions arrive out of order
    pub staggered: bool,
    /// Fixed latency of every draft
    pub delay: Option<Duration>,
    pub in_flight: Arc<AtomicUsize>,
    pub max_in_flight: Arc<AtomicUsize>,
    /// Message and fatal flag of the upstream error every call fails with
    pub fail_with: Option<(String, bool)>,
}

impl MockGenerator {
    /// Returns drafts that are far too long for the primary platform
    pub fn verbose(draft_len: usize) -> Self {
        Self {
            draft_len: Some(draft_len),
            ..Default::default()
        }
    }

    pub fn staggered() -> Self {
        Self {
            staggered: true,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Fails every call as if the API key had been revoked
    pub fn unauthorized() -> Self {
        Self {
            fail_with: Some(("API error: 401 - invalid api key".into(), true)),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

fn sentences(len: usize) -> String {
    let sentence = "Small steps compound into big wins. ";
    sentence.repeat(len / sentence.len() + 1)[..len].to_string()
}

impl PostGenerator for MockGenerator {
    async fn write_post(
        &self,
        topic: &Topic,
        annotation: &Annotation,
        platform: Platform,
        _max_chars: usize,
    ) -> Result<String> {
        self.calls.lock().unwrap().push((topic.id, platform));
        self.audiences
            .lock()
            .unwrap()
            .push(annotation.audience.clone());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        } else if self.staggered {
            let delay = 40u64.saturating_sub(u64::from(topic.id) * 10);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some((ref message, fatal)) = self.fail_with {
            return Err(Error::Upstream {
                stage: Stage::Generation,
                message: message.clone(),
                fatal,
            });
        }

        let draft = match self.draft_len {
            Some(len) => sentences(len),
            None => format!(
                "{} ({}) for {}. Stay curious.",
                topic.name, annotation.primary_emotion, platform
            ),
        };
        Ok(draft)
    }

    async fn shorten_post(&self, draft: &str, platform: Platform, max_chars: usize) -> Result<String> {
        self.shorten_calls.lock().unwrap().push((platform, max_chars));
        // a stubborn model that only trims a little
        let keep = draft.chars().count().saturating_sub(10);
        Ok(draft.chars().take(keep).collect())
    }
}
