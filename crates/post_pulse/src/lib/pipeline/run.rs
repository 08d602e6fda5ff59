use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{platform::Platform, request::ValidatedRequest, types::Topic};

/// Lifecycle of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Extracting,
    Analyzing,
    Generating,
    Complete,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Complete | RunStatus::Failed)
    }
}

/// Request-scoped state of one run, owned by the pipeline for its lifetime
#[derive(Debug)]
pub struct PipelineRun {
    pub input_text: String,
    pub target_platforms: Vec<Platform>,
    pub topics: Vec<Topic>,
    completed_count: usize,
    failed_count: usize,
    total_expected: Option<usize>,
    progress_percent: u8,
    status: RunStatus,
    started: Instant,
}

impl PipelineRun {
    /// Upper bound of the extraction band
    pub const EXTRACTION_BAND: u8 = 25;

    pub fn new(request: &ValidatedRequest, started: Instant) -> Self {
        PipelineRun {
            input_text: request.text.clone(),
            target_platforms: request.platforms.clone(),
            topics: Vec::new(),
            completed_count: 0,
            failed_count: 0,
            total_expected: None,
            progress_percent: 0,
            status: RunStatus::Extracting,
            started,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    /// Known once topics have been extracted
    pub fn total_expected(&self) -> Option<usize> {
        self.total_expected
    }

    pub fn successful_generations(&self) -> usize {
        self.completed_count - self.failed_count
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn has_topic(&self, topic_id: u32) -> bool {
        self.topics.iter().any(|t| t.id == topic_id)
    }

    /// Moves the progress forward; never backwards, and never to 100 before completion
    pub fn advance(&mut self, status: RunStatus, progress_percent: u8) -> u8 {
        self.status = status;
        self.progress_percent = self.progress_percent.max(progress_percent.min(99));
        self.progress_percent
    }

    pub fn set_topics(&mut self, topics: Vec<Topic>) {
        self.total_expected = Some(topics.len() * self.target_platforms.len());
        self.topics = topics;
        self.status = RunStatus::Analyzing;
    }

    /// Records one attempted pair and returns the resulting progress
    pub fn record_pair(&mut self, succeeded: bool) -> u8 {
        let total = self.total_expected.unwrap_or(0).max(1);
        debug_assert!(
            self.completed_count < total,
            "recorded more pairs than the run planned"
        );
        self.completed_count += 1;
        if !succeeded {
            self.failed_count += 1;
        }
        // generated <= 75, the cast cannot truncate
        let generated = (75 * self.completed_count / total).min(75);
        self.advance(
            RunStatus::Generating,
            Self::EXTRACTION_BAND + generated as u8,
        )
    }

    pub fn complete(&mut self) -> RunSummary {
        self.status = RunStatus::Complete;
        self.progress_percent = 100;
        self.summary()
    }

    pub fn fail(&mut self) -> RunSummary {
        self.status = RunStatus::Failed;
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status: self.status,
            total_topics: self.topics.len(),
            total_expected: self.total_expected.unwrap_or(0),
            successful_generations: self.successful_generations(),
            failed_pairs: self.failed_count,
            processing_time: self.elapsed_secs(),
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub total_topics: usize,
    pub total_expected: usize,
    pub successful_generations: usize,
    pub failed_pairs: usize,
    /// Seconds from request start to the terminal frame
    pub processing_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_for(platforms: &[Platform], topics: u32) -> PipelineRun {
        let request = ValidatedRequest {
            text: "text".into(),
            platforms: platforms.to_vec(),
            original_url: None,
            user_handle: None,
        };
        let mut run = PipelineRun::new(&request, Instant::now());
        run.set_topics(
            (1..=topics)
                .map(|id| Topic {
                    id,
                    name: format!("topic {id}"),
                    excerpt: "text".into(),
                    confidence: 0.8,
                })
                .collect(),
        );
        run
    }

    #[test]
    fn test_total_expected_is_topics_times_platforms() {
        let run = run_for(&Platform::ALL, 3);
        assert_eq!(run.total_expected(), Some(6));
        assert_eq!(run.status(), RunStatus::Analyzing);
    }

    #[test]
    fn test_progress_bands() {
        let mut run = run_for(&[Platform::Primary], 2);
        assert_eq!(run.advance(RunStatus::Extracting, 25), 25);
        assert_eq!(run.record_pair(true), 62);
        // the last pair stays below 100 until the run completes
        assert_eq!(run.record_pair(false), 99);
        assert_eq!(run.completed_count(), 2);
        assert_eq!(run.successful_generations(), 1);

        let summary = run.complete();
        assert_eq!(run.progress_percent(), 100);
        assert_eq!(summary.failed_pairs, 1);
        assert_eq!(summary.total_topics, 2);
    }

    #[test]
    fn test_progress_never_goes_backwards() {
        let mut run = run_for(&[Platform::Primary], 1);
        run.advance(RunStatus::Extracting, 40);
        assert_eq!(run.advance(RunStatus::Extracting, 5), 40);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "recorded more pairs than the run planned")]
    fn test_recording_a_pair_twice_panics() {
        let mut run = run_for(&[Platform::Primary], 1);
        run.record_pair(true);
        run.record_pair(true);
    }
}
