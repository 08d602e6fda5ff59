use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, ErrorKind},
    pipeline::RunStatus,
    platform::Platform,
    types::PlatformPost,
};

/// One self-contained unit of a pipeline's output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Status {
        message: String,
        stage: RunStatus,
        progress_percent: u8,
        timestamp: DateTime<Utc>,
    },
    Post {
        post: PlatformPost,
        progress_percent: u8,
    },
    Error {
        message: String,
        kind: ErrorKind,
        fatal: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform: Option<Platform>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        progress_percent: Option<u8>,
        /// Topics extracted before a fatal failure, once known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_topics: Option<usize>,
    },
    Complete {
        /// Seconds from request start to completion
        total_processing_time: f64,
        total_topics: usize,
        successful_generations: usize,
        progress_percent: u8,
    },
}

impl Frame {
    pub const EVENT_NAMES: [&'static str; 4] = ["status", "post", "error", "complete"];

    pub fn status(stage: RunStatus, progress_percent: u8, message: impl Into<String>) -> Self {
        Frame::Status {
            message: message.into(),
            stage,
            progress_percent,
            timestamp: Utc::now(),
        }
    }

    /// Run-wide failure
    pub fn fatal(error: &Error) -> Self {
        Frame::Error {
            message: error.to_string(),
            kind: error.kind(),
            fatal: true,
            topic_id: None,
            platform: None,
            progress_percent: None,
            total_topics: None,
        }
    }

    /// Failure scoped to one (topic, platform) pair
    pub fn pair_error(
        error: &Error,
        topic_id: u32,
        platform: Platform,
        fatal: bool,
        progress_percent: u8,
    ) -> Self {
        Frame::Error {
            message: error.to_string(),
            kind: error.kind(),
            fatal,
            topic_id: Some(topic_id),
            platform: Some(platform),
            progress_percent: Some(progress_percent),
            total_topics: None,
        }
    }

    /// Records how many topics the run had extracted; only error frames carry it
    pub fn with_total_topics(mut self, total: usize) -> Self {
        if let Frame::Error { total_topics, .. } = &mut self {
            *total_topics = Some(total);
        }
        self
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            Frame::Status { .. } => "status",
            Frame::Post { .. } => "post",
            Frame::Error { .. } => "error",
            Frame::Complete { .. } => "complete",
        }
    }

    pub fn progress_percent(&self) -> Option<u8> {
        match self {
            Frame::Status {
                progress_percent, ..
            }
            | Frame::Post {
                progress_percent, ..
            }
            | Frame::Complete {
                progress_percent, ..
            } => Some(*progress_percent),
            Frame::Error {
                progress_percent, ..
            } => *progress_percent,
        }
    }

    /// Whether this frame ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Frame::Complete { .. } | Frame::Error { fatal: true, .. }
        )
    }
}
