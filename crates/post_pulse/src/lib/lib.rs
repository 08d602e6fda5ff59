//! # post_pulse
//!
//! Turns a long-form text into ready-to-publish social posts. Topics are extracted once
//! per run, alongside a summary of the text's audience. Every (topic, platform) pair is
//! then annotated with an emotion and content strategy, written up as a post and, when
//! the user has prior posts, restyled in their voice. Progress and results are emitted
//! as frames that are either streamed to the client or folded into one batch response.

pub mod client;
mod error;
mod llm;
pub mod pipeline;
pub mod platform;
pub mod request;
pub mod server;
pub mod text;
pub mod tracing;
pub mod transport;
pub mod types;

pub use client::PostPulseClient;
pub use error::{Error, ErrorKind, Result, Stage};
pub use llm::openai;
pub use llm::{
    analyzer::parse_annotation,
    generator::PostGenerator,
    topic_extractor::{normalize_topics, DEFAULT_MAX_TOPICS},
    AudienceAnalyzer, EmotionAnalyzer, NoAudienceAnalysis, NoStyleMatching, StyleMatcher,
    TopicCandidate, TopicExtractor,
};
pub use pipeline::{
    builder::ContentPipelineBuilder, ContentPipeline, IterationOrder, PipelineRun, RunStatus,
    RunSummary,
};
pub use platform::{Platform, PlatformConfig};
pub use request::{GenerateRequest, ValidatedRequest};
pub use transport::{BatchResponse, Frame};
pub use types::{Annotation, ContentStrategy, Emotion, PlatformPost, Topic, UserContext};
