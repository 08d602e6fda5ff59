use serde::{Deserialize, Serialize};

use crate::{
    error::ErrorKind,
    platform::Platform,
    transport::Frame,
    types::PlatformPost,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformPosts {
    pub primary: Vec<PlatformPost>,
    pub secondary: Vec<PlatformPost>,
}

impl PlatformPosts {
    pub fn push(&mut self, post: PlatformPost) {
        match post.platform {
            Platform::Primary => self.primary.push(post),
            Platform::Secondary => self.secondary.push(post),
        }
    }

    pub fn get(&self, platform: Platform) -> &[PlatformPost] {
        match platform {
            Platform::Primary => &self.primary,
            Platform::Secondary => &self.secondary,
        }
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Aggregated response returned when the result is not streamed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponse {
    pub success: bool,
    pub platform_posts: PlatformPosts,
    pub total_topics: usize,
    pub successful_generations: usize,
    pub processing_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// Messages of pairs that failed without stopping the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_generations: Vec<String>,
}

impl BatchResponse {
    /// Folds a run's frames into one document. A stream that ends without a
    /// terminal frame is reported as a transport failure.
    pub fn from_frames(frames: impl IntoIterator<Item = Frame>) -> Self {
        let mut response = BatchResponse::default();
        let mut terminated = false;

        for frame in frames {
            match frame {
                Frame::Status { .. } => {}
                Frame::Post { post, .. } => {
                    response.platform_posts.push(post);
                }
                Frame::Error {
                    message,
                    kind,
                    fatal: true,
                    total_topics,
                    ..
                } => {
                    response.success = false;
                    response.error = Some(message);
                    response.error_kind = Some(kind);
                    response.total_topics = total_topics.unwrap_or_default();
                    terminated = true;
                }
                Frame::Error { message, .. } => {
                    response.failed_generations.push(message);
                }
                Frame::Complete {
                    total_processing_time,
                    total_topics,
                    ..
                } => {
                    response.success = true;
                    response.total_topics = total_topics;
                    response.processing_time = total_processing_time;
                    terminated = true;
                }
            }
        }

        response.successful_generations = response.platform_posts.len();
        if !terminated {
            response.success = false;
            response.error = Some("Stream ended without a terminal frame".into());
            response.error_kind = Some(ErrorKind::Transport);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        pipeline::RunStatus,
        types::{ContentStrategy, Emotion},
    };

    fn post(topic_id: u32, platform: Platform) -> PlatformPost {
        PlatformPost {
            post_content: format!("post {topic_id}"),
            topic_id,
            topic_name: format!("topic {topic_id}"),
            primary_emotion: Emotion::EncourageDreams,
            content_strategy: ContentStrategy::SinglePost,
            processing_time: 0.2,
            platform,
        }
    }

    #[test]
    fn test_posts_are_grouped_by_platform() {
        let frames = vec![
            Frame::status(RunStatus::Extracting, 0, "Starting"),
            Frame::Post {
                post: post(1, Platform::Primary),
                progress_percent: 43,
            },
            Frame::Post {
                post: post(1, Platform::Secondary),
                progress_percent: 62,
            },
            Frame::pair_error(
                &Error::upstream(crate::error::Stage::Generation, "boom"),
                2,
                Platform::Primary,
                false,
                81,
            ),
            Frame::Complete {
                total_processing_time: 3.0,
                total_topics: 2,
                successful_generations: 2,
                progress_percent: 100,
            },
        ];

        let response = BatchResponse::from_frames(frames);
        assert!(response.success);
        assert_eq!(response.total_topics, 2);
        assert_eq!(response.successful_generations, 2);
        assert_eq!(response.platform_posts.get(Platform::Primary).len(), 1);
        assert_eq!(response.platform_posts.get(Platform::Secondary).len(), 1);
        assert_eq!(response.failed_generations.len(), 1);
        assert_eq!(response.error, None);

        let json = serde_json::to_value(&response).unwrap();
        assert!(json["platform_posts"]["primary"].is_array());
        assert!(json["platform_posts"]["secondary"].is_array());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_fatal_error_marks_failure() {
        let response = BatchResponse::from_frames(vec![Frame::fatal(&Error::EmptyInput)]);
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::Validation));
        assert!(response.error.unwrap().contains("empty"));
    }

    #[test]
    fn test_fatal_pair_error_keeps_topic_count() {
        let fatal = Error::Upstream {
            stage: crate::error::Stage::Generation,
            message: "API error: 401 - invalid api key".into(),
            fatal: true,
        };
        let frames = vec![
            Frame::status(RunStatus::Analyzing, 25, "Found 3 topics"),
            Frame::Post {
                post: post(1, Platform::Primary),
                progress_percent: 50,
            },
            Frame::pair_error(&fatal, 2, Platform::Primary, true, 50).with_total_topics(3),
        ];

        let response = BatchResponse::from_frames(frames);
        assert!(!response.success);
        assert_eq!(response.total_topics, 3);
        assert_eq!(response.successful_generations, 1);
        assert_eq!(response.error_kind, Some(ErrorKind::Upstream));
    }

    #[test]
    fn test_truncated_stream_is_transport_failure() {
        let response =
            BatchResponse::from_frames(vec![Frame::status(RunStatus::Extracting, 0, "Starting")]);
        assert!(!response.success);
        assert_eq!(response.error_kind, Some(ErrorKind::Transport));
    }
}
