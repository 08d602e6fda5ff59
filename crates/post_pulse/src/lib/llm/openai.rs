use std::sync::LazyLock;

use itertools::Itertools;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::{Error, Stage},
    llm::{
        analyzer::parse_annotation,
        json::extract_json,
        topic_extractor::TopicCandidate,
        AudienceAnalyzer, EmotionAnalyzer, PostGenerator, StyleMatcher, TopicExtractor,
    },
    platform::Platform,
    types::{Annotation, ContentStrategy, Emotion, Topic, UserContext},
};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("HTTP error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

impl OpenAIError {
    /// Rejected credentials or permissions cannot succeed on any later call
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            OpenAIError::Api { status, .. }
                if *status == StatusCode::UNAUTHORIZED.as_u16()
                    || *status == StatusCode::FORBIDDEN.as_u16()
        )
    }

    pub fn into_upstream(self, stage: Stage) -> Error {
        Error::Upstream {
            stage,
            fatal: self.is_auth_failure(),
            message: self.to_string(),
        }
    }
}

static ANALYSIS_SYSTEM_PROMPT: LazyLock<String> = LazyLock::new(|| {
    let emotions = Emotion::ALL
        .iter()
        .map(|e| format!("- {}: {}", e.as_str(), e.description()))
        .join("\n");
    let strategies = ContentStrategy::ALL
        .iter()
        .map(|s| format!("- {}: {}", s.as_str(), s.description()))
        .join("\n");
    include_str!("./prompts/emotion_analysis.txt")
        .replace("{emotions}", &emotions)
        .replace("{strategies}", &strategies)
});

impl OpenAIClient {
    const AUDIENCE_SYSTEM_PROMPT: &str = include_str!("./prompts/audience_analysis.txt");
    const TOPIC_SYSTEM_PROMPT: &str = include_str!("./prompts/topic_extraction.txt");
    const GENERATION_SYSTEM_PROMPT: &str = include_str!("./prompts/post_generation.txt");
    const SHORTENING_SYSTEM_PROMPT: &str = include_str!("./prompts/post_shortening.txt");
    const STYLE_ANALYSIS_SYSTEM_PROMPT: &str = include_str!("./prompts/style_analysis.txt");
    const STYLE_ADAPTATION_SYSTEM_PROMPT: &str = include_str!("./prompts/style_adaptation.txt");

    const AUDIENCE_TEMPERATURE: f32 = 0.2;
    const EXTRACTION_TEMPERATURE: f32 = 0.1;
    const ANALYSIS_TEMPERATURE: f32 = 0.1;
    const GENERATION_TEMPERATURE: f32 = 0.3;
    const STYLE_TEMPERATURE: f32 = 0.2;

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".into(),
            model: DEFAULT_MODEL.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn send_completion_request(
        &self,
        system_prompt: &str,
        user_content: impl Into<String>,
        temperature: f32,
    ) -> Result<CompletionResponse, OpenAIError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": temperature,
            "messages": [
                {
                    "role": "system",
                    "content": system_prompt
                },
                {
                    "role": "user",
                    "content": user_content.into()
                }
            ]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make http request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(OpenAIError::Api { status, message });
        }

        Ok(resp.json::<CompletionResponse>().await?)
    }

    /// Sends a single-turn completion and returns the first choice's text
    pub async fn complete(
        &self,
        system_prompt: &str,
        user_content: impl Into<String>,
        temperature: f32,
    ) -> Result<String, OpenAIError> {
        let response = self
            .send_completion_request(system_prompt, user_content, temperature)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenAIError::Api {
                status: 0,
                message: "No content in response".into(),
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandidatePayload {
    List(Vec<TopicCandidate>),
    Wrapped { topics: Vec<TopicCandidate> },
}

impl From<CandidatePayload> for Vec<TopicCandidate> {
    fn from(payload: CandidatePayload) -> Self {
        match payload {
            CandidatePayload::List(topics) | CandidatePayload::Wrapped { topics } => topics,
        }
    }
}

impl TopicExtractor for OpenAIClient {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn extract_candidates(
        &self,
        text: &str,
        max_topics: usize,
    ) -> Result<Vec<TopicCandidate>, Error> {
        let user_content = format!("Extract at most {max_topics} topics from this text:\n\n{text}");
        let raw = self
            .complete(
                Self::TOPIC_SYSTEM_PROMPT,
                user_content,
                Self::EXTRACTION_TEMPERATURE,
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to extract topics"))
            .map_err(|e| e.into_upstream(Stage::Extraction))?;

        match extract_json::<CandidatePayload>(&raw) {
            Ok(payload) => Ok(payload.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Topic extraction returned no JSON");
                Ok(Vec::new())
            }
        }
    }
}

fn annotation_request(
    topic: &Topic,
    platform: Platform,
    user_context: Option<&UserContext>,
    audience: Option<&str>,
) -> String {
    let config = platform.config();
    let mut content = format!(
        "<coreIdea>\n{}\n</coreIdea>\n\n<referenceText>\n{}\n</referenceText>\n\n\
         <platform>\n{} - {}\n</platform>",
        topic.name, topic.excerpt, config.display_name, config.tone_guidelines
    );

    if let Some(audience) = audience {
        content.push_str(&format!("\n\n<audience>\n{audience}\n</audience>"));
    }

    if let Some(ctx) = user_context {
        content.push_str(&format!("\n\n<author>\n{}\n</author>", ctx.handle));
        if !ctx.prior_posts.is_empty() {
            let posts = ctx
                .prior_posts
                .iter()
                .map(|p| format!("- {}", p.replace('\n', " ")))
                .join("\n");
            content.push_str(&format!("\n\n<previousPosts>\n{posts}\n</previousPosts>"));
        }
    }
    content
}

impl EmotionAnalyzer for OpenAIClient {
    #[tracing::instrument(skip(self, topic, user_context, audience), fields(topic_id = topic.id))]
    async fn annotate(
        &self,
        topic: &Topic,
        platform: Platform,
        user_context: Option<&UserContext>,
        audience: Option<&str>,
    ) -> Result<Annotation, Error> {
        let raw = self
            .complete(
                &ANALYSIS_SYSTEM_PROMPT,
                annotation_request(topic, platform, user_context, audience),
                Self::ANALYSIS_TEMPERATURE,
            )
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to analyze topic"))
            .map_err(|e| e.into_upstream(Stage::Analysis))?;

        Ok(parse_annotation(topic.id, &raw))
    }
}

impl PostGenerator for OpenAIClient {
    #[tracing::instrument(skip(self, topic, annotation), fields(topic_id = topic.id))]
    async fn write_post(
        &self,
        topic: &Topic,
        annotation: &Annotation,
        platform: Platform,
        max_chars: usize,
    ) -> Result<String, Error> {
        let config = platform.config();
        let min_chars = config.target_length.0.min(max_chars);
        let max_target = config.target_length.1.min(max_chars);

        let system_prompt = Self::GENERATION_SYSTEM_PROMPT
            .replace("{platform}", config.display_name)
            .replace("{min_chars}", &min_chars.to_string())
            .replace("{max_chars}", &max_target.to_string())
            .replace("{max_hashtags}", &config.max_hashtags.to_string())
            .replace("{tone}", config.tone_guidelines)
            .replace("{cta}", config.call_to_action_style);

        let mut user_content = format!(
            "Topic: {}\nReference text: {}\nEmotion: {} ({})\nStrategy: {} ({})",
            topic.name,
            topic.excerpt,
            annotation.primary_emotion,
            annotation.primary_emotion.description(),
            annotation.content_strategy,
            annotation.content_strategy.description(),
        );
        if let Some(ref audience) = annotation.audience {
            user_content.push_str(&format!("\nAudience:\n{audience}"));
        }

        self.complete(&system_prompt, user_content, Self::GENERATION_TEMPERATURE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate post"))
            .map_err(|e| e.into_upstream(Stage::Generation))
    }

    #[tracing::instrument(skip(self, draft))]
    async fn shorten_post(
        &self,
        draft: &str,
        platform: Platform,
        max_chars: usize,
    ) -> Result<String, Error> {
        let system_prompt = Self::SHORTENING_SYSTEM_PROMPT
            .replace("{platform}", platform.config().display_name)
            .replace("{max_chars}", &max_chars.to_string());

        self.complete(&system_prompt, draft, Self::GENERATION_TEMPERATURE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to shorten post"))
            .map_err(|e| e.into_upstream(Stage::Generation))
    }
}

impl AudienceAnalyzer for OpenAIClient {
    #[tracing::instrument(skip(self, text), fields(text_len = text.len()))]
    async fn describe_audience(&self, text: &str) -> Result<String, Error> {
        self.complete(
            Self::AUDIENCE_SYSTEM_PROMPT,
            format!("Identify the core audience of this text:\n\n{text}"),
            Self::AUDIENCE_TEMPERATURE,
        )
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to analyze audience"))
        .map_err(|e| e.into_upstream(Stage::Audience))
    }
}

fn numbered(examples: &[&str]) -> String {
    examples
        .iter()
        .enumerate()
        .map(|(i, post)| format!("Post {}: {post}", i + 1))
        .join("\n\n")
}

impl StyleMatcher for OpenAIClient {
    #[tracing::instrument(skip(self, examples), fields(examples = examples.len()))]
    async fn describe_style(&self, examples: &[&str], platform: Platform) -> Result<String, Error> {
        let system_prompt = Self::STYLE_ANALYSIS_SYSTEM_PROMPT
            .replace("{platform}", platform.config().display_name);

        self.complete(&system_prompt, numbered(examples), Self::STYLE_TEMPERATURE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to analyze writing style"))
            .map_err(|e| e.into_upstream(Stage::StyleMatching))
    }

    #[tracing::instrument(skip(self, body, style_guide, examples))]
    async fn adapt_post(
        &self,
        body: &str,
        style_guide: &str,
        examples: &[&str],
        platform: Platform,
        max_chars: usize,
    ) -> Result<String, Error> {
        let system_prompt = Self::STYLE_ADAPTATION_SYSTEM_PROMPT
            .replace("{platform}", platform.config().display_name)
            .replace("{style_guide}", style_guide)
            .replace("{examples}", &numbered(examples))
            .replace("{max_chars}", &max_chars.to_string());

        self.complete(&system_prompt, body, Self::STYLE_TEMPERATURE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to adapt post style"))
            .map_err(|e| e.into_upstream(Stage::StyleMatching))
    }

    #[tracing::instrument(skip(self, body))]
    async fn shorten_adapted(
        &self,
        body: &str,
        platform: Platform,
        max_chars: usize,
    ) -> Result<String, Error> {
        let system_prompt = Self::SHORTENING_SYSTEM_PROMPT
            .replace("{platform}", platform.config().display_name)
            .replace("{max_chars}", &max_chars.to_string());

        self.complete(&system_prompt, body, Self::STYLE_TEMPERATURE)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to shorten styled post"))
            .map_err(|e| e.into_upstream(Stage::StyleMatching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_failures_are_fatal() {
        let err = OpenAIError::Api {
            status: 401,
            message: "invalid api key".into(),
        };
        assert!(err.into_upstream(Stage::Extraction).is_fatal());

        let err = OpenAIError::Api {
            status: 429,
            message: "rate limited".into(),
        };
        assert!(!err.into_upstream(Stage::Generation).is_fatal());
    }

    #[test]
    fn test_candidate_payload_shapes() {
        let list: CandidatePayload =
            extract_json(r#"[{"topic_name": "A", "content_excerpt": "a", "confidence_score": 0.5}]"#)
                .unwrap();
        let wrapped: CandidatePayload =
            extract_json(r#"{"topics": [{"name": "A", "excerpt": "a"}]}"#).unwrap();

        let list: Vec<TopicCandidate> = list.into();
        let wrapped: Vec<TopicCandidate> = wrapped.into();
        assert_eq!(list[0].name, "A");
        assert_eq!(list[0].confidence, Some(0.5));
        assert_eq!(wrapped[0].excerpt, "a");
        assert_eq!(wrapped[0].confidence, None);
    }

    #[test]
    fn test_analysis_prompt_lists_closed_sets() {
        for emotion in Emotion::ALL {
            assert!(ANALYSIS_SYSTEM_PROMPT.contains(emotion.as_str()));
        }
        for strategy in ContentStrategy::ALL {
            assert!(ANALYSIS_SYSTEM_PROMPT.contains(strategy.as_str()));
        }
    }

    #[test]
    fn test_annotation_request_includes_user_context() {
        let topic = Topic {
            id: 1,
            name: "Remote work".into(),
            excerpt: "Remote work is reshaping cities.".into(),
            confidence: 0.9,
        };
        let ctx = UserContext {
            handle: "@dev".into(),
            prior_posts: vec!["Old post\nwith newline".into()],
        };
        let request = annotation_request(
            &topic,
            Platform::Secondary,
            Some(&ctx),
            Some("Core audience: city planners."),
        );
        assert!(request.contains("Remote work"));
        assert!(request.contains("LinkedIn"));
        assert!(request.contains("@dev"));
        assert!(request.contains("- Old post with newline"));
        assert!(request.contains("<audience>\nCore audience: city planners.\n</audience>"));

        let bare = annotation_request(&topic, Platform::Primary, None, None);
        assert!(!bare.contains("<author>"));
        assert!(!bare.contains("<audience>"));
    }

    /// Serves `/chat/completions` with a fixed status and body
    async fn stub_api(status: u16, body: &'static str) -> OpenAIClient {
        use axum::{http::StatusCode as HttpStatus, routing::post, Router};

        let status = HttpStatus::from_u16(status).unwrap();
        let router = Router::new().route("/chat/completions", post(move || async move { (status, body) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        OpenAIClient::new("sk-test").with_base_url(format!("http://{address}/"))
    }

    #[tokio::test]
    async fn test_unauthorized_response_is_fatal() {
        let client = stub_api(401, r#"{"error": {"message": "Incorrect API key"}}"#).await;

        let err = client
            .send_completion_request("system", "user", 0.1)
            .await
            .unwrap_err();
        assert!(err.is_auth_failure());
        assert!(matches!(err, OpenAIError::Api { status: 401, .. }));

        let err = client.extract_candidates("Some text", 3).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            Error::Upstream {
                stage: Stage::Extraction,
                fatal: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_forbidden_response_is_fatal_for_every_stage() {
        let client = stub_api(403, "forbidden").await;
        let topic = Topic {
            id: 1,
            name: "Remote work".into(),
            excerpt: "Remote work is reshaping cities.".into(),
            confidence: 0.9,
        };

        let err = client
            .annotate(&topic, Platform::Primary, None, None)
            .await
            .unwrap_err();
        assert!(err.is_fatal());

        let err = client.describe_audience("Some text").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Upstream {
                stage: Stage::Audience,
                fatal: true,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_fatal() {
        let client = stub_api(429, "slow down").await;
        let err = client.shorten_post("draft", Platform::Primary, 100).await.unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_completion_content_is_returned() {
        let client = stub_api(
            200,
            r#"{"id": "cmpl-1", "choices": [{"index": 0, "message": {"role": "assistant", "content": "Core audience: founders."}, "finish_reason": "stop"}]}"#,
        )
        .await;
        let summary = client.describe_audience("Some text").await.unwrap();
        assert_eq!(summary, "Core audience: founders.");
    }
}
