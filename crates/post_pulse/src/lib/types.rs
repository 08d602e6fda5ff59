use std::fmt;

use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// A distinct theme extracted from the source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// 1-based, stable within a run
    pub id: u32,
    pub name: String,
    /// Verbatim span of the source text
    pub excerpt: String,
    pub confidence: f32,
}

/// Emotional theme a post is written to evoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    EncourageDreams,
    JustifyFailures,
    AllayFears,
    ConfirmSuspicions,
    UniteAgainstChallenges,
}

impl Emotion {
    pub const ALL: [Emotion; 5] = [
        Emotion::EncourageDreams,
        Emotion::JustifyFailures,
        Emotion::AllayFears,
        Emotion::ConfirmSuspicions,
        Emotion::UniteAgainstChallenges,
    ];

    pub const FALLBACK: Emotion = Emotion::EncourageDreams;

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::EncourageDreams => "encourage_dreams",
            Emotion::JustifyFailures => "justify_failures",
            Emotion::AllayFears => "allay_fears",
            Emotion::ConfirmSuspicions => "confirm_suspicions",
            Emotion::UniteAgainstChallenges => "unite_against_challenges",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Emotion::EncourageDreams => "Inspire aspiration, growth and positive future outcomes",
            Emotion::JustifyFailures => "Validate struggles, provide external explanations, remove self-blame",
            Emotion::AllayFears => "Provide reassurance, reduce anxiety, offer safety and security",
            Emotion::ConfirmSuspicions => "Validate existing doubts, provide 'I knew it!' moments",
            Emotion::UniteAgainstChallenges => "Identify shared obstacles, mutual frustrations and collective concerns",
        }
    }

    /// Maps a model-provided label onto the closed set, degrading to [`Emotion::FALLBACK`]
    pub fn from_label(label: &str) -> Emotion {
        let normalized = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == normalized)
            .unwrap_or(Self::FALLBACK)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a post is framed for its platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStrategy {
    SinglePost,
    EngagingQuestion,
    ProfessionalInsight,
    Storytelling,
    Educational,
}

impl ContentStrategy {
    pub const ALL: [ContentStrategy; 5] = [
        ContentStrategy::SinglePost,
        ContentStrategy::EngagingQuestion,
        ContentStrategy::ProfessionalInsight,
        ContentStrategy::Storytelling,
        ContentStrategy::Educational,
    ];

    pub const FALLBACK: ContentStrategy = ContentStrategy::SinglePost;

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStrategy::SinglePost => "single_post",
            ContentStrategy::EngagingQuestion => "engaging_question",
            ContentStrategy::ProfessionalInsight => "professional_insight",
            ContentStrategy::Storytelling => "storytelling",
            ContentStrategy::Educational => "educational",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ContentStrategy::SinglePost => "A single self-contained post",
            ContentStrategy::EngagingQuestion => "Lead with a question that invites replies",
            ContentStrategy::ProfessionalInsight => "Share a lesson or insight from experience",
            ContentStrategy::Storytelling => "Frame the idea as a short narrative",
            ContentStrategy::Educational => "Teach one concrete takeaway",
        }
    }

    pub fn from_label(label: &str) -> ContentStrategy {
        let normalized = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized)
            .unwrap_or(Self::FALLBACK)
    }
}

impl fmt::Display for ContentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

/// Emotion/strategy labels for one (topic, platform) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub topic_id: u32,
    pub primary_emotion: Emotion,
    pub content_strategy: ContentStrategy,
    /// Audience summary of the source text, handed on to the generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
}

impl Annotation {
    pub fn fallback(topic_id: u32) -> Self {
        Annotation {
            topic_id,
            primary_emotion: Emotion::FALLBACK,
            content_strategy: ContentStrategy::FALLBACK,
            audience: None,
        }
    }
}

/// Finished post for one topic on one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformPost {
    pub post_content: String,
    pub topic_id: u32,
    pub topic_name: String,
    pub primary_emotion: Emotion,
    pub content_strategy: ContentStrategy,
    /// Wall-clock seconds spent generating this post
    pub processing_time: f64,
    pub platform: Platform,
}

/// Advisory personalisation context for the analyzer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserContext {
    pub handle: String,
    /// Recent posts by the user on the target platform
    pub prior_posts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_labels_degrade_to_fallback() {
        assert_eq!(Emotion::from_label("allay_fears"), Emotion::AllayFears);
        assert_eq!(Emotion::from_label(" Allay Fears "), Emotion::AllayFears);
        assert_eq!(Emotion::from_label("rage"), Emotion::EncourageDreams);
        assert_eq!(Emotion::from_label(""), Emotion::FALLBACK);
    }

    #[test]
    fn test_strategy_labels_degrade_to_fallback() {
        assert_eq!(
            ContentStrategy::from_label("engaging-question"),
            ContentStrategy::EngagingQuestion
        );
        assert_eq!(
            ContentStrategy::from_label("thread"),
            ContentStrategy::SinglePost
        );
    }

    #[test]
    fn test_post_serializes_labels_as_strings() {
        let post = PlatformPost {
            post_content: "Hello".into(),
            topic_id: 1,
            topic_name: "Greeting".into(),
            primary_emotion: Emotion::UniteAgainstChallenges,
            content_strategy: ContentStrategy::Storytelling,
            processing_time: 0.5,
            platform: Platform::Primary,
        };
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["primary_emotion"], "unite_against_challenges");
        assert_eq!(json["content_strategy"], "storytelling");
        assert_eq!(json["platform"], "primary");
    }
}
