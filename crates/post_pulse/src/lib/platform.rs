//! # Platforms
//!
//! The two supported output targets and the constraints each one imposes on a
//! generated post.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Output target of a generated post.
///
/// Variant order is the canonical emission order: primary before secondary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Short-form social network
    Primary,
    /// Professional network
    Secondary,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Primary, Platform::Secondary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Primary => "primary",
            Platform::Secondary => "secondary",
        }
    }

    pub fn config(&self) -> &'static PlatformConfig {
        match self {
            Platform::Primary => &PRIMARY_CONFIG,
            Platform::Secondary => &SECONDARY_CONFIG,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "twitter" | "x" => Ok(Platform::Primary),
            "secondary" | "linkedin" => Ok(Platform::Secondary),
            other => Err(Error::Validation(format!("Unsupported platform: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlatformConfig {
    /// Hard ceiling on the full post, appended URL included
    pub character_limit: usize,
    /// Length range the model is asked to aim for
    pub target_length: (usize, usize),
    pub max_hashtags: usize,
    pub display_name: &'static str,
    pub tone_guidelines: &'static str,
    pub call_to_action_style: &'static str,
}

pub static PRIMARY_CONFIG: PlatformConfig = PlatformConfig {
    character_limit: 280,
    target_length: (210, 240),
    max_hashtags: 0,
    display_name: "Twitter/X",
    tone_guidelines: "Engaging, conversational, and authentic. Use questions to drive engagement.",
    call_to_action_style: "engaging question",
};

pub static SECONDARY_CONFIG: PlatformConfig = PlatformConfig {
    character_limit: 3000,
    target_length: (600, 1300),
    max_hashtags: 5,
    display_name: "LinkedIn",
    tone_guidelines: "Professional, insightful, and thought-provoking.",
    call_to_action_style: "professional insight",
};
