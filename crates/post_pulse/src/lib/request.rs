use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    platform::Platform,
};

/// Body accepted by both the streaming and the batch endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    #[serde(default)]
    pub target_platforms: Vec<String>,
    /// Provenance only, never fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>,
}

impl GenerateRequest {
    pub fn new(text: impl Into<String>, platforms: &[Platform]) -> Self {
        GenerateRequest {
            text: text.into(),
            target_platforms: platforms.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn validate(self) -> Result<ValidatedRequest> {
        if self.text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        if self.target_platforms.is_empty() {
            return Err(Error::Validation(
                "target_platforms must contain at least one platform".into(),
            ));
        }

        let mut platforms = self
            .target_platforms
            .iter()
            .map(|p| p.parse::<Platform>())
            .collect::<Result<Vec<_>>>()?;
        platforms.sort();
        platforms.dedup();

        Ok(ValidatedRequest {
            text: self.text,
            platforms,
            original_url: non_blank(self.original_url),
            user_handle: non_blank(self.user_handle),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A request that passed validation: non-empty text and a non-empty,
/// deduplicated platform set in canonical order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub text: String,
    pub platforms: Vec<Platform>,
    pub original_url: Option<String>,
    pub user_handle: Option<String>,
}
