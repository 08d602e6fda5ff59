use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Pipeline stage an upstream failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Audience,
    Extraction,
    Analysis,
    Generation,
    StyleMatching,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Audience => "audience analysis",
            Stage::Extraction => "topic extraction",
            Stage::Analysis => "emotion analysis",
            Stage::Generation => "content generation",
            Stage::StyleMatching => "style matching",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Validation error: text cannot be empty")]
    EmptyInput,
    #[error("Upstream error during {stage}: {message}")]
    Upstream {
        stage: Stage,
        message: String,
        /// Set for failures no later call can recover from, e.g. rejected credentials
        fatal: bool,
    },
    #[error("Constraint violation: {platform} post is {length} characters, limit is {limit}")]
    ConstraintViolation {
        platform: Platform,
        length: usize,
        limit: usize,
    },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Parse error: {0}")]
    ParseError(&'static str),
}

/// Wire-level classification of an [`Error`], carried on error frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Upstream,
    ConstraintViolation,
    Transport,
}

impl Error {
    pub fn upstream(stage: Stage, message: impl Into<String>) -> Self {
        Error::Upstream {
            stage,
            message: message.into(),
            fatal: false,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::EmptyInput => ErrorKind::Validation,
            Error::Upstream { .. } | Error::ParseError(_) => ErrorKind::Upstream,
            Error::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            Error::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether the whole run must stop rather than only the current pair
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Validation(_) | Error::EmptyInput | Error::Transport(_) => true,
            Error::Upstream { fatal, .. } => *fatal,
            Error::ConstraintViolation { .. } | Error::ParseError(_) => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
