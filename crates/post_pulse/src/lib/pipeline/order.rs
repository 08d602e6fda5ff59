use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{platform::Platform, types::Topic};

/// Order in which (topic, platform) pairs are processed and emitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum IterationOrder {
    /// Every platform for topic 1, then every platform for topic 2, ...
    #[default]
    #[value(alias = "topic_major")]
    TopicMajor,
    /// Every topic for the primary platform, then every topic for the secondary
    #[value(alias = "platform_major")]
    PlatformMajor,
}

impl std::str::FromStr for IterationOrder {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "topic_major" => Ok(IterationOrder::TopicMajor),
            "platform_major" => Ok(IterationOrder::PlatformMajor),
            other => Err(crate::error::Error::Validation(format!(
                "unknown iteration order '{other}'"
            ))),
        }
    }
}

/// Expands topics and platforms into the work items of a run.
///
/// `platforms` is expected in canonical order already.
pub fn plan_pairs(
    topics: &[Topic],
    platforms: &[Platform],
    order: IterationOrder,
) -> Vec<(Topic, Platform)> {
    match order {
        IterationOrder::TopicMajor => topics
            .iter()
            .cloned()
            .cartesian_product(platforms.iter().copied())
            .collect(),
        IterationOrder::PlatformMajor => platforms
            .iter()
            .copied()
            .cartesian_product(topics.iter().cloned())
            .map(|(platform, topic)| (topic, platform))
            .collect(),
    }
}
