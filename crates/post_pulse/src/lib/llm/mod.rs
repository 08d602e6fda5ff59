pub mod analyzer;
pub mod audience;
pub mod generator;
pub(crate) mod json;
pub mod openai;
pub mod style;
pub mod topic_extractor;

pub use analyzer::EmotionAnalyzer;
pub use audience::{AudienceAnalyzer, NoAudienceAnalysis};
pub use generator::PostGenerator;
pub use style::{NoStyleMatching, StyleMatcher};
pub use topic_extractor::{TopicCandidate, TopicExtractor};
