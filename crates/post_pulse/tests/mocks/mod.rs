pub mod analyzer;
pub mod audience;
pub mod context_store;
pub mod extractor;
pub mod generator;
pub mod sink;
pub mod style;
