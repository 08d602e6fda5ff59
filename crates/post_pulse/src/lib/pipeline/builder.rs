use context_store::{ContextStore, NoContextStore};

use crate::{
    llm::{
        topic_extractor::DEFAULT_MAX_TOPICS, AudienceAnalyzer, EmotionAnalyzer, NoAudienceAnalysis,
        NoStyleMatching, PostGenerator, StyleMatcher, TopicExtractor,
    },
    pipeline::{ContentPipeline, IterationOrder},
};

/// Builds a [`ContentPipeline`]. The extractor, analyzer and generator are required;
/// the context store, audience analyzer and style matcher default to no-ops.
pub struct ContentPipelineBuilder<
    X = (),
    A = (),
    G = (),
    C = NoContextStore,
    U = NoAudienceAnalysis,
    M = NoStyleMatching,
> {
    extractor: X,
    analyzer: A,
    generator: G,
    context_store: C,
    audience: U,
    style_matcher: M,
    max_topics: usize,
    concurrency: usize,
    iteration_order: IterationOrder,
}

impl Default for ContentPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentPipelineBuilder {
    pub const DEFAULT_CONCURRENCY: usize = 2;

    pub fn new() -> Self {
        Self {
            extractor: (),
            analyzer: (),
            generator: (),
            context_store: NoContextStore,
            audience: NoAudienceAnalysis,
            style_matcher: NoStyleMatching,
            max_topics: DEFAULT_MAX_TOPICS,
            concurrency: Self::DEFAULT_CONCURRENCY,
            iteration_order: IterationOrder::default(),
        }
    }
}

impl<X, A, G, C, U, M> ContentPipelineBuilder<X, A, G, C, U, M> {
    pub fn topic_extractor<X2: TopicExtractor + Send + Sync + 'static>(
        self,
        extractor: X2,
    ) -> ContentPipelineBuilder<X2, A, G, C, U, M> {
        ContentPipelineBuilder {
            extractor,
            analyzer: self.analyzer,
            generator: self.generator,
            context_store: self.context_store,
            audience: self.audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn analyzer<A2: EmotionAnalyzer + Send + Sync + 'static>(
        self,
        analyzer: A2,
    ) -> ContentPipelineBuilder<X, A2, G, C, U, M> {
        ContentPipelineBuilder {
            extractor: self.extractor,
            analyzer,
            generator: self.generator,
            context_store: self.context_store,
            audience: self.audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn generator<G2: PostGenerator + Send + Sync + 'static>(
        self,
        generator: G2,
    ) -> ContentPipelineBuilder<X, A, G2, C, U, M> {
        ContentPipelineBuilder {
            extractor: self.extractor,
            analyzer: self.analyzer,
            generator,
            context_store: self.context_store,
            audience: self.audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn context_store<C2: ContextStore + Send + Sync + 'static>(
        self,
        context_store: C2,
    ) -> ContentPipelineBuilder<X, A, G, C2, U, M> {
        ContentPipelineBuilder {
            extractor: self.extractor,
            analyzer: self.analyzer,
            generator: self.generator,
            context_store,
            audience: self.audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn audience_analyzer<U2: AudienceAnalyzer + Send + Sync + 'static>(
        self,
        audience: U2,
    ) -> ContentPipelineBuilder<X, A, G, C, U2, M> {
        ContentPipelineBuilder {
            extractor: self.extractor,
            analyzer: self.analyzer,
            generator: self.generator,
            context_store: self.context_store,
            audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn style_matcher<M2: StyleMatcher + Send + Sync + 'static>(
        self,
        style_matcher: M2,
    ) -> ContentPipelineBuilder<X, A, G, C, U, M2> {
        ContentPipelineBuilder {
            extractor: self.extractor,
            analyzer: self.analyzer,
            generator: self.generator,
            context_store: self.context_store,
            audience: self.audience,
            style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }

    pub fn max_topics(mut self, max_topics: usize) -> Self {
        self.max_topics = max_topics.max(1);
        self
    }

    /// Number of pairs allowed in flight at once
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn iteration_order(mut self, iteration_order: IterationOrder) -> Self {
        self.iteration_order = iteration_order;
        self
    }
}

impl<X, A, G, C, U, M> ContentPipelineBuilder<X, A, G, C, U, M>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    pub fn build(self) -> ContentPipeline<X, A, G, C, U, M> {
        ContentPipeline {
            extractor: self.extractor,
            analyzer: self.analyzer,
            generator: self.generator,
            context_store: self.context_store,
            audience: self.audience,
            style_matcher: self.style_matcher,
            max_topics: self.max_topics,
            concurrency: self.concurrency,
            iteration_order: self.iteration_order,
        }
    }
}
