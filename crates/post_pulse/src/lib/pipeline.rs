pub mod builder;
mod order;
mod run;

use std::{collections::HashMap, time::Instant};

use context_store::{ContextStore, NoContextStore};
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

pub use order::{plan_pairs, IterationOrder};
pub use run::{PipelineRun, RunStatus, RunSummary};

use crate::{
    error::{Error, Result, Stage},
    llm::{
        AudienceAnalyzer, EmotionAnalyzer, NoAudienceAnalysis, NoStyleMatching, PostGenerator,
        StyleMatcher, TopicExtractor,
    },
    platform::Platform,
    request::{GenerateRequest, ValidatedRequest},
    transport::{BatchResponse, BufferSink, Frame, FrameSink},
    types::{PlatformPost, Topic, UserContext},
};

/// The core content pipeline: extract topics and the audience once, then annotate,
/// generate and restyle a post for every (topic, platform) pair, emitting frames into a
/// [`FrameSink`] as it goes.
#[derive(Debug)]
pub struct ContentPipeline<X, A, G, C = NoContextStore, U = NoAudienceAnalysis, M = NoStyleMatching>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
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

impl<X, A, G, C, U, M> ContentPipeline<X, A, G, C, U, M>
where
    X: TopicExtractor + Send + Sync + 'static,
    A: EmotionAnalyzer + Send + Sync + 'static,
    G: PostGenerator + Send + Sync + 'static,
    C: ContextStore + Send + Sync + 'static,
    U: AudienceAnalyzer + Send + Sync + 'static,
    M: StyleMatcher + Send + Sync + 'static,
{
    /// Progress reported once the audience is known, inside the extraction band
    const AUDIENCE_PROGRESS: u8 = 15;

    pub fn max_topics(&self) -> usize {
        self.max_topics
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn iteration_order(&self) -> IterationOrder {
        self.iteration_order
    }

    /// Runs the pipeline, streaming frames into `sink`
    pub async fn run<S: FrameSink + Send>(
        &self,
        request: GenerateRequest,
        sink: S,
    ) -> Result<RunSummary> {
        self.run_with_cancellation(request, sink, CancellationToken::new())
            .await
    }

    /// Runs the pipeline to completion and aggregates the frames into one document
    pub async fn collect(&self, request: GenerateRequest) -> BatchResponse {
        let mut sink = BufferSink::default();
        if let Err(e) = self.run(request, &mut sink).await {
            tracing::error!(error = %e, "Buffered pipeline run did not finish");
        }
        BatchResponse::from_frames(sink.into_frames())
    }

    /// Runs the pipeline until it completes, fails, or `token` is cancelled.
    ///
    /// Every accepted request ends with exactly one terminal frame, either `complete` or a
    /// fatal `error`. The only exception is a sink that stops accepting frames: the run
    /// then cancels `token`, stops starting new pairs and returns
    /// [`Error::Transport`].
    #[tracing::instrument(
        skip_all,
        fields(platforms = ?request.target_platforms, text_len = request.text.len())
    )]
    pub async fn run_with_cancellation<S: FrameSink + Send>(
        &self,
        request: GenerateRequest,
        mut sink: S,
        token: CancellationToken,
    ) -> Result<RunSummary> {
        let started = Instant::now();

        let request = match request.validate() {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected invalid request");
                emit(&mut sink, &token, Frame::fatal(&e)).await?;
                return Ok(RunSummary {
                    status: RunStatus::Failed,
                    total_topics: 0,
                    total_expected: 0,
                    successful_generations: 0,
                    failed_pairs: 0,
                    processing_time: started.elapsed().as_secs_f64(),
                });
            }
        };

        let mut run = PipelineRun::new(&request, started);
        emit(
            &mut sink,
            &token,
            Frame::status(RunStatus::Extracting, 0, "Starting pipeline"),
        )
        .await?;

        let progress = run.advance(RunStatus::Extracting, 5);
        emit(
            &mut sink,
            &token,
            Frame::status(RunStatus::Extracting, progress, "Extracting topics"),
        )
        .await?;

        let (audience, topics) = futures::join!(
            self.audience.extract_audience(&request.text),
            self.extractor.extract(&request.text, self.max_topics),
        );

        let topics = match topics
            .inspect_err(|e| tracing::error!(error = %e, "Failed to extract topics"))
        {
            Ok(topics) => topics,
            Err(e) => return abort(&mut run, &mut sink, &token, Frame::fatal(&e)).await,
        };
        tracing::info!(count = topics.len(), "Extracted topics");
        run.set_topics(topics);

        let audience = match audience {
            Ok(audience) => audience,
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "Failed to analyze audience");
                return abort(&mut run, &mut sink, &token, Frame::fatal(&e)).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to analyze audience, continuing without it");
                None
            }
        };
        if let Some(ref summary) = audience {
            tracing::debug!(audience = %summary, "Identified target audience");
            let progress = run.advance(RunStatus::Analyzing, Self::AUDIENCE_PROGRESS);
            emit(
                &mut sink,
                &token,
                Frame::status(RunStatus::Analyzing, progress, "Identified target audience"),
            )
            .await?;
        }

        let progress = run.advance(RunStatus::Analyzing, PipelineRun::EXTRACTION_BAND);
        emit(
            &mut sink,
            &token,
            Frame::status(
                RunStatus::Analyzing,
                progress,
                format!("Found {} topics", run.topics.len()),
            ),
        )
        .await?;

        let contexts = self.load_user_contexts(&request).await;
        let pairs = plan_pairs(&run.topics, &run.target_platforms, self.iteration_order);
        let original_url = request.original_url.as_deref();
        let audience = audience.as_deref();
        let cancel = &token;

        // `buffered` keeps at most `concurrency` pairs in flight and yields them in
        // submission order
        let mut outcomes = stream::iter(pairs)
            .map(|(topic, platform)| {
                let user_context = contexts.get(&platform);
                async move {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    let result = self
                        .process_pair(&topic, platform, user_context, audience, original_url)
                        .await;
                    Some((topic.id, platform, result))
                }
            })
            .buffered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            if token.is_cancelled() {
                break;
            }
            let Some((topic_id, platform, result)) = outcome else {
                break;
            };

            let result = result.and_then(|post| {
                if run.has_topic(post.topic_id) {
                    Ok(post)
                } else {
                    Err(Error::upstream(
                        Stage::Generation,
                        format!("post references unknown topic {}", post.topic_id),
                    ))
                }
            });

            match result {
                Ok(post) => {
                    let progress = run.record_pair(true);
                    emit(
                        &mut sink,
                        &token,
                        Frame::Post {
                            post,
                            progress_percent: progress,
                        },
                    )
                    .await?;
                }
                Err(e) if e.is_fatal() => {
                    let frame =
                        Frame::pair_error(&e, topic_id, platform, true, run.progress_percent());
                    return abort(&mut run, &mut sink, &token, frame).await;
                }
                Err(e) => {
                    let progress = run.record_pair(false);
                    emit(
                        &mut sink,
                        &token,
                        Frame::pair_error(&e, topic_id, platform, false, progress),
                    )
                    .await?;
                }
            }
        }

        if token.is_cancelled() {
            tracing::info!(
                completed = run.completed_count(),
                "Run cancelled, discarding remaining pairs"
            );
            return Err(Error::Transport("run cancelled".into()));
        }

        let summary = run.complete();
        emit(
            &mut sink,
            &token,
            Frame::Complete {
                total_processing_time: summary.processing_time,
                total_topics: summary.total_topics,
                successful_generations: summary.successful_generations,
                progress_percent: run.progress_percent(),
            },
        )
        .await?;

        tracing::info!(
            total_topics = summary.total_topics,
            successful_generations = summary.successful_generations,
            failed_pairs = summary.failed_pairs,
            processing_time = summary.processing_time,
            "Pipeline run complete"
        );
        Ok(summary)
    }

    /// Loads prior posts for the request's handle on every requested platform.
    /// A failed lookup only loses the personalisation for that platform.
    #[tracing::instrument(skip_all)]
    async fn load_user_contexts(&self, request: &ValidatedRequest) -> HashMap<Platform, UserContext> {
        let Some(handle) = request.user_handle.as_deref() else {
            return HashMap::new();
        };

        let mut contexts = HashMap::with_capacity(request.platforms.len());
        for platform in &request.platforms {
            let prior_posts = self
                .context_store
                .get_context_posts(handle, platform.as_str())
                .await
                .inspect_err(|e| {
                    tracing::warn!(
                        error = ?e,
                        %platform,
                        "Failed to load context posts, continuing without them"
                    )
                })
                .unwrap_or_default();

            contexts.insert(
                *platform,
                UserContext {
                    handle: handle.to_string(),
                    prior_posts,
                },
            );
        }
        contexts
    }

    /// Annotates, generates and restyles one pair. A failed restyle falls back to the
    /// generated post unless the failure is fatal.
    #[tracing::instrument(
        skip(self, topic, user_context, audience, original_url),
        fields(topic_id = topic.id)
    )]
    async fn process_pair(
        &self,
        topic: &Topic,
        platform: Platform,
        user_context: Option<&UserContext>,
        audience: Option<&str>,
        original_url: Option<&str>,
    ) -> Result<PlatformPost> {
        let mut annotation = self
            .analyzer
            .annotate(topic, platform, user_context, audience)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to annotate topic"))?;
        annotation.audience = audience.map(str::to_string);

        let post = self
            .generator
            .generate(topic, &annotation, platform, original_url)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate post"))?;

        match self
            .style_matcher
            .match_style(&post, user_context, original_url)
            .await
        {
            Ok(styled) => Ok(styled),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "Failed to match style");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to match style, keeping generated post");
                Ok(post)
            }
        }
    }
}

async fn emit<S: FrameSink + Send>(
    sink: &mut S,
    token: &CancellationToken,
    frame: Frame,
) -> Result<()> {
    sink.emit(frame).await.inspect_err(|e| {
        tracing::warn!(error = %e, "Failed to emit frame, cancelling run");
        token.cancel();
    })
}

async fn abort<S: FrameSink + Send>(
    run: &mut PipelineRun,
    sink: &mut S,
    token: &CancellationToken,
    frame: Frame,
) -> Result<RunSummary> {
    let summary = run.fail();
    let frame = match run.total_expected() {
        Some(_) => frame.with_total_topics(summary.total_topics),
        None => frame,
    };
    emit(sink, token, frame).await?;
    Ok(summary)
}
