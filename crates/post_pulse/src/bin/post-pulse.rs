use std::{
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use context_store::{ContextStore, NoContextStore, PgContextStore};
use post_pulse::{
    openai::{OpenAIClient, DEFAULT_MODEL},
    server::{serve, AppState},
    tracing::init_tracing_subscriber,
    transport::{encode_frame, CallbackSink},
    ContentPipelineBuilder, Error, Frame, GenerateRequest, IterationOrder, RunStatus,
    DEFAULT_MAX_TOPICS,
};

#[derive(Parser)]
#[command(name = "post-pulse", about = "Turns long-form text into social media posts")]
struct Cli {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    openai_key: String,

    /// Base URL of an OpenAI compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Chat model used for every stage
    #[arg(long, env = "POST_PULSE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Database holding prior posts used as user context
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(flatten)]
    pipeline: PipelineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct PipelineArgs {
    /// Maximum topics extracted per request
    #[arg(long, env = "MAX_TOPICS", default_value_t = DEFAULT_MAX_TOPICS)]
    max_topics: usize,

    /// Topic/platform pairs processed concurrently
    #[arg(long, env = "PIPELINE_CONCURRENCY", default_value_t = ContentPipelineBuilder::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    #[arg(long, env = "ITERATION_ORDER", value_enum, default_value_t = IterationOrder::TopicMajor)]
    iteration_order: IterationOrder,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve {
        #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
        bind_address: String,
    },
    /// Run the pipeline once over a text file and print frames to stdout
    Run {
        /// Input text file, `-` for stdin
        input: PathBuf,

        /// Target platform, repeatable
        #[arg(long = "platform", default_values = ["primary", "secondary"])]
        platforms: Vec<String>,

        /// Link appended to every post
        #[arg(long)]
        url: Option<String>,

        /// Handle whose prior posts personalise the output
        #[arg(long)]
        handle: Option<String>,
    },
}

async fn dispatch<C>(
    command: Command,
    args: PipelineArgs,
    openai: OpenAIClient,
    store: C,
) -> anyhow::Result<()>
where
    C: ContextStore + Send + Sync + 'static,
{
    let model = openai.model().to_string();
    let pipeline = ContentPipelineBuilder::new()
        .topic_extractor(openai.clone())
        .audience_analyzer(openai.clone())
        .analyzer(openai.clone())
        .generator(openai.clone())
        .style_matcher(openai)
        .context_store(store)
        .max_topics(args.max_topics)
        .concurrency(args.concurrency)
        .iteration_order(args.iteration_order)
        .build();

    match command {
        Command::Serve { bind_address } => {
            tracing::info!(
                %bind_address,
                %model,
                max_topics = pipeline.max_topics(),
                concurrency = pipeline.concurrency(),
                iteration_order = ?pipeline.iteration_order(),
                "Starting server..."
            );
            let listener = tokio::net::TcpListener::bind(&bind_address)
                .await
                .with_context(|| format!("Failed to bind {bind_address}"))?;
            serve(listener, AppState::new(pipeline, model)).await
        }
        Command::Run {
            input,
            platforms,
            url,
            handle,
        } => {
            let text = read_input(&input)?;
            let request = GenerateRequest {
                text,
                target_platforms: platforms,
                original_url: url,
                user_handle: handle,
            };

            let mut stdout = std::io::stdout();
            let sink = CallbackSink::new(|frame: &Frame| {
                let event = encode_frame(frame).map_err(|e| Error::Transport(e.to_string()))?;
                stdout
                    .write_all(event.as_bytes())
                    .and_then(|_| stdout.flush())
                    .map_err(|e| Error::Transport(e.to_string()))
            });

            let summary = pipeline.run(request, sink).await?;
            if summary.status != RunStatus::Complete {
                anyhow::bail!("Pipeline run failed");
            }
            tracing::info!(
                successful_generations = summary.successful_generations,
                failed_pairs = summary.failed_pairs,
                "Done"
            );
            Ok(())
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        return std::io::read_to_string(std::io::stdin()).context("Failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let mut openai = OpenAIClient::new(cli.openai_key).with_model(cli.model);
    if let Some(base_url) = cli.openai_base_url {
        openai = openai.with_base_url(base_url);
    }

    match cli.database_url {
        Some(database_url) => {
            let store = PgContextStore::init(&database_url).await?;
            dispatch(cli.command, cli.pipeline, openai, store).await
        }
        None => {
            tracing::info!("DATABASE_URL not set, running without user context");
            dispatch(cli.command, cli.pipeline, openai, NoContextStore).await
        }
    }
}
