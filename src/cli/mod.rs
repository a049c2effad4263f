//! CLI argument parsing and command dispatch

mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use probe_bench_core::{
    BatchConfig, Concurrency, OrchestratorBuilder, ProbeClient, ProbeMode, ProbeTask,
    DEFAULT_PROMPT,
};
use probe_bench_vendors::{ClientConfig, OpenAiClient};

/// probe-bench - Probe many chat models on one endpoint, a few at a time
#[derive(Parser, Debug)]
#[command(name = "probe-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the models served by the endpoint
    Models {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },
    /// Send one prompt to one model and print the full response
    Probe {
        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Model to probe
        #[arg(short, long)]
        model: String,

        /// Prompt to send (blank uses the built-in greeting)
        #[arg(short, long, default_value = "")]
        prompt: String,
    },
    /// Probe several models concurrently and report successes first
    Batch {
        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Models to probe, in submission order
        #[arg(required_unless_present = "config")]
        models: Vec<String>,

        /// Prompt shared by every probe (blank uses the built-in greeting)
        #[arg(short, long)]
        prompt: Option<String>,

        /// Maximum probes in flight (clamped to 1..=20)
        #[arg(short, long, allow_negative_numbers = true)]
        concurrency: Option<i64>,

        /// JSON batch configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the sorted results as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Connection and request options shared by every command
#[derive(Args, Debug)]
pub struct EndpointArgs {
    /// Base URL of the OpenAI-compatible endpoint
    #[arg(short, long, env = "BASE_URL")]
    pub base_url: String,

    /// API key (falls back to OPENAI_API_KEY)
    #[arg(short = 'k', long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-probe timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Request incremental (streamed) responses
    #[arg(long)]
    pub stream: bool,

    /// Completion budget (default 80, or 250 when streaming)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Show unparsable stream frames in the response text
    #[arg(long)]
    pub mark_malformed: bool,
}

impl EndpointArgs {
    fn client_config(&self) -> Result<ClientConfig> {
        let api_key = self
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .context("no API key given: pass --api-key or set API_KEY / OPENAI_API_KEY")?;

        let mode = if self.stream {
            ProbeMode::Streaming
        } else {
            ProbeMode::SingleShot
        };

        let mut config = ClientConfig::new(&self.base_url)
            .with_api_key(api_key)
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_mode(mode)
            .with_malformed_markers(self.mark_malformed);
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        Ok(config)
    }

    fn client(&self) -> Result<OpenAiClient> {
        OpenAiClient::new(self.client_config()?).context("invalid endpoint configuration")
    }
}

impl Cli {
    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Models { endpoint } => run_models(&endpoint).await,
            Commands::Probe {
                endpoint,
                model,
                prompt,
            } => run_probe(&endpoint, &model, &prompt).await,
            Commands::Batch {
                endpoint,
                models,
                prompt,
                concurrency,
                config,
                json,
            } => {
                let batch = batch_config(models, prompt, concurrency, config)?;
                run_batch(&endpoint, batch, json).await
            }
        }
    }
}

async fn run_models(endpoint: &EndpointArgs) -> Result<()> {
    let client = endpoint.client()?;
    let models = client
        .list_models()
        .await
        .with_context(|| format!("failed to list models at {}", client.endpoint()))?;

    if models.is_empty() {
        println!("No models found.");
    }
    for model in &models {
        println!("{model}");
    }
    tracing::info!(count = models.len(), "Listed models");
    Ok(())
}

async fn run_probe(endpoint: &EndpointArgs, model: &str, prompt: &str) -> Result<()> {
    let client = endpoint.client()?;
    let prompt = match prompt.trim() {
        "" => DEFAULT_PROMPT,
        prompt => prompt,
    };
    let task = ProbeTask::new(0, model.trim(), prompt);

    tracing::info!(model = %task.model, mode = %client.mode(), "Probing model");
    let output = client
        .probe(&task)
        .await
        .with_context(|| format!("probe of {} failed", task.model))?;

    render::print_probe(&task.model, &output);
    Ok(())
}

/// Merge the optional config file with command-line overrides
fn batch_config(
    models: Vec<String>,
    prompt: Option<String>,
    concurrency: Option<i64>,
    path: Option<PathBuf>,
) -> Result<BatchConfig> {
    let mut config = match &path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            serde_json::from_str::<BatchConfig>(&raw)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?
        }
        None => BatchConfig::default(),
    };

    if !models.is_empty() {
        config.models = models;
    }
    if let Some(prompt) = prompt {
        config.prompt = prompt;
    }
    if let Some(level) = concurrency {
        config.concurrency = Concurrency::from(level);
    }

    config.validate().context("invalid batch configuration")?;
    if config.models.is_empty() {
        anyhow::bail!("no models to probe");
    }
    Ok(config)
}

async fn run_batch(endpoint: &EndpointArgs, config: BatchConfig, json: bool) -> Result<()> {
    let client = Arc::new(endpoint.client()?);
    let (orchestrator, events) = OrchestratorBuilder::new()
        .config(config)
        .client(client)
        .build_with_events()
        .context("failed to set up batch")?;

    let progress = render::track(orchestrator.task_count(), events, !json)?;
    let report = orchestrator.run().await;
    if let Err(e) = progress.await {
        tracing::warn!(error = %e, "Progress display stopped early");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }
    Ok(())
}
