//! gencache CLI
//!
//! Usage:
//!   gencache article <QUERY> [--locale en_US] [--json]
//!   gencache ideas <QUERY> [--locale en_US]
//!   gencache page <QUERY> [--locale en_US]
//!   gencache status
//!
//! Credentials and tuning come from the environment (GOOGLE_API_KEY,
//! OPENAI_API_KEY, ARTICLE_CACHE_TTL_SECONDS, ...). Logs go to stderr,
//! results to stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gencache_core::{GenerationResult, IdeaList};
use gencache_runtime::{Engine, EngineConfig, InMemoryMetrics, ProviderDescriptor, ProviderDiagnostics};

#[derive(Parser)]
#[command(name = "gencache")]
#[command(about = "Resilient generation cache for articles and idea lists", long_about = None)]
#[command(version)]
struct Cli {
    /// Print collected metrics to stderr when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an article
    Article {
        /// Topic to write about
        query: String,

        /// Locale of the article
        #[arg(short, long, default_value = "en_US")]
        locale: String,

        /// Print the full result as JSON instead of the HTML alone
        #[arg(long)]
        json: bool,
    },

    /// Generate follow-up ideas as JSON
    Ideas {
        query: String,

        #[arg(short, long, default_value = "en_US")]
        locale: String,
    },

    /// Generate an article and its ideas concurrently, printed as JSON
    Page {
        query: String,

        #[arg(short, long, default_value = "en_US")]
        locale: String,
    },

    /// Show effective configuration and configured providers
    Status,
}

#[derive(Serialize)]
struct Page {
    article: GenerationResult,
    ideas: IdeaList,
}

#[derive(Serialize)]
struct Status {
    providers: Vec<ProviderSummary>,
    diagnostics: Vec<ProviderDiagnostics>,
    config: EngineConfig,
}

#[derive(Serialize)]
struct ProviderSummary {
    provider: &'static str,
    credential: String,
    model: String,
    fallback_models: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let metrics = Arc::new(InMemoryMetrics::new());
    let engine = Engine::from_env(metrics.clone()).context("Invalid engine configuration")?;

    match cli.command {
        Commands::Article { query, locale, json } => {
            let article = engine.generate(&query, &locale).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&article)?);
            } else {
                println!("{}", article.html);
            }
        }

        Commands::Ideas { query, locale } => {
            let ideas = engine.generate_ideas(&query, &locale).await;
            println!("{}", serde_json::to_string_pretty(&ideas)?);
        }

        Commands::Page { query, locale } => {
            let (article, ideas) = tokio::join!(
                engine.generate(&query, &locale),
                engine.generate_ideas(&query, &locale)
            );
            println!("{}", serde_json::to_string_pretty(&Page { article, ideas })?);
        }

        Commands::Status => {
            let config = EngineConfig::from_env();
            let providers: Vec<ProviderSummary> = ProviderDescriptor::from_env(&config)
                .into_iter()
                .map(|d| ProviderSummary {
                    provider: d.kind.name(),
                    credential: d.credential.to_string(),
                    model: d.model,
                    fallback_models: d.fallback_models,
                })
                .collect();
            if providers.is_empty() {
                info!("No provider credentials found, placeholders will be served");
            }
            let status = Status {
                providers,
                diagnostics: engine.diagnostics(),
                config,
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    if cli.metrics {
        eprintln!("{}", serde_json::to_string_pretty(&metrics.snapshot())?);
    }

    Ok(())
}
