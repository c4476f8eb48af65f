mod output;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use daylight_core::chat::ChatManager;
use daylight_core::prompts::{build_prompt, Scenario};
use daylight_core::provider::{create_provider, Provider};
use daylight_core::sentiment::{conversation_history, SentimentAnalyzer};
use daylight_core::server::MISSING_API_KEY;
use daylight_core::{Config, Server};
use daylight_std::{default_registry, VectorSearchInput, VectorSearchPlugin};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "daylight")]
#[command(about = "Daylight customer-support assistant")]
#[command(version)]
struct Cli {
    /// Path to a config.yaml (defaults to ./config.yaml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server for the chat widget
    Serve {
        /// Address to bind, e.g. 0.0.0.0:3000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Ask the assistant a single question
    Ask {
        message: String,
        /// Override the model
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Query the knowledge base directly
    Search {
        query: String,
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: u32,
        #[arg(short, long, default_value_t = 0.75)]
        threshold: f64,
        /// Print the raw JSON tool output
        #[arg(long)]
        json: bool,
    },
    /// Classify sentiment and priority of a conversation (JSON file or stdin)
    Sentiment {
        file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Print the chat system prompt
    Prompt {
        /// Scenarios to include (defaults to the configured ones)
        #[arg(short, long, value_delimiter = ',')]
        scenario: Vec<Scenario>,
        /// List available scenarios
        #[arg(long)]
        list: bool,
    },
    /// Print the effective configuration
    Config,
    /// Check that a running server responds
    Health {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::from_filename(".env.local").ok();
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daylight_core=info,daylight_std=info".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(),
    };
    tracing::debug!("Using {} model {}", config.llm.provider, config.llm.model);

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Ask { message, model } => ask(config, &message, model).await,
        Commands::Search {
            query,
            top_k,
            threshold,
            json,
        } => search(&config, query, top_k, threshold, json).await,
        Commands::Sentiment { file, json } => sentiment(&config, file, json).await,
        Commands::Prompt { scenario, list } => {
            if list {
                for scenario in Scenario::ALL {
                    println!("{}", scenario);
                }
            } else if scenario.is_empty() {
                println!("{}", build_prompt(&config.prompt_scenarios));
            } else {
                println!("{}", build_prompt(&scenario));
            }
            Ok(())
        }
        Commands::Config => {
            let mut shown = config;
            if shown.llm.api_key.is_some() {
                shown.llm.api_key = Some("********".to_string());
            }
            print!("{}", serde_yaml::to_string(&shown)?);
            Ok(())
        }
        Commands::Health { url } => health(&url).await,
    }
}

async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    let config = match bind {
        Some(bind) => config.with_bind(bind),
        None => config,
    };
    if config.llm.resolve_api_key().is_none() {
        eprintln!("{} {}", "warning:".yellow().bold(), MISSING_API_KEY);
    }

    let registry = default_registry(&config.tools);
    println!(
        "{} http://{} ({} tools)",
        "Daylight listening on".green(),
        config.server.bind,
        registry.get_count()
    );
    Server::new(config, registry).start().await?;
    Ok(())
}

fn provider_for(config: &Config) -> Result<Arc<dyn Provider>> {
    let api_key = config
        .llm
        .resolve_api_key()
        .ok_or_else(|| anyhow!(MISSING_API_KEY))?;
    Ok(create_provider(&config.llm, reqwest::Client::new(), api_key)?)
}

async fn ask(config: Config, message: &str, model: Option<String>) -> Result<()> {
    let config = match model {
        Some(model) => config.with_model(model),
        None => config,
    };
    let provider = provider_for(&config)?;
    let registry = Arc::new(default_registry(&config.tools));
    let manager = ChatManager::new(&config, provider, registry);

    let outcome = manager.query(message).await?;
    println!("{}", output::render_outcome(&outcome));
    Ok(())
}

async fn search(config: &Config, query: String, top_k: u32, threshold: f64, json: bool) -> Result<()> {
    let input = VectorSearchInput::new(query)
        .with_top_k(top_k)
        .with_score_threshold(threshold);
    input.validate()?;

    let plugin = VectorSearchPlugin::from_config(&config.tools.vector_search);
    let response = plugin.run_vector_search(&input).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", output::render_search(&response));
    }
    Ok(())
}

async fn sentiment(config: &Config, file: Option<PathBuf>, json: bool) -> Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let payload: Value = serde_json::from_str(&raw).context("Conversation must be JSON")?;

    let analyzer = SentimentAnalyzer::new(provider_for(config)?, config.llm.model.clone());
    let analysis = analyzer.analyze(&conversation_history(payload)).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        println!("{}", output::render_analysis(&analysis));
    }
    Ok(())
}

async fn health(url: &str) -> Result<()> {
    let endpoint = format!("{}/health", url.trim_end_matches('/'));
    let response = reqwest::get(&endpoint)
        .await
        .with_context(|| format!("Failed to reach {}", endpoint))?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() && body["status"] == "ok" {
        println!("{} {}", "healthy".green().bold(), endpoint);
        Ok(())
    } else {
        bail!("{} returned {} {}", endpoint, status, body)
    }
}
