//! Agora daemon: entry point for running a knowledge engine node.

use agora_directory::{AgentTopics, HttpIdentityResolver, IdentityResolver, StaticIdentityResolver};
use agora_ledger::{MirrorClient, MirrorConfig, TopicLedger};
use agora_node::{EngineDeps, EngineMetrics, KnowledgeEngine, LedgerBackend, NodeConfig};
use agora_nullables::InMemoryLedger;
use agora_reputation::{HttpReputationLedger, ReputationLedger};
use agora_rpc::RpcServer;
use agora_types::{AgentId, Category, SystemClock};
use agora_utils::{init_logging, LogFormat};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "agora-daemon", about = "Agora knowledge engine daemon")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(long, env = "AGORA_RPC_PORT")]
    rpc_port: Option<u16>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<String>,

    /// Keep every topic in process memory instead of talking to a ledger.
    #[arg(long, env = "AGORA_IN_MEMORY")]
    in_memory: bool,

    /// Enable the Prometheus metrics endpoint.
    #[arg(long, env = "AGORA_ENABLE_METRICS")]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the HTTP API until interrupted.
    Serve,
    /// Append any missing finalizations and reputation deltas, then exit.
    Reconcile,
    /// Print every item grouped by status.
    Items,
    /// Print the derived reputation of an agent.
    Reputation {
        agent: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_string_lossy();
            NodeConfig::from_toml_file(&path).with_context(|| format!("loading config {path}"))?
        }
        None => NodeConfig::default(),
    };
    if let Some(port) = cli.rpc_port {
        config.rpc_port = port;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if cli.in_memory {
        config.ledger.backend = LedgerBackend::Memory;
    }
    config.enable_metrics |= cli.metrics;

    let format: LogFormat = config.log_format.parse()?;
    init_logging(format, &config.log_level);
    if let Some(path) = &cli.config {
        tracing::info!(path = %path.display(), "loaded config");
    }

    let engine = Arc::new(build_engine(config.clone())?);

    match cli.command {
        Command::Serve => {
            tracing::info!(
                port = config.rpc_port,
                backend = ?config.ledger.backend,
                threshold = config.threshold,
                "starting agora daemon"
            );
            RpcServer::new(config.bind_address.clone(), config.rpc_port)
                .with_metrics(config.enable_metrics)
                .start(engine, shutdown_signal())
                .await?;
            tracing::info!("agora daemon exited cleanly");
        }
        Command::Reconcile => print_json(&engine.reconcile().await?)?,
        Command::Items => print_json(&engine.list_items().await?)?,
        Command::Reputation { agent } => {
            let agent = AgentId::parse(agent)?;
            print_json(&engine.reputation(&agent).await?)?;
        }
    }

    Ok(())
}

/// Wire the engine's collaborators from configuration.
fn build_engine(mut config: NodeConfig) -> anyhow::Result<KnowledgeEngine> {
    let ledger: Arc<dyn TopicLedger> = match config.ledger.backend {
        LedgerBackend::Http => Arc::new(MirrorClient::new(&MirrorConfig {
            mirror_url: config.ledger.mirror_url.clone(),
            gateway_url: config.ledger.gateway_url.clone(),
            timeout: Duration::from_secs(config.ledger.timeout_secs),
        })?),
        LedgerBackend::Memory => {
            let memory = Arc::new(InMemoryLedger::new());
            provision_in_memory(&mut config, &memory);
            tracing::warn!("using the in-memory ledger; nothing will be persisted");
            memory
        }
    };

    let identity: Arc<dyn IdentityResolver> = match &config.identity.url {
        Some(url) => Arc::new(HttpIdentityResolver::with_timeout(
            url.clone(),
            Duration::from_secs(config.ledger.timeout_secs),
        )?),
        None => Arc::new(StaticIdentityResolver::new(
            config.identity.tokens.clone().into_iter().collect(),
        )),
    };

    let secondary = match &config.secondary.url {
        Some(url) => Some(Arc::new(HttpReputationLedger::with_timeout(
            url.clone(),
            Duration::from_secs(config.ledger.timeout_secs),
        )?) as Arc<dyn ReputationLedger>),
        None => None,
    };

    let engine_config = config.engine_config()?;
    Ok(KnowledgeEngine::new(
        engine_config,
        EngineDeps {
            ledger,
            identity,
            secondary,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(EngineMetrics::new()),
        },
    ))
}

/// Create any topic the configuration leaves unset: one per category and a
/// personal/public pair for every agent with a configured token.
fn provision_in_memory(config: &mut NodeConfig, memory: &InMemoryLedger) {
    for category in Category::ALL {
        config
            .topics
            .categories
            .entry(category.as_str().to_string())
            .or_insert_with(|| memory.create_topic());
    }
    if config.topics.discovery.is_none() {
        config.topics.discovery = Some(memory.create_topic());
    }
    for agent in config.identity.tokens.values() {
        config.directory.entry(agent.clone()).or_insert_with(|| AgentTopics {
            personal: memory.create_topic(),
            public: memory.create_topic(),
        });
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
