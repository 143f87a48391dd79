use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snare::config::Config;
use snare::intercept::{serve, Forwarder, Interceptor, ProxyTarget};
use snare::matcher::RuleMatcher;
use snare::recorder::ExchangeRecorder;
use snare::session::SessionRegistry;
use snare::store::{MemoryExchangeStore, MemoryRuleStore, RuleStore};

#[derive(Parser, Debug)]
#[command(name = "snare", about = "HTTP interception proxy with rule-based mocking")]
struct Args {
    /// Listening port; overrides the config file.
    #[arg(short, long, env = "SNARE_PORT")]
    port: Option<u16>,

    /// Path to a YAML config file.
    #[arg(short, long, env = "SNARE_CONFIG")]
    config: Option<String>,

    /// Proxy target domain; overrides the config file.
    #[arg(short, long, env = "SNARE_TARGET")]
    target: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match args.config {
        Some(ref path) => {
            Config::from_file(path).with_context(|| format!("failed to load config {path}"))?
        }
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(target) = args.target {
        config.proxy.target = target;
    }

    let rules = Arc::new(MemoryRuleStore::new());
    for rule in config.rules.drain(..) {
        let name = rule.name.clone();
        let id = rules.create(rule).await?;
        info!(rule = %name, id, "seeded rule");
    }

    let exchanges = Arc::new(MemoryExchangeStore::new());
    let sessions = Arc::new(SessionRegistry::new());
    let target = Arc::new(ProxyTarget::new());
    if !config.proxy.target.is_empty() {
        target.set(&config.proxy.target);
        info!(target = %config.proxy.target, "proxy target configured");
    }

    let matcher = RuleMatcher::new(rules.clone());
    let recorder = ExchangeRecorder::new(exchanges.clone(), sessions.clone());
    let forwarder = Forwarder::new(matcher.clone(), recorder.clone())
        .context("failed to build outbound HTTP client")?;
    let interceptor = Arc::new(Interceptor::new(
        matcher,
        recorder,
        forwarder,
        target,
        config.conditions.clone(),
    ));

    let listener = TcpListener::bind(("0.0.0.0", config.listen.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.listen.port))?;
    info!(port = config.listen.port, "snare listening");

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let server = tokio::spawn(serve(listener, interceptor, shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());
    server.await.context("accept loop panicked")?;

    Ok(())
}
