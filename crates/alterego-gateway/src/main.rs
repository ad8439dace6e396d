use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use alterego_agent::{
    CompletionProvider, IntentClassifier, KeywordClassifier, ModelClassifier, OpenAiProvider,
    TimeoutProvider,
};
use alterego_channels::ChannelGateway;
use alterego_core::config::{
    AlterEgoConfig, IntentStrategy, ProviderKind, RunMode, StoreBackend,
};
use alterego_instagram::InstagramAdapter;
use alterego_manychat::ManyChatAdapter;
use alterego_router::{MessageRouter, PersonaProfile, RouterLimits};
use alterego_sessions::{ConversationStore, InMemoryStore, SqliteStore};

mod app;
mod auth;
mod http;
mod poll;

#[derive(Debug, Parser)]
#[command(name = "alterego-gateway", version, about = "Alter ego chat relay")]
struct Cli {
    /// Path to alterego.toml (also read from ALTEREGO_CONFIG).
    #[arg(long, env = "ALTEREGO_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Poll Instagram direct messages only.
    Poll,
    /// Serve the HTTP API and ManyChat webhook only.
    Serve,
    /// Serve HTTP, and poll Instagram when credentials are configured (default).
    Run,
}

impl From<Command> for RunMode {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::Poll => RunMode::Poll,
            Command::Serve => RunMode::Serve,
            Command::Run => RunMode::Run,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "alterego_gateway=info,alterego_router=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let mode: RunMode = cli.command.unwrap_or(Command::Run).into();

    // load config: --config / ALTEREGO_CONFIG > ~/.alterego/alterego.toml, then env overrides
    let config = AlterEgoConfig::load(cli.config.as_deref()).context("loading configuration")?;
    config.validate(mode)?;

    info!(
        ?mode,
        profile = ?config.persona.profile,
        provider = ?config.provider.kind,
        store = ?config.database.backend,
        git_sha = env!("ALTEREGO_GIT_SHA"),
        "starting alter ego relay"
    );

    let provider = build_provider(&config)?;
    let store = build_store(&config)?;
    let profile = PersonaProfile::from_config(&config.persona);
    let intent = build_intent(&config, &profile, Arc::clone(&provider));
    let router = Arc::new(
        MessageRouter::new(profile, store, provider, intent)
            .with_limits(RouterLimits::from(&config.persona)),
    );

    let cancel = CancellationToken::new();
    setup_shutdown_signal(cancel.clone());

    let poll_enabled = match mode {
        RunMode::Poll => true,
        RunMode::Serve => false,
        RunMode::Run => config.instagram.is_configured(),
    };
    let poller = if poll_enabled {
        let adapter = InstagramAdapter::new(&config.instagram)?;
        let interval = Duration::from_secs(config.instagram.poll_interval_secs);
        let poll = poll::PollLoop::new(Box::new(adapter), Arc::clone(&router), interval);
        Some(tokio::spawn(poll.run(cancel.clone())))
    } else {
        if mode == RunMode::Run {
            info!("instagram credentials not set, polling disabled");
        }
        None
    };

    if mode == RunMode::Poll {
        if let Some(handle) = poller {
            handle.await.context("poll loop panicked")?;
        }
        return Ok(());
    }

    let manychat = ManyChatAdapter::from_config(&config.manychat)
        .map(|a| Box::new(a) as Box<dyn ChannelGateway>);
    if manychat.is_none() {
        warn!("manychat api_token not set, /webhook replies will not be delivered");
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .context("invalid gateway bind address")?;
    let state = Arc::new(app::AppState::new(config, router, manychat, poll_enabled));
    let app = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("alter ego gateway listening on {}", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // the server may also stop on its own; make sure the poller follows
    cancel.cancel();
    if let Some(handle) = poller {
        let _ = handle.await;
    }
    info!("shutdown complete");
    Ok(())
}

/// Build the completion provider from config, wrapped in the request timeout.
fn build_provider(config: &AlterEgoConfig) -> anyhow::Result<Arc<dyn CompletionProvider>> {
    let p = &config.provider;
    let inner: Box<dyn CompletionProvider> = match p.kind {
        ProviderKind::Azure => {
            let endpoint = p
                .endpoint
                .as_deref()
                .context("provider.endpoint is required for azure")?;
            info!(endpoint, deployment = %p.deployment, "LLM provider: Azure OpenAI");
            Box::new(OpenAiProvider::azure(
                p.api_key.clone(),
                endpoint,
                &p.deployment,
                &p.api_version,
            ))
        }
        ProviderKind::Openai => {
            let model = p.model.clone().unwrap_or_else(|| p.deployment.clone());
            info!(model = %model, "LLM provider: OpenAI");
            Box::new(OpenAiProvider::openai(
                p.api_key.clone(),
                p.endpoint.clone(),
                model,
            ))
        }
    };
    Ok(Arc::new(TimeoutProvider::new(
        inner,
        Duration::from_secs(p.timeout_secs),
    )))
}

fn build_store(config: &AlterEgoConfig) -> anyhow::Result<Arc<dyn ConversationStore>> {
    let store: Arc<dyn ConversationStore> = match config.database.backend {
        StoreBackend::Memory => {
            info!("conversation store: in-memory");
            Arc::new(InMemoryStore::new())
        }
        StoreBackend::Sqlite => {
            info!(path = %config.database.path, "conversation store: SQLite");
            Arc::new(
                SqliteStore::open(&config.database.path)
                    .with_context(|| format!("opening {}", config.database.path))?,
            )
        }
    };
    Ok(store)
}

fn build_intent(
    config: &AlterEgoConfig,
    profile: &PersonaProfile,
    provider: Arc<dyn CompletionProvider>,
) -> Arc<dyn IntentClassifier> {
    match config.persona.intent {
        IntentStrategy::Keyword => Arc::new(KeywordClassifier::new(
            &profile.activate_phrase,
            &profile.deactivate_phrase,
        )),
        IntentStrategy::Model => Arc::new(ModelClassifier::new(
            provider,
            &profile.activate_phrase,
            &profile.deactivate_phrase,
        )),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn setup_shutdown_signal(token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("received Ctrl+C, shutting down"),
            _ = terminate => info!("received SIGTERM, shutting down"),
        }
        token.cancel();
    });
}
