//! CLI entrypoint for Voice Copilot
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use voice_application::{
    RunSessionError, SessionContext, SessionOrchestrator, ShutdownState, TelemetryBackend,
    TelemetryEmitter, TokioSchedulerProbe, ToolProviderRegistry, spawn_signal_listener,
};
use voice_domain::telemetry::names::service;
use voice_domain::{ConversationId, ToolProvider};
use voice_infrastructure::{
    BridgeCommand, BridgeTransport, ConfigLoader, FileConfig, FileTelemetryBackend, JoinRequest,
    JsonlSpanBackend, LangfuseBackend, LangfuseSettings, McpToolProvider, OsSignals,
    spawn_periodic_flush,
};
use voice_presentation::{Cli, ConsoleFormatter};

fn main() -> Result<()> {
    // .env values win over the inherited environment
    if let Err(e) = dotenvy::dotenv_override()
        && !e.not_found()
    {
        eprintln!("warning: could not load .env: {e}");
    }

    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the tokio runtime")?
        .block_on(run(cli))
}

/// Logs go to stderr; stdout may be the bridge channel.
fn init_logging(cli: &Cli) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));

    let (file_layer, guard) = match &cli.log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("--log-file {} has no file name", path.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()?
    } else {
        ConfigLoader::load(cli.config.as_deref())?
    };

    for issue in config.validate() {
        warn!("Config: {}", issue);
    }

    // === CLI overrides ===
    if let Some(url) = &cli.room_url {
        config.bridge.room_url = Some(url.clone());
    }
    if let Some(token) = &cli.token {
        config.bridge.token = Some(token.clone());
    }
    if let Some(program) = &cli.bridge_command {
        config.bridge.command = Some(program.clone());
        config.bridge.args = cli.bridge_args.clone();
    }
    if cli.enable_tracing {
        config.telemetry.enabled = true;
    }
    Ok(config)
}

fn telemetry_backend(
    config: &FileConfig,
    conversation_id: ConversationId,
) -> Option<Arc<dyn TelemetryBackend>> {
    if !config.telemetry.enabled {
        info!("Tracing disabled");
        return None;
    }
    match config.telemetry.backend {
        FileTelemetryBackend::Langfuse => {
            let langfuse = &config.telemetry.langfuse;
            info!(host = %langfuse.host, "Tracing to Langfuse");
            Some(Arc::new(LangfuseBackend::new(
                LangfuseSettings {
                    host: langfuse.host.clone(),
                    public_key: langfuse.public_key.clone(),
                    secret_key: langfuse.secret_key.clone(),
                },
                service::VOICE_SESSION,
                &conversation_id.to_string(),
            )))
        }
        FileTelemetryBackend::Jsonl => match JsonlSpanBackend::new(&config.telemetry.jsonl_path) {
            Ok(backend) => {
                info!(path = %backend.path().display(), "Tracing to JSONL file");
                Some(Arc::new(backend))
            }
            Err(e) => {
                warn!("Tracing disabled: {}", e);
                None
            }
        },
    }
}

fn tool_providers(config: &FileConfig) -> Vec<Arc<dyn ToolProvider>> {
    config
        .effective_providers()
        .into_iter()
        .filter_map(|entry| match entry.endpoint() {
            Ok(endpoint) => {
                info!(provider = %entry.name, endpoint = %endpoint.describe(), "Tool provider configured");
                Some(Arc::new(McpToolProvider::new(entry.name, endpoint)) as Arc<dyn ToolProvider>)
            }
            Err(e) => {
                warn!("Skipping tool provider: {}", e);
                None
            }
        })
        .collect()
}

async fn run(cli: Cli) -> Result<()> {
    if cli.show_config {
        let sources = ConfigLoader::config_sources(cli.config.as_deref());
        println!(
            "{}",
            ConsoleFormatter::format_config_sources(
                sources
                    .iter()
                    .map(|s| (s.label, s.location.as_str(), s.found))
            )
        );
        return Ok(());
    }

    let config = load_config(&cli)?;
    let conversation_id = ConversationId::new();

    // === Dependency Injection ===
    let backend = telemetry_backend(&config, conversation_id);
    let telemetry = match &backend {
        Some(backend) => TelemetryEmitter::new(Arc::clone(backend)),
        None => TelemetryEmitter::disabled(),
    };

    let registry = Arc::new(
        ToolProviderRegistry::new(tool_providers(&config), telemetry.clone())
            .with_list_timeout(config.list_timeout()),
    );

    if cli.list_tools {
        let toolset = registry.register_all().await;
        println!("{}", ConsoleFormatter::format_toolset(&toolset));
        registry.close_all().await;
        telemetry.flush().await?;
        return Ok(());
    }

    let bridge = Arc::new(match &config.bridge.command {
        Some(program) => BridgeTransport::spawn(&BridgeCommand {
            program: program.clone(),
            args: config.bridge.args.clone(),
            env: config.bridge.env.clone(),
        })?,
        None => BridgeTransport::stdio(),
    });
    bridge
        .join(&JoinRequest {
            room_url: config.bridge.room_url.clone(),
            token: config.bridge.token.clone(),
            bot_name: config.bridge.bot_name.clone(),
        })
        .await
        .context("failed to send the join request to the bridge")?;

    let closing = CancellationToken::new();
    let context = Arc::new(
        SessionContext::new(
            Arc::new(ShutdownState::new()),
            bridge.clone(),
            bridge,
            registry,
            telemetry,
        )
        .with_conversation_id(conversation_id),
    );
    // Tracked so the shutdown drain settles it before the final flush
    if let Some(backend) = backend
        && let Some(every) = config.telemetry.flush_interval()
    {
        spawn_periodic_flush(context.tasks(), backend, every);
    }
    let orchestrator = SessionOrchestrator::new(
        context,
        Arc::new(TokioSchedulerProbe::new(closing.clone())),
        config.session_params(),
    );

    let signals = OsSignals::install().context("failed to install signal handlers")?;
    let listener = spawn_signal_listener(signals, orchestrator.coordinator());

    let result = orchestrator.run().await;

    listener.abort();
    closing.cancel();

    match result {
        Ok(summary) => {
            eprintln!(
                "{}",
                ConsoleFormatter::format_session_end(&summary.conversation_id, summary.tools_count)
            );
            Ok(())
        }
        Err(e @ RunSessionError::Cancelled) => {
            info!("Session cancelled");
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}
