//! memchat-server binary entry point.
//!
//! Parses the command line, loads `memchat.toml` and `.env`, initialises
//! tracing, then either scaffolds a project, prints the configuration, runs
//! the terminal chat or serves the HTTP API with graceful shutdown.

use anyhow::{Context, Result};
use memchat::{
    api::routes::create_app,
    cli::{
        init::{self, InitConfig, InitResult},
        output::Output,
        repl, Cli, Commands,
    },
    utils::toml_config::{ConfigManager, LogFormat, MemchatConfig, ProviderConfig},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    // Load .env before anything reads API key variables
    dotenvy::dotenv().ok();

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            minimal,
            provider,
            gate,
            host,
            port,
        }) => {
            let result = init::run(
                InitConfig {
                    path,
                    force,
                    minimal,
                    provider,
                    gate,
                    host,
                    port,
                },
                &output,
            );
            match result {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => anyhow::bail!(e),
            }
        }
        Some(Commands::Config { full, validate }) => {
            show_config(&cli.config, full, validate, &output)
        }
        Some(Commands::Chat { user, persona }) => {
            // Keep the terminal clean: only warnings unless asked for more
            init_tracing(if cli.verbose { "debug" } else { "warn" }, LogFormat::Pretty);
            let manager = Arc::new(ConfigManager::new(&cli.config).with_context(|| {
                format!("Failed to load {}", cli.config.display())
            })?);
            let state = AppState::from_config(manager)?;
            repl::run(&state, &user, persona.as_deref(), &output).await?;
            Ok(())
        }
        Some(Commands::Serve) | None => serve(&cli.config, cli.verbose).await,
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},memchat={level},tower_http=info")));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

async fn serve(config_path: &std::path::Path, verbose: bool) -> Result<()> {
    let mut manager = ConfigManager::new(config_path).with_context(|| {
        format!(
            "Failed to load {} (run `memchat-server init` to create one)",
            config_path.display()
        )
    })?;

    let config = manager.config();
    let level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    init_tracing(level, config.server.log_format);

    if let Err(e) = manager.start_watching() {
        tracing::warn!(error = %e, "Config hot reload disabled");
    }

    let state = AppState::from_config(Arc::new(manager))?;
    let app = create_app(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("memchat listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn show_config(
    path: &std::path::Path,
    full: bool,
    validate: bool,
    output: &Output,
) -> Result<()> {
    output.header(&format!("Configuration: {}", path.display()));

    let config = if validate {
        match MemchatConfig::load(path) {
            Ok(config) => {
                output.success("Configuration is valid");
                config
            }
            Err(e) => {
                output.error(&e.to_string());
                anyhow::bail!("invalid configuration");
            }
        }
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str::<MemchatConfig>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?
    };

    output.subheader("Server");
    output.kv("address", &format!("{}:{}", config.server.host, config.server.port));
    output.kv("log level", &config.server.log_level);

    output.subheader("Chat");
    output.kv("provider", &config.chat.provider);
    if let Some(model) = &config.chat.model {
        output.kv("model", model);
    }
    output.kv("temperature", &config.chat.temperature.to_string());
    output.kv("streaming", &config.chat.stream.to_string());

    output.subheader("Memory");
    output.kv("backend", &config.memory.backend.to_string());
    output.kv("gate", &config.memory.gate.to_string());
    output.kv("search limit", &config.memory.search_limit.to_string());

    output.subheader("Providers");
    output.table_header(&["Name", "Type", "Model"]);
    let mut providers: Vec<_> = config.providers.iter().collect();
    providers.sort_by(|a, b| a.0.cmp(b.0));
    for (name, provider) in providers {
        let (kind, model) = match provider {
            ProviderConfig::OpenAI { default_model, .. } => ("openai", default_model),
            ProviderConfig::Gemini { default_model, .. } => ("gemini", default_model),
        };
        output.table_row(&[name.as_str(), kind, model.as_str()]);
    }

    output.subheader("Personas");
    if config.personas.is_empty() {
        output.info("none configured");
    } else {
        let mut personas: Vec<_> = config.personas.iter().collect();
        personas.sort_by(|a, b| a.0.cmp(b.0));
        for (key, persona) in personas {
            output.list_item(&format!("{} ({})", key, persona.name.as_deref().unwrap_or(key)));
            if full {
                output.hint(&persona.system_prompt);
            }
        }
    }

    if full {
        output.newline();
        println!("{}", toml::to_string_pretty(&config)?);
    }

    Ok(())
}
