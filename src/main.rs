//! Kindred CLI entry point.
//!
//! Provides `chat`, `ask`, `persona`, `profile`, and `reset` subcommands.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use kindred::adapters::cli;
use kindred::config::{load_effective_config, runtime_paths, Config};
use kindred::credentials::resolve_api_key;
use kindred::engine::{ConversationEngine, EngineSettings, TurnOutcome};
use kindred::persona::PersonaId;
use kindred::profile::{self, UserProfile};
use kindred::providers::build_backend;
use kindred::store::{JsonFileStore, KeyValueStore};

/// Kindred — a mood-aware conversational companion.
#[derive(Parser)]
#[command(name = "kindred", version, about)]
struct Cli {
    /// Config file (defaults to `~/.kindred/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation.
    Chat,
    /// Send a single message and print the reply.
    Ask {
        /// Message text.
        text: String,
    },
    /// Show the personas, or select one.
    Persona {
        /// Persona to select (Supportive, Calm, Cheerful, Practical).
        id: Option<PersonaId>,
    },
    /// Show the remembered profile.
    Profile,
    /// Forget the profile and restore the default persona.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Chat => handle_chat(cli.config.as_deref()).await,
        Command::Ask { text } => handle_ask(cli.config.as_deref(), &text).await,
        Command::Persona { id } => handle_persona(cli.config.as_deref(), id),
        Command::Profile => handle_profile(cli.config.as_deref()),
        Command::Reset => handle_reset(cli.config.as_deref()),
    }
}

/// Run the interactive chat with file logging.
async fn handle_chat(config_path: Option<&Path>) -> anyhow::Result<()> {
    let paths = runtime_paths()?;
    let _logging_guard = kindred::logging::init_chat(&paths.logs_dir)?;

    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    info!(persona = %engine.persona(), "chat started");
    cli::run_repl(engine).await
}

/// Run one turn and print the reply.
async fn handle_ask(config_path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    kindred::logging::init_cli();

    let config = load_config(config_path)?;
    let engine = build_engine(&config)?;
    let outcome = engine.submit(text).await?;

    let last = engine.transcript().pop();
    if let Some(message) = last {
        println!("{}", message.text);
    }
    match outcome {
        TurnOutcome::Failed(e) => Err(anyhow::anyhow!(e)),
        TurnOutcome::Answered { .. } | TurnOutcome::Cancelled => Ok(()),
    }
}

/// List personas or persist a new selection.
fn handle_persona(config_path: Option<&Path>, id: Option<PersonaId>) -> anyhow::Result<()> {
    kindred::logging::init_cli();

    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    match id {
        Some(persona) => {
            profile::save_persona(store.as_ref(), persona)
                .context("failed to save persona")?;
            println!("persona: {}", persona.display_name());
        }
        None => {
            let current = profile::load_persona(store.as_ref());
            println!("{}", cli::render_personas(current, &PersonaId::ALL));
        }
    }
    Ok(())
}

/// Print the stored profile.
fn handle_profile(config_path: Option<&Path>) -> anyhow::Result<()> {
    kindred::logging::init_cli();

    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let profile = profile::load_profile(store.as_ref());
    let persona = profile::load_persona(store.as_ref());
    println!("{}", cli::render_profile(&profile, persona));
    Ok(())
}

/// Restore the default profile and persona.
fn handle_reset(config_path: Option<&Path>) -> anyhow::Result<()> {
    kindred::logging::init_cli();

    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    profile::save_profile(store.as_ref(), &UserProfile::default())
        .context("failed to reset profile")?;
    profile::save_persona(store.as_ref(), PersonaId::default())
        .context("failed to reset persona")?;
    info!("profile reset");
    println!("profile and persona reset");
    Ok(())
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn load_config(config_path: Option<&Path>) -> anyhow::Result<Config> {
    load_effective_config(config_path, |key| std::env::var(key).ok())
        .context("failed to load configuration")
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    let state_file = match &config.storage.state_file {
        Some(path) => path.clone(),
        None => runtime_paths()?.state_file,
    };
    Ok(Arc::new(JsonFileStore::open(state_file)))
}

fn build_engine(config: &Config) -> anyhow::Result<Arc<ConversationEngine>> {
    let paths = runtime_paths()?;
    let store = open_store(config)?;

    let api_key = resolve_api_key(&paths.env_file, &config.model.api_key_env, |key| {
        std::env::var(key).ok()
    });
    let backend = match build_backend(&config.model, api_key) {
        Ok(backend) => {
            info!(model = backend.model_id(), "model backend ready");
            Some(backend)
        }
        Err(e) => {
            warn!(error = %e, "running without a model backend");
            None
        }
    };

    let settings = EngineSettings {
        limits: config.prompt_limits(),
        flourishes: config.conversation.flourishes,
        seed: config.conversation.seed,
        ..EngineSettings::default()
    };
    let engine = ConversationEngine::new(settings, backend, store)
        .context("failed to build conversation engine")?;
    Ok(Arc::new(engine))
}
