//! Artifact admin console
//!
//! A line-oriented console for editing the artifacts in a store: select one, edit its buffer,
//! save (or let autosave do it), browse history, restore old versions and pull the remote
//! reference copy.
//!
//! # Usage
//!
//! ```bash
//! # Edit a JSON store document
//! cargo run -p artifact-admin -- --store site-artifacts.json --identity alice
//!
//! # Throwaway in-memory store with sample artifacts
//! cargo run -p artifact-admin -- --memory
//!
//! # Pull remote references from a CDN
//! cargo run -p artifact-admin -- --reference-url https://cdn.example.com/site/
//! ```
//!
//! Type `help` at the prompt for the command list. Logging goes to stderr and is controlled by
//! `ARTIFACT_ADMIN_LOG` (for example `ARTIFACT_ADMIN_LOG=artifact_core=debug`).

mod command;
mod config;
mod console;

use artifact_core::{ArtifactKind, Coordinator, Gateway, MemoryGateway, ThreadSpawner};
use artifact_core_store::{DirectoryReferenceSource, HttpReferenceSource, JsonFileStore};
use artifact_core_validate::ValidationPipeline;
use clap::Parser;
use config::AdminConfig;
use console::{Console, Flow, TICK};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ARTIFACT_ADMIN_LOG";

#[derive(Debug, Parser)]
#[command(name = "artifact-admin", version, about = "Edit versioned text artifacts")]
struct Args {
    /// Configuration file (JSON).
    #[arg(long, default_value = "artifact-admin.json")]
    config: PathBuf,

    /// Store document; overrides the configuration file.
    #[arg(long, conflicts_with = "memory")]
    store: Option<PathBuf>,

    /// Use an in-memory store seeded with sample artifacts.
    #[arg(long)]
    memory: bool,

    /// Base URL for remote reference pulls.
    #[arg(long)]
    reference_url: Option<String>,

    /// Local directory for remote reference pulls.
    #[arg(long, conflicts_with = "reference_url")]
    reference_dir: Option<PathBuf>,

    /// Identity recorded on writes.
    #[arg(long)]
    identity: Option<String>,

    /// Autosave quiet period in milliseconds (0 disables autosave).
    #[arg(long)]
    autosave_ms: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("artifact-admin: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AdminConfig::load(&args.config)?;
    apply_overrides(&mut config, &args);
    init_logging(config.log_filter());

    let gateway = open_gateway(&config, args.memory)?;
    let validator = Arc::new(ValidationPipeline::new()?);
    let coordinator = Coordinator::new(gateway, validator)
        .with_spawner(Arc::new(ThreadSpawner::with_name("artifact-store")))
        .with_config(config.session.clone());

    let mut console = Console::new(coordinator, io::stdout());
    console.execute("refresh")?;
    console.drain()?;
    tracing::info!(
        artifacts = console.coordinator().artifacts().len(),
        "console ready"
    );

    let lines = spawn_stdin_reader();
    console.prompt()?;
    loop {
        match lines.recv_timeout(TICK) {
            Ok(line) => {
                if console.execute(&line)? == Flow::Quit {
                    break;
                }
                console.tick()?;
                console.prompt()?;
            }
            Err(RecvTimeoutError::Timeout) => console.tick()?,
            Err(RecvTimeoutError::Disconnected) => {
                // End of input: let pending writes and autosaves finish before leaving.
                console.drain()?;
                break;
            }
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut AdminConfig, args: &Args) {
    if let Some(store) = &args.store {
        config.store_path = Some(store.clone());
    }
    if let Some(url) = &args.reference_url {
        config.reference_base_url = Some(url.clone());
        config.reference_dir = None;
    }
    if let Some(dir) = &args.reference_dir {
        config.reference_dir = Some(dir.clone());
        config.reference_base_url = None;
    }
    if let Some(identity) = &args.identity {
        config.session.editor_identity = identity.clone();
    }
    match args.autosave_ms {
        Some(0) => config.session.autosave_enabled = false,
        Some(ms) => config.session.autosave_delay_ms = ms,
        None => {}
    }
}

fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .try_init();
}

fn open_gateway(
    config: &AdminConfig,
    memory: bool,
) -> Result<Arc<dyn Gateway>, Box<dyn std::error::Error>> {
    if memory {
        return Ok(Arc::new(demo_gateway()?));
    }

    let path = config.store_path();
    let store = JsonFileStore::open(&path)?;
    let store = match (&config.reference_base_url, &config.reference_dir) {
        (Some(url), _) => store.with_references(HttpReferenceSource::new(url.clone())),
        (None, Some(dir)) => store.with_references(DirectoryReferenceSource::new(dir)),
        (None, None) => store,
    };
    tracing::debug!(path = %path.display(), "opened store");
    Ok(Arc::new(store))
}

fn demo_gateway() -> Result<MemoryGateway, artifact_core::GatewayError> {
    let gateway = MemoryGateway::new();
    gateway.seed(
        "site/index.html",
        ArtifactKind::Html,
        "<!doctype html>\n<html>\n  <body>\n    <h1>Hello</h1>\n  </body>\n</html>\n",
    )?;
    gateway.seed(
        "site/app.js",
        ArtifactKind::JavaScript,
        "const greeting = 'hello';\nconsole.log(greeting);\n",
    )?;
    gateway.seed(
        "site/style.css",
        ArtifactKind::Css,
        "body {\n  margin: 0;\n  font-family: sans-serif;\n}\n",
    )?;
    gateway.seed(
        "config/site.json",
        ArtifactKind::Json,
        "{\n  \"title\": \"Demo\",\n  \"theme\": \"light\"\n}\n",
    )?;
    gateway.seed("notes.txt", ArtifactKind::Text, "remember to publish\n")?;

    gateway.insert_reference(
        "site/app.js",
        "const greeting = 'hello from upstream';\nconsole.log(greeting);\n",
    );
    gateway.insert_reference(
        "config/site.json",
        "{\n  \"title\": \"Demo\",\n  \"theme\": \"dark\"\n}\n",
    );
    Ok(gateway)
}

/// Read stdin on its own thread so the main loop can keep polling while waiting for input.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::error!("failed to spawn stdin reader: {e}");
    }
    rx
}
