//! Triage application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize tracing
//! 3. Dispatch the subcommand: HTTP API (default), terminal chat,
//!    specialist listing or config scaffolding

mod cli;
mod console;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;

use triage_api::auth::load_or_generate_token;
use triage_api::routes;
use triage_api::state::AppState;
use triage_chat::{build_generator, DialogueRouter};
use triage_core::{TriageConfig, TriageError};
use triage_storage::{ConsultationRepository, Database};

use cli::{CliArgs, Command};
use console::ChatConsole;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let loaded = TriageConfig::load(&config_file);
    let config_level = match &loaded {
        Ok(config) => config.general.log_level.clone(),
        Err(_) => TriageConfig::default().general.log_level,
    };
    let log_level = args.resolve_log_level(&config_level);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_file.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %config_file.display(),
                error = %e,
                "Failed to load config, using defaults"
            );
            TriageConfig::default()
        }
    };

    match args.command() {
        Command::Serve => {
            config.general.port = args.resolve_port(config.general.port);
            serve(&args, config).await?;
        }
        Command::Chat { specialty, patient } => {
            let specialty = specialty.unwrap_or_else(|| config.dialogue.default_specialty.clone());
            chat(&args, &config, &specialty, &patient).await?;
        }
        Command::Specialists { json } => specialists(&config, json)?,
        Command::InitConfig { force } => init_config(&config_file, force)?,
    }

    Ok(())
}

/// Open the SQLite database under the resolved data directory.
fn open_database(
    args: &CliArgs,
    config: &TriageConfig,
) -> Result<(Database, PathBuf), TriageError> {
    let data_dir = args.resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("triage.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok((db, data_dir))
}

async fn serve(args: &CliArgs, config: TriageConfig) -> Result<(), TriageError> {
    tracing::info!("Starting Triage v{}", env!("CARGO_PKG_VERSION"));

    let (db, data_dir) = open_database(args, &config)?;
    let generator = build_generator(&config.generative);

    let mut state = AppState::new(config.clone(), generator, db)?;
    state.api_token = load_or_generate_token(&data_dir.join("api_token"));
    tracing::info!(
        specialists = state.router.catalog().len(),
        policy = ?state.router.policy(),
        "Dialogue router ready"
    );

    routes::start_server(&config, state).await
}

async fn chat(
    args: &CliArgs,
    config: &TriageConfig,
    specialty: &str,
    patient: &str,
) -> Result<(), TriageError> {
    let (db, _) = open_database(args, config)?;
    let consultations = ConsultationRepository::new(Arc::new(db));

    let router = DialogueRouter::new(
        config.catalog()?,
        build_generator(&config.generative),
        &config.dialogue,
        Duration::from_secs(config.generative.timeout_secs),
    )?;

    let console = ChatConsole::new(&router, &config.report, Some(&consultations), patient);
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    console.run(specialty, stdin, &mut stdout).await
}

fn specialists(config: &TriageConfig, json: bool) -> Result<(), TriageError> {
    let catalog = config.catalog()?;

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.profiles())?);
        return Ok(());
    }

    let default_key = &catalog.default_profile().key;
    for profile in catalog.profiles() {
        let marker = if &profile.key == default_key { "*" } else { " " };
        println!(
            "{} {:<12} {:<16} {}",
            marker,
            profile.key,
            profile.title,
            profile.scope.join(", ")
        );
    }
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), TriageError> {
    if path.exists() && !force {
        return Err(TriageError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    TriageConfig::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_config_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        init_config(&path, false).unwrap();
        let loaded = TriageConfig::load(&path).unwrap();
        assert_eq!(loaded.general.port, TriageConfig::default().general.port);

        let err = init_config(&path, false).unwrap_err();
        assert!(matches!(err, TriageError::Config(_)));
        assert!(init_config(&path, true).is_ok());
    }

    #[test]
    fn test_open_database_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let args = CliArgs::parse_from(["triage", "-d", data_dir.to_str().unwrap()]);

        let (_db, resolved) = open_database(&args, &TriageConfig::default()).unwrap();
        assert_eq!(resolved, data_dir);
        assert!(data_dir.join("triage.db").exists());
    }
}
