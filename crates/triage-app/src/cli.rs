//! CLI argument definitions for the triage binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Triage: route patient symptoms to specialist personas and write
/// prescription reports.
#[derive(Parser, Debug)]
#[command(name = "triage", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Data directory for the SQLite database and API token.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Hold a consultation in the terminal.
    Chat {
        /// Specialist to start with.
        #[arg(short = 's', long = "specialty")]
        specialty: Option<String>,
        /// Patient identifier used when saving reports.
        #[arg(long = "patient", default_value = "local")]
        patient: String,
    },
    /// List the configured specialists in matching order.
    Specialists {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Priority: --config flag > TRIAGE_CONFIG env var > ~/.triage/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TRIAGE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > TRIAGE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("TRIAGE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Priority: --data-dir flag > config file value.
    pub fn resolve_data_dir(&self, config_dir: &str) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => expand_home(config_dir),
        }
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        Some(rest) => home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".triage").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_default_command_is_serve() {
        assert_eq!(parse(&["triage"]).command(), Command::Serve);
    }

    #[test]
    fn test_chat_subcommand() {
        let args = parse(&["triage", "chat", "-s", "eye", "--patient", "p1"]);
        assert_eq!(
            args.command(),
            Command::Chat {
                specialty: Some("eye".to_string()),
                patient: "p1".to_string(),
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["triage", "specialists", "--json", "-c", "/tmp/t.toml"]);
        assert_eq!(args.command(), Command::Specialists { json: true });
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/t.toml"));
    }

    #[test]
    fn test_port_flag_wins() {
        let args = parse(&["triage", "--port", "9000"]);
        assert_eq!(args.resolve_port(3040), 9000);
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        assert_eq!(parse(&["triage"]).resolve_log_level("warn"), "warn");
        assert_eq!(parse(&["triage", "-l", "debug"]).resolve_log_level("warn"), "debug");
    }

    #[test]
    fn test_data_dir_flag_and_plain_paths() {
        let args = parse(&["triage", "-d", "/var/lib/triage"]);
        assert_eq!(args.resolve_data_dir("~/.triage/data"), PathBuf::from("/var/lib/triage"));
        assert_eq!(parse(&["triage"]).resolve_data_dir("/srv/data"), PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_home("~/.triage/data");
        assert!(expanded.ends_with(".triage/data"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
