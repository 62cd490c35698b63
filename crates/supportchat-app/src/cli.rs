//! CLI argument definitions for the SupportChat binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// SupportChat: customer-support chat backend with document grounding.
#[derive(Parser, Debug)]
#[command(name = "supportchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API server (default).
    Serve(ServeArgs),
    /// Chat with a running server from the terminal.
    Chat(ChatArgs),
    /// Manage reference documents on a running server.
    Docs(DocsArgs),
    /// List models available to the configured API key.
    Models,
    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind.
    #[arg(long)]
    pub host: Option<String>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// SQLite database file.
    #[arg(short = 'd', long = "database")]
    pub database: Option<PathBuf>,

    /// Answer every message with this text instead of calling the provider.
    #[arg(long = "mock-reply")]
    pub mock_reply: Option<String>,
}

#[derive(Args, Debug)]
pub struct ServerArg {
    /// Server root URL. Defaults to the configured host and port.
    #[arg(short = 's', long = "server")]
    pub server: Option<String>,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    #[command(flatten)]
    pub server: ServerArg,

    /// Session id to use instead of the persisted one.
    #[arg(long)]
    pub session: Option<String>,

    /// File holding the persisted session id.
    #[arg(long = "session-file")]
    pub session_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DocsArgs {
    #[command(flatten)]
    pub server: ServerArg,

    #[command(subcommand)]
    pub action: DocsAction,
}

#[derive(Subcommand, Debug)]
pub enum DocsAction {
    /// List documents, newest first.
    List,
    /// Upload a document from text or a UTF-8 file.
    Add {
        #[arg(short = 't', long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,
    },
    /// Delete a document by id.
    Delete { id: String },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SUPPORTCHAT_CONFIG env var > ./supportchat.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("SUPPORTCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("supportchat.toml")
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

impl ServeArgs {
    /// Resolve the API server port.
    ///
    /// Priority: --port flag > SUPPORTCHAT_PORT > PORT > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        for var in ["SUPPORTCHAT_PORT", "PORT"] {
            if let Some(p) = std::env::var(var).ok().and_then(|v| v.parse::<u16>().ok()) {
                return p;
            }
        }
        config_port
    }

    /// Priority: --host flag > config file value.
    pub fn resolve_host(&self, config_host: &str) -> String {
        self.host.clone().unwrap_or_else(|| config_host.to_string())
    }

    /// Resolve the database path.
    ///
    /// Priority: --database flag > SUPPORTCHAT_DATABASE > config file value.
    pub fn resolve_database(&self, config_path: &str) -> String {
        if let Some(ref p) = self.database {
            return p.to_string_lossy().to_string();
        }
        if let Ok(p) = std::env::var("SUPPORTCHAT_DATABASE") {
            return p;
        }
        config_path.to_string()
    }
}

impl ServerArg {
    /// Priority: --server flag > http://<config host>:<config port>.
    ///
    /// A wildcard bind address is reached through loopback.
    pub fn resolve(&self, config_host: &str, config_port: u16) -> String {
        if let Some(ref s) = self.server {
            return s.clone();
        }
        let host = match config_host {
            "0.0.0.0" | "::" | "" => "127.0.0.1",
            other => other,
        };
        format!("http://{}:{}", host, config_port)
    }
}

impl ChatArgs {
    /// Priority: --session-file flag > ~/.supportchat/session_id.
    pub fn resolve_session_file(&self) -> PathBuf {
        if let Some(ref p) = self.session_file {
            return p.clone();
        }
        home_dir()
            .map(|h| h.join(".supportchat").join("session_id"))
            .unwrap_or_else(|| PathBuf::from(".supportchat_session"))
    }
}

/// Resolve the provider API key.
///
/// Priority: GEMINI_API_KEY env var > config file value.
pub fn resolve_api_key(config_key: &str) -> String {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .unwrap_or_else(|| config_key.to_string())
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let var = "USERPROFILE";
    #[cfg(not(target_os = "windows"))]
    let var = "HOME";
    std::env::var(var).ok().map(PathBuf::from)
}
