//! SupportChat application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Initialize logging
//! 3. Run the chosen subcommand: the API server, a terminal chat, document
//!    management, or model listing

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use supportchat_api::{start_server, AppState};
use supportchat_chat::{CompletionProvider, GeminiProvider, MockCompletion};
use supportchat_client::{load_or_create_session_id, AdminStore, ApiClient, ChatStore};
use supportchat_core::config::SupportConfig;
use supportchat_core::types::Role;
use supportchat_storage::Database;

use cli::{ChatArgs, CliArgs, Command, DocsAction, DocsArgs, ServeArgs};

type AppResult = Result<(), Box<dyn std::error::Error>>;

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> AppResult {
    let args = CliArgs::parse();

    // Config is read before logging so its level applies; a load error is
    // reported once the subscriber exists.
    let config_path = args.resolve_config_path();
    let loaded = SupportConfig::load(&config_path);
    let config_level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_tracing(&args.resolve_log_level(&config_level));

    let mut config = match loaded {
        Ok(config) => {
            tracing::info!(path = %config_path.display(), "Configuration loaded");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %config_path.display(),
                error = %e,
                "Failed to load config, using defaults"
            );
            SupportConfig::default()
        }
    };
    config.llm.api_key = cli::resolve_api_key(&config.llm.api_key);

    match args.command {
        None => serve(config, ServeArgs::default()).await,
        Some(Command::Serve(serve_args)) => serve(config, serve_args).await,
        Some(Command::Chat(chat_args)) => chat(&config, chat_args).await,
        Some(Command::Docs(docs_args)) => docs(&config, docs_args).await,
        Some(Command::Models) => models(&config).await,
        Some(Command::Init { force }) => init_config(&config_path, force),
    }
}

// =============================================================================
// serve
// =============================================================================

async fn serve(mut config: SupportConfig, args: ServeArgs) -> AppResult {
    tracing::info!("Starting SupportChat v{}", env!("CARGO_PKG_VERSION"));

    config.server.port = args.resolve_port(config.server.port);
    config.server.host = args.resolve_host(&config.server.host);
    config.database.path = args.resolve_database(&config.database.path);

    let db = Database::new(Path::new(&config.database.path))?;
    tracing::info!(path = %config.database.path, "SQLite database opened");

    let provider: Arc<dyn CompletionProvider> = match args.mock_reply {
        Some(text) => {
            tracing::warn!("Using mock completion provider; replies are fixed text");
            Arc::new(MockCompletion::reply(text))
        }
        None => {
            if config.llm.api_key.trim().is_empty() {
                tracing::warn!("GEMINI_API_KEY is not set; chat replies will be error text");
            }
            let gemini = GeminiProvider::new(&config.llm)?;
            tracing::info!(model = gemini.model(), "Gemini provider ready");
            Arc::new(gemini)
        }
    };

    let state = AppState::new(config, Arc::new(db), provider);
    start_server(state).await?;
    Ok(())
}

// =============================================================================
// chat
// =============================================================================

async fn chat(config: &SupportConfig, args: ChatArgs) -> AppResult {
    let base = args.server.resolve(&config.server.host, config.server.port);
    let session_id = match args.session.clone() {
        Some(id) => id,
        None => load_or_create_session_id(&args.resolve_session_file()),
    };

    let mut store = ChatStore::new(ApiClient::new(&base)?, session_id);
    if let Err(e) = store.load_history().await {
        eprintln!("Could not load history from {}: {}", base, e);
    }

    println!("Session {} on {}. Type /quit to leave.", store.session_id(), base);
    for message in store.messages() {
        print_message(message.role, &message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" || line == "/exit" {
            break;
        }
        if let Some(reply) = store.send_message(line).await {
            print_message(reply.role, &reply.content);
        }
    }

    Ok(())
}

fn print_message(role: Role, content: &str) {
    let label = match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    };
    println!("{}: {}", label, content);
}

// =============================================================================
// docs
// =============================================================================

async fn docs(config: &SupportConfig, args: DocsArgs) -> AppResult {
    let base = args.server.resolve(&config.server.host, config.server.port);
    let mut store = AdminStore::new(ApiClient::new(&base)?);

    match args.action {
        DocsAction::List => {
            store.fetch_documents().await?;
            if store.documents().is_empty() {
                println!("No documents.");
            }
            for doc in store.documents() {
                println!(
                    "{}  {}  {}",
                    doc.id,
                    doc.created_at.format("%Y-%m-%d %H:%M"),
                    doc.title
                );
            }
        }
        DocsAction::Add {
            title,
            content,
            file,
        } => {
            let doc = match (file, content) {
                (Some(path), _) => store.upload_path(title.as_deref(), &path).await?,
                (None, Some(content)) => {
                    store
                        .upload_document(title.as_deref().unwrap_or_default(), &content)
                        .await?
                }
                (None, None) => return Err("either --content or --file is required".into()),
            };
            println!("Created {} ({})", doc.id, doc.title);
        }
        DocsAction::Delete { id } => {
            store.delete_document(&id).await?;
            println!("Document deleted");
        }
    }

    Ok(())
}

// =============================================================================
// models
// =============================================================================

async fn models(config: &SupportConfig) -> AppResult {
    let provider = GeminiProvider::new(&config.llm)?;
    let models = provider.list_models().await?;
    for model in models {
        println!(
            "{}  [{}]",
            model.name,
            model.supported_generation_methods.join(", ")
        );
    }
    Ok(())
}

// =============================================================================
// init
// =============================================================================

fn init_config(path: &Path, force: bool) -> AppResult {
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    SupportConfig::default().save(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}
