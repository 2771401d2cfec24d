//! CLI entry point for nyaya

mod output;

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use nyaya_core::config::{Config, ConfigLoader, LoggingConfig};
use nyaya_core::logging::init_logging;
use nyaya_history::{ChatHistory, LoadReport, LoadSource, LocalVault, MessageDraft, RetryPolicy};
use nyaya_providers::{
    Attachment, CounselEvent, CounselProvider, CounselRequest, GeminiClient, HistoryTurn,
    AVAILABLE_MODELS, DEFAULT_MODEL,
};
use nyaya_store::{RestStore, SessionStore};

#[derive(Parser)]
#[command(name = "nyaya")]
#[command(about = "AI legal assistant for Indian law")]
#[command(version = "0.2.1")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize nyaya configuration
    Init,
    /// Ask a legal question
    Ask {
        /// The question to ask
        question: String,
        /// Attach an image of a document
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Model to use for this question
        #[arg(short, long)]
        model: Option<String>,
        /// Session to continue
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Manage chat sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Retry messages that failed to save remotely
    Sync,
    /// List available models
    Models,
    /// Show configuration and synchronization status
    Status,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List sessions
    List,
    /// Show a session transcript
    Show {
        /// Session id (defaults to the current session)
        id: Option<String>,
    },
    /// Switch the current session
    Switch {
        /// Session id
        id: String,
    },
    /// Delete a session
    Delete {
        /// Session id
        id: String,
    },
    /// Delete all sessions
    Clear {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    // The guard flushes buffered log lines on exit
    let logging = loader
        .load()
        .map(|config| config.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let _guard = init_logging(&logging);

    match cli.command {
        Commands::Init => {
            info!("Running init command");
            run_init(&loader)?;
        }
        Commands::Ask {
            question,
            image,
            model,
            session,
        } => {
            info!("Processing question");
            run_ask(&loader, question, image, model, session).await?;
        }
        Commands::Sessions { command } => match command {
            SessionCommands::List => run_sessions_list(&loader).await?,
            SessionCommands::Show { id } => run_sessions_show(&loader, id).await?,
            SessionCommands::Switch { id } => run_sessions_switch(&loader, id).await?,
            SessionCommands::Delete { id } => run_sessions_delete(&loader, id).await?,
            SessionCommands::Clear { yes } => run_sessions_clear(&loader, yes).await?,
        },
        Commands::Sync => {
            info!("Running sync");
            run_sync(&loader).await?;
        }
        Commands::Models => run_models(),
        Commands::Status => {
            info!("Showing status");
            run_status(&loader).await?;
        }
    }

    Ok(())
}

/// Write a starter configuration and create the data directories
fn run_init(loader: &ConfigLoader) -> Result<()> {
    let config_path = loader.config_dir().join("config.json");
    if config_path.exists() {
        println!("Configuration already exists at {}", config_path.display());
        return Ok(());
    }

    let config = Config::default();
    loader.save(&config)?;
    std::fs::create_dir_all(config.history.data_path())?;
    std::fs::create_dir_all(config.logging.log_path())?;

    println!("{}", style("Configuration created.").green().bold());
    println!("Config location: {}", config_path.display());
    println!("\nNext steps:");
    println!("  1. Set store.url, store.api_key and store.user_id in config.json");
    println!("  2. Set provider.api_key (or export GEMINI_API_KEY)");
    println!(
        "  3. Ask your first question: {}",
        style("nyaya ask 'What is an FIR?'").cyan()
    );
    Ok(())
}

fn build_history(config: &Config) -> Result<ChatHistory> {
    if config.store.user_id.trim().is_empty() {
        anyhow::bail!("store.user_id is not set. Run 'nyaya init' and edit config.json.");
    }
    let store = RestStore::from_config(&config.store)?;
    let vault = LocalVault::new(config.history.data_path());
    Ok(ChatHistory::new(
        Arc::new(store),
        vault,
        config.store.user_id.clone(),
        RetryPolicy::from_config(&config.history),
    ))
}

/// Load history behind a spinner and report what happened
async fn load_history(history: &ChatHistory) -> Result<LoadReport> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Loading chat history...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = history.load().await;
    spinner.finish_and_clear();
    let report = report?;

    match report.source {
        LoadSource::Remote => {}
        LoadSource::LocalArchive => println!(
            "{}",
            style("Remote store unreachable; showing locally archived history.").yellow()
        ),
        LoadSource::Empty => println!(
            "{}",
            style("Remote store unreachable; starting a fresh local session.").yellow()
        ),
    }

    if let Some(migrated) = &report.migrated {
        if migrated.skipped_existing {
            println!("Local archive skipped; the remote store already has history.");
        } else if migrated.sessions > 0 {
            println!(
                "{} Migrated {} archived session(s) ({} messages) to the remote store.",
                style("✓").green().bold(),
                migrated.sessions,
                migrated.messages
            );
        }
    }
    if report.deduped > 0 {
        println!("Removed {} duplicate session(s).", report.deduped);
    }
    if report.replayed > 0 {
        println!(
            "{} Replayed {} queued message(s).",
            style("✓").green().bold(),
            report.replayed
        );
    }

    Ok(report)
}

fn image_mime(path: &Path) -> Result<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        _ => anyhow::bail!(
            "Unsupported image type '{}' (expected png, jpg, jpeg, webp or gif)",
            path.display()
        ),
    }
}

/// Ask a question: append the user turn, stream the answer, persist both
async fn run_ask(
    loader: &ConfigLoader,
    question: String,
    image: Option<PathBuf>,
    model: Option<String>,
    session: Option<String>,
) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let config = loader.load()?;
    let provider = GeminiClient::from_config(&config.provider)?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    if let Some(id) = session {
        history.switch_to(&id).await?;
    }

    let attachment = match image {
        Some(path) => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            Some(Attachment::from_bytes(image_mime(&path)?, &bytes))
        }
        None => None,
    };

    // Context is the conversation before this question; the provider caps it
    let turns: Vec<HistoryTurn> = history
        .current_session()
        .await
        .map(|session| {
            session
                .messages
                .iter()
                .map(|m| {
                    if m.sender.is_user() {
                        HistoryTurn::user(m.content.clone())
                    } else {
                        HistoryTurn::model(m.content.clone())
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let mut request = CounselRequest::new(question.clone()).with_turns(turns);
    if let Some(attachment) = attachment {
        request = request.with_attachment(attachment);
    }
    if let Some(model) = model {
        request = request.with_model(model);
    }

    history.append_to_current(MessageDraft::user(question)).await?;

    println!("{}", style("Assistant:").bold().green());
    let mut stream = provider.counsel_stream(request).await?;
    let mut reply = None;
    let mut stdout = std::io::stdout();
    while let Some(event) = stream.next().await {
        match event? {
            CounselEvent::Delta(text) => {
                print!("{}", text);
                stdout.flush()?;
            }
            CounselEvent::Completed(decoded) => reply = Some(decoded),
        }
    }
    println!();

    let reply = reply.ok_or_else(|| anyhow::anyhow!("Stream ended without a final reply"))?;
    output::print_reply_metadata(&reply);

    let draft = MessageDraft::assistant(reply.content).with_metadata(
        reply.legal_references,
        reply.action_steps,
        reply.contact_info,
    );
    history.append_to_current(draft).await?;

    let failed = history.failed_ids().await.len();
    if failed > 0 {
        println!(
            "\n{}",
            style(format!(
                "{} message(s) could not be saved remotely; run 'nyaya sync' to retry.",
                failed
            ))
            .yellow()
        );
    }
    Ok(())
}

async fn run_sessions_list(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    let sessions = history.sessions().await;
    let current = history.current_session_id().await;
    output::print_session_list(&sessions, current.as_deref());
    Ok(())
}

async fn run_sessions_show(loader: &ConfigLoader, id: Option<String>) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    let session = match id {
        Some(id) => history
            .session(&id)
            .await
            .ok_or_else(|| anyhow::anyhow!("Session not found: {}", id))?,
        None => history
            .current_session()
            .await
            .ok_or_else(|| anyhow::anyhow!("No current session"))?,
    };
    output::print_session(&session);
    Ok(())
}

async fn run_sessions_switch(loader: &ConfigLoader, id: String) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    history.switch_to(&id).await?;
    println!("{} Switched to session {}", style("✓").green().bold(), id);
    Ok(())
}

async fn run_sessions_delete(loader: &ConfigLoader, id: String) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    history.delete_session(&id).await?;
    println!("{} Deleted session {}", style("✓").green().bold(), id);
    Ok(())
}

async fn run_sessions_clear(loader: &ConfigLoader, yes: bool) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    load_history(&history).await?;

    let count = history.sessions().await.len();
    if count == 0 {
        println!("No sessions to clear.");
        return Ok(());
    }

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete all {} session(s)? This cannot be undone.",
                count
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Clear cancelled.");
            return Ok(());
        }
    }

    history.clear_all().await?;
    println!("{} Cleared {} session(s)", style("✓").green().bold(), count);
    Ok(())
}

/// Replay the pending queue and retry failed messages once
async fn run_sync(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;
    let history = build_history(&config)?;
    let report = load_history(&history).await?;

    let retry = history.retry_failed().await;
    let pending = history.pending_count();

    if report.replayed == 0 && retry.attempted == 0 && pending == 0 {
        println!("Nothing to sync; all messages are saved.");
        return Ok(());
    }

    if retry.attempted > 0 {
        println!(
            "Retried {} message(s): {} saved, {} still failing.",
            retry.attempted, retry.succeeded, retry.failed
        );
    }
    if pending == 0 {
        println!(
            "{} All messages are synchronized.",
            style("✓").green().bold()
        );
    } else {
        println!(
            "{}",
            style(format!(
                "{} message(s) still queued; run 'nyaya sync' again later.",
                pending
            ))
            .yellow()
        );
    }
    Ok(())
}

fn run_models() {
    println!("{}", style("Available models").bold().cyan());
    for model in AVAILABLE_MODELS {
        if *model == DEFAULT_MODEL {
            println!("  {} {}", style(model).green(), style("(default)").dim());
        } else {
            println!("  {}", model);
        }
    }
}

/// Show configuration and synchronization status without mutating anything
async fn run_status(loader: &ConfigLoader) -> Result<()> {
    let config = loader.load()?;

    println!("{}", style("nyaya status").bold().cyan());
    println!();

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Data directory: {}", config.history.data_path().display());
    println!("  Log directory: {}", config.logging.log_path().display());
    println!();

    println!("{}", style("Remote store:").bold());
    if config.store.url.trim().is_empty() {
        println!("  Endpoint: {}", style("not configured").red());
    } else {
        println!("  Endpoint: {}", config.store.url);
        if config.store.user_id.trim().is_empty() {
            println!("  User: {}", style("not configured").red());
        } else {
            println!("  User: {}", config.store.user_id);
            match RestStore::from_config(&config.store) {
                Ok(store) => match store.sessions_for_user(&config.store.user_id).await {
                    Ok(sessions) => println!("  Sessions: {}", sessions.len()),
                    Err(err) => println!(
                        "  Sessions: {}",
                        style(format!("unreachable ({})", err)).red()
                    ),
                },
                Err(err) => println!("  Sessions: {}", style(err.to_string()).red()),
            }
        }
    }
    println!();

    println!("{}", style("Provider:").bold());
    println!("  Model: {}", config.provider.model);
    let key_status = if config.provider.api_key.is_empty() {
        style("not configured").red()
    } else {
        style("configured").green()
    };
    println!("  API key: {}", key_status);
    println!();

    let vault = LocalVault::new(config.history.data_path());
    println!("{}", style("Local state:").bold());
    match vault.current_session() {
        Some(id) => println!("  Current session: {}", id),
        None => println!("  Current session: -"),
    }
    let pending = vault.load_pending().len();
    if pending > 0 {
        println!(
            "  Pending queue: {} (run {})",
            style(pending.to_string()).yellow(),
            style("nyaya sync").cyan()
        );
    } else {
        println!("  Pending queue: 0");
    }
    println!(
        "  Migration completed: {}",
        if vault.migration_completed() {
            "yes"
        } else {
            "no"
        }
    );
    Ok(())
}
