use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tickertalk::AppContext;
use tickertalk_models::TickertalkConfig;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tickertalk", about = "Conversational stock-market assistant")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/tickertalk.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat in a session. Reads one message per line from stdin unless a message is given.
    Chat {
        /// Session to continue; a new one is created when omitted
        #[arg(short, long)]
        session: Option<String>,

        /// Name the assistant addresses you by
        #[arg(short, long, default_value = "Trader")]
        user: String,

        /// Send a single message and exit
        message: Option<String>,
    },
    /// List sessions, newest first
    Sessions,
    /// Show a session's history
    History {
        session: String,

        /// Print the stored session document as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a fresh session id
    NewSession,
}

fn load_config(path: &str) -> Result<TickertalkConfig> {
    match std::fs::read_to_string(path) {
        Ok(config_str) => {
            toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path, "Config file not found, using defaults");
            Ok(TickertalkConfig::default())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read config: {path}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "Failed to load .env");
        }
    }

    let cli = Cli::parse();

    if let Command::NewSession = cli.command {
        println!("{}", tickertalk::new_session_id());
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    let app = tickertalk::build_context(config).context("Failed to build context")?;

    let result = match cli.command {
        Command::Chat {
            session,
            user,
            message,
        } => chat(&app, session, &user, message).await,
        Command::Sessions => list_sessions(&app),
        Command::History { session, json } => history(&app, &session, json).await,
        Command::NewSession => Ok(()),
    };

    app.close()?;
    result
}

async fn chat(
    app: &AppContext,
    session: Option<String>,
    user: &str,
    message: Option<String>,
) -> Result<()> {
    let session_id = session.unwrap_or_else(tickertalk::new_session_id);
    eprintln!("session {session_id}");

    if let Some(message) = message {
        return send(app, &message, user, &session_id).await;
    }

    let stdin = std::io::stdin();
    loop {
        eprint!("> ");
        std::io::stderr().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(e) = send(app, line, user, &session_id).await {
            eprintln!("error: {e:#}");
        }
    }
    Ok(())
}

/// Stream one reply to stdout. Ctrl-C drops the stream, so nothing is persisted.
async fn send(app: &AppContext, input: &str, user: &str, session_id: &str) -> Result<()> {
    let mut reply = app.turn(input, user, session_id).into_stream();
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            chunk = reply.next() => match chunk {
                Some(chunk) => {
                    let chunk = chunk.context("Chat turn failed")?;
                    stdout.write_all(chunk.as_bytes())?;
                    stdout.flush()?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\ninterrupted");
                return Ok(());
            }
        }
    }
    writeln!(stdout)?;
    Ok(())
}

fn list_sessions(app: &AppContext) -> Result<()> {
    let sessions = app.archive().list_sessions().context("Failed to list sessions")?;
    for s in sessions {
        let day = s.created_at.get(..10).unwrap_or(&s.created_at);
        println!("{}\tSession • {day}", s.session_id);
    }
    Ok(())
}

async fn history(app: &AppContext, session_id: &str, json: bool) -> Result<()> {
    if json {
        let session = app
            .archive()
            .load_session(session_id)
            .context("Failed to load session")?;
        match session {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => eprintln!("no such session: {session_id}"),
        }
        return Ok(());
    }

    let history = app
        .archive()
        .history(session_id)
        .await
        .context("Failed to load history")?;
    for entry in history.iter() {
        println!("{}: {}", entry.role, entry.content);
    }
    Ok(())
}
