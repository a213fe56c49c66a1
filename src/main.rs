//! Rentadda Chat CLI
//!
//! Terminal client for booking chats:
//! - Open the chat of an accepted booking and exchange messages
//! - Generate a default config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rentadda_chat::chat::view::{self, ChatView, RenderedMessage, ScrollSync, Transcript};
use rentadda_chat::config::generate_default_config;
use rentadda_chat::*;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "rentadda-chat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Chat with the other party of a Rentadda booking")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Marketplace API URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Bearer token issued at login
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Your user id (default: read from the token)
    #[arg(long, global = true)]
    pub user_id: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the chat room of a booking
    Open {
        /// Booking id
        booking_id: BookingId,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source, skipped) = match &cli.config {
        Some(path) => (
            Config::load_with_env(path)?,
            ConfigSource::File(path.clone()),
            Vec::new(),
        ),
        None => Config::discover(),
    };
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(token) = cli.token {
        config.session.token = Some(token);
    }
    if let Some(user_id) = cli.user_id {
        config.session.user_id = Some(user_id);
    }

    match cli.command {
        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
            Ok(())
        }
        Commands::Open { booking_id } => {
            rentadda_chat::logging::init(&config.logging);
            for e in &skipped {
                tracing::warn!("Skipped config file: {}", e);
            }
            tracing::info!("Using config from {}", source);
            open_chat(config, booking_id).await
        }
    }
}

async fn open_chat(config: Config, booking: BookingId) -> Result<()> {
    let Some(token) = config.session.token.clone() else {
        bail!("No session token. Pass --token or set RENTADDA_TOKEN.");
    };
    let mut session = Session::new(token);
    if let Some(user_id) = config.session.user_id {
        session = session.with_user_id(UserId(user_id));
    }
    let me = session.user_id();
    if me.is_none() {
        tracing::warn!("User id unknown; all messages will be shown as received");
    }

    let session_ctx = SessionContext::with_session(session);
    let api = Arc::new(HttpChatClient::new(config.api.clone()).context("Failed to build HTTP client")?);
    tracing::info!(api = %config.api.base_url, booking_id = %booking, "Opening chat");

    let room = ChatRoom::mount(api, session_ctx.clone(), booking, config.chat.clone());
    let renderer = tokio::spawn(render_loop(room.subscribe(), me));

    println!("Type a message and press Enter. Empty line resends an unsent draft, /retry re-checks the room, /quit leaves.");

    let mut sessions = session_ctx.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut expired = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    "/quit" => break,
                    "/retry" => room.retry(),
                    text => {
                        if !text.is_empty() {
                            room.set_draft(text);
                        }
                        if let Err(e) = room.send().await {
                            eprintln!("! {e}. Draft kept; press Enter to resend.");
                        }
                    }
                }
            }
            changed = sessions.changed() => {
                if changed.is_err() || sessions.borrow().is_none() {
                    expired = true;
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    room.unmount().await;
    renderer.abort();

    if expired {
        bail!("Session expired. Sign in again to get a new token.");
    }
    Ok(())
}

async fn render_loop(mut rx: watch::Receiver<ChatState>, me: Option<UserId>) {
    let width = terminal_width();
    let mut scroll = ScrollSync::new();
    let mut transcript = Transcript::new();
    let mut titled = false;
    let mut last_status: Option<String> = None;

    loop {
        let state = rx.borrow_and_update().clone();
        let moved = scroll.observe(&state).is_some();

        let status = match view::render(&state, me) {
            ChatView::Loading => Some("Connecting…".to_string()),
            ChatView::Waiting { banner } => Some(banner.to_string()),
            ChatView::Ready {
                title,
                messages,
                notice,
            } => {
                if !titled {
                    println!("{}", title);
                    println!("{}", "-".repeat(width.min(title.len().max(20))));
                    titled = true;
                }
                if moved {
                    print_fresh(&mut transcript, &messages, width);
                }
                notice
            }
            ChatView::Failed {
                kind,
                messages,
                notice,
                ..
            } => {
                if moved {
                    print_fresh(&mut transcript, &messages, width);
                }
                Some(format!(
                    "{} ({})",
                    notice.unwrap_or_else(|| "Something went wrong".to_string()),
                    kind.as_str()
                ))
            }
        };

        if status != last_status {
            if let Some(status) = &status {
                eprintln!("-- {}", status);
            }
            last_status = status;
        }

        if rx.changed().await.is_err() {
            break;
        }
    }
}

fn print_fresh(transcript: &mut Transcript, messages: &[RenderedMessage], width: usize) {
    for message in transcript.fresh(messages) {
        println!("{}", view::format_line(message, width));
    }
}

fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse().ok())
        .filter(|w: &usize| *w >= 20)
        .unwrap_or(80)
}
