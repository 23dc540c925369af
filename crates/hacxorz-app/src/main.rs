//! HacXorZ application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Install tracing (stderr, so logs stay out of the transcript)
//! 3. Open the SQLite session store and pick a reply engine
//! 4. Run the terminal front end over a `ChatClient`

mod cli;
mod commands;
mod render;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use hacxorz_chat::{ChatClient, QuickActionOutcome, StaticIdentity};
use hacxorz_core::config::HacxorzConfig;
use hacxorz_core::events::ChatEvent;
use hacxorz_core::types::{Session, SessionId};
use hacxorz_storage::{Database, SqliteChatStore};

use cli::{expand_home, CliArgs};
use commands::{Command, SessionRef};

type InputLines = Lines<BufReader<Stdin>>;

/// Print chat events as they arrive.
async fn event_printer(client: ChatClient, threshold: f64) {
    let mut events = client.subscribe();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            ChatEvent::ReplyPending { .. } => println!("   ...thinking"),
            ChatEvent::ReplyDelivered { message, .. } => {
                let show = client.show_confidence().unwrap_or(true);
                println!("{}", render::message(&message, show, threshold));
            }
            ChatEvent::SessionRenamed { title, .. } => println!("-- chat renamed to \"{}\"", title),
            ChatEvent::NudgeChanged { nudge: Some(nudge) } => println!("{}", render::nudge(&nudge)),
            ChatEvent::SearchResults {
                query,
                matches,
                searched,
            } => println!("{}", render::search_results(&query, &matches, searched)),
            ChatEvent::Notice {
                level,
                title,
                description,
            } => println!("{}", render::notice(level, &title, &description)),
            _ => {}
        }
    }
}

struct Repl {
    client: ChatClient,
    config: HacxorzConfig,
    /// Sessions from the last `/sessions`, for numbered references.
    listing: Vec<Session>,
}

impl Repl {
    fn resolve(&self, target: SessionRef) -> Option<SessionId> {
        match target {
            SessionRef::Id(id) => Some(id),
            SessionRef::Index(n) => self.listing.get(n - 1).map(|s| s.id),
        }
    }

    fn threshold(&self) -> f64 {
        self.config.nudges.low_confidence_threshold
    }

    fn print_transcript(&self) {
        let visible = self.client.visible_messages().unwrap_or_default();
        let total = self.client.messages().map(|m| m.len()).unwrap_or(0);
        let show = self.client.show_confidence().unwrap_or(true);
        println!(
            "{}",
            render::transcript(&visible, total, show, self.threshold())
        );
    }

    fn send(&self, text: &str) {
        // The reply arrives through the event printer.
        if let Err(e) = self.client.send_message(text) {
            println!("!! {}", e);
        }
    }

    /// Returns false when the user asked to quit.
    async fn handle(&mut self, command: Command, input: &mut InputLines) -> bool {
        match command {
            Command::Empty => {}
            Command::Send(text) => self.send(&text),
            Command::New => {
                if let Ok(session) = self.client.new_session().await {
                    println!("-- new chat: {}", session.title);
                }
            }
            Command::Sessions => {
                if let Ok(sessions) = self.client.list_sessions().await {
                    let active = self.client.active_session().ok().flatten().map(|s| s.id);
                    println!(
                        "{}",
                        render::history(
                            &sessions,
                            active,
                            self.config.chat.title_max_chars,
                            chrono::Utc::now()
                        )
                    );
                    self.listing = sessions;
                }
            }
            Command::Open(target) => match self.resolve(target) {
                Some(id) => {
                    if let Ok(Some(session)) = self.client.select_session(&id).await {
                        println!("-- {}", session.title);
                        self.print_transcript();
                    }
                }
                None => println!("!! no such chat, run /sessions first"),
            },
            Command::Delete(target) => match self.resolve(target) {
                Some(id) => {
                    let _ = self.client.delete_session(&id).await;
                    self.listing.retain(|s| s.id != id);
                }
                None => println!("!! no such chat, run /sessions first"),
            },
            Command::Search(Some(query)) => self.client.set_search_query(&query),
            Command::Search(None) => {
                self.client.clear_search();
                println!("-- search cleared");
            }
            Command::More => match self.client.load_more() {
                Ok(true) => self.print_transcript(),
                Ok(false) => println!("-- all messages shown"),
                Err(e) => println!("!! {}", e),
            },
            Command::Nudges(enabled) => {
                self.client.toggle_nudges(enabled);
                println!("-- tips {}", if enabled { "on" } else { "off" });
            }
            Command::Confidence(visible) => {
                if self.client.toggle_confidence_display(visible).is_ok() {
                    println!(
                        "-- confidence scores {}",
                        if visible { "shown" } else { "hidden" }
                    );
                }
            }
            Command::Quick(action) => match self.client.quick_action(action) {
                Ok(QuickActionOutcome::Sent(pending)) => {
                    println!("you> {}", pending.user_message.text);
                }
                Ok(QuickActionOutcome::ConfirmClear) => {
                    println!("Delete every message in this chat? [y/N]");
                    let answer = input.next_line().await.ok().flatten().unwrap_or_default();
                    if commands::confirmed(&answer) {
                        let _ = self.client.clear_chat().await;
                    }
                }
                Err(e) => println!("!! {}", e),
            },
            Command::Dismiss => {
                self.client.dismiss_nudge();
            }
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => return false,
        }
        true
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config, before tracing so the log level can come from it.
    let config_file = args.resolve_config_path();
    let loaded = HacxorzConfig::load(&config_file);
    let mut config = match &loaded {
        Ok(config) => config.clone(),
        Err(_) => HacxorzConfig::default(),
    };
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if args.no_nudges {
        config.nudges.enabled = false;
    }
    config.inference.provider = args.resolve_provider(&config.inference.provider);

    // Tracing. RUST_LOG wins over everything else.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting HacXorZ v{}", env!("CARGO_PKG_VERSION"));
    match loaded {
        Ok(_) => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Err(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Storage.
    let data_dir = expand_home(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join(&config.storage.database_file);
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let store = Arc::new(SqliteChatStore::new(Arc::new(db)));

    // Reply engine and identity.
    let engine = hacxorz_inference::from_config(&config.inference)?;
    let identity = match args.resolve_owner(&config.general.owner) {
        Some(owner) => {
            tracing::info!(owner = %owner, "Owner identity resolved");
            StaticIdentity::new(owner)
        }
        None => {
            tracing::warn!("No owner identity, chats cannot be created");
            StaticIdentity::anonymous()
        }
    };

    let client = ChatClient::new(&config, store, engine, Arc::new(identity))?;
    let printer = tokio::spawn(event_printer(
        client.clone(),
        config.nudges.low_confidence_threshold,
    ));

    match client.start().await {
        Ok(session) => println!("-- {} (type /help for commands)", session.title),
        Err(e) => println!("!! could not start a chat: {}", e),
    }

    let mut repl = Repl {
        client: client.clone(),
        config,
        listing: Vec::new(),
    };
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = input.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let command = match commands::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("!! {}", e);
                continue;
            }
        };
        if !repl.handle(command, &mut input).await {
            break;
        }
    }

    client.shutdown();
    printer.abort();
    tracing::info!("HacXorZ stopped");
    Ok(())
}
