//! Reference CLI for the Manabi chat synchronization core.
//!
//! Attaches one room session, renders the merged timeline to the terminal,
//! and sends typed lines as text messages. The WebSocket connection is the
//! process-wide shared one, so reconnection and join replay come for free.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin manabi-chat -- --room-id booking-42 --user-id alice
//! cargo run --bin manabi-chat -- -r consult-7 -u bob --domain consultation
//! ```
//!
//! The bearer token is read from `--token` or the `MANABI_TOKEN` environment
//! variable; without one the socket is skipped and only REST history renders.

use std::collections::HashSet;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;

use manabi_chat::domain::{
    AuthToken, ChatDomain, ChatEvent, ChatTransport, EventKind, MessageKind, RoomId, UserId,
};
use manabi_chat::infrastructure::{
    InMemoryCredentialStore, RestHistoryLoader, SocketConfig, shared_socket,
};
use manabi_chat::ui::{MessageFormatter, redisplay_prompt};
use manabi_chat::usecase::RoomSession;
use manabi_shared::logger::setup_logger;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DomainArg {
    Booking,
    Consultation,
}

impl From<DomainArg> for ChatDomain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Booking => ChatDomain::Booking,
            DomainArg::Consultation => ChatDomain::Consultation,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "manabi-chat")]
#[command(about = "Terminal chat client for Manabi booking/consultation rooms", long_about = None)]
struct Args {
    /// Room to attach to (booking id or consultation id)
    #[arg(short = 'r', long)]
    room_id: String,

    /// Current user id (used for read receipts and own-message marking)
    #[arg(short = 'u', long)]
    user_id: String,

    /// Chat domain the room belongs to
    #[arg(short = 'd', long, value_enum, default_value = "booking")]
    domain: DomainArg,

    /// WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:8080/chat")]
    url: String,

    /// REST API base URL (initial history)
    #[arg(long, default_value = "http://127.0.0.1:8080/api")]
    api_url: String,

    /// Bearer token (falls back to the MANABI_TOKEN environment variable)
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let room_id = match RoomId::new(args.room_id) {
        Ok(room_id) => room_id,
        Err(e) => {
            tracing::error!("invalid room id: {}", e);
            std::process::exit(1);
        }
    };
    let user_id = match UserId::new(args.user_id) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::error!("invalid user id: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = Arc::new(InMemoryCredentialStore::new());
    let raw_token = args
        .token
        .or_else(|| std::env::var("MANABI_TOKEN").ok());
    match raw_token.map(AuthToken::new) {
        Some(Ok(token)) => credentials.set_token(token),
        Some(Err(e)) => {
            tracing::error!("invalid bearer token: {}", e);
            std::process::exit(1);
        }
        None => tracing::warn!("no bearer token, attaching with REST history only"),
    }

    let socket = shared_socket(SocketConfig::new(args.url, args.domain.into()));
    let history = Arc::new(RestHistoryLoader::new(args.api_url, credentials.clone()));

    let mut session = RoomSession::new(
        room_id.clone(),
        user_id.clone(),
        socket.clone(),
        history,
        credentials,
    );
    session.attach();

    println!(
        "\nAttached to room '{}' as '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
        room_id.as_str(),
        user_id.as_str()
    );

    // Print presence and error events as they happen
    let events = socket.events();
    let presence_room = room_id.clone();
    let presence_user = user_id.clone();
    let _presence_joined = events.subscribe(EventKind::UserJoined, move |event| {
        if let ChatEvent::UserJoined { room_id, user_id } = event
            && *room_id == presence_room
        {
            print!("{}", MessageFormatter::format_presence(user_id, true));
            redisplay_prompt(presence_user.as_str());
        }
    });
    let presence_room = room_id.clone();
    let presence_user = user_id.clone();
    let _presence_left = events.subscribe(EventKind::UserLeft, move |event| {
        if let ChatEvent::UserLeft { room_id, user_id } = event
            && *room_id == presence_room
        {
            print!("{}", MessageFormatter::format_presence(user_id, false));
            redisplay_prompt(presence_user.as_str());
        }
    });
    let presence_user = user_id.clone();
    let _error_notice = events.subscribe(EventKind::Error, move |event| {
        if let ChatEvent::Error { message, .. } = event {
            print!("{}", MessageFormatter::format_error(message));
            redisplay_prompt(presence_user.as_str());
        }
    });

    // Render timeline updates: print only messages not shown yet, in merged
    // order. Reordering older messages is left to full-screen UIs.
    let mut visible_rx = session.watch_visible();
    let printer_user = user_id.clone();
    let mut printer = tokio::spawn(async move {
        let mut printed: HashSet<String> = HashSet::new();
        while visible_rx.changed().await.is_ok() {
            let visible = visible_rx.borrow_and_update().clone();
            let mut new_output = String::new();
            for message in &visible {
                if printed.insert(message.id.as_str().to_string()) {
                    new_output.push_str(&MessageFormatter::format_message(message, &printer_user));
                }
            }
            if !new_output.is_empty() {
                print!("\n{}", new_output);
                redisplay_prompt(printer_user.as_str());
            }
        }
    });

    // Blocking thread for rustyline (synchronous readline)
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt_user = user_id.clone();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        let prompt = format!("{}> ", prompt_user.as_str());

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            line = input_rx.recv() => match line {
                Some(line) => {
                    // Input is preserved in the readline history on failure,
                    // so the user can retry with arrow-up
                    if let Err(e) = session.send(&line, MessageKind::Text, None) {
                        print!("{}", MessageFormatter::format_error(&e.to_string()));
                        redisplay_prompt(user_id.as_str());
                    }
                }
                None => break,
            },
            _ = &mut printer => break,
        }
    }

    session.detach();
    tracing::info!("left room, connection stays up for other attachments");
}
