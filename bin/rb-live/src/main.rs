//! # rb-live
//!
//! Terminal front end for a single live post: commands come in on stdin,
//! protocol messages go out on stdout, everything else is logged to stderr.

mod commands;
mod config;
mod console;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use commands::Command;
use config::LiveConfig;
use console::{ConsoleView, LineTransport};
use rb_compose::reference::reference_text;
use rb_compose::{AllocationAcks, ComposeContext, ComposeEvent, ComposeSession, PostCollection, PostForm};
use rb_core::UploadFile;
use rb_db_sqlite::SqlitePostStore;
use rb_storage_local::LocalUploader;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cfg = LiveConfig::from_env()?;

    // 1. Initialize persistence
    let store = SqlitePostStore::new(&cfg.database_url)
        .await
        .with_context(|| format!("opening {}", cfg.database_url))?;
    store.purge_expired().await?;

    // 2. Initialize uploads
    let uploads = LocalUploader::new(cfg.upload_dir.clone());

    // 3. Assemble the form
    let ctx = ComposeContext {
        transport: Arc::new(LineTransport::stdout()),
        registry: Arc::new(PostCollection::new()),
        store: Arc::new(store),
        view: Arc::new(ConsoleView),
        acks: AllocationAcks::new(),
        board: cfg.board.clone(),
        page: cfg.page.clone(),
        identity: cfg.identity.clone(),
    };
    let (session, events) = ComposeSession::new(PostForm::new(ctx), Arc::new(uploads), 64);
    let session = tokio::spawn(session.run());

    log::info!(
        "composing on /{}/ {}",
        cfg.page.board,
        match cfg.page.thread {
            0 => "(new thread)".to_string(),
            op => format!("thread {op}"),
        }
    );

    let mut input = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let cmd = match commands::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("{e}");
                continue;
            }
        };
        let event = match into_event(cmd, &mut input).await {
            Ok(event) => event,
            Err(e) => {
                log::warn!("{e:#}");
                continue;
            }
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
    drop(events);

    let form = session.await?;
    log::info!(
        "post {} finished as {} with body {:?}",
        form.draft().id,
        form.phase().as_str(),
        form.draft().body_text()
    );
    Ok(())
}

/// Maps a command to a session event, tracking the local input text.
async fn into_event(cmd: Command, input: &mut String) -> anyhow::Result<ComposeEvent> {
    Ok(match cmd {
        Command::Type(text) => {
            input.push_str(&text);
            ComposeEvent::Input(input.clone())
        }
        Command::Set(text) => {
            *input = text;
            ComposeEvent::Input(input.clone())
        }
        Command::Backspace => {
            input.pop();
            ComposeEvent::Input(input.clone())
        }
        Command::Quote { id, selection } => {
            // The form appends the same text to its own copy of the input
            let link = reference_text(input, id, selection.as_deref());
            input.push_str(&link);
            ComposeEvent::Quote { id, selection }
        }
        Command::Upload { path, spoiler } => ComposeEvent::Upload(read_upload(&path, spoiler).await?),
        Command::Retry => ComposeEvent::RetryUpload,
        Command::Spoiler => ComposeEvent::Spoiler,
        Command::Close => ComposeEvent::Close,
        Command::Expire => ComposeEvent::Expire,
        Command::Server(msg) => ComposeEvent::Server(msg),
    })
}

async fn read_upload(path: &Path, spoiler: bool) -> anyhow::Result<UploadFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadFile { name, data, spoiler })
}
