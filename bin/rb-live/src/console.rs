//! Terminal adapters: outbound messages go to stdout as JSON lines, view
//! updates go to the log.

use std::io::{Stdout, Write};
use std::sync::Mutex;

use rb_core::{AppError, ClientMessage, FormView, ImageData, PostDraft, Transport};

/// Writes each message as one JSON line.
pub struct LineTransport<W> {
    out: Mutex<W>,
}

impl<W> LineTransport<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }
}

impl LineTransport<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Transport for LineTransport<W> {
    fn send(&self, msg: &ClientMessage) -> anyhow::Result<()> {
        let line = msg.encode()?;
        let mut out = self
            .out
            .lock()
            .map_err(|_| AppError::Transport("output lock poisoned".into()))?;
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|e| AppError::Transport(e.to_string()))?;
        Ok(())
    }
}

pub struct ConsoleView;

impl FormView for ConsoleView {
    fn render_alloc(&self, draft: &PostDraft) {
        log::info!("post {} allocated in thread {}", draft.id, draft.op);
    }

    fn insert_image(&self, image: &ImageData) {
        log::info!(
            "image {} ({}x{}) attached",
            image.name,
            image.dims[0],
            image.dims[1]
        );
    }

    fn clean_up(&self) {
        log::info!("post form closed");
    }

    fn replace_text(&self, text: &str) {
        log::info!("input is now {text:?}");
    }

    fn trim_input(&self, discarded: usize) {
        log::warn!("input over the line limit, {discarded} characters dropped");
    }

    fn propagate_links(&self, draft: &PostDraft) {
        if !draft.links.is_empty() {
            log::debug!("post {} links to {:?}", draft.id, draft.links);
        }
    }
}
