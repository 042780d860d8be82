//! The preview session: sole owner of the cache, tracker, view and every
//! in-flight resolution.
//!
//! Everything that mutates session state runs on the task that owns the
//! session. Delegated calls are futures polled from that same task, so
//! completions are applied one at a time with no locking.

use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use futures_util::stream::FuturesUnordered;
use glimpse_common::short_file_name;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::RenderContext;
use crate::cache::RenderCache;
use crate::client::{DelegatedClient, DelegatedRenderer, Resolution, complete};
use crate::pipeline::{Pipeline, RenderPass};
use crate::scroll::ScrollSynchronizer;
use crate::view::HostView;

/// An edit notification from the editor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpdate {
    pub content: String,
    pub cursor_line: usize,
    pub file_name: String,
}

#[derive(Debug)]
pub enum SessionCommand {
    Update(DocumentUpdate),
    /// Global render settings changed: drop the cache and re-render.
    SettingsChanged,
}

enum Event {
    Command(Option<SessionCommand>),
    Resolved(Resolution),
}

pub struct PreviewSession<D, V> {
    pipeline: Pipeline,
    client: DelegatedClient<D>,
    ctx: RenderContext,
    view: V,
    scroll: ScrollSynchronizer,
    in_flight: FuturesUnordered<BoxFuture<'static, Resolution>>,
    /// Idle callbacks run inside tracker calls, where the view is already
    /// borrowed, so they post the line to re-focus here instead.
    idle_tx: mpsc::UnboundedSender<usize>,
    idle_rx: mpsc::UnboundedReceiver<usize>,
    last_update: Option<DocumentUpdate>,
}

impl<D, V> PreviewSession<D, V>
where
    D: DelegatedRenderer,
    V: HostView,
{
    pub fn new(pipeline: Pipeline, client: DelegatedClient<D>, view: V) -> Self {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        Self {
            pipeline,
            client,
            ctx: RenderContext::new(),
            view,
            scroll: ScrollSynchronizer::new(),
            in_flight: FuturesUnordered::new(),
            idle_tx,
            idle_rx,
            last_update: None,
        }
    }

    /// Run one render pass for `update` and dispatch its display math.
    ///
    /// Resolutions still in flight from earlier passes are left to finish;
    /// their substitutions find no node and their tickets are stale.
    pub fn update(&mut self, update: DocumentUpdate) {
        self.ctx.tracker.reset();
        self.view.set_title(short_file_name(&update.file_name));

        let RenderPass { document, pending } = self.pipeline.render(&update.content, &mut self.ctx);
        self.view.attach(document);
        self.scroll.focus_line(&mut self.view, update.cursor_line);

        tracing::debug!(
            target: "glimpse::render",
            file = %update.file_name,
            pending = pending.len(),
            in_flight = self.in_flight.len(),
            "dispatching pass"
        );
        for resolution in pending {
            let future = self.client.dispatch(resolution, &self.ctx.cache);
            self.in_flight.push(future);
        }

        let idle = self.idle_tx.clone();
        let line = update.cursor_line;
        self.ctx.tracker.on_idle(Box::new(move || {
            let _ = idle.send(line);
        }));

        self.last_update = Some(update);
        self.drain_idle();
    }

    /// Clear the cache and re-render the last document from scratch.
    pub fn settings_changed(&mut self) {
        self.ctx.cache.clear();
        match self.last_update.clone() {
            Some(update) => self.update(update),
            None => {
                tracing::debug!(target: "glimpse::render", "settings changed before any document")
            }
        }
    }

    /// Wait for the next resolution and apply it. Returns `false` when
    /// nothing is in flight.
    pub async fn step(&mut self) -> bool {
        match self.in_flight.next().await {
            Some(resolution) => {
                self.apply(resolution);
                true
            }
            None => false,
        }
    }

    /// Apply resolutions until nothing is in flight.
    pub async fn settle(&mut self) {
        while self.step().await {}
    }

    fn apply(&mut self, resolution: Resolution) {
        complete(resolution, &mut self.ctx, &mut self.view);
        self.drain_idle();
    }

    fn drain_idle(&mut self) {
        while let Ok(line) = self.idle_rx.try_recv() {
            tracing::trace!(target: "glimpse::scroll", line, "pass idle, re-focusing");
            self.scroll.focus_line(&mut self.view, line);
        }
    }

    /// Drive the session from `commands` until the sender side closes,
    /// calling `publish` after every change.
    pub async fn run<F>(mut self, mut commands: mpsc::Receiver<SessionCommand>, mut publish: F)
    where
        F: FnMut(&Self),
    {
        loop {
            let event = tokio::select! {
                command = commands.recv() => Event::Command(command),
                Some(resolution) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    Event::Resolved(resolution)
                }
            };
            match event {
                Event::Command(None) => break,
                Event::Command(Some(SessionCommand::Update(update))) => self.update(update),
                Event::Command(Some(SessionCommand::SettingsChanged)) => self.settings_changed(),
                Event::Resolved(resolution) => self.apply(resolution),
            }
            publish(&self);
        }
        tracing::info!(
            target: "glimpse::render",
            abandoned = self.in_flight.len(),
            "preview session stopped"
        );
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn cache(&self) -> &RenderCache {
        &self.ctx.cache
    }

    /// Resolutions of the current pass that have not ended.
    pub fn active_renders(&self) -> usize {
        self.ctx.tracker.active()
    }

    /// Every unfinished resolution, including ones from superseded passes.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn focused_line(&self) -> Option<usize> {
        self.scroll.focused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_payload_is_camel_case() {
        let update: DocumentUpdate = serde_json::from_str(
            r##"{"content":"# hi","cursorLine":3,"fileName":"/tmp/notes.md"}"##,
        )
        .unwrap();
        assert_eq!(update.cursor_line, 3);
        assert_eq!(update.file_name, "/tmp/notes.md");
    }
}
