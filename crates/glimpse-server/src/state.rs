use std::sync::Arc;

use glimpse_common::{Config, PreambleStore};
use glimpse_renderer::{
    DelegatedClient, DelegatedRenderer, DocumentView, FootprintEstimator, LatexOptions,
    LatexRenderer, Pipeline, PreviewSession, SessionCommand,
};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::ApiError;

/// What the browser page polls for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSnapshot {
    pub file_name: String,
    pub markup: String,
    pub focused_line: Option<usize>,
    pub active_renders: usize,
}

impl PreviewSnapshot {
    pub fn of<D: DelegatedRenderer>(session: &PreviewSession<D, DocumentView>) -> Self {
        let view = session.view();
        Self {
            file_name: view.title().to_owned(),
            markup: view.markup(),
            focused_line: view.centered_line(),
            active_renders: session.active_renders(),
        }
    }
}

pub struct AppStateInner {
    pub cfg: Config,
    pub latex: Arc<LatexRenderer>,
    pub preamble: PreambleStore,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<PreviewSnapshot>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    /// Build the LaTeX delegate and spawn the preview session that owns all
    /// render state. The session stops once every `AppState` is dropped.
    pub fn spawn(cfg: Config, preamble: PreambleStore) -> (Self, JoinHandle<()>) {
        let latex = Arc::new(LatexRenderer::new(
            LatexOptions::from(&cfg.latex),
            preamble.load(),
        ));
        let client = DelegatedClient::new(latex.clone()).with_timeout(cfg.latex.timeout());
        let pipeline = Pipeline::new(FootprintEstimator::from(&cfg.preview));
        let session = PreviewSession::new(pipeline, client, DocumentView::new());

        let (commands, rx) = mpsc::channel(64);
        let (publish, snapshot) = watch::channel(PreviewSnapshot::default());
        let handle = tokio::spawn(session.run(rx, move |session| {
            publish.send_replace(PreviewSnapshot::of(session));
        }));

        let state = Self {
            inner: Arc::new(AppStateInner {
                cfg,
                latex,
                preamble,
                commands,
                snapshot,
            }),
        };
        (state, handle)
    }

    pub fn cfg(&self) -> &Config {
        &self.inner.cfg
    }

    pub fn latex(&self) -> &LatexRenderer {
        &self.inner.latex
    }

    pub fn preamble(&self) -> &PreambleStore {
        &self.inner.preamble
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PreviewSnapshot> {
        self.inner.snapshot.clone()
    }

    pub async fn send(&self, command: SessionCommand) -> Result<(), ApiError> {
        self.inner
            .commands
            .send(command)
            .await
            .map_err(|_| ApiError::SessionClosed)
    }
}
