use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};

use glimpse_renderer::{
    DelegateError, DelegateRequest, DelegatedClient, DelegatedRenderer, DocumentUpdate,
    DocumentView, HostView, Pipeline, PlaceholderNode, PreviewSession, RenderedDocument,
};
use tokio::sync::oneshot;

type Reply = oneshot::Sender<Result<String, DelegateError>>;

#[derive(Default)]
struct Script {
    calls: Vec<DelegateRequest>,
    waiting: HashMap<String, VecDeque<Reply>>,
}

/// Delegated renderer whose calls stay pending until the test answers them.
#[derive(Default)]
pub struct ScriptedRenderer {
    script: Mutex<Script>,
}

impl ScriptedRenderer {
    /// Answer the oldest open call for `tex` with `<svg>{tex}</svg>`.
    pub fn succeed(&self, tex: &str) -> bool {
        self.answer(tex, Ok(format!("<svg>{tex}</svg>")))
    }

    pub fn fail(&self, tex: &str) -> bool {
        self.answer(
            tex,
            Err(DelegateError::Latex {
                log: format!("! cannot render {tex}"),
            }),
        )
    }

    fn answer(&self, tex: &str, reply: Result<String, DelegateError>) -> bool {
        let sender = self
            .script
            .lock()
            .unwrap()
            .waiting
            .get_mut(tex)
            .and_then(VecDeque::pop_front);
        match sender {
            Some(sender) => sender.send(reply).is_ok(),
            None => false,
        }
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().unwrap().calls.len()
    }
}

impl DelegatedRenderer for ScriptedRenderer {
    fn render(
        &self,
        request: DelegateRequest,
    ) -> impl Future<Output = Result<String, DelegateError>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        {
            let mut script = self.script.lock().unwrap();
            script
                .waiting
                .entry(request.tex.clone())
                .or_default()
                .push_back(tx);
            script.calls.push(request);
        }
        async move {
            rx.await
                .unwrap_or_else(|_| Err(DelegateError::Io(std::io::Error::other("script dropped"))))
        }
    }
}

/// A [`DocumentView`] that also records every centering.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub inner: DocumentView,
    pub centers: Vec<usize>,
}

impl RecordingView {
    pub fn markup(&self) -> String {
        self.inner.markup()
    }
}

impl HostView for RecordingView {
    fn attach(&mut self, document: RenderedDocument) {
        self.inner.attach(document);
    }

    fn placeholder_mut(&mut self, id: &str) -> Option<&mut PlaceholderNode> {
        self.inner.placeholder_mut(id)
    }

    fn nearest_anchor(&self, line: usize) -> Option<usize> {
        self.inner.nearest_anchor(line)
    }

    fn center_on(&mut self, line: usize) {
        self.centers.push(line);
        self.inner.center_on(line);
    }

    fn clear_highlight(&mut self) {
        self.inner.clear_highlight();
    }

    fn highlight(&mut self, line: usize) {
        self.inner.highlight(line);
    }

    fn set_title(&mut self, title: &str) {
        self.inner.set_title(title);
    }
}

pub fn session() -> (
    PreviewSession<ScriptedRenderer, RecordingView>,
    Arc<ScriptedRenderer>,
) {
    let delegate = Arc::new(ScriptedRenderer::default());
    let client = DelegatedClient::new(delegate.clone());
    (
        PreviewSession::new(Pipeline::default(), client, RecordingView::default()),
        delegate,
    )
}

pub fn update(content: &str, cursor_line: usize) -> DocumentUpdate {
    DocumentUpdate {
        content: content.to_owned(),
        cursor_line,
        file_name: "/home/me/notes/test.md".to_owned(),
    }
}
