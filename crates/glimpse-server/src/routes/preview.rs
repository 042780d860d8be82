use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Html,
};
use glimpse_renderer::{DocumentUpdate, SessionCommand};
use pulldown_cmark_escape::{FmtWriter, escape_html};

use crate::error::ApiError;
use crate::state::{AppState, PreviewSnapshot};

const PAGE_HEAD: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<style>
  body { max-width: 48rem; margin: 2rem auto; padding: 0 1rem; font-family: sans-serif; line-height: 1.5; }
  .line-highlighted { background: rgba(255, 230, 120, 0.35); }
  .latex-placeholder { background: rgba(0, 0, 0, 0.04); border-radius: 4px; }
  .latex-rendered-block { text-align: center; }
  .math-error code { color: #b00020; }
</style>
<title>"#;

const PAGE_TAIL: &str = r#"</div>
<script>
  const preview = document.getElementById("preview");
  let lastMarkup = preview.innerHTML;
  let lastFocus = null;
  async function poll() {
    try {
      const res = await fetch("/preview");
      const snap = await res.json();
      if (snap.fileName) document.title = snap.fileName;
      if (snap.markup !== lastMarkup) {
        preview.innerHTML = snap.markup;
        lastMarkup = snap.markup;
        lastFocus = null;
      }
      if (snap.focusedLine !== null && snap.focusedLine !== lastFocus) {
        const el = preview.querySelector(`[data-source-line="${snap.focusedLine}"]`);
        if (el) el.scrollIntoView({ behavior: "smooth", block: "center" });
        lastFocus = snap.focusedLine;
      }
    } catch (e) {}
    setTimeout(poll, 250);
  }
  preview.addEventListener("click", (event) => {
    const el = event.target.closest("[data-source-line]");
    if (!el) return;
    fetch("/line-clicked", {
      method: "POST",
      headers: { "Content-Type": "application/json" },
      body: JSON.stringify({ line: Number(el.dataset.sourceLine) }),
    });
  });
  poll();
</script>
</body>
</html>
"#;

pub fn page(snapshot: &PreviewSnapshot) -> String {
    let mut out = String::with_capacity(PAGE_HEAD.len() + PAGE_TAIL.len() + snapshot.markup.len());
    out.push_str(PAGE_HEAD);
    let title = if snapshot.file_name.is_empty() {
        "glimpse"
    } else {
        &snapshot.file_name
    };
    let _ = escape_html(FmtWriter(&mut out), title);
    out.push_str("</title>\n</head>\n<body>\n<div id=\"preview\">");
    out.push_str(&snapshot.markup);
    out.push_str(PAGE_TAIL);
    out
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page(&state.snapshot()))
}

pub async fn preview(State(state): State<AppState>) -> Json<PreviewSnapshot> {
    Json(state.snapshot())
}

pub async fn update(
    State(state): State<AppState>,
    payload: Result<Json<DocumentUpdate>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(update) = payload?;
    tracing::debug!(
        file = %update.file_name,
        cursor_line = update.cursor_line,
        bytes = update.content.len(),
        "document update"
    );
    state.send(SessionCommand::Update(update)).await?;
    Ok(StatusCode::ACCEPTED)
}
