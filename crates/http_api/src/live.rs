//! Browser view of a job's output.

use axum::{
    extract::{Path, State},
    response::Html,
};

use super::{ApiError, AppState};

pub(super) async fn live(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let text = state.dispatcher.store().read(&id)?;
    Ok(Html(render_live_page(&id, &text)))
}

/// Standalone page showing `text` verbatim, with a button that reloads it.
pub fn render_live_page(id: &str, text: &str) -> String {
    let id = util::escape_html(id);
    let text = util::escape_html(text);
    format!(
        r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>job {id}</title>
<style>
body {{ margin: 0; background: #1e1e1e; color: #d4d4d4; font-family: sans-serif; }}
header {{ display: flex; align-items: center; gap: 1em; padding: 0.5em 1em; background: #2d2d2d; }}
pre {{ margin: 0; padding: 1em; font-family: ui-monospace, monospace; white-space: pre-wrap; }}
</style>
</head>
<body>
<header><strong>job {id}</strong><button onclick="location.reload()">Refresh</button></header>
<pre>{text}</pre>
</body>
</html>
"#
    )
}
