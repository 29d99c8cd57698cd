//! HTTP serve mode.
//!
//! Publishes the course over HTTP: `GET /cours/<identifier>.md` returns
//! the rendered lesson page, `/` the index, `/catalog.json` the chapter
//! catalog, and `/assets/cours.css` the embedded stylesheet. Any lesson
//! failure collapses into a 404 whose body names the identifier.

use std::io;
use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use tokio::signal;
use tower_http::compression::CompressionLayer;

use crate::html;
use crate::loader;
use crate::menu::{self, Chapter, ChapterKind};
use crate::web_assets;

/// Maximum number of consecutive ports to try before giving up.
const MAX_PORT_ATTEMPTS: u16 = 100;

/// Maximum lesson size that will be read and served (16 MiB).
pub const MAX_LESSON_SIZE: u64 = 16 * 1024 * 1024;

/// Shared state handed to every request handler.
pub struct AppState {
    /// Course root; lessons live under `<root>/cours/`.
    pub course_root: PathBuf,
    /// Pre-built chapter-menu nav fragment.
    pub nav_html: String,
    /// Pre-serialized catalog JSON. The catalog is fixed for the process
    /// lifetime, like the menu in the viewer.
    pub catalog_json: String,
}

/// Attempt to bind starting at `start_port`, stepping forward on
/// `EADDRINUSE` up to [`MAX_PORT_ATTEMPTS`] times. Any other OS error
/// fails immediately. Returns the listener and the actually bound port
/// (so `--port 0` picks an ephemeral one).
pub fn bind_with_retry(bind_addr: &str, start_port: u16) -> Result<(TcpListener, u16), String> {
    let mut port = start_port;
    for _ in 0..MAX_PORT_ATTEMPTS {
        let addr = format!("{bind_addr}:{port}");
        match TcpListener::bind(&addr) {
            Ok(listener) => {
                let bound = listener
                    .local_addr()
                    .map(|a| a.port())
                    .unwrap_or(port);
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                eprintln!("[bind] {addr} in use, trying next port");
                port = port.wrapping_add(1);
            }
            Err(e) => return Err(format!("bind {addr} failed: {e}")),
        }
    }
    Err(format!(
        "exhausted {MAX_PORT_ATTEMPTS} port candidates starting at {start_port}; all in use",
    ))
}

/// Validate a lesson identifier: non-empty `/`-separated segments of
/// ASCII alphanumerics plus `-`, `_`, `.`, none starting with a dot.
/// Traversal (`..`) and absolute/empty segments are rejected by
/// construction.
pub fn validate_lesson_id(id: &str) -> bool {
    !id.is_empty()
        && id.split('/').all(|segment| {
            !segment.is_empty()
                && !segment.starts_with('.')
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        })
}

/// Serialize the chapter catalog for `/catalog.json`.
pub fn catalog_to_json(chapters: &[Chapter]) -> String {
    let entries: Vec<serde_json::Value> = chapters
        .iter()
        .map(|chapter| match &chapter.kind {
            ChapterKind::Leaf(lesson) => serde_json::json!({
                "label": chapter.label,
                "lesson": lesson.id,
            }),
            ChapterKind::Section(section) => serde_json::json!({
                "label": chapter.label,
                "lessons": section
                    .lessons
                    .iter()
                    .map(|l| serde_json::json!({ "id": l.id, "label": l.label }))
                    .collect::<Vec<_>>(),
            }),
        })
        .collect();
    serde_json::json!({ "chapters": entries }).to_string()
}

/// 404 page naming the failed identifier — the uniform failure of every
/// lesson-load error.
fn lesson_not_found(state: &AppState, id: &str) -> Response {
    let page = html::build_page_shell(
        "Erreur de chargement",
        &state.nav_html,
        &html::error_body(id),
    );
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(page))
        .expect("not-found response builder is infallible")
}

async fn lesson_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(rest): UrlPath<String>,
) -> Response {
    let id = match rest.strip_suffix(".md") {
        Some(id) => id.to_owned(),
        None => {
            eprintln!("[lesson] path={rest} status=bad-extension");
            return lesson_not_found(&state, &rest);
        }
    };

    if !validate_lesson_id(&id) {
        eprintln!("[lesson] id={id} status=invalid-id");
        return lesson_not_found(&state, &id);
    }

    let path = loader::lesson_path(&state.course_root, &id);

    // Stat before reading: size guard plus Last-Modified.
    let meta = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        _ => {
            eprintln!("[lesson] id={id} status=not-found");
            return lesson_not_found(&state, &id);
        }
    };
    if meta.len() > MAX_LESSON_SIZE {
        eprintln!("[lesson] id={id} status=too-large size={}", meta.len());
        return lesson_not_found(&state, &id);
    }

    let source = match tokio::fs::read_to_string(&path).await {
        Ok(s) => s,
        Err(_) => {
            eprintln!("[lesson] id={id} status=unreadable");
            return lesson_not_found(&state, &id);
        }
    };

    let (body, headings) = html::render_lesson_html(&source);
    let title = headings
        .first()
        .map(|h| h.text.clone())
        .unwrap_or_else(|| id.clone());
    let page = html::build_page_shell(&title, &state.nav_html, &body);

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff");
    if let Ok(mtime) = meta.modified() {
        let mtime: SystemTime = mtime;
        builder = builder.header(header::LAST_MODIFIED, httpdate::fmt_http_date(mtime));
    }

    eprintln!("[lesson] id={id} status=ok");
    builder
        .body(Body::from(page))
        .expect("lesson response builder is infallible")
}

async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let body = "<p>Choisissez un cours dans le sommaire.</p>\n";
    let page = html::build_page_shell("Cours", &state.nav_html, body);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(page))
        .expect("index response builder is infallible")
}

async fn catalog_handler(State(state): State<Arc<AppState>>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(state.catalog_json.clone()))
        .expect("catalog response builder is infallible")
}

async fn css_handler() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/css; charset=utf-8")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from(web_assets::CSS))
        .expect("css response builder is infallible")
}

/// Start the HTTP server for the course at `root`.
///
/// Shuts down cleanly on SIGINT.
pub async fn run_serve(root: PathBuf, bind_addr: String, start_port: u16) -> io::Result<()> {
    let catalog = menu::load_catalog(&root).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("could not read course catalog in {}: {e}", root.display()),
        )
    })?;

    let state = Arc::new(AppState {
        nav_html: html::build_nav_html(&catalog),
        catalog_json: catalog_to_json(&catalog),
        course_root: root,
    });

    let (std_listener, bound_port) = bind_with_retry(&bind_addr, start_port).map_err(|msg| {
        eprintln!("Error: {msg}");
        io::Error::new(io::ErrorKind::AddrInUse, msg)
    })?;

    std_listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(std_listener)?;

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/catalog.json", get(catalog_handler))
        .route("/assets/cours.css", get(css_handler))
        .route("/cours/{*lesson}", get(lesson_handler))
        .layer(CompressionLayer::new())
        .with_state(state);

    eprintln!("[serve] listening on {bind_addr}:{bound_port}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c()
                .await
                .expect("failed to install SIGINT handler");
            eprintln!("[shutdown] complete");
        })
        .await
        .map_err(io::Error::other)?;

    Ok(())
}
