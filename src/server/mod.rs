//! Server for the generated site
//!
//! Every route is mounted under the site root. Pre-rendered pages are
//! served from the public dir. Articles that were never generated are
//! resolved on first request, with a loading page served while they build.
//! A stale listing or article is refreshed in the background. Preview mode
//! renders pages live against the preview ref stored in a cookie.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path as UrlPath, Query, State},
    http::{header, HeaderMap, Request, StatusCode, Uri},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Router,
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::generator::article::ArticleState;
use crate::generator::listing::paginate;
use crate::generator::Generator;
use crate::helpers::{post_path, url_for};
use crate::pagination::{fetch_cursor, is_service_cursor, PageResult, SingleFlight};
use crate::prismic::{ContentError, ContentSource, QueryOptions};
use crate::Spacetraveling;

/// Cookie holding the preview ref
pub const PREVIEW_COOKIE: &str = "io.prismic.preview";

/// Server state
struct ServerState {
    generator: Arc<Generator>,
    public_dir: PathBuf,
    root: String,
    flights: SingleFlight<PageResult>,
    tracker: FallbackTracker,
    listing_refresh: AtomicBool,
}

impl ServerState {
    fn new(app: &Spacetraveling, source: Arc<dyn ContentSource>) -> Result<Self> {
        Ok(Self {
            generator: Arc::new(Generator::new(app, source)?),
            public_dir: app.public_dir.clone(),
            root: url_for(&app.config, ""),
            flights: SingleFlight::new(),
            tracker: FallbackTracker::default(),
            listing_refresh: AtomicBool::new(false),
        })
    }
}

/// Start the server
pub async fn start(
    app: &Spacetraveling,
    source: Arc<dyn ContentSource>,
    ip: &str,
    port: u16,
    open: bool,
) -> Result<()> {
    let state = Arc::new(ServerState::new(app, source)?);
    let url = format!("http://{}:{}{}", ip, port, state.root);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Routes under the site root, with the public dir as fallback
fn router(state: Arc<ServerState>) -> Router {
    let prefix = mount_prefix(&state.root);
    let at = |path: &str| format!("{}{}", prefix, path);

    let mut router = Router::new()
        .route(&at("/"), get(listing_handler))
        .route(&at("/post/:uid"), get(article_handler))
        .route(&at("/post/:uid/"), get(article_handler))
        .route(&at("/api/posts"), get(load_more_handler))
        .route(&at("/api/preview"), get(preview_handler))
        .route(&at("/api/exit-preview"), get(exit_preview_handler));
    if !prefix.is_empty() {
        router = router.route(&prefix, get(listing_handler));
    }

    router
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `/blog/` becomes `/blog`; the bare root mounts at the top
fn mount_prefix(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// `GET /`: the generated listing, or a live one in preview mode
async fn listing_handler(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    let generator = &state.generator;

    if let Some(preview_ref) = preview_ref(&headers) {
        return match generator.listing_page(Some(preview_ref)).await {
            Ok(page) => render(generator.renderer().render_listing(&page)),
            Err(e) => content_error_response(&e),
        };
    }

    let index = state.public_dir.join("index.html");
    if !index.exists() {
        if let Err(e) = generator.write_listing().await {
            tracing::error!("Failed to generate listing: {:#}", e);
            return error_response(&e);
        }
        if let Err(e) = generator.save_manifest() {
            tracing::warn!("Failed to save render manifest: {}", e);
        }
    } else if generator.is_listing_stale()
        && state
            .listing_refresh
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    {
        tracing::info!("Revalidating listing");
        spawn_listing_refresh(state.clone());
    }

    serve_file(index).await
}

/// Rewrite the listing in the background; a failure keeps the old page
fn spawn_listing_refresh(state: Arc<ServerState>) {
    tokio::spawn(async move {
        match state.generator.write_listing().await {
            Ok(_) => {
                if let Err(e) = state.generator.save_manifest() {
                    tracing::warn!("Failed to save render manifest: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to refresh listing: {:#}", e),
        }
        state.listing_refresh.store(false, Ordering::Release);
    });
}

/// `GET /post/{uid}`
async fn article_handler(
    State(state): State<Arc<ServerState>>,
    UrlPath(uid): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    let generator = &state.generator;

    if let Some(preview_ref) = preview_ref(&headers) {
        return match generator.article_page(&uid, Some(preview_ref)).await {
            Ok(page) => render(
                generator
                    .renderer()
                    .render_article(&ArticleState::Ready(Box::new(page))),
            ),
            Err(e) => content_error_response(&e),
        };
    }

    let Some(path) = generator.article_path(&uid) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };

    if path.exists() {
        if generator.is_stale(&uid) && state.tracker.begin(&uid) {
            tracing::info!("Revalidating {}", uid);
            spawn_generation(state.clone(), uid, true);
        }
        return serve_file(path).await;
    }

    if let Some(status) = state.tracker.take_failure(&uid) {
        return (status, status_text(status)).into_response();
    }

    let shown = state.tracker.observe(&uid);
    if matches!(shown, ArticleState::PathUnknown) {
        tracing::info!("Generating {} on first request", uid);
        spawn_generation(state.clone(), uid, false);
    }
    render(generator.renderer().render_article(&shown))
}

/// Build an article in the background. Failures of a first build are kept
/// for the next request; failures of a refresh leave the old page in place.
fn spawn_generation(state: Arc<ServerState>, uid: String, refresh: bool) {
    tokio::spawn(async move {
        let result = state.generator.write_article(&uid).await;
        match &result {
            Ok(path) => {
                tracing::debug!("Generated {:?}", path);
                if let Err(e) = state.generator.save_manifest() {
                    tracing::warn!("Failed to save render manifest: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to generate {}: {:#}", uid, e),
        }

        let failure = match result {
            Err(e) if !refresh => Some(error_status(&e)),
            _ => None,
        };
        state.tracker.finish(&uid, failure);
    });
}

#[derive(Debug, Deserialize)]
struct LoadMoreQuery {
    cursor: Option<String>,
}

/// `GET /api/posts?cursor=`: the page behind a `next_page` cursor
async fn load_more_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LoadMoreQuery>,
) -> Response {
    let generator = &state.generator;
    let endpoint = &generator.config().content_service.api_endpoint;

    let Some(cursor) = query.cursor.filter(|c| is_service_cursor(c, endpoint)) else {
        return (StatusCode::BAD_REQUEST, "Invalid cursor").into_response();
    };

    match fetch_cursor(&state.flights, generator.source(), &cursor).await {
        Ok(response) => Json(paginate(&response, generator.projector())).into_response(),
        Err(e) => {
            tracing::error!("Failed to load more posts: {}", e);
            content_error_response(&e)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewQuery {
    token: Option<String>,
    document_id: Option<String>,
}

/// `GET /api/preview?token=&documentId=`: enter preview mode and redirect to
/// the previewed document
async fn preview_handler(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let (Some(token), Some(document_id)) = (query.token, query.document_id) else {
        return (StatusCode::BAD_REQUEST, "Missing token or documentId").into_response();
    };

    let options = QueryOptions::new().with_ref(Some(token.clone()));
    let doc = match state.generator.source().get_by_id(&document_id, &options).await {
        Ok(doc) => doc,
        Err(e) => return content_error_response(&e),
    };

    let location = match doc.uid.as_deref() {
        Some(uid) => format!("{}{}", state.root, post_path(uid)),
        None => state.root.clone(),
    };

    (
        [(header::SET_COOKIE, preview_cookie(&token))],
        Redirect::temporary(&location),
    )
        .into_response()
}

/// `GET /api/exit-preview`
async fn exit_preview_handler(State(state): State<Arc<ServerState>>) -> Response {
    (
        [(header::SET_COOKIE, clear_preview_cookie())],
        Redirect::temporary(&state.root),
    )
        .into_response()
}

/// Everything else under the root: static files from the public dir
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    mut request: Request<Body>,
) -> Response {
    let uri = request.uri();
    let Some(path) = strip_root(uri.path(), &mount_prefix(&state.root)) else {
        return (StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let relative = match uri.query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    match relative.parse::<Uri>() {
        Ok(relative) => *request.uri_mut() = relative,
        Err(_) => return (StatusCode::BAD_REQUEST, "Bad request").into_response(),
    }

    let mut service = ServeDir::new(&state.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

/// `path` relative to the mount prefix, or `None` when it lies outside
fn strip_root<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(prefix)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

async fn serve_file(path: PathBuf) -> Response {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

fn render(html: Result<String>) -> Response {
    match html {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Render failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render failed").into_response()
        }
    }
}

fn content_error_response(err: &ContentError) -> Response {
    let status = content_status(err);
    (status, status_text(status)).into_response()
}

fn error_response(err: &anyhow::Error) -> Response {
    let status = error_status(err);
    (status, status_text(status)).into_response()
}

/// 404 for a missing document, 502 for any other content-service failure
fn content_status(err: &ContentError) -> StatusCode {
    if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_GATEWAY
    }
}

fn error_status(err: &anyhow::Error) -> StatusCode {
    match err.downcast_ref::<ContentError>() {
        Some(content) => content_status(content),
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Error")
}

/// The preview ref carried by the request's cookies, if any
fn preview_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
        .filter(|value| !value.is_empty())
}

fn preview_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        utf8_percent_encode(token, NON_ALPHANUMERIC)
    )
}

fn clear_preview_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", PREVIEW_COOKIE)
}

/// Where an on-demand article build stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Loading,
    Failed(StatusCode),
}

/// Article builds started by requests, keyed by uid
#[derive(Debug, Default)]
struct FallbackTracker {
    entries: Mutex<HashMap<String, Resolution>>,
}

impl FallbackTracker {
    /// Mark `uid` as loading. Returns false if a build is already running
    /// or a failure is waiting to be reported.
    fn begin(&self, uid: &str) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(uid) {
            return false;
        }
        entries.insert(uid.to_string(), Resolution::Loading);
        true
    }

    /// The state of an article page that is not on disk. The first request
    /// for a uid finds it `PathUnknown` and moves it to `Loading`; later
    /// requests see `Loading` until the build finishes.
    fn observe(&self, uid: &str) -> ArticleState {
        if self.begin(uid) {
            ArticleState::PathUnknown
        } else {
            ArticleState::Loading
        }
    }

    /// Record the end of a build; a failure is kept until reported
    fn finish(&self, uid: &str, failure: Option<StatusCode>) {
        let mut entries = self.lock();
        match failure {
            Some(status) => {
                entries.insert(uid.to_string(), Resolution::Failed(status));
            }
            None => {
                entries.remove(uid);
            }
        }
    }

    /// Report a failed build once, clearing it so the next request retries
    fn take_failure(&self, uid: &str) -> Option<StatusCode> {
        let mut entries = self.lock();
        match entries.get(uid) {
            Some(Resolution::Failed(status)) => {
                let status = *status;
                entries.remove(uid);
                Some(status)
            }
            _ => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Resolution>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::prismic::testing::{post, MemorySource};
    use axum::http::HeaderValue;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn spawn_site(dir: &TempDir, root: &str, source: MemorySource) -> (String, Arc<ServerState>) {
        let mut config = SiteConfig::default();
        config.root = root.to_string();
        let app = Spacetraveling::with_config(dir.path().to_path_buf(), config);
        let state = Arc::new(ServerState::new(&app, Arc::new(source)).unwrap());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}", addr), state)
    }

    async fn wait_until(mut done: impl FnMut() -> bool) {
        for _ in 0..100 {
            if done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_routes_nested_under_root() {
        let dir = TempDir::new().unwrap();
        let source = MemorySource::new(vec![post("1", "a", "Alpha")]);
        let (base, state) = spawn_site(&dir, "/blog/", source).await;

        let listing = reqwest::get(format!("{}/blog/", base)).await.unwrap();
        assert_eq!(listing.status(), StatusCode::OK);
        assert!(listing.text().await.unwrap().contains("Alpha"));

        // The article route answers with the loading page and builds in the background
        let loading = reqwest::get(format!("{}/blog/post/a/", base)).await.unwrap();
        assert_eq!(loading.status(), StatusCode::OK);
        assert!(loading.text().await.unwrap().contains("Carregando..."));

        wait_until(|| state.generator.is_generated("a")).await;
        let article = reqwest::get(format!("{}/blog/post/a", base)).await.unwrap();
        assert!(article.text().await.unwrap().contains("<h1>Alpha</h1>"));

        // Static files are looked up relative to the root
        let file = reqwest::get(format!("{}/blog/index.html", base)).await.unwrap();
        assert_eq!(file.status(), StatusCode::OK);

        let outside = reqwest::get(format!("{}/post/a/", base)).await.unwrap();
        assert_eq!(outside.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stale_listing_refreshed_in_background() {
        let dir = TempDir::new().unwrap();
        let index = dir.path().join("public/index.html");
        fs::create_dir_all(dir.path().join("public")).unwrap();
        fs::write(&index, "old listing").unwrap();

        let source = MemorySource::new(vec![post("1", "a", "Alpha")]);
        let (base, state) = spawn_site(&dir, "/", source).await;
        assert!(state.generator.is_listing_stale());

        // The old page is served while the new one is written
        let body = reqwest::get(format!("{}/", base)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "old listing");

        wait_until(|| !state.generator.is_listing_stale()).await;
        assert!(!state.generator.is_listing_stale());
        assert!(fs::read_to_string(&index).unwrap().contains("Alpha"));
    }

    #[test]
    fn test_mount_prefix_and_strip_root() {
        assert_eq!(mount_prefix("/"), "");
        assert_eq!(mount_prefix("/blog/"), "/blog");
        assert_eq!(mount_prefix("blog"), "/blog");

        assert_eq!(strip_root("/style.css", ""), Some("/style.css"));
        assert_eq!(strip_root("/blog/style.css", "/blog"), Some("/style.css"));
        assert_eq!(strip_root("/blog", "/blog"), Some("/"));
        assert_eq!(strip_root("/blogger/x", "/blog"), None);
        assert_eq!(strip_root("/style.css", "/blog"), None);
    }

    #[test]
    fn test_preview_cookie_round_trip() {
        let token = "https://blog.prismic.io/previews/abc?websitePreviewId=x";
        let cookie = preview_cookie(token);
        assert!(cookie.starts_with("io.prismic.preview=https%3A%2F%2F"));

        let value = cookie.split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}", value)).unwrap(),
        );
        assert_eq!(preview_ref(&headers).as_deref(), Some(token));
    }

    #[test]
    fn test_no_preview_cookie() {
        let mut headers = HeaderMap::new();
        assert_eq!(preview_ref(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("io.prismic.preview="));
        assert_eq!(preview_ref(&headers), None);
        assert!(clear_preview_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_content_status() {
        let missing = ContentError::NotFound {
            doc_type: "post".to_string(),
            field: "uid",
            value: "nope".to_string(),
        };
        assert_eq!(content_status(&missing), StatusCode::NOT_FOUND);
        assert_eq!(content_status(&ContentError::NoMasterRef), StatusCode::BAD_GATEWAY);

        let wrapped = anyhow::Error::new(missing);
        assert_eq!(error_status(&wrapped), StatusCode::NOT_FOUND);
        assert_eq!(
            error_status(&anyhow::anyhow!("disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_fallback_tracker() {
        let tracker = FallbackTracker::default();

        assert!(tracker.begin("a"));
        assert!(!tracker.begin("a"));
        assert_eq!(tracker.take_failure("a"), None);

        tracker.finish("a", Some(StatusCode::NOT_FOUND));
        assert!(!tracker.begin("a"));
        assert_eq!(tracker.take_failure("a"), Some(StatusCode::NOT_FOUND));
        assert_eq!(tracker.take_failure("a"), None);

        // Cleared failures let the next request try again
        assert!(tracker.begin("a"));
        tracker.finish("a", None);
        assert!(tracker.begin("a"));
    }

    #[test]
    fn test_first_request_moves_unknown_to_loading() {
        let tracker = FallbackTracker::default();

        assert!(matches!(tracker.observe("a"), ArticleState::PathUnknown));
        assert!(matches!(tracker.observe("a"), ArticleState::Loading));
        assert!(matches!(tracker.observe("b"), ArticleState::PathUnknown));

        tracker.finish("a", None);
        assert!(matches!(tracker.observe("a"), ArticleState::PathUnknown));
    }
}
