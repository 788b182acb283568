//! HTTP surface: the minimal page at `/` and the elaborated one at `/advanced`.

pub mod form;
pub mod pages;

use std::net::SocketAddr;
use std::sync::Arc;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use crate::annotate::Annotator;
use crate::common::AppConfig;
use crate::handler::{self, DetectionOutcome, ModelProvider};
use form::{mime_for, Rejection, UploadForm};
use pages::{FormDefaults, Original, PageKind};

const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub struct AppState {
    provider: Arc<dyn ModelProvider>,
    annotator: Annotator,
    defaults: FormDefaults,
    /// One detection at a time.
    gate: Mutex<()>,
}

impl AppState {
    pub fn new(config: &AppConfig, provider: Arc<dyn ModelProvider>, annotator: Annotator) -> Self {
        Self {
            provider,
            annotator,
            defaults: FormDefaults {
                model: config.default_model,
                threshold: config.conf_threshold,
                show_labels: true,
                show_conf: true,
            },
            gate: Mutex::new(()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(PageKind::Minimal.path(), get(minimal_page))
        .route(PageKind::Advanced.path(), get(advanced_page))
        .route(PageKind::Minimal.action(), post(minimal_detect))
        .route(PageKind::Advanced.action(), post(advanced_detect))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(Arc::new(state))
}

pub async fn serve(bind: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("Serving on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}

async fn minimal_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::render_form(PageKind::Minimal, &state.defaults, None))
}

async fn advanced_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::render_form(PageKind::Advanced, &state.defaults, None))
}

async fn minimal_detect(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    detect(state, PageKind::Minimal, multipart).await
}

async fn advanced_detect(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    detect(state, PageKind::Advanced, multipart).await
}

async fn read_form(mut multipart: Multipart) -> anyhow::Result<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            form.set_file(file_name, bytes.to_vec());
        } else {
            let value = field.text().await?;
            form.set_text(&name, value);
        }
    }
    Ok(form)
}

fn rejected(state: &AppState, kind: PageKind, rejection: &Rejection) -> Response {
    log::warn!("Upload rejected: {rejection}");
    let html = pages::render_form(kind, &state.defaults, Some(&rejection.to_string()));
    (StatusCode::BAD_REQUEST, Html(html)).into_response()
}

async fn detect(state: Arc<AppState>, kind: PageKind, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(e) => {
            log::warn!("Malformed upload: {e:#}");
            let html = pages::render_form(kind, &state.defaults, Some("The upload could not be read."));
            return (StatusCode::BAD_REQUEST, Html(html)).into_response();
        }
    };
    if let Err(rejection) = form.checked_file_name() {
        return rejected(&state, kind, &rejection);
    }

    let worker = Arc::clone(&state);
    let joined = tokio::task::spawn_blocking(move || {
        let _guard = worker.gate.lock();
        let bytes = form.bytes.clone();
        let outcome = form
            .into_request(kind, &worker.defaults)
            .map(|request| {
                let file_name = request.file_name.clone();
                let submitted = FormDefaults::from(&request);
                (file_name, submitted, handler::handle(request, worker.provider.as_ref(), &worker.annotator))
            });
        (bytes, outcome)
    })
    .await;

    let (bytes, outcome) = match joined {
        Ok(done) => done,
        Err(e) => {
            log::error!("Detection task panicked: {e}");
            let failure = handler::DetectionFailure::new(&anyhow::anyhow!("internal error"));
            let html = pages::render_form(kind, &state.defaults, Some(&failure.message));
            return (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response();
        }
    };

    let (file_name, submitted, outcome) = match outcome {
        Ok(done) => done,
        Err(rejection) => return rejected(&state, kind, &rejection),
    };

    let original = Original {
        file_name: &file_name,
        mime: mime_for(&file_name),
        bytes: &bytes,
    };
    let html = match kind {
        PageKind::Minimal => pages::render_minimal_result(&submitted, &original, &outcome),
        PageKind::Advanced => pages::render_advanced_result(&submitted, &original, &outcome),
    };
    let status = match outcome {
        DetectionOutcome::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    (status, Html(html)).into_response()
}
