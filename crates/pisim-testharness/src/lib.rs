//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Mock JSON storage bin used by uplink and pipeline tests."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! In-process stand-in for the remote JSON storage service.
//!
//! `POST /bins/pisim` records the request and answers with the configured
//! status; a 200 answer also replaces the stored document. `GET /bins/pisim`
//! returns the stored document, or 404 when nothing was stored yet.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const BIN_PATH: &str = "/bins/pisim";

/// A request captured by the mock bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug)]
struct BinState {
    post_status: AtomicU16,
    stored: Mutex<Option<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Running mock bin. Dropping it leaves the server task running until the
/// test runtime shuts down; call [`MockStorageBin::shutdown`] to stop early.
pub struct MockStorageBin {
    address: SocketAddr,
    state: Arc<BinState>,
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl MockStorageBin {
    /// Spawn a bin answering uploads with `post_status`.
    pub async fn spawn(post_status: StatusCode) -> Result<Self> {
        Self::spawn_with_document(post_status, None).await
    }

    /// Spawn a bin pre-loaded with `document` for fetch tests.
    pub async fn spawn_with_document(
        post_status: StatusCode,
        document: Option<String>,
    ) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let state = Arc::new(BinState {
            post_status: AtomicU16::new(post_status.as_u16()),
            stored: Mutex::new(document),
            requests: Mutex::new(Vec::new()),
        });
        let router = Router::new()
            .route(BIN_PATH, post(store).get(load))
            .with_state(state.clone());

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        });
        let task = tokio::spawn(async move {
            if let Err(err) = server.await {
                warn!(error = %err, "mock storage bin exited with error");
            }
        });
        debug!(%address, "mock storage bin listening");

        Ok(Self {
            address,
            state,
            task,
            shutdown: shutdown_tx,
        })
    }

    /// Full URL of the bin document.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.address, BIN_PATH)
    }

    /// Change the status returned to subsequent uploads.
    pub fn set_post_status(&self, status: StatusCode) {
        self.state
            .post_status
            .store(status.as_u16(), Ordering::SeqCst);
    }

    /// Uploads received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Document currently held by the bin.
    pub fn stored(&self) -> Option<String> {
        self.state.stored.lock().clone()
    }

    /// Request graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|join| anyhow!(join))
    }
}

async fn store(State(state): State<Arc<BinState>>, headers: HeaderMap, body: String) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    state.requests.lock().push(RecordedRequest {
        content_type,
        body: body.clone(),
    });

    let status = StatusCode::from_u16(state.post_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status == StatusCode::OK {
        *state.stored.lock() = Some(body);
    }
    status
}

async fn load(State(state): State<Arc<BinState>>) -> Response {
    match state.stored.lock().clone() {
        Some(document) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            document,
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
