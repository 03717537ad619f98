use std::{
    future::Future,
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{LiveSimError, LiveSimResult},
    playlist::{describe_master, PlaylistSource, HLS_CONTENT_TYPE},
    slider::{Slider, SliderHandle, DEFAULT_SLIDE_INTERVAL},
    store::PlaylistStore,
};

pub const DEFAULT_PORT: u16 = 9080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Time between two slides
    pub interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            interval: DEFAULT_SLIDE_INTERVAL,
        }
    }
}

/// What startup does with a decoded source.
pub enum Launch {
    /// Media playlist, ready to be served.
    Serve(Arc<AppState>),
    /// Master playlist. Only its description is produced, nothing is bound.
    Describe(String),
}

impl Launch {
    pub fn from_source(source: PlaylistSource, interval: Duration) -> Self {
        match source {
            PlaylistSource::Media(playlist) => {
                Launch::Serve(AppState::new(PlaylistStore::new(playlist), interval))
            }
            PlaylistSource::Master(playlist) => {
                log::info!("Master playlist input detected, nothing to serve.");
                Launch::Describe(describe_master(&playlist))
            }
        }
    }
}

enum SliderState {
    Idle,
    Running(SliderHandle),
    /// Closed playlist, empty rotation, or server shut down.
    Disabled,
}

/// Shared state of every request handler.
pub struct AppState {
    store: Arc<PlaylistStore>,
    interval: Duration,
    slider: Mutex<SliderState>,
    cancel: CancellationToken,
}

impl AppState {
    pub fn new(store: PlaylistStore, interval: Duration) -> Arc<Self> {
        let slider = if store.is_closed() {
            SliderState::Disabled
        } else {
            SliderState::Idle
        };

        Arc::new(Self {
            store: Arc::new(store),
            interval,
            slider: Mutex::new(slider),
            cancel: CancellationToken::new(),
        })
    }

    pub fn store(&self) -> &Arc<PlaylistStore> {
        &self.store
    }

    /// Starts the slider if it has not been started yet.
    ///
    /// Check and start happen under one lock, so however many requests race
    /// here only one slider is ever spawned. Returns `true` for the call
    /// that started it.
    pub fn ensure_slider(&self) -> bool {
        let mut state = self.slider.lock();
        if !matches!(*state, SliderState::Idle) {
            return false;
        }

        let slider = Slider::new(self.store.clone(), self.interval);
        match slider.spawn(self.cancel.child_token()) {
            Ok(handle) => {
                *state = SliderState::Running(handle);
                true
            }
            Err(e) => {
                log::warn!("Playlist will not slide: {e}");
                *state = SliderState::Disabled;
                false
            }
        }
    }

    pub fn is_sliding(&self) -> bool {
        matches!(*self.slider.lock(), SliderState::Running(_))
    }

    /// Ticks done by the running slider, if any.
    pub fn slider_ticks(&self) -> Option<u64> {
        match &*self.slider.lock() {
            SliderState::Running(handle) => Some(handle.ticks()),
            _ => None,
        }
    }

    /// Stops the slider and keeps it from being started again.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let state = std::mem::replace(&mut *self.slider.lock(), SliderState::Disabled);
        if let SliderState::Running(handle) = state {
            handle.shutdown().await;
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(playlist_handler))
        .fallback(playlist_handler)
        .with_state(state)
}

async fn playlist_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, PlaylistErrorResponse> {
    state.ensure_slider();
    let body = state.store.render()?;

    Ok((
        [
            (header::CONTENT_TYPE, HLS_CONTENT_TYPE),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        body,
    ))
}

/// Serves the playlist on `listener` until `signal` resolves, then stops the
/// slider.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, signal: F) -> LiveSimResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    log::info!("Serving playlist on http://{}", listener.local_addr()?);

    let app = router(state.clone());
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await;

    log::info!("Server stopped, shutting down slider");
    state.shutdown().await;
    result?;
    Ok(())
}

pub struct PlaylistErrorResponse(LiveSimError);

impl From<LiveSimError> for PlaylistErrorResponse {
    fn from(e: LiveSimError) -> Self {
        PlaylistErrorResponse(e)
    }
}

impl IntoResponse for PlaylistErrorResponse {
    fn into_response(self) -> Response {
        log::error!("Failed to render playlist: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render playlist").into_response()
    }
}
