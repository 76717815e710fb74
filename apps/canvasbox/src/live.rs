//! # Live Reload
//!
//! One lazily opened event-stream connection to the content server.
//!
//! `init` is a no-op while the feature flag is off, while a connection
//! attempt is in flight, and while a connection is open. Failures are not
//! retried: the service goes back to idle until `init` is called again.

use crate::client::{ContentClient, ContentError};
use canvasbox_core::{EventStreamDecoder, ListenerId, RebuildListeners, dispatch_message};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const IDLE: u8 = 0;
const CONNECTING: u8 = 1;
const CONNECTED: u8 = 2;

#[derive(Debug)]
pub struct LiveReload {
    client: ContentClient,
    enabled: bool,
    /// One of `IDLE`, `CONNECTING`, `CONNECTED`; shared with the reader task.
    state: Arc<AtomicU8>,
    listeners: Arc<Mutex<RebuildListeners>>,
}

impl LiveReload {
    #[must_use]
    pub fn new(client: ContentClient, enabled: bool) -> Self {
        Self {
            client,
            enabled,
            state: Arc::new(AtomicU8::new(IDLE)),
            listeners: Arc::new(Mutex::new(RebuildListeners::new())),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CONNECTED
    }

    /// Register a rebuild callback.
    pub fn on_rebuild(&self, listener: impl FnMut() + Send + 'static) -> ListenerId {
        lock(&self.listeners).on_rebuild(listener)
    }

    pub fn off_rebuild(&self, id: ListenerId) -> bool {
        lock(&self.listeners).off_rebuild(id)
    }

    /// Register a listener that forwards rebuilds into a channel.
    pub fn subscribe(&self) -> (ListenerId, mpsc::UnboundedReceiver<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.on_rebuild(move || {
            let _ = tx.send(());
        });
        (id, rx)
    }

    /// Open the connection if enabled and idle.
    ///
    /// Returns the reader task once the server accepted the stream, or `None`
    /// when nothing was started.
    pub async fn init(&self) -> Result<Option<JoinHandle<()>>, ContentError> {
        if !self.enabled {
            return Ok(None);
        }
        if self
            .state
            .compare_exchange(IDLE, CONNECTING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        let response = match self.client.open_event_stream().await {
            Ok(response) => response,
            Err(err) => {
                self.state.store(IDLE, Ordering::SeqCst);
                tracing::warn!(%err, "live reload connection failed");
                return Err(err);
            }
        };
        self.state.store(CONNECTED, Ordering::SeqCst);
        tracing::info!("live reload connected");

        let listeners = Arc::clone(&self.listeners);
        let state = Arc::clone(&self.state);
        Ok(Some(tokio::spawn(async move {
            read_stream(response, &listeners).await;
            state.store(IDLE, Ordering::SeqCst);
        })))
    }
}

async fn read_stream(mut response: reqwest::Response, listeners: &Mutex<RebuildListeners>) {
    let mut decoder = EventStreamDecoder::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                for event in decoder.feed(&chunk) {
                    if event.is_message() {
                        dispatch_message(&event.data, &mut lock(listeners));
                    }
                }
            }
            Ok(None) => {
                tracing::info!("live reload stream closed");
                return;
            }
            Err(err) => {
                tracing::warn!(%err, "live reload stream failed");
                return;
            }
        }
    }
}

fn lock(listeners: &Mutex<RebuildListeners>) -> MutexGuard<'_, RebuildListeners> {
    listeners.lock().unwrap_or_else(PoisonError::into_inner)
}
