//! # Live Module
//!
//! Live-reload messages and the listeners they wake.
//!
//! The content server pushes JSON messages of the form `{ "type": n }` over
//! an event stream. Type `0` means the chapters were rebuilt; every other
//! type is ignored, as is anything that does not parse.

mod event_stream;

pub use event_stream::{DEFAULT_EVENT, EventStreamDecoder, ServerEvent};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// MESSAGES
// =============================================================================

/// Numeric type of the rebuild message.
pub const REBUILD_MESSAGE: i64 = 0;

/// A decoded live-reload message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveMessage {
    /// Chapters were rebuilt on the server.
    Rebuild,
    /// A message type this client does not handle.
    Unknown(Option<i64>),
}

impl LiveMessage {
    /// Parse message data. Returns `None` for malformed payloads.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(rename = "type", default)]
            kind: serde_json::Value,
        }

        let envelope: Envelope = serde_json::from_str(data).ok()?;
        Some(match envelope.kind.as_i64() {
            Some(REBUILD_MESSAGE) => Self::Rebuild,
            other => Self::Unknown(other),
        })
    }
}

// =============================================================================
// LISTENERS
// =============================================================================

/// Opaque handle returned by [`RebuildListeners::on_rebuild`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type RebuildListener = Box<dyn FnMut() + Send>;

/// Registered rebuild callbacks keyed by [`ListenerId`].
///
/// Invocation order is unspecified.
#[derive(Default)]
pub struct RebuildListeners {
    listeners: BTreeMap<ListenerId, RebuildListener>,
}

impl RebuildListeners {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback run on every rebuild message.
    pub fn on_rebuild(&mut self, listener: impl FnMut() + Send + 'static) -> ListenerId {
        let id = ListenerId::new();
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn off_rebuild(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Run every registered callback once.
    pub fn notify(&mut self) {
        for listener in self.listeners.values_mut() {
            listener();
        }
    }
}

impl fmt::Debug for RebuildListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebuildListeners")
            .field("ids", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parse `data` and wake the listeners it concerns.
///
/// Returns the parsed message, or `None` when the payload was malformed and
/// nothing was dispatched.
pub fn dispatch_message(data: &str, listeners: &mut RebuildListeners) -> Option<LiveMessage> {
    let Some(message) = LiveMessage::parse(data) else {
        tracing::debug!(%data, "ignoring malformed live message");
        return None;
    };
    match message {
        LiveMessage::Rebuild => listeners.notify(),
        LiveMessage::Unknown(kind) => {
            tracing::debug!(?kind, "ignoring unknown live message type");
        }
    }
    Some(message)
}

// =============================================================================
// TESTS
// =============================================================================
