//! Incremental `text/event-stream` decoding.
//!
//! Bytes arrive in arbitrary chunks; only complete lines are interpreted, so
//! a chunk may split a line or even a multi-byte character. A line longer
//! than [`MAX_LINE_LEN`] is dropped up to its terminating newline.

/// Event type assigned when the stream names none.
pub const DEFAULT_EVENT: &str = "message";

/// Longest line kept while waiting for its newline.
pub const MAX_LINE_LEN: usize = 1 << 20;

/// One dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    /// `data:` lines joined with `\n`.
    pub data: String,
    /// Last event id seen on the stream.
    pub id: Option<String>,
}

impl ServerEvent {
    /// Whether a plain `message` listener would receive this event.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}

/// Stateful decoder fed with raw stream bytes.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline.
    scanned: usize,
    /// Inside an oversized line; bytes are skipped until the next newline.
    discarding: bool,
    data: Vec<String>,
    event: Option<String>,
    last_id: Option<String>,
}

impl EventStreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        let mut chunk = chunk;

        if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(newline) => {
                    self.discarding = false;
                    chunk = &chunk[newline + 1..];
                }
                None => return events,
            }
        }
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        let mut pos = self.scanned;
        while let Some(offset) = self.buffer[pos..].iter().position(|&b| b == b'\n') {
            let newline = pos + offset;
            let mut line = &self.buffer[start..newline];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
            start = newline + 1;
            pos = start;
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        if self.buffer.len() > MAX_LINE_LEN {
            tracing::debug!(len = self.buffer.len(), "dropping oversized event-stream line");
            self.buffer.clear();
            self.scanned = 0;
            self.discarding = true;
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<ServerEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(ServerEvent {
            event: event
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT.to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
