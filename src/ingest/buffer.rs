use crate::model::VisitEvent;
use crate::storage::visits;
use duckdb::Connection;
use parking_lot::Mutex;
use std::sync::Arc;

/// Thread-safe buffer that batches recorded visits and appends them to the
/// visit log when the count threshold is reached or on the periodic flush.
///
/// Buffered visits are not yet visible to the dashboard.
pub struct VisitBuffer {
    events: Mutex<Vec<VisitEvent>>,
    flush_threshold: usize,
    conn: Arc<Mutex<Connection>>,
}

impl VisitBuffer {
    pub fn new(flush_threshold: usize, conn: Arc<Mutex<Connection>>) -> Self {
        let flush_threshold = flush_threshold.max(1);
        Self {
            events: Mutex::new(Vec::with_capacity(flush_threshold)),
            flush_threshold,
            conn,
        }
    }

    /// Returns a reference to the DuckDB connection for query access.
    pub const fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Add a visit. Flushes when the threshold is reached and returns the
    /// number of visits written in that case.
    pub fn push(&self, event: VisitEvent) -> Result<Option<usize>, BufferError> {
        let should_flush = {
            let mut events = self.events.lock();
            events.push(event);
            events.len() >= self.flush_threshold
        };

        if should_flush {
            self.flush().map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Append every buffered visit to the log.
    ///
    /// The buffer is drained before writing. If the append fails the batch is
    /// dropped rather than retried.
    pub fn flush(&self) -> Result<usize, BufferError> {
        let events: Vec<VisitEvent> = std::mem::take(&mut *self.events.lock());
        if events.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock();
        let written = visits::append_visits(&conn, &events).map_err(|e| BufferError::Append {
            dropped: events.len(),
            source: e,
        })?;
        drop(conn);

        tracing::debug!(count = written, "Flushed visits to the log");
        Ok(written)
    }
}

#[derive(Debug)]
pub enum BufferError {
    Append { dropped: usize, source: duckdb::Error },
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Append { dropped, source } => {
                write!(f, "Append failed, dropped {dropped} visits: {source}")
            }
        }
    }
}

impl std::error::Error for BufferError {}
