//! Lazy stream of decoded propositions over an open cursor.

use log::{info, warn};

use super::proposition::Proposition;
use super::row::RowDecoder;
use crate::error::{Error, Result};
use crate::exec::{Cursor, ExecError, Row};

/// Forward-only, non-restartable sequence of propositions.
///
/// Consecutive rows decoding to the same object are merged, their reference
/// ids combined. Rows that fail to decode are logged and skipped unless the
/// error is fatal. A fatal error or a cursor failure is yielded once, after
/// which the stream is closed and yields nothing more.
pub struct ResultStream {
    decoder: Option<RowDecoder>,
    cursor: Option<Box<dyn Cursor>>,
    pending: Option<Proposition>,
    rows_read: u64,
    rows_skipped: u64,
    finished: bool,
}

impl ResultStream {
    pub fn new(decoder: RowDecoder, cursor: Box<dyn Cursor>) -> Self {
        Self {
            decoder: Some(decoder),
            cursor: Some(cursor),
            pending: None,
            rows_read: 0,
            rows_skipped: 0,
            finished: false,
        }
    }

    /// A stream with no rows, as returned when execution is skipped.
    pub fn empty() -> Self {
        Self {
            decoder: None,
            cursor: None,
            pending: None,
            rows_read: 0,
            rows_skipped: 0,
            finished: true,
        }
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    /// Release the cursor and end the stream. Later calls do nothing.
    pub fn close(&mut self) -> std::result::Result<(), ExecError> {
        self.finished = true;
        self.pending = None;
        match self.cursor.take() {
            Some(mut cursor) => cursor.close(),
            None => Ok(()),
        }
    }

    fn fetch(&mut self) -> std::result::Result<Option<Row>, ExecError> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next_row(),
            None => Ok(None),
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Err(e) = self.close() {
            warn!("failed to close result cursor: {}", e);
        }
        if let Some(decoder) = &self.decoder {
            info!(
                "{}: read {} rows, skipped {}",
                decoder.entity().name(),
                self.rows_read,
                self.rows_skipped
            );
        }
    }
}

impl Iterator for ResultStream {
    type Item = Result<Proposition>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let row = match self.fetch() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    let last = self.pending.take();
                    self.finish();
                    return last.map(Ok);
                }
                Err(e) => {
                    self.pending = None;
                    self.finish();
                    return Some(Err(Error::Exec(e)));
                }
            };
            self.rows_read += 1;

            let Some(decoder) = &self.decoder else {
                continue;
            };
            match decoder.decode(self.rows_read, &row) {
                Ok(prop) => match self.pending.take() {
                    Some(mut pending) if pending.is_same_object(&prop) => {
                        pending.merge_references(prop);
                        self.pending = Some(pending);
                    }
                    Some(pending) => {
                        self.pending = Some(prop);
                        return Some(Ok(pending));
                    }
                    None => self.pending = Some(prop),
                },
                Err(e) if e.is_fatal() => {
                    self.pending = None;
                    self.finish();
                    return Some(Err(Error::Decode(e)));
                }
                Err(e) => {
                    warn!("{}; row skipped", e);
                    self.rows_skipped += 1;
                }
            }
        }
    }
}

impl Drop for ResultStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed to close result cursor: {}", e);
        }
    }
}

impl std::fmt::Debug for ResultStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("rows_read", &self.rows_read)
            .field("rows_skipped", &self.rows_skipped)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
