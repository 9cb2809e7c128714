// Forward-only row cursor with one row of read-ahead.
// The next row is always fetched before the current one is handed out, so `has_next`
// never touches the source. A failed fetch ends iteration; the row already buffered is
// still delivered, and the failure is reported by the call after it. `has_next` stays
// true while a failure is parked so that `while has_next()` loops reach it.
use tracing::debug;

use crate::core::error::{Error, ErrorKind};
use crate::core::reader::RecordSource;

enum Lookahead {
    Row(Vec<String>),
    Failed(Error),
    Exhausted,
}

pub struct RowIterator<S> {
    source: S,
    lookahead: Lookahead,
}

impl<S: RecordSource> RowIterator<S> {
    /// Wraps `source` and fetches its first row; a failure there is returned directly.
    pub fn new(mut source: S) -> Result<Self, Error> {
        let lookahead = match source.read_record()? {
            Some(row) => Lookahead::Row(row),
            None => Lookahead::Exhausted,
        };
        Ok(Self { source, lookahead })
    }

    /// True while `next_row` has something to report: a buffered row or a parked failure.
    /// Never reads from the source.
    pub fn has_next(&self) -> bool {
        matches!(self.lookahead, Lookahead::Row(_) | Lookahead::Failed(_))
    }

    /// The failure that ended iteration, until `next_row` reports it.
    pub fn failure(&self) -> Option<&Error> {
        match &self.lookahead {
            Lookahead::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Hands out the buffered row and fetches the one after it.
    ///
    /// Returns an `Exhausted` error wrapping the cause when the previous fetch failed, and
    /// a `Usage` error when called with nothing buffered.
    pub fn next_row(&mut self) -> Result<Vec<String>, Error> {
        match std::mem::replace(&mut self.lookahead, Lookahead::Exhausted) {
            Lookahead::Row(row) => {
                self.lookahead = self.fetch();
                Ok(row)
            }
            Lookahead::Failed(cause) => Err(Error::new(ErrorKind::Exhausted)
                .with_message(format!("no more rows: {}", cause_message(&cause)))
                .with_source(cause)),
            Lookahead::Exhausted => Err(Error::new(ErrorKind::Usage)
                .with_message("next_row called with no buffered row")
                .with_hint("Check has_next() before calling next_row().")),
        }
    }

    /// Rows cannot be removed through the iterator.
    pub fn remove(&mut self) -> Result<(), Error> {
        Err(Error::new(ErrorKind::Usage).with_message("read-only iterator"))
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn fetch(&mut self) -> Lookahead {
        match self.source.read_record() {
            Ok(Some(row)) => Lookahead::Row(row),
            Ok(None) => {
                debug!("row source exhausted");
                Lookahead::Exhausted
            }
            Err(err) => {
                debug!(error = %err, "row fetch failed; ending iteration");
                Lookahead::Failed(err)
            }
        }
    }
}

fn cause_message(cause: &Error) -> String {
    match cause.message() {
        Some(message) => message.to_string(),
        None => cause.to_string(),
    }
}

impl<S: RecordSource> Iterator for RowIterator<S> {
    type Item = Result<Vec<String>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lookahead {
            Lookahead::Exhausted => None,
            _ => Some(self.next_row()),
        }
    }
}
