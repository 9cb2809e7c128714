// Ceiling on physical lines folded into one logical record.
// A limit of zero or below disables the check entirely.
use crate::core::error::{Error, ErrorKind};

#[derive(Debug)]
pub struct MultilineLimitGuard {
    limit: i64,
    lines_in_record: u64,
}

impl MultilineLimitGuard {
    pub fn new(limit: i64) -> Self {
        Self {
            limit,
            lines_in_record: 0,
        }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit <= 0
    }

    pub fn lines_in_record(&self) -> u64 {
        self.lines_in_record
    }

    /// Counts one more physical line for the record numbered `row` and fails once the
    /// count passes the limit. `context` is the record text assembled so far.
    pub fn observe(&mut self, row: u64, context: &str) -> Result<(), Error> {
        self.lines_in_record += 1;
        if self.is_unlimited() || self.lines_in_record <= self.limit as u64 {
            return Ok(());
        }
        let lines = self.lines_in_record;
        self.reset();
        Err(Error::new(ErrorKind::MultilineLimit)
            .with_message(format!(
                "record spans {lines} lines, exceeding the multiline limit of {}",
                self.limit
            ))
            .with_hint("Check for an unbalanced quote or raise the multiline limit.")
            .with_row(row)
            .with_context(context))
    }

    /// Starts counting a new record.
    pub fn reset(&mut self) {
        self.lines_in_record = 0;
    }
}
