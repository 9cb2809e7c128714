// Pull engine that turns physical lines into logical rows.
// Per record: read a line, validate it, fold it into the record text under the
// multiline guard, tokenize, and repeat while a quoted field is still open.
// Completed rows then pass the row validators before they are returned.
use std::io::{self, BufRead, BufReader, Read};

use bstr::ByteSlice;
use tracing::{debug, trace, warn};

use crate::core::error::{Error, ErrorKind};
use crate::core::multiline::MultilineLimitGuard;
use crate::core::text::lossy_snippet;
use crate::core::tokenize::{LineTokenizer, QuotedFieldTokenizer, Tokenized};
use crate::core::validate::{LineValidatorAggregator, RowValidatorAggregator};

const SNIPPET_CHARS: usize = 80;

/// Source of physical lines; `None` marks end of input.
///
/// Lines come back without their `\n`. A preceding `\r` is left in place for the reader to
/// strip or keep.
pub trait LineSource {
    fn read_line(&mut self) -> Result<Option<String>, Error>;
}

/// Anything that yields whole logical rows, one per call, `None` at end of input.
pub trait RecordSource {
    fn read_record(&mut self) -> Result<Option<Vec<String>>, Error>;
}

#[derive(Copy, Clone, Debug)]
pub struct ReaderConfig {
    /// Leading physical lines discarded before the first record; never validated.
    pub skip_lines: usize,
    /// Maximum physical lines per record; zero or negative means unlimited.
    pub multiline_limit: i64,
    /// Keep a trailing `\r` on each line instead of stripping it.
    pub keep_cr: bool,
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self {
            skip_lines: 0,
            multiline_limit: 0,
            keep_cr: false,
        }
    }

    pub fn with_skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    pub fn with_multiline_limit(mut self, limit: i64) -> Self {
        self.multiline_limit = limit;
        self
    }

    pub fn with_keep_cr(mut self, keep_cr: bool) -> Self {
        self.keep_cr = keep_cr;
        self
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(err: io::Error, message: &str) -> Error {
    Error::new(ErrorKind::Io)
        .with_message(message)
        .with_source(err)
}

pub struct BufLineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: BufRead> BufLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> LineSource for BufLineSource<R> {
    fn read_line(&mut self) -> Result<Option<String>, Error> {
        self.buf.clear();
        let read = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .map_err(|err| io_error(err, "failed to read line"))?;
        if read == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        match self.buf.to_str() {
            Ok(line) => Ok(Some(line.to_string())),
            Err(err) => Err(Error::new(ErrorKind::Parse)
                .with_message("line is not valid UTF-8")
                .with_line(lossy_snippet(&self.buf, SNIPPET_CHARS))
                .with_source(err)),
        }
    }
}

pub struct RowReader<S, T = QuotedFieldTokenizer> {
    source: S,
    tokenizer: T,
    line_validators: LineValidatorAggregator,
    row_validators: RowValidatorAggregator,
    guard: MultilineLimitGuard,
    config: ReaderConfig,
    skipped: bool,
    lines_read: u64,
    records_read: u64,
}

impl<R: Read> RowReader<BufLineSource<BufReader<R>>, QuotedFieldTokenizer> {
    /// Reader over any byte stream using the default quoted-field tokenizer.
    pub fn from_reader(reader: R, config: ReaderConfig) -> Self {
        RowReader::new(
            BufLineSource::new(BufReader::new(reader)),
            QuotedFieldTokenizer::default(),
            config,
        )
    }
}

impl<S: LineSource, T: LineTokenizer> RowReader<S, T> {
    pub fn new(source: S, tokenizer: T, config: ReaderConfig) -> Self {
        Self {
            source,
            tokenizer,
            line_validators: LineValidatorAggregator::new(),
            row_validators: RowValidatorAggregator::new(),
            guard: MultilineLimitGuard::new(config.multiline_limit),
            config,
            skipped: false,
            lines_read: 0,
            records_read: 0,
        }
    }

    pub fn with_line_validators(mut self, validators: LineValidatorAggregator) -> Self {
        self.line_validators = validators;
        self
    }

    pub fn with_row_validators(mut self, validators: RowValidatorAggregator) -> Self {
        self.row_validators = validators;
        self
    }

    pub fn config(&self) -> ReaderConfig {
        self.config
    }

    /// Physical lines consumed so far, skipped lines included.
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    /// Rows successfully returned so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Reads the next logical row, or `None` at end of input.
    ///
    /// A failure abandons only the record being assembled; a later call starts on the
    /// following physical line.
    ///
    /// Errors name the row as one past the rows returned so far, so rejected records do not
    /// shift the numbering.
    pub fn read_next(&mut self) -> Result<Option<Vec<String>>, Error> {
        self.skip_leading_lines()?;
        self.guard.reset();
        let row = self.records_read + 1;

        let mut record = String::new();
        let mut folded = 0u64;
        loop {
            let Some(line) = self.next_line()? else {
                if folded == 0 {
                    return Ok(None);
                }
                return Err(Error::new(ErrorKind::Parse)
                    .with_message("unterminated quoted field at end of input")
                    .with_row(row)
                    .with_context(record));
            };

            if let Err(err) = self.line_validators.validate(&line) {
                warn!(row, line = self.lines_read, "line rejected by validators");
                self.guard.reset();
                return Err(err.with_row(row));
            }

            if folded > 0 {
                record.push('\n');
            }
            record.push_str(&line);
            folded += 1;

            if let Err(err) = self.guard.observe(row, &record) {
                warn!(row, lines = folded, limit = self.guard.limit(), "multiline limit exceeded");
                return Err(err);
            }

            match self.tokenizer.tokenize(&record) {
                Ok(Tokenized::Complete(fields)) => {
                    if let Err(err) = self.row_validators.validate(&fields) {
                        warn!(row, "row rejected by validators");
                        self.guard.reset();
                        return Err(err.with_row(row).with_context(record));
                    }
                    self.guard.reset();
                    self.records_read += 1;
                    trace!(row, fields = fields.len(), lines = folded, "record assembled");
                    return Ok(Some(fields));
                }
                Ok(Tokenized::Continues) => continue,
                Err(err) => {
                    self.guard.reset();
                    return Err(err.with_row(row).with_context(record));
                }
            }
        }
    }

    fn skip_leading_lines(&mut self) -> Result<(), Error> {
        if self.skipped {
            return Ok(());
        }
        self.skipped = true;
        let mut skipped = 0usize;
        while skipped < self.config.skip_lines {
            if self.next_line()?.is_none() {
                break;
            }
            skipped += 1;
        }
        if skipped > 0 {
            debug!(lines = skipped, "skipped leading lines");
        }
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<String>, Error> {
        let Some(mut line) = self.source.read_line()? else {
            return Ok(None);
        };
        self.lines_read += 1;
        if !self.config.keep_cr && line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl<S: LineSource, T: LineTokenizer> RecordSource for RowReader<S, T> {
    fn read_record(&mut self) -> Result<Option<Vec<String>>, Error> {
        self.read_next()
    }
}
