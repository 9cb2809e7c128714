// Splitting of assembled record text into fields.
// The reader only sees `LineTokenizer`; `QuotedFieldTokenizer` is the bundled default,
// driving a `csv_core` reader over the record text plus one `\n` terminator.
use csv_core::{ReadRecordResult, ReaderBuilder, Terminator};

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Tokenized {
    Complete(Vec<String>),
    /// A field is still open at the end of the text; the next physical line belongs to it.
    Continues,
}

pub trait LineTokenizer {
    /// Tokenizes the record text assembled so far (physical lines joined with `\n`).
    fn tokenize(&self, record: &str) -> Result<Tokenized, Error>;
}

/// Separator/quote tokenizer: a doubled quote inside a quoted field is a literal quote,
/// and a separator or line break inside quotes is part of the field. Only `\n` ends a
/// record, so a kept `\r` stays in the last field.
#[derive(Clone, Copy, Debug)]
pub struct QuotedFieldTokenizer {
    separator: u8,
    quote: u8,
}

impl QuotedFieldTokenizer {
    pub const DEFAULT_SEPARATOR: char = ',';
    pub const DEFAULT_QUOTE: char = '"';

    /// Both characters must be ASCII, distinct, and not a line break.
    pub fn new(separator: char, quote: char) -> Result<Self, Error> {
        let separator = single_byte(separator, "separator")?;
        let quote = single_byte(quote, "quote")?;
        if separator == quote {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("separator and quote must differ")
                .with_hint("Pass distinct --separator and --quote characters."));
        }
        Ok(Self { separator, quote })
    }

    pub fn separator(&self) -> char {
        char::from(self.separator)
    }

    pub fn quote(&self) -> char {
        char::from(self.quote)
    }
}

fn single_byte(ch: char, role: &str) -> Result<u8, Error> {
    match u8::try_from(ch) {
        Ok(byte) if byte.is_ascii() && byte != b'\n' && byte != b'\r' => Ok(byte),
        _ => Err(Error::new(ErrorKind::Usage)
            .with_message(format!("unsupported {role} character {ch:?}"))
            .with_hint("Use a single ASCII character other than a line break.")),
    }
}

impl Default for QuotedFieldTokenizer {
    fn default() -> Self {
        Self {
            separator: b',',
            quote: b'"',
        }
    }
}

impl LineTokenizer for QuotedFieldTokenizer {
    fn tokenize(&self, record: &str) -> Result<Tokenized, Error> {
        // csv_core skips blank records; an empty line is one empty field here.
        if record.is_empty() {
            return Ok(Tokenized::Complete(vec![String::new()]));
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(self.separator)
            .quote(self.quote)
            .terminator(Terminator::Any(b'\n'))
            .build();

        let mut input = Vec::with_capacity(record.len() + 1);
        input.extend_from_slice(record.as_bytes());
        input.push(b'\n');
        // Unescaping never grows the text, and there is at most one field per input byte.
        let mut output = vec![0u8; input.len()];
        let mut ends = vec![0usize; input.len() + 1];

        let (result, _, _, field_count) = reader.read_record(&input, &mut output, &mut ends);
        match result {
            ReadRecordResult::InputEmpty | ReadRecordResult::End => Ok(Tokenized::Continues),
            ReadRecordResult::Record => {
                let mut fields = Vec::with_capacity(field_count);
                let mut start = 0;
                for &end in &ends[..field_count] {
                    let field = std::str::from_utf8(&output[start..end]).map_err(|err| {
                        Error::new(ErrorKind::Parse)
                            .with_message("field is not valid UTF-8")
                            .with_source(err)
                    })?;
                    fields.push(field.to_string());
                    start = end;
                }
                Ok(Tokenized::Complete(fields))
            }
            ReadRecordResult::OutputFull | ReadRecordResult::OutputEndsFull => {
                Err(Error::new(ErrorKind::Internal)
                    .with_message("tokenizer buffers too small for record"))
            }
        }
    }
}
