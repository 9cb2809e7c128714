use crate::core::text::abbreviate;
use std::error::Error as StdError;
use std::fmt;

// Upper bound for line/context text echoed by Display; full text stays on the error.
const DISPLAY_SNIPPET_CHARS: usize = 80;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    Usage,
    Validation,
    MultilineLimit,
    Parse,
    Exhausted,
    Io,
    DataAccess,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    hint: Option<String>,
    line: Option<String>,
    row: Option<u64>,
    context: Option<String>,
    related: Vec<Error>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            hint: None,
            line: None,
            row: None,
            context: None,
            related: Vec::new(),
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// The physical line that was rejected, when the failure is tied to one.
    pub fn line(&self) -> Option<&str> {
        self.line.as_deref()
    }

    /// 1-based logical row number the failure refers to.
    pub fn row(&self) -> Option<u64> {
        self.row
    }

    /// Partial record text accumulated before the failure.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Individual failures merged into this one, in the order they were raised.
    pub fn related(&self) -> &[Error] {
        &self.related
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.line = Some(line.into());
        self
    }

    pub fn with_row(mut self, row: u64) -> Self {
        self.row = Some(row);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_related(mut self, related: Vec<Error>) -> Self {
        self.related = related;
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Follows `source()` links down to the innermost crate error, if any.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Some(inner) = current
            .source
            .as_ref()
            .and_then(|source| source.downcast_ref::<Error>())
        {
            current = inner;
        }
        current
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(row) = self.row {
            write!(f, " (row: {row})")?;
        }
        if let Some(line) = &self.line {
            write!(f, " (line: {})", abbreviate(line, DISPLAY_SNIPPET_CHARS))?;
        }
        if let Some(context) = &self.context {
            write!(f, " (context: {})", abbreviate(context, DISPLAY_SNIPPET_CHARS))?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::Usage => 2,
        ErrorKind::Validation => 3,
        ErrorKind::MultilineLimit => 4,
        ErrorKind::Parse => 5,
        ErrorKind::Exhausted => 6,
        ErrorKind::Io => 7,
        ErrorKind::DataAccess => 8,
    }
}
