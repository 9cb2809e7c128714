//! Purpose: Define the stable public Rust API boundary for rowline.
//! Exports: Validators, row reading and iteration, column serialization, errors, JSON tables.
//! Role: Public, additive-only surface used by the CLI and by embedding crates.
//! Invariants: Everything re-exported here is reachable without naming `core` paths.
//! Invariants: `table` is the only module that owns data; the rest is re-exported from core.

mod table;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::iter::RowIterator;
pub use crate::core::multiline::MultilineLimitGuard;
pub use crate::core::number::{DecimalFormat, Number, NumberFormat};
pub use crate::core::pattern::DatePattern;
pub use crate::core::reader::{
    BufLineSource, LineSource, ReaderConfig, RecordSource, RowReader,
};
pub use crate::core::result_row::{ColumnMeta, ResultRow, RowMetadata, SqlType, TypeClass};
pub use crate::core::serialize::{
    CLOB_READ_CHUNK, ColumnSerializer, DEFAULT_DATE_FORMAT, DEFAULT_TIMESTAMP_FORMAT,
    SerializerConfig, column_names,
};
pub use crate::core::tokenize::{LineTokenizer, QuotedFieldTokenizer, Tokenized};
pub use crate::core::validate::{
    ColumnCount, ForbiddenText, LineValidator, LineValidatorAggregator, MaxLength, NotBlank,
    RowValidator, RowValidatorAggregator,
};
pub use table::{Cell, JsonTable, MemoryRow};
