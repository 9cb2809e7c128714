//! Purpose: Render typed result rows as ordered strings for delimited output.
//! Exports: `SerializerConfig`, `ColumnSerializer`, `column_names`, default formats.
//! Role: Per-column dispatch from declared type class to a canonical text form.
//! Invariants: A column the source reports as null always renders as the null substitute.
//! Invariants: Large text is read to end in fixed-size chunks before rendering.
//! Invariants: A failure on any column fails the whole row; no partial rows are returned.

use std::io::{self, Read};

use time::{Date, PrimitiveDateTime, Time};
use tracing::trace;

use crate::core::error::{Error, ErrorKind};
use crate::core::number::{Number, NumberFormat};
use crate::core::pattern::{DatePattern, iso_time};
use crate::core::result_row::{ResultRow, RowMetadata, SqlType, TypeClass};

pub const DEFAULT_DATE_FORMAT: &str = "dd-MMM-yyyy";
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "dd-MMM-yyyy HH:mm:ss";
pub const CLOB_READ_CHUNK: usize = 127;

pub struct SerializerConfig {
    pub date_format: String,
    pub timestamp_format: String,
    pub integer_format: Option<Box<dyn NumberFormat>>,
    pub float_format: Option<Box<dyn NumberFormat>>,
    pub null_default: String,
}

impl SerializerConfig {
    pub fn new() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            integer_format: None,
            float_format: None,
            null_default: String::new(),
        }
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    pub fn with_timestamp_format(mut self, pattern: impl Into<String>) -> Self {
        self.timestamp_format = pattern.into();
        self
    }

    pub fn with_integer_format(mut self, format: impl NumberFormat + 'static) -> Self {
        self.integer_format = Some(Box::new(format));
        self
    }

    pub fn with_float_format(mut self, format: impl NumberFormat + 'static) -> Self {
        self.float_format = Some(Box::new(format));
        self
    }

    pub fn with_null_default(mut self, null_default: impl Into<String>) -> Self {
        self.null_default = null_default.into();
        self
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A column value read from the source, tagged by rendering class.
///
/// Scalar variants hold whatever the source returned for a null (zero, `false`); the
/// `was_null` flag travelling with the value decides the final text.
enum TypedColumnValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Decimal(Option<String>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    Text(Option<String>),
    WideText(Option<String>),
    LargeText(Option<Box<dyn Read>>),
    Other(Option<String>),
}

struct FetchedValue {
    value: TypedColumnValue,
    was_null: bool,
}

pub struct ColumnSerializer {
    date_format: DatePattern,
    timestamp_format: DatePattern,
    integer_format: Option<Box<dyn NumberFormat>>,
    float_format: Option<Box<dyn NumberFormat>>,
    null_default: String,
}

impl ColumnSerializer {
    /// Compiles the configured patterns; a bad pattern is a `Usage` error.
    pub fn new(config: SerializerConfig) -> Result<Self, Error> {
        Ok(Self {
            date_format: DatePattern::compile(&config.date_format)?,
            timestamp_format: DatePattern::compile(&config.timestamp_format)?,
            integer_format: config.integer_format,
            float_format: config.float_format,
            null_default: config.null_default,
        })
    }

    pub fn date_format(&self) -> &DatePattern {
        &self.date_format
    }

    pub fn timestamp_format(&self) -> &DatePattern {
        &self.timestamp_format
    }

    pub fn null_default(&self) -> &str {
        &self.null_default
    }

    pub fn column_names<R: ResultRow + ?Sized>(&self, row: &R) -> Result<Vec<String>, Error> {
        Ok(row.metadata()?.labels())
    }

    /// Renders every column with the configured patterns and no trimming.
    pub fn column_values_default<R: ResultRow + ?Sized>(
        &self,
        row: &mut R,
    ) -> Result<Vec<String>, Error> {
        self.column_values(row, false, &self.date_format, &self.timestamp_format)
    }

    pub fn column_values_trimmed<R: ResultRow + ?Sized>(
        &self,
        row: &mut R,
        trim: bool,
    ) -> Result<Vec<String>, Error> {
        self.column_values(row, trim, &self.date_format, &self.timestamp_format)
    }

    /// One string per column, in declared order.
    pub fn column_values<R: ResultRow + ?Sized>(
        &self,
        row: &mut R,
        trim: bool,
        date_format: &DatePattern,
        timestamp_format: &DatePattern,
    ) -> Result<Vec<String>, Error> {
        let types: Vec<SqlType> = row
            .metadata()?
            .columns()
            .iter()
            .map(|column| column.sql_type.clone())
            .collect();
        let mut values = Vec::with_capacity(types.len());
        for (column, sql_type) in types.iter().enumerate() {
            values.push(self.column_value(
                row,
                column,
                sql_type,
                trim,
                date_format,
                timestamp_format,
            )?);
        }
        trace!(columns = values.len(), "row serialized");
        Ok(values)
    }

    pub fn column_value<R: ResultRow + ?Sized>(
        &self,
        row: &mut R,
        column: usize,
        sql_type: &SqlType,
        trim: bool,
        date_format: &DatePattern,
        timestamp_format: &DatePattern,
    ) -> Result<String, Error> {
        let fetched = fetch(row, column, sql_type.class())?;
        let rendered = self.render(fetched.value, trim, date_format, timestamp_format)?;
        match rendered {
            Some(text) if !fetched.was_null => Ok(text),
            _ => Ok(self.null_default.clone()),
        }
    }

    /// Text for one value before null folding; `None` means the value is null.
    fn render(
        &self,
        value: TypedColumnValue,
        trim: bool,
        date_format: &DatePattern,
        timestamp_format: &DatePattern,
    ) -> Result<Option<String>, Error> {
        let text = match value {
            TypedColumnValue::Boolean(value) => Some(value.to_string()),
            TypedColumnValue::Integer(value) => Some(apply_format(
                self.integer_format.as_deref(),
                Number::Integer(value),
            )),
            TypedColumnValue::Float(value) => Some(apply_format(
                self.float_format.as_deref(),
                Number::Float(value),
            )),
            TypedColumnValue::Decimal(value) => value.map(|text| {
                apply_format(self.float_format.as_deref(), Number::Decimal(&text))
            }),
            TypedColumnValue::Date(value) => match value {
                Some(date) => Some(date_format.format_date(date)?),
                None => Some(self.null_default.clone()),
            },
            TypedColumnValue::Time(value) => Some(
                value
                    .map(iso_time)
                    .unwrap_or_else(|| self.null_default.clone()),
            ),
            TypedColumnValue::Timestamp(value) => match value {
                Some(timestamp) => Some(timestamp_format.format_datetime(timestamp)?),
                None => None,
            },
            TypedColumnValue::Text(value) | TypedColumnValue::WideText(value) => {
                value.map(|text| if trim { text.trim().to_string() } else { text })
            }
            TypedColumnValue::LargeText(value) => match value {
                Some(stream) => Some(read_large_text(stream)?),
                None => Some(self.null_default.clone()),
            },
            TypedColumnValue::Other(value) => value,
        };
        Ok(text)
    }
}

/// Reads one column through the accessor matching its class.
fn fetch<R: ResultRow + ?Sized>(
    row: &mut R,
    column: usize,
    class: TypeClass,
) -> Result<FetchedValue, Error> {
    let value = match class {
        TypeClass::Boolean => TypedColumnValue::Boolean(row.get_bool(column)?),
        TypeClass::Integer => TypedColumnValue::Integer(row.get_i64(column)?),
        TypeClass::Float => TypedColumnValue::Float(row.get_f64(column)?),
        TypeClass::Decimal => TypedColumnValue::Decimal(row.get_decimal(column)?),
        TypeClass::Date => TypedColumnValue::Date(row.get_date(column)?),
        TypeClass::Time => TypedColumnValue::Time(row.get_time(column)?),
        TypeClass::Timestamp => TypedColumnValue::Timestamp(row.get_timestamp(column)?),
        TypeClass::Text => TypedColumnValue::Text(row.get_string(column)?),
        TypeClass::WideText => TypedColumnValue::WideText(row.get_nstring(column)?),
        TypeClass::LargeText => TypedColumnValue::LargeText(row.get_clob(column)?),
        TypeClass::Other => TypedColumnValue::Other(row.get_object(column)?),
    };
    Ok(FetchedValue {
        value,
        was_null: row.was_null(),
    })
}

/// Labels of `metadata` in declared order.
pub fn column_names(metadata: &RowMetadata) -> Vec<String> {
    metadata.labels()
}

fn apply_format(format: Option<&dyn NumberFormat>, number: Number<'_>) -> String {
    match format {
        Some(format) => format.format(number),
        None => number.to_string(),
    }
}

fn read_large_text(mut stream: Box<dyn Read>) -> Result<String, Error> {
    let mut bytes = Vec::new();
    let mut chunk = [0u8; CLOB_READ_CHUNK];
    loop {
        let read = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(Error::new(ErrorKind::Io)
                    .with_message("failed to read large text column")
                    .with_source(err));
            }
        };
        bytes.extend_from_slice(&chunk[..read]);
    }
    String::from_utf8(bytes).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("large text column is not valid UTF-8")
            .with_source(err)
    })
}

#[cfg(test)]
mod tests {
    use super::{
        CLOB_READ_CHUNK, ColumnSerializer, DEFAULT_DATE_FORMAT, SerializerConfig, column_names,
    };
    use crate::api::{Cell, MemoryRow};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::number::DecimalFormat;
    use crate::core::pattern::DatePattern;
    use crate::core::result_row::{ColumnMeta, ResultRow, RowMetadata, SqlType};
    use std::cell::RefCell;
    use std::io::{self, Read};
    use std::rc::Rc;
    use std::sync::Arc;
    use time::{Date, Month, PrimitiveDateTime, Time};

    fn metadata(columns: &[(&str, SqlType)]) -> Arc<RowMetadata> {
        Arc::new(RowMetadata::new(
            columns
                .iter()
                .map(|(label, sql_type)| ColumnMeta::new(*label, sql_type.clone()))
                .collect(),
        ))
    }

    fn serializer(config: SerializerConfig) -> ColumnSerializer {
        ColumnSerializer::new(config).expect("serializer")
    }

    fn march_fifth() -> Date {
        Date::from_calendar_date(2024, Month::March, 5).unwrap()
    }

    #[test]
    fn mixed_row_with_null_date() {
        let meta = metadata(&[
            ("ID", SqlType::Integer),
            ("NAME", SqlType::VarChar),
            ("CREATED", SqlType::Date),
        ]);
        let mut row = MemoryRow::new(
            meta,
            vec![Cell::Int(42), Cell::Text("Bob".into()), Cell::Null],
        );
        let serializer =
            serializer(SerializerConfig::new().with_date_format(DEFAULT_DATE_FORMAT));
        assert_eq!(serializer.column_names(&row).unwrap(), vec!["ID", "NAME", "CREATED"]);
        assert_eq!(
            serializer.column_values_default(&mut row).unwrap(),
            vec!["42", "Bob", ""]
        );
    }

    #[test]
    fn null_folds_to_substitute_for_every_type() {
        let types = [
            SqlType::Boolean,
            SqlType::Bit,
            SqlType::TinyInt,
            SqlType::BigInt,
            SqlType::Decimal,
            SqlType::Double,
            SqlType::Date,
            SqlType::Time,
            SqlType::Timestamp,
            SqlType::Char,
            SqlType::NVarChar,
            SqlType::Clob,
            SqlType::NClob,
            SqlType::Other("json".into()),
        ];
        let columns: Vec<(&str, SqlType)> = types.iter().map(|t| ("c", t.clone())).collect();
        let mut row = MemoryRow::new(metadata(&columns), vec![Cell::Null; types.len()]);
        let serializer = serializer(
            SerializerConfig::new()
                .with_null_default("NULL")
                .with_integer_format(DecimalFormat::integer())
                .with_float_format(DecimalFormat::new(2, 2)),
        );
        let values = serializer.column_values_default(&mut row).unwrap();
        assert_eq!(values, vec!["NULL"; types.len()]);
    }

    #[test]
    fn formatters_apply_per_numeric_class() {
        let meta = metadata(&[
            ("a", SqlType::BigInt),
            ("b", SqlType::Numeric),
            ("c", SqlType::Double),
        ]);
        let cells = vec![
            Cell::Int(1234567),
            Cell::Text("10.005".into()),
            Cell::Float(0.5),
        ];

        let plain = serializer(SerializerConfig::new());
        let mut row = MemoryRow::new(Arc::clone(&meta), cells.clone());
        assert_eq!(
            plain.column_values_default(&mut row).unwrap(),
            vec!["1234567", "10.005", "0.5"]
        );

        let formatted = serializer(
            SerializerConfig::new()
                .with_integer_format(DecimalFormat::integer().with_grouping(true))
                .with_float_format(DecimalFormat::new(2, 2)),
        );
        let mut row = MemoryRow::new(meta, cells);
        assert_eq!(
            formatted.column_values_default(&mut row).unwrap(),
            vec!["1,234,567", "10.01", "0.50"]
        );
    }

    #[test]
    fn dates_times_and_timestamps_use_their_patterns() {
        let meta = metadata(&[
            ("d", SqlType::Date),
            ("t", SqlType::Time),
            ("ts", SqlType::Timestamp),
            ("flag", SqlType::Boolean),
        ]);
        let time = Time::from_hms(8, 30, 0).unwrap();
        let mut row = MemoryRow::new(
            meta,
            vec![
                Cell::Date(march_fifth()),
                Cell::Time(time),
                Cell::Timestamp(PrimitiveDateTime::new(march_fifth(), time)),
                Cell::Bool(true),
            ],
        );
        let serializer = serializer(SerializerConfig::new());
        assert_eq!(
            serializer.column_values_default(&mut row).unwrap(),
            vec!["05-Mar-2024", "08:30:00", "05-Mar-2024 08:30:00", "true"]
        );

        let date = DatePattern::compile("yyyy/MM/dd").unwrap();
        let timestamp = DatePattern::compile("yyyy-MM-dd'T'HH:mm").unwrap();
        assert_eq!(
            serializer
                .column_values(&mut row, false, &date, &timestamp)
                .unwrap(),
            vec!["2024/03/05", "08:30:00", "2024-03-05T08:30", "true"]
        );
    }

    #[test]
    fn trim_applies_to_text_columns_only_when_requested() {
        let meta = metadata(&[("a", SqlType::Char), ("b", SqlType::NChar)]);
        let cells = vec![Cell::Text("  padded  ".into()), Cell::Text(" wide ".into())];
        let serializer = serializer(SerializerConfig::new());

        let mut row = MemoryRow::new(Arc::clone(&meta), cells.clone());
        assert_eq!(
            serializer.column_values_trimmed(&mut row, false).unwrap(),
            vec!["  padded  ", " wide "]
        );
        let mut row = MemoryRow::new(meta, cells);
        assert_eq!(
            serializer.column_values_trimmed(&mut row, true).unwrap(),
            vec!["padded", "wide"]
        );
    }

    #[test]
    fn large_text_reconstructs_across_chunks() {
        let text: String = (0..300).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let meta = metadata(&[("body", SqlType::Clob)]);
        let mut row = MemoryRow::new(meta, vec![Cell::Text(text.clone())]);
        let values = serializer(SerializerConfig::new())
            .column_values_default(&mut row)
            .unwrap();
        assert_eq!(values[0].len(), 300);
        assert_eq!(values[0], text);
    }

    struct CountingReader {
        data: Vec<u8>,
        pos: usize,
        reads: Rc<RefCell<Vec<usize>>>,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads.borrow_mut().push(buf.len());
            let take = buf.len().min(self.data.len() - self.pos);
            buf[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
            self.pos += take;
            Ok(take)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("stream reset"))
        }
    }

    struct StreamRow {
        metadata: RowMetadata,
        stream: Option<Box<dyn Read>>,
    }

    impl ResultRow for StreamRow {
        fn metadata(&self) -> Result<&RowMetadata, Error> {
            Ok(&self.metadata)
        }
        fn get_bool(&mut self, _: usize) -> Result<bool, Error> {
            unreachable!()
        }
        fn get_i64(&mut self, _: usize) -> Result<i64, Error> {
            unreachable!()
        }
        fn get_f64(&mut self, _: usize) -> Result<f64, Error> {
            unreachable!()
        }
        fn get_decimal(&mut self, _: usize) -> Result<Option<String>, Error> {
            unreachable!()
        }
        fn get_date(&mut self, _: usize) -> Result<Option<Date>, Error> {
            unreachable!()
        }
        fn get_time(&mut self, _: usize) -> Result<Option<Time>, Error> {
            unreachable!()
        }
        fn get_timestamp(&mut self, _: usize) -> Result<Option<PrimitiveDateTime>, Error> {
            unreachable!()
        }
        fn get_string(&mut self, _: usize) -> Result<Option<String>, Error> {
            unreachable!()
        }
        fn get_nstring(&mut self, _: usize) -> Result<Option<String>, Error> {
            unreachable!()
        }
        fn get_clob(&mut self, _: usize) -> Result<Option<Box<dyn Read>>, Error> {
            Ok(self.stream.take())
        }
        fn get_object(&mut self, _: usize) -> Result<Option<String>, Error> {
            unreachable!()
        }
        fn was_null(&self) -> bool {
            false
        }
    }

    #[test]
    fn large_text_is_read_in_fixed_chunks() {
        let text = "x".repeat(300);
        let reads = Rc::new(RefCell::new(Vec::new()));
        let mut row = StreamRow {
            metadata: RowMetadata::new(vec![ColumnMeta::new("body", SqlType::NClob)]),
            stream: Some(Box::new(CountingReader {
                data: text.clone().into_bytes(),
                pos: 0,
                reads: Rc::clone(&reads),
            })),
        };
        let values = serializer(SerializerConfig::new())
            .column_values_default(&mut row)
            .unwrap();
        assert_eq!(values, vec![text]);
        let reads = reads.borrow();
        assert_eq!(reads.len(), 4);
        assert!(reads.iter().all(|len| *len == CLOB_READ_CHUNK));
    }

    #[test]
    fn stream_failure_fails_the_row() {
        let mut row = StreamRow {
            metadata: RowMetadata::new(vec![ColumnMeta::new("body", SqlType::Clob)]),
            stream: Some(Box::new(FailingReader)),
        };
        let err = serializer(SerializerConfig::new())
            .column_values_default(&mut row)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn other_types_use_default_stringification() {
        let meta = metadata(&[("bits", SqlType::Bit), ("geo", SqlType::Other("point".into()))]);
        let mut row = MemoryRow::new(meta, vec![Cell::Bool(false), Cell::Text("(1 2)".into())]);
        assert_eq!(
            serializer(SerializerConfig::new())
                .column_values_default(&mut row)
                .unwrap(),
            vec!["false", "(1 2)"]
        );
    }

    #[test]
    fn bad_pattern_is_rejected_at_construction() {
        let err = ColumnSerializer::new(SerializerConfig::new().with_date_format("qq"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn free_column_names_follow_metadata_order() {
        let meta = metadata(&[("z", SqlType::Integer), ("a", SqlType::Integer)]);
        assert_eq!(column_names(&meta), vec!["z", "a"]);
    }
}
