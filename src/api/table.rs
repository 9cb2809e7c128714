//! Purpose: In-memory typed rows and a JSON-backed table that yields them.
//! Exports: `Cell`, `MemoryRow`, `JsonTable`.
//! Role: Bundled `ResultRow` source for the CLI `export` command and for tests.
//! Invariants: Temporal strings are parsed once at load; rows never re-parse JSON.
//! Invariants: Every row has exactly one cell per declared column.

use std::io::{Cursor, Read};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use time::format_description::{self, BorrowedFormatItem};
use time::{Date, PrimitiveDateTime, Time};

use crate::core::error::{Error, ErrorKind};
use crate::core::pattern::{iso_date, iso_time, iso_timestamp};
use crate::core::result_row::{ColumnMeta, ResultRow, RowMetadata, SqlType, TypeClass};

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(Date),
    Time(Time),
    Timestamp(PrimitiveDateTime),
}

impl Cell {
    fn kind(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Bool(_) => "boolean",
            Cell::Int(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Text(_) => "text",
            Cell::Date(_) => "date",
            Cell::Time(_) => "time",
            Cell::Timestamp(_) => "timestamp",
        }
    }

    fn display_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Bool(value) => Some(value.to_string()),
            Cell::Int(value) => Some(value.to_string()),
            Cell::Float(value) => Some(value.to_string()),
            Cell::Text(value) => Some(value.clone()),
            Cell::Date(value) => Some(iso_date(*value)),
            Cell::Time(value) => Some(iso_time(*value)),
            Cell::Timestamp(value) => Some(iso_timestamp(*value)),
        }
    }
}

/// One row of cells sharing table metadata; tracks the null flag of the last access.
#[derive(Clone, Debug)]
pub struct MemoryRow {
    metadata: Arc<RowMetadata>,
    cells: Vec<Cell>,
    was_null: bool,
}

impl MemoryRow {
    pub fn new(metadata: Arc<RowMetadata>, cells: Vec<Cell>) -> Self {
        Self {
            metadata,
            cells,
            was_null: false,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn cell(&mut self, column: usize) -> Result<&Cell, Error> {
        let Some(cell) = self.cells.get(column) else {
            return Err(Error::new(ErrorKind::DataAccess).with_message(format!(
                "column index {column} out of range ({} columns)",
                self.cells.len()
            )));
        };
        self.was_null = matches!(cell, Cell::Null);
        Ok(cell)
    }
}

fn mismatch(column: usize, cell: &Cell, wanted: &str) -> Error {
    Error::new(ErrorKind::DataAccess).with_message(format!(
        "column {column}: cannot read {} value as {wanted}",
        cell.kind()
    ))
}

impl ResultRow for MemoryRow {
    fn metadata(&self) -> Result<&RowMetadata, Error> {
        Ok(&self.metadata)
    }

    fn get_bool(&mut self, column: usize) -> Result<bool, Error> {
        let cell = self.cell(column)?;
        match cell {
            Cell::Null => Ok(false),
            Cell::Bool(value) => Ok(*value),
            Cell::Int(value) => Ok(*value != 0),
            Cell::Text(text) => match text.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(mismatch(column, cell, "boolean")),
            },
            other => Err(mismatch(column, other, "boolean")),
        }
    }

    fn get_i64(&mut self, column: usize) -> Result<i64, Error> {
        let cell = self.cell(column)?;
        match cell {
            Cell::Null => Ok(0),
            Cell::Bool(value) => Ok(i64::from(*value)),
            Cell::Int(value) => Ok(*value),
            Cell::Float(value) => Ok(value.trunc() as i64),
            Cell::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|err| mismatch(column, cell, "integer").with_source(err)),
            other => Err(mismatch(column, other, "integer")),
        }
    }

    fn get_f64(&mut self, column: usize) -> Result<f64, Error> {
        let cell = self.cell(column)?;
        match cell {
            Cell::Null => Ok(0.0),
            Cell::Int(value) => Ok(*value as f64),
            Cell::Float(value) => Ok(*value),
            Cell::Text(text) => text
                .trim()
                .parse::<f64>()
                .map_err(|err| mismatch(column, cell, "float").with_source(err)),
            other => Err(mismatch(column, other, "float")),
        }
    }

    fn get_decimal(&mut self, column: usize) -> Result<Option<String>, Error> {
        match self.cell(column)? {
            Cell::Null => Ok(None),
            Cell::Int(value) => Ok(Some(value.to_string())),
            Cell::Float(value) => Ok(Some(value.to_string())),
            Cell::Text(text) => Ok(Some(text.trim().to_string())),
            other => Err(mismatch(column, other, "decimal")),
        }
    }

    fn get_date(&mut self, column: usize) -> Result<Option<Date>, Error> {
        match self.cell(column)? {
            Cell::Null => Ok(None),
            Cell::Date(value) => Ok(Some(*value)),
            Cell::Timestamp(value) => Ok(Some(value.date())),
            other => Err(mismatch(column, other, "date")),
        }
    }

    fn get_time(&mut self, column: usize) -> Result<Option<Time>, Error> {
        match self.cell(column)? {
            Cell::Null => Ok(None),
            Cell::Time(value) => Ok(Some(*value)),
            Cell::Timestamp(value) => Ok(Some(value.time())),
            other => Err(mismatch(column, other, "time")),
        }
    }

    fn get_timestamp(&mut self, column: usize) -> Result<Option<PrimitiveDateTime>, Error> {
        match self.cell(column)? {
            Cell::Null => Ok(None),
            Cell::Timestamp(value) => Ok(Some(*value)),
            Cell::Date(value) => Ok(Some(value.midnight())),
            other => Err(mismatch(column, other, "timestamp")),
        }
    }

    fn get_string(&mut self, column: usize) -> Result<Option<String>, Error> {
        Ok(self.cell(column)?.display_text())
    }

    fn get_nstring(&mut self, column: usize) -> Result<Option<String>, Error> {
        Ok(self.cell(column)?.display_text())
    }

    fn get_clob(&mut self, column: usize) -> Result<Option<Box<dyn Read>>, Error> {
        let text = self.cell(column)?.display_text();
        Ok(text.map(|text| Box::new(Cursor::new(text.into_bytes())) as Box<dyn Read>))
    }

    fn get_object(&mut self, column: usize) -> Result<Option<String>, Error> {
        Ok(self.cell(column)?.display_text())
    }

    fn was_null(&self) -> bool {
        self.was_null
    }
}

#[derive(Deserialize)]
struct TableDocument {
    columns: Vec<ColumnDocument>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct ColumnDocument {
    label: String,
    #[serde(rename = "type")]
    sql_type: String,
}

struct TemporalFormats {
    date: Vec<BorrowedFormatItem<'static>>,
    time: Vec<BorrowedFormatItem<'static>>,
    time_fraction: Vec<BorrowedFormatItem<'static>>,
    timestamp: Vec<BorrowedFormatItem<'static>>,
    timestamp_fraction: Vec<BorrowedFormatItem<'static>>,
}

impl TemporalFormats {
    fn load() -> Result<Self, Error> {
        let parse = |description: &'static str| {
            format_description::parse(description).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("invalid built-in temporal format")
                    .with_source(err)
            })
        };
        Ok(Self {
            date: parse("[year]-[month]-[day]")?,
            time: parse("[hour]:[minute]:[second]")?,
            time_fraction: parse("[hour]:[minute]:[second].[subsecond]")?,
            timestamp: parse("[year]-[month]-[day] [hour]:[minute]:[second]")?,
            timestamp_fraction: parse("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]")?,
        })
    }
}

/// A typed table read from `{"columns":[{"label","type"}...],"rows":[[...]...]}`.
///
/// Dates are `YYYY-MM-DD`, times `HH:MM:SS[.fff]`, timestamps
/// `YYYY-MM-DD HH:MM:SS[.fff]` (a `T` separator is accepted). Decimal columns keep the
/// exact JSON number text.
#[derive(Clone, Debug)]
pub struct JsonTable {
    metadata: Arc<RowMetadata>,
    rows: Vec<Vec<Cell>>,
}

impl JsonTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Error> {
        let document: TableDocument = serde_json::from_reader(reader).map_err(json_error)?;
        Self::from_document(document)
    }

    fn from_document(document: TableDocument) -> Result<Self, Error> {
        let columns: Vec<ColumnMeta> = document
            .columns
            .into_iter()
            .map(|column| {
                let sql_type = column
                    .sql_type
                    .parse::<SqlType>()
                    .unwrap_or_else(|never| match never {});
                ColumnMeta::new(column.label, sql_type)
            })
            .collect();
        let formats = TemporalFormats::load()?;

        let mut rows = Vec::with_capacity(document.rows.len());
        for (row_idx, values) in document.rows.into_iter().enumerate() {
            let row_number = row_idx as u64 + 1;
            if values.len() != columns.len() {
                return Err(Error::new(ErrorKind::DataAccess)
                    .with_message(format!(
                        "row has {} cells but {} columns are declared",
                        values.len(),
                        columns.len()
                    ))
                    .with_row(row_number));
            }
            let mut cells = Vec::with_capacity(values.len());
            for (value, column) in values.into_iter().zip(&columns) {
                let cell = to_cell(value, column.sql_type.class(), &formats)
                    .map_err(|err| err.with_row(row_number))?;
                cells.push(cell);
            }
            rows.push(cells);
        }

        Ok(Self {
            metadata: Arc::new(RowMetadata::new(columns)),
            rows,
        })
    }

    pub fn metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = MemoryRow> + '_ {
        self.rows
            .iter()
            .map(|cells| MemoryRow::new(Arc::clone(&self.metadata), cells.clone()))
    }
}

impl FromStr for JsonTable {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let document: TableDocument = serde_json::from_str(input).map_err(json_error)?;
        Self::from_document(document)
    }
}

fn json_error(err: serde_json::Error) -> Error {
    let kind = if err.is_io() {
        ErrorKind::Io
    } else {
        ErrorKind::Parse
    };
    Error::new(kind)
        .with_message(format!("invalid table document: {err}"))
        .with_hint("Expected {\"columns\":[{\"label\":..,\"type\":..}],\"rows\":[[..]]}.")
        .with_source(err)
}

fn to_cell(value: Value, class: TypeClass, formats: &TemporalFormats) -> Result<Cell, Error> {
    let cell = match value {
        Value::Null => Cell::Null,
        Value::Bool(value) => Cell::Bool(value),
        Value::Number(number) if class == TypeClass::Decimal => Cell::Text(number.to_string()),
        Value::Number(number) => match number.as_i64() {
            Some(value) => Cell::Int(value),
            None => Cell::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => match class {
            TypeClass::Date => Cell::Date(parse_temporal(&text, "date", |text| {
                Date::parse(text, &formats.date)
            })?),
            TypeClass::Time => Cell::Time(parse_temporal(&text, "time", |text| {
                if text.contains('.') {
                    Time::parse(text, &formats.time_fraction)
                } else {
                    Time::parse(text, &formats.time)
                }
            })?),
            TypeClass::Timestamp => Cell::Timestamp(parse_temporal(&text, "timestamp", |text| {
                let text = text.replacen('T', " ", 1);
                if text.contains('.') {
                    PrimitiveDateTime::parse(&text, &formats.timestamp_fraction)
                } else {
                    PrimitiveDateTime::parse(&text, &formats.timestamp)
                }
            })?),
            _ => Cell::Text(text),
        },
        other => Cell::Text(other.to_string()),
    };
    Ok(cell)
}

fn parse_temporal<T>(
    text: &str,
    what: &str,
    parse: impl FnOnce(&str) -> Result<T, time::error::Parse>,
) -> Result<T, Error> {
    parse(text.trim()).map_err(|err| {
        Error::new(ErrorKind::DataAccess)
            .with_message(format!("invalid {what} {text:?}"))
            .with_source(err)
    })
}
