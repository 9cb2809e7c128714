// Typed-row source model: declared column types and a cursor-style accessor trait.
// Accessors follow the query-cursor convention: a null reads as a zero/None value and
// `was_null()` reports whether the last accessed column was null.
use std::fmt;
use std::io::Read;
use std::str::FromStr;

use time::{Date, PrimitiveDateTime, Time};

use crate::core::error::Error;

/// Declared column type as reported by the source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SqlType {
    Boolean,
    Bit,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Numeric,
    Real,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    Char,
    VarChar,
    LongVarChar,
    NChar,
    NVarChar,
    LongNVarChar,
    Clob,
    NClob,
    Other(String),
}

/// Rendering category shared by several declared types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeClass {
    Boolean,
    Integer,
    Float,
    Decimal,
    Date,
    Time,
    Timestamp,
    Text,
    WideText,
    LargeText,
    Other,
}

impl SqlType {
    pub fn class(&self) -> TypeClass {
        match self {
            SqlType::Boolean => TypeClass::Boolean,
            SqlType::TinyInt | SqlType::SmallInt | SqlType::Integer | SqlType::BigInt => {
                TypeClass::Integer
            }
            SqlType::Real | SqlType::Float | SqlType::Double => TypeClass::Float,
            SqlType::Decimal | SqlType::Numeric => TypeClass::Decimal,
            SqlType::Date => TypeClass::Date,
            SqlType::Time => TypeClass::Time,
            SqlType::Timestamp => TypeClass::Timestamp,
            SqlType::Char | SqlType::VarChar | SqlType::LongVarChar => TypeClass::Text,
            SqlType::NChar | SqlType::NVarChar | SqlType::LongNVarChar => TypeClass::WideText,
            SqlType::Clob | SqlType::NClob => TypeClass::LargeText,
            SqlType::Bit | SqlType::Other(_) => TypeClass::Other,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SqlType::Boolean => "boolean",
            SqlType::Bit => "bit",
            SqlType::TinyInt => "tinyint",
            SqlType::SmallInt => "smallint",
            SqlType::Integer => "integer",
            SqlType::BigInt => "bigint",
            SqlType::Decimal => "decimal",
            SqlType::Numeric => "numeric",
            SqlType::Real => "real",
            SqlType::Float => "float",
            SqlType::Double => "double",
            SqlType::Date => "date",
            SqlType::Time => "time",
            SqlType::Timestamp => "timestamp",
            SqlType::Char => "char",
            SqlType::VarChar => "varchar",
            SqlType::LongVarChar => "longvarchar",
            SqlType::NChar => "nchar",
            SqlType::NVarChar => "nvarchar",
            SqlType::LongNVarChar => "longnvarchar",
            SqlType::Clob => "clob",
            SqlType::NClob => "nclob",
            SqlType::Other(name) => name,
        }
    }
}

impl FromStr for SqlType {
    type Err = std::convert::Infallible;

    /// Case-insensitive; unknown names become `Other`.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let parsed = match name.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => SqlType::Boolean,
            "bit" => SqlType::Bit,
            "tinyint" => SqlType::TinyInt,
            "smallint" => SqlType::SmallInt,
            "integer" | "int" => SqlType::Integer,
            "bigint" => SqlType::BigInt,
            "decimal" => SqlType::Decimal,
            "numeric" => SqlType::Numeric,
            "real" => SqlType::Real,
            "float" => SqlType::Float,
            "double" => SqlType::Double,
            "date" => SqlType::Date,
            "time" => SqlType::Time,
            "timestamp" => SqlType::Timestamp,
            "char" => SqlType::Char,
            "varchar" | "text" => SqlType::VarChar,
            "longvarchar" => SqlType::LongVarChar,
            "nchar" => SqlType::NChar,
            "nvarchar" => SqlType::NVarChar,
            "longnvarchar" => SqlType::LongNVarChar,
            "clob" => SqlType::Clob,
            "nclob" => SqlType::NClob,
            _ => SqlType::Other(name.trim().to_string()),
        };
        Ok(parsed)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnMeta {
    pub label: String,
    pub sql_type: SqlType,
}

impl ColumnMeta {
    pub fn new(label: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            label: label.into(),
            sql_type,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RowMetadata {
    columns: Vec<ColumnMeta>,
}

impl RowMetadata {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self { columns }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn labels(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.label.clone()).collect()
    }
}

/// One row of a forward-only typed result, addressed by 0-based column index.
pub trait ResultRow {
    fn metadata(&self) -> Result<&RowMetadata, Error>;

    fn get_bool(&mut self, column: usize) -> Result<bool, Error>;
    fn get_i64(&mut self, column: usize) -> Result<i64, Error>;
    fn get_f64(&mut self, column: usize) -> Result<f64, Error>;
    /// Exact decimal as plain text.
    fn get_decimal(&mut self, column: usize) -> Result<Option<String>, Error>;
    fn get_date(&mut self, column: usize) -> Result<Option<Date>, Error>;
    fn get_time(&mut self, column: usize) -> Result<Option<Time>, Error>;
    fn get_timestamp(&mut self, column: usize) -> Result<Option<PrimitiveDateTime>, Error>;
    fn get_string(&mut self, column: usize) -> Result<Option<String>, Error>;
    fn get_nstring(&mut self, column: usize) -> Result<Option<String>, Error>;
    /// Character stream of a large text object.
    fn get_clob(&mut self, column: usize) -> Result<Option<Box<dyn Read>>, Error>;
    /// Default text form of whatever the column holds.
    fn get_object(&mut self, column: usize) -> Result<Option<String>, Error>;

    fn was_null(&self) -> bool;
}
