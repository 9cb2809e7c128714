// Core modules implementing validation, row assembly, iteration, and column rendering.
pub mod error;
pub mod iter;
pub mod multiline;
pub mod number;
pub mod pattern;
pub mod reader;
pub mod result_row;
pub mod serialize;
pub mod text;
pub mod tokenize;
pub mod validate;
