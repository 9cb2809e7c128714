//! Purpose: Library crate behind the `rowline` CLI and integration tests.
//! Exports: `api` (public surface), `core` (validation, row reading, iteration, column
//! serialization, errors), `notice` (stderr notice schema).
//! Role: Lazy delimited-row ingestion and typed-row rendering; no file or process setup.
//! Invariants: Core modules take explicit inputs (line sources, typed rows) and hold no globals.
//! Invariants: Every failure surfaces as `core::error::Error`; nothing is dropped silently.
pub mod api;
pub mod core;
pub mod notice;
