//! Purpose: Structured stderr notices for records skipped by `read -e skip`.
//! Exports: `Notice`, `NoticeDetails`, `notice_json`, `notice_time_now`.
//! Role: Built by the CLI while reading; one notice per skipped record plus a closing summary.
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON field names are additive-only once published.
use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::core::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NoticeDetails {
    RecordSkip {
        error_kind: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        row: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        context: Option<String>,
    },
    ReadSummary {
        total: u64,
        ok: u64,
        skipped: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub time: String,
    pub input: String,
    pub message: String,
    pub details: NoticeDetails,
}

impl Notice {
    /// A record rejected by validation, the multiline limit, or tokenizing.
    pub fn record_skip(err: &Error, input: &str) -> Self {
        let reason = match err.message() {
            Some(message) => message.to_string(),
            None => err.to_string(),
        };
        let message = match err.row() {
            Some(row) => format!("Skipped record {row}: {reason}."),
            None => format!("Skipped record: {reason}."),
        };
        Self {
            time: stamp(),
            input: input.to_string(),
            message,
            details: NoticeDetails::RecordSkip {
                error_kind: format!("{:?}", err.kind()),
                row: err.row(),
                line: err.line().map(str::to_string),
                context: err.context().map(str::to_string),
            },
        }
    }

    pub fn read_summary(ok: u64, skipped: u64, input: &str) -> Self {
        Self {
            time: stamp(),
            input: input.to_string(),
            message: format!("Read {ok} rows; skipped {skipped}."),
            details: NoticeDetails::ReadSummary {
                total: ok + skipped,
                ok,
                skipped,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.details {
            NoticeDetails::RecordSkip { .. } => "record_skip",
            NoticeDetails::ReadSummary { .. } => "read_summary",
        }
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    json!({
        "notice": {
            "kind": notice.kind(),
            "time": notice.time,
            "cmd": "read",
            "input": notice.input,
            "message": notice.message,
            "details": notice.details,
        }
    })
}

/// Current UTC time as RFC 3339, or `None` if formatting fails.
pub fn notice_time_now() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

fn stamp() -> String {
    notice_time_now().unwrap_or_else(|| "unknown".to_string())
}
