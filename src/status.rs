//! Free-text status classification.
//!
//! Spreadsheet status cells are loosely typed ("Done", "started ", "", "nan",
//! "waiting on vendor"). They are classified once into [`StatusClass`] and the
//! completion tables below are derived from that classification only.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusClass {
    Done,
    Started,
    Pending,
    Resolved,
    Completed,
    Other,
    Missing,
}

impl StatusClass {
    /// Trimmed, case-insensitive exact match. Empty cells and the `nan`
    /// placeholder emitted by spreadsheet exports count as missing.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(value) = raw.map(str::trim) else {
            return StatusClass::Missing;
        };
        if is_blank(value) {
            return StatusClass::Missing;
        }
        match value.to_ascii_lowercase().as_str() {
            "done" => StatusClass::Done,
            "started" => StatusClass::Started,
            "pending" => StatusClass::Pending,
            "resolved" => StatusClass::Resolved,
            "completed" => StatusClass::Completed,
            _ => StatusClass::Other,
        }
    }

    /// Completion for a primary status row: done 100, started 50, else 0.
    pub fn primary_completion(self) -> u8 {
        match self {
            StatusClass::Done => 100,
            StatusClass::Started => 50,
            _ => 0,
        }
    }

    pub fn issue_completion(self) -> u8 {
        match self {
            StatusClass::Done | StatusClass::Resolved => 100,
            StatusClass::Pending => 30,
            StatusClass::Missing => 0,
            StatusClass::Started | StatusClass::Completed | StatusClass::Other => 50,
        }
    }

    pub fn revisit_completion(self) -> u8 {
        match self {
            StatusClass::Done | StatusClass::Completed => 100,
            StatusClass::Pending | StatusClass::Missing => 0,
            StatusClass::Started | StatusClass::Resolved | StatusClass::Other => 50,
        }
    }
}

/// Empty, whitespace-only or the `nan` placeholder dataframe exports write
/// for missing cells. A literal `None` is a value.
pub(crate) fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}
