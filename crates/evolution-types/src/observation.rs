//! Long-format keyword observations.

use serde::{Deserialize, Serialize};

/// One (keyword, year, count) row.
///
/// Duplicate (keyword, year) rows are legal; consumers sum them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordObservation {
    pub keyword: String,
    pub year: i32,
    pub count: u64,
}

impl KeywordObservation {
    pub fn new(keyword: impl Into<String>, year: i32, count: u64) -> Self {
        Self {
            keyword: keyword.into(),
            year,
            count,
        }
    }
}
