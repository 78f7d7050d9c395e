//! Tagged document records.
//!
//! Records arrive from the ingestion layer with loosely typed years. They are
//! coerced into [`TaggedDocument`]s before any windowing happens; records whose
//! year cannot be coerced are dropped, never carried forward.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Script family of a keyword field.
///
/// Determines the separator set and whether tokens are lower-cased.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Latin-script terms, `;` or `,` delimited, lower-cased
    #[default]
    #[serde(alias = "en")]
    Latin,
    /// Ideographic terms (CJK), case preserved
    #[serde(alias = "cn", alias = "zh")]
    Ideographic,
}

impl Language {
    /// Characters that separate keywords in a raw field.
    pub fn separators(&self) -> &'static [char] {
        match self {
            Language::Latin => &[';', ','],
            Language::Ideographic => &[';', '；', '、', ',', '，', '.'],
        }
    }

    /// Whether tokens are lower-cased during normalization.
    pub fn folds_case(&self) -> bool {
        matches!(self, Language::Latin)
    }

    /// Parse from a short code or full name.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "latin" | "en" => Some(Language::Latin),
            "ideographic" | "cn" | "zh" => Some(Language::Ideographic),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Latin => write!(f, "latin"),
            Language::Ideographic => write!(f, "ideographic"),
        }
    }
}

/// A year value as produced by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawYear {
    Integer(i64),
    Float(f64),
    Text(String),
    /// Any other JSON shape (bool, object, array); never a valid year.
    Other(serde_json::Value),
}

/// An uncoerced input record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Year in any of the accepted shapes; `None` for null/missing
    #[serde(default)]
    pub year: Option<RawYear>,
    /// Delimited keyword/term field
    #[serde(default, alias = "terms")]
    pub keywords: Option<String>,
}

impl RawRecord {
    pub fn new(year: Option<RawYear>, keywords: Option<&str>) -> Self {
        Self {
            year,
            keywords: keywords.map(String::from),
        }
    }
}

/// One dated, keyword-tagged record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDocument {
    /// Calendar year
    pub year: i32,
    /// Raw delimited keyword field (empty when the source had none)
    pub keywords: String,
}

impl TaggedDocument {
    pub fn new(year: i32, keywords: impl Into<String>) -> Self {
        Self {
            year,
            keywords: keywords.into(),
        }
    }
}

/// Coerce a raw year to an integer calendar year.
///
/// Floats are truncated; NaN, infinities, non-numeric strings, non-scalar
/// values and values outside `i32` yield `None`.
pub fn coerce_year(raw: &RawYear) -> Option<i32> {
    match raw {
        RawYear::Integer(v) => i32::try_from(*v).ok(),
        RawYear::Float(v) => float_year(*v),
        RawYear::Text(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return i32::try_from(v).ok();
            }
            s.parse::<f64>().ok().and_then(float_year)
        }
        RawYear::Other(_) => None,
    }
}

fn float_year(v: f64) -> Option<i32> {
    if !v.is_finite() {
        return None;
    }
    let t = v.trunc();
    if t < f64::from(i32::MIN) || t > f64::from(i32::MAX) {
        return None;
    }
    Some(t as i32)
}

/// Result of coercing a batch of raw records.
#[derive(Debug, Clone, Default)]
pub struct CoercedRecords {
    /// Records with a valid year, input order preserved
    pub documents: Vec<TaggedDocument>,
    /// Number of records dropped for a missing or malformed year
    pub dropped: usize,
}

/// Coerce records, dropping any whose year is missing or malformed.
pub fn coerce_records(records: impl IntoIterator<Item = RawRecord>) -> CoercedRecords {
    let mut out = CoercedRecords::default();
    for record in records {
        match record.year.as_ref().and_then(coerce_year) {
            Some(year) => out
                .documents
                .push(TaggedDocument::new(year, record.keywords.unwrap_or_default())),
            None => out.dropped += 1,
        }
    }
    if out.dropped > 0 {
        debug!(dropped = out.dropped, "Dropped records with malformed year");
    }
    out
}
