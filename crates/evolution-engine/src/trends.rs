//! Keyword frequency statistics over normalized documents.
//!
//! Counts are document counts: a keyword repeated within one document is
//! counted once, matching the graph builder.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use evolution_types::KeywordObservation;

use crate::normalizer::NormalizedDocument;
use crate::windows::TimeWindow;

/// A keyword and how many documents carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// One `(keyword, year, 1)` observation per keyword per document.
pub fn explode_documents(documents: &[NormalizedDocument]) -> Vec<KeywordObservation> {
    documents
        .iter()
        .flat_map(|doc| {
            doc.keywords
                .iter()
                .map(move |k| KeywordObservation::new(k.clone(), doc.year, 1))
        })
        .collect()
}

fn ranked<'a>(docs: impl Iterator<Item = &'a NormalizedDocument>, n: usize) -> Vec<KeywordCount> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for doc in docs {
        for keyword in &doc.keywords {
            *counts.entry(keyword.as_str()).or_insert(0) += 1;
        }
    }
    let mut out: Vec<KeywordCount> = counts
        .into_iter()
        .map(|(keyword, count)| KeywordCount {
            keyword: keyword.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    out.truncate(n);
    out
}

/// The `n` most frequent keywords (ties by name).
pub fn top_keywords(documents: &[NormalizedDocument], n: usize) -> Vec<KeywordCount> {
    ranked(documents.iter(), n)
}

/// Year x keyword count table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeywordTrajectories {
    /// Years in which any tracked keyword occurs, ascending
    pub years: Vec<i32>,
    /// Tracked keywords by total count, descending
    pub keywords: Vec<String>,
    /// Per keyword, one count per entry of `years` (missing years are 0)
    pub counts: BTreeMap<String, Vec<u64>>,
}

impl KeywordTrajectories {
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Count of `keyword` in `year`.
    pub fn get(&self, keyword: &str, year: i32) -> Option<u64> {
        let column = self.years.binary_search(&year).ok()?;
        self.counts.get(keyword).map(|row| row[column])
    }
}

/// Yearly counts for `keywords`, or for the `top_n` most frequent keywords
/// when none are given.
pub fn keyword_trajectories(
    documents: &[NormalizedDocument],
    keywords: Option<&[String]>,
    top_n: usize,
) -> KeywordTrajectories {
    let tracked: BTreeSet<String> = match keywords {
        Some(list) => list.iter().cloned().collect(),
        None => top_keywords(documents, top_n)
            .into_iter()
            .map(|k| k.keyword)
            .collect(),
    };

    let mut cells: BTreeMap<(&str, i32), u64> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut totals: HashMap<&str, u64> = HashMap::new();
    for doc in documents {
        for keyword in doc.keywords.iter().filter(|k| tracked.contains(*k)) {
            *cells.entry((keyword.as_str(), doc.year)).or_insert(0) += 1;
            *totals.entry(keyword.as_str()).or_insert(0) += 1;
            years.insert(doc.year);
        }
    }
    if totals.is_empty() {
        return KeywordTrajectories::default();
    }

    let years: Vec<i32> = years.into_iter().collect();
    let mut order: Vec<(&str, u64)> = totals.into_iter().collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let counts = order
        .iter()
        .map(|(keyword, _)| {
            let row = years
                .iter()
                .map(|y| cells.get(&(*keyword, *y)).copied().unwrap_or(0))
                .collect();
            (keyword.to_string(), row)
        })
        .collect();

    KeywordTrajectories {
        years,
        keywords: order.into_iter().map(|(k, _)| k.to_string()).collect(),
        counts,
    }
}

/// Most frequent keywords of one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTopics {
    pub period: String,
    pub keywords: Vec<KeywordCount>,
}

/// Top `n` keywords per period, in the given period order.
pub fn trend_topics(
    documents: &[NormalizedDocument],
    periods: &[TimeWindow],
    n: usize,
) -> Vec<PeriodTopics> {
    periods
        .iter()
        .map(|window| PeriodTopics {
            period: window.period(),
            keywords: ranked(documents.iter().filter(|d| window.contains(d.year)), n),
        })
        .collect()
}

/// A keyword whose recent rate outgrows its earlier rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergingKeyword {
    pub keyword: String,
    pub recent_count: u64,
    pub prior_count: u64,
    /// Recent yearly rate over prior yearly rate; `None` when `is_new`
    pub growth: Option<f64>,
    /// Absent before the recent period
    pub is_new: bool,
}

/// Keywords with at least `min_count` documents in the last `recent_years`
/// years, ranked new-first, then by growth, then by name.
///
/// Growth is `(recent / recent_years) / (prior / prior_span)` where the prior
/// span runs from the first year up to the recent cutoff (at least 1 year).
pub fn emerging_keywords(
    documents: &[NormalizedDocument],
    recent_years: u32,
    min_count: u64,
) -> Vec<EmergingKeyword> {
    let (Some(first), Some(last)) = (
        documents.iter().map(|d| d.year).min(),
        documents.iter().map(|d| d.year).max(),
    ) else {
        return Vec::new();
    };
    if recent_years == 0 {
        return Vec::new();
    }
    let recent_span = i64::from(recent_years);
    let cutoff = i64::from(last) - recent_span + 1;
    let prior_span = (cutoff - i64::from(first)).max(1);

    let mut recent: HashMap<&str, u64> = HashMap::new();
    let mut prior: HashMap<&str, u64> = HashMap::new();
    for doc in documents {
        let bucket = if i64::from(doc.year) >= cutoff {
            &mut recent
        } else {
            &mut prior
        };
        for keyword in &doc.keywords {
            *bucket.entry(keyword.as_str()).or_insert(0) += 1;
        }
    }

    let mut out: Vec<EmergingKeyword> = recent
        .into_iter()
        .filter(|(_, count)| *count >= min_count)
        .map(|(keyword, recent_count)| {
            let prior_count = prior.get(keyword).copied().unwrap_or(0);
            let growth = (prior_count > 0).then(|| {
                (recent_count as f64 / recent_span as f64)
                    / (prior_count as f64 / prior_span as f64)
            });
            EmergingKeyword {
                keyword: keyword.to_string(),
                recent_count,
                prior_count,
                growth,
                is_new: prior_count == 0,
            }
        })
        .collect();

    out.sort_by(|a, b| {
        b.is_new
            .cmp(&a.is_new)
            .then_with(|| {
                let ga = a.growth.unwrap_or(0.0);
                let gb = b.growth.unwrap_or(0.0);
                gb.total_cmp(&ga)
            })
            .then_with(|| b.recent_count.cmp(&a.recent_count))
            .then_with(|| a.keyword.cmp(&b.keyword))
    });
    out
}
