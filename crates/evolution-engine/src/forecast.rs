//! Per-keyword linear trend forecasting.
//!
//! Each keyword's yearly counts are fitted with a degree-1 least-squares
//! line, optionally weighting recent years more (residual weights rise
//! linearly from 0.5 to 1.5, so the latest year counts 3x the earliest).
//! Forecast rows extrapolate the line `horizon` years past the last observed
//! year, clipped at zero, with a band of
//! `1.96 * se * sqrt(1 + distance / max_distance)` around each prediction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use evolution_types::{ForecastSettings, KeywordObservation};

use crate::error::EngineError;

/// z-value of a two-sided 95% interval.
const Z_95: f64 = 1.96;

/// Yearly counts per keyword.
pub type YearlyCounts = BTreeMap<String, BTreeMap<i32, u64>>;

/// Sum duplicate (keyword, year) rows.
pub fn aggregate_observations(observations: &[KeywordObservation]) -> YearlyCounts {
    let mut out: YearlyCounts = BTreeMap::new();
    for obs in observations {
        *out.entry(obs.keyword.clone())
            .or_default()
            .entry(obs.year)
            .or_insert(0) += obs.count;
    }
    out
}

/// One year of a forecast series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub year: i32,
    /// Observed count; `None` on forecast rows
    pub observed: Option<f64>,
    pub predicted: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub is_forecast: bool,
}

impl ForecastRow {
    pub fn ci_width(&self) -> f64 {
        self.ci_upper - self.ci_lower
    }
}

/// Fitted trend plus history and forecast rows, in year order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub keyword: String,
    pub slope: f64,
    pub intercept: f64,
    pub residual_se: f64,
    /// Mean of the observed years
    pub mean_year: f64,
    pub rows: Vec<ForecastRow>,
}

impl ForecastSeries {
    /// In-sample rows.
    pub fn history(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|r| !r.is_forecast)
    }

    /// Extrapolated rows.
    pub fn forecast_rows(&self) -> impl Iterator<Item = &ForecastRow> {
        self.rows.iter().filter(|r| r.is_forecast)
    }

    /// `(year, predicted)` for the plotted forecast line: the last history
    /// point followed by every forecast point.
    pub fn forecast_line(&self) -> Vec<(i32, f64)> {
        self.history()
            .last()
            .into_iter()
            .chain(self.forecast_rows())
            .map(|r| (r.year, r.predicted))
            .collect()
    }

    pub fn row(&self, year: i32) -> Option<&ForecastRow> {
        self.rows.iter().find(|r| r.year == year)
    }

    pub fn last_observed_year(&self) -> Option<i32> {
        self.history().last().map(|r| r.year)
    }
}

/// Why a keyword was not forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecastSkip {
    NoObservations,
    BelowMinimumAverage { average: f64 },
    TooFewYears { years: usize },
}

/// A target that produced no series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedKeyword {
    pub keyword: String,
    pub reason: ForecastSkip,
}

/// Result for a single keyword.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Series(ForecastSeries),
    Skipped(ForecastSkip),
}

/// Results for a set of targets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastReport {
    pub series: BTreeMap<String, ForecastSeries>,
    pub skipped: Vec<SkippedKeyword>,
}

/// Fits and extrapolates keyword trends.
#[derive(Debug, Clone)]
pub struct TrendForecaster {
    settings: ForecastSettings,
}

impl TrendForecaster {
    pub fn new(settings: ForecastSettings) -> Result<Self, EngineError> {
        if settings.horizon == 0 {
            return Err(EngineError::InvalidConfig(
                "forecast horizon must be at least 1 year".to_string(),
            ));
        }
        if settings.min_years < 2 {
            return Err(EngineError::InvalidConfig(format!(
                "forecast min_years must be at least 2, got {}",
                settings.min_years
            )));
        }
        if !settings.min_yearly_avg.is_finite() || settings.min_yearly_avg < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "forecast min_yearly_avg must be a non-negative number, got {}",
                settings.min_yearly_avg
            )));
        }
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Forecast each target from raw observations.
    #[instrument(skip(self, observations, targets), fields(targets = targets.len()))]
    pub fn forecast(
        &self,
        observations: &[KeywordObservation],
        targets: &[String],
    ) -> ForecastReport {
        let counts = aggregate_observations(observations);
        let mut report = ForecastReport::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for keyword in targets {
            if !seen.insert(keyword.as_str()) {
                continue;
            }
            match self.forecast_keyword(keyword, counts.get(keyword)) {
                ForecastOutcome::Series(series) => {
                    report.series.insert(keyword.clone(), series);
                }
                ForecastOutcome::Skipped(reason) => {
                    debug!(keyword = %keyword, reason = ?reason, "Skipping forecast");
                    report.skipped.push(SkippedKeyword {
                        keyword: keyword.clone(),
                        reason,
                    });
                }
            }
        }
        info!(
            forecast = report.series.len(),
            skipped = report.skipped.len(),
            horizon = self.settings.horizon,
            "Forecasts computed"
        );
        report
    }

    /// Forecast one keyword from its yearly counts.
    pub fn forecast_keyword(
        &self,
        keyword: &str,
        yearly: Option<&BTreeMap<i32, u64>>,
    ) -> ForecastOutcome {
        let points: Vec<(i32, f64)> = yearly
            .into_iter()
            .flatten()
            .filter(|(year, _)| self.settings.max_year.map_or(true, |max| **year <= max))
            .map(|(year, count)| (*year, *count as f64))
            .collect();

        if points.is_empty() {
            return ForecastOutcome::Skipped(ForecastSkip::NoObservations);
        }
        let average = points.iter().map(|(_, c)| c).sum::<f64>() / points.len() as f64;
        if average < self.settings.min_yearly_avg {
            return ForecastOutcome::Skipped(ForecastSkip::BelowMinimumAverage { average });
        }
        if points.len() < self.settings.min_years {
            return ForecastOutcome::Skipped(ForecastSkip::TooFewYears {
                years: points.len(),
            });
        }

        ForecastOutcome::Series(self.fit(keyword, &points))
    }

    fn fit(&self, keyword: &str, points: &[(i32, f64)]) -> ForecastSeries {
        let n = points.len();
        let weights: Vec<f64> = if self.settings.weighted {
            (0..n)
                .map(|i| {
                    let w = 0.5 + i as f64 / (n - 1).max(1) as f64;
                    w * w
                })
                .collect()
        } else {
            vec![1.0; n]
        };

        let total: f64 = weights.iter().sum();
        let x_bar = points
            .iter()
            .zip(&weights)
            .map(|((x, _), w)| w * f64::from(*x))
            .sum::<f64>()
            / total;
        let y_bar = points
            .iter()
            .zip(&weights)
            .map(|((_, y), w)| w * y)
            .sum::<f64>()
            / total;
        let (sxy, sxx) = points
            .iter()
            .zip(&weights)
            .fold((0.0, 0.0), |(sxy, sxx), ((x, y), w)| {
                let dx = f64::from(*x) - x_bar;
                (sxy + w * dx * (y - y_bar), sxx + w * dx * dx)
            });
        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        let line = |year: i32| y_bar + slope * (f64::from(year) - x_bar);

        let sse: f64 = points.iter().map(|(x, y)| (y - line(*x)).powi(2)).sum();
        let residual_se = (sse / n.saturating_sub(2).max(1) as f64).sqrt();

        let last = points[n - 1].0;
        let horizon = i32::try_from(self.settings.horizon).unwrap_or(i32::MAX);
        let future: Vec<i32> = (1..=horizon).filter_map(|h| last.checked_add(h)).collect();

        let mean_year = points.iter().map(|(x, _)| f64::from(*x)).sum::<f64>() / n as f64;
        let max_distance = points
            .iter()
            .map(|(x, _)| *x)
            .chain(future.iter().copied())
            .map(|x| (f64::from(x) - mean_year).abs())
            .fold(1.0_f64, f64::max);

        let row = |year: i32, observed: Option<f64>| {
            let predicted = line(year).max(0.0);
            let distance = (f64::from(year) - mean_year).abs();
            let half_width = Z_95 * residual_se * (1.0 + distance / max_distance).sqrt();
            ForecastRow {
                year,
                observed,
                predicted,
                ci_lower: (predicted - half_width).max(0.0),
                ci_upper: predicted + half_width,
                is_forecast: observed.is_none(),
            }
        };

        let rows = points
            .iter()
            .map(|(x, y)| row(*x, Some(*y)))
            .chain(future.iter().map(|x| row(*x, None)))
            .collect();

        ForecastSeries {
            keyword: keyword.to_string(),
            slope,
            intercept: y_bar - slope * x_bar,
            residual_se,
            mean_year,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn forecaster(horizon: u32, min_avg: f64, weighted: bool) -> TrendForecaster {
        TrendForecaster::new(ForecastSettings {
            horizon,
            min_yearly_avg: min_avg,
            weighted,
            ..ForecastSettings::default()
        })
        .unwrap()
    }

    fn observations(keyword: &str, counts: &[(i32, u64)]) -> Vec<KeywordObservation> {
        counts
            .iter()
            .map(|(y, c)| KeywordObservation::new(keyword, *y, *c))
            .collect()
    }

    fn series(f: &TrendForecaster, counts: &[(i32, u64)]) -> ForecastSeries {
        let report = f.forecast(&observations("kw", counts), &["kw".to_string()]);
        report.series["kw"].clone()
    }

    #[test]
    fn test_upward_scenario() {
        let s = series(&forecaster(2, 5.0, true), &[(2018, 10), (2019, 20), (2020, 30)]);
        let future: Vec<&ForecastRow> = s.forecast_rows().collect();

        assert_eq!(future.len(), 2);
        assert_eq!(future[0].year, 2021);
        assert_eq!(future[1].year, 2022);
        assert!(future.iter().all(|r| r.predicted >= 30.0));
        assert!(future.iter().all(|r| r.observed.is_none()));
        assert!(s.rows.iter().all(|r| r.predicted >= 0.0 && r.ci_lower >= 0.0));
        assert!((future[0].predicted - 40.0).abs() < 1e-6);
        assert!((s.slope - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_carries_observed_and_fit() {
        let s = series(&forecaster(1, 0.0, false), &[(2000, 1), (2001, 3), (2002, 2)]);
        let history: Vec<&ForecastRow> = s.history().collect();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].observed, Some(3.0));
        assert!(!history[1].is_forecast);
        assert!((history[1].predicted - 2.0).abs() < EPS);
    }

    #[test]
    fn test_constant_counts() {
        let s = series(
            &forecaster(3, 1.0, true),
            &[(2010, 7), (2011, 7), (2012, 7), (2013, 7)],
        );
        for row in &s.rows {
            assert!((row.predicted - 7.0).abs() < 1e-9);
        }
        assert!(s.residual_se.abs() < 1e-9);
        let min_width = s.rows.iter().map(ForecastRow::ci_width).fold(f64::MAX, f64::min);
        assert!(s.rows.iter().all(|r| r.ci_width() >= min_width));
    }

    #[test]
    fn test_interval_grows_with_distance() {
        let s = series(
            &forecaster(4, 1.0, true),
            &[(2010, 4), (2011, 6), (2012, 5), (2013, 7), (2014, 6), (2015, 8)],
        );
        assert!(s.residual_se > 0.0);

        let mut rows: Vec<&ForecastRow> = s.rows.iter().collect();
        rows.sort_by(|a, b| {
            let da = (f64::from(a.year) - s.mean_year).abs();
            let db = (f64::from(b.year) - s.mean_year).abs();
            da.total_cmp(&db)
        });
        // unclipped half-widths are monotone in distance
        let half = |r: &ForecastRow| r.ci_upper - r.predicted;
        for pair in rows.windows(2) {
            assert!(half(pair[1]) + 1e-12 >= half(pair[0]));
        }
        let last = s.rows.last().unwrap();
        let closest = rows[0];
        assert!(half(last) > half(closest));
    }

    #[test]
    fn test_increasing_counts_non_decreasing_forecast() {
        let s = series(
            &forecaster(5, 0.1, true),
            &[(2000, 1), (2001, 3), (2002, 4), (2003, 8), (2004, 9)],
        );
        let predicted: Vec<f64> = s.rows.iter().map(|r| r.predicted).collect();
        for pair in predicted.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(s.slope > 0.0);
    }

    #[test]
    fn test_join_is_continuous() {
        let s = series(
            &forecaster(3, 0.1, true),
            &[(2000, 2), (2001, 5), (2002, 4), (2003, 9)],
        );
        let last_history = s.history().last().unwrap().clone();
        let line = s.forecast_line();

        assert_eq!(line[0].0, last_history.year);
        assert!((line[0].1 - last_history.predicted).abs() < EPS);
        // the step across the boundary equals the slope
        assert!((line[1].1 - line[0].1 - s.slope).abs() < 1e-9);
        assert_eq!(line.len(), 4);
    }

    #[test]
    fn test_downward_trend_clipped_at_zero() {
        let s = series(&forecaster(10, 0.1, false), &[(2000, 9), (2001, 6), (2002, 3)]);
        for row in s.forecast_rows() {
            assert!(row.predicted >= 0.0);
            assert!(row.ci_lower >= 0.0);
        }
        assert_eq!(s.row(2005).unwrap().predicted, 0.0);
    }

    #[test]
    fn test_weighting_favors_recent_years() {
        let counts = [(2000, 10), (2001, 10), (2002, 10), (2003, 20)];
        let weighted = series(&forecaster(1, 0.1, true), &counts);
        let plain = series(&forecaster(1, 0.1, false), &counts);
        assert!((plain.slope - 3.0).abs() < 1e-9);
        assert!((weighted.slope - 4.672221204907526).abs() < 1e-6);
    }

    #[test]
    fn test_skips() {
        let f = forecaster(2, 5.0, true);
        let mut obs = observations("rare", &[(2000, 1), (2001, 2), (2002, 1)]);
        obs.extend(observations("short", &[(2000, 50), (2001, 60)]));
        let targets: Vec<String> = ["rare", "short", "missing"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = f.forecast(&obs, &targets);

        assert!(report.series.is_empty());
        assert_eq!(report.skipped.len(), 3);
        assert!(matches!(
            report.skipped[0].reason,
            ForecastSkip::BelowMinimumAverage { .. }
        ));
        assert_eq!(report.skipped[1].reason, ForecastSkip::TooFewYears { years: 2 });
        assert_eq!(report.skipped[2].reason, ForecastSkip::NoObservations);
    }

    #[test]
    fn test_repeated_targets_reported_once() {
        let f = forecaster(2, 0.0, true);
        let obs = observations("kw", &[(2000, 1), (2001, 2), (2002, 3)]);
        let targets: Vec<String> = ["zz", "kw", "zz", "kw"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let report = f.forecast(&obs, &targets);

        assert_eq!(report.series.len(), 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].keyword, "zz");
        assert_eq!(report.skipped[0].reason, ForecastSkip::NoObservations);
    }

    #[test]
    fn test_aggregate_sums_duplicates() {
        let obs = vec![
            KeywordObservation::new("aa", 2000, 2),
            KeywordObservation::new("aa", 2000, 3),
            KeywordObservation::new("aa", 2001, 1),
            KeywordObservation::new("bb", 2000, 4),
        ];
        let counts = aggregate_observations(&obs);
        assert_eq!(counts["aa"][&2000], 5);
        assert_eq!(counts["aa"][&2001], 1);
        assert_eq!(counts["bb"].len(), 1);
    }

    #[test]
    fn test_max_year_excludes_trailing_years() {
        let f = TrendForecaster::new(ForecastSettings {
            horizon: 1,
            min_yearly_avg: 0.0,
            max_year: Some(2002),
            ..ForecastSettings::default()
        })
        .unwrap();
        let report = f.forecast(
            &observations("kw", &[(2000, 1), (2001, 2), (2002, 3), (2003, 0)]),
            &["kw".to_string()],
        );
        let s = &report.series["kw"];
        assert_eq!(s.last_observed_year(), Some(2002));
        assert_eq!(s.forecast_rows().next().unwrap().year, 2003);
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let err = TrendForecaster::new(ForecastSettings {
            horizon: 0,
            ..ForecastSettings::default()
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }
}
