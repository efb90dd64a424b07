//! Percent performance, moving averages and comparison normalization.
//!
//! Nothing here fabricates a number: a missing or non-positive baseline, or a
//! window that has not filled yet, yields `None`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::quote::PriceSeries;
use crate::models::window::{PerformanceWindow, WindowKind};

/// Points back from the latest close used as the 5-day baseline.
const FIVE_DAY_LOOKBACK: usize = 6;

/// Technical analysis needs strictly more points than this.
pub const TECHNICAL_MIN_POINTS: usize = 20;

pub const SHORT_MA_PERIOD: usize = 20;
pub const LONG_MA_PERIOD: usize = 50;

/// Percent change from `baseline` to `current`, or `None` when the baseline
/// is not a positive finite number.
pub fn percent_change(current: f64, baseline: f64) -> Option<f64> {
    if !current.is_finite() || !baseline.is_finite() || baseline <= 0.0 {
        return None;
    }
    Some((current - baseline) / baseline * 100.0)
}

/// Baseline close for `window`, or `None` if the series is too short.
pub fn baseline_price(series: &PriceSeries, window: PerformanceWindow) -> Option<f64> {
    let points = series.points();
    if points.len() < window.min_points() {
        return None;
    }
    match window {
        PerformanceWindow::FiveDay if points.len() >= FIVE_DAY_LOOKBACK => {
            Some(points[points.len() - FIVE_DAY_LOOKBACK].close)
        }
        _ => points.first().map(|p| p.close),
    }
}

pub fn compute_performance(current_price: f64, series: &PriceSeries, window: PerformanceWindow) -> Option<f64> {
    let baseline = baseline_price(series, window)?;
    percent_change(current_price, baseline)
}

/// Performance for the window selected in the single-stock view. `Current`
/// and `Range` carry no performance figure.
pub fn stock_performance(
    current_price: f64,
    series: &PriceSeries,
    window: WindowKind,
) -> BTreeMap<PerformanceWindow, f64> {
    let mut performance = BTreeMap::new();
    if let Some(pw) = window.performance_window() {
        if let Some(value) = compute_performance(current_price, series, pw) {
            performance.insert(pw, value);
        }
    }
    performance
}

/// Trailing simple moving average of `closes` over `n` points.
///
/// `n` is capped to `closes.len()`; positions before the window is full are
/// `None`.
pub fn moving_average(closes: &[f64], n: usize) -> Vec<Option<f64>> {
    let window = n.min(closes.len());
    if window == 0 {
        return vec![None; closes.len()];
    }

    let mut out = Vec::with_capacity(closes.len());
    let mut sum = 0.0;
    for (i, close) in closes.iter().enumerate() {
        sum += close;
        if i >= window {
            sum -= closes[i - window];
        }
        if i + 1 >= window {
            out.push(Some(sum / window as f64));
        } else {
            out.push(None);
        }
    }
    out
}

pub fn latest_moving_average(closes: &[f64], n: usize) -> Option<f64> {
    let window = n.min(closes.len());
    if window == 0 {
        return None;
    }
    let tail = &closes[closes.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TechnicalAnalysis {
    Ready {
        ma20: Vec<Option<f64>>,
        ma50: Vec<Option<f64>>,
    },
    InsufficientData {
        points: usize,
        required: usize,
    },
}

impl TechnicalAnalysis {
    pub fn is_ready(&self) -> bool {
        matches!(self, TechnicalAnalysis::Ready { .. })
    }

    pub fn latest_ma20(&self) -> Option<f64> {
        match self {
            TechnicalAnalysis::Ready { ma20, .. } => ma20.last().copied().flatten(),
            TechnicalAnalysis::InsufficientData { .. } => None,
        }
    }

    pub fn latest_ma50(&self) -> Option<f64> {
        match self {
            TechnicalAnalysis::Ready { ma50, .. } => ma50.last().copied().flatten(),
            TechnicalAnalysis::InsufficientData { .. } => None,
        }
    }
}

pub fn technical_analysis(series: &PriceSeries) -> TechnicalAnalysis {
    if series.len() <= TECHNICAL_MIN_POINTS {
        return TechnicalAnalysis::InsufficientData {
            points: series.len(),
            required: TECHNICAL_MIN_POINTS + 1,
        };
    }
    let closes = series.closes();
    TechnicalAnalysis::Ready {
        ma20: moving_average(&closes, SHORT_MA_PERIOD),
        ma50: moving_average(&closes, LONG_MA_PERIOD),
    }
}

/// Each close as a percent change from the first close, for overlaying two
/// series on one chart.
pub fn normalize(series: &PriceSeries) -> Option<Vec<(i64, f64)>> {
    let base = series.first()?.close;
    if !base.is_finite() || base <= 0.0 {
        return None;
    }
    Some(
        series
            .points()
            .iter()
            .map(|p| (p.timestamp, (p.close / base - 1.0) * 100.0))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quote::PricePoint;

    fn series(closes: &[f64]) -> PriceSeries {
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PricePoint::new(i as i64 * 86_400, *c))
            .collect();
        PriceSeries::new("TEST", points)
    }

    #[test]
    fn test_performance_formula() {
        let s = series(&[80.0, 85.0, 90.0]);
        let expected = (100.0 - 80.0) / 80.0 * 100.0;
        assert_eq!(compute_performance(100.0, &s, PerformanceWindow::ThirtyDay), Some(expected));
        assert_eq!(compute_performance(100.0, &s, PerformanceWindow::YearToDate), Some(expected));
        assert_eq!(compute_performance(100.0, &s, PerformanceWindow::TrailingTwelveMonths), Some(expected));
    }

    #[test]
    fn test_five_day_with_six_points_uses_first() {
        let s = series(&[50.0, 51.0, 52.0, 53.0, 54.0, 55.0]);
        let expected = (60.0 - 50.0) / 50.0 * 100.0;
        assert_eq!(compute_performance(60.0, &s, PerformanceWindow::FiveDay), Some(expected));
    }

    #[test]
    fn test_five_day_with_more_points_uses_sixth_from_last() {
        let s = series(&[10.0, 20.0, 50.0, 51.0, 52.0, 53.0, 54.0, 55.0]);
        assert_eq!(baseline_price(&s, PerformanceWindow::FiveDay), Some(50.0));
    }

    #[test]
    fn test_five_day_with_three_points_uses_earliest() {
        let s = series(&[40.0, 41.0, 42.0]);
        let expected = (44.0 - 40.0) / 40.0 * 100.0;
        assert_eq!(compute_performance(44.0, &s, PerformanceWindow::FiveDay), Some(expected));
    }

    #[test]
    fn test_five_day_with_single_point_is_absent() {
        let s = series(&[40.0]);
        assert_eq!(compute_performance(44.0, &s, PerformanceWindow::FiveDay), None);
    }

    #[test]
    fn test_empty_series_is_absent() {
        let s = series(&[]);
        for window in PerformanceWindow::ALL {
            assert_eq!(compute_performance(10.0, &s, window), None);
        }
    }

    #[test]
    fn test_non_positive_baseline_is_absent() {
        assert_eq!(compute_performance(10.0, &series(&[0.0, 5.0]), PerformanceWindow::ThirtyDay), None);
        assert_eq!(compute_performance(10.0, &series(&[-3.0, 5.0]), PerformanceWindow::ThirtyDay), None);
    }

    #[test]
    fn test_non_finite_current_is_absent() {
        assert_eq!(compute_performance(f64::NAN, &series(&[5.0]), PerformanceWindow::ThirtyDay), None);
    }

    #[test]
    fn test_stock_performance_only_for_selected_window() {
        let s = series(&[100.0, 110.0]);
        let perf = stock_performance(120.0, &s, WindowKind::ThirtyDay);
        assert_eq!(perf.len(), 1);
        assert_eq!(perf.get(&PerformanceWindow::ThirtyDay), Some(&((120.0 - 100.0) / 100.0 * 100.0)));

        assert!(stock_performance(120.0, &s, WindowKind::Current).is_empty());
        assert!(stock_performance(120.0, &s, WindowKind::Range).is_empty());
    }

    #[test]
    fn test_moving_average_trailing() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(ma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_moving_average_capped_to_series_length() {
        let closes: Vec<f64> = (1..=15).map(|v| v as f64).collect();
        let ma = moving_average(&closes, 20);
        assert_eq!(ma.len(), 15);
        assert!(ma[..14].iter().all(|v| v.is_none()));
        assert_eq!(ma[14], Some(8.0));
        assert_eq!(latest_moving_average(&closes, 20), Some(8.0));
    }

    #[test]
    fn test_moving_average_zero_window() {
        assert_eq!(moving_average(&[1.0, 2.0], 0), vec![None, None]);
        assert_eq!(latest_moving_average(&[1.0, 2.0], 0), None);
        assert_eq!(latest_moving_average(&[], 5), None);
    }

    #[test]
    fn test_technical_analysis_needs_more_than_twenty_points() {
        let twenty: Vec<f64> = (0..20).map(|v| v as f64 + 1.0).collect();
        assert_eq!(
            technical_analysis(&series(&twenty)),
            TechnicalAnalysis::InsufficientData { points: 20, required: 21 }
        );

        let thirty: Vec<f64> = (0..30).map(|v| v as f64 + 1.0).collect();
        let ta = technical_analysis(&series(&thirty));
        assert!(ta.is_ready());
        // 50-period average is capped at 30 points: mean of 1..=30.
        assert_eq!(ta.latest_ma50(), Some(15.5));
        // mean of 11..=30
        assert_eq!(ta.latest_ma20(), Some(20.5));
    }

    #[test]
    fn test_normalize() {
        let s = series(&[50.0, 55.0, 45.0]);
        let norm = normalize(&s).unwrap();
        let values: Vec<f64> = norm.iter().map(|(_, v)| *v).collect();
        assert_eq!(values[0], 0.0);
        assert!((values[1] - 10.0).abs() < 1e-9);
        assert!((values[2] + 10.0).abs() < 1e-9);
        assert_eq!(normalize(&series(&[])), None);
        assert_eq!(normalize(&series(&[0.0, 1.0])), None);
    }
}
