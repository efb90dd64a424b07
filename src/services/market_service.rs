use crate::config::Config;
use crate::errors::{DashboardError, Result};
use crate::metrics::{self, TechnicalAnalysis};
use crate::models::portfolio::Portfolio;
use crate::models::quote::{PriceSeries, Quote};
use crate::models::window::{PerformanceWindow, Period, WindowKind};
use crate::providers::base::QuoteProvider;
use crate::services::cache::TtlCache;
use crate::util;
use futures::stream::{self, StreamExt};
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const MAX_NAME_LEN: usize = 30;

/// Everything the single-stock view shows
#[derive(Debug, Clone, Serialize)]
pub struct StockView {
    pub quote: Quote,
    pub series: PriceSeries,
    pub window: WindowKind,
    pub performance: BTreeMap<PerformanceWindow, f64>,
    pub technical: TechnicalAnalysis,
}

/// One line of the portfolio table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRow {
    pub sector: String,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub perf_5d: Option<f64>,
    pub perf_30d: Option<f64>,
    pub perf_ytd: Option<f64>,
    pub perf_ltm: Option<f64>,
    pub volume: Option<u64>,
    pub pe_ratio: Option<f64>,
    pub beta: Option<f64>,
    pub market_cap: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
    pub currency: Option<String>,
}

impl PortfolioRow {
    pub fn performance(&self, window: PerformanceWindow) -> Option<f64> {
        match window {
            PerformanceWindow::FiveDay => self.perf_5d,
            PerformanceWindow::ThirtyDay => self.perf_30d,
            PerformanceWindow::YearToDate => self.perf_ytd,
            PerformanceWindow::TrailingTwelveMonths => self.perf_ltm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub total: usize,
    pub advancing: usize,
    pub declining: usize,
    pub average_change_percent: Option<f64>,
}

/// Result of a portfolio batch: rows that loaded plus per-symbol failures.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub rows: Vec<PortfolioRow>,
    pub failures: Vec<(String, DashboardError)>,
}

impl BatchReport {
    pub fn summary(&self) -> PortfolioSummary {
        summarize(&self.rows)
    }

    pub fn rows_in_sector(&self, sector: &str) -> Vec<PortfolioRow> {
        self.rows
            .iter()
            .filter(|row| row.sector.eq_ignore_ascii_case(sector))
            .cloned()
            .collect()
    }
}

pub fn summarize(rows: &[PortfolioRow]) -> PortfolioSummary {
    let changes: Vec<f64> = rows.iter().filter_map(|r| r.change_percent).collect();
    let average_change_percent = if changes.is_empty() {
        None
    } else {
        Some(changes.iter().sum::<f64>() / changes.len() as f64)
    };

    PortfolioSummary {
        total: rows.len(),
        advancing: changes.iter().filter(|c| **c > 0.0).count(),
        declining: changes.iter().filter(|c| **c < 0.0).count(),
        average_change_percent,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSide {
    pub quote: Quote,
    pub normalized: Vec<(i64, f64)>,
}

impl ComparisonSide {
    /// Percent change over the whole period.
    pub fn performance(&self) -> f64 {
        self.normalized.last().map(|(_, v)| *v).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub period: Period,
    pub first: ComparisonSide,
    pub second: ComparisonSide,
}

impl Comparison {
    /// Symbol with the better period performance; `None` on a tie.
    pub fn leader(&self) -> Option<&str> {
        let (a, b) = (self.first.performance(), self.second.performance());
        if a > b {
            Some(&self.first.quote.symbol)
        } else if b > a {
            Some(&self.second.quote.symbol)
        } else {
            None
        }
    }
}

/// Fetches quotes and histories through a provider and derives the views
pub struct MarketService {
    config: Config,
    provider: Arc<dyn QuoteProvider + Send + Sync>,
    quotes: TtlCache<String, Quote>,
    histories: TtlCache<(String, Period), PriceSeries>,
}

impl MarketService {
    pub fn new(config: Config, provider: Arc<dyn QuoteProvider + Send + Sync>) -> Self {
        let quotes = TtlCache::new(config.cache_ttl);
        let histories = TtlCache::new(config.cache_ttl);
        Self {
            config,
            provider,
            quotes,
            histories,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn quote(&self, symbol: &str) -> Result<Quote> {
        let provider = Arc::clone(&self.provider);
        self.quotes
            .get_or_fetch(symbol.to_string(), || async move { provider.fetch_quote(symbol).await })
            .await
            .map_err(|e| e.for_symbol(symbol))
    }

    async fn history(&self, symbol: &str, period: Period) -> Result<PriceSeries> {
        let provider = Arc::clone(&self.provider);
        self.histories
            .get_or_fetch((symbol.to_string(), period), || async move {
                provider.fetch_history(symbol, period).await
            })
            .await
            .map_err(|e| e.for_symbol(symbol))
    }

    /// Current quote plus the close series for `window`.
    pub async fn fetch(&self, symbol: &str, window: WindowKind) -> Result<(Quote, PriceSeries)> {
        let symbol = util::validate_symbol(symbol)?;
        let quote = self.quote(&symbol).await?;
        let series = self.history(&symbol, window.period()).await?;
        Ok((quote, series))
    }

    pub async fn stock_view(&self, symbol: &str, window: WindowKind) -> Result<StockView> {
        let (quote, series) = self.fetch(symbol, window).await?;
        info!(
            "Loaded {} ({}) via {}: {} points",
            quote.symbol,
            window,
            self.provider.provider_name(),
            series.len()
        );

        let performance = metrics::stock_performance(quote.price, &series, window);
        let technical = metrics::technical_analysis(&series);

        Ok(StockView {
            quote,
            series,
            window,
            performance,
            technical,
        })
    }

    /// Builds one table row. A failed history leaves that window's
    /// performance empty; only a failed quote fails the row.
    pub async fn portfolio_row(&self, sector: &str, symbol: &str) -> Result<PortfolioRow> {
        let symbol = util::validate_symbol(symbol)?;
        let quote = self.quote(&symbol).await?;

        let mut perf = BTreeMap::new();
        for window in PerformanceWindow::ALL {
            match self.history(&symbol, window.period()).await {
                Ok(series) => {
                    if let Some(value) = metrics::compute_performance(quote.price, &series, window) {
                        perf.insert(window, value);
                    }
                }
                Err(e) => warn!("{} {} history unavailable: {}", symbol, window, e),
            }
        }

        Ok(PortfolioRow {
            sector: sector.to_string(),
            symbol: quote.symbol.clone(),
            name: truncate_name(&quote.name),
            price: quote.price,
            change: quote.change,
            change_percent: quote.change_percent,
            perf_5d: perf.get(&PerformanceWindow::FiveDay).copied(),
            perf_30d: perf.get(&PerformanceWindow::ThirtyDay).copied(),
            perf_ytd: perf.get(&PerformanceWindow::YearToDate).copied(),
            perf_ltm: perf.get(&PerformanceWindow::TrailingTwelveMonths).copied(),
            volume: quote.volume,
            pe_ratio: quote.pe_ratio,
            beta: quote.beta,
            market_cap: quote.market_cap,
            week52_high: quote.week52_high,
            week52_low: quote.week52_low,
            currency: quote.currency,
        })
    }

    /// Loads every ticker of `portfolio`, at most `max_concurrent_fetches`
    /// at a time. Rows keep portfolio order; failed tickers are reported
    /// in `failures` and left out of `rows`.
    pub async fn fetch_portfolio(&self, portfolio: &Portfolio) -> BatchReport {
        let entries = portfolio.entries();
        info!(
            "Fetching {} tickers ({} at a time)",
            entries.len(),
            self.config.max_concurrent_fetches
        );

        let results: Vec<(String, Result<PortfolioRow>)> = stream::iter(entries)
            .map(|(sector, symbol)| async move {
                let row = self.portfolio_row(&sector, &symbol).await;
                (symbol, row)
            })
            .buffered(self.config.max_concurrent_fetches)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for (symbol, result) in results {
            match result {
                Ok(row) => report.rows.push(row),
                Err(e) => {
                    warn!("Skipping {}: {}", symbol, e);
                    report.failures.push((symbol, e));
                }
            }
        }

        info!(
            "Portfolio loaded: {} rows, {} failures",
            report.rows.len(),
            report.failures.len()
        );
        report
    }

    /// Side-by-side comparison of two different symbols over `period`.
    pub async fn compare(&self, first: &str, second: &str, period: Period) -> Result<Comparison> {
        let first = util::validate_symbol(first)?;
        let second = util::validate_symbol(second)?;
        if first == second {
            return Err(DashboardError::InvalidComparison(first));
        }

        let first = self.comparison_side(&first, period).await?;
        let second = self.comparison_side(&second, period).await?;

        Ok(Comparison {
            period,
            first,
            second,
        })
    }

    async fn comparison_side(&self, symbol: &str, period: Period) -> Result<ComparisonSide> {
        let quote = self.quote(symbol).await?;
        let series = self.history(symbol, period).await?;
        let normalized = metrics::normalize(&series)
            .ok_or_else(|| DashboardError::InsufficientData(symbol.to_string()))?;
        Ok(ComparisonSide { quote, normalized })
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > MAX_NAME_LEN {
        let head: String = name.chars().take(MAX_NAME_LEN).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, change_percent: Option<f64>) -> PortfolioRow {
        PortfolioRow {
            sector: "Technology".to_string(),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            price: 10.0,
            change: None,
            change_percent,
            perf_5d: None,
            perf_30d: None,
            perf_ytd: None,
            perf_ltm: None,
            volume: None,
            pe_ratio: None,
            beta: None,
            market_cap: None,
            week52_high: None,
            week52_low: None,
            currency: None,
        }
    }

    #[test]
    fn test_truncate_name() {
        assert_eq!(truncate_name("Apple Inc."), "Apple Inc.");
        let long = "Petróleo Brasileiro S.A. - Petrobras";
        let truncated = truncate_name(long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), MAX_NAME_LEN + 3);
    }

    #[test]
    fn test_summary_counts() {
        let rows = vec![
            row("A", Some(2.0)),
            row("B", Some(-1.0)),
            row("C", Some(0.0)),
            row("D", None),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.advancing, 1);
        assert_eq!(summary.declining, 1);
        assert_eq!(summary.average_change_percent, Some(1.0 / 3.0));
    }

    #[test]
    fn test_summary_without_changes() {
        let summary = summarize(&[row("A", None)]);
        assert_eq!(summary.average_change_percent, None);
    }
}
