use crate::config::Config;
use crate::errors::{DashboardError, Result};
use crate::models::quote::{PriceSeries, Quote};
use crate::models::window::Period;
use crate::providers::base::QuoteProvider;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::USER_AGENT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const NOT_FOUND_CODE: &str = "Not Found";
const SUMMARY_MODULES: &str = "price,summaryDetail,defaultKeyStatistics";
const CRUMB_PATH: &str = "/v1/test/getcrumb";

/// Yahoo Finance chart + quoteSummary client
pub struct YahooProvider {
    client: Client,
    base_url: String,
    cookie_url: String,
    user_agent: String,
    min_request_interval: Duration,
    last_request: Mutex<Option<Instant>>,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .cookie_store(true)
            .build()
            .map_err(DashboardError::RequestError)?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            cookie_url: config.cookie_url.clone(),
            user_agent: config.user_agent.clone(),
            min_request_interval: config.min_request_interval,
            last_request: Mutex::new(None),
            crumb: Mutex::new(None),
        })
    }

    /// Spaces consecutive requests by at least `min_request_interval`.
    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(time) = *last {
            let elapsed = time.elapsed();
            if elapsed < self.min_request_interval {
                let wait = self.min_request_interval - elapsed;
                debug!("Waiting {:?} before next Yahoo request", wait);
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<(StatusCode, String)> {
        self.wait_for_rate_limit().await;

        let response = self
            .client
            .get(url)
            .query(query)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Session crumb for quoteSummary. The cached crumb is reused unless it
    /// equals `rejected`, in which case a new cookie and crumb are fetched.
    async fn session_crumb(&self, rejected: Option<&str>) -> Result<String> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            if Some(crumb.as_str()) != rejected {
                return Ok(crumb.clone());
            }
        }

        // Only the Set-Cookie header matters; the status is usually 404.
        if let Err(e) = self.get_text(&self.cookie_url, &[]).await {
            warn!("Cookie request to {} failed: {}", self.cookie_url, e);
        }

        let url = format!("{}{}", self.base_url, CRUMB_PATH);
        let (status, text) = self.get_text(&url, &[]).await?;
        if !status.is_success() {
            return Err(DashboardError::ProviderError(format!(
                "Crumb request failed: HTTP status {}",
                status
            )));
        }

        let crumb = parse_crumb(&text)
            .ok_or_else(|| DashboardError::ProviderError("Crumb response was not a crumb".to_string()))?;
        debug!("Obtained Yahoo crumb");
        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn fetch_chart(&self, symbol: &str, period: Period) -> Result<ChartResult> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("GET {} range={}", url, period);

        let (status, text) = self
            .get_text(&url, &[("range", period.as_str()), ("interval", "1d")])
            .await?;

        if status == StatusCode::NOT_FOUND {
            return Err(DashboardError::NotFound(symbol.to_string()));
        }
        if !status.is_success() {
            return Err(DashboardError::ProviderError(format!(
                "Chart request for {} failed: HTTP status {}",
                symbol, status
            )));
        }

        parse_chart(symbol, &text)
    }

    async fn fetch_summary(&self, symbol: &str) -> Result<SummaryResult> {
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url, symbol);

        let crumb = self.session_crumb(None).await?;
        let (mut status, mut text) = self
            .get_text(&url, &[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
            .await?;

        // An expired session answers 401; retry once with a fresh crumb.
        if status == StatusCode::UNAUTHORIZED {
            debug!("Crumb rejected for {}, refreshing", symbol);
            let crumb = self.session_crumb(Some(crumb.as_str())).await?;
            (status, text) = self
                .get_text(&url, &[("modules", SUMMARY_MODULES), ("crumb", crumb.as_str())])
                .await?;
        }

        if !status.is_success() {
            return Err(DashboardError::ProviderError(format!(
                "Summary request for {} failed: HTTP status {}",
                symbol, status
            )));
        }

        parse_summary(symbol, &text)
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let chart = self.fetch_chart(symbol, Period::OneDay).await?;
        let mut quote = quote_from_meta(symbol, &chart.meta)?;

        // Fundamentals are optional; the quote stands without them.
        match self.fetch_summary(symbol).await {
            Ok(summary) => apply_summary(&mut quote, &summary),
            Err(e) => warn!("No fundamentals for {}: {}", symbol, e),
        }

        Ok(quote)
    }

    async fn fetch_history(&self, symbol: &str, period: Period) -> Result<PriceSeries> {
        match self.fetch_chart(symbol, period).await {
            Ok(chart) => {
                let series = series_from_chart(symbol, &chart);
                debug!("{} {}: {} points", symbol, period, series.len());
                Ok(series)
            }
            Err(DashboardError::NotFound(_)) => {
                debug!("No history for {} over {}", symbol, period);
                Ok(PriceSeries::empty(symbol))
            }
            Err(e) => Err(e),
        }
    }
}

// Yahoo wire format

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    currency: Option<String>,
    regular_market_price: Option<f64>,
    previous_close: Option<f64>,
    chart_previous_close: Option<f64>,
    regular_market_volume: Option<f64>,
    fifty_two_week_high: Option<f64>,
    fifty_two_week_low: Option<f64>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteIndicator>,
}

#[derive(Debug, Deserialize)]
struct QuoteIndicator {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryBody,
}

#[derive(Debug, Deserialize)]
struct SummaryBody {
    result: Option<Vec<SummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    beta: Option<RawValue>,
    market_cap: Option<RawValue>,
    dividend_yield: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
struct KeyStatistics {
    beta: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`; missing values come back as `{}`.
#[derive(Debug, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

/// The crumb endpoint returns the bare token; anything else is a login or consent page.
fn parse_crumb(body: &str) -> Option<String> {
    let crumb = body.trim();
    if crumb.is_empty() || crumb.contains('<') || crumb.contains(char::is_whitespace) {
        return None;
    }
    Some(crumb.to_string())
}

fn parse_chart(symbol: &str, body: &str) -> Result<ChartResult> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        if error.code == NOT_FOUND_CODE {
            return Err(DashboardError::NotFound(symbol.to_string()));
        }
        return Err(DashboardError::ProviderError(format!(
            "{}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| DashboardError::NotFound(symbol.to_string()))
}

fn parse_summary(symbol: &str, body: &str) -> Result<SummaryResult> {
    let envelope: SummaryEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.quote_summary.error {
        return Err(DashboardError::ProviderError(format!(
            "{} ({}): {}",
            error.code,
            symbol,
            error.description.unwrap_or_default()
        )));
    }

    Ok(envelope
        .quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .unwrap_or_default())
}

fn quote_from_meta(symbol: &str, meta: &ChartMeta) -> Result<Quote> {
    let price = meta
        .regular_market_price
        .filter(|p| p.is_finite())
        .ok_or_else(|| DashboardError::NotFound(symbol.to_string()))?;

    let name = meta
        .long_name
        .as_deref()
        .or(meta.short_name.as_deref())
        .unwrap_or(symbol);

    let mut quote = Quote::new(symbol, name, price);
    quote.previous_close = meta.previous_close.or(meta.chart_previous_close);
    quote.volume = meta
        .regular_market_volume
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64);
    quote.week52_high = meta.fifty_two_week_high;
    quote.week52_low = meta.fifty_two_week_low;
    quote.currency = meta.currency.clone();
    quote.fill_change_from_previous_close();

    Ok(quote)
}

fn apply_summary(quote: &mut Quote, summary: &SummaryResult) {
    if let Some(price) = &summary.price {
        if let Some(name) = &price.long_name {
            quote.name = name.clone();
        }
        quote.market_cap = raw(&price.market_cap);
    }
    if let Some(detail) = &summary.summary_detail {
        quote.pe_ratio = raw(&detail.trailing_pe);
        quote.beta = raw(&detail.beta);
        quote.dividend_yield = raw(&detail.dividend_yield);
        quote.market_cap = quote.market_cap.or(raw(&detail.market_cap));
        quote.week52_high = quote.week52_high.or(raw(&detail.fifty_two_week_high));
        quote.week52_low = quote.week52_low.or(raw(&detail.fifty_two_week_low));
    }
    if let Some(stats) = &summary.default_key_statistics {
        quote.beta = quote.beta.or(raw(&stats.beta));
    }
}

fn series_from_chart(symbol: &str, chart: &ChartResult) -> PriceSeries {
    let closes = chart
        .indicators
        .quote
        .first()
        .map(|q| q.close.as_slice())
        .unwrap_or(&[]);
    PriceSeries::from_columns(symbol, &chart.timestamp, closes)
}
