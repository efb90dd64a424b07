use serde::Serialize;

/// Current-quote snapshot for one symbol.
///
/// Fields the provider did not report are `None`; a reported zero stays `Some(0.0)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub volume: Option<u64>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub week52_high: Option<f64>,
    pub week52_low: Option<f64>,
    pub currency: Option<String>,
}

impl Quote {
    /// Bare quote with only the mandatory fields set.
    pub fn new(symbol: &str, name: &str, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price,
            change: None,
            change_percent: None,
            volume: None,
            previous_close: None,
            market_cap: None,
            pe_ratio: None,
            dividend_yield: None,
            beta: None,
            week52_high: None,
            week52_low: None,
            currency: None,
        }
    }

    /// Derives change and change % from the previous close when the provider
    /// only reported the latter.
    pub fn fill_change_from_previous_close(&mut self) {
        let Some(prev) = self.previous_close else { return };
        if self.change.is_none() {
            self.change = Some(self.price - prev);
        }
        if self.change_percent.is_none() && prev > 0.0 {
            self.change_percent = Some((self.price - prev) / prev * 100.0);
        }
    }
}

/// One close price at a unix timestamp (seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PricePoint {
    pub timestamp: i64,
    pub close: f64,
}

impl PricePoint {
    pub fn new(timestamp: i64, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Chronologically ordered close series for one symbol.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, sorting points ascending by timestamp and dropping
    /// non-finite closes.
    pub fn new(symbol: &str, mut points: Vec<PricePoint>) -> Self {
        points.retain(|p| p.close.is_finite());
        points.sort_by_key(|p| p.timestamp);
        Self {
            symbol: symbol.to_string(),
            points,
        }
    }

    pub fn empty(symbol: &str) -> Self {
        Self::new(symbol, Vec::new())
    }

    /// Builds a series from parallel timestamp/close columns. Rows with a
    /// missing close are skipped.
    pub fn from_columns(symbol: &str, timestamps: &[i64], closes: &[Option<f64>]) -> Self {
        let points = timestamps
            .iter()
            .zip(closes.iter())
            .filter_map(|(ts, close)| close.map(|c| PricePoint::new(*ts, c)))
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_sorted_chronologically() {
        let series = PriceSeries::new(
            "AAPL",
            vec![PricePoint::new(30, 3.0), PricePoint::new(10, 1.0), PricePoint::new(20, 2.0)],
        );
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first().map(|p| p.timestamp), Some(10));
    }

    #[test]
    fn test_from_columns_skips_null_closes() {
        let series = PriceSeries::from_columns("VALE3.SA", &[1, 2, 3], &[Some(60.0), None, Some(61.5)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![60.0, 61.5]);
    }

    #[test]
    fn test_fill_change_from_previous_close() {
        let mut quote = Quote::new("AAPL", "Apple Inc.", 110.0);
        quote.previous_close = Some(100.0);
        quote.fill_change_from_previous_close();
        assert_eq!(quote.change, Some(10.0));
        assert_eq!(quote.change_percent, Some(10.0));
    }

    #[test]
    fn test_fill_change_keeps_reported_values() {
        let mut quote = Quote::new("AAPL", "Apple Inc.", 110.0);
        quote.previous_close = Some(100.0);
        quote.change = Some(0.0);
        quote.fill_change_from_previous_close();
        assert_eq!(quote.change, Some(0.0));
    }

    #[test]
    fn test_fill_change_without_previous_close() {
        let mut quote = Quote::new("AAPL", "Apple Inc.", 110.0);
        quote.fill_change_from_previous_close();
        assert_eq!(quote.change, None);
        assert_eq!(quote.change_percent, None);
    }
}
