use chrono::{DateTime, Local, Utc};
use crate::errors::{DashboardError, Result};

/// Trims and upper-cases a ticker. Accepts letters, digits and `. - ^ =`
/// (exchange suffixes like `.SA`, indices like `^BVSP`, FX like `USDBRL=X`).
pub fn validate_symbol(input: &str) -> Result<String> {
    let symbol = input.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(DashboardError::InvalidSymbol(input.to_string()));
    }
    let valid = symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid || symbol.starts_with('.') || symbol.ends_with('.') {
        return Err(DashboardError::InvalidSymbol(input.to_string()));
    }
    Ok(symbol)
}

/// `YYYY-MM-DD` for a unix timestamp.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.date_naive().to_string())
        .unwrap_or_else(|| ts.to_string())
}

// Display formatting for the text front end
pub mod display {
    pub const NOT_AVAILABLE: &str = "N/A";

    /// Currency prefix: `R$` for BRL, `$` otherwise.
    pub fn currency_prefix(currency: Option<&str>, symbol: &str) -> &'static str {
        match currency {
            Some(c) if c.eq_ignore_ascii_case("BRL") => "R$ ",
            Some(_) => "$",
            None if symbol.ends_with(".SA") => "R$ ",
            None => "$",
        }
    }

    pub fn price(value: f64, currency: Option<&str>, symbol: &str) -> String {
        format!("{}{:.2}", currency_prefix(currency, symbol), value)
    }

    pub fn optional_price(value: Option<f64>, currency: Option<&str>, symbol: &str) -> String {
        value
            .map(|v| price(v, currency, symbol))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn signed(value: Option<f64>) -> String {
        value
            .map(|v| format!("{:+.2}", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn percent(value: Option<f64>) -> String {
        value
            .map(|v| format!("{:+.2}%", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn ratio(value: Option<f64>) -> String {
        value
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn market_cap(value: Option<f64>) -> String {
        value
            .map(|v| format!("${:.2}B", v / 1e9))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    /// Integer with `,` thousands separators.
    pub fn volume(value: Option<u64>) -> String {
        let Some(v) = value else {
            return NOT_AVAILABLE.to_string();
        };
        let digits = v.to_string();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(',');
            }
            out.push(c);
        }
        out
    }
}

// CSV export of the portfolio table
pub mod csv_utils {
    use super::*;
    use crate::services::market_service::PortfolioRow;
    use log::info;
    use std::fs;
    use std::path::Path;

    pub const HEADER: [&str; 16] = [
        "symbol",
        "sector",
        "name",
        "price",
        "change",
        "change_pct",
        "perf_5d",
        "perf_30d",
        "perf_ytd",
        "perf_ltm",
        "volume",
        "pe",
        "beta",
        "market_cap",
        "week52_low",
        "week52_high",
    ];

    /// Quotes a field when it contains a comma, quote or newline.
    pub fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn number(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn portfolio_to_csv(rows: &[PortfolioRow]) -> String {
        let mut csv = HEADER.join(",");
        csv.push('\n');

        for row in rows {
            let fields = [
                escape_field(&row.symbol),
                escape_field(&row.sector),
                escape_field(&row.name),
                row.price.to_string(),
                number(row.change),
                number(row.change_percent),
                number(row.perf_5d),
                number(row.perf_30d),
                number(row.perf_ytd),
                number(row.perf_ltm),
                row.volume.map(|v| v.to_string()).unwrap_or_default(),
                number(row.pe_ratio),
                number(row.beta),
                number(row.market_cap),
                number(row.week52_low),
                number(row.week52_high),
            ];
            csv.push_str(&fields.join(","));
            csv.push('\n');
        }

        csv
    }

    /// `portfolio_stocks_YYYYmmdd_HHMM.csv`
    pub fn export_file_name(now: DateTime<Local>) -> String {
        format!("portfolio_stocks_{}.csv", now.format("%Y%m%d_%H%M"))
    }

    pub fn write_portfolio_csv(rows: &[PortfolioRow], path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, portfolio_to_csv(rows))?;
        info!("Exported {} rows to {}", rows.len(), path.display());
        Ok(())
    }
}
