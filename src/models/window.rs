use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::DashboardError;

/// Lookback periods understood by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Period {
    OneDay,
    FiveDays,
    OneMonth,
    ThreeMonths,
    SixMonths,
    YearToDate,
    OneYear,
    Max,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::YearToDate => "ytd",
            Period::OneYear => "1y",
            Period::Max => "max",
        }
    }

    /// Periods offered by the comparison view.
    pub fn comparison_periods() -> [Period; 5] {
        [
            Period::FiveDays,
            Period::OneMonth,
            Period::ThreeMonths,
            Period::SixMonths,
            Period::OneYear,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Period::OneDay),
            "5d" => Ok(Period::FiveDays),
            "1mo" => Ok(Period::OneMonth),
            "3mo" => Ok(Period::ThreeMonths),
            "6mo" => Ok(Period::SixMonths),
            "ytd" => Ok(Period::YearToDate),
            "1y" => Ok(Period::OneYear),
            "max" => Ok(Period::Max),
            other => Err(DashboardError::ConfigError(format!("Unknown period: {}", other))),
        }
    }
}

/// Window selector of the single-stock view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowKind {
    Current,
    FiveDay,
    ThirtyDay,
    YearToDate,
    TrailingTwelveMonths,
    Range,
}

impl WindowKind {
    pub fn period(&self) -> Period {
        match self {
            WindowKind::Current => Period::OneDay,
            WindowKind::FiveDay => Period::FiveDays,
            WindowKind::ThirtyDay => Period::OneMonth,
            WindowKind::YearToDate => Period::YearToDate,
            WindowKind::TrailingTwelveMonths => Period::OneYear,
            WindowKind::Range => Period::Max,
        }
    }

    /// The performance metric shown for this window, if any.
    pub fn performance_window(&self) -> Option<PerformanceWindow> {
        match self {
            WindowKind::FiveDay => Some(PerformanceWindow::FiveDay),
            WindowKind::ThirtyDay => Some(PerformanceWindow::ThirtyDay),
            WindowKind::YearToDate => Some(PerformanceWindow::YearToDate),
            WindowKind::TrailingTwelveMonths => Some(PerformanceWindow::TrailingTwelveMonths),
            WindowKind::Current | WindowKind::Range => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WindowKind::Current => "Current",
            WindowKind::FiveDay => "5d",
            WindowKind::ThirtyDay => "30d",
            WindowKind::YearToDate => "YTD",
            WindowKind::TrailingTwelveMonths => "LTM",
            WindowKind::Range => "Range",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WindowKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" | "1d" => Ok(WindowKind::Current),
            "5d" => Ok(WindowKind::FiveDay),
            "30d" | "1mo" => Ok(WindowKind::ThirtyDay),
            "ytd" => Ok(WindowKind::YearToDate),
            "ltm" | "1y" => Ok(WindowKind::TrailingTwelveMonths),
            "range" | "max" => Ok(WindowKind::Range),
            other => Err(DashboardError::ConfigError(format!("Unknown window: {}", other))),
        }
    }
}

/// Windows over which percent performance is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PerformanceWindow {
    FiveDay,
    ThirtyDay,
    YearToDate,
    TrailingTwelveMonths,
}

impl PerformanceWindow {
    pub const ALL: [PerformanceWindow; 4] = [
        PerformanceWindow::FiveDay,
        PerformanceWindow::ThirtyDay,
        PerformanceWindow::YearToDate,
        PerformanceWindow::TrailingTwelveMonths,
    ];

    pub fn period(&self) -> Period {
        match self {
            PerformanceWindow::FiveDay => Period::FiveDays,
            PerformanceWindow::ThirtyDay => Period::OneMonth,
            PerformanceWindow::YearToDate => Period::YearToDate,
            PerformanceWindow::TrailingTwelveMonths => Period::OneYear,
        }
    }

    /// Fewest points a series needs before a baseline is taken from it.
    pub fn min_points(&self) -> usize {
        match self {
            PerformanceWindow::FiveDay => 2,
            _ => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PerformanceWindow::FiveDay => "5d",
            PerformanceWindow::ThirtyDay => "30d",
            PerformanceWindow::YearToDate => "YTD",
            PerformanceWindow::TrailingTwelveMonths => "LTM",
        }
    }
}

impl fmt::Display for PerformanceWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_to_period_mapping() {
        assert_eq!(WindowKind::Current.period().as_str(), "1d");
        assert_eq!(WindowKind::FiveDay.period().as_str(), "5d");
        assert_eq!(WindowKind::ThirtyDay.period().as_str(), "1mo");
        assert_eq!(WindowKind::YearToDate.period().as_str(), "ytd");
        assert_eq!(WindowKind::TrailingTwelveMonths.period().as_str(), "1y");
        assert_eq!(WindowKind::Range.period().as_str(), "max");
    }

    #[test]
    fn test_parse_window() {
        assert_eq!("YTD".parse::<WindowKind>().unwrap(), WindowKind::YearToDate);
        assert_eq!(" ltm ".parse::<WindowKind>().unwrap(), WindowKind::TrailingTwelveMonths);
        assert!("10y".parse::<WindowKind>().is_err());
    }

    #[test]
    fn test_current_and_range_have_no_performance() {
        assert_eq!(WindowKind::Current.performance_window(), None);
        assert_eq!(WindowKind::Range.performance_window(), None);
        assert_eq!(WindowKind::FiveDay.performance_window(), Some(PerformanceWindow::FiveDay));
    }

    #[test]
    fn test_parse_period() {
        assert_eq!("3mo".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert!("2w".parse::<Period>().is_err());
    }
}
