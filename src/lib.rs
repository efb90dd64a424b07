// Public modules
pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod scheduler;
pub mod services;
pub mod util;

// Re-exports for library users
pub use config::Config;
pub use errors::{DashboardError, Result};
pub use models::portfolio::{default_portfolio, Portfolio, Sector};
pub use models::quote::{PricePoint, PriceSeries, Quote};
pub use models::window::{PerformanceWindow, Period, WindowKind};
pub use providers::base::QuoteProvider;
pub use providers::yahoo::YahooProvider;
pub use scheduler::{RefreshReason, RefreshState};
pub use services::market_service::{BatchReport, Comparison, MarketService, PortfolioRow, StockView};
