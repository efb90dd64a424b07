use market_dashboard::config::Config;
use market_dashboard::metrics::TechnicalAnalysis;
use market_dashboard::models::portfolio::{default_portfolio, COMPARISON_SYMBOLS};
use market_dashboard::models::window::{Period, WindowKind};
use market_dashboard::providers::yahoo::YahooProvider;
use market_dashboard::scheduler::{self, RefreshState};
use market_dashboard::services::market_service::{
    summarize, Comparison, MarketService, PortfolioRow, StockView,
};
use market_dashboard::util::{self, csv_utils, display};

use chrono::{Local, Utc};
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info, warn};
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    let window_arg = Arg::with_name("window")
        .short('w')
        .long("window")
        .value_name("WINDOW")
        .help("Time window (current, 5d, 30d, ytd, ltm, range)")
        .takes_value(true)
        .default_value("current");

    let symbol_arg = Arg::with_name("symbol")
        .short('s')
        .long("symbol")
        .value_name("SYMBOL")
        .help("Ticker symbol, e.g. AAPL or PETR4.SA")
        .takes_value(true)
        .default_value("PETR4.SA");

    let app = App::new("market_dashboard")
        .version("1.0.0")
        .about("Stock dashboard: quotes, performance windows, portfolio table and comparison")
        .arg(
            Arg::with_name("cache-ttl")
                .long("cache-ttl")
                .value_name("SECS")
                .help("Seconds a fetched quote/series is reused (0 disables caching)")
                .takes_value(true)
                .default_value("30"),
        )
        .arg(
            Arg::with_name("concurrency")
                .long("concurrency")
                .value_name("N")
                .help("Maximum tickers fetched at once for the portfolio table")
                .takes_value(true)
                .default_value("4"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECS")
                .help("HTTP request timeout")
                .takes_value(true)
                .default_value("10"),
        )
        .arg(
            Arg::with_name("user-agent")
                .long("user-agent")
                .value_name("UA")
                .help("User-Agent header sent to the quote provider")
                .takes_value(true),
        )
        .subcommand(
            SubCommand::with_name("stock")
                .about("Show one stock")
                .arg(symbol_arg.clone())
                .arg(window_arg.clone()),
        )
        .subcommand(
            SubCommand::with_name("table")
                .about("Show the full portfolio table")
                .arg(
                    Arg::with_name("sector")
                        .long("sector")
                        .value_name("SECTOR")
                        .help("Only show rows from this sector")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("csv")
                        .long("csv")
                        .value_name("PATH")
                        .help("Export the (filtered) table as CSV; a directory gets a timestamped file name")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("watch")
                        .long("watch")
                        .value_name("SECS")
                        .help("Reload the table every SECS seconds (5-60)")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("ticks")
                        .long("ticks")
                        .value_name("N")
                        .help("With --watch, stop after N refreshes")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("compare")
                .about("Compare two stocks")
                .arg(
                    Arg::with_name("first")
                        .short('a')
                        .long("first")
                        .value_name("SYMBOL")
                        .takes_value(true)
                        .default_value(COMPARISON_SYMBOLS[0]),
                )
                .arg(
                    Arg::with_name("second")
                        .short('b')
                        .long("second")
                        .value_name("SYMBOL")
                        .takes_value(true)
                        .default_value(COMPARISON_SYMBOLS[1]),
                )
                .arg(
                    Arg::with_name("period")
                        .short('p')
                        .long("period")
                        .value_name("PERIOD")
                        .help("Comparison period (5d, 1mo, 3mo, 6mo, 1y)")
                        .takes_value(true)
                        .default_value("1mo"),
                ),
        )
        .subcommand(
            SubCommand::with_name("watch")
                .about("Poll one stock; type a symbol + Enter to switch, Enter alone to refresh, q to quit")
                .arg(symbol_arg)
                .arg(window_arg)
                .arg(
                    Arg::with_name("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECS")
                        .help("Update interval in seconds (5-60)")
                        .takes_value(true)
                        .default_value("10"),
                )
                .arg(
                    Arg::with_name("ticks")
                        .long("ticks")
                        .value_name("N")
                        .help("Stop after N refreshes")
                        .takes_value(true),
                ),
        )
        .subcommand(SubCommand::with_name("sectors").about("List the default portfolio"));

    let matches = app.get_matches();

    let mut config = Config::new()
        .with_cache_ttl(Duration::from_secs(parse_or(&matches, "cache-ttl", 30)))
        .with_max_concurrent_fetches(parse_or(&matches, "concurrency", 4))
        .with_request_timeout(Duration::from_secs(parse_or(&matches, "timeout", 10)));
    if let Some(user_agent) = matches.value_of("user-agent") {
        config = config.with_user_agent(user_agent);
    }

    match matches.subcommand() {
        Some(("stock", sub)) => {
            let service = build_service(config)?;
            let symbol = sub.value_of("symbol").unwrap_or("PETR4.SA");
            let window: WindowKind = sub.value_of("window").unwrap_or("current").parse()?;
            match service.stock_view(symbol, window).await {
                Ok(view) => print_stock_view(&view),
                Err(e) => {
                    error!("Unable to load {}: {}", symbol, e);
                    print_symbol_hint();
                }
            }
        }
        Some(("table", sub)) => {
            let sector = sub.value_of("sector");
            let csv = sub.value_of("csv");
            match sub.value_of("watch") {
                Some(secs) => {
                    let secs = secs.parse::<u64>().unwrap_or(30);
                    let config = config.with_update_interval_secs(secs);
                    let ticks = sub.value_of("ticks").and_then(|v| v.parse::<usize>().ok());
                    let service = build_service(config)?;
                    watch_table(&service, sector, csv, ticks).await?;
                }
                None => {
                    let service = build_service(config)?;
                    show_table(&service, sector, csv).await?;
                }
            }
        }
        Some(("compare", sub)) => {
            let service = build_service(config)?;
            let first = sub.value_of("first").unwrap_or(COMPARISON_SYMBOLS[0]);
            let second = sub.value_of("second").unwrap_or(COMPARISON_SYMBOLS[1]);
            let period: Period = sub.value_of("period").unwrap_or("1mo").parse()?;
            if !Period::comparison_periods().contains(&period) {
                warn!("Period {} is not one of the comparison periods", period);
            }
            match service.compare(first, second, period).await {
                Ok(comparison) => print_comparison(&comparison),
                Err(e) => error!("Comparison failed: {}", e),
            }
        }
        Some(("watch", sub)) => {
            let config = config.with_update_interval_secs(parse_or(sub, "interval", 10));
            let symbol = util::validate_symbol(sub.value_of("symbol").unwrap_or("PETR4.SA"))?;
            let window: WindowKind = sub.value_of("window").unwrap_or("current").parse()?;
            let ticks = sub.value_of("ticks").and_then(|v| v.parse::<usize>().ok());
            let service = build_service(config)?;
            watch(&service, &symbol, window, ticks).await;
        }
        Some(("sectors", _)) => {
            let portfolio = default_portfolio();
            for sector in &portfolio.sectors {
                println!("{:<16} {}", sector.name, sector.symbols.join(", "));
            }
            println!("Portfolio: {} tickers", portfolio.len());
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

fn parse_or<T: std::str::FromStr>(matches: &ArgMatches, name: &str, default: T) -> T {
    matches
        .value_of(name)
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn build_service(config: Config) -> Result<MarketService, Box<dyn Error>> {
    let provider = YahooProvider::new(&config)?;
    Ok(MarketService::new(config, Arc::new(provider)))
}

/// Polling loop: refreshes the view only when the scheduler says so.
async fn watch(service: &MarketService, symbol: &str, window: WindowKind, max_ticks: Option<usize>) {
    let mut state = RefreshState::new(symbol, service.config().update_interval);
    let mut refreshes = 0usize;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        let (next, reason) = scheduler::poll(&state, Utc::now());
        state = next;

        if let Some(reason) = reason {
            info!("Refreshing {} ({})", state.selected_symbol(), reason);
            match service.stock_view(state.selected_symbol(), window).await {
                Ok(view) => print_stock_view(&view),
                Err(e) => error!("Unable to load {}: {}", state.selected_symbol(), e),
            }
            refreshes += 1;
            if max_ticks.map_or(false, |max| refreshes >= max) {
                break;
            }
            println!(
                "Next update in {}s",
                scheduler::next_refresh_in(&state, Utc::now()).as_secs()
            );
        }

        let wait = scheduler::next_refresh_in(&state, Utc::now()).max(Duration::from_millis(250));
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(input)) => {
                    let input = input.trim();
                    if input.eq_ignore_ascii_case("q") {
                        break;
                    } else if input.is_empty() {
                        state = state.request_refresh();
                    } else {
                        match util::validate_symbol(input) {
                            Ok(symbol) => state = state.select_symbol(&symbol),
                            Err(e) => warn!("{}", e),
                        }
                    }
                }
                // stdin closed: timer only from here on
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin: {}", e);
                    stdin_open = false;
                }
            }
        }
    }
}

async fn show_table(
    service: &MarketService,
    sector: Option<&str>,
    csv: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let portfolio = default_portfolio();
    let report = service.fetch_portfolio(&portfolio).await;

    let rows = match sector {
        Some(sector) => {
            if portfolio.sector(sector).is_none() {
                warn!("Unknown sector {:?}; known: {}", sector, portfolio.sector_names().join(", "));
            }
            report.rows_in_sector(sector)
        }
        None => report.rows.clone(),
    };

    print_portfolio_table(&rows);
    for (symbol, e) in &report.failures {
        println!("  skipped {}: {}", symbol, e);
    }

    if let Some(target) = csv {
        let mut path = PathBuf::from(target);
        if path.is_dir() {
            path = path.join(csv_utils::export_file_name(Local::now()));
        }
        csv_utils::write_portfolio_csv(&rows, &path)?;
        println!("CSV written to {}", path.display());
    }
    println!("Last update: {}", Local::now().format("%H:%M:%S"));
    Ok(())
}

/// Reloads the portfolio table whenever the scheduler's interval elapses.
async fn watch_table(
    service: &MarketService,
    sector: Option<&str>,
    csv: Option<&str>,
    max_ticks: Option<usize>,
) -> Result<(), Box<dyn Error>> {
    let mut state = RefreshState::new(sector.unwrap_or("portfolio"), service.config().update_interval);
    let mut refreshes = 0usize;

    loop {
        let (next, reason) = scheduler::poll(&state, Utc::now());
        state = next;

        if let Some(reason) = reason {
            info!("Reloading portfolio table ({})", reason);
            show_table(service, sector, csv).await?;
            refreshes += 1;
            if max_ticks.map_or(false, |max| refreshes >= max) {
                return Ok(());
            }
            println!(
                "Next update in {}s",
                scheduler::next_refresh_in(&state, Utc::now()).as_secs()
            );
        }

        let wait = scheduler::next_refresh_in(&state, Utc::now()).max(Duration::from_millis(250));
        tokio::time::sleep(wait).await;
    }
}

fn print_symbol_hint() {
    println!("Could not load data. Check the symbol:");
    println!("  US stocks: symbol only (e.g. AAPL, GOOGL)");
    println!("  Brazilian stocks: add the .SA suffix (e.g. PETR4.SA, VALE3.SA)");
}

fn print_stock_view(view: &StockView) {
    let q = &view.quote;
    let cur = q.currency.as_deref();

    println!("{:=<72}", "");
    println!("{} ({})", q.name, q.symbol);
    println!(
        "{}  {} ({})",
        display::price(q.price, cur, &q.symbol),
        display::signed(q.change),
        display::percent(q.change_percent)
    );
    println!("{:-<72}", "");
    println!(
        "{:<14} {:<14} {:<14} {:<14}",
        "Volume", "Market Cap", "P/E Ratio", "Beta"
    );
    println!(
        "{:<14} {:<14} {:<14} {:<14}",
        display::volume(q.volume),
        display::market_cap(q.market_cap),
        display::ratio(q.pe_ratio),
        display::ratio(q.beta)
    );
    println!(
        "52W High: {}   52W Low: {}",
        display::optional_price(q.week52_high, cur, &q.symbol),
        display::optional_price(q.week52_low, cur, &q.symbol)
    );

    for (window, value) in &view.performance {
        println!("Performance {}: {:+.2}%", window, value);
    }

    if view.series.is_empty() {
        println!("No historical data available for the {} window.", view.window);
    } else if let (Some(first), Some(last)) = (view.series.first(), view.series.last()) {
        println!(
            "{} chart: {} points, {} .. {}",
            view.window,
            view.series.len(),
            util::format_timestamp(first.timestamp),
            util::format_timestamp(last.timestamp)
        );
    }

    match &view.technical {
        TechnicalAnalysis::Ready { .. } => {
            println!(
                "Technical: MA20 {}  MA50 {}",
                display::ratio(view.technical.latest_ma20()),
                display::ratio(view.technical.latest_ma50())
            );
        }
        TechnicalAnalysis::InsufficientData { points, required } if *points > 0 => {
            println!(
                "Technical analysis needs {}+ points of history (have {}).",
                required, points
            );
        }
        TechnicalAnalysis::InsufficientData { .. } => {}
    }
}

fn print_portfolio_table(rows: &[PortfolioRow]) {
    let summary = summarize(rows);
    let pct_of_total = |n: usize| {
        if summary.total == 0 {
            0.0
        } else {
            n as f64 / summary.total as f64 * 100.0
        }
    };
    println!(
        "Total: {}   Up: {} ({:.1}%)   Down: {} ({:.1}%)   Avg change: {}",
        summary.total,
        summary.advancing,
        pct_of_total(summary.advancing),
        summary.declining,
        pct_of_total(summary.declining),
        display::percent(summary.average_change_percent)
    );
    println!("{:-<150}", "");
    println!(
        "{:<14} {:<10} {:<33} {:>12} {:>9} {:>9} {:>9} {:>9} {:>9} {:>15} {:>7} {:>6} {:>11}",
        "Sector", "Symbol", "Name", "Price", "Chg%", "5d", "30d", "YTD", "LTM", "Volume", "P/E", "Beta", "Mkt Cap"
    );
    for row in rows {
        let cur = row.currency.as_deref();
        println!(
            "{:<14} {:<10} {:<33} {:>12} {:>9} {:>9} {:>9} {:>9} {:>9} {:>15} {:>7} {:>6} {:>11}",
            row.sector,
            row.symbol,
            row.name,
            display::price(row.price, cur, &row.symbol),
            display::percent(row.change_percent),
            display::percent(row.perf_5d),
            display::percent(row.perf_30d),
            display::percent(row.perf_ytd),
            display::percent(row.perf_ltm),
            display::volume(row.volume),
            display::ratio(row.pe_ratio),
            display::ratio(row.beta),
            display::market_cap(row.market_cap)
        );
    }
}

fn print_comparison(comparison: &Comparison) {
    println!("Comparison over {}", comparison.period);
    for side in [&comparison.first, &comparison.second] {
        let q = &side.quote;
        println!("{:-<60}", "");
        println!("{} - {}", q.symbol, q.name);
        println!(
            "  Price {}   Change {}   P/E {}   Beta {}",
            display::price(q.price, q.currency.as_deref(), &q.symbol),
            display::percent(q.change_percent),
            display::ratio(q.pe_ratio),
            display::ratio(q.beta)
        );
        println!("  Period performance: {:+.2}%", side.performance());
    }
    println!("{:-<60}", "");
    match comparison.leader() {
        Some(symbol) => println!("Best performance: {}", symbol),
        None => println!("Both performed the same"),
    }
}
