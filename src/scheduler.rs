//! Refresh decision for a polling front end.
//!
//! The host loop owns a [`RefreshState`], calls [`poll`] once per tick and
//! re-fetches only when a [`RefreshReason`] comes back. State transitions
//! return a new value; nothing here mutates shared state.

use chrono::{DateTime, Utc};
use log::debug;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshState {
    last_update: Option<DateTime<Utc>>,
    selected_symbol: String,
    previous_symbol: Option<String>,
    force_refresh: bool,
    interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    FirstRun,
    SymbolChanged,
    Manual,
    IntervalElapsed,
}

impl fmt::Display for RefreshReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefreshReason::FirstRun => "first run",
            RefreshReason::SymbolChanged => "symbol changed",
            RefreshReason::Manual => "manual refresh",
            RefreshReason::IntervalElapsed => "interval elapsed",
        };
        f.write_str(s)
    }
}

impl RefreshState {
    pub fn new(symbol: &str, interval: Duration) -> Self {
        Self {
            last_update: None,
            selected_symbol: symbol.to_string(),
            previous_symbol: None,
            force_refresh: false,
            interval,
        }
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn selected_symbol(&self) -> &str {
        &self.selected_symbol
    }

    pub fn previous_symbol(&self) -> Option<&str> {
        self.previous_symbol.as_deref()
    }

    pub fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn select_symbol(&self, symbol: &str) -> Self {
        Self {
            selected_symbol: symbol.to_string(),
            ..self.clone()
        }
    }

    /// Sets the manual-refresh flag.
    pub fn request_refresh(&self) -> Self {
        Self {
            force_refresh: true,
            ..self.clone()
        }
    }

    fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_update
            .map(|last| now.signed_duration_since(last).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Why a refresh is due, or `None` if it is not.
pub fn refresh_reason(state: &RefreshState, now: DateTime<Utc>) -> Option<RefreshReason> {
    let Some(elapsed) = state.elapsed(now) else {
        return Some(RefreshReason::FirstRun);
    };
    match state.previous_symbol.as_deref() {
        None => return Some(RefreshReason::FirstRun),
        Some(prev) if prev != state.selected_symbol => return Some(RefreshReason::SymbolChanged),
        _ => {}
    }
    if state.force_refresh {
        return Some(RefreshReason::Manual);
    }
    if elapsed >= state.interval {
        return Some(RefreshReason::IntervalElapsed);
    }
    None
}

pub fn should_refresh(state: &RefreshState, now: DateTime<Utc>) -> bool {
    refresh_reason(state, now).is_some()
}

/// State after a refresh at `now`.
pub fn record_refresh(state: &RefreshState, now: DateTime<Utc>) -> RefreshState {
    RefreshState {
        last_update: Some(now),
        selected_symbol: state.selected_symbol.clone(),
        previous_symbol: Some(state.selected_symbol.clone()),
        force_refresh: false,
        interval: state.interval,
    }
}

/// One scheduler tick: decides and, if a refresh is due, records it.
pub fn poll(state: &RefreshState, now: DateTime<Utc>) -> (RefreshState, Option<RefreshReason>) {
    match refresh_reason(state, now) {
        Some(reason) => {
            debug!("Refreshing {} ({})", state.selected_symbol, reason);
            (record_refresh(state, now), Some(reason))
        }
        None => (state.clone(), None),
    }
}

/// Time left until the interval trigger fires; zero when already due.
pub fn next_refresh_in(state: &RefreshState, now: DateTime<Utc>) -> Duration {
    match state.elapsed(now) {
        Some(elapsed) => state.interval.saturating_sub(elapsed),
        None => Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn state() -> RefreshState {
        RefreshState::new("PETR4.SA", Duration::from_secs(10))
    }

    #[test]
    fn test_first_run_always_refreshes() {
        let s = RefreshState::new("PETR4.SA", Duration::from_secs(3600));
        assert!(should_refresh(&s, at(0)));
        assert_eq!(refresh_reason(&s, at(0)), Some(RefreshReason::FirstRun));
    }

    #[test]
    fn test_no_refresh_inside_interval() {
        let s = record_refresh(&state(), at(0));
        assert!(!should_refresh(&s, at(5)));
        assert!(!should_refresh(&s, at(9)));
    }

    #[test]
    fn test_interval_elapsed() {
        let s = record_refresh(&state(), at(0));
        assert_eq!(refresh_reason(&s, at(10)), Some(RefreshReason::IntervalElapsed));
        assert!(should_refresh(&s, at(25)));
    }

    #[test]
    fn test_symbol_change_refreshes_immediately() {
        let s = record_refresh(&state(), at(0)).select_symbol("VALE3.SA");
        assert_eq!(refresh_reason(&s, at(1)), Some(RefreshReason::SymbolChanged));
    }

    #[test]
    fn test_reselecting_same_symbol_does_not_refresh() {
        let s = record_refresh(&state(), at(0)).select_symbol("PETR4.SA");
        assert!(!should_refresh(&s, at(1)));
    }

    #[test]
    fn test_manual_refresh() {
        let s = record_refresh(&state(), at(0)).request_refresh();
        assert_eq!(refresh_reason(&s, at(1)), Some(RefreshReason::Manual));
    }

    #[test]
    fn test_record_refresh_updates_all_fields() {
        let s = record_refresh(&state(), at(0))
            .select_symbol("AAPL")
            .request_refresh();
        let next = record_refresh(&s, at(3));
        assert_eq!(next.last_update(), Some(at(3)));
        assert_eq!(next.previous_symbol(), Some("AAPL"));
        assert_eq!(next.selected_symbol(), "AAPL");
        assert!(!next.force_refresh());
        assert!(!should_refresh(&next, at(4)));
    }

    #[test]
    fn test_poll_fires_once_then_waits() {
        let (s, reason) = poll(&state(), at(0));
        assert_eq!(reason, Some(RefreshReason::FirstRun));
        let (s, reason) = poll(&s, at(4));
        assert_eq!(reason, None);
        let (_, reason) = poll(&s, at(10));
        assert_eq!(reason, Some(RefreshReason::IntervalElapsed));
    }

    #[test]
    fn test_clock_going_backwards_does_not_refresh() {
        let s = record_refresh(&state(), at(100));
        assert!(!should_refresh(&s, at(50)));
    }

    #[test]
    fn test_next_refresh_in() {
        let s = record_refresh(&state(), at(0));
        assert_eq!(next_refresh_in(&s, at(4)), Duration::from_secs(6));
        assert_eq!(next_refresh_in(&s, at(40)), Duration::ZERO);
        assert_eq!(next_refresh_in(&state(), at(0)), Duration::ZERO);
    }
}
