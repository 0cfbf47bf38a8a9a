//! Moving-average expense forecast

use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::models::LedgerEntry;
use crate::Result;

/// Number of most recent entries averaged
pub const FORECAST_WINDOW: usize = 7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    /// Mean amount of the last [`FORECAST_WINDOW`] entries
    pub moving_average: f64,
    /// Change against the preceding window, when one exists
    pub trend_pct: Option<f64>,
    pub days: u32,
    pub projected: f64,
    pub sample_size: usize,
}

fn mean(amounts: &[f64]) -> f64 {
    if amounts.is_empty() {
        0.0
    } else {
        amounts.iter().sum::<f64>() / amounts.len() as f64
    }
}

/// Forecast spending for the next `days` days.
///
/// Entries are ordered by timestamp (then id); date gaps are ignored. Fewer
/// than [`FORECAST_WINDOW`] entries is [`AgentError::InsufficientHistory`].
pub fn forecast(entries: &[LedgerEntry], days: u32) -> Result<Forecast> {
    if entries.len() < FORECAST_WINDOW {
        return Err(AgentError::InsufficientHistory {
            needed: FORECAST_WINDOW,
            available: entries.len(),
        });
    }

    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| (entry.timestamp, entry.id));
    let amounts: Vec<f64> = ordered.iter().map(|entry| entry.amount).collect();

    let len = amounts.len();
    let recent = &amounts[len - FORECAST_WINDOW..];
    let moving_average = mean(recent);

    let trend_pct = if len >= FORECAST_WINDOW * 2 {
        let preceding = mean(&amounts[len - FORECAST_WINDOW * 2..len - FORECAST_WINDOW]);
        (preceding > 0.0).then(|| (moving_average - preceding) / preceding * 100.0)
    } else {
        None
    };

    Ok(Forecast {
        moving_average,
        trend_pct,
        days,
        projected: moving_average * days as f64,
        sample_size: len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::expense_on;

    fn daily(amounts: &[f64]) -> Vec<LedgerEntry> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, amount)| expense_on(i as u64 + 1, *amount, "geral", (2024, 5, i as u32 + 1)))
            .collect()
    }

    #[test]
    fn test_unavailable_below_window() {
        let entries = daily(&[10.0; 6]);
        let err = forecast(&entries, 7).unwrap_err();
        assert!(matches!(
            err,
            AgentError::InsufficientHistory { needed: 7, available: 6 }
        ));
    }

    #[test]
    fn test_available_at_exactly_window() {
        let entries = daily(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0]);
        let result = forecast(&entries, 10).unwrap();

        assert!((result.moving_average - 40.0).abs() < 1e-9);
        assert!((result.projected - 400.0).abs() < 1e-9);
        assert_eq!(result.trend_pct, None);
    }

    #[test]
    fn test_trend_against_preceding_window() {
        let mut amounts = vec![80.0; 7];
        amounts.extend([100.0; 7]);
        let entries = daily(&amounts);

        let result = forecast(&entries, 7).unwrap();
        assert!((result.moving_average - 100.0).abs() < 1e-9);
        assert!((result.trend_pct.unwrap() - 25.0).abs() < 1e-9);
        assert!((result.projected - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_uses_timestamp_order_not_insertion_order() {
        let mut entries = daily(&[1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0]);
        // The large amount is the oldest entry once sorted by date.
        entries[7].timestamp = entries[0].timestamp - chrono::Duration::days(30);

        let result = forecast(&entries, 1).unwrap();
        assert!((result.moving_average - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_preceding_mean_has_no_trend() {
        let mut amounts = vec![0.0; 7];
        amounts.extend([10.0; 7]);

        let result = forecast(&daily(&amounts), 7).unwrap();
        assert_eq!(result.trend_pct, None);
    }
}
