// Technical indicators module
//
// Every function maps a close-price series to a series of the same length.
// Positions without enough history hold NaN; callers must treat NaN as
// "not comparable". A zero period is a caller bug and is rejected with
// `EngineError::InvalidParameter`. A period longer than the input is not:
// insufficient history is never an error anywhere in the engine, it yields
// an all-NaN series (warm-up positions are NaN in every average, and a
// fresh session with a short fetch must render empty lines rather than
// fail).
pub mod ema;
pub mod hma;
pub mod macd;
pub mod sma;
pub mod tema;
pub mod wma;

pub use ema::{ema, ema_step, smoothing, Ema};
pub use hma::{hma, hma_last, Hma};
pub use macd::{macd, Macd};
pub use sma::{sma, sma_last, Sma};
pub use tema::{tema, triple_ema, Tema, TripleEma};
pub use wma::{wma, wma_last, Wma};

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the first EMA value is produced.
///
/// `FirstValue` lets a series be extended one point at a time without a
/// look-back window, so it is the default. `Sma` matches charting packages
/// that seed with the mean of the first `period` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaSeed {
    #[default]
    FirstValue,
    Sma,
}

// Common trait for all moving averages
pub trait IndicatorCalculator: Send + Sync {
    fn name(&self) -> &str;
    fn parameters(&self) -> Value; // Parameters used for this indicator instance
    /// Number of leading positions that are always NaN.
    fn lookback(&self) -> usize;
    fn calculate(&self, closes: &[f64]) -> Vec<f64>;
}

pub(crate) fn check_period(indicator: &str, period: usize) -> EngineResult<()> {
    if period == 0 {
        return Err(EngineError::invalid(format!("{} period must be greater than 0", indicator)));
    }
    Ok(())
}

/// Arithmetic mean of a window, summed oldest to newest.
pub(crate) fn window_mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

#[cfg(test)]
pub(crate) fn assert_series_eq(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "Vectors differ in length");
    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        if a.is_nan() && e.is_nan() {
            continue;
        }
        assert!((a - e).abs() < 1e-9, "Mismatch at index {}: {} != {}", i, a, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_longer_than_input_is_all_nan() {
        let closes = [1.0, 2.0, 3.0];
        let series = [
            sma(&closes, 5).unwrap(),
            wma(&closes, 5).unwrap(),
            hma(&closes, 9).unwrap(),
            ema(&closes, 5, EmaSeed::Sma).unwrap(),
            tema(&closes, 5, EmaSeed::Sma).unwrap(),
        ];
        for values in series {
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| v.is_nan()));
        }
        assert!(matches!(sma(&closes, 0), Err(EngineError::InvalidParameter(_))));
    }
}
