// Simple Moving Average (SMA) indicator implementation
use super::{check_period, window_mean, IndicatorCalculator};
use crate::error::EngineResult;
use serde_json::Value;

pub struct Sma {
    name: String,
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> EngineResult<Self> {
        check_period("SMA", period)?;
        Ok(Self {
            name: format!("SMA({})", period),
            period,
        })
    }
}

impl IndicatorCalculator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn calculate(&self, closes: &[f64]) -> Vec<f64> {
        sma_unchecked(closes, self.period)
    }
}

pub fn sma(values: &[f64], period: usize) -> EngineResult<Vec<f64>> {
    check_period("SMA", period)?;
    Ok(sma_unchecked(values, period))
}

// Each window is summed from scratch rather than rolled, so `sma_last` over
// a trailing slice reproduces the batch value exactly.
pub(crate) fn sma_unchecked(values: &[f64], period: usize) -> Vec<f64> {
    let mut results = vec![f64::NAN; values.len()];
    if values.len() < period {
        return results;
    }
    for i in (period - 1)..values.len() {
        results[i] = window_mean(&values[i + 1 - period..=i]);
    }
    results
}

/// SMA value at the last position of `values` (NaN if too short).
pub fn sma_last(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return f64::NAN;
    }
    window_mean(&values[values.len() - period..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_series_eq;

    #[test]
    fn test_sma_calculation() {
        // expected: NaN, NaN, (1+2+3)/3=2.0, (2+3+4)/3=3.0, (3+4+5)/3=4.0
        let results = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_series_eq(&results, &[f64::NAN, f64::NAN, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let results = sma(&[1.0, 2.0], 3).unwrap();
        assert_series_eq(&results, &[f64::NAN, f64::NAN]);
    }

    #[test]
    fn test_sma_period_one() {
        // SMA(1) is just the close price
        let results = sma(&[1.0, 2.0, 3.0], 1).unwrap();
        assert_series_eq(&results, &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_sma_empty_data() {
        let results = sma(&[], 3).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_sma_period_zero_rejected() {
        assert!(sma(&[1.0], 0).is_err());
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn test_sma_nan_in_window() {
        let results = sma(&[10.0, f64::NAN, 12.0, 13.0, 14.0], 2).unwrap();
        assert!(results[1].is_nan());
        assert!(results[2].is_nan());
        assert_series_eq(&results[3..], &[12.5, 13.5]);
    }

    #[test]
    fn test_sma_last_matches_batch() {
        let values = [3.1, 4.7, 1.2, 9.9, 5.5, 6.25, 7.125];
        let batch = sma(&values, 4).unwrap();
        assert_eq!(sma_last(&values, 4).to_bits(), batch[6].to_bits());
        assert!(sma_last(&values[..3], 4).is_nan());
    }

    #[test]
    fn test_sma_calculator_metadata() {
        let calc = Sma::new(20).unwrap();
        assert_eq!(calc.name(), "SMA(20)");
        assert_eq!(calc.parameters()["period"], 20);
        assert_eq!(calc.lookback(), 19);
    }
}
