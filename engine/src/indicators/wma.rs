// Weighted Moving Average (WMA): linear weights period..1, newest heaviest.
use super::{check_period, IndicatorCalculator};
use crate::error::EngineResult;
use serde_json::Value;

pub struct Wma {
    name: String,
    period: usize,
}

impl Wma {
    pub fn new(period: usize) -> EngineResult<Self> {
        check_period("WMA", period)?;
        Ok(Self {
            name: format!("WMA({})", period),
            period,
        })
    }
}

impl IndicatorCalculator for Wma {
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
        wma_unchecked(closes, self.period)
    }
}

/// Weighted mean of `window` (oldest first). Summed newest to oldest.
fn weighted_window(window: &[f64]) -> f64 {
    let period = window.len();
    let denominator = (period * (period + 1)) as f64 / 2.0;
    let mut sum = 0.0;
    for (j, value) in window.iter().rev().enumerate() {
        sum += value * (period - j) as f64;
    }
    sum / denominator
}

pub fn wma(values: &[f64], period: usize) -> EngineResult<Vec<f64>> {
    check_period("WMA", period)?;
    Ok(wma_unchecked(values, period))
}

pub(crate) fn wma_unchecked(values: &[f64], period: usize) -> Vec<f64> {
    let mut results = vec![f64::NAN; values.len()];
    if values.len() < period {
        return results;
    }
    for i in (period - 1)..values.len() {
        results[i] = weighted_window(&values[i + 1 - period..=i]);
    }
    results
}

/// WMA value at the last position of `values` (NaN if too short).
pub fn wma_last(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return f64::NAN;
    }
    weighted_window(&values[values.len() - period..])
}
