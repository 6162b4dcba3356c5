// Hull Moving Average (HMA)
//
// HMA(p) = WMA(2 * WMA(x, p/2) - WMA(x, p), floor(sqrt(p)))
// with integer-floored half period and square-root window.
use super::wma::wma_unchecked;
use super::{check_period, IndicatorCalculator};
use crate::error::{EngineError, EngineResult};
use serde_json::Value;

pub struct Hma {
    name: String,
    period: usize,
}

impl Hma {
    pub fn new(period: usize) -> EngineResult<Self> {
        check_hma_period(period)?;
        Ok(Self {
            name: format!("HMA({})", period),
            period,
        })
    }
}

impl IndicatorCalculator for Hma {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period })
    }

    fn lookback(&self) -> usize {
        self.period - 1 + sqrt_window(self.period) - 1
    }

    fn calculate(&self, closes: &[f64]) -> Vec<f64> {
        hma_unchecked(closes, self.period)
    }
}

fn check_hma_period(period: usize) -> EngineResult<()> {
    check_period("HMA", period)?;
    if period < 2 {
        return Err(EngineError::invalid("HMA period must be at least 2"));
    }
    Ok(())
}

pub(crate) fn sqrt_window(period: usize) -> usize {
    ((period as f64).sqrt().floor() as usize).max(1)
}

pub fn hma(values: &[f64], period: usize) -> EngineResult<Vec<f64>> {
    check_hma_period(period)?;
    Ok(hma_unchecked(values, period))
}

pub(crate) fn hma_unchecked(values: &[f64], period: usize) -> Vec<f64> {
    let half = wma_unchecked(values, period / 2);
    let full = wma_unchecked(values, period);
    let diff: Vec<f64> = half.iter().zip(full.iter()).map(|(h, f)| 2.0 * h - f).collect();
    wma_unchecked(&diff, sqrt_window(period))
}

/// HMA value at the last position of `values`.
///
/// Only the trailing `period + sqrt(period) - 1` values can influence it, so
/// the nested passes run over that slice instead of the whole history.
pub fn hma_last(values: &[f64], period: usize) -> f64 {
    if period < 2 {
        return f64::NAN;
    }
    let span = period + sqrt_window(period) - 1;
    let start = values.len().saturating_sub(span);
    hma_unchecked(&values[start..], period)
        .last()
        .copied()
        .unwrap_or(f64::NAN)
}
