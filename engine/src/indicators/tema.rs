// Triple Exponential Moving Average (TEMA) = 3*EMA1 - 3*EMA2 + EMA3
use super::ema::ema_unchecked;
use super::{check_period, EmaSeed, IndicatorCalculator};
use crate::error::EngineResult;
use serde_json::Value;

pub struct Tema {
    name: String,
    period: usize,
    seed: EmaSeed,
}

impl Tema {
    pub fn new(period: usize, seed: EmaSeed) -> EngineResult<Self> {
        check_period("TEMA", period)?;
        Ok(Self {
            name: format!("TEMA({})", period),
            period,
            seed,
        })
    }
}

impl IndicatorCalculator for Tema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "seed": self.seed })
    }

    fn lookback(&self) -> usize {
        match self.seed {
            EmaSeed::FirstValue => 0,
            EmaSeed::Sma => 3 * (self.period - 1),
        }
    }

    fn calculate(&self, closes: &[f64]) -> Vec<f64> {
        triple_ema_unchecked(closes, self.period, self.seed).combine()
    }
}

/// The three nested EMAs behind a TEMA. Kept so a streaming caller can
/// continue each recurrence from its last value.
#[derive(Debug, Clone, PartialEq)]
pub struct TripleEma {
    pub ema1: Vec<f64>,
    pub ema2: Vec<f64>,
    pub ema3: Vec<f64>,
}

impl TripleEma {
    pub fn combine(&self) -> Vec<f64> {
        self.ema1
            .iter()
            .zip(&self.ema2)
            .zip(&self.ema3)
            .map(|((e1, e2), e3)| combine(*e1, *e2, *e3))
            .collect()
    }
}

#[inline]
pub(crate) fn combine(e1: f64, e2: f64, e3: f64) -> f64 {
    3.0 * e1 - 3.0 * e2 + e3
}

pub fn triple_ema(values: &[f64], period: usize, seed: EmaSeed) -> EngineResult<TripleEma> {
    check_period("TEMA", period)?;
    Ok(triple_ema_unchecked(values, period, seed))
}

pub(crate) fn triple_ema_unchecked(values: &[f64], period: usize, seed: EmaSeed) -> TripleEma {
    let ema1 = ema_unchecked(values, period, seed);
    let ema2 = ema_unchecked(&ema1, period, seed);
    let ema3 = ema_unchecked(&ema2, period, seed);
    TripleEma { ema1, ema2, ema3 }
}

pub fn tema(values: &[f64], period: usize, seed: EmaSeed) -> EngineResult<Vec<f64>> {
    Ok(triple_ema(values, period, seed)?.combine())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::ema::ema;

    #[test]
    fn test_tema_identity() {
        let values: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin() * 4.0).collect();
        let e1 = ema(&values, 7, EmaSeed::FirstValue).unwrap();
        let e2 = ema(&e1, 7, EmaSeed::FirstValue).unwrap();
        let e3 = ema(&e2, 7, EmaSeed::FirstValue).unwrap();
        let result = tema(&values, 7, EmaSeed::FirstValue).unwrap();
        for i in 0..values.len() {
            assert_eq!(result[i], 3.0 * e1[i] - 3.0 * e2[i] + e3[i]);
        }
    }

    #[test]
    fn test_tema_constant_series() {
        let result = tema(&[42.0; 10], 5, EmaSeed::FirstValue).unwrap();
        assert!(result.iter().all(|v| (v - 42.0).abs() < 1e-12));
    }

    #[test]
    fn test_tema_sma_seed_warmup() {
        let values: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let result = tema(&values, 3, EmaSeed::Sma).unwrap();
        // EMA1 valid from 2, EMA2 from 4, EMA3 from 6.
        assert!(result[..6].iter().all(|v| v.is_nan()));
        assert!(result[6].is_finite());
        assert_eq!(Tema::new(3, EmaSeed::Sma).unwrap().lookback(), 6);
    }

    #[test]
    fn test_tema_reduces_lag_on_trend() {
        let values: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let plain = ema(&values, 10, EmaSeed::FirstValue).unwrap();
        let triple = tema(&values, 10, EmaSeed::FirstValue).unwrap();
        assert!((values[59] - triple[59]).abs() < (values[59] - plain[59]).abs());
    }
}
