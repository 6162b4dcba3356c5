// Exponential Moving Average (EMA) indicator implementation
use super::{check_period, window_mean, EmaSeed, IndicatorCalculator};
use crate::error::EngineResult;
use serde_json::Value;

pub struct Ema {
    name: String,
    period: usize,
    seed: EmaSeed,
}

impl Ema {
    pub fn new(period: usize, seed: EmaSeed) -> EngineResult<Self> {
        check_period("EMA", period)?;
        Ok(Self {
            name: format!("EMA({})", period),
            period,
            seed,
        })
    }
}

impl IndicatorCalculator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> Value {
        serde_json::json!({ "period": self.period, "seed": self.seed })
    }

    fn lookback(&self) -> usize {
        match self.seed {
            EmaSeed::FirstValue => 0,
            EmaSeed::Sma => self.period - 1,
        }
    }

    fn calculate(&self, closes: &[f64]) -> Vec<f64> {
        ema_unchecked(closes, self.period, self.seed)
    }
}

/// `2 / (period + 1)`.
pub fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// One step of the recurrence. Batch and streaming paths both go through here.
#[inline]
pub fn ema_step(previous: f64, value: f64, alpha: f64) -> f64 {
    previous + (value - previous) * alpha
}

pub fn ema(values: &[f64], period: usize, seed: EmaSeed) -> EngineResult<Vec<f64>> {
    check_period("EMA", period)?;
    Ok(ema_unchecked(values, period, seed))
}

// Leading NaNs (e.g. the warm-up of a nested average) are skipped and the
// seed is taken from the first defined value. A NaN after the seed taints
// the remainder of the series.
pub(crate) fn ema_unchecked(values: &[f64], period: usize, seed: EmaSeed) -> Vec<f64> {
    let mut results = vec![f64::NAN; values.len()];
    let Some(first) = values.iter().position(|v| !v.is_nan()) else {
        return results;
    };

    let (seed_index, seed_value) = match seed {
        EmaSeed::FirstValue => (first, values[first]),
        EmaSeed::Sma => {
            if values.len() - first < period {
                return results;
            }
            let window = &values[first..first + period];
            if window.iter().any(|v| v.is_nan()) {
                return results;
            }
            (first + period - 1, window_mean(window))
        }
    };

    let alpha = smoothing(period);
    results[seed_index] = seed_value;
    let mut previous = seed_value;
    for i in (seed_index + 1)..values.len() {
        if values[i].is_nan() {
            break;
        }
        previous = ema_step(previous, values[i], alpha);
        results[i] = previous;
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_series_eq;

    #[test]
    fn test_ema_first_value_seed() {
        // alpha = 2/(3+1) = 0.5
        // EMA[0] = 10
        // EMA[1] = 10 + (11 - 10) * 0.5 = 10.5
        // EMA[2] = 10.5 + (12 - 10.5) * 0.5 = 11.25
        let results = ema(&[10.0, 11.0, 12.0], 3, EmaSeed::FirstValue).unwrap();
        assert_series_eq(&results, &[10.0, 10.5, 11.25]);
    }

    #[test]
    fn test_ema_sma_seed() {
        // SMA for first 3: (10+11+12)/3 = 11.0
        // EMA for 13: (13 - 11.0) * 0.5 + 11.0 = 12.0
        // EMA for 14: (14 - 12.0) * 0.5 + 12.0 = 13.0
        let results = ema(&[10.0, 11.0, 12.0, 13.0, 14.0], 3, EmaSeed::Sma).unwrap();
        assert_series_eq(&results, &[f64::NAN, f64::NAN, 11.0, 12.0, 13.0]);
    }

    #[test]
    fn test_ema_sma_seed_insufficient_data() {
        let results = ema(&[1.0, 2.0], 3, EmaSeed::Sma).unwrap();
        assert!(results.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_ema_first_value_seed_never_undefined() {
        let results = ema(&[5.0, 6.0], 50, EmaSeed::FirstValue).unwrap();
        assert!(results.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_ema_skips_leading_nan() {
        let results = ema(&[f64::NAN, f64::NAN, 4.0, 6.0], 3, EmaSeed::FirstValue).unwrap();
        assert_series_eq(&results, &[f64::NAN, f64::NAN, 4.0, 5.0]);
    }

    #[test]
    fn test_ema_nan_after_seed_taints_rest() {
        let results = ema(&[1.0, 2.0, f64::NAN, 4.0], 2, EmaSeed::FirstValue).unwrap();
        assert!(results[1].is_finite());
        assert!(results[2].is_nan());
        assert!(results[3].is_nan());
    }

    #[test]
    fn test_ema_is_deterministic() {
        let values: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7).sin() * 10.0 + 100.0).collect();
        let a = ema(&values, 9, EmaSeed::FirstValue).unwrap();
        let b = ema(&values, 9, EmaSeed::FirstValue).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_ema_period_zero_rejected() {
        assert!(ema(&[1.0], 0, EmaSeed::FirstValue).is_err());
        assert!(Ema::new(0, EmaSeed::Sma).is_err());
    }

    #[test]
    fn test_ema_lookback_depends_on_seed() {
        assert_eq!(Ema::new(20, EmaSeed::FirstValue).unwrap().lookback(), 0);
        assert_eq!(Ema::new(20, EmaSeed::Sma).unwrap().lookback(), 19);
    }
}
