// Crossover signal detection over a pair of aligned lines.
use crate::strategies::StrategyKind;
use shared::models::{Candle, Side, Signal};

/// Compares one pair of consecutive samples.
///
/// Any NaN among the four inputs means "not comparable" and yields `None`.
/// Touching at the current sample never fires; the lines must actually
/// separate on the other side.
pub fn check_transition(prev_fast: f64, prev_slow: f64, fast: f64, slow: f64, kind: StrategyKind) -> Option<Side> {
    if prev_fast.is_nan() || prev_slow.is_nan() || fast.is_nan() || slow.is_nan() {
        return None;
    }
    match kind {
        StrategyKind::None => None,
        StrategyKind::MaCross => {
            if prev_fast <= prev_slow && fast > slow {
                Some(Side::Buy)
            } else if prev_fast >= prev_slow && fast < slow {
                Some(Side::Sell)
            } else {
                None
            }
        }
        StrategyKind::MacdCross => {
            let prev_hist = prev_fast - prev_slow;
            let hist = fast - slow;
            if prev_hist <= 0.0 && hist > 0.0 {
                Some(Side::Buy)
            } else if prev_hist >= 0.0 && hist < 0.0 {
                Some(Side::Sell)
            } else {
                None
            }
        }
    }
}

/// Scans the whole series and returns every crossover, ascending by time.
///
/// Lines and candles of different length are truncated to the shortest.
pub fn detect(candles: &[Candle], fast: &[f64], slow: &[f64], kind: StrategyKind) -> Vec<Signal> {
    if kind == StrategyKind::None {
        return Vec::new();
    }
    let len = candles.len().min(fast.len()).min(slow.len());
    let mut signals = Vec::new();
    for i in 1..len {
        if let Some(side) = check_transition(fast[i - 1], slow[i - 1], fast[i], slow[i], kind) {
            signals.push(Signal::new(side, &candles[i], i));
        }
    }
    signals
}
