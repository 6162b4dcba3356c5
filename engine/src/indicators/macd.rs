// Moving Average Convergence Divergence (MACD)
use super::ema::ema_unchecked;
use super::{check_period, EmaSeed};
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    /// EMA(fast) - EMA(slow)
    pub macd: Vec<f64>,
    /// EMA(macd, signal)
    pub signal: Vec<f64>,
    /// macd - signal
    pub histogram: Vec<f64>,
    pub fast_ema: Vec<f64>,
    pub slow_ema: Vec<f64>,
}

pub(crate) fn check_macd_periods(fast: usize, slow: usize, signal: usize) -> EngineResult<()> {
    check_period("MACD fast", fast)?;
    check_period("MACD slow", slow)?;
    check_period("MACD signal", signal)?;
    if fast >= slow {
        return Err(EngineError::invalid(format!(
            "MACD fast period ({}) must be shorter than slow period ({})",
            fast, slow
        )));
    }
    Ok(())
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize, seed: EmaSeed) -> EngineResult<Macd> {
    check_macd_periods(fast, slow, signal)?;

    let fast_ema = ema_unchecked(values, fast, seed);
    let slow_ema = ema_unchecked(values, slow, seed);
    let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema_unchecked(&macd_line, signal, seed);
    let histogram = macd_line.iter().zip(&signal_line).map(|(m, s)| m - s).collect();

    Ok(Macd {
        macd: macd_line,
        signal: signal_line,
        histogram,
        fast_ema,
        slow_ema,
    })
}
