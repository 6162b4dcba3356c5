// Evaluating a line at one hypothetical extra candle without a full pass.
//
// Windowed averages only look at a trailing slice. EMA chains continue their
// recurrence from the last stored value. Both go through the same helpers as
// the batch functions so the result matches a batch pass over
// `closes + [price]` exactly.
use crate::error::EngineResult;
use crate::indicators::hma::sqrt_window;
use crate::indicators::macd::DEFAULT_SIGNAL;
use crate::indicators::tema::combine;
use crate::indicators::{self, ema_step, smoothing, EmaSeed};
use crate::strategies::LineSource;

/// What a line remembers from its last batch pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TailState {
    Window,
    Ema { last: f64 },
    Tema { e1: f64, e2: f64, e3: f64 },
    MacdLine { fast: f64, slow: f64 },
    MacdSignal { fast: f64, slow: f64, signal: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedLine {
    pub values: Vec<f64>,
    pub state: TailState,
}

fn last_or_nan(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(f64::NAN)
}

/// Full batch pass for one line, keeping the recurrence state.
pub fn evaluate_line(source: &LineSource, closes: &[f64], seed: EmaSeed) -> EngineResult<EvaluatedLine> {
    match *source {
        LineSource::Ema { period } => {
            let values = indicators::ema(closes, period, seed)?;
            let state = TailState::Ema { last: last_or_nan(&values) };
            Ok(EvaluatedLine { values, state })
        }
        LineSource::Tema { period } => {
            let chain = indicators::triple_ema(closes, period, seed)?;
            let state = TailState::Tema {
                e1: last_or_nan(&chain.ema1),
                e2: last_or_nan(&chain.ema2),
                e3: last_or_nan(&chain.ema3),
            };
            Ok(EvaluatedLine {
                values: chain.combine(),
                state,
            })
        }
        LineSource::MacdLine { fast, slow } => {
            let m = indicators::macd(closes, fast, slow, DEFAULT_SIGNAL, seed)?;
            let state = TailState::MacdLine {
                fast: last_or_nan(&m.fast_ema),
                slow: last_or_nan(&m.slow_ema),
            };
            Ok(EvaluatedLine { values: m.macd, state })
        }
        LineSource::MacdSignal { fast, slow, signal } => {
            let m = indicators::macd(closes, fast, slow, signal, seed)?;
            let state = TailState::MacdSignal {
                fast: last_or_nan(&m.fast_ema),
                slow: last_or_nan(&m.slow_ema),
                signal: last_or_nan(&m.signal),
            };
            Ok(EvaluatedLine { values: m.signal, state })
        }
        LineSource::Sma { .. } | LineSource::Wma { .. } | LineSource::Hma { .. } => Ok(EvaluatedLine {
            values: source.compute(closes, seed)?,
            state: TailState::Window,
        }),
    }
}

/// The line's value at a hypothetical candle closing at `price`, appended to `closes`.
pub fn extend_line(source: &LineSource, state: &TailState, closes: &[f64], price: f64, seed: EmaSeed) -> f64 {
    advance_line(source, state, closes, price, seed).0
}

/// Like `extend_line`, but also returns the state once `price` is a sealed
/// close, so the next candle continues from it.
pub fn advance_line(
    source: &LineSource,
    state: &TailState,
    closes: &[f64],
    price: f64,
    seed: EmaSeed,
) -> (f64, TailState) {
    match (*source, *state) {
        (LineSource::Sma { period }, _) => (
            indicators::sma_last(&trailing(closes, period, price), period),
            TailState::Window,
        ),
        (LineSource::Wma { period }, _) => (
            indicators::wma_last(&trailing(closes, period, price), period),
            TailState::Window,
        ),
        (LineSource::Hma { period }, _) => {
            let span = period + sqrt_window(period.max(1)) - 1;
            (indicators::hma_last(&trailing(closes, span, price), period), TailState::Window)
        }
        (LineSource::Ema { period }, TailState::Ema { last }) if last.is_finite() => {
            let next = ema_step(last, price, smoothing(period));
            (next, TailState::Ema { last: next })
        }
        (LineSource::Tema { period }, TailState::Tema { e1, e2, e3 })
            if e1.is_finite() && e2.is_finite() && e3.is_finite() =>
        {
            let alpha = smoothing(period);
            let n1 = ema_step(e1, price, alpha);
            let n2 = ema_step(e2, n1, alpha);
            let n3 = ema_step(e3, n2, alpha);
            (combine(n1, n2, n3), TailState::Tema { e1: n1, e2: n2, e3: n3 })
        }
        (LineSource::MacdLine { fast: fp, slow: sp }, TailState::MacdLine { fast, slow })
            if fast.is_finite() && slow.is_finite() =>
        {
            let fast = ema_step(fast, price, smoothing(fp));
            let slow = ema_step(slow, price, smoothing(sp));
            (fast - slow, TailState::MacdLine { fast, slow })
        }
        (
            LineSource::MacdSignal {
                fast: fp,
                slow: sp,
                signal: gp,
            },
            TailState::MacdSignal { fast, slow, signal },
        ) if fast.is_finite() && slow.is_finite() && signal.is_finite() => {
            let fast = ema_step(fast, price, smoothing(fp));
            let slow = ema_step(slow, price, smoothing(sp));
            let signal = ema_step(signal, fast - slow, smoothing(gp));
            (signal, TailState::MacdSignal { fast, slow, signal })
        }
        // Still warming up: the new point may be the seed, so run the full pass.
        _ => full_recompute(source, state, closes, price, seed),
    }
}

fn trailing(closes: &[f64], span: usize, price: f64) -> Vec<f64> {
    let keep = span.saturating_sub(1).min(closes.len());
    let mut window = Vec::with_capacity(keep + 1);
    window.extend_from_slice(&closes[closes.len() - keep..]);
    window.push(price);
    window
}

fn full_recompute(source: &LineSource, state: &TailState, closes: &[f64], price: f64, seed: EmaSeed) -> (f64, TailState) {
    let mut extended = Vec::with_capacity(closes.len() + 1);
    extended.extend_from_slice(closes);
    extended.push(price);
    match evaluate_line(source, &extended, seed) {
        Ok(evaluated) => (last_or_nan(&evaluated.values), evaluated.state),
        Err(e) => {
            tracing::warn!(line = %source.label(), error = %e, "Tail evaluation failed");
            (f64::NAN, *state)
        }
    }
}
