// Strategy descriptors: which two lines a strategy draws and how their
// relationship turns into signals.
pub mod catalog;

pub use catalog::StrategyCatalog;

use crate::error::{EngineError, EngineResult};
use crate::indicators::{self, EmaSeed, IndicatorCalculator};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the fast/slow pair is compared by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// No lines, no signals.
    None,
    /// Fast line crossing the slow line.
    MaCross,
    /// Histogram (fast - slow) crossing zero.
    MacdCross,
}

/// The numeric recipe behind one indicator line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineSource {
    Sma { period: usize },
    Ema { period: usize },
    Wma { period: usize },
    Hma { period: usize },
    Tema { period: usize },
    MacdLine { fast: usize, slow: usize },
    MacdSignal { fast: usize, slow: usize, signal: usize },
}

impl LineSource {
    pub fn validate(&self) -> EngineResult<()> {
        match *self {
            LineSource::MacdLine { fast, slow } => {
                indicators::macd::check_macd_periods(fast, slow, indicators::macd::DEFAULT_SIGNAL)
            }
            LineSource::MacdSignal { fast, slow, signal } => indicators::macd::check_macd_periods(fast, slow, signal),
            _ => self.calculator(EmaSeed::default()).map(|_| ()),
        }
    }

    /// A boxed calculator for the single-pass averages. MACD lines are
    /// derived from one shared MACD computation instead.
    pub fn calculator(&self, seed: EmaSeed) -> EngineResult<Box<dyn IndicatorCalculator>> {
        Ok(match *self {
            LineSource::Sma { period } => Box::new(indicators::Sma::new(period)?),
            LineSource::Ema { period } => Box::new(indicators::Ema::new(period, seed)?),
            LineSource::Wma { period } => Box::new(indicators::Wma::new(period)?),
            LineSource::Hma { period } => Box::new(indicators::Hma::new(period)?),
            LineSource::Tema { period } => Box::new(indicators::Tema::new(period, seed)?),
            LineSource::MacdLine { .. } | LineSource::MacdSignal { .. } => {
                return Err(EngineError::invalid("MACD lines have no standalone calculator"))
            }
        })
    }

    pub fn compute(&self, closes: &[f64], seed: EmaSeed) -> EngineResult<Vec<f64>> {
        match *self {
            LineSource::MacdLine { fast, slow } => {
                Ok(indicators::macd(closes, fast, slow, indicators::macd::DEFAULT_SIGNAL, seed)?.macd)
            }
            LineSource::MacdSignal { fast, slow, signal } => Ok(indicators::macd(closes, fast, slow, signal, seed)?.signal),
            _ => Ok(self.calculator(seed)?.calculate(closes)),
        }
    }

    pub fn label(&self) -> String {
        match *self {
            LineSource::Sma { period } => format!("SMA({})", period),
            LineSource::Ema { period } => format!("EMA({})", period),
            LineSource::Wma { period } => format!("WMA({})", period),
            LineSource::Hma { period } => format!("HMA({})", period),
            LineSource::Tema { period } => format!("TEMA({})", period),
            LineSource::MacdLine { fast, slow } => format!("MACD({},{})", fast, slow),
            LineSource::MacdSignal { fast, slow, signal } => format!("Signal({},{},{})", fast, slow, signal),
        }
    }

    pub fn parameters(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One line a strategy needs, with the name it is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpec {
    pub name: String,
    pub source: LineSource,
}

impl LineSpec {
    pub fn new(name: &str, source: LineSource) -> Self {
        Self {
            name: name.to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePair {
    pub fast: LineSpec,
    pub slow: LineSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub kind: StrategyKind,
    #[serde(default)]
    pub lines: Option<LinePair>,
}

/// Both lines of a strategy evaluated over one close series.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedLines {
    pub fast: Vec<f64>,
    pub slow: Vec<f64>,
}

impl StrategyDescriptor {
    pub fn none() -> Self {
        Self {
            id: catalog::NONE_ID.to_string(),
            display_name: "None".to_string(),
            description: "No indicators".to_string(),
            kind: StrategyKind::None,
            lines: None,
        }
    }

    pub fn crossover(id: &str, display_name: &str, description: &str, kind: StrategyKind, fast: LineSpec, slow: LineSpec) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            kind,
            lines: Some(LinePair { fast, slow }),
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == StrategyKind::None
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.id.trim().is_empty() {
            return Err(EngineError::invalid("strategy id must not be empty"));
        }
        match (&self.kind, &self.lines) {
            (StrategyKind::None, None) => Ok(()),
            (StrategyKind::None, Some(_)) => Err(EngineError::invalid(format!(
                "strategy '{}' of kind none must not declare lines",
                self.id
            ))),
            (_, None) => Err(EngineError::invalid(format!("strategy '{}' needs a fast and a slow line", self.id))),
            (_, Some(pair)) => {
                if pair.fast.name == pair.slow.name {
                    return Err(EngineError::invalid(format!(
                        "strategy '{}' uses the line name '{}' twice",
                        self.id, pair.fast.name
                    )));
                }
                pair.fast.source.validate()?;
                pair.slow.source.validate()
            }
        }
    }

    /// Evaluates the fast and slow lines; `None` for the `none` strategy.
    pub fn compute_lines(&self, closes: &[f64], seed: EmaSeed) -> EngineResult<Option<ComputedLines>> {
        let Some(pair) = &self.lines else {
            return Ok(None);
        };
        Ok(Some(ComputedLines {
            fast: pair.fast.source.compute(closes, seed)?,
            slow: pair.slow.source.compute(closes, seed)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_source_compute_matches_indicators() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let sma = LineSource::Sma { period: 5 }.compute(&closes, EmaSeed::FirstValue).unwrap();
        assert_eq!(sma, indicators::sma(&closes, 5).unwrap());
        let signal = LineSource::MacdSignal { fast: 3, slow: 6, signal: 4 }
            .compute(&closes, EmaSeed::FirstValue)
            .unwrap();
        assert_eq!(signal, indicators::macd(&closes, 3, 6, 4, EmaSeed::FirstValue).unwrap().signal);
    }

    #[test]
    fn test_line_source_serde_shape() {
        let json = serde_json::to_value(LineSource::Ema { period: 9 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ema", "period": 9}));
        let back: LineSource = serde_json::from_str(r#"{"type":"macd_signal","fast":12,"slow":26,"signal":9}"#).unwrap();
        assert_eq!(back, LineSource::MacdSignal { fast: 12, slow: 26, signal: 9 });
    }

    #[test]
    fn test_line_source_labels() {
        assert_eq!(LineSource::Hma { period: 9 }.label(), "HMA(9)");
        assert_eq!(LineSource::MacdLine { fast: 12, slow: 26 }.label(), "MACD(12,26)");
    }

    #[test]
    fn test_validate_rejects_bad_periods() {
        assert!(LineSource::Sma { period: 0 }.validate().is_err());
        assert!(LineSource::Hma { period: 1 }.validate().is_err());
        assert!(LineSource::MacdLine { fast: 26, slow: 12 }.validate().is_err());
        assert!(LineSource::Tema { period: 7 }.validate().is_ok());
    }

    #[test]
    fn test_descriptor_validation() {
        assert!(StrategyDescriptor::none().validate().is_ok());

        let mut bad = StrategyDescriptor::none();
        bad.kind = StrategyKind::MaCross;
        assert!(bad.validate().is_err());

        let same_names = StrategyDescriptor::crossover(
            "dup",
            "Dup",
            "",
            StrategyKind::MaCross,
            LineSpec::new("line", LineSource::Sma { period: 2 }),
            LineSpec::new("line", LineSource::Sma { period: 3 }),
        );
        assert!(same_names.validate().is_err());
    }

    #[test]
    fn test_none_strategy_computes_nothing() {
        let lines = StrategyDescriptor::none().compute_lines(&[1.0, 2.0], EmaSeed::FirstValue).unwrap();
        assert!(lines.is_none());
    }
}
