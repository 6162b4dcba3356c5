// Static table of strategies. Built once and handed to whoever needs it;
// there is no global registry to mutate.
use super::{LineSource, LineSpec, StrategyDescriptor, StrategyKind};
use crate::error::{EngineError, EngineResult};
use std::collections::HashSet;

pub const NONE_ID: &str = "none";

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyCatalog {
    entries: Vec<StrategyDescriptor>,
}

impl StrategyCatalog {
    pub fn builtin() -> Self {
        let entries = vec![
            StrategyDescriptor::none(),
            StrategyDescriptor::crossover(
                "sma_crossover",
                "SMA Crossover",
                "Short SMA (10) crossing long SMA (20)",
                StrategyKind::MaCross,
                LineSpec::new("Short SMA", LineSource::Sma { period: 10 }),
                LineSpec::new("Long SMA", LineSource::Sma { period: 20 }),
            ),
            StrategyDescriptor::crossover(
                "ema_crossover",
                "EMA Crossover",
                "Fast EMA (9) crossing slow EMA (21)",
                StrategyKind::MaCross,
                LineSpec::new("Fast EMA (9)", LineSource::Ema { period: 9 }),
                LineSpec::new("Slow EMA (21)", LineSource::Ema { period: 21 }),
            ),
            StrategyDescriptor::crossover(
                "tema_crossover",
                "Triple EMA Crossover",
                "Triple EMA fast (7) crossing Triple EMA slow (21)",
                StrategyKind::MaCross,
                LineSpec::new("Fast TEMA", LineSource::Tema { period: 7 }),
                LineSpec::new("Slow TEMA", LineSource::Tema { period: 21 }),
            ),
            StrategyDescriptor::crossover(
                "hma_crossover",
                "Hull MA Crossover",
                "Hull MA fast (9) crossing Hull MA slow (21)",
                StrategyKind::MaCross,
                LineSpec::new("Fast HMA", LineSource::Hma { period: 9 }),
                LineSpec::new("Slow HMA", LineSource::Hma { period: 21 }),
            ),
            StrategyDescriptor::crossover(
                "macd",
                "MACD Histogram Cross",
                "MACD (12, 26) histogram crossing zero against its 9-period signal",
                StrategyKind::MacdCross,
                LineSpec::new("MACD", LineSource::MacdLine { fast: 12, slow: 26 }),
                LineSpec::new("MACD Signal", LineSource::MacdSignal { fast: 12, slow: 26, signal: 9 }),
            ),
        ];
        Self { entries }
    }

    /// Built-ins plus `extra`. An extra entry with a built-in id replaces it;
    /// `none` cannot be replaced.
    pub fn with_extra(extra: Vec<StrategyDescriptor>) -> EngineResult<Self> {
        let mut catalog = Self::builtin();
        let mut seen = HashSet::new();
        for descriptor in extra {
            descriptor.validate()?;
            if descriptor.id == NONE_ID {
                return Err(EngineError::invalid("the 'none' strategy cannot be redefined"));
            }
            if !seen.insert(descriptor.id.clone()) {
                return Err(EngineError::invalid(format!("duplicate strategy id '{}'", descriptor.id)));
            }
            match catalog.entries.iter_mut().find(|d| d.id == descriptor.id) {
                Some(existing) => *existing = descriptor,
                None => catalog.entries.push(descriptor),
            }
        }
        Ok(catalog)
    }

    pub fn list(&self) -> &[StrategyDescriptor] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> EngineResult<&StrategyDescriptor> {
        self.entries
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| EngineError::invalid(format!("unknown strategy '{}'", id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|d| d.id == id)
    }
}

impl Default for StrategyCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entries_are_valid() {
        let catalog = StrategyCatalog::builtin();
        for descriptor in catalog.list() {
            descriptor.validate().unwrap();
        }
        let ids: Vec<&str> = catalog.list().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["none", "sma_crossover", "ema_crossover", "tema_crossover", "hma_crossover", "macd"]);
    }

    #[test]
    fn test_get_and_unknown_id() {
        let catalog = StrategyCatalog::builtin();
        assert_eq!(catalog.get("macd").unwrap().kind, StrategyKind::MacdCross);
        assert!(catalog.get(NONE_ID).unwrap().is_none());
        let err = catalog.get("rsi_divergence").unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn test_with_extra_adds_and_replaces() {
        let custom = StrategyDescriptor::crossover(
            "wma_crossover",
            "WMA Crossover",
            "",
            StrategyKind::MaCross,
            LineSpec::new("Fast WMA", LineSource::Wma { period: 5 }),
            LineSpec::new("Slow WMA", LineSource::Wma { period: 15 }),
        );
        let faster_ema = StrategyDescriptor::crossover(
            "ema_crossover",
            "EMA Crossover",
            "",
            StrategyKind::MaCross,
            LineSpec::new("Fast EMA (5)", LineSource::Ema { period: 5 }),
            LineSpec::new("Slow EMA (13)", LineSource::Ema { period: 13 }),
        );
        let catalog = StrategyCatalog::with_extra(vec![custom, faster_ema]).unwrap();
        assert!(catalog.contains("wma_crossover"));
        assert_eq!(catalog.list().len(), 7);
        let ema = catalog.get("ema_crossover").unwrap();
        assert_eq!(ema.lines.as_ref().unwrap().fast.source, LineSource::Ema { period: 5 });
    }

    #[test]
    fn test_with_extra_rejects_none_and_duplicates() {
        assert!(StrategyCatalog::with_extra(vec![StrategyDescriptor::none()]).is_err());

        let d = StrategyDescriptor::crossover(
            "x",
            "X",
            "",
            StrategyKind::MaCross,
            LineSpec::new("a", LineSource::Sma { period: 2 }),
            LineSpec::new("b", LineSource::Sma { period: 4 }),
        );
        assert!(StrategyCatalog::with_extra(vec![d.clone(), d]).is_err());
    }
}
