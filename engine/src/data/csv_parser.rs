// CSV candle files: `time,open,high,low,close[,volume]`
use super::candle_buffer::normalize;
use super::source::CandleSource;
use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord};
use shared::models::{Candle, SessionKey};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

pub mod time_format {
    use chrono::DateTime;

    /// Unix seconds (`1700000000`) or RFC 3339 (`2023-11-14T22:13:20Z`).
    pub fn parse_time(s: &str) -> Result<i64, String> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<i64>() {
            return Ok(secs);
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp())
            .map_err(|e| format!("Failed to parse time '{}': {}", s, e))
    }

}

pub struct CandleCsvParser;

impl CandleCsvParser {
    pub fn load_candles_from_csv(file_path: &Path) -> EngineResult<Vec<Candle>> {
        let file = File::open(file_path)?;
        Self::parse(BufReader::new(file))
    }

    pub fn parse<R: Read>(reader: R) -> EngineResult<Vec<Candle>> {
        let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let mut candles = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;

            let time_str = Self::required(&record, &headers, "time", line)?;
            let time = time_format::parse_time(time_str)
                .map_err(|e| EngineError::CsvDataFormatError(format!("Error parsing 'time' at line {}: {}", line, e)))?;
            let open = Self::number(&record, &headers, "open", line)?;
            let high = Self::number(&record, &headers, "high", line)?;
            let low = Self::number(&record, &headers, "low", line)?;
            let close = Self::number(&record, &headers, "close", line)?;
            let volume = match Self::get_field(&record, &headers, "volume") {
                Some(v) if !v.is_empty() => Self::parse_number(v, "volume", line)?,
                _ => 0.0,
            };

            let candle = Candle {
                time,
                open,
                high,
                low,
                close,
                volume,
            };
            if !candle.is_well_formed() {
                return Err(EngineError::CsvDataFormatError(format!(
                    "Inconsistent OHLC at line {}: low {} / high {} must bracket open {} and close {}",
                    line, low, high, open, close
                )));
            }
            candles.push(candle);
        }
        Ok(candles)
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }

    fn required<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str, line: usize) -> EngineResult<&'a str> {
        Self::get_field(record, headers, name)
            .ok_or_else(|| EngineError::CsvDataFormatError(format!("Missing '{}' field in CSV record at line {}", name, line)))
    }

    fn number(record: &StringRecord, headers: &StringRecord, name: &str, line: usize) -> EngineResult<f64> {
        Self::parse_number(Self::required(record, headers, name, line)?, name, line)
    }

    fn parse_number(s: &str, name: &str, line: usize) -> EngineResult<f64> {
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            Ok(_) => Err(EngineError::CsvDataFormatError(format!(
                "Error parsing '{}' at line {}: non-finite value '{}'",
                name, line, s
            ))),
            Err(e) => Err(EngineError::CsvDataFormatError(format!(
                "Error parsing '{}' at line {}: Failed to parse decimal '{}': {}",
                name, line, s, e
            ))),
        }
    }
}

/// Reads `<dir>/<PAIR>-<BASE>-<interval>.csv` for each history request.
#[derive(Debug, Clone)]
pub struct CsvCandleSource {
    dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvCandleSource { dir: dir.into() }
    }

    pub fn path_for(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(format!("{}-{}-{}.csv", key.pair, key.base, key.interval))
    }
}

#[async_trait]
impl CandleSource for CsvCandleSource {
    async fn fetch_history(&self, key: &SessionKey) -> EngineResult<Vec<Candle>> {
        let path = self.path_for(key);
        let interval = key.interval;
        tracing::debug!(path = %path.display(), "Reading candle history from CSV");

        let candles = tokio::task::spawn_blocking(move || CandleCsvParser::load_candles_from_csv(&path))
            .await
            .map_err(|e| EngineError::ChannelClosed(format!("CSV reader task failed: {}", e)))??;

        if let Some(bad) = candles.iter().find(|c| !interval.is_aligned(c.time)) {
            return Err(EngineError::CsvDataFormatError(format!(
                "Candle time {} is not aligned to the {} interval",
                bad.time, interval
            )));
        }
        Ok(normalize(candles))
    }
}
