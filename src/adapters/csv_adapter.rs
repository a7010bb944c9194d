//! CSV candle file adapter.
//!
//! Expects a header row naming `time` (or `date`), `open`, `high`, `low`,
//! `close` and `volume` columns in any order. Rows are returned sorted by time.

use crate::domain::candle::{Candle, parse_time};
use crate::domain::error::StockdashError;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
}

impl CsvAdapter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn read_candles(&self) -> Result<Vec<Candle>, StockdashError> {
        let file = File::open(&self.path).map_err(|e| StockdashError::Csv {
            file: self.path.display().to_string(),
            line: 0,
            reason: format!("cannot open: {}", e),
        })?;
        parse_candles(&self.path.display().to_string(), file)
    }
}

/// Parses candle rows from any reader; `name` labels errors.
pub fn parse_candles<R: Read>(name: &str, reader: R) -> Result<Vec<Candle>, StockdashError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| csv_error(name, 1, format!("unreadable header: {}", e)))?
        .clone();
    let columns = locate_columns(&headers).map_err(|reason| csv_error(name, 1, reason))?;

    let mut candles = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            csv_error(name, line, e.to_string())
        })?;
        let row = Row {
            name,
            line: record.position().map(|p| p.line()).unwrap_or(0),
            record: &record,
        };

        let raw_time = row.field(columns.time, "time")?;
        let time = parse_time(raw_time)
            .ok_or_else(|| row.error(format!("invalid time {:?}", raw_time)))?;

        let volume = match columns.volume {
            Some(idx) if row.record.get(idx).is_some_and(|v| !v.is_empty()) => {
                row.number(idx, "volume")?.round() as i64
            }
            _ => 0,
        };

        candles.push(Candle {
            time,
            open: row.number(columns.open, "open")?,
            high: row.number(columns.high, "high")?,
            low: row.number(columns.low, "low")?,
            close: row.number(columns.close, "close")?,
            volume,
        });
    }

    candles.sort_by_key(|c| c.time);
    Ok(candles)
}

fn csv_error(name: &str, line: u64, reason: String) -> StockdashError {
    StockdashError::Csv {
        file: name.to_string(),
        line,
        reason,
    }
}

struct Row<'a> {
    name: &'a str,
    line: u64,
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    fn error(&self, reason: String) -> StockdashError {
        csv_error(self.name, self.line, reason)
    }

    fn field(&self, idx: usize, column: &str) -> Result<&'a str, StockdashError> {
        self.record
            .get(idx)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| self.error(format!("missing {} value", column)))
    }

    fn number(&self, idx: usize, column: &str) -> Result<f64, StockdashError> {
        let raw = self.field(idx, column)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| self.error(format!("invalid {} value {:?}", column, raw)))
    }
}

fn locate_columns(headers: &csv::StringRecord) -> Result<Columns, String> {
    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let require =
        |names: &[&str]| find(names).ok_or_else(|| format!("missing {} column", names[0]));

    Ok(Columns {
        time: require(&["time", "date", "datetime", "timestamp"])?,
        open: require(&["open"])?,
        high: require(&["high"])?,
        low: require(&["low"])?,
        close: require(&["close"])?,
        volume: find(&["volume"]),
    })
}
