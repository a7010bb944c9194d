//! Local candle cache port trait.

use crate::domain::candle::Candle;
use crate::domain::error::StockdashError;
use crate::domain::timeframe::Interval;
use chrono::NaiveDateTime;

/// (first candle time, last candle time, candle count)
pub type CachedRange = (NaiveDateTime, NaiveDateTime, usize);

pub trait CandleCache: Send + Sync {
    /// Inserts or replaces candles, returning how many rows were written.
    fn store_candles(
        &self,
        ticker: &str,
        interval: Interval,
        candles: &[Candle],
    ) -> Result<usize, StockdashError>;

    /// Candles for `ticker` in chronological order, optionally bounded (inclusive).
    fn load_candles(
        &self,
        ticker: &str,
        interval: Interval,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, StockdashError>;

    fn list_tickers(&self) -> Result<Vec<String>, StockdashError>;

    fn cached_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<CachedRange>, StockdashError>;
}
