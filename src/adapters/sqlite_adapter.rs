//! SQLite candle cache adapter.

use crate::domain::candle::Candle;
use crate::domain::error::StockdashError;
use crate::domain::timeframe::Interval;
use crate::ports::cache_port::{CachedRange, CandleCache};
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn db_err(e: r2d2::Error) -> StockdashError {
    StockdashError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> StockdashError {
    StockdashError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn to_stored(time: &NaiveDateTime) -> String {
    time.format(STORED_TIME_FORMAT).to_string()
}

fn from_stored(value: &str) -> Result<NaiveDateTime, StockdashError> {
    NaiveDateTime::parse_from_str(value, STORED_TIME_FORMAT).map_err(|e| {
        StockdashError::Database {
            reason: format!("corrupt candle time {:?}: {}", value, e),
        }
    })
}

impl SqliteAdapter {
    /// Opens (creating if needed) the cache file and its schema.
    pub fn open(path: &str, pool_size: u32) -> Result<Self, StockdashError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(db_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, StockdashError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(db_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StockdashError> {
        self.pool.get().map_err(db_err)
    }

    pub fn initialize_schema(&self) -> Result<(), StockdashError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS candles (
                    ticker TEXT NOT NULL,
                    interval TEXT NOT NULL,
                    time TEXT NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (ticker, interval, time)
                );
                CREATE INDEX IF NOT EXISTS idx_candles_ticker ON candles(ticker, interval);",
            )
            .map_err(query_err)
    }
}

impl CandleCache for SqliteAdapter {
    fn store_candles(
        &self,
        ticker: &str,
        interval: Interval,
        candles: &[Candle],
    ) -> Result<usize, StockdashError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO candles
                        (ticker, interval, time, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )
                .map_err(query_err)?;

            for candle in candles {
                stmt.execute(params![
                    ticker,
                    interval.as_str(),
                    to_stored(&candle.time),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume
                ])
                .map_err(query_err)?;
            }
        }

        tx.commit().map_err(query_err)?;
        Ok(candles.len())
    }

    fn load_candles(
        &self,
        ticker: &str,
        interval: Interval,
        from: Option<NaiveDateTime>,
        to: Option<NaiveDateTime>,
    ) -> Result<Vec<Candle>, StockdashError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT time, open, high, low, close, volume
                 FROM candles
                 WHERE ticker = ?1 AND interval = ?2
                   AND (?3 IS NULL OR time >= ?3)
                   AND (?4 IS NULL OR time <= ?4)
                 ORDER BY time ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map(
                params![
                    ticker,
                    interval.as_str(),
                    from.as_ref().map(to_stored),
                    to.as_ref().map(to_stored)
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, f64>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .map_err(query_err)?;

        let mut candles = Vec::new();
        for row in rows {
            let (time, open, high, low, close, volume) = row.map_err(query_err)?;
            candles.push(Candle {
                time: from_stored(&time)?,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(candles)
    }

    fn list_tickers(&self) -> Result<Vec<String>, StockdashError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT ticker FROM candles ORDER BY ticker")
            .map_err(query_err)?;
        let rows = stmt.query_map([], |row| row.get(0)).map_err(query_err)?;

        let mut tickers = Vec::new();
        for row in rows {
            tickers.push(row.map_err(query_err)?);
        }
        Ok(tickers)
    }

    fn cached_range(
        &self,
        ticker: &str,
        interval: Interval,
    ) -> Result<Option<CachedRange>, StockdashError> {
        let conn = self.conn()?;
        let result: (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(time), MAX(time), COUNT(*) FROM candles WHERE ticker = ?1 AND interval = ?2",
                params![ticker, interval.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_err)?;

        match result {
            (Some(min), Some(max), count) if count > 0 => {
                Ok(Some((from_stored(&min)?, from_stored(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}
