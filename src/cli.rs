//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::backend_http::BackendHttpAdapter;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::Analysis;
use crate::domain::candle::{Candle, format_time};
use crate::domain::config_validation::{DEFAULT_LOG_FILTER, DashboardSettings};
use crate::domain::error::StockdashError;
use crate::domain::indicator::IndicatorValue;
use crate::domain::sentiment::score_text;
use crate::domain::timeframe::{Interval, Period, normalize_ticker};
use crate::ports::cache_port::CandleCache;
use crate::ports::config_port::ConfigPort;
use crate::service::DashboardService;

#[derive(Parser, Debug)]
#[command(name = "stockdash", about = "Stock dashboard analytics and live price relay")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print indicators, risk, insight and forecast for a ticker
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: String,
        /// Read candles from a CSV file instead of the backend
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value = "6mo")]
        period: String,
        #[arg(long, default_value = "1d")]
        interval: String,
        #[arg(long)]
        json: bool,
    },
    /// Load candles from a CSV file into the local cache
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: String,
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "1d")]
        interval: String,
    },
    /// Show cached data range per ticker
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        ticker: Option<String>,
        #[arg(long, default_value = "1d")]
        interval: String,
    },
    /// Poll live prices and print each update
    Watch {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Score a headline with the news sentiment scorer
    Sentiment {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Start the dashboard web API
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a dashboard configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        match &self.command {
            Command::Analyze { config, .. }
            | Command::Import { config, .. }
            | Command::Info { config, .. }
            | Command::Watch { config }
            | Command::Serve { config }
            | Command::Validate { config } => Some(config),
            Command::Sentiment { .. } => None,
        }
    }
}

/// The `[log] filter` directive of the command's config file, if readable.
pub fn log_filter(cli: &Cli) -> String {
    cli.config_path()
        .and_then(|path| FileConfigAdapter::from_file(path).ok())
        .and_then(|config| config.get_string("log", "filter"))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Analyze {
            config,
            ticker,
            csv,
            period,
            interval,
            json,
        } => run_analyze(&config, &ticker, csv.as_deref(), &period, &interval, json),
        Command::Import {
            config,
            ticker,
            csv,
            interval,
        } => run_import(&config, &ticker, &csv, &interval),
        Command::Info {
            config,
            ticker,
            interval,
        } => run_info(&config, ticker.as_deref(), &interval),
        Command::Watch { config } => run_watch(&config),
        Command::Sentiment { text } => run_sentiment(&text.join(" ")),
        Command::Serve { config } => run_serve(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

fn fail(err: &StockdashError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Loads and validates the dashboard settings from an INI file.
pub fn load_settings(path: &Path) -> Result<DashboardSettings, ExitCode> {
    eprintln!("Loading config from {}", path.display());
    let config = load_config(path)?;
    DashboardSettings::load(&config).map_err(|e| fail(&e))
}

fn runtime() -> Result<tokio::runtime::Runtime, ExitCode> {
    tokio::runtime::Runtime::new().map_err(|e| fail(&StockdashError::Io(e)))
}

/// Opens the candle cache when one is configured.
pub fn open_cache(
    settings: &DashboardSettings,
) -> Result<Option<Arc<dyn CandleCache>>, StockdashError> {
    let Some(path) = settings.cache_path.as_deref() else {
        return Ok(None);
    };

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteAdapter;
        let cache: Arc<dyn CandleCache> =
            Arc::new(SqliteAdapter::open(path, settings.cache_pool_size)?);
        Ok(Some(cache))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        tracing::warn!(path, "sqlite feature disabled, ignoring [cache] path");
        Ok(None)
    }
}

fn require_cache(settings: &DashboardSettings) -> Result<Arc<dyn CandleCache>, StockdashError> {
    open_cache(settings)?.ok_or_else(|| StockdashError::ConfigMissing {
        section: "cache".into(),
        key: "path".into(),
    })
}

pub fn build_service(settings: &DashboardSettings) -> Result<DashboardService, StockdashError> {
    let market = Arc::new(BackendHttpAdapter::from_settings(settings)?);
    let cache = open_cache(settings)?;
    Ok(DashboardService::new(market, cache, settings.analysis))
}

fn run_analyze(
    config_path: &Path,
    ticker: &str,
    csv_path: Option<&Path>,
    period: &str,
    interval: &str,
    json: bool,
) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let analysis = match csv_path {
        Some(path) => analyze_csv(ticker, path, &settings),
        None => analyze_backend(ticker, period, interval, &settings),
    };
    let analysis = match analysis {
        Ok(a) => a,
        Err(code) => return code,
    };

    if json {
        match serde_json::to_string_pretty(&analysis) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::from(1);
            }
        }
    } else {
        print!("{}", render_analysis(&analysis));
    }
    ExitCode::SUCCESS
}

fn analyze_csv(
    ticker: &str,
    path: &Path,
    settings: &DashboardSettings,
) -> Result<Analysis, ExitCode> {
    let ticker = normalize_ticker(ticker).map_err(|e| fail(&e))?;
    eprintln!("Reading candles from {}", path.display());
    let candles = CsvAdapter::new(path).read_candles().map_err(|e| fail(&e))?;
    Analysis::build(&ticker, &candles, &settings.analysis).map_err(|e| fail(&e))
}

fn analyze_backend(
    ticker: &str,
    period: &str,
    interval: &str,
    settings: &DashboardSettings,
) -> Result<Analysis, ExitCode> {
    let period: Period = period.parse().map_err(|e| fail(&e))?;
    let interval: Interval = interval.parse().map_err(|e| fail(&e))?;
    let service = build_service(settings).map_err(|e| fail(&e))?;
    let rt = runtime()?;

    eprintln!("Fetching {} history ({period}, {interval})...", ticker);
    rt.block_on(service.analysis(ticker, period, interval))
        .map_err(|e| fail(&e))
}

fn format_value(value: &IndicatorValue) -> String {
    match *value {
        IndicatorValue::Simple(v) => format!("{v:.2}"),
        IndicatorValue::Macd {
            line,
            signal,
            histogram,
        } => format!("line={line:.4} signal={signal:.4} hist={histogram:.4}"),
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } => format!("upper={upper:.2} middle={middle:.2} lower={lower:.2}"),
    }
}

/// Human-readable report of an analysis.
pub fn render_analysis(analysis: &Analysis) -> String {
    let mut out = String::new();
    let risk = &analysis.risk;
    let insight = &analysis.insight;

    let _ = writeln!(
        out,
        "{}: {} candles, {} to {}",
        analysis.ticker,
        analysis.candles,
        format_time(&analysis.from),
        format_time(&analysis.to)
    );
    let _ = writeln!(out, "Last close: {:.2}", analysis.last_close);

    let _ = writeln!(out, "\nIndicators:");
    if analysis.indicators.is_empty() {
        let _ = writeln!(out, "  (not enough candles)");
    }
    for (name, value) in &analysis.indicators {
        let _ = writeln!(out, "  {:<16} {}", name, format_value(value));
    }

    let _ = writeln!(out, "\nRisk:");
    let _ = writeln!(out, "  Total return:       {:.2}%", risk.total_return * 100.0);
    let _ = writeln!(out, "  Annualized return:  {:.2}%", risk.annualized_return * 100.0);
    let _ = writeln!(out, "  Volatility:         {:.2}%", risk.volatility * 100.0);
    let _ = writeln!(
        out,
        "  VaR ({:.0}%):          {:.2}%",
        risk.var_confidence * 100.0,
        risk.value_at_risk * 100.0
    );
    let _ = writeln!(out, "  Sharpe ratio:       {:.3}", risk.sharpe_ratio);
    let _ = writeln!(out, "  Sortino ratio:      {:.3}", risk.sortino_ratio);
    let _ = writeln!(
        out,
        "  Max drawdown:       {:.2}% ({} candles)",
        risk.max_drawdown * 100.0,
        risk.max_drawdown_duration
    );

    let _ = writeln!(
        out,
        "\nInsight: {} (score {:.1}, confidence {:.2})",
        insight.sentiment, insight.score, insight.confidence
    );
    let _ = writeln!(out, "  {}", insight.summary);

    match &analysis.forecast {
        Some(f) => {
            let preds: Vec<String> = f.predictions.iter().map(|p| format!("{p:.2}")).collect();
            let _ = writeln!(
                out,
                "\nForecast ({} steps, R^2 {:.3}): {}",
                f.predictions.len(),
                f.r_squared,
                preds.join(", ")
            );
        }
        None => {
            let _ = writeln!(out, "\nForecast: unavailable");
        }
    }
    out
}

/// Reads a CSV file and stores its candles in `cache`.
pub fn import_csv(
    cache: &dyn CandleCache,
    ticker: &str,
    interval: Interval,
    path: &Path,
) -> Result<usize, StockdashError> {
    let ticker = normalize_ticker(ticker)?;
    let candles: Vec<Candle> = CsvAdapter::new(path).read_candles()?;
    if candles.is_empty() {
        return Err(StockdashError::NoData { ticker });
    }
    cache.store_candles(&ticker, interval, &candles)
}

fn run_import(config_path: &Path, ticker: &str, csv_path: &Path, interval: &str) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let result = interval
        .parse::<Interval>()
        .and_then(|interval| {
            let cache = require_cache(&settings)?;
            import_csv(cache.as_ref(), ticker, interval, csv_path)
        });
    match result {
        Ok(n) => {
            eprintln!("Imported {} candles for {}", n, ticker.to_uppercase());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_info(config_path: &Path, ticker: Option<&str>, interval: &str) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let interval: Interval = match interval.parse() {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };
    let cache = match require_cache(&settings) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let tickers = match ticker {
        Some(t) => match normalize_ticker(t) {
            Ok(t) => vec![t],
            Err(e) => return fail(&e),
        },
        None => match cache.list_tickers() {
            Ok(t) => t,
            Err(e) => return fail(&e),
        },
    };
    if tickers.is_empty() {
        eprintln!("cache is empty");
    }

    for t in &tickers {
        match cache.cached_range(t, interval) {
            Ok(Some((first, last, count))) => println!(
                "{} [{}]: {} candles, {} to {}",
                t,
                interval,
                count,
                format_time(&first),
                format_time(&last)
            ),
            Ok(None) => eprintln!("{} [{}]: no data found", t, interval),
            Err(e) => eprintln!("error querying {}: {}", t, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_watch(config_path: &Path) -> ExitCode {
    use crate::adapters::price_feed::{FeedEvent, PriceFeed};
    use crate::domain::quote::LiveBook;
    use std::time::Duration;
    use tokio::sync::{RwLock, broadcast, watch};

    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };
    let market = match BackendHttpAdapter::from_settings(&settings) {
        Ok(m) => Arc::new(m),
        Err(e) => return fail(&e),
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(code) => return code,
    };

    let book = Arc::new(RwLock::new(LiveBook::new(settings.tickers.clone())));
    let feed = Arc::new(
        PriceFeed::new(
            market,
            book,
            Duration::from_secs(settings.poll_interval_secs),
            64,
        )
        .with_alerts(settings.check_alerts),
    );
    eprintln!(
        "Watching {} (every {}s, Ctrl-C to stop)",
        settings.tickers.join(","),
        settings.poll_interval_secs
    );

    rt.block_on(async {
        let mut rx = feed.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);
        let runner = {
            let feed = Arc::clone(&feed);
            tokio::spawn(async move { feed.run(stop_rx).await })
        };

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(FeedEvent::StatsUpdate(stats)) => {
                        for (ticker, q) in &stats {
                            println!(
                                "{} {:<6} {:>10.2} {:>+8.2} ({:+.2}%)",
                                format_time(&q.updated_at),
                                ticker,
                                q.price,
                                q.change(),
                                q.change_percent()
                            );
                        }
                    }
                    Ok(FeedEvent::AlertTriggered(hit)) => {
                        println!(
                            "{} ALERT  {:<6} {} {} (now {:.2})",
                            format_time(&hit.at),
                            hit.alert.ticker,
                            hit.alert.alert_type,
                            hit.alert.threshold_value,
                            hit.value
                        );
                    }
                    Ok(FeedEvent::PriceUpdate(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        let _ = stop_tx.send(true);
        let _ = runner.await;
    });
    ExitCode::SUCCESS
}

fn run_sentiment(text: &str) -> ExitCode {
    let scored = score_text(text);
    println!(
        "{} (score {:.2}, {} positive / {} negative keywords)",
        scored.label, scored.score, scored.positive_hits, scored.negative_hits
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let settings = match load_settings(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    eprintln!("  backend:   {}", settings.base_url);
    eprintln!(
        "  token:     {}",
        if settings.access_token.is_some() {
            "configured"
        } else {
            "none"
        }
    );
    eprintln!("  tickers:   {}", settings.tickers.join(","));
    eprintln!("  poll:      {}s", settings.poll_interval_secs);
    eprintln!(
        "  alerts:    {}",
        if settings.check_alerts { "checked" } else { "off" }
    );
    eprintln!(
        "  cache:     {}",
        settings.cache_path.as_deref().unwrap_or("disabled")
    );
    eprintln!("  listen:    {}", settings.listen);
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_serve(config_path: &Path) -> ExitCode {
    #[cfg(feature = "web")]
    {
        use crate::adapters::price_feed::PriceFeed;
        use crate::adapters::web::{AppState, build_router};
        use crate::domain::quote::LiveBook;
        use std::net::SocketAddr;
        use std::time::Duration;
        use tokio::sync::{RwLock, watch};

        let settings = match load_settings(config_path) {
            Ok(s) => s,
            Err(code) => return code,
        };
        let addr: SocketAddr = match settings.listen.parse() {
            Ok(a) => a,
            Err(_) => {
                return fail(&StockdashError::ConfigInvalid {
                    section: "web".into(),
                    key: "listen".into(),
                    reason: format!("not a socket address: {}", settings.listen),
                });
            }
        };
        let market = match BackendHttpAdapter::from_settings(&settings) {
            Ok(m) => Arc::new(m),
            Err(e) => return fail(&e),
        };
        let cache = match open_cache(&settings) {
            Ok(c) => c,
            Err(e) => return fail(&e),
        };
        let rt = match runtime() {
            Ok(rt) => rt,
            Err(code) => return code,
        };

        let book = Arc::new(RwLock::new(LiveBook::new(settings.tickers.clone())));
        let feed = Arc::new(
            PriceFeed::new(
                market.clone(),
                Arc::clone(&book),
                Duration::from_secs(settings.poll_interval_secs),
                64,
            )
            .with_alerts(settings.check_alerts),
        );
        let state = AppState {
            service: Arc::new(DashboardService::new(market, cache, settings.analysis)),
            book,
            feed: feed.sender(),
        };
        let router = build_router(state);

        eprintln!("Starting web server on {}", addr);
        let served = rt.block_on(async {
            let (stop_tx, stop_rx) = watch::channel(false);
            let runner = {
                let feed = Arc::clone(&feed);
                tokio::spawn(async move { feed.run(stop_rx).await })
            };

            let listener = tokio::net::TcpListener::bind(addr).await?;
            let served = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;

            let _ = stop_tx.send(true);
            let _ = runner.await;
            served
        });

        match served {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => fail(&StockdashError::Io(e)),
        }
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        eprintln!("error: web feature is required for serve");
        ExitCode::from(1)
    }
}
