//! OHLCV collector CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ohlcv_core::{init_logging, LogConfig, LogFormat, Series};
use ohlcv_data::storage::csv::{read_csv, sidecar_path, write_csv, write_report};
use ohlcv_data::{OhlcvCleaner, OhlcvValidator, SeriesStore};
use ohlcv_collector::modules::{self, RateLimitedFetcher};
use ohlcv_collector::CollectorConfig;

#[derive(Parser)]
#[command(name = "ohlcv-collector")]
#[command(about = "Rate-limited OHLCV collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 캔들 수집 → 정제 → 검증 → 저장
    Fetch {
        /// 거래쌍 (기본값: ALGOUSDT)
        #[arg(long)]
        symbol: Option<String>,

        /// 특정 간격만 수집 (15m, 1h, 4h, 1d)
        #[arg(long)]
        interval: Option<String>,
    },

    /// 저장된 최신 시계열 로드
    Load {
        #[arg(long)]
        symbol: Option<String>,

        #[arg(long)]
        interval: Option<String>,
    },

    /// CSV 파일 정제
    Clean {
        /// 입력 CSV 경로
        input: PathBuf,

        /// 결측값 채우기 정책 (forward, backward, mean, interpolate)
        #[arg(long)]
        fill_policy: Option<String>,

        /// 출력 경로 (기본값: output_path/{입력 이름}_cleaned.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// CSV 파일 검증 리포트 출력 (JSON)
    Validate {
        /// 입력 CSV 경로
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CollectorConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let mut log_config = LogConfig::from(&config.app.logging);
    if let Some(level) = cli.log_level {
        log_config.level = level;
    }
    if let Some(format) = cli.log_format {
        log_config.format = format;
    }
    init_logging(log_config).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!(
        data_path = %config.app.storage.data_path.display(),
        "OHLCV collector started"
    );

    match cli.command {
        Commands::Fetch { symbol, interval } => {
            run_fetch(&config, symbol.as_deref(), interval.as_deref()).await?;
        }
        Commands::Load { symbol, interval } => {
            let symbol = config.symbol_or_default(symbol.as_deref());
            let store = SeriesStore::new(&config.app.storage.data_path);
            let loaded = modules::load_multi_timeframe(&store, &symbol, interval.as_deref())?;

            if loaded.is_empty() {
                println!("{}: no stored series", symbol);
            }
            for (interval, series) in &loaded {
                println!("{} {}: {}", symbol, interval, describe(series));
            }
        }
        Commands::Clean {
            input,
            fill_policy,
            output,
        } => {
            run_clean(&config, &input, fill_policy.as_deref(), output)?;
        }
        Commands::Validate { input } => {
            let series = read_csv(&input)?;
            let report = OhlcvValidator::new().validate(&series);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn run_fetch(
    config: &CollectorConfig,
    symbol: Option<&str>,
    interval: Option<&str>,
) -> anyhow::Result<()> {
    let symbol = config.symbol_or_default(symbol);

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling fetch");
            signal_token.cancel();
        }
    });

    let mut fetcher = RateLimitedFetcher::binance(config)?.with_cancellation(token);
    let result = fetcher.fetch_multi_timeframe(&symbol, interval).await;
    fetcher.stats().log_summary("fetch");

    let fetched = result?;
    for (interval, series) in &fetched {
        println!("{} {}: {}", symbol, interval, describe(series));
    }

    let stats = fetcher.stats();
    println!(
        "intervals: {}/{} ok, candles: {}, requests: {}, rate-limit waits: {}, retries: {}",
        stats.success,
        stats.total,
        stats.total_candles,
        stats.requests,
        stats.rate_limit_waits,
        stats.retries
    );
    Ok(())
}

fn run_clean(
    config: &CollectorConfig,
    input: &Path,
    fill_policy: Option<&str>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let raw = read_csv(input)?;
    let cleaner = OhlcvCleaner::from_config(&config.app.cleaning);
    let cleaned = match fill_policy {
        Some(policy) => cleaner.clean_named(&raw, policy)?,
        None => cleaner.clean(&raw, config.app.cleaning.fill_policy),
    };
    let report = OhlcvValidator::new().validate(&cleaned);

    let output = output.unwrap_or_else(|| default_clean_output(&config.app.storage.output_path, input));
    write_csv(&output, &cleaned)?;
    write_report(&sidecar_path(&output), &report)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        raw_rows = raw.len(),
        rows = cleaned.len(),
        "Series cleaned"
    );
    println!("{} -> {}", input.display(), output.display());
    println!("{}", report.summary());
    Ok(())
}

fn default_clean_output(output_root: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string());
    output_root.join(format!("{}_cleaned.csv", stem))
}

fn describe(series: &Series) -> String {
    match series.time_range() {
        Some((start, end)) => format!(
            "{} rows, {} ~ {}",
            series.len(),
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M")
        ),
        None => "0 rows".to_string(),
    }
}
