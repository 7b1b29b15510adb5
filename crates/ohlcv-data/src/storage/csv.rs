//! CSV 파일 기반 시계열 저장소.
//!
//! 파일 이름: `{symbol}_{interval}_{YYYYMMDD}_{YYYYMMDD}.csv`
//!
//! 형식: `timestamp,open,high,low,close,volume` 헤더,
//! `YYYY-MM-DD HH:MM:SS` (UTC) 타임스탬프, 한 행당 캔들 하나.
//! 검증 리포트는 같은 이름의 `.validation.json` 파일에 저장합니다.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use ohlcv_core::{Candle, Interval, Series};

use crate::validator::ValidationReport;
use crate::{DataError, DataResult};

/// CSV 헤더.
pub const CSV_HEADER: &str = "timestamp,open,high,low,close,volume";

/// CSV 타임스탬프 형식.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SIDECAR_EXTENSION: &str = "validation.json";

/// 데이터 루트 아래의 시계열 파일 저장소.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    data_path: PathBuf,
}

impl SeriesStore {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// 시계열 파일 이름 생성.
    pub fn file_name(
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> String {
        format!(
            "{}_{}_{}_{}.csv",
            symbol,
            interval,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }

    pub fn path_for(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PathBuf {
        self.data_path
            .join(Self::file_name(symbol, interval, start, end))
    }

    /// 시계열 CSV와 검증 리포트를 저장하고 CSV 경로를 반환합니다.
    ///
    /// 같은 (심볼, 간격, 기간)의 기존 파일은 덮어씁니다.
    pub fn save(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        series: &Series,
        report: &ValidationReport,
    ) -> DataResult<PathBuf> {
        fs::create_dir_all(&self.data_path)?;

        let path = self.path_for(symbol, interval, start, end);
        write_csv(&path, series)?;
        write_report(&sidecar_path(&path), report)?;

        info!(
            symbol,
            interval = %interval,
            rows = series.len(),
            path = %path.display(),
            "Series saved"
        );
        Ok(path)
    }

    /// 가장 최근(이름 기준 사전순 최대) 시계열 파일 경로.
    ///
    /// 데이터 루트가 없으면 `None`을 반환합니다.
    pub fn latest_file(&self, symbol: &str, interval: Interval) -> DataResult<Option<PathBuf>> {
        if !self.data_path.is_dir() {
            return Ok(None);
        }

        let prefix = format!("{}_{}_", symbol, interval);
        let mut latest: Option<(String, PathBuf)> = None;

        for entry in fs::read_dir(&self.data_path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(".csv") {
                continue;
            }
            if latest.as_ref().map_or(true, |(best, _)| name > *best) {
                latest = Some((name, entry.path()));
            }
        }

        Ok(latest.map(|(_, path)| path))
    }

    /// 가장 최근 시계열 로드.
    pub fn load_latest(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> DataResult<Option<(PathBuf, Series)>> {
        match self.latest_file(symbol, interval)? {
            Some(path) => {
                let series = read_csv(&path)?;
                debug!(path = %path.display(), rows = series.len(), "Loaded latest series");
                Ok(Some((path, series)))
            }
            None => Ok(None),
        }
    }
}

/// CSV 경로에 대응하는 검증 리포트 경로.
pub fn sidecar_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension(SIDECAR_EXTENSION)
}

/// 시계열을 CSV로 저장 (전체 덮어쓰기).
pub fn write_csv(path: &Path, series: &Series) -> DataResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", CSV_HEADER)?;
    for candle in series.iter() {
        writeln!(
            writer,
            "{},{},{},{},{},{}",
            candle.timestamp.format(TIMESTAMP_FORMAT),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// CSV 파일에서 시계열을 읽습니다.
///
/// 빈 값이나 숫자가 아닌 값은 결측(NaN)으로 읽습니다.
/// 타임스탬프를 해석할 수 없거나 컬럼 수가 부족하면 에러입니다.
pub fn read_csv(path: &Path) -> DataResult<Series> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataError::NotFound(path.display().to_string()),
        _ => DataError::Io(e),
    })?;

    let mut candles = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || (line_no == 0 && line.starts_with("timestamp")) {
            continue;
        }

        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < 6 {
            return Err(DataError::ParseError(format!(
                "{}:{}: expected 6 columns, found {}",
                path.display(),
                line_no + 1,
                parts.len()
            )));
        }

        let timestamp = parse_timestamp(parts[0]).ok_or_else(|| {
            DataError::ParseError(format!(
                "{}:{}: invalid timestamp '{}'",
                path.display(),
                line_no + 1,
                parts[0]
            ))
        })?;

        candles.push(Candle::new(
            timestamp,
            parse_value(parts[1]),
            parse_value(parts[2]),
            parse_value(parts[3]),
            parse_value(parts[4]),
            parse_value(parts[5]),
        ));
    }

    Ok(Series::from_candles(candles))
}

/// 검증 리포트를 JSON으로 저장.
pub fn write_report(path: &Path, report: &ValidationReport) -> DataResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}

/// 저장된 검증 리포트 읽기.
pub fn read_report(path: &Path) -> DataResult<ValidationReport> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `YYYY-MM-DD HH:MM:SS`, RFC 3339, 밀리초 epoch를 허용합니다.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    match raw.parse::<i64>() {
        Ok(ms) => DateTime::from_timestamp_millis(ms),
        Err(_) => {
            warn!(raw, "Unrecognized timestamp");
            None
        }
    }
}

fn parse_value(raw: &str) -> f64 {
    raw.parse().unwrap_or(f64::NAN)
}
