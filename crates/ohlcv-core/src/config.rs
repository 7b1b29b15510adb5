//! 설정 관리.
//!
//! 설정은 다음 순서로 병합됩니다 (뒤가 우선):
//! 1. 내장 기본값
//! 2. TOML 설정 파일 (선택)
//! 3. `OHLCV__` 접두사 환경 변수 (예: `OHLCV__EXCHANGE__PAGE_LIMIT=500`)
//! 4. 레거시 환경 변수 `DATA_PATH`, `OUTPUT_PATH`
//!
//! 로드된 설정은 각 컴포넌트 생성자에 명시적으로 전달됩니다.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CoreResult, FillPolicy};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 거래소(캔들 제공자) 설정
    #[serde(default)]
    pub exchange: ExchangeConfig,
    /// 데이터 정제 설정
    #[serde(default)]
    pub cleaning: CleaningConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 저장소 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// 시계열 CSV 저장 루트
    pub data_path: PathBuf,
    /// 파생 결과물(피처, 예측, 차트) 저장 루트
    pub output_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("resources/data"),
            output_path: PathBuf::from("resources/results"),
        }
    }
}

/// 캔들 제공자 및 요청 한도 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 캔들 엔드포인트 경로
    pub klines_path: String,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 페이지당 최대 캔들 수 (제공자 상한 1000)
    pub page_limit: u32,
    /// 사용 가중치 확인 주기 (요청 수)
    pub weight_check_every: u32,
    /// 사용 가중치 임계값
    pub used_weight_threshold: u32,
    /// 임계값 초과 시 대기 (밀리초)
    pub heavy_throttle_ms: u64,
    /// 임계값 이하일 때 대기 (밀리초)
    pub light_throttle_ms: u64,
    /// Retry-After 헤더가 없을 때의 대기 (초)
    pub default_retry_after_secs: u64,
    /// 요청 한도 윈도우 길이 (초)
    pub rate_window_secs: u64,
    /// 재시도 방식. `legacy`면 `max_retries`와 대기 없이 무한 재시도
    pub retry_mode: RetryMode,
    /// `capped` 방식의 연속 실패 허용 횟수 (`None`이면 무제한)
    pub max_retries: Option<u32>,
    /// 일시적 에러 후 재시도 전 대기 (밀리초)
    pub retry_delay_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.com".to_string(),
            klines_path: "/api/v3/klines".to_string(),
            timeout_secs: 30,
            page_limit: 100,
            weight_check_every: 10,
            used_weight_threshold: 800,
            heavy_throttle_ms: 1000,
            light_throttle_ms: 100,
            default_retry_after_secs: 60,
            rate_window_secs: 60,
            retry_mode: RetryMode::Capped,
            max_retries: Some(5),
            retry_delay_ms: 1000,
        }
    }
}

/// 일시적 요청 에러의 재시도 방식.
///
/// 기본값 계층이 `max_retries = Some(5)`로 직렬화되므로
/// 무제한 재시도는 이 값으로만 설정 파일/환경 변수에서 선택할 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryMode {
    /// 재시도 가능한 에러만 `max_retries`회까지, 대기를 2배씩 늘리며 재시도
    #[default]
    Capped,
    /// 취소를 제외한 모든 에러를 대기 없이 무한 재시도
    Legacy,
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn heavy_throttle(&self) -> Duration {
        Duration::from_millis(self.heavy_throttle_ms)
    }

    pub fn light_throttle(&self) -> Duration {
        Duration::from_millis(self.light_throttle_ms)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::from_secs(self.default_retry_after_secs)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 캔들 엔드포인트 전체 URL.
    pub fn klines_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.klines_path
        )
    }
}

/// 데이터 정제 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CleaningConfig {
    /// 가격 소수점 자릿수
    pub price_decimals: u32,
    /// 거래량 소수점 자릿수
    pub volume_decimals: u32,
    /// 결측값 채우기 정책
    pub fill_policy: FillPolicy,
    /// 이상치 탐지 롤링 윈도우 크기
    pub anomaly_window: usize,
    /// 이상치 판정 표준편차 배수
    pub anomaly_sigma: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            price_decimals: 4,
            volume_decimals: 2,
            fill_policy: FillPolicy::Forward,
            anomaly_window: 48,
            anomaly_sigma: 4.0,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 기본값, 설정 파일, 환경 변수를 병합하여 설정을 로드합니다.
    ///
    /// `path`가 주어졌지만 파일이 없으면 에러를 반환합니다.
    pub fn load(path: Option<&Path>) -> CoreResult<Self> {
        dotenvy::dotenv().ok();

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let builder = builder
            .add_source(
                config::Environment::with_prefix("OHLCV")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("storage.data_path", std::env::var("DATA_PATH").ok())?
            .set_override_option("storage.output_path", std::env::var("OUTPUT_PATH").ok())?;

        let config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// 기본 경로(`config/default.toml`)가 있으면 그 파일을, 없으면 기본값만 사용합니다.
    pub fn load_default() -> CoreResult<Self> {
        let default_path = Path::new("config/default.toml");
        if default_path.exists() {
            Self::load(Some(default_path))
        } else {
            Self::load(None)
        }
    }
}
