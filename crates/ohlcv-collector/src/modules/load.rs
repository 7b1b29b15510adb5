//! 저장된 최신 시계열 일괄 로드.

use std::collections::BTreeMap;

use tracing::{info, warn};

use ohlcv_core::{Interval, Series};
use ohlcv_data::SeriesStore;

use crate::modules::fetch::select_intervals;
use crate::Result;

/// 간격별로 가장 최근 파일을 로드합니다.
///
/// 파일이 없거나 읽을 수 없는 간격은 건너뜁니다.
pub fn load_multi_timeframe(
    store: &SeriesStore,
    symbol: &str,
    filter: Option<&str>,
) -> Result<BTreeMap<Interval, Series>> {
    let mut loaded = BTreeMap::new();

    for interval in select_intervals(filter)? {
        match store.load_latest(symbol, interval) {
            Ok(Some((path, series))) => {
                info!(
                    symbol,
                    interval = %interval,
                    rows = series.len(),
                    path = %path.display(),
                    "Loaded series"
                );
                loaded.insert(interval, series);
            }
            Ok(None) => {
                info!(symbol, interval = %interval, "No stored series");
            }
            Err(e) => {
                warn!(symbol, interval = %interval, error = %e, "Failed to load series, skipping");
            }
        }
    }

    Ok(loaded)
}
