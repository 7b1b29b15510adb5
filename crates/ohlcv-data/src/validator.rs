//! OHLCV 시계열 품질 검증.
//!
//! 입력을 변경하지 않으며, 각 검사는 서로 독립적입니다.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use ohlcv_core::Series;

/// 타임스탬프 간격 검사 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GapCheck {
    /// 행이 2개 미만이라 검사하지 않음
    TooFewRows,
    /// 기대 간격과 다른 연속 쌍의 수
    Checked { gaps: usize },
}

impl GapCheck {
    pub fn gaps(&self) -> Option<usize> {
        match self {
            GapCheck::TooFewRows => None,
            GapCheck::Checked { gaps } => Some(*gaps),
        }
    }

    pub fn description(&self) -> String {
        match self {
            GapCheck::TooFewRows => "Too few rows to check gaps".to_string(),
            GapCheck::Checked { gaps: 0 } => "No gaps found".to_string(),
            GapCheck::Checked { gaps } => format!("Found {} timestamp gaps", gaps),
        }
    }
}

/// 검증 리포트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// 검사한 행 수
    pub rows: usize,
    /// 결측값 존재 여부
    pub has_missing_values: bool,
    /// 같은 타임스탬프가 두 번 이상 나오는지 여부
    pub has_duplicates: bool,
    pub timestamp_gaps: GapCheck,
    /// OHLC 관계 위반 여부
    pub ohlc_violations: bool,
    /// 음수 가격/거래량 여부
    pub negative_values: bool,
}

impl ValidationReport {
    /// 모든 검사를 통과했는지 확인.
    ///
    /// 행이 너무 적어 간격 검사를 하지 못한 경우는 통과로 봅니다.
    pub fn is_clean(&self) -> bool {
        !self.has_missing_values
            && !self.has_duplicates
            && self.timestamp_gaps.gaps().unwrap_or(0) == 0
            && !self.ohlc_violations
            && !self.negative_values
    }

    pub fn ohlc_description(&self) -> &'static str {
        if self.ohlc_violations {
            "OHLC violations found"
        } else {
            "No OHLC violations"
        }
    }

    pub fn negative_description(&self) -> &'static str {
        if self.negative_values {
            "Negative values found"
        } else {
            "No negative values"
        }
    }

    /// 한 줄 요약.
    pub fn summary(&self) -> String {
        format!(
            "rows={}, missing={}, duplicates={}, gaps: {}, ohlc: {}, negatives: {}",
            self.rows,
            self.has_missing_values,
            self.has_duplicates,
            self.timestamp_gaps.description(),
            self.ohlc_description(),
            self.negative_description()
        )
    }
}

/// 시계열 검증기.
#[derive(Debug, Clone, Copy, Default)]
pub struct OhlcvValidator;

impl OhlcvValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, series: &Series) -> ValidationReport {
        ValidationReport {
            rows: series.len(),
            has_missing_values: series.iter().any(|c| c.has_missing()),
            has_duplicates: has_duplicate_timestamps(series),
            timestamp_gaps: check_gaps(series),
            ohlc_violations: series.iter().any(|c| c.violates_ohlc()),
            negative_values: series.iter().any(|c| c.has_negative()),
        }
    }
}

fn has_duplicate_timestamps(series: &Series) -> bool {
    let mut seen = HashSet::with_capacity(series.len());
    series.iter().any(|c| !seen.insert(c.timestamp))
}

/// 처음 두 행의 간격을 기대 간격으로 삼아, 다른 간격의 연속 쌍을 셉니다.
fn check_gaps(series: &Series) -> GapCheck {
    let candles = series.candles();
    if candles.len() < 2 {
        return GapCheck::TooFewRows;
    }

    let expected = candles[1].timestamp - candles[0].timestamp;
    let gaps = candles
        .windows(2)
        .filter(|pair| pair[1].timestamp - pair[0].timestamp != expected)
        .count();

    GapCheck::Checked { gaps }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use ohlcv_core::Candle;

    fn hourly(hours: &[i64]) -> Series {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        hours
            .iter()
            .map(|h| Candle::new(base + Duration::hours(*h), 1.0, 1.5, 0.5, 1.2, 10.0))
            .collect()
    }

    #[test]
    fn test_too_few_rows() {
        let report = OhlcvValidator::new().validate(&hourly(&[0]));
        assert_eq!(report.timestamp_gaps, GapCheck::TooFewRows);
        assert_eq!(report.timestamp_gaps.description(), "Too few rows to check gaps");

        let empty = OhlcvValidator::new().validate(&Series::new());
        assert_eq!(empty.timestamp_gaps, GapCheck::TooFewRows);
        assert!(empty.is_clean());
    }

    #[test]
    fn test_gap_count() {
        let report = OhlcvValidator::new().validate(&hourly(&[0, 1, 2, 5, 6, 7, 9]));
        assert_eq!(report.timestamp_gaps.gaps(), Some(2));
        assert_eq!(report.timestamp_gaps.description(), "Found 2 timestamp gaps");
    }

    #[test]
    fn test_duplicate_timestamps() {
        let report = OhlcvValidator::new().validate(&hourly(&[0, 1, 1, 2]));
        assert!(report.has_duplicates);
    }

    #[test]
    fn test_missing_negative_and_ohlc() {
        let mut series = hourly(&[0, 1, 2]).into_candles();
        series[0].volume = f64::NAN;
        series[1].low = -1.0;
        series[2].high = 0.1;

        let report = OhlcvValidator::new().validate(&Series::from(series));
        assert!(report.has_missing_values);
        assert!(report.negative_values);
        assert!(report.ohlc_violations);
        assert_eq!(report.ohlc_description(), "OHLC violations found");
        assert_eq!(report.negative_description(), "Negative values found");
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_json_shape() {
        let report = OhlcvValidator::new().validate(&hourly(&[0, 1, 2]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["timestamp_gaps"]["status"], "checked");
        assert_eq!(json["timestamp_gaps"]["gaps"], 0);
        assert_eq!(json["has_duplicates"], false);
    }
}
