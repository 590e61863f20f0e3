//! 거래량 추세 지표.
//!
//! 최근 거래량 평균을 그 이전 구간의 평균과 비교해 거래량 급증 여부를 판단합니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pattern_core::PriceBar;

/// 거래량 추세 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VolumeTrendParams {
    /// 최근 구간 바 수 (기본: 5).
    pub recent: usize,
    /// 비교 기준 구간 바 수 (기본: 20).
    pub baseline: usize,
}

impl Default for VolumeTrendParams {
    fn default() -> Self {
        Self {
            recent: 5,
            baseline: 20,
        }
    }
}

/// 거래량 추세 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeDirection {
    /// 증가
    Increasing,
    /// 감소
    Decreasing,
    /// 보합
    Flat,
}

/// 거래량 추세.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeTrend {
    /// 최근 평균 / 기준 평균
    pub ratio: f64,
    /// 방향
    pub direction: VolumeDirection,
}

impl VolumeTrend {
    /// 데이터 부족 시 사용하는 중립 추세.
    pub fn neutral() -> Self {
        Self {
            ratio: 1.0,
            direction: VolumeDirection::Flat,
        }
    }

    fn from_ratio(ratio: f64) -> Self {
        let direction = if ratio > 1.1 {
            VolumeDirection::Increasing
        } else if ratio < 0.9 {
            VolumeDirection::Decreasing
        } else {
            VolumeDirection::Flat
        };
        Self { ratio, direction }
    }
}

/// 거래량 지표 계산기.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeIndicators;

impl VolumeIndicators {
    /// 새로운 거래량 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 거래량 추세를 계산합니다.
    ///
    /// 기준 구간은 최근 구간 바로 앞의 최대 `baseline`개 바입니다.
    /// 최근 구간이 다 차지 않거나 기준 평균이 0이면 중립을 반환합니다.
    pub fn volume_trend(&self, bars: &[PriceBar], params: VolumeTrendParams) -> VolumeTrend {
        if params.recent == 0 || bars.len() <= params.recent {
            return VolumeTrend::neutral();
        }

        let split = bars.len() - params.recent;
        let baseline_start = split.saturating_sub(params.baseline);
        let recent = &bars[split..];
        let baseline = &bars[baseline_start..split];

        let recent_avg = average_volume(recent);
        let baseline_avg = average_volume(baseline);
        if baseline_avg.is_zero() {
            return VolumeTrend::neutral();
        }

        let ratio = (recent_avg / baseline_avg).to_f64().unwrap_or(1.0);
        VolumeTrend::from_ratio(ratio)
    }
}

fn average_volume(bars: &[PriceBar]) -> Decimal {
    if bars.is_empty() {
        return Decimal::ZERO;
    }
    bars.iter().map(|b| b.volume).sum::<Decimal>() / Decimal::from(bars.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pattern_core::Timeframe;
    use rust_decimal_macros::dec;

    fn bars_with_volume(volumes: &[Decimal]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        volumes
            .iter()
            .enumerate()
            .map(|(i, v)| {
                PriceBar::new(
                    "TEST",
                    Timeframe::D1,
                    start + Duration::days(i as i64),
                    dec!(100),
                    dec!(101),
                    dec!(99),
                    dec!(100),
                    *v,
                )
            })
            .collect()
    }

    #[test]
    fn test_volume_surge() {
        let mut volumes = vec![dec!(1000); 20];
        volumes.extend(vec![dec!(2500); 5]);
        let trend = VolumeIndicators::new()
            .volume_trend(&bars_with_volume(&volumes), VolumeTrendParams::default());

        assert!((trend.ratio - 2.5).abs() < 1e-9);
        assert_eq!(trend.direction, VolumeDirection::Increasing);
    }

    #[test]
    fn test_volume_decline() {
        let mut volumes = vec![dec!(1000); 20];
        volumes.extend(vec![dec!(500); 5]);
        let trend = VolumeIndicators::new()
            .volume_trend(&bars_with_volume(&volumes), VolumeTrendParams::default());
        assert_eq!(trend.direction, VolumeDirection::Decreasing);
    }

    #[test]
    fn test_short_series_is_neutral() {
        let trend = VolumeIndicators::new()
            .volume_trend(&bars_with_volume(&[dec!(100); 3]), VolumeTrendParams::default());
        assert_eq!(trend, VolumeTrend::neutral());
    }

    #[test]
    fn test_zero_baseline_is_neutral() {
        let mut volumes = vec![Decimal::ZERO; 10];
        volumes.extend(vec![dec!(100); 5]);
        let trend = VolumeIndicators::new()
            .volume_trend(&bars_with_volume(&volumes), VolumeTrendParams::default());
        assert_eq!(trend.ratio, 1.0);
    }
}
