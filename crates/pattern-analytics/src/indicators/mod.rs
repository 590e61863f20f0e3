//! 기술적 지표 모듈.
//!
//! 패턴 감지와 신뢰도 점수에 쓰이는 지표를 제공합니다.
//! 모든 계산은 결정적이며 부작용이 없습니다.
//!
//! # 지원 지표
//!
//! - **RSI**: 상대강도지수 (기간 14, 데이터 부족 시 50)
//! - **ATR**: 평균 실제 범위 (기간 14, 데이터 부족 시 0)
//! - **EMA**: 7/50/100 지수 이동평균 (데이터 부족 시 첫 종가)
//! - **거래량 추세**: 최근 5바 평균 / 이전 20바 평균
//! - **EMA 크로스오버**: 정렬 상태가 바뀌는 순간에만 발생
//!
//! # 사용 예시
//!
//! ```ignore
//! use pattern_analytics::indicators::IndicatorEngine;
//!
//! let engine = IndicatorEngine::new();
//! let snapshot = engine.snapshot(&bars);
//! ```

pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pattern_core::{closes, PriceBar};

pub use momentum::{MomentumCalculator, RsiParams, NEUTRAL_RSI};
pub use trend::{
    detect_crossovers, EmaAlignment, EmaCrossEvent, EmaParams, EmaTriple, TrendIndicators,
};
pub use volatility::{AtrParams, VolatilityIndicators};
pub use volume::{VolumeDirection, VolumeIndicators, VolumeTrend, VolumeTrendParams};

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 데이터 부족 오류
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 한 윈도우에 대한 지표 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    /// RSI (0-100)
    pub rsi: f64,
    /// ATR
    pub atr: Decimal,
    /// 최신 ATR / 최근 ATR 평균
    pub atr_ratio: f64,
    /// 7/50/100 EMA
    pub ema: EmaTriple,
    /// EMA 정렬 상태
    pub ema_alignment: EmaAlignment,
    /// 거래량 추세
    pub volume_trend: VolumeTrend,
    /// 최근 바에서 발생한 EMA 크로스오버 이벤트
    pub crossovers: Vec<EmaCrossEvent>,
}

/// 통합 지표 엔진.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    trend: TrendIndicators,
    momentum: MomentumCalculator,
    volatility: VolatilityIndicators,
    volume: VolumeIndicators,
}

impl IndicatorEngine {
    /// 새로운 지표 엔진 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// RSI 시퀀스.
    pub fn rsi(&self, prices: &[Decimal], params: RsiParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        self.momentum.rsi(prices, params)
    }

    /// EMA 시퀀스.
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        self.trend.ema(prices, params)
    }

    /// ATR 시퀀스.
    pub fn atr(&self, bars: &[PriceBar], params: AtrParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        self.volatility.atr(bars, params)
    }

    /// 최신 ATR (데이터 부족 시 0).
    pub fn latest_atr(&self, bars: &[PriceBar]) -> Decimal {
        self.volatility.latest_atr(bars, AtrParams::default())
    }

    /// 바 시퀀스 전체에 대한 지표 스냅샷을 계산합니다. 실패하지 않습니다.
    pub fn snapshot(&self, bars: &[PriceBar]) -> IndicatorSnapshot {
        let prices = closes(bars);
        let ema = self.trend.ema_triple(&prices);

        IndicatorSnapshot {
            rsi: self.momentum.latest_rsi(&prices, RsiParams::default()),
            atr: self.volatility.latest_atr(bars, AtrParams::default()),
            atr_ratio: self.volatility.atr_ratio(bars, AtrParams::default()),
            ema_alignment: ema.alignment(),
            ema,
            volume_trend: self.volume.volume_trend(bars, VolumeTrendParams::default()),
            crossovers: self.trend.latest_crossovers(&prices),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pattern_core::Timeframe;
    use rust_decimal_macros::dec;

    #[test]
    fn test_snapshot_on_empty_input_is_neutral() {
        let snapshot = IndicatorEngine::new().snapshot(&[]);
        assert_eq!(snapshot.rsi, NEUTRAL_RSI);
        assert_eq!(snapshot.atr, Decimal::ZERO);
        assert_eq!(snapshot.atr_ratio, 1.0);
        assert_eq!(snapshot.volume_trend, VolumeTrend::neutral());
        assert!(snapshot.crossovers.is_empty());
    }

    #[test]
    fn test_snapshot_uptrend() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<PriceBar> = (0..120)
            .map(|i| {
                let close = dec!(100) + Decimal::from(i);
                PriceBar::new(
                    "TEST",
                    Timeframe::D1,
                    start + Duration::days(i),
                    close - dec!(0.5),
                    close + dec!(1),
                    close - dec!(1),
                    close,
                    dec!(1000),
                )
            })
            .collect();

        let snapshot = IndicatorEngine::new().snapshot(&bars);
        assert_eq!(snapshot.ema_alignment, EmaAlignment::AllBullish);
        assert!(snapshot.rsi > 70.0);
        assert!(snapshot.atr > Decimal::ZERO);
    }

    #[test]
    fn test_snapshot_atr_is_zero_below_period() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let bars: Vec<PriceBar> = (0..20)
            .map(|i| {
                PriceBar::new(
                    "TEST",
                    Timeframe::H1,
                    start + Duration::hours(i),
                    dec!(100),
                    dec!(102),
                    dec!(98),
                    dec!(100),
                    dec!(1000),
                )
            })
            .collect();

        let engine = IndicatorEngine::new();
        assert_eq!(engine.snapshot(&bars[..10]).atr, Decimal::ZERO);
        assert_eq!(engine.latest_atr(&bars[..14]), Decimal::ZERO);
        assert_eq!(engine.snapshot(&bars).atr, dec!(4));
    }
}
