//! 변동성 지표 (Volatility Indicators).
//!
//! ATR(Average True Range)과 ATR 상승 비율을 제공합니다.
//! ATR은 추세선 군집화 허용폭, 목표가 투영, 신뢰도 점수에 모두 쓰입니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};
use pattern_core::PriceBar;

/// ATR 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtrParams {
    /// ATR 기간 (기본: 14).
    pub period: usize,
}

impl Default for AtrParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// ATR 상승 비율 계산 시 비교하는 최근 ATR 개수.
pub const ATR_RATIO_LOOKBACK: usize = 20;

/// 변동성 지표 계산기.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatilityIndicators;

impl VolatilityIndicators {
    /// 새로운 변동성 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// True Range 시퀀스.
    ///
    /// 첫 바는 고가-저가, 이후는 max(고가-저가, |고가-전일종가|, |저가-전일종가|).
    pub fn true_ranges(&self, bars: &[PriceBar]) -> Vec<Decimal> {
        let mut true_ranges = Vec::with_capacity(bars.len());
        for (i, bar) in bars.iter().enumerate() {
            if i == 0 {
                true_ranges.push(bar.high - bar.low);
                continue;
            }
            let prev_close = bars[i - 1].close;
            let hl = bar.high - bar.low;
            let hc = (bar.high - prev_close).abs();
            let lc = (bar.low - prev_close).abs();
            true_ranges.push(hl.max(hc).max(lc));
        }
        true_ranges
    }

    /// ATR (Average True Range) 계산.
    ///
    /// 초기 ATR은 period개 True Range의 단순 평균이고,
    /// 이후 alpha = 1/period 로 지수 평활합니다.
    pub fn atr(&self, bars: &[PriceBar], params: AtrParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if bars.len() < period + 1 {
            return Err(IndicatorError::InsufficientData {
                required: period + 1,
                provided: bars.len(),
            });
        }

        let true_ranges = self.true_ranges(bars);
        let alpha = Decimal::ONE / Decimal::from(period);
        let one_minus_alpha = Decimal::ONE - alpha;

        let mut result = Vec::with_capacity(bars.len());
        let mut prev_atr = Decimal::ZERO;
        for i in 0..bars.len() {
            if i < period - 1 {
                result.push(None);
            } else if i == period - 1 {
                // 초기 ATR은 단순 평균
                let sum: Decimal = true_ranges[..=i].iter().sum();
                prev_atr = sum / Decimal::from(period);
                result.push(Some(prev_atr));
            } else {
                prev_atr = (true_ranges[i] * alpha) + (prev_atr * one_minus_alpha);
                result.push(Some(prev_atr));
            }
        }

        Ok(result)
    }

    /// 최신 ATR 값. 기간만큼의 데이터가 없으면 0.
    pub fn latest_atr(&self, bars: &[PriceBar], params: AtrParams) -> Decimal {
        match self.atr(bars, params) {
            Ok(values) => values.last().copied().flatten().unwrap_or(Decimal::ZERO),
            Err(_) => Decimal::ZERO,
        }
    }

    /// 최신 ATR을 최근 ATR 평균으로 나눈 상승 비율.
    ///
    /// 1.0보다 크면 변동성이 평소보다 높다는 의미입니다.
    /// 계산할 수 없으면 1.0(중립)을 반환합니다.
    pub fn atr_ratio(&self, bars: &[PriceBar], params: AtrParams) -> f64 {
        let Ok(values) = self.atr(bars, params) else {
            return 1.0;
        };

        let recent: Vec<Decimal> = values
            .iter()
            .rev()
            .take(ATR_RATIO_LOOKBACK)
            .filter_map(|v| *v)
            .collect();
        let Some(latest) = recent.first().copied() else {
            return 1.0;
        };

        let mean = recent.iter().sum::<Decimal>() / Decimal::from(recent.len());
        if mean.is_zero() {
            return 1.0;
        }

        (latest / mean).to_f64().unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pattern_core::Timeframe;
    use rust_decimal_macros::dec;

    fn bars_with_range(ranges: &[Decimal]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        ranges
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mid = dec!(100);
                PriceBar::new(
                    "TEST",
                    Timeframe::H1,
                    start + Duration::hours(i as i64),
                    mid,
                    mid + *r / dec!(2),
                    mid - *r / dec!(2),
                    mid,
                    dec!(1000),
                )
            })
            .collect()
    }

    #[test]
    fn test_atr_constant_range() {
        let volatility = VolatilityIndicators::new();
        let bars = bars_with_range(&[dec!(2); 20]);
        let atr = volatility.atr(&bars, AtrParams::default()).unwrap();

        assert!(atr[12].is_none());
        assert_eq!(atr[13], Some(dec!(2)));
        assert_eq!(atr.last().unwrap().unwrap(), dec!(2));
    }

    #[test]
    fn test_latest_atr_short_series() {
        let volatility = VolatilityIndicators::new();
        let bars = bars_with_range(&[dec!(4); 14]);
        assert_eq!(volatility.latest_atr(&bars, AtrParams::default()), Decimal::ZERO);
        assert_eq!(volatility.latest_atr(&[], AtrParams::default()), Decimal::ZERO);

        let bars = bars_with_range(&[dec!(4); 15]);
        assert_eq!(volatility.latest_atr(&bars, AtrParams::default()), dec!(4));
    }

    #[test]
    fn test_atr_ratio_rises_with_expanding_range() {
        let volatility = VolatilityIndicators::new();

        let mut ranges = vec![dec!(1); 30];
        ranges.extend(vec![dec!(6); 5]);
        let bars = bars_with_range(&ranges);

        assert!(volatility.atr_ratio(&bars, AtrParams::default()) > 1.2);
    }

    #[test]
    fn test_atr_ratio_neutral_on_short_data() {
        let volatility = VolatilityIndicators::new();
        let bars = bars_with_range(&[dec!(1); 5]);
        assert_eq!(volatility.atr_ratio(&bars, AtrParams::default()), 1.0);
    }
}
