//! 모멘텀 지표 (Momentum Indicators).
//!
//! 가격 모멘텀과 과매수/과매도 상태를 측정하는 RSI를 제공합니다.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// 데이터가 부족할 때 사용하는 중립 RSI.
pub const NEUTRAL_RSI: f64 = 50.0;

/// RSI 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiParams {
    /// RSI 기간 (기본: 14).
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 모멘텀 지표 계산기.
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumCalculator;

impl MomentumCalculator {
    /// 새로운 모멘텀 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// RSI (Relative Strength Index) 계산.
    ///
    /// RSI = 100 - (100 / (1 + RS))
    /// RS = 평균 상승폭 / 평균 하락폭
    ///
    /// 평균은 alpha = 1/period 의 지수 가중 이동평균(Wilder 방식)입니다.
    ///
    /// # 반환
    /// 0-100 사이의 RSI 값들 (처음 period-1개는 None)
    pub fn rsi(&self, prices: &[Decimal], params: RsiParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if prices.len() < period + 1 {
            return Err(IndicatorError::InsufficientData {
                required: period + 1,
                provided: prices.len(),
            });
        }

        // 가격 변화 계산
        let mut deltas = Vec::with_capacity(prices.len());
        deltas.push(Decimal::ZERO); // 첫 번째는 변화 없음
        for i in 1..prices.len() {
            deltas.push(prices[i] - prices[i - 1]);
        }

        let gains: Vec<Decimal> = deltas
            .iter()
            .map(|&d| if d > Decimal::ZERO { d } else { Decimal::ZERO })
            .collect();
        let losses: Vec<Decimal> = deltas
            .iter()
            .map(|&d| if d < Decimal::ZERO { d.abs() } else { Decimal::ZERO })
            .collect();

        let alpha = Decimal::ONE / Decimal::from(period);
        let avg_gains = ewm(&gains, alpha, period);
        let avg_losses = ewm(&losses, alpha, period);

        let result = avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|pair| match pair {
                (Some(gain), Some(loss)) => {
                    if loss.is_zero() {
                        if gain.is_zero() {
                            Some(dec!(50))
                        } else {
                            Some(dec!(100))
                        }
                    } else {
                        let rs = *gain / *loss;
                        Some(dec!(100) - (dec!(100) / (Decimal::ONE + rs)))
                    }
                }
                _ => None,
            })
            .collect();

        Ok(result)
    }

    /// 최신 RSI 값. 데이터가 부족하면 중립값 50을 반환합니다.
    pub fn latest_rsi(&self, prices: &[Decimal], params: RsiParams) -> f64 {
        self.rsi(prices, params)
            .ok()
            .and_then(|values| values.last().copied().flatten())
            .and_then(|v| v.to_f64())
            .unwrap_or(NEUTRAL_RSI)
    }
}

/// 지수 가중 이동평균. 초기값은 min_periods 개의 단순 평균입니다.
pub(crate) fn ewm(values: &[Decimal], alpha: Decimal, min_periods: usize) -> Vec<Option<Decimal>> {
    let mut result = Vec::with_capacity(values.len());
    if values.is_empty() || min_periods == 0 {
        return result;
    }

    let one_minus_alpha = Decimal::ONE - alpha;
    let mut ewm_value = Decimal::ZERO;

    for i in 0..values.len() {
        if i < min_periods - 1 {
            result.push(None);
        } else if i == min_periods - 1 {
            // 초기 EWM은 단순 평균으로 시작
            let sum: Decimal = values[..=i].iter().sum();
            ewm_value = sum / Decimal::from(i + 1);
            result.push(Some(ewm_value));
        } else {
            ewm_value = (values[i] * alpha) + (ewm_value * one_minus_alpha);
            result.push(Some(ewm_value));
        }
    }

    result
}
