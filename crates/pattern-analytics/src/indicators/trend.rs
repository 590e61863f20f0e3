//! 추세 지표 (Trend Indicators).
//!
//! EMA 7/50/100 정렬 상태와 정렬 변화(크로스오버) 이벤트를 제공합니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};
use pattern_core::Direction;

/// 단기 EMA 기간.
pub const EMA_SHORT: usize = 7;
/// 중기 EMA 기간.
pub const EMA_MEDIUM: usize = 50;
/// 장기 EMA 기간.
pub const EMA_LONG: usize = 100;

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// EMA 기간.
    pub period: usize,
}

/// 7/50/100 EMA 묶음.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaTriple {
    /// 7 EMA
    pub short: Decimal,
    /// 50 EMA
    pub medium: Decimal,
    /// 100 EMA
    pub long: Decimal,
}

/// EMA 정렬 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaAlignment {
    /// 7 > 50 > 100
    AllBullish,
    /// 7 < 50 < 100
    AllBearish,
    /// 그 외
    Mixed,
}

impl EmaAlignment {
    /// 정렬이 가리키는 방향.
    pub fn direction(&self) -> Direction {
        match self {
            EmaAlignment::AllBullish => Direction::Bullish,
            EmaAlignment::AllBearish => Direction::Bearish,
            EmaAlignment::Mixed => Direction::Neutral,
        }
    }
}

impl EmaTriple {
    /// 정렬 상태를 판정합니다.
    pub fn alignment(&self) -> EmaAlignment {
        if self.short > self.medium && self.medium > self.long {
            EmaAlignment::AllBullish
        } else if self.short < self.medium && self.medium < self.long {
            EmaAlignment::AllBearish
        } else {
            EmaAlignment::Mixed
        }
    }

    /// 단기/중기 EMA만 비교한 방향.
    pub fn short_term_direction(&self) -> Direction {
        if self.short > self.medium {
            Direction::Bullish
        } else if self.short < self.medium {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

/// EMA 정렬 변화 이벤트.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaCrossEvent {
    /// 7 EMA가 50 EMA를 상향 돌파
    GoldenCross,
    /// 7 EMA가 50 EMA를 하향 돌파
    DeathCross,
    /// 완전 상승 정렬 진입
    BullishAlignmentFormed,
    /// 완전 하락 정렬 진입
    BearishAlignmentFormed,
    /// 완전 정렬이 해제됨
    AlignmentLost,
}

/// 추세 지표 계산기.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendIndicators;

impl TrendIndicators {
    /// 새로운 추세 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 지수 이동평균 (EMA) 계산.
    ///
    /// EMA = 가격 × k + 이전EMA × (1 - k), k = 2 / (period + 1)
    /// 첫 EMA는 period개 가격의 SMA입니다.
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if prices.len() < period {
            return Err(IndicatorError::InsufficientData {
                required: period,
                provided: prices.len(),
            });
        }

        let mut result = Vec::with_capacity(prices.len());
        let multiplier = dec!(2) / Decimal::from(period + 1);

        // 처음 period-1개는 None
        for _ in 0..period - 1 {
            result.push(None);
        }

        // 첫 EMA는 SMA로 시작
        let initial_sma: Decimal = prices[..period].iter().sum::<Decimal>() / Decimal::from(period);
        result.push(Some(initial_sma));

        let mut prev_ema = initial_sma;
        for price in prices.iter().skip(period) {
            let ema = (*price * multiplier) + (prev_ema * (Decimal::ONE - multiplier));
            result.push(Some(ema));
            prev_ema = ema;
        }

        Ok(result)
    }

    /// 최신 EMA 값. 데이터가 부족하면 첫 종가(입력이 비면 0)를 반환합니다.
    pub fn latest_ema(&self, prices: &[Decimal], period: usize) -> Decimal {
        self.ema(prices, EmaParams { period })
            .ok()
            .and_then(|values| values.last().copied().flatten())
            .unwrap_or_else(|| prices.first().copied().unwrap_or(Decimal::ZERO))
    }

    /// 최신 7/50/100 EMA.
    pub fn ema_triple(&self, prices: &[Decimal]) -> EmaTriple {
        EmaTriple {
            short: self.latest_ema(prices, EMA_SHORT),
            medium: self.latest_ema(prices, EMA_MEDIUM),
            long: self.latest_ema(prices, EMA_LONG),
        }
    }

    /// 직전 바와 현재 바의 EMA 정렬을 비교해 이벤트를 감지합니다.
    ///
    /// 입력이 2개 미만이면 이벤트가 없습니다.
    pub fn latest_crossovers(&self, prices: &[Decimal]) -> Vec<EmaCrossEvent> {
        if prices.len() < 2 {
            return Vec::new();
        }
        let previous = self.ema_triple(&prices[..prices.len() - 1]);
        let current = self.ema_triple(prices);
        detect_crossovers(&previous, &current)
    }
}

/// 두 시점의 EMA 묶음을 비교해 상태가 바뀐 경우에만 이벤트를 반환합니다.
pub fn detect_crossovers(previous: &EmaTriple, current: &EmaTriple) -> Vec<EmaCrossEvent> {
    let mut events = Vec::new();

    if previous.short <= previous.medium && current.short > current.medium {
        events.push(EmaCrossEvent::GoldenCross);
    } else if previous.short >= previous.medium && current.short < current.medium {
        events.push(EmaCrossEvent::DeathCross);
    }

    match (previous.alignment(), current.alignment()) {
        (prev, curr) if prev == curr => {}
        (_, EmaAlignment::AllBullish) => events.push(EmaCrossEvent::BullishAlignmentFormed),
        (_, EmaAlignment::AllBearish) => events.push(EmaCrossEvent::BearishAlignmentFormed),
        (_, EmaAlignment::Mixed) => events.push(EmaCrossEvent::AlignmentLost),
    }

    events
}
