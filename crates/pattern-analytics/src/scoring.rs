//! 패턴 신뢰도 점수.
//!
//! 기본 50점에서 항목별 가산점을 더하고 [0, 100]으로 고정합니다.
//! 각 항목은 독립적으로 테스트할 수 있는 순수 함수입니다.
//!
//! | 항목 | 조건 | 가산점 |
//! |---|---|---|
//! | RSI 극단 | ≤20 또는 ≥80 / ≤30 또는 ≥70 | 15 / 7 |
//! | 거래량 급증 | 비율 ≥2.0 / ≥1.5 | 15 / 7 |
//! | ATR 상승 | 비율 ≥1.5 / ≥1.2 | 15 / 7 |
//! | EMA 정렬 | 완전 일치 / 단기만 일치 | 15 / 7 |
//! | 추세선 강도 | ≥0.7 / ≥0.5 / ≥0.3 | 15 / 10 / 5 |
//! | 반등 비율 | ≥75 / ≥60 / ≥50 | 15 / 10 / 5 |

use pattern_core::{clamp_confidence, Direction};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::indicators::{EmaAlignment, EmaTriple, IndicatorSnapshot};

/// 기본 점수.
pub const BASE_SCORE: f64 = 50.0;

/// RSI 극단 가산점.
pub fn rsi_extremity_score(rsi: f64) -> f64 {
    if rsi <= 20.0 || rsi >= 80.0 {
        15.0
    } else if rsi <= 30.0 || rsi >= 70.0 {
        7.0
    } else {
        0.0
    }
}

/// 거래량 급증 가산점.
pub fn volume_surge_score(volume_ratio: f64) -> f64 {
    if volume_ratio >= 2.0 {
        15.0
    } else if volume_ratio >= 1.5 {
        7.0
    } else {
        0.0
    }
}

/// ATR 상승 가산점.
pub fn atr_elevation_score(atr_ratio: f64) -> f64 {
    if atr_ratio >= 1.5 {
        15.0
    } else if atr_ratio >= 1.2 {
        7.0
    } else {
        0.0
    }
}

/// EMA 정렬 가산점.
///
/// 방향성 패턴은 완전 정렬이 일치하면 15, 7/50만 일치하면 7.
/// 중립 패턴은 어느 쪽이든 완전 정렬이면 7.
pub fn ema_alignment_score(ema: &EmaTriple, direction: Direction) -> f64 {
    let alignment = ema.alignment();
    match direction {
        Direction::Neutral => {
            if alignment == EmaAlignment::Mixed {
                0.0
            } else {
                7.0
            }
        }
        _ => {
            if alignment.direction() == direction {
                15.0
            } else if ema.short_term_direction() == direction {
                7.0
            } else {
                0.0
            }
        }
    }
}

/// 평균 추세선 강도 가산점.
pub fn trendline_strength_score(average_strength: f64) -> f64 {
    if average_strength >= 0.7 {
        15.0
    } else if average_strength >= 0.5 {
        10.0
    } else if average_strength >= 0.3 {
        5.0
    } else {
        0.0
    }
}

/// 평균 반등 비율 가산점.
pub fn bounce_reliability_score(average_bounce: f64) -> f64 {
    if average_bounce >= 75.0 {
        15.0
    } else if average_bounce >= 60.0 {
        10.0
    } else if average_bounce >= 50.0 {
        5.0
    } else {
        0.0
    }
}

/// 항목별 점수 내역.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 기본 점수
    pub base: f64,
    /// RSI 극단
    pub rsi: f64,
    /// 거래량 급증
    pub volume: f64,
    /// ATR 상승
    pub atr: f64,
    /// EMA 정렬
    pub ema: f64,
    /// 추세선 강도
    pub strength: f64,
    /// 반등 비율
    pub bounce: f64,
    /// [0, 100]으로 고정한 합계
    pub total: f64,
}

/// 점수 계산 입력.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    /// RSI
    pub rsi: f64,
    /// 거래량 추세 비율
    pub volume_ratio: f64,
    /// ATR 상승 비율
    pub atr_ratio: f64,
    /// EMA 묶음
    pub ema: &'a EmaTriple,
    /// 패턴 방향
    pub direction: Direction,
    /// 평균 추세선 강도 [0, 1]
    pub average_strength: f64,
    /// 평균 반등 비율 (%)
    pub average_bounce: f64,
}

/// 신뢰도 점수 계산기.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    /// 새 계산기를 생성합니다.
    pub fn new() -> Self {
        Self
    }

    /// 입력으로부터 점수 내역을 계산합니다.
    pub fn score(&self, inputs: ScoreInputs<'_>) -> ScoreBreakdown {
        let rsi = rsi_extremity_score(inputs.rsi);
        let volume = volume_surge_score(inputs.volume_ratio);
        let atr = atr_elevation_score(inputs.atr_ratio);
        let ema = ema_alignment_score(inputs.ema, inputs.direction);
        let strength = trendline_strength_score(inputs.average_strength);
        let bounce = bounce_reliability_score(inputs.average_bounce);

        ScoreBreakdown {
            base: BASE_SCORE,
            rsi,
            volume,
            atr,
            ema,
            strength,
            bounce,
            total: clamp_confidence(BASE_SCORE + rsi + volume + atr + ema + strength + bounce),
        }
    }

    /// 지표 스냅샷과 채널로 점수를 계산합니다.
    pub fn score_pattern(
        &self,
        snapshot: &IndicatorSnapshot,
        channel: &Channel,
        direction: Direction,
    ) -> ScoreBreakdown {
        self.score(ScoreInputs {
            rsi: snapshot.rsi,
            volume_ratio: snapshot.volume_trend.ratio,
            atr_ratio: snapshot.atr_ratio,
            ema: &snapshot.ema,
            direction,
            average_strength: channel.strength,
            average_bounce: channel.average_bounce(),
        })
    }
}
