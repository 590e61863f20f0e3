//! 차트 패턴 레코드.
//!
//! 패턴은 한 번 생성되면 변경하지 않습니다. 상위 타임프레임 확인은
//! [`Pattern::with_confirmation`]으로 보강된 사본을 만들어 반환합니다.

use crate::types::{DecimalExt, Price, Timeframe};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 신뢰도 점수 하한.
pub const MIN_CONFIDENCE: f64 = 0.0;
/// 신뢰도 점수 상한.
pub const MAX_CONFIDENCE: f64 = 100.0;

/// 신뢰도 점수를 [0, 100] 구간으로 고정합니다. NaN은 0으로 처리합니다.
pub fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        return MIN_CONFIDENCE;
    }
    score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

/// 예측 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// 상승
    Bullish,
    /// 하락
    Bearish,
    /// 중립
    Neutral,
}

impl Direction {
    /// 같은 방향이거나 한쪽이 중립이면 호환됩니다.
    pub fn is_compatible(&self, other: Direction) -> bool {
        *self == other || *self == Direction::Neutral || other == Direction::Neutral
    }

    /// 엄격하게 반대 방향인지 확인합니다.
    pub fn is_opposing(&self, other: Direction) -> bool {
        !self.is_compatible(other)
    }

    /// 가격 변화의 부호로부터 방향을 결정합니다.
    pub fn from_change(change: Decimal) -> Self {
        if change > Decimal::ZERO {
            Direction::Bullish
        } else if change < Decimal::ZERO {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "bullish"),
            Direction::Bearish => write!(f, "bearish"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

/// 가상 거래의 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    /// 매수
    Long,
    /// 매도
    Short,
}

impl TradeSide {
    /// 손익 계산에 쓰는 부호 (매수 +1, 매도 -1).
    pub fn sign(&self) -> Decimal {
        match self {
            TradeSide::Long => Decimal::ONE,
            TradeSide::Short => Decimal::NEGATIVE_ONE,
        }
    }

    /// 이 방향에 대응하는 예측 방향.
    pub fn direction(&self) -> Direction {
        match self {
            TradeSide::Long => Direction::Bullish,
            TradeSide::Short => Direction::Bearish,
        }
    }
}

/// 지지선/저항선 쌍의 기울기로 분류한 채널 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    /// 상승 채널
    Ascending,
    /// 하락 채널
    Descending,
    /// 수평 채널
    Horizontal,
    /// 분류 불가
    None,
}

impl ChannelType {
    /// 채널 유형이 암시하는 방향.
    pub fn direction(&self) -> Direction {
        match self {
            ChannelType::Ascending => Direction::Bullish,
            ChannelType::Descending => Direction::Bearish,
            ChannelType::Horizontal | ChannelType::None => Direction::Neutral,
        }
    }
}

/// 패턴 계열.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternFamily {
    /// 채널 기반
    Channel,
    /// 깃발 기반
    Flag,
    /// 삼각형 기반
    Triangle,
}

/// 패턴 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// 상승 삼각형
    AscendingTriangle,
    /// 하락 삼각형
    DescendingTriangle,
    /// 대칭 삼각형
    SymmetricalTriangle,
    /// 상승 깃발
    BullFlag,
    /// 하락 깃발
    BearFlag,
    /// 상승 채널
    AscendingChannel,
    /// 하락 채널
    DescendingChannel,
}

impl PatternType {
    /// 이 유형이 속한 계열.
    pub fn family(&self) -> PatternFamily {
        match self {
            PatternType::AscendingTriangle
            | PatternType::DescendingTriangle
            | PatternType::SymmetricalTriangle => PatternFamily::Triangle,
            PatternType::BullFlag | PatternType::BearFlag => PatternFamily::Flag,
            PatternType::AscendingChannel | PatternType::DescendingChannel => {
                PatternFamily::Channel
            }
        }
    }

    /// 사람이 읽는 이름.
    pub fn name(&self) -> &'static str {
        match self {
            PatternType::AscendingTriangle => "Ascending Triangle",
            PatternType::DescendingTriangle => "Descending Triangle",
            PatternType::SymmetricalTriangle => "Symmetrical Triangle",
            PatternType::BullFlag => "Bull Flag",
            PatternType::BearFlag => "Bear Flag",
            PatternType::AscendingChannel => "Ascending Channel",
            PatternType::DescendingChannel => "Descending Channel",
        }
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 계열별 세부 정보.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum PatternDetails {
    /// 채널 기반 패턴
    Channel {
        /// 채널 유형
        channel_type: ChannelType,
        /// 지지선 기울기 (바당 가격 대비 %)
        support_slope: Decimal,
        /// 저항선 기울기 (바당 가격 대비 %)
        resistance_slope: Decimal,
        /// 현재 위치에서의 채널 폭
        width: Price,
    },
    /// 깃발 기반 패턴
    Flag {
        /// 윈도우 전체의 종가 변화율 (%)
        pole_change_percent: Decimal,
        /// 깃발 구간(지지/저항 평균) 기울기 (바당 가격 대비 %)
        flag_slope: Decimal,
    },
    /// 삼각형 기반 패턴
    Triangle {
        /// 윈도우 시작 대비 현재 채널 폭의 비율 (1 미만이면 수렴)
        convergence: Decimal,
        /// 두 추세선이 만나기까지 남은 바 수 (평행하거나 발산하면 없음)
        bars_to_apex: Option<usize>,
    },
}

impl PatternDetails {
    /// 세부 정보가 나타내는 계열.
    pub fn family(&self) -> PatternFamily {
        match self {
            PatternDetails::Channel { .. } => PatternFamily::Channel,
            PatternDetails::Flag { .. } => PatternFamily::Flag,
            PatternDetails::Triangle { .. } => PatternFamily::Triangle,
        }
    }
}

/// 상위 타임프레임 하나에 대한 확인 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeConfirmation {
    /// 상위 타임프레임
    pub timeframe: Timeframe,
    /// 기준 타임프레임으로부터의 단계 (1 또는 2)
    pub level: u8,
    /// 상위 채널이 암시하는 방향
    pub higher_direction: Direction,
    /// 방향 호환 여부
    pub compatible: bool,
    /// 현재 가격이 상위 채널 안에 있는지 여부
    pub inside_channel: bool,
    /// 최종 확인 여부
    pub confirmed: bool,
    /// 적용된 신뢰도 배수
    pub factor: f64,
}

/// 상위 타임프레임 확인 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationSummary {
    /// 타임프레임별 결과
    pub timeframes: Vec<TimeframeConfirmation>,
    /// 확인된 타임프레임 수
    pub confirming_count: usize,
    /// 확인 이전 신뢰도
    pub prior_confidence: f64,
    /// 확인 이전 목표가
    pub prior_target: Price,
}

/// 감지된 차트 패턴.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// 결정적 식별자 (동일 윈도우는 동일 ID)
    pub id: Uuid,
    /// 종목 코드
    pub symbol: String,
    /// 감지 타임프레임
    pub timeframe: Timeframe,
    /// 패턴 유형
    pub pattern_type: PatternType,
    /// 예측 방향
    pub direction: Direction,
    /// 진입가 (윈도우 마지막 종가)
    pub entry_price: Price,
    /// 목표가
    pub target_price: Price,
    /// 손절가
    pub stop_loss: Option<Price>,
    /// 신뢰도 점수 [0, 100]
    pub confidence_score: f64,
    /// 상위 타임프레임 확인 여부
    pub higher_timeframe_confirmed: bool,
    /// 감지 시점 (윈도우 마지막 바의 종료 시간)
    pub detected_at: DateTime<Utc>,
    /// 레코드 생성 시각 (주입된 클럭 기준)
    pub created_at: DateTime<Utc>,
    /// 계열별 세부 정보
    pub details: PatternDetails,
    /// 상위 타임프레임 확인 요약
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<ConfirmationSummary>,
}

impl Pattern {
    /// 종목, 타임프레임, 감지 시점, 유형으로부터 결정적 ID를 만듭니다.
    pub fn derive_id(
        symbol: &str,
        timeframe: Timeframe,
        detected_at: DateTime<Utc>,
        pattern_type: PatternType,
    ) -> Uuid {
        let key = format!(
            "{}|{}|{}|{:?}",
            symbol,
            timeframe,
            detected_at.timestamp(),
            pattern_type
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
    }

    /// 패턴 계열.
    pub fn family(&self) -> PatternFamily {
        self.pattern_type.family()
    }

    /// 목표가가 진입가 이상이면 매수, 아니면 매도.
    pub fn trade_side(&self) -> TradeSide {
        if self.target_price >= self.entry_price {
            TradeSide::Long
        } else {
            TradeSide::Short
        }
    }

    /// 진입가 대비 목표가까지의 기대 수익률 (%).
    pub fn expected_move_percent(&self) -> Decimal {
        self.target_price.percent_change_from(self.entry_price) * self.trade_side().sign()
    }

    /// 확인 결과를 반영한 사본을 반환합니다. 원본은 변경되지 않습니다.
    pub fn with_confirmation(
        &self,
        confidence_score: f64,
        target_price: Price,
        summary: ConfirmationSummary,
    ) -> Pattern {
        Pattern {
            confidence_score: clamp_confidence(confidence_score),
            target_price,
            higher_timeframe_confirmed: summary.confirming_count > 0,
            confirmation: Some(summary),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_pattern() -> Pattern {
        let detected_at = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        Pattern {
            id: Pattern::derive_id("AAPL", Timeframe::H4, detected_at, PatternType::BullFlag),
            symbol: "AAPL".to_string(),
            timeframe: Timeframe::H4,
            pattern_type: PatternType::BullFlag,
            direction: Direction::Bullish,
            entry_price: dec!(100),
            target_price: dec!(110),
            stop_loss: Some(dec!(95)),
            confidence_score: 60.0,
            higher_timeframe_confirmed: false,
            detected_at,
            created_at: detected_at,
            details: PatternDetails::Flag {
                pole_change_percent: dec!(8),
                flag_slope: dec!(0.2),
            },
            confirmation: None,
        }
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(120.0), 100.0);
        assert_eq!(clamp_confidence(-5.0), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
        assert_eq!(clamp_confidence(42.5), 42.5);
    }

    #[test]
    fn test_direction_compatibility() {
        assert!(Direction::Bullish.is_compatible(Direction::Bullish));
        assert!(Direction::Bullish.is_compatible(Direction::Neutral));
        assert!(Direction::Neutral.is_compatible(Direction::Bearish));
        assert!(Direction::Bullish.is_opposing(Direction::Bearish));
    }

    #[test]
    fn test_pattern_family() {
        assert_eq!(PatternType::BullFlag.family(), PatternFamily::Flag);
        assert_eq!(PatternType::SymmetricalTriangle.family(), PatternFamily::Triangle);
        assert_eq!(PatternType::DescendingChannel.family(), PatternFamily::Channel);
    }

    #[test]
    fn test_derive_id_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let a = Pattern::derive_id("AAPL", Timeframe::H4, ts, PatternType::BullFlag);
        let b = Pattern::derive_id("AAPL", Timeframe::H4, ts, PatternType::BullFlag);
        let c = Pattern::derive_id("MSFT", Timeframe::H4, ts, PatternType::BullFlag);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_with_confirmation_returns_enriched_copy() {
        let original = sample_pattern();
        let summary = ConfirmationSummary {
            timeframes: Vec::new(),
            confirming_count: 1,
            prior_confidence: original.confidence_score,
            prior_target: original.target_price,
        };

        let enriched = original.with_confirmation(150.0, dec!(112), summary);

        assert_eq!(enriched.confidence_score, 100.0);
        assert_eq!(enriched.target_price, dec!(112));
        assert!(enriched.higher_timeframe_confirmed);
        assert_eq!(original.confidence_score, 60.0);
        assert!(!original.higher_timeframe_confirmed);
        assert_eq!(enriched.id, original.id);
    }

    #[test]
    fn test_trade_side_and_expected_move() {
        let mut pattern = sample_pattern();
        assert_eq!(pattern.trade_side(), TradeSide::Long);
        assert_eq!(pattern.expected_move_percent(), dec!(10));

        pattern.target_price = dec!(90);
        assert_eq!(pattern.trade_side(), TradeSide::Short);
        assert_eq!(pattern.expected_move_percent(), dec!(10));
    }

    #[test]
    fn test_details_serialize_with_family_tag() {
        let json = serde_json::to_value(sample_pattern().details).unwrap();
        assert_eq!(json["family"], "flag");
    }
}
