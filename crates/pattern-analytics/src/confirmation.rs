//! 상위 타임프레임 확인 엔진.
//!
//! 패턴 방향과 상위 타임프레임 채널 방향을 비교해 신뢰도를 조정하고,
//! 확인되면 상위 타임프레임 피벗 레벨로 목표가를 다시 계산합니다.
//! 결과는 항상 보강된 사본이며 입력 패턴은 바뀌지 않습니다.

use pattern_core::{
    clamp_confidence, ChannelType, ConfirmationConfig, ConfirmationSummary, Pattern, Price,
    PriceBar, Timeframe, TimeframeConfirmation, TradeSide,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::channel::{Channel, ChannelConfig, ChannelIdentifier};
use crate::timeframe_alignment::TimeframeAligner;
use crate::trendline::PriceLevel;

/// 1단계 상위 타임프레임이 같은 방향일 때의 배수.
pub const LEVEL_ONE_CONFIRM_FACTOR: f64 = 1.3;
/// 2단계 상위 타임프레임이 같은 방향일 때의 배수.
pub const LEVEL_TWO_CONFIRM_FACTOR: f64 = 1.4;
/// 1단계 상위 타임프레임이 반대 방향일 때의 배수.
pub const LEVEL_ONE_PENALTY_FACTOR: f64 = 0.7;
/// 2단계 상위 타임프레임이 반대 방향일 때의 배수.
pub const LEVEL_TWO_PENALTY_FACTOR: f64 = 0.6;

/// 확인 시 신뢰도 배수.
pub fn confirmation_factor(level: u8) -> f64 {
    if level <= 1 {
        LEVEL_ONE_CONFIRM_FACTOR
    } else {
        LEVEL_TWO_CONFIRM_FACTOR
    }
}

/// 역추세 시 신뢰도 배수.
pub fn counter_trend_factor(level: u8) -> f64 {
    if level <= 1 {
        LEVEL_ONE_PENALTY_FACTOR
    } else {
        LEVEL_TWO_PENALTY_FACTOR
    }
}

/// 배수를 적용하고 [0, 100]으로 고정합니다.
pub fn apply_factor(score: f64, factor: f64) -> f64 {
    clamp_confidence(score * factor)
}

/// 상위 타임프레임 목표가 혼합 가중치: min(0.3 + 0.2 × 확인 수, 0.7).
pub fn target_blend_weight(confirming_count: usize) -> Decimal {
    (dec!(0.3) + dec!(0.2) * Decimal::from(confirming_count)).min(dec!(0.7))
}

/// 확인에 사용하는 상위 타임프레임 정보.
#[derive(Debug, Clone)]
pub struct HigherTimeframeView {
    /// 상위 타임프레임
    pub timeframe: Timeframe,
    /// 기준 타임프레임으로부터의 단계 (1 또는 2)
    pub level: u8,
    /// 상위 타임프레임 채널 (없으면 영향 없음)
    pub channel: Option<Channel>,
    /// 군집화된 피벗 레벨
    pub pivot_levels: Vec<PriceLevel>,
}

/// 상위 타임프레임 확인 엔진.
#[derive(Debug, Clone)]
pub struct ConfirmationEngine {
    config: ConfirmationConfig,
    channels: ChannelIdentifier,
}

impl ConfirmationEngine {
    /// 새 엔진을 생성합니다.
    pub fn new(config: ConfirmationConfig, channel_config: ChannelConfig) -> Self {
        Self {
            config,
            channels: ChannelIdentifier::new(channel_config),
        }
    }

    /// 기본 설정으로 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(ConfirmationConfig::default(), ChannelConfig::default())
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &ConfirmationConfig {
        &self.config
    }

    /// 상위 타임프레임 바로 확인용 정보를 만듭니다.
    ///
    /// 패턴 감지 시점에 완료된 바 중 최근 `lookback_bars`개만 사용합니다.
    pub fn build_view(
        &self,
        pattern: &Pattern,
        timeframe: Timeframe,
        level: u8,
        bars: &[PriceBar],
    ) -> HigherTimeframeView {
        let completed =
            TimeframeAligner::latest_n_completed(bars, pattern.detected_at, self.config.lookback_bars);

        let channel = self
            .channels
            .identify(completed)
            .filter(|c| c.channel_type != ChannelType::None);
        let pivot_levels = match &channel {
            Some(c) => c.levels.clone(),
            None => self.channels.pivot_levels(completed),
        };

        HigherTimeframeView {
            timeframe,
            level,
            channel,
            pivot_levels,
        }
    }

    /// (단계, 타임프레임, 바) 목록으로 확인합니다.
    ///
    /// 단계는 입력 순서가 아니라 호출자가 지정한 값을 따르므로,
    /// 1단계 조회가 실패해 2단계만 남은 경우에도 2단계 배수가 적용됩니다.
    pub fn confirm_with_bars(&self, pattern: &Pattern, higher: &[(u8, Timeframe, Vec<PriceBar>)]) -> Pattern {
        let views: Vec<HigherTimeframeView> = higher
            .iter()
            .map(|(level, tf, bars)| self.build_view(pattern, *tf, *level, bars))
            .collect();
        self.confirm(pattern, &views)
    }

    /// 상위 타임프레임 정보로 패턴을 확인하고 보강된 사본을 반환합니다.
    ///
    /// 각 타임프레임은 독립적으로 평가되며 배수는 곱으로 누적되고
    /// 매 단계마다 [0, 100]으로 고정됩니다.
    pub fn confirm(&self, pattern: &Pattern, views: &[HigherTimeframeView]) -> Pattern {
        let mut confidence = pattern.confidence_score;
        let mut outcomes = Vec::new();
        let mut confirming_views = Vec::new();

        for view in views.iter().take(2) {
            let Some(channel) = &view.channel else {
                continue;
            };

            let higher_direction = channel.direction();
            let compatible = pattern.direction.is_compatible(higher_direction);
            let inside_channel =
                channel.contains(pattern.entry_price, self.config.inside_channel_tolerance);

            let factor = if compatible {
                confirmation_factor(view.level)
            } else {
                counter_trend_factor(view.level)
            };
            confidence = apply_factor(confidence, factor);

            let confirmed =
                compatible || (self.config.force_confirm_inside_channel && inside_channel);
            if confirmed {
                confirming_views.push(view);
            }

            debug!(
                symbol = %pattern.symbol,
                higher_timeframe = %view.timeframe,
                level = view.level,
                higher_direction = %higher_direction,
                compatible,
                inside_channel,
                confirmed,
                factor,
                confidence,
                "Higher timeframe evaluated"
            );

            outcomes.push(TimeframeConfirmation {
                timeframe: view.timeframe,
                level: view.level,
                higher_direction,
                compatible,
                inside_channel,
                confirmed,
                factor,
            });
        }

        let target = if confirming_views.is_empty() {
            pattern.target_price
        } else {
            self.blended_target(pattern, &confirming_views)
        };

        let summary = ConfirmationSummary {
            confirming_count: confirming_views.len(),
            timeframes: outcomes,
            prior_confidence: pattern.confidence_score,
            prior_target: pattern.target_price,
        };

        pattern.with_confirmation(confidence, target, summary)
    }

    /// 확인된 타임프레임의 피벗 레벨로 목표가를 다시 계산합니다.
    ///
    /// 타임프레임마다 진입가 너머 가장 가까운 레벨을 고르고,
    /// `타임프레임 가중치 × 접촉 수`로 가중 평균한 뒤 기존 목표가와 섞습니다.
    /// 진입가 너머 레벨이 하나도 없으면 기존 목표가를 유지합니다.
    fn blended_target(&self, pattern: &Pattern, views: &[&HigherTimeframeView]) -> Price {
        let side = pattern.trade_side();
        let entry = pattern.entry_price;

        let mut weighted_sum = Decimal::ZERO;
        let mut weight_total = Decimal::ZERO;
        for view in views {
            let nearest = view
                .pivot_levels
                .iter()
                .filter(|l| match side {
                    TradeSide::Long => l.price > entry,
                    TradeSide::Short => l.price < entry,
                })
                .min_by_key(|l| (l.price - entry).abs());

            if let Some(level) = nearest {
                let weight = Decimal::from(view.timeframe.confirmation_weight())
                    * Decimal::from(level.touches.max(1));
                weighted_sum += level.price * weight;
                weight_total += weight;
            }
        }

        if weight_total.is_zero() {
            return pattern.target_price;
        }

        let higher_target = weighted_sum / weight_total;
        let blend = target_blend_weight(views.len());
        pattern.target_price * (Decimal::ONE - blend) + higher_target * blend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trendline::{Trendline, TrendlineKind};
    use chrono::{TimeZone, Utc};
    use pattern_core::{Direction, PatternDetails, PatternType};

    fn line(kind: TrendlineKind, intercept: Decimal, slope: Decimal) -> Trendline {
        Trendline {
            kind,
            slope,
            intercept,
            start_index: 0,
            end_index: 9,
            start_price: intercept,
            end_price: intercept + slope * dec!(9),
            strength: 0.5,
            touch_count: 3,
            bounce_percentage: 50.0,
        }
    }

    fn channel(channel_type: ChannelType, support: Decimal, resistance: Decimal) -> Channel {
        Channel {
            channel_type,
            support: line(TrendlineKind::Support, support, Decimal::ZERO),
            resistance: line(TrendlineKind::Resistance, resistance, Decimal::ZERO),
            strength: 0.5,
            touch_points: 6,
            support_slope_percent: Decimal::ZERO,
            resistance_slope_percent: Decimal::ZERO,
            levels: Vec::new(),
            last_index: 9,
            atr: dec!(1),
        }
    }

    fn view(timeframe: Timeframe, level: u8, channel: Option<Channel>, levels: Vec<PriceLevel>) -> HigherTimeframeView {
        HigherTimeframeView {
            timeframe,
            level,
            channel,
            pivot_levels: levels,
        }
    }

    fn bullish_pattern(confidence: f64) -> Pattern {
        let detected_at = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        Pattern {
            id: Pattern::derive_id("AAPL", Timeframe::H4, detected_at, PatternType::BullFlag),
            symbol: "AAPL".to_string(),
            timeframe: Timeframe::H4,
            pattern_type: PatternType::BullFlag,
            direction: Direction::Bullish,
            entry_price: dec!(100),
            target_price: dec!(110),
            stop_loss: Some(dec!(95)),
            confidence_score: confidence,
            higher_timeframe_confirmed: false,
            detected_at,
            created_at: detected_at,
            details: PatternDetails::Flag {
                pole_change_percent: dec!(5),
                flag_slope: dec!(0.3),
            },
            confirmation: None,
        }
    }

    #[test]
    fn test_factor_constants() {
        assert_eq!(confirmation_factor(1), 1.3);
        assert_eq!(confirmation_factor(2), 1.4);
        assert_eq!(counter_trend_factor(1), 0.7);
        assert_eq!(counter_trend_factor(2), 0.6);
    }

    #[test]
    fn test_apply_factor_clamps() {
        assert_eq!(apply_factor(90.0, 1.4), 100.0);
        assert!((apply_factor(50.0, 0.7) - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_target_blend_weight() {
        assert_eq!(target_blend_weight(0), dec!(0.3));
        assert_eq!(target_blend_weight(1), dec!(0.5));
        assert_eq!(target_blend_weight(2), dec!(0.7));
        assert_eq!(target_blend_weight(5), dec!(0.7));
    }

    #[test]
    fn test_compatible_higher_timeframe_boosts() {
        let engine = ConfirmationEngine::with_defaults();
        let pattern = bullish_pattern(60.0);
        let views = vec![view(
            Timeframe::D1,
            1,
            Some(channel(ChannelType::Ascending, dec!(90), dec!(105))),
            vec![PriceLevel { price: dec!(120), touches: 2 }],
        )];

        let confirmed = engine.confirm(&pattern, &views);

        assert!((confirmed.confidence_score - 78.0).abs() < 1e-9);
        assert!(confirmed.higher_timeframe_confirmed);
        // 0.5 × 110 + 0.5 × 120
        assert_eq!(confirmed.target_price, dec!(115));
        // 원본은 그대로
        assert_eq!(pattern.confidence_score, 60.0);
        assert_eq!(pattern.target_price, dec!(110));
    }

    #[test]
    fn test_two_levels_compose_multiplicatively() {
        let engine = ConfirmationEngine::with_defaults();
        let pattern = bullish_pattern(50.0);
        let views = vec![
            view(Timeframe::D1, 1, Some(channel(ChannelType::Ascending, dec!(90), dec!(105))), vec![]),
            view(Timeframe::W1, 2, Some(channel(ChannelType::Horizontal, dec!(80), dec!(130))), vec![]),
        ];

        let confirmed = engine.confirm(&pattern, &views);
        assert!((confirmed.confidence_score - 91.0).abs() < 1e-9);
        assert_eq!(confirmed.confirmation.as_ref().unwrap().confirming_count, 2);
        // 레벨이 없으면 목표가 유지
        assert_eq!(confirmed.target_price, dec!(110));
    }

    #[test]
    fn test_opposing_higher_timeframe_penalizes() {
        let engine = ConfirmationEngine::with_defaults();
        let pattern = bullish_pattern(60.0);
        let views = vec![view(
            Timeframe::D1,
            1,
            Some(channel(ChannelType::Descending, dec!(120), dec!(140))),
            vec![],
        )];

        let result = engine.confirm(&pattern, &views);
        assert!(result.confidence_score < pattern.confidence_score);
        assert!((result.confidence_score - 42.0).abs() < 1e-9);
        assert!(!result.higher_timeframe_confirmed);
    }

    #[test]
    fn test_inside_channel_override_is_togglable() {
        let pattern = bullish_pattern(60.0);
        // 하락 채널이지만 가격(100)이 [98×0.98, 102×1.02] 안
        let views = vec![view(
            Timeframe::D1,
            1,
            Some(channel(ChannelType::Descending, dec!(98), dec!(102))),
            vec![],
        )];

        let forced = ConfirmationEngine::with_defaults().confirm(&pattern, &views);
        assert!(forced.higher_timeframe_confirmed);
        // 확인 플래그만 바뀌고 배수는 역추세 그대로
        assert!((forced.confidence_score - 42.0).abs() < 1e-9);

        let config = ConfirmationConfig {
            force_confirm_inside_channel: false,
            ..Default::default()
        };
        let strict = ConfirmationEngine::new(config, ChannelConfig::default()).confirm(&pattern, &views);
        assert!(!strict.higher_timeframe_confirmed);
    }

    #[test]
    fn test_missing_channel_has_no_effect() {
        let engine = ConfirmationEngine::with_defaults();
        let pattern = bullish_pattern(60.0);
        let result = engine.confirm(&pattern, &[view(Timeframe::D1, 1, None, vec![])]);

        assert_eq!(result.confidence_score, 60.0);
        assert_eq!(result.target_price, pattern.target_price);
        assert!(!result.higher_timeframe_confirmed);
        assert!(result.confirmation.unwrap().timeframes.is_empty());
    }

    #[test]
    fn test_weekly_levels_outweigh_lower_timeframes() {
        let engine = ConfirmationEngine::with_defaults();
        let pattern = bullish_pattern(60.0);
        let views = vec![
            view(
                Timeframe::H4,
                1,
                Some(channel(ChannelType::Ascending, dec!(90), dec!(105))),
                vec![PriceLevel { price: dec!(104), touches: 1 }],
            ),
            view(
                Timeframe::W1,
                2,
                Some(channel(ChannelType::Ascending, dec!(80), dec!(130))),
                vec![PriceLevel { price: dec!(120), touches: 1 }],
            ),
        ];

        let result = engine.confirm(&pattern, &views);
        // 상위 목표가 = (104×1 + 120×3) / 4 = 116, 혼합 0.7
        // 110 × 0.3 + 116 × 0.7 = 114.2
        assert_eq!(result.target_price, dec!(114.2));
    }
}
