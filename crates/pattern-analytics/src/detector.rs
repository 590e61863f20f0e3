//! 슬라이딩 윈도우 패턴 감지기.
//!
//! 각 윈도우에서 채널을 식별하고, 채널 유형과 EMA 정렬로 패턴 유형을 정한 뒤
//! 진입가/목표가/손절가와 신뢰도를 계산합니다. 지표는 윈도우 끝까지의
//! 전체 이력으로 계산하므로 미래 데이터를 참조하지 않습니다.

use std::sync::Arc;

use pattern_core::{
    ChannelType, Clock, DecimalExt, DetectionConfig, Direction, Pattern, PatternDetails, PatternType, Price,
    PriceBar, SystemClock, TradeSide, MIN_WINDOW_BARS,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::channel::{Channel, ChannelConfig, ChannelIdentifier};
use crate::indicators::{EmaAlignment, IndicatorEngine, IndicatorSnapshot};
use crate::scoring::{ConfidenceScorer, ScoreBreakdown};

/// 채널 유형과 EMA 정렬로 패턴 유형을 결정합니다.
///
/// 분류 불가 채널은 패턴이 아닙니다.
pub fn classify_pattern(channel_type: ChannelType, alignment: EmaAlignment) -> Option<PatternType> {
    match (channel_type, alignment) {
        (ChannelType::Ascending, EmaAlignment::AllBullish) => Some(PatternType::AscendingTriangle),
        (ChannelType::Ascending, EmaAlignment::Mixed) => Some(PatternType::BullFlag),
        (ChannelType::Ascending, EmaAlignment::AllBearish) => Some(PatternType::AscendingChannel),
        (ChannelType::Descending, EmaAlignment::AllBearish) => {
            Some(PatternType::DescendingTriangle)
        }
        (ChannelType::Descending, EmaAlignment::Mixed) => Some(PatternType::BearFlag),
        (ChannelType::Descending, EmaAlignment::AllBullish) => {
            Some(PatternType::DescendingChannel)
        }
        (ChannelType::Horizontal, _) => Some(PatternType::SymmetricalTriangle),
        (ChannelType::None, _) => None,
    }
}

/// 윈도우 하나의 분석 결과.
#[derive(Debug, Clone)]
pub struct PatternAnalysis {
    /// 감지된 패턴
    pub pattern: Pattern,
    /// 패턴의 근거가 된 채널
    pub channel: Channel,
    /// 지표 스냅샷
    pub snapshot: IndicatorSnapshot,
    /// 신뢰도 점수 내역
    pub breakdown: ScoreBreakdown,
}

/// 패턴 감지기.
#[derive(Clone)]
pub struct PatternDetector {
    config: DetectionConfig,
    channels: ChannelIdentifier,
    indicators: IndicatorEngine,
    scorer: ConfidenceScorer,
    clock: Arc<dyn Clock>,
}

impl PatternDetector {
    /// 새 감지기를 생성합니다.
    pub fn new(config: DetectionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            channels: ChannelIdentifier::new(ChannelConfig::from(&config)),
            config,
            indicators: IndicatorEngine::new(),
            scorer: ConfidenceScorer::new(),
            clock,
        }
    }

    /// 기본 설정과 시스템 시계로 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(DetectionConfig::default(), Arc::new(SystemClock))
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// 채널 식별기를 반환합니다.
    pub fn channel_identifier(&self) -> &ChannelIdentifier {
        &self.channels
    }

    fn effective_window(&self, len: usize) -> usize {
        self.config.window_size.max(MIN_WINDOW_BARS).min(len)
    }

    /// 모든 윈도우 위치에서 패턴을 감지합니다.
    ///
    /// 바가 7개 미만이면 빈 목록을 반환합니다.
    pub fn detect(&self, bars: &[PriceBar]) -> Vec<Pattern> {
        self.analyze(bars).into_iter().map(|a| a.pattern).collect()
    }

    /// 모든 윈도우 위치의 분석 결과를 반환합니다.
    pub fn analyze(&self, bars: &[PriceBar]) -> Vec<PatternAnalysis> {
        if bars.len() < MIN_WINDOW_BARS {
            return Vec::new();
        }

        let window = self.effective_window(bars.len());
        let step = self.config.step.max(1);

        let mut results = Vec::new();
        let mut end = window;
        while end <= bars.len() {
            if let Some(analysis) = self.analyze_window(&bars[end - window..end], &bars[..end]) {
                results.push(analysis);
            }
            end += step;
        }

        debug!(
            bars = bars.len(),
            window,
            step,
            patterns = results.len(),
            "Pattern scan finished"
        );

        results
    }

    /// 가장 최근 윈도우만 분석합니다.
    pub fn detect_latest(&self, bars: &[PriceBar]) -> Option<Pattern> {
        self.analyze_latest(bars).map(|a| a.pattern)
    }

    /// 가장 최근 윈도우의 분석 결과.
    pub fn analyze_latest(&self, bars: &[PriceBar]) -> Option<PatternAnalysis> {
        if bars.len() < MIN_WINDOW_BARS {
            return None;
        }
        let window = self.effective_window(bars.len());
        self.analyze_window(&bars[bars.len() - window..], bars)
    }

    /// 윈도우 하나를 분석합니다.
    ///
    /// `history`는 윈도우 마지막 바까지의 전체 이력이며 지표 계산에 쓰입니다.
    fn analyze_window(&self, window: &[PriceBar], history: &[PriceBar]) -> Option<PatternAnalysis> {
        let last = window.last()?;
        let channel = self.channels.identify(window)?;

        let snapshot = self.indicators.snapshot(history);
        let pattern_type = classify_pattern(channel.channel_type, snapshot.ema_alignment)?;
        let direction = channel.direction();

        let entry_price = last.close;
        let side = self.trade_side(direction, entry_price, &channel);
        let target_price = self.target_price(entry_price, side, &channel, snapshot.atr);
        let stop_loss = self.stop_loss(entry_price, side, &channel);

        let breakdown = self.scorer.score_pattern(&snapshot, &channel, direction);
        let detected_at = last.close_time;

        let pattern = Pattern {
            id: Pattern::derive_id(&last.ticker, last.timeframe, detected_at, pattern_type),
            symbol: last.ticker.clone(),
            timeframe: last.timeframe,
            pattern_type,
            direction,
            entry_price,
            target_price,
            stop_loss,
            confidence_score: breakdown.total,
            higher_timeframe_confirmed: false,
            detected_at,
            created_at: self.clock.now(),
            details: self.details(pattern_type, window, &channel),
            confirmation: None,
        };

        debug!(
            symbol = %pattern.symbol,
            timeframe = %pattern.timeframe,
            pattern_type = %pattern.pattern_type,
            direction = %pattern.direction,
            confidence = pattern.confidence_score,
            entry = %pattern.entry_price,
            target = %pattern.target_price,
            "Pattern detected"
        );

        Some(PatternAnalysis {
            pattern,
            channel,
            snapshot,
            breakdown,
        })
    }

    /// 방향성 패턴은 방향대로, 중립 패턴은 더 먼 채널 경계 쪽으로 거래합니다.
    fn trade_side(&self, direction: Direction, entry: Price, channel: &Channel) -> TradeSide {
        match direction {
            Direction::Bullish => TradeSide::Long,
            Direction::Bearish => TradeSide::Short,
            Direction::Neutral => {
                let upside = channel.current_resistance() - entry;
                let downside = entry - channel.current_support();
                if upside >= downside {
                    TradeSide::Long
                } else {
                    TradeSide::Short
                }
            }
        }
    }

    /// 진입가 너머 가장 가까운 유효 레벨까지 거리의 1.5배를 투영합니다.
    ///
    /// 유효 레벨이 없으면 7×ATR을 쓰되 진입가의 5% 이상 움직이도록 합니다.
    pub fn target_price(&self, entry: Price, side: TradeSide, channel: &Channel, atr: Decimal) -> Price {
        let min_distance = entry * self.config.min_level_distance_percent / Decimal::ONE_HUNDRED;

        let candidates = channel
            .levels
            .iter()
            .map(|l| l.price)
            .chain([channel.current_support(), channel.current_resistance()]);

        let nearest = match side {
            TradeSide::Long => candidates.filter(|l| *l - entry >= min_distance).min(),
            TradeSide::Short => candidates.filter(|l| entry - *l >= min_distance).max(),
        };

        if let Some(level) = nearest {
            return entry + (level - entry) * self.config.level_target_multiplier;
        }

        let min_move = entry * self.config.min_move_percent / Decimal::ONE_HUNDRED;
        let projected = (atr * self.config.atr_target_multiplier).max(min_move);
        entry + projected * side.sign()
    }

    /// 진입가 반대편 추세선에서 1% 더 떨어진 손절가. 추세선이 진입가의 반대편에 없으면 None.
    pub fn stop_loss(&self, entry: Price, side: TradeSide, channel: &Channel) -> Option<Price> {
        let buffer = self.config.stop_buffer_percent / Decimal::ONE_HUNDRED;
        match side {
            TradeSide::Long => {
                let stop = channel.current_support() * (Decimal::ONE - buffer);
                (stop < entry && stop > Decimal::ZERO).then_some(stop)
            }
            TradeSide::Short => {
                let stop = channel.current_resistance() * (Decimal::ONE + buffer);
                (stop > entry).then_some(stop)
            }
        }
    }

    fn details(&self, pattern_type: PatternType, window: &[PriceBar], channel: &Channel) -> PatternDetails {
        match pattern_type.family() {
            pattern_core::PatternFamily::Channel => PatternDetails::Channel {
                channel_type: channel.channel_type,
                support_slope: channel.support_slope_percent,
                resistance_slope: channel.resistance_slope_percent,
                width: channel.current_width(),
            },
            pattern_core::PatternFamily::Flag => {
                let first = window.first().map(|b| b.close).unwrap_or_default();
                let last = window.last().map(|b| b.close).unwrap_or_default();
                PatternDetails::Flag {
                    pole_change_percent: last.percent_change_from(first),
                    flag_slope: (channel.support_slope_percent + channel.resistance_slope_percent)
                        / Decimal::TWO,
                }
            }
            pattern_core::PatternFamily::Triangle => {
                let initial_width = channel.resistance.value_at(0) - channel.support.value_at(0);
                let convergence = if initial_width > Decimal::ZERO {
                    channel.current_width() / initial_width
                } else {
                    Decimal::ONE
                };
                PatternDetails::Triangle {
                    convergence,
                    bars_to_apex: bars_to_apex(channel),
                }
            }
        }
    }
}

/// 두 추세선이 만나는 지점까지 남은 바 수. 수렴하지 않으면 None.
fn bars_to_apex(channel: &Channel) -> Option<usize> {
    let slope_gap = channel.support.slope - channel.resistance.slope;
    if slope_gap <= Decimal::ZERO {
        return None;
    }
    let apex = (channel.resistance.intercept - channel.support.intercept) / slope_gap;
    let remaining = apex - Decimal::from(channel.last_index);
    if remaining <= Decimal::ZERO {
        return None;
    }
    remaining.ceil().to_usize()
}
