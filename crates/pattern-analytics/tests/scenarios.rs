//! 감지 → 확인 → 백테스트 전체 흐름 테스트.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pattern_analytics::{BacktestSimulator, ConfirmationEngine, PatternDetector};
use pattern_core::{
    BacktestConfig, ChannelType, DetectionConfig, Direction, FixedClock, Pattern, PatternDetails,
    PatternFamily, PatternType, PriceBar, Timeframe, TradeState,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn detector() -> PatternDetector {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
    PatternDetector::new(DetectionConfig::default(), Arc::new(clock))
}

/// 짝수 바는 저점, 홀수 바는 고점을 만드는 지그재그 시계열.
fn zigzag(
    timeframe: Timeframe,
    from: DateTime<Utc>,
    count: i64,
    base: Decimal,
    drift: Decimal,
) -> Vec<PriceBar> {
    (0..count)
        .map(|i| {
            let mid = base + drift * Decimal::from(i);
            let (low, high) = if i % 2 == 0 {
                (mid - dec!(4), mid + dec!(1))
            } else {
                (mid - dec!(1), mid + dec!(4))
            };
            PriceBar::new(
                "TEST",
                timeframe,
                from + timeframe.chrono_duration() * i as i32,
                low + dec!(0.5),
                high,
                low,
                high - dec!(0.5),
                dec!(1000),
            )
        })
        .collect()
}

#[test]
fn rising_swing_lows_form_bullish_ascending_pattern() {
    // 스윙 저점 100 → 118
    let bars = zigzag(Timeframe::H4, start(), 20, dec!(104), dec!(1));
    let analysis = detector().analyze_latest(&bars).unwrap();

    assert_eq!(analysis.channel.channel_type, ChannelType::Ascending);
    assert_eq!(analysis.pattern.direction, Direction::Bullish);
    assert!(matches!(
        analysis.pattern.pattern_type,
        PatternType::AscendingTriangle | PatternType::BullFlag | PatternType::AscendingChannel
    ));
    assert!(analysis.pattern.target_price > analysis.pattern.entry_price);
    assert!(analysis.channel.support_slope_percent > Decimal::ZERO);
    assert!((0.0..=100.0).contains(&analysis.pattern.confidence_score));
}

#[test]
fn fewer_than_seven_bars_yield_nothing() {
    let bars = zigzag(Timeframe::H4, start(), 6, dec!(100), dec!(1));
    assert!(detector().detect(&bars).is_empty());
}

#[test]
fn short_series_is_analyzed_as_single_window() {
    let bars = zigzag(Timeframe::H4, start(), 12, dec!(100), dec!(1));
    let patterns = detector().detect(&bars);

    assert!(patterns.len() <= 1);
    if let Some(pattern) = patterns.first() {
        assert_eq!(pattern.detected_at, bars[11].close_time);
    }
}

#[test]
fn detection_is_idempotent() {
    let bars = zigzag(Timeframe::H4, start(), 40, dec!(100), dec!(-1));
    let d = detector();

    let first = d.detect(&bars);
    let second = d.detect(&bars);

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first[0].id, second[0].id);
}

#[test]
fn bearish_higher_timeframe_lowers_confidence() {
    let bars = zigzag(Timeframe::H4, start(), 20, dec!(104), dec!(1));
    let pattern = detector().detect_latest(&bars).unwrap();
    assert_eq!(pattern.direction, Direction::Bullish);

    // 12월에 끝나는 하락 일봉
    let daily_start = Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap();
    let daily = zigzag(Timeframe::D1, daily_start, 30, dec!(160), dec!(-1));

    let confirmed =
        ConfirmationEngine::with_defaults().confirm_with_bars(&pattern, &[(1, Timeframe::D1, daily)]);

    assert!(confirmed.confidence_score < pattern.confidence_score);
    let summary = confirmed.confirmation.as_ref().unwrap();
    assert_eq!(summary.timeframes.len(), 1);
    assert_eq!(summary.timeframes[0].higher_direction, Direction::Bearish);
    assert!(!summary.timeframes[0].compatible);
    assert_eq!(summary.prior_confidence, pattern.confidence_score);
}

#[test]
fn level_two_factor_applies_when_only_level_two_is_present() {
    let bars = zigzag(Timeframe::H4, start(), 20, dec!(104), dec!(1));
    let pattern = detector().detect_latest(&bars).unwrap();

    let weekly_start = Utc.with_ymd_and_hms(2023, 6, 5, 0, 0, 0).unwrap();
    let weekly = zigzag(Timeframe::W1, weekly_start, 25, dec!(200), dec!(-2));

    let confirmed =
        ConfirmationEngine::with_defaults().confirm_with_bars(&pattern, &[(2, Timeframe::W1, weekly)]);

    let summary = confirmed.confirmation.as_ref().unwrap();
    assert_eq!(summary.timeframes.len(), 1);
    assert_eq!(summary.timeframes[0].timeframe, Timeframe::W1);
    assert_eq!(summary.timeframes[0].level, 2);
    assert!(!summary.timeframes[0].compatible);
    assert_eq!(summary.timeframes[0].factor, 0.6);
    assert!((confirmed.confidence_score - pattern.confidence_score * 0.6).abs() < 1e-9);
}

#[test]
fn higher_timeframe_bars_after_detection_are_ignored() {
    let bars = zigzag(Timeframe::H4, start(), 20, dec!(104), dec!(1));
    let pattern = detector().detect_latest(&bars).unwrap();

    // 모든 일봉이 감지 시점 이후에 열림
    let daily = zigzag(Timeframe::D1, start() + Duration::days(10), 30, dec!(160), dec!(-1));
    let confirmed =
        ConfirmationEngine::with_defaults().confirm_with_bars(&pattern, &[(1, Timeframe::D1, daily)]);

    assert_eq!(confirmed.confidence_score, pattern.confidence_score);
    assert_eq!(confirmed.target_price, pattern.target_price);
    assert!(!confirmed.higher_timeframe_confirmed);
}

fn trade(entry: Decimal, target: Decimal, stop: Decimal) -> Pattern {
    let detected_at = start();
    Pattern {
        id: Pattern::derive_id("TEST", Timeframe::D1, detected_at, PatternType::AscendingChannel),
        symbol: "TEST".to_string(),
        timeframe: Timeframe::D1,
        pattern_type: PatternType::AscendingChannel,
        direction: Direction::Bullish,
        entry_price: entry,
        target_price: target,
        stop_loss: Some(stop),
        confidence_score: 55.0,
        higher_timeframe_confirmed: false,
        detected_at,
        created_at: detected_at,
        details: PatternDetails::Channel {
            channel_type: ChannelType::Ascending,
            support_slope: dec!(0.5),
            resistance_slope: dec!(0.5),
            width: dec!(5),
        },
        confirmation: None,
    }
}

fn daily_bars(hlc: &[(Decimal, Decimal, Decimal)]) -> Vec<PriceBar> {
    hlc.iter()
        .enumerate()
        .map(|(i, (h, l, c))| {
            PriceBar::new(
                "TEST",
                Timeframe::D1,
                start() + Duration::days(i as i64),
                *c,
                *h,
                *l,
                *c,
                dec!(1000),
            )
        })
        .collect()
}

#[test]
fn stop_on_first_forward_bar_loses_five_percent() {
    let bars = daily_bars(&[
        (dec!(101), dec!(99), dec!(100)),
        (dec!(100), dec!(94), dec!(95)),
    ]);
    let result = BacktestSimulator::default()
        .simulate(&trade(dec!(100), dec!(110), dec!(95)), &bars)
        .unwrap();

    assert_eq!(result.exit_price, dec!(95));
    assert_eq!(result.profit_loss_percent, dec!(-5));
    assert!(!result.successful);
    assert_eq!(result.exit_state, TradeState::ClosedStop);
}

#[test]
fn exact_target_touch_exits_on_that_bar() {
    let mut hlc = vec![(dec!(102), dec!(98), dec!(100)); 7];
    hlc.push((dec!(110), dec!(103), dec!(109)));
    hlc.push((dec!(120), dec!(108), dec!(118)));
    let bars = daily_bars(&hlc);

    let result = BacktestSimulator::default()
        .simulate(&trade(dec!(100), dec!(110), dec!(95)), &bars)
        .unwrap();

    assert_eq!(result.candles_to_breakout, 7);
    assert_eq!(result.exit_price, dec!(110));
    assert_eq!(result.exit_date, bars[7].open_time);
    assert!(result.successful);
}

#[test]
fn detected_pattern_replays_through_backtest() {
    let history = zigzag(Timeframe::H4, start(), 20, dec!(104), dec!(1));
    let pattern = detector().detect_latest(&history).unwrap();

    // 감지 이후 계속 상승
    let forward = zigzag(
        Timeframe::H4,
        history[19].open_time + Duration::hours(4),
        40,
        dec!(124),
        dec!(1),
    );
    let result = BacktestSimulator::new(BacktestConfig::default())
        .simulate(&pattern, &forward)
        .unwrap();

    assert_eq!(result.pattern_id, pattern.id);
    assert_eq!(result.predicted_direction, Direction::Bullish);
    assert!(result.entry_date >= pattern.detected_at);
    assert!(result.max_drawdown >= Decimal::ZERO);
}

#[test]
fn pattern_serializes_with_family_tag() {
    let pattern = trade(dec!(100), dec!(110), dec!(95));
    let json = serde_json::to_value(&pattern).unwrap();

    assert_eq!(json["details"]["family"], "channel");
    assert_eq!(pattern.family(), PatternFamily::Channel);

    let back: Pattern = serde_json::from_value(json).unwrap();
    assert_eq!(back, pattern);
}

fn random_walk(steps: &[(i64, i64)]) -> Vec<PriceBar> {
    let mut close = dec!(100);
    steps
        .iter()
        .enumerate()
        .map(|(i, (delta, spread))| {
            let open = close;
            close = (close + Decimal::from(*delta)).max(dec!(10));
            let spread = Decimal::from(*spread);
            PriceBar::new(
                "RAND",
                Timeframe::H1,
                start() + Duration::hours(i as i64),
                open,
                open.max(close) + spread,
                open.min(close) - spread,
                close,
                dec!(500) + Decimal::from(i as i64 % 7) * dec!(100),
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn confidence_always_bounded(steps in prop::collection::vec((-3i64..=3, 0i64..3), 7..80)) {
        let bars = random_walk(&steps);
        for pattern in detector().detect(&bars) {
            prop_assert!((0.0..=100.0).contains(&pattern.confidence_score));
            prop_assert!(pattern.detected_at <= bars.last().unwrap().close_time);
        }
    }

    #[test]
    fn drawdown_covers_worst_adverse_low(
        steps in prop::collection::vec((-3i64..=3, 0i64..3), 2..60),
        target_gap in 1i64..15,
        stop_gap in 1i64..15,
    ) {
        let bars = random_walk(&steps);
        let pattern = trade(
            dec!(100),
            dec!(100) + Decimal::from(target_gap),
            dec!(100) - Decimal::from(stop_gap),
        );

        if let Some(result) = BacktestSimulator::default().simulate(&pattern, &bars) {
            // 진입 바는 0번이므로 청산 바 인덱스는 candles_to_breakout
            let entry = pattern.entry_price;
            let worst_adverse = bars[1..=result.candles_to_breakout]
                .iter()
                .map(|bar| (entry - bar.low.min(entry)) / entry * dec!(100))
                .max()
                .unwrap_or(Decimal::ZERO);

            prop_assert!(result.max_drawdown >= Decimal::ZERO);
            prop_assert!(result.max_drawdown >= worst_adverse);
            prop_assert!(result.max_drawdown >= -result.profit_loss_percent);
            prop_assert!(result.candles_to_breakout >= 1);
            prop_assert!(result.candles_to_breakout <= 30);
            prop_assert!(result.exit_state.is_closed());
        }
    }
}
