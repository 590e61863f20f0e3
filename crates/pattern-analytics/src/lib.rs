//! 차트 패턴 분석 엔진.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 기술적 지표 (RSI, EMA, ATR, 거래량 추세)
//! - 스윙 포인트 기반 추세선 및 채널 식별
//! - 신뢰도 점수 계산
//! - 슬라이딩 윈도우 패턴 감지
//! - 상위 타임프레임 확인
//! - 패턴 백테스트
//!
//! # 분석 흐름
//!
//! ```text
//! PriceBar[] ─▶ IndicatorEngine ─┐
//!            └▶ ChannelIdentifier ┴▶ PatternDetector ─▶ ConfirmationEngine ─▶ BacktestSimulator
//! ```

pub mod backtest;
pub mod channel;
pub mod confirmation;
pub mod detector;
pub mod indicators;
pub mod scoring;
pub mod timeframe_alignment;
pub mod trendline;

// Indicators 모듈 re-exports
pub use indicators::{
    detect_crossovers, AtrParams, EmaAlignment, EmaCrossEvent, EmaParams, EmaTriple,
    IndicatorEngine, IndicatorError, IndicatorResult, IndicatorSnapshot, MomentumCalculator,
    RsiParams, TrendIndicators, VolatilityIndicators, VolumeDirection, VolumeIndicators,
    VolumeTrend, VolumeTrendParams, NEUTRAL_RSI,
};

// 추세선/채널
pub use channel::{classify_slopes, Channel, ChannelConfig, ChannelIdentifier};
pub use trendline::{
    cluster_levels, find_swing_points, fit_trendline, least_squares, trendline_strength,
    PriceLevel, SwingKind, SwingPoint, Trendline, TrendlineKind, FULL_STRENGTH_TOUCHES,
};

// 점수/감지/확인
pub use confirmation::{
    apply_factor, confirmation_factor, counter_trend_factor, target_blend_weight,
    ConfirmationEngine, HigherTimeframeView,
};
pub use detector::{classify_pattern, PatternAnalysis, PatternDetector};
pub use scoring::{ConfidenceScorer, ScoreBreakdown, ScoreInputs, BASE_SCORE};
pub use timeframe_alignment::TimeframeAligner;

// Backtest 모듈 re-exports
pub use backtest::{BacktestError, BacktestSimulator};
