//! 추세선 쌍으로 채널을 식별합니다.
//!
//! 채널 분류는 기울기 쌍만의 전함수입니다. 기울기는 윈도우 평균 종가 대비
//! 바당 변화율(%)로 정규화한 뒤 임계값과 비교합니다.

use pattern_core::{ChannelType, DetectionConfig, Direction, PriceBar};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::indicators::VolatilityIndicators;
use crate::trendline::{
    cluster_levels, find_swing_points, fit_trendline, PriceLevel, SwingPoint, Trendline,
    TrendlineKind,
};

/// 채널 식별 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// 스윙 판정 시 양쪽 비교 바 수
    pub swing_lookback: usize,
    /// 군집화/접촉 허용폭 (ATR 배수)
    pub cluster_atr_multiplier: Decimal,
    /// 기울기 분류 임계값 (바당 %)
    pub slope_threshold: Decimal,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            swing_lookback: 1,
            cluster_atr_multiplier: dec!(0.5),
            slope_threshold: dec!(0.1),
        }
    }
}

impl From<&DetectionConfig> for ChannelConfig {
    fn from(config: &DetectionConfig) -> Self {
        Self {
            swing_lookback: config.swing_lookback,
            cluster_atr_multiplier: config.cluster_atr_multiplier,
            slope_threshold: config.slope_threshold,
        }
    }
}

/// 식별된 채널.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// 채널 유형
    pub channel_type: ChannelType,
    /// 지지선
    pub support: Trendline,
    /// 저항선
    pub resistance: Trendline,
    /// 두 추세선 강도 평균 [0, 1]
    pub strength: f64,
    /// 두 추세선 접촉 수 합계
    pub touch_points: usize,
    /// 정규화된 지지선 기울기 (바당 %)
    pub support_slope_percent: Decimal,
    /// 정규화된 저항선 기울기 (바당 %)
    pub resistance_slope_percent: Decimal,
    /// 스윙 가격을 군집화한 레벨 (오름차순)
    pub levels: Vec<PriceLevel>,
    /// 윈도우의 마지막 인덱스
    pub last_index: usize,
    /// 윈도우 ATR
    pub atr: Decimal,
}

impl Channel {
    /// 채널이 암시하는 방향.
    pub fn direction(&self) -> Direction {
        self.channel_type.direction()
    }

    /// 마지막 바 위치로 투영한 지지선 가격.
    pub fn current_support(&self) -> Decimal {
        self.support.value_at(self.last_index)
    }

    /// 마지막 바 위치로 투영한 저항선 가격.
    pub fn current_resistance(&self) -> Decimal {
        self.resistance.value_at(self.last_index)
    }

    /// 현재 채널 폭.
    pub fn current_width(&self) -> Decimal {
        self.current_resistance() - self.current_support()
    }

    /// 가격이 `[지지선 × (1 - tol), 저항선 × (1 + tol)]` 안에 있는지 확인합니다.
    pub fn contains(&self, price: Decimal, tolerance: Decimal) -> bool {
        let lower = self.current_support() * (Decimal::ONE - tolerance);
        let upper = self.current_resistance() * (Decimal::ONE + tolerance);
        price >= lower && price <= upper
    }

    /// 평균 반등 비율 (%).
    pub fn average_bounce(&self) -> f64 {
        (self.support.bounce_percentage + self.resistance.bounce_percentage) / 2.0
    }
}

/// 정규화된 기울기 쌍을 채널 유형으로 분류합니다.
///
/// - 둘 다 |기울기| < 임계값 → 수평
/// - 둘 다 > 임계값 → 상승
/// - 둘 다 < -임계값 → 하락
/// - 그 외 → 분류 불가
pub fn classify_slopes(support_slope: Decimal, resistance_slope: Decimal, threshold: Decimal) -> ChannelType {
    let threshold = threshold.abs();

    if support_slope.abs() < threshold && resistance_slope.abs() < threshold {
        ChannelType::Horizontal
    } else if support_slope > threshold && resistance_slope > threshold {
        ChannelType::Ascending
    } else if support_slope < -threshold && resistance_slope < -threshold {
        ChannelType::Descending
    } else {
        ChannelType::None
    }
}

/// 채널 식별기.
#[derive(Debug, Clone, Default)]
pub struct ChannelIdentifier {
    config: ChannelConfig,
    volatility: VolatilityIndicators,
}

impl ChannelIdentifier {
    /// 새 식별기를 생성합니다.
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            volatility: VolatilityIndicators::new(),
        }
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// 군집화 허용폭 (ATR × 배수).
    pub fn tolerance(&self, atr: Decimal) -> Decimal {
        atr * self.config.cluster_atr_multiplier
    }

    /// 윈도우의 스윙 가격을 군집화한 레벨을 반환합니다.
    pub fn pivot_levels(&self, bars: &[PriceBar]) -> Vec<PriceLevel> {
        let atr = self.volatility.latest_atr(bars, Default::default());
        let swings = find_swing_points(bars, self.config.swing_lookback);
        self.levels_from_swings(&swings, atr)
    }

    fn levels_from_swings(&self, swings: &[SwingPoint], atr: Decimal) -> Vec<PriceLevel> {
        let prices: Vec<Decimal> = swings.iter().map(|s| s.price).collect();
        cluster_levels(&prices, self.tolerance(atr))
    }

    /// 윈도우에서 채널을 식별합니다.
    ///
    /// 지지선이나 저항선 중 하나라도 적합할 수 없거나, 현재 위치에서 지지선이
    /// 저항선보다 위에 있으면 채널이 없는 것으로 봅니다. 추세선은 있지만
    /// 기울기가 서로 맞지 않으면 `ChannelType::None` 채널을 반환합니다.
    pub fn identify(&self, bars: &[PriceBar]) -> Option<Channel> {
        if bars.len() < 2 * self.config.swing_lookback + 1 {
            return None;
        }

        let atr = self.volatility.latest_atr(bars, Default::default());
        let tolerance = self.tolerance(atr);
        let swings = find_swing_points(bars, self.config.swing_lookback);

        let support = fit_trendline(bars, &swings, TrendlineKind::Support, tolerance)?;
        let resistance = fit_trendline(bars, &swings, TrendlineKind::Resistance, tolerance)?;

        let last_index = bars.len() - 1;
        if support.value_at(last_index) > resistance.value_at(last_index) {
            trace!(last_index, "Support projects above resistance, no channel");
            return None;
        }

        let reference = bars.iter().map(|b| b.close).sum::<Decimal>() / Decimal::from(bars.len());
        let support_slope_percent = support.slope_percent(reference);
        let resistance_slope_percent = resistance.slope_percent(reference);
        let channel_type = classify_slopes(
            support_slope_percent,
            resistance_slope_percent,
            self.config.slope_threshold,
        );

        trace!(
            ?channel_type,
            support_slope = %support_slope_percent,
            resistance_slope = %resistance_slope_percent,
            "Channel classified"
        );

        Some(Channel {
            channel_type,
            strength: (support.strength + resistance.strength) / 2.0,
            touch_points: support.touch_count + resistance.touch_count,
            support_slope_percent,
            resistance_slope_percent,
            levels: self.levels_from_swings(&swings, atr),
            support,
            resistance,
            last_index,
            atr,
        })
    }
}
