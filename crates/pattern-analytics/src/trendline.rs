//! 스윙 포인트, 가격 레벨 군집화, 최소제곱 추세선.
//!
//! 추세선 강도는 접촉 횟수와 반등 비율로 계산합니다:
//!
//! ```text
//! strength = 0.5 × min(touch_count / 5, 1) + 0.5 × bounce_percentage / 100
//! ```

use pattern_core::PriceBar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 강도 계산에서 만점으로 보는 접촉 횟수.
pub const FULL_STRENGTH_TOUCHES: usize = 5;

/// 스윙 포인트 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingKind {
    /// 스윙 고점
    High,
    /// 스윙 저점
    Low,
}

/// 스윙 포인트.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
    /// 윈도우 내 인덱스
    pub index: usize,
    /// 가격 (고점이면 고가, 저점이면 저가)
    pub price: Decimal,
    /// 종류
    pub kind: SwingKind,
}

/// 군집화된 가격 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// 대표 가격 (군집 평균)
    pub price: Decimal,
    /// 군집에 속한 스윙 수
    pub touches: usize,
}

/// 추세선 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendlineKind {
    /// 지지선
    Support,
    /// 저항선
    Resistance,
}

/// 최소제곱 추세선.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trendline {
    /// 종류
    pub kind: TrendlineKind,
    /// 기울기 (바당 가격)
    pub slope: Decimal,
    /// 절편 (인덱스 0에서의 가격)
    pub intercept: Decimal,
    /// 첫 스윙 인덱스
    pub start_index: usize,
    /// 마지막 스윙 인덱스
    pub end_index: usize,
    /// 시작 인덱스에서의 추세선 가격
    pub start_price: Decimal,
    /// 끝 인덱스에서의 추세선 가격
    pub end_price: Decimal,
    /// 강도 [0, 1]
    pub strength: f64,
    /// 접촉 횟수
    pub touch_count: usize,
    /// 접촉 후 반등 비율 (%)
    pub bounce_percentage: f64,
}

impl Trendline {
    /// 주어진 인덱스에서의 추세선 가격.
    pub fn value_at(&self, index: usize) -> Decimal {
        self.intercept + self.slope * Decimal::from(index)
    }

    /// 기준 가격 대비 바당 기울기 (%).
    pub fn slope_percent(&self, reference_price: Decimal) -> Decimal {
        if reference_price.is_zero() {
            return Decimal::ZERO;
        }
        self.slope / reference_price * Decimal::ONE_HUNDRED
    }
}

/// 좌우 `lookback`개 바보다 고가가 엄격히 높은 바(스윙 고점)와
/// 저가가 엄격히 낮은 바(스윙 저점)를 찾습니다.
pub fn find_swing_points(bars: &[PriceBar], lookback: usize) -> Vec<SwingPoint> {
    let mut swings = Vec::new();
    if lookback == 0 || bars.len() < 2 * lookback + 1 {
        return swings;
    }

    for i in lookback..bars.len() - lookback {
        let neighbours = (i - lookback..=i + lookback).filter(|&j| j != i);

        let is_high = neighbours.clone().all(|j| bars[j].high < bars[i].high);
        let is_low = neighbours.clone().all(|j| bars[j].low > bars[i].low);

        if is_high {
            swings.push(SwingPoint {
                index: i,
                price: bars[i].high,
                kind: SwingKind::High,
            });
        }
        if is_low {
            swings.push(SwingPoint {
                index: i,
                price: bars[i].low,
                kind: SwingKind::Low,
            });
        }
    }

    swings
}

/// 허용폭 이내의 가격을 하나의 레벨로 묶습니다.
///
/// 가격을 정렬한 뒤 현재 군집 평균과의 차이가 허용폭 이하이면 같은 군집에 넣습니다.
/// 결과는 가격 오름차순입니다.
pub fn cluster_levels(prices: &[Decimal], tolerance: Decimal) -> Vec<PriceLevel> {
    let mut sorted = prices.to_vec();
    sorted.sort();

    let mut levels: Vec<PriceLevel> = Vec::new();
    let mut sum = Decimal::ZERO;
    let mut count = 0usize;

    for price in sorted {
        if count > 0 {
            let mean = sum / Decimal::from(count);
            if price - mean > tolerance {
                levels.push(PriceLevel {
                    price: mean,
                    touches: count,
                });
                sum = Decimal::ZERO;
                count = 0;
            }
        }
        sum += price;
        count += 1;
    }

    if count > 0 {
        levels.push(PriceLevel {
            price: sum / Decimal::from(count),
            touches: count,
        });
    }

    levels
}

/// (x, y) 점들에 대한 최소제곱 직선 (기울기, 절편).
///
/// 서로 다른 x가 두 개 미만이면 None.
pub fn least_squares(points: &[(Decimal, Decimal)]) -> Option<(Decimal, Decimal)> {
    if points.len() < 2 {
        return None;
    }

    let n = Decimal::from(points.len());
    let sum_x: Decimal = points.iter().map(|(x, _)| *x).sum();
    let sum_y: Decimal = points.iter().map(|(_, y)| *y).sum();
    let sum_xy: Decimal = points.iter().map(|(x, y)| *x * *y).sum();
    let sum_xx: Decimal = points.iter().map(|(x, _)| *x * *x).sum();

    let denominator = n * sum_xx - sum_x * sum_x;
    if denominator.is_zero() {
        return None;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Some((slope, intercept))
}

/// 접촉 횟수와 반등 비율로부터 강도를 계산합니다.
pub fn trendline_strength(touch_count: usize, bounce_percentage: f64) -> f64 {
    let touch_score = (touch_count as f64 / FULL_STRENGTH_TOUCHES as f64).min(1.0);
    let bounce_score = (bounce_percentage / 100.0).clamp(0.0, 1.0);
    (0.5 * touch_score + 0.5 * bounce_score).clamp(0.0, 1.0)
}

/// 스윙 포인트로 추세선을 적합하고 윈도우 전체에서 접촉/반등을 측정합니다.
///
/// 해당 종류의 스윙이 두 개 미만이면 None.
pub fn fit_trendline(
    bars: &[PriceBar],
    swings: &[SwingPoint],
    kind: TrendlineKind,
    tolerance: Decimal,
) -> Option<Trendline> {
    let wanted = match kind {
        TrendlineKind::Support => SwingKind::Low,
        TrendlineKind::Resistance => SwingKind::High,
    };
    let points: Vec<&SwingPoint> = swings.iter().filter(|s| s.kind == wanted).collect();
    if points.len() < 2 {
        return None;
    }

    let xy: Vec<(Decimal, Decimal)> = points
        .iter()
        .map(|s| (Decimal::from(s.index), s.price))
        .collect();
    let (slope, intercept) = least_squares(&xy)?;

    let start_index = points.first()?.index;
    let end_index = points.last()?.index;

    let mut line = Trendline {
        kind,
        slope,
        intercept,
        start_index,
        end_index,
        start_price: intercept + slope * Decimal::from(start_index),
        end_price: intercept + slope * Decimal::from(end_index),
        strength: 0.0,
        touch_count: 0,
        bounce_percentage: 0.0,
    };

    let (touches, bounces) = measure_touches(bars, &line, tolerance);
    line.touch_count = touches;
    line.bounce_percentage = if touches == 0 {
        0.0
    } else {
        bounces as f64 / touches as f64 * 100.0
    };
    line.strength = trendline_strength(line.touch_count, line.bounce_percentage);

    Some(line)
}

/// (접촉 수, 반등 수)를 셉니다.
///
/// 지지선은 저가, 저항선은 고가가 허용폭 안에 들어오면 접촉입니다.
/// 다음 바 종가가 추세선의 올바른 쪽에서 마감하면 반등으로 봅니다.
/// 마지막 바의 접촉은 다음 바가 없으므로 반등 판정에서 실패로 취급합니다.
fn measure_touches(bars: &[PriceBar], line: &Trendline, tolerance: Decimal) -> (usize, usize) {
    let mut touches = 0;
    let mut bounces = 0;

    for (i, bar) in bars.iter().enumerate() {
        let value = line.value_at(i);
        let extreme = match line.kind {
            TrendlineKind::Support => bar.low,
            TrendlineKind::Resistance => bar.high,
        };
        if (extreme - value).abs() > tolerance {
            continue;
        }
        touches += 1;

        if let Some(next) = bars.get(i + 1) {
            let next_value = line.value_at(i + 1);
            let bounced = match line.kind {
                TrendlineKind::Support => next.close > next_value,
                TrendlineKind::Resistance => next.close < next_value,
            };
            if bounced {
                bounces += 1;
            }
        }
    }

    (touches, bounces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use pattern_core::Timeframe;
    use rust_decimal_macros::dec;

    fn create_test_bar(open: Decimal, high: Decimal, low: Decimal, close: Decimal, index: i64) -> PriceBar {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(index);
        PriceBar::new("BTC/USDT", Timeframe::H1, time, open, high, low, close, dec!(1000))
    }

    #[test]
    fn test_swing_detection() {
        let bars = vec![
            create_test_bar(dec!(100), dec!(101), dec!(99), dec!(100), 0),
            create_test_bar(dec!(100), dec!(105), dec!(100), dec!(104), 1),
            create_test_bar(dec!(104), dec!(104), dec!(96), dec!(97), 2),
            create_test_bar(dec!(97), dec!(103), dec!(97), dec!(102), 3),
            create_test_bar(dec!(102), dec!(102), dec!(98), dec!(99), 4),
        ];

        let swings = find_swing_points(&bars, 1);

        assert!(swings.contains(&SwingPoint { index: 1, price: dec!(105), kind: SwingKind::High }));
        assert!(swings.contains(&SwingPoint { index: 2, price: dec!(96), kind: SwingKind::Low }));
        assert!(swings.contains(&SwingPoint { index: 3, price: dec!(103), kind: SwingKind::High }));
        assert!(!swings.iter().any(|s| s.index == 0 || s.index == 4));
    }

    #[test]
    fn test_flat_bars_have_no_swings() {
        let bars: Vec<PriceBar> = (0..10)
            .map(|i| create_test_bar(dec!(100), dec!(101), dec!(99), dec!(100), i))
            .collect();
        assert!(find_swing_points(&bars, 1).is_empty());
    }

    #[test]
    fn test_cluster_levels() {
        let prices = vec![dec!(100), dec!(100.4), dec!(110), dec!(99.8), dec!(110.3)];
        let levels = cluster_levels(&prices, dec!(1));

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].touches, 3);
        assert_eq!(levels[0].price, dec!(300.2) / dec!(3));
        assert_eq!(levels[1].touches, 2);
        assert_eq!(levels[1].price, dec!(110.15));
    }

    #[test]
    fn test_least_squares_exact_line() {
        let points = vec![
            (dec!(0), dec!(10)),
            (dec!(1), dec!(12)),
            (dec!(2), dec!(14)),
            (dec!(3), dec!(16)),
        ];
        let (slope, intercept) = least_squares(&points).unwrap();
        assert_eq!(slope, dec!(2));
        assert_eq!(intercept, dec!(10));
    }

    #[test]
    fn test_least_squares_degenerate() {
        assert!(least_squares(&[(dec!(1), dec!(5))]).is_none());
        assert!(least_squares(&[(dec!(1), dec!(5)), (dec!(1), dec!(6))]).is_none());
    }

    #[test]
    fn test_strength_bounds_and_monotonicity() {
        assert_eq!(trendline_strength(0, 0.0), 0.0);
        assert_eq!(trendline_strength(10, 100.0), 1.0);
        assert!(trendline_strength(3, 50.0) < trendline_strength(4, 50.0));
        assert!(trendline_strength(3, 50.0) < trendline_strength(3, 60.0));
    }

    #[test]
    fn test_fit_support_line() {
        // 저가가 2씩 오르는 지그재그
        let mut bars = Vec::new();
        for i in 0..12i64 {
            let base = dec!(100) + Decimal::from(i);
            let (high, low) = if i % 2 == 0 {
                (base + dec!(2), base - dec!(1))
            } else {
                (base + dec!(4), base + dec!(1))
            };
            bars.push(create_test_bar(low + dec!(0.5), high, low, high - dec!(0.5), i));
        }

        let swings = find_swing_points(&bars, 1);
        let support = fit_trendline(&bars, &swings, TrendlineKind::Support, dec!(0.5)).unwrap();

        assert_eq!(support.slope, dec!(1));
        assert!(support.start_index < support.end_index);
        assert!(support.touch_count >= 4);
        assert!(support.strength > 0.0 && support.strength <= 1.0);
    }
}
