//! OHLCV 가격 바 및 입력 정제.
//!
//! 외부 데이터 공급자가 넘겨주는 바는 그대로 신뢰하지 않습니다.
//! 지표 계산 전에 [`sanitize_bars`]로 잘못된 바와 순서가 어긋난 바를 걸러냅니다.

use crate::types::{Price, Timeframe, Volume};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// OHLCV 가격 바.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 종목 코드
    pub ticker: String,
    /// 타임프레임
    pub timeframe: Timeframe,
    /// 바 시작 시간 (바의 타임스탬프)
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가
    pub close: Price,
    /// 거래량
    pub volume: Volume,
    /// 바 종료 시간
    pub close_time: DateTime<Utc>,
}

impl PriceBar {
    /// 새 바를 생성합니다. 종료 시간은 타임프레임 길이로 계산됩니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: impl Into<String>,
        timeframe: Timeframe,
        open_time: DateTime<Utc>,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Volume,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            timeframe,
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time: open_time + timeframe.chrono_duration(),
        }
    }

    /// 가격이 양수이고 고가가 저가 이상이며 시가/종가가 범위 안에 있는지 확인합니다.
    pub fn is_well_formed(&self) -> bool {
        self.low > Decimal::ZERO
            && self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
            && self.volume >= Decimal::ZERO
    }
}

/// 정제 결과 통계.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    /// 입력 바 수
    pub received: usize,
    /// 형식이 잘못되어 제거된 바 수 (예: 고가 < 저가)
    pub malformed: usize,
    /// 타임스탬프 역순 또는 중복으로 제거된 바 수
    pub out_of_order: usize,
}

impl SanitizeReport {
    /// 제거된 바의 총 수.
    pub fn dropped(&self) -> usize {
        self.malformed + self.out_of_order
    }
}

/// 잘못된 바와 순서가 어긋난 바를 제거합니다.
///
/// 결과는 `open_time` 기준 엄격한 오름차순이며 중복 타임스탬프가 없습니다.
/// 입력 순서를 재정렬하지 않고, 직전에 채택된 바보다 늦지 않은 바는 버립니다.
pub fn sanitize_bars(bars: Vec<PriceBar>) -> (Vec<PriceBar>, SanitizeReport) {
    let mut report = SanitizeReport {
        received: bars.len(),
        ..Default::default()
    };
    let mut clean: Vec<PriceBar> = Vec::with_capacity(bars.len());

    for bar in bars {
        if !bar.is_well_formed() {
            report.malformed += 1;
            continue;
        }
        if let Some(last) = clean.last() {
            if bar.open_time <= last.open_time {
                report.out_of_order += 1;
                continue;
            }
        }
        clean.push(bar);
    }

    if report.dropped() > 0 {
        warn!(
            received = report.received,
            malformed = report.malformed,
            out_of_order = report.out_of_order,
            "Dropped invalid price bars"
        );
    }

    (clean, report)
}

/// 종가 시퀀스를 추출합니다.
pub fn closes(bars: &[PriceBar]) -> Vec<Decimal> {
    bars.iter().map(|b| b.close).collect()
}
