//! 백테스트 결과 레코드.

use crate::domain::pattern::Direction;
use crate::types::Price;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 가상 거래의 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeState {
    /// 진입 대기
    AwaitingEntry,
    /// 포지션 보유
    Open,
    /// 목표가 도달로 청산
    ClosedTarget,
    /// 손절가 도달로 청산
    ClosedStop,
    /// 보유 기간 만료로 청산
    ClosedTimeout,
}

impl TradeState {
    /// 종료 상태인지 확인합니다.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            TradeState::ClosedTarget | TradeState::ClosedStop | TradeState::ClosedTimeout
        )
    }
}

/// 백테스트 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// 대상 패턴 ID
    pub pattern_id: Uuid,
    /// 진입 바 시간
    pub entry_date: DateTime<Utc>,
    /// 청산 바 시간
    pub exit_date: DateTime<Utc>,
    /// 진입가
    pub entry_price: Price,
    /// 청산가
    pub exit_price: Price,
    /// 예측 방향 부호를 반영한 손익률 (%)
    pub profit_loss_percent: Decimal,
    /// 보유 중 최대 역행폭 (%)
    pub max_drawdown: Decimal,
    /// 진입 바부터 청산 바까지의 바 수
    pub candles_to_breakout: usize,
    /// 성공 여부
    pub successful: bool,
    /// 패턴의 예측 방향
    pub predicted_direction: Direction,
    /// 실제 가격 이동 방향
    pub actual_direction: Direction,
    /// 종료 상태
    pub exit_state: TradeState,
}

/// 여러 백테스트 결과의 집계 통계.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// 전체 거래 수
    pub total: usize,
    /// 성공 거래 수
    pub successful: usize,
    /// 목표가 청산 수
    pub target_exits: usize,
    /// 손절 청산 수
    pub stop_exits: usize,
    /// 기간 만료 청산 수
    pub timeout_exits: usize,
    /// 평균 손익률 (%)
    pub avg_profit_loss_percent: Decimal,
    /// 평균 최대 역행폭 (%)
    pub avg_max_drawdown: Decimal,
    /// 평균 청산까지 바 수
    pub avg_candles_to_breakout: Decimal,
}

impl BacktestSummary {
    /// 결과 목록으로부터 집계합니다.
    pub fn from_results(results: &[BacktestResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }

        let count = Decimal::from(results.len());
        let sum_pl: Decimal = results.iter().map(|r| r.profit_loss_percent).sum();
        let sum_dd: Decimal = results.iter().map(|r| r.max_drawdown).sum();
        let sum_candles: usize = results.iter().map(|r| r.candles_to_breakout).sum();

        Self {
            total: results.len(),
            successful: results.iter().filter(|r| r.successful).count(),
            target_exits: results
                .iter()
                .filter(|r| r.exit_state == TradeState::ClosedTarget)
                .count(),
            stop_exits: results
                .iter()
                .filter(|r| r.exit_state == TradeState::ClosedStop)
                .count(),
            timeout_exits: results
                .iter()
                .filter(|r| r.exit_state == TradeState::ClosedTimeout)
                .count(),
            avg_profit_loss_percent: sum_pl / count,
            avg_max_drawdown: sum_dd / count,
            avg_candles_to_breakout: Decimal::from(sum_candles) / count,
        }
    }

    /// 승률 (%).
    pub fn win_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total as f64 * 100.0
    }
}
