//! 패턴 백테스트 시뮬레이터.
//!
//! 거래 상태 기계:
//!
//! ```text
//! AwaitingEntry ──(감지 시점 이후 첫 바)──▶ Open ──┬─▶ ClosedTarget
//!                                                  ├─▶ ClosedStop
//!                                                  └─▶ ClosedTimeout
//! ```
//!
//! 진입 바의 다음 바부터 평가합니다. 한 바에서 목표가와 손절가가 모두 닿으면
//! [`TieBreakPolicy`]를 따르며 기본값은 손절 우선입니다.

use pattern_core::{
    BacktestConfig, BacktestResult, BacktestSummary, DecimalExt, Direction, Pattern, Price, PriceBar,
    TieBreakPolicy, TradeSide, TradeState,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

/// 백테스트 결과를 만들 수 없는 이유.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BacktestError {
    /// 감지 시점 이후의 바가 없음
    #[error("진입 바 없음: 감지 시점 이후 바가 없습니다")]
    NoEntryBar,

    /// 청산 전에 데이터가 끝남
    #[error("이후 데이터 부족: 필요 {required}개, 제공 {provided}개")]
    InsufficientForwardData { required: usize, provided: usize },
}

/// 패턴 백테스트 시뮬레이터.
#[derive(Debug, Clone, Default)]
pub struct BacktestSimulator {
    config: BacktestConfig,
}

impl BacktestSimulator {
    /// 새 시뮬레이터를 생성합니다.
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// 설정을 반환합니다.
    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// 패턴을 시뮬레이션합니다. 결과를 만들 수 없으면 None.
    pub fn simulate(&self, pattern: &Pattern, bars: &[PriceBar]) -> Option<BacktestResult> {
        match self.try_simulate(pattern, bars) {
            Ok(result) => Some(result),
            Err(reason) => {
                debug!(pattern_id = %pattern.id, %reason, "Backtest skipped");
                None
            }
        }
    }

    /// 여러 패턴을 시뮬레이션하고 집계합니다.
    pub fn simulate_all<'a, I>(&self, runs: I) -> (Vec<BacktestResult>, BacktestSummary)
    where
        I: IntoIterator<Item = (&'a Pattern, &'a [PriceBar])>,
    {
        let results: Vec<BacktestResult> = runs
            .into_iter()
            .filter_map(|(pattern, bars)| self.simulate(pattern, bars))
            .collect();
        let summary = BacktestSummary::from_results(&results);
        (results, summary)
    }

    /// 패턴을 시뮬레이션합니다.
    ///
    /// `bars`는 `open_time` 오름차순이어야 하며 감지 시점 이전 바가 섞여 있어도 됩니다.
    pub fn try_simulate(&self, pattern: &Pattern, bars: &[PriceBar]) -> Result<BacktestResult, BacktestError> {
        let side = pattern.trade_side();
        let entry = pattern.entry_price;
        let horizon = self.config.horizon_bars.max(1);

        let mut state = TradeState::AwaitingEntry;
        let mut entry_index = 0;
        let mut max_drawdown = Decimal::ZERO;
        let mut exit: Option<(usize, Price)> = None;

        for (index, bar) in bars.iter().enumerate() {
            match state {
                TradeState::AwaitingEntry => {
                    if bar.open_time >= pattern.detected_at {
                        state = TradeState::Open;
                        entry_index = index;
                    }
                }
                TradeState::Open => {
                    max_drawdown = max_drawdown.max(adverse_excursion(side, entry, bar));
                    let horizon_reached = index - entry_index >= horizon;
                    if let Some((closed, price)) = self.close_on_bar(pattern, side, bar, horizon_reached) {
                        state = closed;
                        exit = Some((index, price));
                        break;
                    }
                }
                _ => break,
            }
        }

        let (exit_index, exit_price) = match (state, exit) {
            (TradeState::AwaitingEntry, _) => return Err(BacktestError::NoEntryBar),
            (state, Some(exit)) if state.is_closed() => exit,
            _ => {
                return Err(BacktestError::InsufficientForwardData {
                    required: horizon,
                    provided: bars.len() - entry_index - 1,
                })
            }
        };

        let sign = side.sign();
        let profit_loss_percent = exit_price.percent_change_from(entry) * sign;
        let successful = match state {
            TradeState::ClosedTarget => true,
            TradeState::ClosedStop => false,
            _ => (exit_price - entry) * sign > Decimal::ZERO,
        };

        let result = BacktestResult {
            pattern_id: pattern.id,
            entry_date: bars[entry_index].open_time,
            exit_date: bars[exit_index].open_time,
            entry_price: entry,
            exit_price,
            profit_loss_percent,
            max_drawdown,
            candles_to_breakout: exit_index - entry_index,
            successful,
            predicted_direction: pattern.direction,
            actual_direction: Direction::from_change(exit_price - entry),
            exit_state: state,
        };

        debug!(
            pattern_id = %pattern.id,
            exit_state = ?result.exit_state,
            profit_loss = %result.profit_loss_percent,
            candles = result.candles_to_breakout,
            "Backtest completed"
        );

        Ok(result)
    }

    /// Open 상태의 바 하나를 평가해 청산 상태와 청산가를 반환합니다.
    fn close_on_bar(
        &self,
        pattern: &Pattern,
        side: TradeSide,
        bar: &PriceBar,
        horizon_reached: bool,
    ) -> Option<(TradeState, Price)> {
        let target_hit = match side {
            TradeSide::Long => bar.high >= pattern.target_price,
            TradeSide::Short => bar.low <= pattern.target_price,
        };
        let stop_hit = pattern.stop_loss.is_some_and(|stop| match side {
            TradeSide::Long => bar.low <= stop,
            TradeSide::Short => bar.high >= stop,
        });

        match (target_hit, stop_hit, self.config.tie_break) {
            (true, true, TieBreakPolicy::TargetFirst) | (true, false, _) => {
                Some((TradeState::ClosedTarget, pattern.target_price))
            }
            (true, true, TieBreakPolicy::StopFirst) | (false, true, _) => {
                pattern.stop_loss.map(|stop| (TradeState::ClosedStop, stop))
            }
            (false, false, _) if horizon_reached => Some((TradeState::ClosedTimeout, bar.close)),
            _ => None,
        }
    }
}

/// 진입가 대비 불리한 방향 최대 이동폭 (%).
fn adverse_excursion(side: TradeSide, entry: Price, bar: &PriceBar) -> Decimal {
    if entry.is_zero() {
        return Decimal::ZERO;
    }
    let adverse = match side {
        TradeSide::Long => entry - bar.low.min(entry),
        TradeSide::Short => bar.high.max(entry) - entry,
    };
    adverse / entry * Decimal::ONE_HUNDRED
}
