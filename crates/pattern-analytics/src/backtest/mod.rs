//! 백테스트 모듈
//!
//! 감지된 패턴의 진입가/목표가/손절가를 이후 바에 재생해
//! 가상 거래의 결과를 계산합니다.
//!
//! # 주요 구성요소
//!
//! - [`BacktestSimulator`]: 패턴 하나에 대한 상태 기계 시뮬레이터
//! - [`BacktestError`]: 결과를 만들 수 없는 이유

pub mod simulator;

pub use simulator::{BacktestError, BacktestSimulator};
