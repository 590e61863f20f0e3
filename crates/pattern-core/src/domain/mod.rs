//! 패턴 분석을 위한 도메인 모델.

mod backtest;
mod bar;
mod pattern;

pub use backtest::*;
pub use bar::*;
pub use pattern::*;
