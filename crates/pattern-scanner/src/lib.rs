//! 다중 종목 패턴 스캐너.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - [`BarProvider`]: 가격 바 공급자 trait과 메모리 구현
//! - [`PatternScanner`]: 동시성 제한이 있는 종목 스캔 및 백테스트
//! - [`PatternCache`]: 유효 기간이 있는 결과 캐시
//! - [`RequestPacer`]: 공급자 호출 간격 제어
//! - [`ScanStats`]: 배치 통계

pub mod cache;
pub mod pacer;
pub mod provider;
pub mod scanner;
pub mod stats;

pub use cache::PatternCache;
pub use pacer::RequestPacer;
pub use provider::{BarProvider, InMemoryBarProvider};
pub use scanner::{PatternScanner, ScanReport, SymbolScan};
pub use stats::ScanStats;
