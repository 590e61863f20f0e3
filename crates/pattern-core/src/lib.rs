//! # Pattern Core
//!
//! 차트 패턴 분석 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 분석 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - OHLCV 가격 바와 입력 정제
//! - 패턴 레코드와 패턴 계열별 세부 정보
//! - 백테스트 결과 레코드
//! - 타임프레임 정의
//! - 설정 관리
//! - 로깅 인프라
//! - 시간 주입을 위한 클럭

pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use clock::*;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
