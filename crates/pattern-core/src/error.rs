//! 패턴 분석 시스템의 에러 타입.
//!
//! 분석 알고리즘 자체는 데이터 부족을 에러로 올리지 않고 중립값이나 빈 결과로 처리합니다.
//! 이 모듈의 에러는 데이터 공급자, 설정, 입력 검증 경계에서 사용됩니다.

use thiserror::Error;

/// 스캔 파이프라인 에러.
#[derive(Debug, Error)]
pub enum ScanError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 데이터 공급자 에러
    #[error("데이터 공급자 에러: {0}")]
    Provider(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 스캔 작업을 위한 Result 타입.
pub type ScanResult<T> = Result<T, ScanError>;

impl From<config::ConfigError> for ScanError {
    fn from(err: config::ConfigError) -> Self {
        ScanError::Config(err.to_string())
    }
}
