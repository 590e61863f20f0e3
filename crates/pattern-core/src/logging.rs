//! tracing 구독자 초기화.
//!
//! [`LoggingConfig`]의 레벨과 형식으로 전역 구독자를 설치합니다.
//! 분석 크레이트들은 이벤트만 남기고, 구독자 설치는 애플리케이션이 시작할 때 한 번 호출합니다.

use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{AnalysisConfig, LoggingConfig};
use crate::error::{ScanError, ScanResult};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 여러 줄, 색상 포함 (개발용)
    #[default]
    Pretty,
    /// 로그 수집기용 JSON
    Json,
    /// 한 줄 형식
    Compact,
}

/// `RUST_LOG`가 있으면 그것을, 없으면 설정 레벨을 사용합니다.
fn env_filter(level: &str) -> ScanResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| ScanError::Config(format!("invalid logging.level '{}': {}", level, e)))
}

fn fmt_layer(settings: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let span_events = if settings.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer().with_target(true).with_span_events(span_events);

    match settings.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    }
}

/// logging 설정으로 전역 구독자를 설치합니다.
///
/// 이미 설치된 구독자가 있으면 `ScanError::Config`를 반환합니다.
pub fn init_logging(settings: &LoggingConfig) -> ScanResult<()> {
    let filter = env_filter(&settings.level)?;

    tracing_subscriber::registry()
        .with(fmt_layer(settings))
        .with(filter)
        .try_init()
        .map_err(|e| ScanError::Config(format!("logging already initialized: {}", e)))?;

    tracing::info!(
        format = ?settings.format,
        level = %settings.level,
        span_events = settings.span_events,
        "Logging initialized"
    );
    Ok(())
}

impl AnalysisConfig {
    /// 이 설정의 logging 섹션으로 구독자를 설치합니다.
    ///
    /// ```no_run
    /// use pattern_core::AnalysisConfig;
    ///
    /// let config = AnalysisConfig::load_default()?;
    /// config.init_logging()?;
    /// # Ok::<(), pattern_core::ScanError>(())
    /// ```
    pub fn init_logging(&self) -> ScanResult<()> {
        init_logging(&self.logging)
    }
}

/// 종목/타임프레임 필드가 붙은 스캔 span.
#[macro_export]
macro_rules! scan_span {
    ($name:expr, $symbol:expr, $timeframe:expr) => {
        tracing::info_span!($name, symbol = %$symbol, timeframe = %$timeframe)
    };
}
