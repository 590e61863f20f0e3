//! 설정 관리.
//!
//! 모든 섹션은 기본값을 가지므로 설정 파일에는 바꾸려는 값만 적으면 됩니다.
//! 환경 변수 `PATTERN__<섹션>__<키>`가 파일 값을 덮어씁니다.

use crate::error::{ScanError, ScanResult};
use crate::logging::LogFormat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 패턴 감지에 필요한 최소 바 수.
pub const MIN_WINDOW_BARS: usize = 7;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 패턴 감지 설정
    pub detection: DetectionConfig,
    /// 상위 타임프레임 확인 설정
    pub confirmation: ConfirmationConfig,
    /// 백테스트 설정
    pub backtest: BacktestConfig,
    /// 스캐너 설정
    pub scanner: ScannerConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 패턴 감지 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 슬라이딩 윈도우 크기 (바 수)
    pub window_size: usize,
    /// 윈도우 이동 간격
    pub step: usize,
    /// 스윙 고점/저점 판정 시 양쪽으로 비교할 바 수
    pub swing_lookback: usize,
    /// 레벨 군집화 허용폭 (ATR 배수)
    pub cluster_atr_multiplier: Decimal,
    /// 수평/상승/하락 판정 기울기 임계값 (바당 가격 대비 %)
    pub slope_threshold: Decimal,
    /// 다음 레벨까지 거리에 곱하는 목표가 배수
    pub level_target_multiplier: Decimal,
    /// 레벨이 없을 때 사용하는 ATR 목표가 배수
    pub atr_target_multiplier: Decimal,
    /// ATR 목표가의 최소 이동폭 (%)
    pub min_move_percent: Decimal,
    /// 목표 레벨로 인정하는 진입가 대비 최소 거리 (%)
    pub min_level_distance_percent: Decimal,
    /// 추세선 너머 손절 여유 (%)
    pub stop_buffer_percent: Decimal,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            step: 1,
            swing_lookback: 1,
            cluster_atr_multiplier: dec!(0.5),
            slope_threshold: dec!(0.1),
            level_target_multiplier: dec!(1.5),
            atr_target_multiplier: dec!(7),
            min_move_percent: dec!(5),
            min_level_distance_percent: dec!(0.5),
            stop_buffer_percent: dec!(1),
        }
    }
}

/// 상위 타임프레임 확인 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// 가격이 상위 채널 안에 있으면 방향과 무관하게 확인 처리
    pub force_confirm_inside_channel: bool,
    /// 채널 내부 판정 여유 (0.02 = 지지선 ×0.98, 저항선 ×1.02)
    pub inside_channel_tolerance: Decimal,
    /// 상위 타임프레임 채널 계산에 쓰는 최근 바 수
    pub lookback_bars: usize,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            force_confirm_inside_channel: true,
            inside_channel_tolerance: dec!(0.02),
            lookback_bars: 60,
        }
    }
}

/// 한 바에서 목표가와 손절가가 동시에 닿았을 때의 처리 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreakPolicy {
    /// 손절 우선 (보수적)
    #[default]
    StopFirst,
    /// 목표가 우선
    TargetFirst,
}

/// 백테스트 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// 최대 보유 바 수
    pub horizon_bars: usize,
    /// 동시 도달 처리 정책
    pub tie_break: TieBreakPolicy,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            horizon_bars: 30,
            tie_break: TieBreakPolicy::StopFirst,
        }
    }
}

/// 스캐너(오케스트레이션) 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 동시에 처리할 최대 종목 수
    pub max_concurrency: usize,
    /// 데이터 공급자 호출 간 최소 간격 (밀리초, 0이면 제한 없음)
    pub request_interval_ms: u64,
    /// 패턴/백테스트 캐시 유효 기간 (초)
    pub cache_ttl_secs: u64,
    /// 기준 타임프레임 조회 바 수
    pub lookback_bars: usize,
    /// 모든 윈도우를 스캔할지 여부 (false면 최신 윈도우만)
    pub scan_all_windows: bool,
    /// 상위 타임프레임 확인 수행 여부
    pub confirm_higher_timeframes: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            request_interval_ms: 1500,
            cache_ttl_secs: 300,
            lookback_bars: 150,
            scan_all_windows: false,
            confirm_higher_timeframes: true,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: LogFormat,
    /// span 진입/종료 이벤트 출력 여부
    pub span_events: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            span_events: false,
        }
    }
}

impl AnalysisConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("PATTERN")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: AnalysisConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> ScanResult<Self> {
        Self::load("config/pattern.toml")
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn from_toml_str(content: &str) -> ScanResult<Self> {
        let config: AnalysisConfig = config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검사합니다.
    pub fn validate(&self) -> ScanResult<()> {
        if self.detection.window_size < MIN_WINDOW_BARS {
            return Err(ScanError::Config(format!(
                "detection.window_size must be at least {}, got {}",
                MIN_WINDOW_BARS, self.detection.window_size
            )));
        }
        if self.detection.step == 0 {
            return Err(ScanError::Config("detection.step must be positive".into()));
        }
        if self.detection.swing_lookback == 0 {
            return Err(ScanError::Config(
                "detection.swing_lookback must be positive".into(),
            ));
        }
        if self.detection.slope_threshold <= Decimal::ZERO {
            return Err(ScanError::Config(
                "detection.slope_threshold must be positive".into(),
            ));
        }
        if self.confirmation.inside_channel_tolerance < Decimal::ZERO {
            return Err(ScanError::Config(
                "confirmation.inside_channel_tolerance must not be negative".into(),
            ));
        }
        if self.backtest.horizon_bars == 0 {
            return Err(ScanError::Config(
                "backtest.horizon_bars must be positive".into(),
            ));
        }
        if self.scanner.max_concurrency == 0 {
            return Err(ScanError::Config(
                "scanner.max_concurrency must be positive".into(),
            ));
        }
        if self.scanner.lookback_bars < MIN_WINDOW_BARS {
            return Err(ScanError::Config(format!(
                "scanner.lookback_bars must be at least {}",
                MIN_WINDOW_BARS
            )));
        }
        Ok(())
    }
}
