//! 스캔 통계 구조체.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 스캔 배치 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 패턴이 하나 이상 감지된 종목 수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 패턴 없음 (조회 성공, 감지 결과 없음)
    pub empty: usize,
    /// 캐시에서 응답한 횟수
    pub cache_hits: usize,
    /// 감지된 총 패턴 수
    pub patterns: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl ScanStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            empty = self.empty,
            cache_hits = self.cache_hits,
            patterns = self.patterns,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Scan finished"
        );
    }
}
