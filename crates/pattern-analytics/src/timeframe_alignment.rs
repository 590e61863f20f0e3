//! 다중 타임프레임 정렬 유틸리티.
//!
//! 상위 타임프레임 확인에서 미래 데이터 누출(Look-Ahead Bias)을 방지합니다.
//! 상위 타임프레임 바는 패턴 감지 시점에 "완료된" 바만 사용해야 합니다.
//!
//! ## 예시
//!
//! - 기준: 4시간봉, 감지 시점 2024-01-03 08:00
//! - 상위: 일봉
//! - **유효한 일봉**: 01-02 00:00~01-03 00:00 (완료)
//! - **무효한 일봉**: 01-03 00:00~01-04 00:00 (진행 중)

use chrono::{DateTime, Utc};
use pattern_core::{PriceBar, Timeframe};

/// 타임프레임 정렬 유틸리티.
pub struct TimeframeAligner;

impl TimeframeAligner {
    /// 바가 기준 시점에 완료되었는지 확인합니다.
    #[inline]
    pub fn is_valid_at(bar: &PriceBar, reference_time: DateTime<Utc>) -> bool {
        bar.close_time <= reference_time
    }

    /// 기준 시점까지 완료된 바만 남긴 앞부분 슬라이스.
    ///
    /// 입력은 `open_time` 오름차순이어야 합니다.
    pub fn completed_bars(bars: &[PriceBar], reference_time: DateTime<Utc>) -> &[PriceBar] {
        let end = bars.partition_point(|b| Self::is_valid_at(b, reference_time));
        &bars[..end]
    }

    /// 가장 최근 완료된 N개 바 (시간순).
    pub fn latest_n_completed(
        bars: &[PriceBar],
        reference_time: DateTime<Utc>,
        count: usize,
    ) -> &[PriceBar] {
        let completed = Self::completed_bars(bars, reference_time);
        let start = completed.len().saturating_sub(count);
        &completed[start..]
    }

    /// 두 시점 사이에 들어가는 바 수.
    pub fn count_bars_between(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timeframe: Timeframe,
    ) -> usize {
        let duration_secs = timeframe.as_secs() as i64;
        if duration_secs == 0 || end <= start {
            return 0;
        }
        ((end - start).num_seconds() / duration_secs) as usize
    }
}
