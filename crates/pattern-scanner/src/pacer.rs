//! 데이터 공급자 호출 간격 제어.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// 공급자 호출 사이의 최소 간격을 보장하는 페이서.
///
/// 여러 작업이 공유하며, 다음 호출 가능 시점을 직렬화된 슬롯으로 배분합니다.
#[derive(Debug)]
pub struct RequestPacer {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestPacer {
    /// 새 페이서를 생성합니다.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// 밀리초 간격으로 생성합니다.
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// 제한 없는 페이서.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// 최소 간격.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 다음 호출 슬롯까지 대기합니다.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = match *next_slot {
            Some(at) if at > now => at,
            _ => now,
        };
        *next_slot = Some(slot + self.min_interval);
        drop(next_slot);

        tokio::time::sleep_until(slot).await;
    }
}
