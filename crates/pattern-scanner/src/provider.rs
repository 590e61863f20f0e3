//! 가격 바 데이터 공급자.
//!
//! 스캐너는 [`BarProvider`] trait 뒤의 어떤 데이터 소스와도 동작합니다.
//! 테스트와 오프라인 분석에는 [`InMemoryBarProvider`]를 사용합니다.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pattern_core::{PriceBar, ScanError, ScanResult, Timeframe};
use tokio::sync::RwLock;
use tracing::debug;

/// 가격 바 공급자 trait.
#[async_trait]
pub trait BarProvider: Send + Sync {
    /// 공급자 이름.
    fn name(&self) -> &str;

    /// 최근 바를 시간순으로 조회합니다.
    ///
    /// # 인자
    /// * `symbol` - 종목 심볼 (예: "AAPL", "005930")
    /// * `timeframe` - 타임프레임
    /// * `lookback` - 최대 바 개수 (요청보다 적게 반환될 수 있음)
    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> ScanResult<Vec<PriceBar>>;
}

/// 메모리에 보관한 시계열을 제공하는 공급자.
#[derive(Default)]
pub struct InMemoryBarProvider {
    series: RwLock<HashMap<(String, Timeframe), Vec<PriceBar>>>,
    failing: RwLock<HashSet<String>>,
    calls: AtomicUsize,
}

impl InMemoryBarProvider {
    /// 빈 공급자를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 시계열을 등록합니다. 같은 키의 기존 시계열은 대체됩니다.
    pub async fn insert(&self, symbol: impl Into<String>, timeframe: Timeframe, bars: Vec<PriceBar>) {
        self.series.write().await.insert((symbol.into(), timeframe), bars);
    }

    /// 해당 종목 조회가 항상 실패하도록 설정합니다.
    pub async fn fail_on(&self, symbol: impl Into<String>) {
        self.failing.write().await.insert(symbol.into());
    }

    /// 지금까지의 조회 횟수.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl BarProvider for InMemoryBarProvider {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn get_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> ScanResult<Vec<PriceBar>> {
        self.calls.fetch_add(1, Ordering::Relaxed);

        if self.failing.read().await.contains(symbol) {
            return Err(ScanError::Provider(format!(
                "{} {} 조회 실패",
                symbol, timeframe
            )));
        }

        let series = self.series.read().await;
        let bars = series
            .get(&(symbol.to_string(), timeframe))
            .map(|bars| {
                let start = bars.len().saturating_sub(lookback);
                bars[start..].to_vec()
            })
            .unwrap_or_default();

        debug!(symbol, timeframe = %timeframe, lookback, returned = bars.len(), "Bars served");
        Ok(bars)
    }
}
