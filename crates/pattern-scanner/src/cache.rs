//! 스캔 결과 캐시.
//!
//! 분석 코어는 캐시 없이도 결과가 같으므로 캐시는 호출 비용을 줄이는 용도로만 쓰입니다.
//! 유효 기간은 생성자에서 지정하며, 만료 판단은 주입된 [`Clock`]을 따릅니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pattern_core::{BacktestResult, Clock, Pattern, Timeframe};
use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

type PatternKey = (String, Timeframe);

/// 패턴 및 백테스트 결과 캐시.
pub struct PatternCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    patterns: RwLock<HashMap<PatternKey, CacheEntry<Vec<Pattern>>>>,
    backtests: RwLock<HashMap<Uuid, CacheEntry<BacktestResult>>>,
}

impl PatternCache {
    /// 새 캐시를 생성합니다.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            patterns: RwLock::new(HashMap::new()),
            backtests: RwLock::new(HashMap::new()),
        }
    }

    /// 초 단위 유효 기간으로 생성합니다.
    pub fn with_ttl_secs(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self::new(Duration::seconds(ttl_secs as i64), clock)
    }

    /// 유효 기간.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh<T>(&self, entry: &CacheEntry<T>, now: DateTime<Utc>) -> bool {
        now - entry.stored_at < self.ttl
    }

    /// 캐시된 패턴 목록을 조회합니다.
    pub async fn get_patterns(&self, symbol: &str, timeframe: Timeframe) -> Option<Vec<Pattern>> {
        let now = self.clock.now();
        let patterns = self.patterns.read().await;
        let entry = patterns.get(&(symbol.to_string(), timeframe))?;
        if self.is_fresh(entry, now) {
            trace!(symbol, timeframe = %timeframe, "Pattern cache hit");
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// 패턴 목록을 저장합니다.
    pub async fn put_patterns(&self, symbol: &str, timeframe: Timeframe, value: Vec<Pattern>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.patterns
            .write()
            .await
            .insert((symbol.to_string(), timeframe), entry);
    }

    /// 캐시된 백테스트 결과를 조회합니다.
    pub async fn get_backtest(&self, pattern_id: Uuid) -> Option<BacktestResult> {
        let now = self.clock.now();
        let backtests = self.backtests.read().await;
        backtests
            .get(&pattern_id)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// 백테스트 결과를 저장합니다.
    pub async fn put_backtest(&self, result: BacktestResult) {
        let entry = CacheEntry {
            stored_at: self.clock.now(),
            value: result,
        };
        self.backtests.write().await.insert(entry.value.pattern_id, entry);
    }

    /// 종목의 모든 패턴 항목을 제거합니다.
    pub async fn invalidate_symbol(&self, symbol: &str) {
        self.patterns.write().await.retain(|(s, _), _| s != symbol);
    }

    /// 만료된 항목을 제거하고 제거 수를 반환합니다.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();

        let mut patterns = self.patterns.write().await;
        let before = patterns.len();
        patterns.retain(|_, entry| now - entry.stored_at < self.ttl);
        let mut removed = before - patterns.len();
        drop(patterns);

        let mut backtests = self.backtests.write().await;
        let before = backtests.len();
        backtests.retain(|_, entry| now - entry.stored_at < self.ttl);
        removed += before - backtests.len();

        if removed > 0 {
            debug!(removed, "Expired cache entries purged");
        }
        removed
    }

    /// 모든 항목을 제거합니다.
    pub async fn clear(&self) {
        self.patterns.write().await.clear();
        self.backtests.write().await.clear();
    }

    /// (패턴 항목 수, 백테스트 항목 수).
    pub async fn len(&self) -> (usize, usize) {
        (
            self.patterns.read().await.len(),
            self.backtests.read().await.len(),
        )
    }
}
