//! 다중 종목 패턴 스캐너.
//!
//! 종목별로 바를 조회해 정제하고, 패턴을 감지한 뒤 상위 타임프레임으로 확인합니다.
//! 종목은 각자 tokio 태스크에서 실행되고 `buffer_unordered`로 최대 `max_concurrency`개까지
//! 동시에 처리됩니다. 한 종목의 실패나 패닉은 빈 결과와 에러 카운트로만 남고
//! 다른 종목에 영향을 주지 않습니다.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use pattern_analytics::{
    BacktestSimulator, ChannelConfig, ConfirmationEngine, PatternDetector, TimeframeAligner,
};
use pattern_core::{
    sanitize_bars, AnalysisConfig, BacktestResult, BacktestSummary, Clock, Pattern, PriceBar,
    ScanError, ScanResult, ScannerConfig, Timeframe, MIN_WINDOW_BARS,
};
use tracing::{debug, error, info, warn, Instrument};

use crate::cache::PatternCache;
use crate::pacer::RequestPacer;
use crate::provider::BarProvider;
use crate::stats::ScanStats;

/// 종목 하나의 스캔 결과.
#[derive(Debug, Clone)]
pub struct SymbolScan {
    /// 종목 심볼
    pub symbol: String,
    /// 기준 타임프레임
    pub timeframe: Timeframe,
    /// 감지된 패턴 (확인 반영)
    pub patterns: Vec<Pattern>,
    /// 정제 후 분석에 사용한 바 수
    pub bars_analyzed: usize,
    /// 캐시 응답 여부
    pub from_cache: bool,
    /// 실패 사유
    pub error: Option<String>,
}

impl SymbolScan {
    fn failed(symbol: &str, timeframe: Timeframe, error: String) -> Self {
        Self {
            symbol: symbol.to_string(),
            timeframe,
            patterns: Vec::new(),
            bars_analyzed: 0,
            from_cache: false,
            error: Some(error),
        }
    }

    /// 실패한 스캔인지 확인합니다.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// 배치 스캔 결과.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// 입력 순서대로 정렬된 종목별 결과
    pub results: Vec<SymbolScan>,
    /// 배치 통계
    pub stats: ScanStats,
}

impl ScanReport {
    /// 모든 종목의 패턴.
    pub fn patterns(&self) -> impl Iterator<Item = &Pattern> {
        self.results.iter().flat_map(|r| r.patterns.iter())
    }
}

/// 상위 타임프레임 조회 결과 (단계, 타임프레임, 바).
type HigherBars = Vec<(u8, Timeframe, Vec<PriceBar>)>;

/// 패턴 스캐너.
///
/// 공유 상태는 모두 `Arc`라서 복제 비용이 작고, 종목별 태스크마다 복제본을 넘깁니다.
#[derive(Clone)]
pub struct PatternScanner {
    provider: Arc<dyn BarProvider>,
    detector: PatternDetector,
    confirmation: ConfirmationEngine,
    simulator: BacktestSimulator,
    pacer: Arc<RequestPacer>,
    cache: Option<Arc<PatternCache>>,
    config: ScannerConfig,
    clock: Arc<dyn Clock>,
}

impl PatternScanner {
    /// 새 스캐너를 생성합니다. 캐시는 [`with_cache`](Self::with_cache)로 연결합니다.
    pub fn new(provider: Arc<dyn BarProvider>, config: &AnalysisConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            detector: PatternDetector::new(config.detection.clone(), clock.clone()),
            confirmation: ConfirmationEngine::new(
                config.confirmation.clone(),
                ChannelConfig::from(&config.detection),
            ),
            simulator: BacktestSimulator::new(config.backtest.clone()),
            pacer: Arc::new(RequestPacer::from_millis(config.scanner.request_interval_ms)),
            cache: None,
            config: config.scanner.clone(),
            clock,
        }
    }

    /// 캐시를 연결합니다.
    pub fn with_cache(mut self, cache: Arc<PatternCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 다른 스캐너와 공유할 페이서를 지정합니다.
    pub fn with_pacer(mut self, pacer: Arc<RequestPacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// 스캐너 설정.
    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// 여러 종목을 동시에 스캔합니다.
    pub async fn scan_symbols(&self, symbols: &[String], timeframe: Timeframe) -> ScanReport {
        let start = Instant::now();
        let concurrency = self.config.max_concurrency.max(1);

        info!(
            symbols = symbols.len(),
            timeframe = %timeframe,
            concurrency,
            provider = self.provider.name(),
            "Scan started"
        );

        // 종목마다 별도 태스크로 실행해 패닉도 해당 종목의 실패로만 남깁니다.
        let mut indexed: Vec<(usize, SymbolScan)> = stream::iter(symbols.iter().enumerate())
            .map(|(index, symbol)| {
                let scanner = self.clone();
                let task_symbol = symbol.clone();
                let handle =
                    tokio::spawn(async move { scanner.scan_symbol(&task_symbol, timeframe).await });
                async move {
                    let scan = match handle.await {
                        Ok(scan) => scan,
                        Err(e) => {
                            error!(symbol = %symbol, error = %e, "Symbol scan task aborted");
                            SymbolScan::failed(symbol, timeframe, format!("스캔 태스크 중단: {e}"))
                        }
                    };
                    (index, scan)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);

        let mut stats = ScanStats::new();
        let results: Vec<SymbolScan> = indexed.into_iter().map(|(_, scan)| scan).collect();
        for scan in &results {
            stats.total += 1;
            if scan.from_cache {
                stats.cache_hits += 1;
            }
            if scan.is_failed() {
                stats.errors += 1;
            } else if scan.patterns.is_empty() {
                stats.empty += 1;
            } else {
                stats.success += 1;
                stats.patterns += scan.patterns.len();
            }
        }
        stats.elapsed = start.elapsed();
        stats.log_summary("pattern_scan");

        ScanReport { results, stats }
    }

    /// 종목 하나를 스캔합니다. 실패는 빈 결과로 변환됩니다.
    pub async fn scan_symbol(&self, symbol: &str, timeframe: Timeframe) -> SymbolScan {
        let span = pattern_core::scan_span!("scan_symbol", symbol, timeframe);
        async {
            match self.try_scan_symbol(symbol, timeframe).await {
                Ok(scan) => scan,
                Err(e) => {
                    warn!(error = %e, "Symbol scan failed");
                    SymbolScan::failed(symbol, timeframe, e.to_string())
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_scan_symbol(&self, symbol: &str, timeframe: Timeframe) -> ScanResult<SymbolScan> {
        if symbol.trim().is_empty() {
            return Err(ScanError::InvalidInput("심볼이 비어 있습니다".to_string()));
        }

        if let Some(cache) = &self.cache {
            if let Some(patterns) = cache.get_patterns(symbol, timeframe).await {
                return Ok(SymbolScan {
                    symbol: symbol.to_string(),
                    timeframe,
                    patterns,
                    bars_analyzed: 0,
                    from_cache: true,
                    error: None,
                });
            }
        }

        let bars = self.fetch_bars(symbol, timeframe, self.config.lookback_bars).await?;
        let bars_analyzed = bars.len();

        let mut patterns = if bars.len() < MIN_WINDOW_BARS {
            debug!(bars = bars.len(), required = MIN_WINDOW_BARS, "Not enough bars to scan");
            Vec::new()
        } else if self.config.scan_all_windows {
            self.detector.detect(&bars)
        } else {
            self.detector.detect_latest(&bars).into_iter().collect()
        };

        if self.config.confirm_higher_timeframes && !patterns.is_empty() {
            let earliest = patterns.iter().map(|p| p.detected_at).min().unwrap_or_else(|| self.clock.now());
            let higher = self.fetch_higher_timeframes(symbol, timeframe, earliest).await;
            patterns = patterns
                .iter()
                .map(|pattern| self.confirmation.confirm_with_bars(pattern, &higher))
                .collect();
        }

        if let Some(cache) = &self.cache {
            cache.put_patterns(symbol, timeframe, patterns.clone()).await;
        }

        debug!(bars = bars_analyzed, patterns = patterns.len(), "Symbol scanned");

        Ok(SymbolScan {
            symbol: symbol.to_string(),
            timeframe,
            patterns,
            bars_analyzed,
            from_cache: false,
            error: None,
        })
    }

    /// 페이서를 거쳐 바를 조회하고 정제합니다.
    async fn fetch_bars(&self, symbol: &str, timeframe: Timeframe, lookback: usize) -> ScanResult<Vec<PriceBar>> {
        self.pacer.acquire().await;
        let raw = self.provider.get_bars(symbol, timeframe, lookback).await?;
        let (bars, _report) = sanitize_bars(raw);
        Ok(bars)
    }

    /// 상위 두 단계 타임프레임을 동시에 조회합니다. 실패한 타임프레임은 건너뜁니다.
    async fn fetch_higher_timeframes(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        earliest: DateTime<Utc>,
    ) -> HigherBars {
        let now = self.clock.now();
        let base_lookback = self.confirmation.config().lookback_bars;

        let fetches = timeframe
            .higher_timeframes()
            .into_iter()
            .enumerate()
            .map(|(index, higher)| async move {
                // 감지 시점 이후의 바는 정렬 단계에서 잘리므로 그만큼 더 조회
                let lookback =
                    base_lookback + TimeframeAligner::count_bars_between(earliest, now, higher) + 1;
                let result = self.fetch_bars(symbol, higher, lookback).await;
                ((index + 1) as u8, higher, result)
            });

        let mut loaded = Vec::new();
        for (level, higher, result) in join_all(fetches).await {
            match result {
                Ok(bars) => {
                    debug!(higher_timeframe = %higher, level, bars = bars.len(), "Higher timeframe loaded");
                    loaded.push((level, higher, bars));
                }
                Err(e) => {
                    warn!(higher_timeframe = %higher, level, error = %e, "Failed to load higher timeframe");
                }
            }
        }
        loaded
    }

    /// 패턴 감지 이후의 바로 백테스트합니다.
    ///
    /// 현재 완료된 바만 사용합니다. 이후 데이터가 아직 부족하면 `Ok(None)`을 반환하며
    /// 나중에 다시 시도할 수 있습니다.
    pub async fn backtest_pattern(&self, pattern: &Pattern) -> ScanResult<Option<BacktestResult>> {
        if let Some(cache) = &self.cache {
            if let Some(result) = cache.get_backtest(pattern.id).await {
                return Ok(Some(result));
            }
        }

        let now = self.clock.now();
        let forward = TimeframeAligner::count_bars_between(pattern.detected_at, now, pattern.timeframe) + 1;
        let bars = self.fetch_bars(&pattern.symbol, pattern.timeframe, forward).await?;
        let completed = TimeframeAligner::completed_bars(&bars, now);

        let result = self.simulator.simulate(pattern, completed);
        if let (Some(cache), Some(result)) = (&self.cache, &result) {
            cache.put_backtest(result.clone()).await;
        }
        Ok(result)
    }

    /// 여러 패턴을 동시에 백테스트하고 집계합니다.
    pub async fn backtest_patterns(&self, patterns: &[Pattern]) -> (Vec<BacktestResult>, BacktestSummary) {
        let concurrency = self.config.max_concurrency.max(1);

        let outcomes: Vec<_> = stream::iter(patterns)
            .map(|pattern| async move { (pattern, self.backtest_pattern(pattern).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut results = Vec::new();
        for (pattern, outcome) in outcomes {
            match outcome {
                Ok(Some(result)) => results.push(result),
                Ok(None) => {
                    debug!(pattern_id = %pattern.id, symbol = %pattern.symbol, "Backtest pending more data");
                }
                Err(e) => {
                    warn!(pattern_id = %pattern.id, symbol = %pattern.symbol, error = %e, "Backtest failed");
                }
            }
        }

        let summary = BacktestSummary::from_results(&results);
        info!(
            patterns = patterns.len(),
            completed = summary.total,
            win_rate = format!("{:.1}%", summary.win_rate()),
            avg_profit_loss = %summary.avg_profit_loss_percent,
            "Backtest batch finished"
        );
        (results, summary)
    }
}
