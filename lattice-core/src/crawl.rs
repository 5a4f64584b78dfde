use crate::data::{CrawlProgress, Store};
use crate::graph::build_graph;
use lattice_scanner::record::RawEntry;
use lattice_scanner::{
    ApiClient, ConnectionRecord, CredentialProvider, EnrichmentFetcher, RateLimiter, RecordBuilder,
    ScanError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Outcome of a finished scan. Cancellation is a successful outcome, not an
/// error: it carries the partial counts accumulated before the halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Completed { scanned: usize, skipped: usize },
    Cancelled { scanned: usize, skipped: usize },
}

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("no usable credential; log in and retry")]
    CredentialUnavailable,

    #[error("root connection list fetch failed: {0}")]
    RootFetch(ScanError),

    #[error("a scan is already running")]
    Busy,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("invalid import document: {0}")]
    InvalidImport(String),
}

/// Drives the full crawl: root list, limit clamping, resume filtering, the
/// rate-limited enrichment loop, incremental persistence, and cooperative
/// cancellation.
///
/// At most one scan runs per engine; the loop is strictly sequential because
/// the rate limit is a global budget shared by every outbound call.
pub struct CrawlEngine {
    store: Store,
    api: Arc<ApiClient>,
    limiter: Arc<RateLimiter>,
    builder: RecordBuilder,
    fetcher: EnrichmentFetcher,
    credentials: CredentialProvider,
    cached_root: Option<Vec<RawEntry>>,
    scanning: Arc<AtomicBool>,
}

impl CrawlEngine {
    pub fn new(store: Store, credentials: CredentialProvider) -> Self {
        Self::with_api(store, credentials, ApiClient::new())
    }

    pub fn with_api(store: Store, credentials: CredentialProvider, api: ApiClient) -> Self {
        let api = Arc::new(api);
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1000)));
        let fetcher = EnrichmentFetcher::new(api.clone(), limiter.clone());
        Self {
            store,
            api,
            limiter,
            builder: RecordBuilder::new(),
            fetcher,
            credentials,
            cached_root: None,
            scanning: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the minimum spacing between outbound requests.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.limiter = Arc::new(RateLimiter::new(interval));
        self.fetcher = EnrichmentFetcher::new(self.api.clone(), self.limiter.clone());
        self
    }

    pub fn with_builder(mut self, builder: RecordBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn token(&self) -> Result<String, CrawlError> {
        (self.credentials)().ok_or(CrawlError::CredentialUnavailable)
    }

    /// Fetch the root connection list and cache it for the next `scan`.
    /// A fresh `count` discards any previously cached list.
    pub async fn count(&mut self) -> Result<usize, CrawlError> {
        let token = self.token()?;
        let root = self
            .api
            .fetch_root(&token)
            .await
            .map_err(CrawlError::RootFetch)?;

        info!("root list holds {} connections", root.len());
        let n = root.len();
        self.cached_root = Some(root);
        Ok(n)
    }

    /// Run one scan over up to `limit` root entries, skipping ids already in
    /// the map. `None` means the whole root list; values are clamped to
    /// `[0, rootCount]`, so zero and negative limits complete immediately.
    pub async fn scan(&mut self, limit: Option<i64>) -> Result<ScanOutcome, CrawlError> {
        if self.scanning.swap(true, Ordering::SeqCst) {
            return Err(CrawlError::Busy);
        }

        let result = self.run_scan(limit).await;
        self.scanning.store(false, Ordering::SeqCst);

        if result.is_err() {
            // A fatal error must not leave a dangling progress row.
            let _ = self.store.clear_progress();
        }
        result
    }

    async fn run_scan(&mut self, limit: Option<i64>) -> Result<ScanOutcome, CrawlError> {
        let token = self.token()?;

        // The list cached by `count` is a snapshot frozen at count time;
        // consume it here, or fetch fresh when no count preceded this scan.
        let root = match self.cached_root.take() {
            Some(root) => root,
            None => self
                .api
                .fetch_root(&token)
                .await
                .map_err(CrawlError::RootFetch)?,
        };

        let cap = limit
            .unwrap_or(root.len() as i64)
            .clamp(0, root.len() as i64) as usize;

        // A stale stop request from an earlier scan must not cancel this one.
        self.store.clear_stop()?;

        let mut skipped = 0;
        let mut work = Vec::new();
        for entry in root.into_iter().take(cap) {
            if self.store.contains(&entry.id)? {
                skipped += 1;
            } else {
                work.push(entry);
            }
        }

        let total = work.len() as u64;
        info!("scanning {} new connections ({} already known)", total, skipped);
        self.store.set_progress(&CrawlProgress {
            current: 0,
            total: Some(total),
        })?;
        self.limiter.reset().await;

        let mut scanned = 0;
        for entry in work {
            if self.store.stop_requested()? {
                info!("stop requested, halting after {} of {}", scanned, total);
                self.store.clear_progress()?;
                self.store.clear_stop()?;
                return Ok(ScanOutcome::Cancelled { scanned, skipped });
            }

            self.limiter.wait().await;

            let mut record = self.builder.build(&entry);
            self.fetcher.enrich(&mut record, &token).await;

            scanned += 1;
            self.store.insert_record(
                &record,
                &CrawlProgress {
                    current: scanned as u64,
                    total: Some(total),
                },
            )?;
        }

        self.store.clear_progress()?;
        info!("scan complete: {} scanned, {} skipped", scanned, skipped);
        Ok(ScanOutcome::Completed { scanned, skipped })
    }

    /// Cooperative cancellation: the flag is observed at loop-iteration
    /// boundaries only, never mid-fetch, so the running scan halts after at
    /// most one more entry.
    pub fn request_stop(&self) -> Result<(), CrawlError> {
        self.store.request_stop()?;
        Ok(())
    }

    /// Delete the connection map and all scan state.
    pub fn clear(&mut self) -> Result<(), CrawlError> {
        self.cached_root = None;
        self.store.clear()?;
        Ok(())
    }

    pub fn progress(&self) -> Result<Option<CrawlProgress>, CrawlError> {
        Ok(self.store.progress()?)
    }
}

/// Generate a text summary of a crawled connection map.
pub fn generate_scan_report(connections: &HashMap<String, ConnectionRecord>) -> String {
    let graph = build_graph(connections);

    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Connections mapped: {}\n", graph.nodes.len()));
    report.push_str(&format!("  Mutual edges: {}\n", graph.edges.len()));

    let total_tags: usize = connections.values().map(|r| r.server_tags.len()).sum();
    report.push_str(&format!("  Server tags collected: {}\n", total_tags));

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    // Degree within the crawled map, not the raw mutual-id count: ids
    // outside the map have no edge.
    let mut degrees: HashMap<&str, usize> = HashMap::new();
    for edge in &graph.edges {
        *degrees.entry(edge.from.as_str()).or_insert(0) += 1;
        *degrees.entry(edge.to.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(&str, usize)> = degrees.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    if !ranked.is_empty() {
        report.push_str("## Most connected\n");
        for (id, degree) in ranked.into_iter().take(10) {
            if let Some(record) = connections.get(id) {
                report.push_str(&format!(
                    "  {:>4}  {} ({})\n",
                    degree, record.display_name, record.tag
                ));
            }
        }
        report.push('\n');
    }

    report
}
