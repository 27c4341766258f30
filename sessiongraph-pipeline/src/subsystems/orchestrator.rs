//! Extraction orchestrator
//!
//! Owns the backend, the cache and the run counters for one batch run.
//! Messages are analyzed one at a time, in order:
//! - short content is skipped without touching the cache or the backend
//! - cache hits are served from disk
//! - misses wait for the rate limiter, call the backend once, and are cached
//!
//! A failed extraction is recorded on its own `AnalysisResult` and never
//! retried; it does not affect any other message.

use chrono::Utc;
use serde::Serialize;
use sessiongraph_core::models::{
    AnalysisOutcome, AnalysisResult, Message, Session, SessionAnalysis, SessionContext,
};
use sessiongraph_core::{CacheEntry, CacheStore, ExtractionBackend, SessionGraphConfig};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::response::{extract_payload, normalize};

// ============================================================================
// Rate limiter
// ============================================================================

/// Spaces backend calls at least `min_interval` apart, measured from the
/// start of the previous call.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Sleep until the next call is allowed, then mark it as started.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

// ============================================================================
// Counters
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerStats {
    /// Backend invocations, successful or not.
    pub api_calls: usize,
    pub cache_hits: usize,
    pub failures: usize,
}

impl AnalyzerStats {
    pub fn cache_hit_rate(&self) -> f64 {
        self.cache_hits as f64 / (self.api_calls + self.cache_hits).max(1) as f64
    }

    pub fn error_rate(&self) -> f64 {
        self.failures as f64 / self.api_calls.max(1) as f64
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "api_calls": self.api_calls,
            "cache_hits": self.cache_hits,
            "failures": self.failures,
            "cache_hit_rate": self.cache_hit_rate(),
            "error_rate": self.error_rate(),
        })
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

pub struct ExtractionOrchestrator {
    backend: Box<dyn ExtractionBackend>,
    cache: Option<CacheStore>,
    limiter: RateLimiter,
    min_content_chars: usize,
    stats: AnalyzerStats,
}

impl ExtractionOrchestrator {
    /// Build an orchestrator. Without a cache every message goes to the
    /// backend and nothing is persisted.
    pub fn new(
        backend: Box<dyn ExtractionBackend>,
        cache: Option<CacheStore>,
        min_interval: Duration,
        min_content_chars: usize,
    ) -> Self {
        Self {
            backend,
            cache,
            limiter: RateLimiter::new(min_interval),
            min_content_chars,
            stats: AnalyzerStats::default(),
        }
    }

    /// Build from application config. A cache directory that cannot be
    /// created is reported and the run continues uncached.
    pub fn from_config(config: &SessionGraphConfig, backend: Box<dyn ExtractionBackend>) -> Self {
        let cache = match CacheStore::open(config.cache_dir()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Cache unavailable, continuing without it");
                None
            }
        };

        // The replay backend makes no external calls, so there is nothing to space out.
        let min_interval = if backend.name() == "offline" {
            Duration::ZERO
        } else {
            config.extraction.min_call_interval()
        };

        Self::new(backend, cache, min_interval, config.extraction.min_content_chars)
    }

    pub fn stats(&self) -> AnalyzerStats {
        self.stats
    }

    pub fn backend(&self) -> &dyn ExtractionBackend {
        self.backend.as_ref()
    }

    /// Analyze one message.
    pub async fn analyze(&mut self, message: &Message, ctx: &SessionContext) -> AnalysisResult {
        let content = message.content.trim();
        if content.chars().count() < self.min_content_chars {
            return AnalysisResult::empty(&ctx.session_id, &message.uuid, AnalysisOutcome::Skipped);
        }

        let context = ctx.describe();
        let key = CacheStore::key(content, &context);

        if let Some(entry) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            self.stats.cache_hits += 1;
            tracing::debug!(session_id = %ctx.session_id, message_uuid = %message.uuid, key = %key, "Cache hit");
            return AnalysisResult {
                session_id: ctx.session_id.clone(),
                message_uuid: message.uuid.clone(),
                entities: entry.entities,
                relationships: entry.relationships,
                concepts: entry.concepts,
                analysis_timestamp: entry.produced_at,
                model_version: entry.extractor_version,
                outcome: AnalysisOutcome::CacheHit,
            };
        }

        self.limiter.wait().await;
        self.stats.api_calls += 1;

        let extracted = self.backend.extract(content, &context).await;
        let response = match extracted {
            Ok(text) => text,
            Err(e) => return self.failed(ctx, message, e.to_string()),
        };

        let payload = match extract_payload(&response) {
            Ok(payload) => payload,
            Err(e) => return self.failed(ctx, message, e.to_string()),
        };

        let parsed = normalize(&payload, &ctx.session_id, &message.uuid, &context);

        let entry = CacheEntry {
            key: key.clone(),
            entities: parsed.entities,
            relationships: parsed.relationships,
            concepts: parsed.concepts,
            produced_at: Utc::now().to_rfc3339(),
            extractor_version: self.backend.model().to_string(),
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&key, &entry) {
                tracing::warn!(key = %key, error = %e, "Failed to write cache entry");
            }
        }

        tracing::debug!(
            session_id = %ctx.session_id,
            message_uuid = %message.uuid,
            entities = entry.entities.len(),
            relationships = entry.relationships.len(),
            "Extracted message"
        );

        AnalysisResult {
            session_id: ctx.session_id.clone(),
            message_uuid: message.uuid.clone(),
            entities: entry.entities,
            relationships: entry.relationships,
            concepts: entry.concepts,
            analysis_timestamp: entry.produced_at,
            model_version: entry.extractor_version,
            outcome: AnalysisOutcome::Extracted,
        }
    }

    fn failed(&mut self, ctx: &SessionContext, message: &Message, reason: String) -> AnalysisResult {
        self.stats.failures += 1;
        tracing::warn!(
            session_id = %ctx.session_id,
            message_uuid = %message.uuid,
            backend = self.backend.name(),
            reason = %reason,
            "Extraction failed"
        );

        let mut result =
            AnalysisResult::empty(&ctx.session_id, &message.uuid, AnalysisOutcome::Failed { reason });
        result.model_version = self.backend.model().to_string();
        result
    }

    /// Analyze up to `max_messages_per_session` messages of every session,
    /// strictly in order.
    pub async fn analyze_batch(
        &mut self,
        sessions: &[Session],
        max_messages_per_session: usize,
    ) -> Vec<SessionAnalysis> {
        let total: usize = sessions
            .iter()
            .map(|s| s.total_messages().min(max_messages_per_session))
            .sum();
        let mut processed = 0usize;
        let mut analyses = Vec::with_capacity(sessions.len());

        tracing::info!(sessions = sessions.len(), messages = total, "Starting batch analysis");

        for session in sessions {
            let ctx = session.context();
            let mut results = Vec::new();

            tracing::info!(
                session_id = %session.session_id,
                project = %session.project_label,
                messages = session.total_messages(),
                "Analyzing session"
            );

            for message in session.messages().iter().take(max_messages_per_session) {
                results.push(self.analyze(message, &ctx).await);
                processed += 1;
                tracing::debug!(progress = %format!("{processed}/{total}"), "Message analyzed");
            }

            analyses.push(SessionAnalysis {
                session_id: session.session_id.clone(),
                project_label: session.project_label.clone(),
                results,
            });
        }

        let stats = self.stats;
        tracing::info!(
            processed,
            api_calls = stats.api_calls,
            cache_hits = stats.cache_hits,
            failures = stats.failures,
            cache_hit_rate = stats.cache_hit_rate(),
            "Batch analysis complete"
        );

        analyses
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sessiongraph_core::models::Role;
    use sessiongraph_core::ExtractionError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend that returns a canned response and counts calls.
    struct MockBackend {
        response: Result<String, ()>,
        call_count: Arc<AtomicUsize>,
    }

    impl MockBackend {
        fn ok(response: &str) -> (Self, Arc<AtomicUsize>) {
            let call_count = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    response: Ok(response.to_string()),
                    call_count: call_count.clone(),
                },
                call_count,
            )
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let call_count = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    response: Err(()),
                    call_count: call_count.clone(),
                },
                call_count,
            )
        }
    }

    #[async_trait]
    impl ExtractionBackend for MockBackend {
        async fn extract(&self, _text: &str, _context: &str) -> Result<String, ExtractionError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.response.clone().map_err(|_| ExtractionError::EmptyResponse)
        }

        fn model(&self) -> &str {
            "mock-model"
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn message(uuid: &str, content: &str) -> Message {
        Message {
            uuid: uuid.to_string(),
            timestamp: "2025-08-01T10:00:00Z".to_string(),
            role: Role::User,
            content: content.to_string(),
            tool_invocations: Vec::new(),
            tool_results: Vec::new(),
            session_id: "s1".to_string(),
            parent_uuid: None,
            working_directory: String::new(),
            branch_label: String::new(),
        }
    }

    const RESPONSE: &str = r#"```json
{"entities": [{"name": "cache.rs", "type": "FILE", "confidence": 0.9}], "relationships": [], "concepts": ["caching"]}
```"#;

    #[test]
    fn test_stats_rates_handle_zero_denominators() {
        let stats = AnalyzerStats::default();
        assert_eq!(stats.cache_hit_rate(), 0.0);
        assert_eq!(stats.error_rate(), 0.0);

        let stats = AnalyzerStats {
            api_calls: 3,
            cache_hits: 1,
            failures: 1,
        };
        assert_eq!(stats.cache_hit_rate(), 0.25);
        assert!((stats.error_rate() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_short_content_is_skipped_without_backend_call() {
        let (backend, calls) = MockBackend::ok(RESPONSE);
        let mut orchestrator =
            ExtractionOrchestrator::new(Box::new(backend), None, Duration::ZERO, 20);
        let ctx = SessionContext::new("s1", "agrama");

        let result = orchestrator.analyze(&message("m1", "   too short   "), &ctx).await;

        assert_eq!(result.outcome, AnalysisOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(orchestrator.stats(), AnalyzerStats::default());
    }

    #[tokio::test]
    async fn test_extraction_is_cached_and_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();
        let (backend, calls) = MockBackend::ok(RESPONSE);
        let mut orchestrator =
            ExtractionOrchestrator::new(Box::new(backend), Some(cache.clone()), Duration::ZERO, 20);
        let ctx = SessionContext::new("s1", "agrama");
        let msg = message("m1", "please refactor the cache layer in cache.rs");

        let first = orchestrator.analyze(&msg, &ctx).await;
        let second = orchestrator.analyze(&msg, &ctx).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.outcome, AnalysisOutcome::Extracted);
        assert_eq!(second.outcome, AnalysisOutcome::CacheHit);
        assert_eq!(first.entities, second.entities);
        assert_eq!(first.concepts, second.concepts);
        assert_eq!(first.analysis_timestamp, second.analysis_timestamp);
        assert_eq!(second.model_version, "mock-model");
        assert_eq!(first.entities[0].id, "s1_m1_0");
        assert_eq!(cache.len(), 1);

        let stats = orchestrator.stats();
        assert_eq!((stats.api_calls, stats.cache_hits, stats.failures), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_backend_error_is_recorded_not_raised() {
        let (backend, calls) = MockBackend::failing();
        let mut orchestrator =
            ExtractionOrchestrator::new(Box::new(backend), None, Duration::ZERO, 5);
        let ctx = SessionContext::new("s1", "agrama");

        let result = orchestrator.analyze(&message("m1", "a long enough message"), &ctx).await;

        assert!(result.is_failure());
        assert!(result.entities.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.stats().failures, 1);
        assert_eq!(orchestrator.stats().api_calls, 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        let cache = CacheStore::open(&root).unwrap();
        std::fs::remove_dir_all(&root).unwrap();

        let (backend, calls) = MockBackend::ok(RESPONSE);
        let mut orchestrator =
            ExtractionOrchestrator::new(Box::new(backend), Some(cache), Duration::ZERO, 20);
        let ctx = SessionContext::new("s1", "agrama");

        let result = orchestrator
            .analyze(&message("m1", "please refactor the cache layer in cache.rs"), &ctx)
            .await;

        assert_eq!(result.outcome, AnalysisOutcome::Extracted);
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.entities[0].name, "cache.rs");
        assert_eq!(result.concepts, vec!["caching"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.stats().failures, 0);
        assert_eq!(orchestrator.stats().api_calls, 1);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_response_without_json_counts_as_failure_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::open(dir.path()).unwrap();
        let (backend, _calls) = MockBackend::ok("I could not find anything worth extracting.");
        let mut orchestrator =
            ExtractionOrchestrator::new(Box::new(backend), Some(cache.clone()), Duration::ZERO, 5);
        let ctx = SessionContext::new("s1", "agrama");

        let result = orchestrator.analyze(&message("m1", "a long enough message"), &ctx).await;

        assert!(matches!(result.outcome, AnalysisOutcome::Failed { .. }));
        assert_eq!(orchestrator.stats().failures, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_calls() {
        let mut limiter = RateLimiter::new(Duration::from_millis(40));
        let start = Instant::now();

        limiter.wait().await;
        let first = Instant::now();
        limiter.wait().await;
        let second = Instant::now();

        assert!(first - start < Duration::from_millis(40));
        assert!(second - first >= Duration::from_millis(35));
    }
}
