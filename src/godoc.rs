//! Running `go doc` behind the document cache.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::cache::{Cache, CacheKey};
use crate::command::{CommandError, GoCommand};
use crate::diagnose::ExtractionFailure;
use crate::error::DocError;

/// Something that turns an argument vector into documentation text.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, working_dir: &Path, args: &[String]) -> Result<String, DocError>;
}

/// The real extractor: `go doc <args>`.
#[derive(Debug, Clone)]
pub struct GoDocExtractor {
    go: GoCommand,
}

impl GoDocExtractor {
    pub fn new(go: GoCommand) -> Self {
        Self { go }
    }
}

#[async_trait]
impl Extractor for GoDocExtractor {
    async fn extract(&self, working_dir: &Path, args: &[String]) -> Result<String, DocError> {
        let argv = std::iter::once("doc").chain(args.iter().map(String::as_str));
        let out = self.go.run(working_dir, argv).await.map_err(|e| match e {
            CommandError::TimedOut { after, .. } => DocError::Timeout {
                what: "go doc".to_string(),
                after,
            },
            CommandError::Spawn { .. } => {
                DocError::Extraction(ExtractionFailure::classify("not started", e.to_string()))
            }
        })?;

        if !out.success() {
            return Err(ExtractionFailure::classify(out.status.to_string(), out.output).into());
        }
        Ok(out.output)
    }
}

/// Cache-fronted extractor.
///
/// The cache lock is only taken for lookups and inserts; the extractor runs
/// without it, so unrelated requests never wait on each other's processes.
/// Two concurrent misses on the same key both run the extractor and the last
/// insert wins.
#[derive(Clone)]
pub struct DocEngine {
    cache: Arc<dyn Cache>,
    extractor: Arc<dyn Extractor>,
}

impl DocEngine {
    pub fn new(cache: Arc<dyn Cache>, extractor: Arc<dyn Extractor>) -> Self {
        Self { cache, extractor }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    /// Runs `args` in a caller-supplied module directory.
    pub async fn run(&self, working_dir: &Path, args: &[String]) -> Result<String, DocError> {
        self.run_keyed(CacheKey::new(working_dir, args), working_dir, args)
            .await
    }

    /// Live cached content for `key`, without running anything.
    pub async fn cached(&self, key: &CacheKey) -> Option<String> {
        let content = self.cache.get(key).await;
        if content.is_some() {
            tracing::info!("Cache hit for {}", key);
        }
        content
    }

    /// Runs `args` in `working_dir`, caching the result under `key`.
    pub async fn run_keyed(
        &self,
        key: CacheKey,
        working_dir: &Path,
        args: &[String],
    ) -> Result<String, DocError> {
        if let Some(content) = self.cached(&key).await {
            return Ok(content);
        }

        let content = self.extractor.extract(working_dir, args).await?;
        tracing::info!("Cache miss for {} ({} bytes)", key, content.len());

        self.cache.insert(key, content.clone()).await;
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::diagnose::FailureKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes its arguments and counts invocations.
    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for CountingExtractor {
        async fn extract(&self, working_dir: &Path, args: &[String]) -> Result<String, DocError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(format!("{} {} #{n}", working_dir.display(), args.join(" ")))
        }
    }

    struct FailingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for FailingExtractor {
        async fn extract(&self, _: &Path, args: &[String]) -> Result<String, DocError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ExtractionFailure::classify(
                "exit status: 1",
                format!("doc: no such package {}", args.join(" ")),
            )
            .into())
        }
    }

    /// Sleeps on every call and records how many calls overlapped.
    #[derive(Default)]
    struct SlowExtractor {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Extractor for SlowExtractor {
        async fn extract(&self, _: &Path, args: &[String]) -> Result<String, DocError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("package {}", args.join(" ")))
        }
    }

    fn engine_with(extractor: Arc<dyn Extractor>, ttl: Duration, max: usize) -> DocEngine {
        DocEngine::new(Arc::new(InMemoryCache::new(ttl, max)), extractor)
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_hit_skips_extractor() {
        let extractor = Arc::new(CountingExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let dir = Path::new("/tmp/mod");

        let first = engine.run(dir, &args(&["io"])).await.unwrap();
        let second = engine.run(dir, &args(&["io"])).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_queries_do_not_share_entries() {
        let extractor = Arc::new(CountingExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);

        engine.run(Path::new("/a"), &args(&["io"])).await.unwrap();
        engine.run(Path::new("/b"), &args(&["io"])).await.unwrap();
        engine.run(Path::new("/a"), &args(&["-all", "io"])).await.unwrap();
        engine.run(Path::new("/a"), &args(&["io", "Reader"])).await.unwrap();

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 4);
        assert_eq!(engine.cache().len().await, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_misses_on_different_keys_run_in_parallel() {
        let extractor = Arc::new(SlowExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let dir = Path::new("/tmp/mod");
        let (io, fmt) = (args(&["io"]), args(&["fmt"]));

        let (a, b) = tokio::join!(engine.run(dir, &io), engine.run(dir, &fmt));

        assert_eq!(a.unwrap(), "package io");
        assert_eq!(b.unwrap(), "package fmt");
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_identical_misses_leave_one_entry() {
        let extractor = Arc::new(SlowExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let dir = Path::new("/tmp/mod");
        let os = args(&["os"]);

        let (a, b) = tokio::join!(engine.run(dir, &os), engine.run(dir, &os));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().len().await, 1);

        engine.run(dir, &os).await.unwrap();
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refreshed() {
        let extractor = Arc::new(CountingExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let dir = Path::new("/tmp/mod");

        let first = engine.run(dir, &args(&["fmt"])).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        let second = engine.run(dir, &args(&["fmt"])).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().len().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let extractor = Arc::new(FailingExtractor {
            calls: AtomicUsize::new(0),
        });
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let dir = Path::new("/tmp/mod");

        for _ in 0..2 {
            let err = engine.run(dir, &args(&["nope"])).await.unwrap_err();
            match err {
                DocError::Extraction(failure) => {
                    assert_eq!(failure.kind, FailureKind::PackageNotFound)
                }
                other => panic!("expected Extraction, got {other:?}"),
            }
        }

        assert_eq!(extractor.calls.load(Ordering::SeqCst), 2);
        assert_eq!(engine.cache().len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_is_respected() {
        let extractor = Arc::new(CountingExtractor::default());
        let engine = engine_with(extractor, Duration::from_secs(300), 3);
        let dir = Path::new("/tmp/mod");

        for pkg in ["io", "fmt", "os", "net/http", "strings"] {
            engine.run(dir, &args(&[pkg])).await.unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }

        let cache = engine.cache();
        assert_eq!(cache.len().await, 3);
        assert!(!cache.contains_key(&CacheKey::new(dir, &args(&["io"]))).await);
        assert!(!cache.contains_key(&CacheKey::new(dir, &args(&["fmt"]))).await);
        assert!(cache.contains_key(&CacheKey::new(dir, &args(&["strings"]))).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ephemeral_key_ignores_directory() {
        let extractor = Arc::new(CountingExtractor::default());
        let engine = engine_with(extractor.clone(), Duration::from_secs(300), 10);
        let query = args(&["io", "Reader"]);
        let key = CacheKey::ephemeral(&query);

        assert!(engine.cached(&key).await.is_none());
        let first = engine
            .run_keyed(key.clone(), Path::new("/tmp/godoc-mcp-a"), &query)
            .await
            .unwrap();
        let second = engine
            .run_keyed(key.clone(), Path::new("/tmp/godoc-mcp-b"), &query)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(engine.cached(&key).await, Some(first));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_go_doc_extractor_classifies_failure() {
        // `sh doc ...` tries to run a script named `doc`, which does not exist.
        let dir = tempfile::tempdir().unwrap();
        let extractor = GoDocExtractor::new(GoCommand::new("sh", Duration::from_secs(10)));
        let err = extractor.extract(dir.path(), &args(&["io"])).await.unwrap_err();
        assert!(matches!(err, DocError::Extraction(_)), "{err:?}");
    }
}
