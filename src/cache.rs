use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Identity of one extractor invocation: the context it runs in plus its
/// exact argument vector.
///
/// Encoded as JSON so that no choice of path or argument text can make two
/// different invocations produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a run inside a caller-supplied module directory. The path is
    /// compared by components, so `/m`, `/m/` and `/m/.` share a key.
    pub fn new(working_dir: &Path, args: &[String]) -> Self {
        let dir: PathBuf = working_dir.components().collect();
        Self::encode(Some(dir.to_string_lossy().as_ref()), args)
    }

    /// Key for a run inside a throwaway module. Those directories are random,
    /// so they are left out; the same query always maps to the same key.
    pub fn ephemeral(args: &[String]) -> Self {
        Self::encode(None, args)
    }

    fn encode(context: Option<&str>, args: &[String]) -> Self {
        // Serializing strings cannot fail.
        let encoded = serde_json::to_string(&(context, args)).unwrap_or_default();
        Self(encoded)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached document. Never mutated; a refresh replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: String,
    pub created_at: Instant,
}

/// Trait for a cache implementation.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the content if a live entry exists; an expired entry is
    /// dropped on the way.
    async fn get(&self, key: &CacheKey) -> Option<String>;
    /// Stores `content`, evicting the oldest entry first if the cache is full.
    async fn insert(&self, key: CacheKey, content: String);
    async fn contains_key(&self, key: &CacheKey) -> bool;
    async fn len(&self) -> usize;
    async fn clear(&self);
}

#[derive(Debug)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl InMemoryCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    fn is_live(&self, entry: &CacheEntry) -> bool {
        entry.created_at.elapsed() < self.ttl
    }
}

fn evict_oldest(entries: &mut HashMap<CacheKey, CacheEntry>) {
    let oldest = entries
        .iter()
        .min_by_key(|(_, entry)| entry.created_at)
        .map(|(key, _)| key.clone());
    if let Some(key) = oldest {
        tracing::debug!("Evicting oldest cache entry {}", key);
        entries.remove(&key);
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get(key)?;
        if self.is_live(entry) {
            return Some(entry.content.clone());
        }
        entries.remove(key);
        None
    }

    async fn insert(&self, key: CacheKey, content: String) {
        let mut entries = self.entries.lock().await;
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            evict_oldest(&mut entries);
        }
        let entry = CacheEntry {
            content,
            created_at: Instant::now(),
        };
        entries.insert(key, entry);
    }

    async fn contains_key(&self, key: &CacheKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
