//! Tool result cache
//!
//! Two tiers: a bounded in-process map and an optional durable store. Reads
//! check memory first and promote durable hits; writes go to both tiers.
//! Durable failures never reach callers.

pub mod clock;
pub mod store;

use crate::error::StoreError;
use clock::{Clock, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use store::{expiry, DurableStore};
use tokio::time::timeout;

const MINUTE_MS: u64 = 60_000;

/// Output of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            success: true,
            content: content.into(),
            exit_code: None,
            metadata: None,
        }
    }

    pub fn failed(content: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            success: false,
            content: content.into(),
            exit_code,
            metadata: None,
        }
    }

    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = Some(code);
        self
    }

    /// Failed results are never cached
    pub fn is_failure(&self) -> bool {
        !self.success || self.exit_code.is_some_and(|code| code != 0)
    }
}

/// Whether and how long a tool's results may be cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCachePolicy {
    /// Zero keeps entries until invalidated
    #[serde(default)]
    pub ttl_ms: u64,

    #[serde(default)]
    pub cacheable: bool,
}

impl ToolCachePolicy {
    pub const fn cacheable(ttl_ms: u64) -> Self {
        Self {
            ttl_ms,
            cacheable: true,
        }
    }

    pub const fn never() -> Self {
        Self {
            ttl_ms: 0,
            cacheable: false,
        }
    }
}

impl Default for ToolCachePolicy {
    fn default() -> Self {
        Self::never()
    }
}

/// Built-in per-tool policies
const BUILTIN_POLICIES: &[(&str, ToolCachePolicy)] = &[
    ("read_file", ToolCachePolicy::cacheable(5 * MINUTE_MS)),
    ("list_directory", ToolCachePolicy::cacheable(MINUTE_MS)),
    ("glob", ToolCachePolicy::cacheable(MINUTE_MS)),
    ("grep", ToolCachePolicy::cacheable(2 * MINUTE_MS)),
    ("search_files", ToolCachePolicy::cacheable(2 * MINUTE_MS)),
    ("web_fetch", ToolCachePolicy::cacheable(15 * MINUTE_MS)),
    ("web_search", ToolCachePolicy::cacheable(30 * MINUTE_MS)),
    ("write_file", ToolCachePolicy::never()),
    ("edit_file", ToolCachePolicy::never()),
    ("delete_file", ToolCachePolicy::never()),
    ("execute_command", ToolCachePolicy::never()),
    ("bash", ToolCachePolicy::never()),
    ("spawn_agent", ToolCachePolicy::never()),
];

/// Policy table with a fallback for unknown tools
#[derive(Debug, Clone)]
pub struct CachePolicies {
    by_tool: HashMap<String, ToolCachePolicy>,
    default: ToolCachePolicy,
}

impl CachePolicies {
    pub fn builtin() -> Self {
        Self {
            by_tool: BUILTIN_POLICIES
                .iter()
                .map(|(tool, policy)| (tool.to_string(), *policy))
                .collect(),
            default: ToolCachePolicy::never(),
        }
    }

    /// Replace or add policies; the `default` key sets the fallback
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a ToolCachePolicy)>,
    ) -> Self {
        for (tool, policy) in overrides {
            if tool == "default" {
                self.default = *policy;
            } else {
                self.by_tool.insert(tool.clone(), *policy);
            }
        }
        self
    }

    pub fn policy(&self, tool: &str) -> ToolCachePolicy {
        self.by_tool.get(tool).copied().unwrap_or(self.default)
    }

    pub fn is_cacheable(&self, tool: &str) -> bool {
        self.policy(tool).cacheable
    }

    pub fn ttl_ms(&self, tool: &str) -> u64 {
        self.policy(tool).ttl_ms
    }
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A cached tool result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub tool_name: String,
    pub args: Value,
    pub result: ToolResult,
    pub created_at: i64,
    pub expires_at: Option<i64>,
    pub ttl_ms: u64,
    #[serde(default)]
    pub hit_count: u64,
    #[serde(default)]
    pub session_id: Option<String>,

    /// Insertion order within the memory tier
    #[serde(skip)]
    seq: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Counters reported by [`ToolResultCache::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Cache sizing and durable-tier behavior
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub max_memory_entries: usize,

    /// Upper bound on each durable read or write
    pub durable_timeout: Duration,

    /// Keep results of different sessions apart
    pub session_scoped: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_memory_entries: 1_000,
            durable_timeout: Duration::from_millis(250),
            session_scoped: false,
        }
    }
}

#[derive(Default)]
struct MemoryTier {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// Two-tier cache of tool results keyed by tool name and canonical arguments
pub struct ToolResultCache {
    policies: CachePolicies,
    options: CacheOptions,
    memory: Mutex<MemoryTier>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ToolResultCache {
    pub fn new(policies: CachePolicies, options: CacheOptions) -> Self {
        Self {
            policies,
            options,
            memory: Mutex::new(MemoryTier::default()),
            durable: None,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_durable(mut self, store: Arc<dyn DurableStore>) -> Self {
        self.durable = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policies(&self) -> &CachePolicies {
        &self.policies
    }

    pub fn is_cacheable(&self, tool: &str) -> bool {
        self.policies.is_cacheable(tool)
    }

    pub fn ttl_ms(&self, tool: &str) -> u64 {
        self.policies.ttl_ms(tool)
    }

    /// Look up a cached result
    pub async fn get(&self, tool: &str, args: &Value, session: Option<&str>) -> Option<ToolResult> {
        if !self.policies.is_cacheable(tool) {
            return None;
        }

        let key = self.memory_key(tool, args, session);
        let now = self.clock.now_ms();

        {
            let mut memory = self.memory.lock();
            let expired = match memory.entries.get_mut(&key) {
                Some(entry) if !entry.is_expired(now) => {
                    entry.hit_count += 1;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(tool, tier = "memory", "cache hit");
                    return Some(entry.result.clone());
                }
                Some(_) => true,
                None => false,
            };
            if expired {
                memory.entries.remove(&key);
            }
        }

        if let Some(mut entry) = self.durable_get(tool, args, session).await {
            let now = self.clock.now_ms();
            if !entry.is_expired(now) {
                entry.expires_at = expiry(now, entry.ttl_ms);
                entry.hit_count += 1;
                let result = entry.result.clone();
                self.insert_memory(key, entry);
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(tool, tier = "durable", "cache hit");
                return Some(result);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(tool, "cache miss");
        None
    }

    /// Store a result; ignored for non-cacheable tools and failed results
    pub async fn set(
        &self,
        tool: &str,
        args: &Value,
        result: &ToolResult,
        ttl_override: Option<u64>,
        session: Option<&str>,
    ) {
        let policy = self.policies.policy(tool);
        if !policy.cacheable || result.is_failure() {
            return;
        }

        let ttl_ms = ttl_override.unwrap_or(policy.ttl_ms);
        let now = self.clock.now_ms();
        let entry = CacheEntry {
            tool_name: tool.to_string(),
            args: args.clone(),
            result: result.clone(),
            created_at: now,
            expires_at: expiry(now, ttl_ms),
            ttl_ms,
            hit_count: 0,
            session_id: session.map(str::to_string),
            seq: 0,
        };

        self.insert_memory(self.memory_key(tool, args, session), entry.clone());
        self.durable_put(&entry, session).await;
    }

    /// Remove one exact entry, or every entry for `tool` when `args` is `None`.
    ///
    /// With session scoping on, only `session`'s entries are touched in both
    /// tiers; `None` addresses the unscoped entries.
    pub async fn invalidate(&self, tool: &str, args: Option<&Value>, session: Option<&str>) {
        let namespace = self.namespace(tool, session);

        match args {
            Some(args) => {
                self.memory
                    .lock()
                    .entries
                    .remove(&self.memory_key(tool, args, session));
                let key = cache_key(tool, args);
                if let Some(store) = &self.durable {
                    let outcome = timeout(self.options.durable_timeout, store.delete(&namespace, &key)).await;
                    self.log_durable_failure(tool, "delete", outcome.map(|r| r.map(|_| ())));
                }
            }
            None => {
                let scope = self.scope(session);
                self.memory.lock().entries.retain(|_, entry| {
                    entry.tool_name != tool || self.scope(entry.session_id.as_deref()) != scope
                });
                if let Some(store) = &self.durable {
                    let outcome =
                        timeout(self.options.durable_timeout, store.delete_namespace(&namespace)).await;
                    self.log_durable_failure(tool, "delete_namespace", outcome.map(|r| r.map(|_| ())));
                }
            }
        }
    }

    /// Evict in-process entries that read `path` or a directory containing it.
    ///
    /// The durable tier is left alone; its entries age out by TTL.
    pub fn invalidate_for_path(&self, path: &str) -> usize {
        let mut memory = self.memory.lock();
        let before = memory.entries.len();
        memory
            .entries
            .retain(|_, entry| !args_touch_path(&entry.args, path));
        let removed = before - memory.entries.len();
        if removed > 0 {
            tracing::debug!(path, removed, "invalidated cached results for path");
        }
        removed
    }

    /// Drop expired entries from both tiers
    pub async fn clean_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = {
            let mut memory = self.memory.lock();
            let before = memory.entries.len();
            memory.entries.retain(|_, entry| !entry.is_expired(now));
            before - memory.entries.len()
        };

        if let Some(store) = &self.durable {
            match timeout(self.options.durable_timeout, store.purge_expired()).await {
                Ok(Ok(count)) => removed += count,
                Ok(Err(err)) => tracing::warn!(error = %err, "durable cache purge failed"),
                Err(_) => tracing::warn!(
                    error = %StoreError::Timeout(self.timeout_ms()),
                    "durable cache purge failed"
                ),
            }
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.memory.lock().entries.len(),
        }
    }

    fn insert_memory(&self, key: String, mut entry: CacheEntry) {
        let capacity = self.options.max_memory_entries;
        if capacity == 0 {
            return;
        }

        let mut memory = self.memory.lock();
        if !memory.entries.contains_key(&key) && memory.entries.len() >= capacity {
            let victim = memory
                .entries
                .iter()
                .min_by_key(|(_, e)| (e.hit_count, e.seq))
                .map(|(k, _)| k.clone());
            if let Some(victim) = victim {
                memory.entries.remove(&victim);
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }

        entry.seq = memory.next_seq;
        memory.next_seq += 1;
        memory.entries.insert(key, entry);
    }

    async fn durable_get(&self, tool: &str, args: &Value, session: Option<&str>) -> Option<CacheEntry> {
        let store = self.durable.as_ref()?;
        let namespace = self.namespace(tool, session);
        let key = cache_key(tool, args);

        let raw = match timeout(self.options.durable_timeout, store.get(&namespace, &key)).await {
            Ok(Ok(raw)) => raw?,
            outcome => {
                self.log_durable_failure(tool, "get", outcome.map(|r| r.map(|_| ())));
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                let err = StoreError::Corrupt(err.to_string());
                tracing::warn!(tool, error = %err, "durable cache read failed, treating as miss");
                None
            }
        }
    }

    async fn durable_put(&self, entry: &CacheEntry, session: Option<&str>) {
        let Some(store) = &self.durable else {
            return;
        };
        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(tool = %entry.tool_name, error = %err, "cache entry not serializable");
                return;
            }
        };

        let namespace = self.namespace(&entry.tool_name, session);
        let key = cache_key(&entry.tool_name, &entry.args);
        let outcome = timeout(
            self.options.durable_timeout,
            store.put(&namespace, &key, value, entry.ttl_ms),
        )
        .await;
        self.log_durable_failure(&entry.tool_name, "put", outcome);
    }

    fn log_durable_failure(
        &self,
        tool: &str,
        operation: &str,
        outcome: Result<Result<(), StoreError>, tokio::time::error::Elapsed>,
    ) {
        let err = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err,
            Err(_) => StoreError::Timeout(self.timeout_ms()),
        };
        tracing::warn!(tool, operation, error = %err, "durable cache degraded");
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.options.durable_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Session that partitions entries, if scoping is on
    fn scope<'a>(&self, session: Option<&'a str>) -> Option<&'a str> {
        session.filter(|_| self.options.session_scoped)
    }

    fn namespace(&self, tool: &str, session: Option<&str>) -> String {
        match self.scope(session) {
            Some(session) => format!("{session}/{tool}"),
            None => tool.to_string(),
        }
    }

    fn memory_key(&self, tool: &str, args: &Value, session: Option<&str>) -> String {
        let key = cache_key(tool, args);
        match self.scope(session) {
            Some(session) => format!("{session}/{key}"),
            None => key,
        }
    }
}

/// `tool:` followed by the arguments serialized with sorted object keys
pub fn cache_key(tool: &str, args: &Value) -> String {
    let mut key = String::with_capacity(tool.len() + 32);
    key.push_str(tool);
    key.push(':');
    write_canonical(args, &mut key);
    key
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, k) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(&map[k], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

fn args_touch_path(args: &Value, path: &str) -> bool {
    let field = |name: &str| args.get(name).and_then(Value::as_str);

    if field("path") == Some(path) || field("file_path") == Some(path) {
        return true;
    }
    matches!(field("directory"), Some(dir) if path.starts_with(dir))
}
