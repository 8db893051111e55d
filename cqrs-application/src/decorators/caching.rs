//! 缓存装饰器
//!
//! `Cached` 标记映射到 [`CachingDecorator`]，按请求的 `cache_key()` 读写
//! `dyn ResponseCache`；请求没有缓存键时直接透传。
//!
//! 缓存条目的键为 `"{NAME}:{cache_key}"`，不同请求类型的相同 `cache_key()`
//! 互不干扰；按请求类型失效时使用 [`cache_prefix`]。
//!
use crate::{
    context::AppContext,
    decorator::DecoratorArgs,
    error::AppError,
    marker::Marker,
    pipeline::{RequestEnvelope, RequestHandler, SharedOutput},
};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 缓存标记；`ttl` 为空时使用 [`CacheConfig::default_ttl_secs`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cached {
    pub ttl: Option<Duration>,
}

impl Cached {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }
}

impl Marker for Cached {}

/// 某个请求类型全部缓存条目的公共前缀，用于 [`ResponseCache::invalidate`]
pub fn cache_prefix(name: &str) -> String {
    format!("{name}:")
}

fn entry_key(name: &str, key: &str) -> String {
    format!("{name}:{key}")
}

/// 响应缓存
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<SharedOutput>;

    /// `ttl` 为空时由实现决定过期时间
    async fn put(&self, key: String, value: SharedOutput, ttl: Option<Duration>);

    /// 移除以 `prefix` 开头的条目，返回移除数量
    async fn invalidate(&self, prefix: &str) -> usize;
}

/// 缓存配置
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 默认过期秒数
    pub default_ttl_secs: u64,
    /// 最大条目数
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 60,
            max_entries: 1024,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}

struct CacheEntry {
    value: SharedOutput,
    /// `None` 表示永不过期（`ttl` 超出 `Instant` 的表示范围）
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// 进程内响应缓存：惰性过期，满时先清理过期条目，再淘汰最早过期的条目
#[derive(Default)]
pub struct InMemoryResponseCache {
    entries: DashMap<String, CacheEntry>,
    config: CacheConfig,
}

impl InMemoryResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn make_room(&self) {
        if self.entries.len() < self.config.max_entries {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));

        while self.entries.len() >= self.config.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| (entry.expires_at.is_none(), entry.expires_at))
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<SharedOutput> {
        let now = Instant::now();
        let hit = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));

        match hit {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: String, value: SharedOutput, ttl: Option<Duration>) {
        if self.config.max_entries == 0 {
            return;
        }
        if !self.entries.contains_key(&key) {
            self.make_room();
        }

        let ttl = ttl.unwrap_or_else(|| self.config.default_ttl());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    async fn invalidate(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }
}

pub struct CachingDecorator {
    inner: Arc<dyn RequestHandler>,
    cache: Arc<dyn ResponseCache>,
    ttl: Option<Duration>,
}

impl CachingDecorator {
    pub fn new(
        inner: Arc<dyn RequestHandler>,
        cache: Arc<dyn ResponseCache>,
        ttl: Option<Duration>,
    ) -> Self {
        Self { inner, cache, ttl }
    }

    pub fn from_args(args: &DecoratorArgs<'_, Cached>) -> Result<Self, AppError> {
        let cache = args.resolve::<dyn ResponseCache>()?;
        Ok(Self::new(args.inner.clone(), cache, args.marker.ttl))
    }
}

#[async_trait]
impl RequestHandler for CachingDecorator {
    async fn handle(
        &self,
        ctx: &AppContext,
        request: RequestEnvelope,
    ) -> Result<SharedOutput, AppError> {
        let info = request.info();
        let Some(key) = info.cache_key.as_deref().map(|key| entry_key(info.name, key)) else {
            return self.inner.handle(ctx, request).await;
        };

        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }

        let out = self.inner.handle(ctx, request).await?;
        self.cache.put(key, out.clone(), self.ttl).await;
        Ok(out)
    }
}
