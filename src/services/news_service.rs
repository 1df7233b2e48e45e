use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{NewsItem, NewsSentiment};
use crate::services::random_source::{RandomSource, RngSource};

const MAX_CACHED_ITEMS: usize = 20;
const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_POLL_INTERVAL_SECS: u64 = 20;

/// Configuration for the news poller
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub enabled: bool,
    pub poll_interval: Duration,
    pub symbol: Option<String>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            symbol: None,
        }
    }
}

impl NewsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("NEWS_ENABLED")
                .ok()
                .and_then(|s| s.parse::<bool>().ok())
                .unwrap_or(defaults.enabled),
            poll_interval: std::env::var("NEWS_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            symbol: std::env::var("NEWS_SYMBOL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Source of market headlines
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<NewsItem>, AppError>;
}

struct HeadlineTemplate {
    title: &'static str,
    description: &'static str,
    category: &'static str,
    sentiment: NewsSentiment,
    sentiment_score: f64,
    is_breaking: bool,
}

const HEADLINES: [HeadlineTemplate; 10] = [
    HeadlineTemplate {
        title: "BREAKING: Nifty 50 surges past 25,000 mark on strong FII inflows",
        description: "Indian benchmark index hits fresh record high as foreign institutional investors pour money into equities",
        category: "Market",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.9,
        is_breaking: true,
    },
    HeadlineTemplate {
        title: "Bank Nifty rallies 2.5% on RBI's growth-supportive measures",
        description: "Banking stocks lead market gains after central bank announces liquidity support measures",
        category: "Banking",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.8,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "IT sector gains momentum on favorable currency dynamics",
        description: "Technology stocks benefit from rupee depreciation and strong demand from US clients",
        category: "Technology",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.75,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "Pharma stocks mixed after USFDA inspection updates",
        description: "Pharmaceutical companies show varied performance on regulatory developments",
        category: "Healthcare",
        sentiment: NewsSentiment::Neutral,
        sentiment_score: 0.1,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "Auto sector under pressure on rising commodity prices",
        description: "Automobile manufacturers face margin concerns due to increased input costs",
        category: "Automotive",
        sentiment: NewsSentiment::Negative,
        sentiment_score: -0.4,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "Energy stocks rally on crude oil price surge",
        description: "Oil and gas companies benefit from global crude price momentum",
        category: "Energy",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.7,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "GDP growth projections raised by leading economists",
        description: "Economic experts revise India's growth forecast upward on strong fundamentals",
        category: "Economy",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.85,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "FPIs turn net buyers after three months of selling",
        description: "Foreign portfolio investors show renewed interest in Indian markets",
        category: "Market",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.8,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "Small-cap index outperforms benchmarks in today's session",
        description: "Mid and small-cap stocks show strong momentum amid broad-based buying",
        category: "Market",
        sentiment: NewsSentiment::Positive,
        sentiment_score: 0.7,
        is_breaking: false,
    },
    HeadlineTemplate {
        title: "Volatility expected ahead of monthly F&O expiry",
        description: "Market experts advise caution as futures and options contracts near expiration",
        category: "Market",
        sentiment: NewsSentiment::Neutral,
        sentiment_score: 0.0,
        is_breaking: false,
    },
];

const SOURCES: [&str; 11] = [
    "Economic Times",
    "Business Standard",
    "Mint",
    "Financial Express",
    "MoneyControl",
    "LiveMint",
    "Bloomberg Quint",
    "Reuters India",
    "CNBC TV18",
    "Business Today",
    "The Hindu BusinessLine",
];

/// Template-driven headlines for Indian markets. Every third fetch for a
/// symbol leads with an earnings headline for that company.
pub struct SyntheticNewsFeed {
    fetch_count: AtomicU64,
    rng: Mutex<Box<dyn RandomSource + Send>>,
}

impl SyntheticNewsFeed {
    pub fn new() -> Self {
        Self::with_random_source(Box::new(RngSource::from_os()))
    }

    pub fn with_random_source(rng: Box<dyn RandomSource + Send>) -> Self {
        Self {
            fetch_count: AtomicU64::new(0),
            rng: Mutex::new(rng),
        }
    }

    fn pick(rng: &mut dyn RandomSource, len: usize) -> usize {
        ((rng.next_unit() * len as f64) as usize).min(len - 1)
    }

    fn generate(&self, symbol: Option<&str>, now: DateTime<Utc>) -> Vec<NewsItem> {
        let fetch_no = self.fetch_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mut guard = self.rng.lock();
        let rng: &mut dyn RandomSource = &mut **guard;

        let mut drafts: Vec<(String, String, &'static str, NewsSentiment, f64, bool)> = HEADLINES
            .iter()
            .map(|t| {
                (
                    t.title.to_string(),
                    t.description.to_string(),
                    t.category,
                    t.sentiment,
                    t.sentiment_score,
                    t.is_breaking,
                )
            })
            .collect();

        if let Some(symbol) = symbol.filter(|_| fetch_no % 3 == 0) {
            let company = symbol.trim_end_matches(".NS");
            drafts.insert(
                0,
                (
                    format!("{} shares jump 4% on strong Q3 earnings beat", company),
                    format!(
                        "{} reports better-than-expected quarterly results with improved margins",
                        company
                    ),
                    "Earnings",
                    NewsSentiment::Positive,
                    0.85,
                    rng.next_unit() > 0.7,
                ),
            );
        }

        // Fisher-Yates shuffle
        for i in (1..drafts.len()).rev() {
            let j = Self::pick(rng, i + 1);
            drafts.swap(i, j);
        }

        let count = 4 + Self::pick(rng, 3);
        let stamp = now.timestamp_millis();

        drafts
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(index, (title, description, category, sentiment, score, is_breaking))| {
                let minutes_ago = Self::pick(rng, 30) as i64;
                NewsItem {
                    id: format!("news_{}_{}_{}_{}", stamp, fetch_no, index, Uuid::new_v4().simple()),
                    title,
                    description,
                    url: format!("https://example.com/news/{}_{}", stamp, index),
                    source: SOURCES[Self::pick(rng, SOURCES.len())].to_string(),
                    published_at: now - ChronoDuration::minutes(minutes_ago),
                    sentiment,
                    sentiment_score: score + rng.centered() * 0.1,
                    category: category.to_string(),
                    is_breaking,
                    image_url: Some(format!(
                        "https://source.unsplash.com/400x200/?stock,market,finance&{}",
                        index
                    )),
                }
            })
            .collect()
    }
}

impl Default for SyntheticNewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NewsFeed for SyntheticNewsFeed {
    async fn fetch(&self, symbol: Option<&str>) -> Result<Vec<NewsItem>, AppError> {
        Ok(self.generate(symbol, Utc::now()))
    }
}

type Callback = Arc<dyn Fn(&[NewsItem]) + Send + Sync>;

struct Inner {
    feed: Arc<dyn NewsFeed>,
    min_refresh_interval: Duration,
    cache: RwLock<Vec<NewsItem>>,
    subscribers: Mutex<HashMap<u64, Callback>>,
    next_subscriber_id: AtomicU64,
    last_fetch: Mutex<Option<Instant>>,
}

impl Inner {
    fn broadcast(&self, items: &[NewsItem]) {
        // Call outside the lock so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self.subscribers.lock().values().cloned().collect();
        debug!("Broadcasting {} news items to {} subscribers", items.len(), callbacks.len());
        for callback in callbacks {
            callback(items);
        }
    }

    /// Claim the fetch slot unless the last fetch was too recent.
    fn try_claim_fetch(&self) -> bool {
        let mut last = self.last_fetch.lock();
        let now = Instant::now();
        match *last {
            Some(prev) if now.duration_since(prev) < self.min_refresh_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    async fn refresh(&self, symbol: Option<&str>) -> Result<usize, AppError> {
        if !self.try_claim_fetch() {
            debug!("Skipping news refresh, last fetch was under {:?} ago", self.min_refresh_interval);
            return Ok(0);
        }

        let fetched = self.feed.fetch(symbol).await?;

        let (added, snapshot) = {
            let mut cache = self.cache.write();
            let fresh: Vec<NewsItem> = fetched
                .into_iter()
                .filter(|item| !cache.iter().any(|cached| cached.id == item.id))
                .collect();
            if fresh.is_empty() {
                return Ok(0);
            }

            let added = fresh.len();
            cache.extend(fresh);
            cache.sort_by(|a, b| b.published_at.cmp(&a.published_at));
            cache.truncate(MAX_CACHED_ITEMS);
            (added, cache.clone())
        };

        info!("News refresh added {} items", added);
        self.broadcast(&snapshot);
        Ok(added)
    }
}

/// Handle returned by [`NewsService::subscribe`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.lock().remove(&self.id);
            debug!("News subscriber {} removed", self.id);
        }
    }
}

/// Polls a news feed, keeps the newest headlines and pushes them to
/// subscribers. Owned by the application state and stopped on shutdown.
pub struct NewsService {
    inner: Arc<Inner>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl NewsService {
    pub fn new(feed: Arc<dyn NewsFeed>) -> Self {
        Self::with_refresh_interval(feed, MIN_REFRESH_INTERVAL)
    }

    pub fn with_refresh_interval(feed: Arc<dyn NewsFeed>, min_refresh_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                feed,
                min_refresh_interval,
                cache: RwLock::new(Vec::new()),
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber_id: AtomicU64::new(1),
                last_fetch: Mutex::new(None),
            }),
            poller: Mutex::new(None),
        }
    }

    /// Register a callback. It is immediately called with the cache when
    /// there is anything cached.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[NewsItem]) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        let callback: Callback = Arc::new(callback);
        self.inner.subscribers.lock().insert(id, callback.clone());
        debug!("News subscriber {} added", id);

        let cached = self.latest();
        if !cached.is_empty() {
            callback(&cached);
        }

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Start polling, replacing any running poller. The first refresh runs
    /// immediately.
    pub fn start(&self, symbol: Option<String>, interval: Duration) {
        self.stop();
        info!("Starting news updates every {:?} (symbol: {:?})", interval, symbol);

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if let Err(e) = inner.refresh(symbol.as_deref()).await {
                    error!("News refresh failed: {}", e);
                }
            }
        });

        *self.poller.lock() = Some(handle);
    }

    pub fn stop(&self) {
        if let Some(handle) = self.poller.lock().take() {
            info!("Stopping news updates");
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.poller
            .lock()
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    /// Fetch now, subject to the refresh rate limit. Returns how many new
    /// items were added.
    pub async fn refresh(&self, symbol: Option<&str>) -> Result<usize, AppError> {
        self.inner.refresh(symbol).await
    }

    pub fn latest(&self) -> Vec<NewsItem> {
        self.inner.cache.read().clone()
    }

    /// Fetch and replace the cache outright, bypassing the rate limit.
    pub async fn fetch_latest(&self, symbol: Option<&str>) -> Result<Vec<NewsItem>, AppError> {
        let mut items = self.inner.feed.fetch(symbol).await?;
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(MAX_CACHED_ITEMS);
        *self.inner.cache.write() = items.clone();
        Ok(items)
    }

    /// Push a breaking headline to the front of the cache and broadcast.
    pub fn publish_breaking(&self, title: &str, description: &str) -> NewsItem {
        let item = NewsItem {
            id: format!("breaking_{}_{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple()),
            title: title.to_string(),
            description: description.to_string(),
            url: "https://example.com/breaking-news".to_string(),
            source: "Market Watch".to_string(),
            published_at: Utc::now(),
            sentiment: NewsSentiment::Positive,
            sentiment_score: 0.95,
            category: "Market".to_string(),
            is_breaking: true,
            image_url: None,
        };

        let snapshot = {
            let mut cache = self.inner.cache.write();
            cache.insert(0, item.clone());
            cache.truncate(MAX_CACHED_ITEMS);
            cache.clone()
        };
        self.inner.broadcast(&snapshot);
        item
    }
}

impl Drop for NewsService {
    fn drop(&mut self) {
        self.stop();
    }
}
