// Shared test helpers: scripted adapters, recording channels and catalog builders.
//
// This module provides common utilities used across multiple test files to reduce duplication.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use stock_watch::catalog::{FilterSet, Link, Target};
use stock_watch::checker::{Adapter, AdapterRegistry, Extraction};
use stock_watch::config::TimingConfig;
use stock_watch::error_handling::{AdapterError, ChannelError, MonitorStats};
use stock_watch::notification::{
    Channel, Notification, NotificationDispatcher, RecipientRouting, RegisteredChannel,
};
use stock_watch::scheduler::{SchedulerSettings, Supervisor};
use stock_watch::Catalog;

pub type FetchResult = Result<Extraction, AdapterError>;

pub fn in_stock(price: f64) -> FetchResult {
    Ok(Extraction {
        in_stock: true,
        price: Some(price),
    })
}

pub fn out_of_stock() -> FetchResult {
    Ok(Extraction {
        in_stock: false,
        price: None,
    })
}

/// Adapter that replays a script, repeating its last entry forever.
///
/// Every call is timestamped with the (possibly paused) tokio clock.
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<FetchResult>>,
    last: Mutex<FetchResult>,
    calls: Mutex<Vec<(String, Instant)>>,
    /// Simulated fetch duration
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(script: Vec<FetchResult>) -> Arc<Self> {
        Self::with_latency(script, Duration::ZERO)
    }

    pub fn with_latency(script: Vec<FetchResult>, latency: Duration) -> Arc<Self> {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| Err(AdapterError::NetworkFailure("empty script".into())));
        Arc::new(ScriptedAdapter {
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn always(result: FetchResult) -> Arc<Self> {
        Self::new(vec![result])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    /// Time between consecutive calls, in call order.
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1].1 - w[0].1).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Adapter for ScriptedAdapter {
    async fn fetch_and_extract(
        &self,
        url: &str,
        _proxy: Option<&str>,
        _timeout: Duration,
    ) -> FetchResult {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(result) => {
                *self.last.lock().unwrap() = result.clone();
                result
            }
            None => self.last.lock().unwrap().clone(),
        }
    }
}

/// Adapter that is blocked through one proxy and sees the page out of stock
/// through any other.
pub struct ProxyAdapter {
    blocked_proxy: String,
    used: Mutex<Vec<String>>,
}

impl ProxyAdapter {
    pub fn blocking(proxy: &str) -> Arc<Self> {
        Arc::new(ProxyAdapter {
            blocked_proxy: proxy.to_string(),
            used: Mutex::new(Vec::new()),
        })
    }

    /// Proxy of every call, in call order; "direct" when none was given.
    pub fn proxies_used(&self) -> Vec<String> {
        self.used.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Adapter for ProxyAdapter {
    async fn fetch_and_extract(
        &self,
        _url: &str,
        proxy: Option<&str>,
        _timeout: Duration,
    ) -> FetchResult {
        let proxy = proxy.unwrap_or("direct").to_string();
        self.used.lock().unwrap().push(proxy.clone());
        if proxy == self.blocked_proxy {
            Err(AdapterError::HttpBlocked(403))
        } else {
            out_of_stock()
        }
    }
}

/// Adapter whose fetch never completes.
pub struct HangingAdapter {
    pub started: AtomicUsize,
}

impl HangingAdapter {
    pub fn new() -> Arc<Self> {
        Arc::new(HangingAdapter {
            started: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl Adapter for HangingAdapter {
    async fn fetch_and_extract(
        &self,
        _url: &str,
        _proxy: Option<&str>,
        _timeout: Duration,
    ) -> FetchResult {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<FetchResult>().await
    }
}

/// Channel that records what it was asked to send.
pub struct RecordingChannel {
    name: String,
    fail: bool,
    sent: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingChannel {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(RecordingChannel {
            name: name.to_string(),
            fail: false,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(RecordingChannel {
            name: name.to_string(),
            fail: true,
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Reason tags of every send, in order.
    pub fn reasons(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(reason, _)| reason.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(
        &self,
        notification: &Notification,
        recipients: &[String],
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((notification.reason().to_string(), recipients.to_vec()));
        if self.fail {
            Err(ChannelError::Status(502))
        } else {
            Ok(())
        }
    }
}

pub fn as_adapter<A: Adapter + 'static>(adapter: &Arc<A>) -> Arc<dyn Adapter> {
    adapter.clone()
}

pub fn routed(channel: Arc<RecordingChannel>) -> RegisteredChannel {
    RegisteredChannel::new(channel, RecipientRouting::default())
}

/// Fixed delays so check times are predictable: 1s after a success,
/// backoff 1s doubling to 8s.
pub fn fixed_timing() -> TimingConfig {
    TimingConfig::from_millis("test", 1_000, 1_000, 1_000, 8_000).unwrap()
}

pub fn link(target: &str, url: &str) -> Arc<Link> {
    Arc::new(Link {
        target: target.to_string(),
        brand: "nvidia".to_string(),
        series: "3080".to_string(),
        model: "founders edition".to_string(),
        url: url.to_string(),
        price_ceiling: None,
    })
}

pub fn target(name: &str, urls: &[&str], concurrency_limit: usize) -> Target {
    Target {
        name: name.to_string(),
        timing: fixed_timing(),
        concurrency_limit,
        check_timeout: Duration::from_secs(5),
        proxies: None,
        selectors: None,
        links: urls.iter().map(|url| link(name, url)).collect(),
    }
}

pub fn catalog(targets: Vec<Target>) -> Catalog {
    Catalog::from_targets(targets)
}

pub fn settings() -> SchedulerSettings {
    SchedulerSettings {
        renotify_interval: None,
        blocked_alert_streak: 5,
        captcha_disable_after: None,
        restock_ended_log: true,
    }
}

/// Supervisor with one adapter per `(target, adapter)` pair.
pub fn supervisor(
    settings: SchedulerSettings,
    adapters: Vec<(&str, Arc<dyn Adapter>)>,
    channels: Vec<RegisteredChannel>,
    stats: Arc<MonitorStats>,
) -> Supervisor {
    let mut registry = AdapterRegistry::new();
    for (name, adapter) in adapters {
        registry.register(name, adapter);
    }
    let dispatcher = Arc::new(NotificationDispatcher::new(channels, Arc::clone(&stats)));
    Supervisor::new(
        settings,
        Arc::new(FilterSet::default()),
        registry,
        dispatcher,
        stats,
        CancellationToken::new(),
    )
}
