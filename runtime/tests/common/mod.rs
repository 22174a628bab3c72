//! Scripted browser for integration tests.
//!
//! Pages are keyed by URL. A URL with no page times out on navigation, so a
//! city can be made to exhaust its retries just by leaving it out.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wxcheck::renderer::{BrowserLauncher, NavigationResult, RenderContext, Renderer};
use wxcheck::retry::RetryPolicy;
use wxcheck::web::WebSettings;
use wxcheck::{Result, WxError};

pub const WEB_BASE: &str = "https://weather.test/";

#[derive(Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub navigations: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct ScriptedBrowser {
    pages: Arc<HashMap<String, String>>,
    pub counters: Arc<Counters>,
}

impl ScriptedBrowser {
    pub fn new<'a>(pages: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, html)| (url.to_string(), html))
                    .collect(),
            ),
            counters: Arc::new(Counters::default()),
        }
    }
}

struct ScriptedContext {
    pages: Arc<HashMap<String, String>>,
    counters: Arc<Counters>,
    current: Option<String>,
}

#[async_trait]
impl Renderer for ScriptedBrowser {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Ok(Box::new(ScriptedContext {
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
            current: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        0
    }
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(NavigationResult {
                    final_url: url.to_string(),
                    load_time_ms: 1,
                })
            }
            None => Err(WxError::NavigationTimeout {
                url: url.to_string(),
                timeout_ms,
            }),
        }
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedBrowser {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(self.clone()))
    }
}

/// Launcher that never yields a browser.
pub struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self) -> Result<Arc<dyn Renderer>> {
        Err(WxError::BrowserUnavailable("no chromium in test".into()))
    }
}

pub fn page(temp: &str, feels_like: Option<&str>) -> String {
    let feels = feels_like
        .map(|f| format!("<p>Feels Like: {f}</p>"))
        .unwrap_or_default();
    format!(
        "<html><body><div id=\"qlook\"><div id=\"wt-temp\">{temp}</div>{feels}</div></body></html>"
    )
}

pub fn fast_settings() -> WebSettings {
    WebSettings {
        navigation_timeout: Duration::from_millis(50),
        selector_timeout: Duration::from_millis(5),
        poll_interval: Duration::from_millis(1),
        inter_city_delay: Duration::ZERO,
        retry: RetryPolicy::new(3, Duration::ZERO),
    }
}
