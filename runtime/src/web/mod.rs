//! Web extractor: per-city readings from the rendered weather page.
//!
//! Each city walks Resolve → Fetch → Locate → Extract → FeelsLikeScan, with
//! any retryable failure restarting from Fetch under the retry policy.
//! Cities are processed strictly sequentially in one browser session, with a
//! fixed pause between cities to stay under the site's rate limits.
//!
//! The browser session is acquired lazily on the first city that needs it and
//! released when the batch ends, on every exit path.

pub mod resolve;
pub mod strategy;

use crate::error::{Result, WxError};
use crate::model::{Reading, Source};
use crate::normalize;
use crate::renderer::{BrowserLauncher, RenderContext, Renderer};
use crate::retry::RetryPolicy;
use resolve::CityResolver;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use strategy::{locate_primary, scan_feels_like, ExtractionStrategy, PrimaryMatch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Timing and retry knobs for the web path.
#[derive(Debug, Clone, Copy)]
pub struct WebSettings {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    /// How often the rendered DOM is re-read while waiting for a selector.
    pub poll_interval: Duration,
    pub inter_city_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            inter_city_delay: Duration::from_secs(3),
            retry: RetryPolicy::new(3, Duration::from_secs(5)),
        }
    }
}

/// Terminal state of one city.
#[derive(Debug)]
pub enum CityOutcome {
    Success(Reading),
    /// No URL mapping; no network call was made.
    NotFound,
    /// Retries exhausted, carrying the last error.
    Failed(WxError),
}

/// Drives a browser session over a list of cities.
pub struct WebExtractor {
    launcher: Arc<dyn BrowserLauncher>,
    renderer: Option<Arc<dyn Renderer>>,
    resolver: CityResolver,
    chain: Vec<Box<dyn ExtractionStrategy>>,
    settings: WebSettings,
}

impl WebExtractor {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        resolver: CityResolver,
        chain: Vec<Box<dyn ExtractionStrategy>>,
        settings: WebSettings,
    ) -> Self {
        Self {
            launcher,
            renderer: None,
            resolver,
            chain,
            settings,
        }
    }

    /// Whether a browser session is currently held.
    pub fn has_session(&self) -> bool {
        self.renderer.is_some()
    }

    async fn session(&mut self) -> Result<Arc<dyn Renderer>> {
        if let Some(renderer) = &self.renderer {
            return Ok(Arc::clone(renderer));
        }
        info!("acquiring browser session");
        let renderer = self.launcher.launch().await.map_err(|e| match e {
            WxError::BrowserUnavailable(_) => e,
            other => WxError::BrowserUnavailable(other.to_string()),
        })?;
        self.renderer = Some(Arc::clone(&renderer));
        Ok(renderer)
    }

    /// Release the browser session, if one is held.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(renderer) = self.renderer.take() {
            info!("releasing browser session");
            renderer.shutdown().await?;
        }
        Ok(())
    }

    /// Run one city through the state machine.
    ///
    /// Only a failure to acquire the browser is returned as `Err`; every
    /// per-city failure is reported through `CityOutcome`.
    pub async fn extract_city(&mut self, city: &str) -> Result<CityOutcome> {
        let url = match self.resolver.resolve(city) {
            Ok(url) => url,
            Err(e) => {
                info!("{city}: {e}; skipping");
                return Ok(CityOutcome::NotFound);
            }
        };

        let renderer = self.session().await?;
        let label = format!("web {city}");
        let result = self
            .settings
            .retry
            .run(&label, WxError::is_retryable, |_| {
                self.attempt(&renderer, city, &url)
            })
            .await;

        Ok(match result {
            Ok(reading) => {
                info!(
                    "{city}: {:?}°C (feels like {:?}°C) from web",
                    reading.temperature_celsius, reading.feels_like_celsius
                );
                CityOutcome::Success(reading)
            }
            Err(e) => {
                warn!("{city}: web extraction failed: {e}");
                CityOutcome::Failed(e)
            }
        })
    }

    /// Extract every city in order and release the session afterwards.
    ///
    /// Cities that end `NotFound` or `Failed` are omitted from the output.
    /// Cities not started before `deadline` are abandoned.
    pub async fn extract_batch(
        &mut self,
        cities: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<Reading>> {
        let result = self.extract_all(cities, deadline).await;
        if let Err(e) = self.close().await {
            warn!("browser shutdown failed: {e}");
        }
        result
    }

    async fn extract_all(
        &mut self,
        cities: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<Reading>> {
        let mut readings = Vec::with_capacity(cities.len());

        for (i, city) in cities.iter().enumerate() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                warn!(
                    "batch deadline reached; abandoning {} remaining cities",
                    cities.len() - i
                );
                break;
            }

            let outcome = self.extract_city(city).await?;
            let touched_network = !matches!(outcome, CityOutcome::NotFound);
            if let CityOutcome::Success(reading) = outcome {
                readings.push(reading);
            }

            let is_last = i + 1 == cities.len();
            if touched_network && !is_last && !self.settings.inter_city_delay.is_zero() {
                tokio::time::sleep(self.settings.inter_city_delay).await;
            }
        }

        info!(
            "web batch complete: {}/{} cities extracted",
            readings.len(),
            cities.len()
        );
        Ok(readings)
    }

    /// One Fetch → Locate → Extract → FeelsLikeScan pass in a fresh tab.
    async fn attempt(&self, renderer: &Arc<dyn Renderer>, city: &str, url: &str) -> Result<Reading> {
        let mut ctx = renderer.new_context().await?;
        let result = self.attempt_in(ctx.as_mut(), city, url).await;
        if let Err(e) = ctx.close().await {
            debug!("{city}: closing tab failed: {e}");
        }
        result
    }

    async fn attempt_in(&self, ctx: &mut dyn RenderContext, city: &str, url: &str) -> Result<Reading> {
        let timeout_ms = self.settings.navigation_timeout.as_millis() as u64;
        let nav = ctx.navigate(url, timeout_ms).await?;
        debug!("{city}: loaded {} in {}ms", nav.final_url, nav.load_time_ms);

        let (primary, html) = self.locate(ctx).await?;
        debug!("{city}: matched {} -> {:?}", primary.strategy, primary.text);

        let temperature = normalize::parse_text(&primary.text, None)?;

        let feels_like = {
            let doc = Html::parse_document(&html);
            scan_feels_like(&doc, &primary.text)
        };
        if feels_like.is_none() {
            debug!("{city}: no feels-like value on page");
        }

        Ok(Reading::new(city, temperature, feels_like, Source::Web))
    }

    /// Poll the rendered DOM until the selector chain matches or the wait expires.
    async fn locate(&self, ctx: &dyn RenderContext) -> Result<(PrimaryMatch, String)> {
        let deadline = Instant::now() + self.settings.selector_timeout;
        loop {
            let html = ctx.get_html().await?;
            if let Some(found) = self.find_primary(&html) {
                return Ok((found, html));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(WxError::ElementNotFound {
                    tried: self
                        .chain
                        .iter()
                        .map(|s| s.name())
                        .collect::<Vec<_>>()
                        .join(", "),
                    timeout_ms: self.settings.selector_timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.settings.poll_interval.min(deadline - now)).await;
        }
    }

    fn find_primary(&self, html: &str) -> Option<PrimaryMatch> {
        let doc = Html::parse_document(html);
        locate_primary(&doc, &self.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves one fixed HTML body for every URL, or times out.
    struct FixedRenderer {
        html: Option<String>,
        navigations: Arc<AtomicUsize>,
        shutdowns: Arc<AtomicUsize>,
    }

    struct FixedContext {
        html: Option<String>,
        navigations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Renderer for FixedRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            Ok(Box::new(FixedContext {
                html: self.html.clone(),
                navigations: Arc::clone(&self.navigations),
            }))
        }
        async fn shutdown(&self) -> Result<()> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn active_contexts(&self) -> usize {
            0
        }
    }

    #[async_trait]
    impl RenderContext for FixedContext {
        async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
            self.navigations.fetch_add(1, Ordering::SeqCst);
            match self.html {
                Some(_) => Ok(NavigationResult {
                    final_url: url.to_string(),
                    load_time_ms: 1,
                }),
                None => Err(WxError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                }),
            }
        }
        async fn get_html(&self) -> Result<String> {
            Ok(self.html.clone().unwrap_or_default())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    struct FixedLauncher {
        renderer: Mutex<Option<Arc<FixedRenderer>>>,
        launches: AtomicUsize,
    }

    impl FixedLauncher {
        fn new(renderer: FixedRenderer) -> Self {
            Self {
                renderer: Mutex::new(Some(Arc::new(renderer))),
                launches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for FixedLauncher {
        async fn launch(&self) -> Result<Arc<dyn Renderer>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            let r = self.renderer.lock().unwrap().clone();
            r.map(|r| r as Arc<dyn Renderer>)
                .ok_or_else(|| WxError::BrowserUnavailable("gone".into()))
        }
    }

    fn fast_settings() -> WebSettings {
        WebSettings {
            navigation_timeout: Duration::from_millis(50),
            selector_timeout: Duration::from_millis(5),
            poll_interval: Duration::from_millis(1),
            inter_city_delay: Duration::ZERO,
            retry: RetryPolicy::new(3, Duration::ZERO),
        }
    }

    type Harness = (WebExtractor, Arc<FixedLauncher>, Arc<AtomicUsize>, Arc<AtomicUsize>);

    fn extractor(html: Option<&str>) -> Harness {
        extractor_with(html, fast_settings())
    }

    fn extractor_with(html: Option<&str>, settings: WebSettings) -> Harness {
        let navigations = Arc::new(AtomicUsize::new(0));
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let launcher = Arc::new(FixedLauncher::new(FixedRenderer {
            html: html.map(String::from),
            navigations: Arc::clone(&navigations),
            shutdowns: Arc::clone(&shutdowns),
        }));
        let resolver = CityResolver::with_defaults("https://weather.test/").unwrap();
        let chain = strategy::selector_chain(strategy::DEFAULT_TEMPERATURE_SELECTORS).unwrap();
        let ex = WebExtractor::new(
            Arc::clone(&launcher) as Arc<dyn BrowserLauncher>,
            resolver,
            chain,
            settings,
        );
        (ex, launcher, navigations, shutdowns)
    }

    #[tokio::test]
    async fn test_success_with_feels_like() {
        let (mut ex, _, _, _) =
            extractor(Some(r#"<div id="wt-temp">68 °F</div><p>Feels Like: 64 °F</p>"#));
        match ex.extract_city("London").await.unwrap() {
            CityOutcome::Success(r) => {
                assert_eq!(r.temperature_celsius, Some(20.0));
                assert_eq!(r.feels_like_celsius, Some(17.8));
                assert_eq!(r.source, Source::Web);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsupported_city_makes_no_network_call() {
        let (mut ex, launcher, navigations, _) = extractor(Some("<div id=\"wt-temp\">1 °C</div>"));
        assert!(matches!(
            ex.extract_city("Atlantis").await.unwrap(),
            CityOutcome::NotFound
        ));
        assert_eq!(navigations.load(Ordering::SeqCst), 0);
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
        assert!(!ex.has_session());
    }

    #[tokio::test]
    async fn test_timeouts_exhaust_retries() {
        let (mut ex, _, navigations, _) = extractor(None);
        match ex.extract_city("Paris").await.unwrap() {
            CityOutcome::Failed(WxError::NavigationTimeout { .. }) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(navigations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_element_exhausts_retries() {
        let (mut ex, _, navigations, _) = extractor(Some("<p>redesigned page</p>"));
        match ex.extract_city("Paris").await.unwrap() {
            CityOutcome::Failed(WxError::ElementNotFound { tried, .. }) => {
                assert_eq!(tried, "div#wt-temp, div.h2, span.h2");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(navigations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_implausible_value_is_failure() {
        let (mut ex, _, _, _) = extractor(Some(r#"<div id="wt-temp">451 °F</div>"#));
        assert!(matches!(
            ex.extract_city("Rome").await.unwrap(),
            CityOutcome::Failed(WxError::ExtractionFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_omits_failures_and_releases_session() {
        let (mut ex, launcher, _, shutdowns) = extractor(None);
        let cities = vec!["London".to_string(), "Atlantis".to_string()];
        let readings = ex.extract_batch(&cities, None).await.unwrap();
        assert!(readings.is_empty());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(!ex.has_session());
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() {
        let (mut ex, launcher, _, _) = extractor(Some("<div id=\"wt-temp\">1 °C</div>"));
        launcher.renderer.lock().unwrap().take();
        let cities = vec!["London".to_string()];
        assert!(matches!(
            ex.extract_batch(&cities, None).await,
            Err(WxError::BrowserUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_deadline_abandons_cities() {
        let (mut ex, launcher, _, _) = extractor(Some("<div id=\"wt-temp\">1 °C</div>"));
        let cities = vec!["London".to_string(), "Paris".to_string()];
        let readings = ex.extract_batch(&cities, Some(Instant::now())).await.unwrap();
        assert!(readings.is_empty());
        assert_eq!(launcher.launches.load(Ordering::SeqCst), 0);
    }

    /// Empty DOM until the `ready_on`-th read, then the full page.
    struct LateContext {
        reads: AtomicUsize,
        ready_on: usize,
    }

    #[async_trait]
    impl RenderContext for LateContext {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 1,
            })
        }
        async fn get_html(&self) -> Result<String> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(if n >= self.ready_on {
                r#"<html><body><div id="wt-temp">21 °C</div></body></html>"#.to_string()
            } else {
                "<html><body><p>loading</p></body></html>".to_string()
            })
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn assert_elapsed(start: Instant, expected: Duration) {
        let elapsed = start.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_millis(50),
            "elapsed {elapsed:?}, expected {expected:?}"
        );
    }

    fn throttled_settings() -> WebSettings {
        WebSettings {
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_millis(500),
            inter_city_delay: Duration::from_secs(3),
            retry: RetryPolicy::new(3, Duration::from_secs(5)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_city_delay_only_after_network_cities() {
        let (mut ex, _, navigations, _) = extractor_with(
            Some(r#"<div id="wt-temp">20 °C</div>"#),
            throttled_settings(),
        );
        let cities = vec![
            "London".to_string(),
            "Atlantis".to_string(),
            "Paris".to_string(),
        ];

        let start = Instant::now();
        let readings = ex.extract_batch(&cities, None).await.unwrap();

        // One pause after London; none after Atlantis or the last city.
        assert_elapsed(start, Duration::from_secs(3));
        assert_eq!(readings.len(), 2);
        assert_eq!(navigations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_delay_between_attempts() {
        let (mut ex, _, navigations, _) = extractor_with(None, throttled_settings());
        let cities = vec!["Paris".to_string()];

        let start = Instant::now();
        let readings = ex.extract_batch(&cities, None).await.unwrap();

        // Three attempts, two 5 s pauses, no trailing inter-city delay.
        assert_elapsed(start, Duration::from_secs(10));
        assert!(readings.is_empty());
        assert_eq!(navigations.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_waits_for_late_element() {
        let (ex, _, _, _) = extractor_with(None, throttled_settings());
        let ctx = LateContext {
            reads: AtomicUsize::new(0),
            ready_on: 3,
        };

        let start = Instant::now();
        let (found, _) = ex.locate(&ctx).await.unwrap();

        assert_eq!(found.strategy, "div#wt-temp");
        assert_eq!(found.text, "21 °C");
        assert_eq!(ctx.reads.load(Ordering::SeqCst), 3);
        assert_elapsed(start, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_gives_up_at_selector_timeout() {
        let (ex, _, _, _) = extractor_with(None, throttled_settings());
        let ctx = LateContext {
            reads: AtomicUsize::new(0),
            ready_on: usize::MAX,
        };

        let start = Instant::now();
        let err = ex.locate(&ctx).await.unwrap_err();

        assert!(matches!(err, WxError::ElementNotFound { timeout_ms: 2000, .. }));
        assert_elapsed(start, Duration::from_secs(2));
        // Reads at 0, 0.5, 1.0, 1.5 and 2.0 s.
        assert_eq!(ctx.reads.load(Ordering::SeqCst), 5);
    }
}
