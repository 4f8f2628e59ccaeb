use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::app::{Phase, Result, TrendwatchError};
use crate::domain::TrendRecord;
use crate::scraper::proxy::{ProxyAuthExtension, ProxyConfig};
use crate::scraper::{Locator, TrendExtractor};

/// Patches the navigator-level automation flag. Installed as a
/// new-document script so it runs before any detection code on the page.
const STEALTH_SCRIPT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Launch arguments, replacing chromiumoxide's defaults outright: the
/// default set injects `--enable-automation` (the "controlled by automated
/// software" banner) and `--disable-extensions` (which would drop the
/// proxy-auth bundle), so the session launches with
/// `disable_default_args` and this list instead.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-blink-features=AutomationControlled",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-sync",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-sandbox",
    "--password-store=basic",
    "--start-maximized",
    "--use-mock-keychain",
];

const DEFAULT_PANEL_LABEL: &str = "Timeline: Trending now";

/// Tunables for one scrape session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub login_url: String,
    /// Headless Chrome does not load the proxy-auth extension and is easier
    /// to fingerprint, so this defaults to off.
    pub headless: bool,
    /// Bound on each locate-and-submit step of the login flow (seconds).
    pub login_timeout_secs: u64,
    /// Bound on the wait for the trending panel (seconds).
    pub content_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Accessibility label identifying the trending panel.
    pub panel_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_url: "https://x.com/login".to_string(),
            headless: false,
            login_timeout_secs: 20,
            content_timeout_secs: 30,
            poll_interval_ms: 250,
            panel_label: DEFAULT_PANEL_LABEL.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Lifecycle of one session. `Failed` is reachable from any non-terminal
/// state; `Closed` is terminal and always reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Launched,
    Authenticated,
    ContentReady,
    Extracted,
    Failed,
    Closed,
}

/// Seam between the phase chain and the scoped-resource guarantee: the
/// browser must be released exactly once however the phases exit.
#[async_trait]
trait SessionPhases {
    async fn run_phases(&mut self, username: &str, password: &str) -> Result<Vec<TrendRecord>>;

    fn mark_failed(&mut self);

    async fn teardown(&mut self);
}

/// Drive the phase chain, then tear the session down exactly once,
/// success or failure.
async fn run_to_completion<S: SessionPhases + Send>(
    session: &mut S,
    username: &str,
    password: &str,
) -> Result<Vec<TrendRecord>> {
    let outcome = session.run_phases(username, password).await;
    if outcome.is_err() {
        session.mark_failed();
    }
    session.teardown().await;
    outcome
}

/// Exclusive owner of one browser process, from launch to teardown.
///
/// [`scrape`](Self::scrape) consumes the driver and tears the browser down
/// on every exit path; teardown failures are logged and suppressed, never
/// surfaced over a scrape failure.
pub struct SessionDriver {
    browser: Option<Browser>,
    handler_task: JoinHandle<()>,
    config: SessionConfig,
    state: SessionState,
    source_label: String,
    // The extension temp dir must outlive the browser process.
    _proxy_extension: Option<ProxyAuthExtension>,
}

impl SessionDriver {
    /// Launch a hardened browser, optionally routed through an
    /// authenticated proxy. A proxy whose auth bundle cannot be built is
    /// dropped entirely and the session continues unproxied.
    pub async fn launch(config: SessionConfig, proxy: Option<&ProxyConfig>) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .disable_default_args()
            .args(LAUNCH_ARGS.iter().copied());

        if !config.headless {
            builder = builder.with_head();
        }

        let mut proxy_extension = None;
        let mut source_label = "local".to_string();
        if let Some(proxy) = proxy {
            match ProxyAuthExtension::build(proxy) {
                Ok(extension) => {
                    builder = builder
                        .arg(format!("--proxy-server={}", proxy.server()))
                        .extension(extension.path().display().to_string());
                    source_label = proxy.host.clone();
                    proxy_extension = Some(extension);
                }
                Err(e) => {
                    warn!(error = %e, "degraded mode: continuing with a direct connection");
                }
            }
        }

        let browser_config = builder.build().map_err(|e| {
            TrendwatchError::session(Phase::Launch, format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            TrendwatchError::session_with(
                Phase::Launch,
                "failed to launch browser (is Chrome or Chromium on PATH?)",
                e,
            )
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!(
            proxied = proxy_extension.is_some(),
            headless = config.headless,
            "browser session launched"
        );

        Ok(Self {
            browser: Some(browser),
            handler_task,
            config,
            state: SessionState::Launched,
            source_label,
            _proxy_extension: proxy_extension,
        })
    }

    /// Run the full lifecycle: authenticate, wait for the trending panel,
    /// extract, then tear down. Teardown runs whether or not any phase
    /// failed. Returns the extracted records and the source label.
    pub async fn scrape(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<(Vec<TrendRecord>, String)> {
        let trends = run_to_completion(&mut self, username, password).await?;
        Ok((trends, self.source_label))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    async fn drive(&mut self, username: &str, password: &str) -> Result<Vec<TrendRecord>> {
        let page = {
            let browser = self.browser.as_ref().ok_or_else(|| {
                TrendwatchError::session(Phase::Launch, "browser already torn down")
            })?;
            browser.new_page("about:blank").await.map_err(|e| {
                TrendwatchError::session_with(Phase::Launch, "failed to open page", e)
            })?
        };

        // Must be installed before navigation so detection scripts on the
        // login page never see the flag.
        page.execute(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await
            .map_err(|e| {
                TrendwatchError::session_with(Phase::Launch, "failed to install stealth patch", e)
            })?;

        page.goto(self.config.login_url.clone()).await.map_err(|e| {
            TrendwatchError::session_with(Phase::Authenticate, "failed to open login page", e)
        })?;

        let username_input = self
            .wait_for_element(
                &page,
                &Locator::attribute("name", "text"),
                self.config.login_timeout(),
                Phase::Authenticate,
                "username input",
            )
            .await?;
        submit_text(&username_input, username, "username input").await?;

        let password_input = self
            .wait_for_element(
                &page,
                &Locator::attribute("name", "password"),
                self.config.login_timeout(),
                Phase::Authenticate,
                "password input",
            )
            .await?;
        submit_text(&password_input, password, "password input").await?;
        self.state = SessionState::Authenticated;
        debug!("authenticated");

        self.wait_for_element(
            &page,
            &Locator::aria_label(&self.config.panel_label),
            self.config.content_timeout(),
            Phase::ContentWait,
            "trending panel",
        )
        .await?;
        self.state = SessionState::ContentReady;
        debug!("trending panel rendered");

        let extractor = TrendExtractor::new(&self.config.panel_label);
        let raw: serde_json::Value = page
            .evaluate(extractor.collection_script())
            .await
            .map_err(|e| {
                TrendwatchError::session_with(Phase::Extract, "collection script failed", e)
            })?
            .into_value()
            .map_err(|e| {
                TrendwatchError::session_with(
                    Phase::Extract,
                    "collection script returned an unreadable payload",
                    e,
                )
            })?;

        let trends = extractor.extract(&raw);
        self.state = SessionState::Extracted;
        info!(count = trends.len(), "trend extraction complete");
        Ok(trends)
    }

    /// Poll for an element until the deadline. Every wait in the session
    /// goes through here, so no phase can block unbounded.
    async fn wait_for_element(
        &self,
        page: &Page,
        locator: &Locator,
        timeout: Duration,
        phase: Phase,
        target: &str,
    ) -> Result<Element> {
        let Some(selector) = locator.css() else {
            return Err(TrendwatchError::session(
                phase,
                format!("locator for {target} is not DOM-addressable"),
            ));
        };

        debug!(%target, %selector, "waiting for element");
        let deadline = Instant::now() + timeout;
        loop {
            match page.find_element(&selector).await {
                Ok(element) => return Ok(element),
                Err(_) if Instant::now() < deadline => {
                    sleep(self.config.poll_interval()).await;
                }
                Err(_) => {
                    return Err(TrendwatchError::Timeout {
                        phase,
                        target: target.to_string(),
                        waited_secs: timeout.as_secs(),
                    });
                }
            }
        }
    }
}

#[async_trait]
impl SessionPhases for SessionDriver {
    async fn run_phases(&mut self, username: &str, password: &str) -> Result<Vec<TrendRecord>> {
        self.drive(username, password).await
    }

    fn mark_failed(&mut self) {
        self.state = SessionState::Failed;
    }

    /// Terminate the browser process. The browser handle is taken out, so
    /// a second call is a no-op; errors are logged and swallowed so they
    /// never mask the scrape outcome.
    async fn teardown(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };

        if let Err(e) = browser.close().await {
            warn!(error = %e, "browser did not close cleanly");
        }
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "failed to reap browser process");
        }
        self.handler_task.abort();

        if self.state != SessionState::Failed {
            self.state = SessionState::Closed;
        }
        debug!("browser session torn down");
    }
}

async fn submit_text(element: &Element, value: &str, target: &str) -> Result<()> {
    element.click().await.map_err(|e| {
        TrendwatchError::session_with(Phase::Authenticate, format!("failed to focus {target}"), e)
    })?;
    element.type_str(value).await.map_err(|e| {
        TrendwatchError::session_with(Phase::Authenticate, format!("failed to fill {target}"), e)
    })?;
    element.press_key("Enter").await.map_err(|e| {
        TrendwatchError::session_with(Phase::Authenticate, format!("failed to submit {target}"), e)
    })?;
    Ok(())
}
