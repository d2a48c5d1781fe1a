// decision_core/src/capture/browser.rs

use crate::capture::Viewport;
use async_trait::async_trait;
use playwright::api::{Browser, BrowserContext, DocumentLoadState, Page};
use playwright::Playwright;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;

const DOMCONTENTLOADED_BUDGET: Duration = Duration::from_secs(60);
const FULL_LOAD_BUDGET: Duration = Duration::from_secs(60);
const COMMIT_BUDGET: Duration = Duration::from_secs(15);
const ATF_SCREENSHOT_BUDGET: Duration = Duration::from_secs(30);
const FULL_PAGE_SCREENSHOT_BUDGET: Duration = Duration::from_secs(60);

/// Internal driver faults; converted to machine-stable tags at the capture
/// boundary via `tag()`.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("navigation did not reach domcontentloaded in time")]
    TimeoutDomContentLoaded,
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("screenshot timed out")]
    ScreenshotTimeout,
    #[error("browser engine crashed: {0}")]
    EngineCrash(String),
}

impl BrowserError {
    pub fn tag(&self) -> &'static str {
        match self {
            BrowserError::TimeoutDomContentLoaded => "timeout_domcontentloaded",
            BrowserError::Navigation(_) => "navigation_error",
            BrowserError::ScreenshotTimeout => "screenshot_timeout",
            BrowserError::EngineCrash(_) => "engine_crash",
        }
    }
}

/// One rendered viewport worth of page data.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub screenshot: Vec<u8>,
    pub body_text: String,
    pub final_url: String,
}

/// # NDOC
/// component: `capture::browser`
/// purpose: Mockable seam over the headless engine (one render = one
///          isolated browser context, released on every exit path).
/// invariants:
///   - `render` never panics across the boundary; engine faults come back
///     as `BrowserError`.
#[async_trait]
pub trait BrowserRunner: Send + Sync {
    async fn render(
        &self,
        url: &str,
        viewport: Viewport,
        full_page: bool,
    ) -> Result<RenderedPage, BrowserError>;
}

// Analytics beacon hosts and the heavy video-embed CDNs, null-routed at the
// engine so their requests die before leaving the process.
const NULL_ROUTED_HOSTS: [&str; 9] = [
    "www.google-analytics.com",
    "www.googletagmanager.com",
    "connect.facebook.net",
    "snap.licdn.com",
    "static.hotjar.com",
    "www.youtube.com",
    "player.vimeo.com",
    "fast.wistia.net",
    "cdn.jwplayer.com",
];

// Chromium flags: block video/media, web fonts and analytics so renders stay
// fast and deterministic. Remote fonts are skipped entirely (system fallbacks
// render in their place); media playback requires a gesture headless never
// sends; the host rules cover the beacon and embed traffic.
fn launch_args() -> Vec<String> {
    let host_rules = NULL_ROUTED_HOSTS
        .iter()
        .map(|host| format!("MAP {} 127.0.0.1", host))
        .collect::<Vec<_>>()
        .join(",");

    vec![
        "--mute-audio".to_string(),
        "--autoplay-policy=user-gesture-required".to_string(),
        "--disable-remote-fonts".to_string(),
        "--disable-background-networking".to_string(),
        "--disable-component-update".to_string(),
        format!("--host-rules={}", host_rules),
    ]
}

struct WarmBrowser {
    // Held to keep the driver process alive for the browser's lifetime.
    _playwright: Playwright,
    browser: Browser,
}

/// Concrete runner over the playwright crate. One warm browser instance is
/// shared across requests; launch and relaunch are serialized by the mutex.
pub struct PlaywrightRunner {
    warm: Mutex<Option<WarmBrowser>>,
}

impl PlaywrightRunner {
    pub fn new() -> Self {
        PlaywrightRunner {
            warm: Mutex::new(None),
        }
    }

    async fn launch() -> Result<WarmBrowser, BrowserError> {
        let playwright = Playwright::initialize()
            .await
            .map_err(|e| BrowserError::EngineCrash(format!("playwright init: {:?}", e)))?;
        playwright
            .prepare()
            .map_err(|e| BrowserError::EngineCrash(format!("browser install: {:?}", e)))?;

        let browser = playwright
            .chromium()
            .launcher()
            .headless(true)
            .args(&launch_args())
            .launch()
            .await
            .map_err(|e| BrowserError::EngineCrash(format!("launch: {:?}", e)))?;

        Ok(WarmBrowser {
            _playwright: playwright,
            browser,
        })
    }

    /// Returns a fresh context from the warm browser, launching (or lazily
    /// relaunching after a crash) as needed.
    async fn acquire_context(&self, viewport: Viewport) -> Result<BrowserContext, BrowserError> {
        let mut guard = self.warm.lock().await;

        if guard.is_none() {
            *guard = Some(Self::launch().await?);
        }

        let warm = guard.as_ref().expect("warm browser present after launch");
        let (width, height) = viewport.dimensions();
        let built = warm
            .browser
            .context_builder()
            .viewport(Some(playwright::api::Viewport {
                width: width as i32,
                height: height as i32,
            }))
            .user_agent(viewport.user_agent())
            .build()
            .await;

        match built {
            Ok(context) => Ok(context),
            Err(e) => {
                // A dead engine fails context creation; drop the handle so the
                // next render relaunches.
                *guard = None;
                Err(BrowserError::EngineCrash(format!("context: {:?}", e)))
            }
        }
    }

    async fn navigate(page: &Page, url: &str) -> Result<(), BrowserError> {
        // Cascaded load strategy: domcontentloaded, then full load, then a
        // minimal commit as last resort.
        let dcl = timeout(
            DOMCONTENTLOADED_BUDGET,
            page.goto_builder(url)
                .wait_until(DocumentLoadState::DomContentLoaded)
                .timeout(DOMCONTENTLOADED_BUDGET.as_millis() as f64)
                .goto(),
        )
        .await;

        match dcl {
            Ok(Ok(_)) => return Ok(()),
            Ok(Err(e)) => {
                let message = format!("{:?}", e);
                if !message.to_lowercase().contains("timeout") {
                    return Err(BrowserError::Navigation(message));
                }
            }
            Err(_) => {}
        }

        let full = timeout(
            FULL_LOAD_BUDGET,
            page.goto_builder(url)
                .wait_until(DocumentLoadState::Load)
                .timeout(FULL_LOAD_BUDGET.as_millis() as f64)
                .goto(),
        )
        .await;

        if matches!(full, Ok(Ok(_))) {
            return Ok(());
        }

        let commit = timeout(
            COMMIT_BUDGET,
            page.goto_builder(url)
                .timeout(COMMIT_BUDGET.as_millis() as f64)
                .goto(),
        )
        .await;

        match commit {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::Navigation(format!("{:?}", e))),
            Err(_) => Err(BrowserError::TimeoutDomContentLoaded),
        }
    }

    async fn screenshot(page: &Page, full_page: bool) -> Result<Vec<u8>, BrowserError> {
        // Above-the-fold first; full-page is opt-in with ATF fallback.
        let atf = timeout(
            ATF_SCREENSHOT_BUDGET,
            page.screenshot_builder().full_page(false).screenshot(),
        )
        .await;

        let atf_bytes = match atf {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(BrowserError::EngineCrash(format!("screenshot: {:?}", e))),
            Err(_) => return Err(BrowserError::ScreenshotTimeout),
        };

        if !full_page {
            return Ok(atf_bytes);
        }

        match timeout(
            FULL_PAGE_SCREENSHOT_BUDGET,
            page.screenshot_builder().full_page(true).screenshot(),
        )
        .await
        {
            Ok(Ok(bytes)) => Ok(bytes),
            // Full-page failure falls back to the ATF result already in hand.
            _ => Ok(atf_bytes),
        }
    }
}

#[async_trait]
impl BrowserRunner for PlaywrightRunner {
    async fn render(
        &self,
        url: &str,
        viewport: Viewport,
        full_page: bool,
    ) -> Result<RenderedPage, BrowserError> {
        let context = self.acquire_context(viewport).await?;

        // The context must be released on every exit path.
        let result = async {
            let page = context
                .new_page()
                .await
                .map_err(|e| BrowserError::EngineCrash(format!("new_page: {:?}", e)))?;

            Self::navigate(&page, url).await?;

            let body_text: String = page
                .eval("() => document.body ? document.body.innerText : ''")
                .await
                .unwrap_or_default();
            let final_url = page.url().unwrap_or_else(|_| url.to_string());

            let screenshot = Self::screenshot(&page, full_page).await?;

            Ok(RenderedPage {
                screenshot,
                body_text,
                final_url,
            })
        }
        .await;

        let _ = context.close().await;

        if let Err(BrowserError::EngineCrash(_)) = &result {
            *self.warm.lock().await = None;
        }

        result
    }
}
