//! Live page source: Kindle Cloud Reader driven through Chromium.
//!
//! The reader only ever shows one page, so this source is *navigable*: the
//! driver captures the current page as a PNG, hands it to OCR, then presses
//! the right arrow to turn the page. Login and book selection happen by
//! hand in the visible browser window; the session just polls the URL
//! until the reader is open.

use crate::error::TranslateError;
use crate::pipeline::source::{PageContent, PageSource};
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

pub const KINDLE_WEB_URL: &str = "https://read.amazon.com";

const POLL_INTERVAL: Duration = Duration::from_secs(2);

const END_OF_BOOK_MARKERS: &[&str] = &[
    "end of book",
    "the end",
    "end of sample",
    "end of this sample",
    "last page",
    "keep reading",
    "rate this book",
    "you've reached the end",
];

/// True when the next-page control is disabled or an end-of-book overlay
/// is visible.
const END_CONTROLS_JS: &str = r#"(() => {
    const next = document.querySelector(
        "[aria-label='Next Page'], .nextPageButton, #kindleReader_pageTurnAreaRight");
    if (next && (next.hasAttribute('disabled') || next.getAttribute('aria-disabled') === 'true')) {
        return true;
    }
    const overlay = document.querySelector(
        "[class*='endOfBook'], [class*='end-of-book'], [data-testid='end-of-book']");
    return !!(overlay && overlay.offsetParent !== null);
})()"#;

/// Browser and timing settings for a reader session.
#[derive(Debug, Clone)]
pub struct KindleOptions {
    pub url: String,
    pub headless: bool,
    pub screenshot_dir: PathBuf,
    pub viewport: (u32, u32),
    /// Wait after a page turn for the animation to finish.
    pub page_turn_delay: Duration,
    /// Wait before each capture so late-loading glyphs render.
    pub settle_delay: Duration,
    /// Wait after the reader opens before the first capture.
    pub open_delay: Duration,
}

impl Default for KindleOptions {
    fn default() -> Self {
        Self {
            url: KINDLE_WEB_URL.to_string(),
            headless: false,
            screenshot_dir: PathBuf::from("screenshots"),
            viewport: (1280, 900),
            page_turn_delay: Duration::from_millis(800),
            settle_delay: Duration::from_millis(500),
            open_delay: Duration::from_secs(3),
        }
    }
}

/// A running Chromium window pointed at the Kindle web reader.
pub struct KindleSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    options: KindleOptions,
}

impl KindleSession {
    /// Launch the browser and open the reader's landing page.
    pub async fn launch(options: KindleOptions) -> Result<Self, TranslateError> {
        tokio::fs::create_dir_all(&options.screenshot_dir)
            .await
            .map_err(|e| TranslateError::OutputWriteFailed {
                path: options.screenshot_dir.clone(),
                source: e,
            })?;

        let viewport = Viewport {
            width: options.viewport.0,
            height: options.viewport.1,
            ..Default::default()
        };
        let mut builder = BrowserConfig::builder()
            .viewport(viewport)
            .arg("--disable-blink-features=AutomationControlled");
        if !options.headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(TranslateError::Browser)?;

        info!("Launching browser...");
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| TranslateError::Browser(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        info!("Navigating to {}", options.url);
        let page = browser
            .new_page(options.url.as_str())
            .await
            .map_err(|e| TranslateError::Browser(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            handler,
            options,
        })
    }

    async fn current_url(&self) -> String {
        match self.page.url().await {
            Ok(Some(url)) => url,
            _ => String::new(),
        }
    }

    /// Poll until the library or a book is showing. `false` on timeout.
    pub async fn wait_for_login(&self, timeout: Duration) -> bool {
        info!(
            "Please log in to your Amazon account in the browser window (waiting up to {}s)...",
            timeout.as_secs()
        );
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if is_signed_in_url(&self.current_url().await) {
                info!("Login detected.");
                return true;
            }
            sleep(POLL_INTERVAL).await;
        }
        error!("Login timeout reached");
        false
    }

    /// Poll until a book is open in the reader. `false` on timeout.
    pub async fn wait_for_book_selection(&self, timeout: Duration) -> bool {
        info!(
            "Please open a book from your library (waiting up to {}s)...",
            timeout.as_secs()
        );
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if is_reader_url(&self.current_url().await) {
                info!("Book opened.");
                sleep(self.options.open_delay).await;
                return true;
            }
            sleep(POLL_INTERVAL).await;
        }
        error!("Book selection timeout reached");
        false
    }

    /// Screenshot the visible page to `page_NNNN.png`.
    pub async fn capture_page(&self, page_number: usize) -> Result<PathBuf, TranslateError> {
        sleep(self.options.settle_delay).await;
        let path = self.options.screenshot_dir.join(screenshot_name(page_number));
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page
            .save_screenshot(params, &path)
            .await
            .map_err(|e| TranslateError::PageUnavailable {
                page: page_number,
                detail: format!("screenshot failed: {e}"),
            })?;
        debug!("Screenshot saved: {}", path.display());
        Ok(path)
    }

    /// Turn to the next page. `false` if the key press could not be delivered.
    pub async fn next_page(&self) -> bool {
        let pressed = match self.page.find_element("body").await {
            Ok(body) => body.press_key("ArrowRight").await.map(|_| ()),
            Err(e) => Err(e),
        };
        match pressed {
            Ok(()) => {
                sleep(self.options.page_turn_delay).await;
                true
            }
            Err(e) => {
                warn!("Failed to turn the page: {}", e);
                false
            }
        }
    }

    /// Heuristic end-of-book check: disabled next control, a visible
    /// end-of-book overlay, or end-of-book wording in the page.
    pub async fn is_last_page(&self) -> bool {
        let controls: bool = match self.page.evaluate(END_CONTROLS_JS).await {
            Ok(v) => v.into_value().unwrap_or(false),
            Err(e) => {
                debug!("End-of-book control check failed: {}", e);
                false
            }
        };
        if controls {
            info!("Last page detected: reader controls");
            return true;
        }

        match self.page.content().await {
            Ok(html) => match end_of_book_marker(&html) {
                Some(marker) => {
                    info!("Last page detected: found '{}' in page", marker);
                    true
                }
                None => false,
            },
            Err(e) => {
                debug!("Could not read page content: {}", e);
                false
            }
        }
    }

    /// Close the browser and stop the CDP handler.
    pub async fn close(mut self) {
        info!("Closing browser...");
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {}", e);
        }
        self.handler.abort();
    }
}

#[async_trait]
impl PageSource for KindleSession {
    fn page_count(&self) -> Option<usize> {
        None
    }

    fn is_navigable(&self) -> bool {
        true
    }

    async fn fetch(&mut self, page_number: usize) -> Result<PageContent, TranslateError> {
        self.capture_page(page_number).await.map(PageContent::Image)
    }

    async fn advance(&mut self) -> bool {
        self.next_page().await
    }

    async fn is_terminal(&mut self) -> bool {
        self.is_last_page().await
    }
}

fn screenshot_name(page_number: usize) -> String {
    format!("page_{:04}.png", page_number)
}

fn is_signed_in_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("read.amazon.") && (lower.contains("library") || is_reader_url(&lower))
}

fn is_reader_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("/reader") || (lower.contains("read.amazon.") && lower.contains("asin="))
}

fn end_of_book_marker(html: &str) -> Option<&'static str> {
    let lower = html.to_lowercase();
    END_OF_BOOK_MARKERS.iter().copied().find(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screenshot_names_are_zero_padded() {
        assert_eq!(screenshot_name(7), "page_0007.png");
        assert_eq!(screenshot_name(12345), "page_12345.png");
    }

    #[test]
    fn login_detection_by_url() {
        assert!(is_signed_in_url("https://read.amazon.com/kindle-library"));
        assert!(is_signed_in_url("https://read.amazon.com/?asin=B00TEST"));
        assert!(!is_signed_in_url("https://www.amazon.com/ap/signin?openid=x"));
        assert!(!is_signed_in_url(""));
    }

    #[test]
    fn reader_detection_by_url() {
        assert!(is_reader_url("https://read.amazon.com/reader?asin=B00TEST"));
        assert!(is_reader_url("https://read.amazon.com/?ASIN=B00TEST"));
        assert!(!is_reader_url("https://read.amazon.com/kindle-library"));
    }

    #[test]
    fn end_markers_are_case_insensitive() {
        assert_eq!(
            end_of_book_marker("<div>You've Reached The End</div>"),
            Some("the end")
        );
        assert_eq!(end_of_book_marker("<p>Chapter 2</p>"), None);
    }
}
