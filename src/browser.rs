use anyhow::{Context, Result};
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One headless Chrome instance with a single tab, owned for the duration of
/// a collector run. Dropping the session shuts the browser down on every exit
/// path, so no Chrome processes leak.
pub struct BrowserSession {
    // Keeps the Chrome process alive while the tab is in use.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl BrowserSession {
    pub fn launch() -> Result<Self> {
        info!("launching headless Chrome");
        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build browser launch options")?;
        let browser = Browser::new(options).context("Failed to launch Chrome")?;
        let tab = browser.new_tab().context("Failed to open a browser tab")?;
        Ok(Self { _browser: browser, tab })
    }

    /// Navigate to `url` and return the rendered HTML once `ready_selector`
    /// has appeared in the DOM. The wait is an explicit readiness condition;
    /// a timeout is not an error here, since a results page past the end of
    /// pagination legitimately renders no listing cards.
    pub fn rendered_html(
        &self,
        url: &str,
        ready_selector: &str,
        timeout: Duration,
    ) -> Result<String> {
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        self.tab
            .wait_until_navigated()
            .context("Navigation did not complete")?;

        if self
            .tab
            .wait_for_element_with_custom_timeout(ready_selector, timeout)
            .is_err()
        {
            debug!(selector = ready_selector, "readiness selector never appeared");
        }

        self.dismiss_consent();

        self.tab.get_content().context("Failed to read page content")
    }

    /// Click or hide the cookie-consent overlay via injected JS. The site
    /// uses Didomi; the DOM queries mirror its markup. Failure is ignored,
    /// the overlay only obscures the page visually.
    fn dismiss_consent(&self) {
        let script = r#"
            (function () {
                if (window.Didomi) {
                    window.Didomi.setUserAgreeToAll();
                    return true;
                }
                var button = document.querySelector(
                    'button.didomi-button-highlight, #didomi-notice-agree-button, button[id*="accept"]'
                );
                if (button) { button.click(); return true; }
                var popup = document.getElementById('didomi-popup');
                if (popup) { popup.style.display = 'none'; return true; }
                return false;
            })()
        "#;
        if let Ok(result) = self.tab.evaluate(script, false) {
            if result.value == Some(serde_json::Value::Bool(true)) {
                debug!("dismissed cookie consent overlay");
            }
        }
    }

    /// Write a screenshot and raw HTML snapshot of the current page into
    /// `dir`, named by `label` so a failure can be correlated back to the
    /// page that produced it.
    pub fn save_failure_artifacts(&self, dir: &Path, label: &str) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create artifacts dir {}", dir.display()))?;

        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .context("Failed to capture screenshot")?;
        let png_path = dir.join(format!("{}.png", label));
        std::fs::write(&png_path, png)
            .with_context(|| format!("Failed to write {}", png_path.display()))?;

        let html = self.tab.get_content().unwrap_or_default();
        let html_path = dir.join(format!("{}.html", label));
        std::fs::write(&html_path, html)
            .with_context(|| format!("Failed to write {}", html_path.display()))?;

        info!(
            screenshot = %png_path.display(),
            snapshot = %html_path.display(),
            "saved debug artifacts"
        );
        Ok(())
    }
}
