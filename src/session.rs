use crate::config::{Credentials, FlipbookConfig};
use crate::error::BrowserError;
use crate::viewer::Viewer;
use async_trait::async_trait;
use fantoccini::actions::{InputSource, KeyAction, KeyActions};
use fantoccini::key::Key;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Map, Value, json};
use std::time::Duration;

const NAVIGATION_POLL: Duration = Duration::from_millis(250);

/// A WebDriver session driving the flipbook site
pub struct WebDriverSession {
    client: Client,
    config: FlipbookConfig,
}

impl WebDriverSession {
    /// Open a new browser session on the configured WebDriver server
    pub async fn connect(config: &FlipbookConfig) -> Result<Self, BrowserError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(capabilities(config.headless));

        let client = builder.connect(&config.webdriver_url).await?;
        ::log::info!(
            "Connected to WebDriver at {} (headless={})",
            config.webdriver_url,
            config.headless
        );

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Fill in the login form and wait for the site to navigate away from it
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), BrowserError> {
        let selectors = &self.config.selectors;

        ::log::info!("Opening login page: {}", self.config.login_url);
        self.client.goto(&self.config.login_url).await?;

        self.fill(&selectors.email, &credentials.username).await?;
        self.fill(&selectors.password, &credentials.password).await?;
        ::log::info!("Filled in login form");

        let before = self.client.current_url().await?;
        self.client
            .find(Locator::Css(&selectors.submit))
            .await?
            .click()
            .await?;

        self.wait_for_navigation(before.as_str()).await?;
        ::log::info!("Logged in");
        Ok(())
    }

    /// Navigate to the document viewer
    pub async fn open_book(&mut self) -> Result<(), BrowserError> {
        ::log::info!("Opening book: {}", self.config.book_url);
        self.client.goto(&self.config.book_url).await?;
        Ok(())
    }

    /// End the WebDriver session, closing the browser window
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let field = self.client.find(Locator::Css(selector)).await?;
        field.clear().await?;
        field.send_keys(value).await?;
        Ok(())
    }

    async fn wait_for_navigation(&self, from: &str) -> Result<(), BrowserError> {
        let secs = self.config.navigation_timeout_secs;
        let wait = async {
            loop {
                let current = self.client.current_url().await?;
                if current.as_str() != from {
                    ::log::debug!("Navigated to {}", current);
                    return Ok::<(), BrowserError>(());
                }
                tokio::time::sleep(NAVIGATION_POLL).await;
            }
        };

        match tokio::time::timeout(Duration::from_secs(secs), wait).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: from.to_string(),
                secs,
            }),
        }
    }
}

#[async_trait]
impl Viewer for WebDriverSession {
    async fn image_sources(&mut self, selector: &str) -> Result<Vec<Option<String>>, BrowserError> {
        let elements = self.client.find_all(Locator::Css(selector)).await?;
        let mut sources = Vec::with_capacity(elements.len());
        for element in elements {
            sources.push(element.attr("src").await?);
        }
        Ok(sources)
    }

    async fn count(&mut self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.client.find_all(Locator::Css(selector)).await?.len())
    }

    async fn click(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.client
            .find(Locator::Css(selector))
            .await?
            .click()
            .await?;
        Ok(())
    }

    async fn press_next_key(&mut self) -> Result<(), BrowserError> {
        self.client.perform_actions(key_press(Key::Right)).await?;
        self.client.release_actions().await?;
        Ok(())
    }
}

/// A keyboard press-and-release, dispatched to the page rather than an element
fn key_press(key: Key) -> KeyActions {
    let value: char = key.into();
    KeyActions::new("keyboard".to_string())
        .then(KeyAction::Down { value })
        .then(KeyAction::Up { value })
}

/// Browser capabilities for Chrome and Firefox drivers
fn capabilities(headless: bool) -> Map<String, Value> {
    let mut caps = Map::new();
    if headless {
        caps.insert(
            "goog:chromeOptions".to_string(),
            json!({ "args": ["--headless=new", "--disable-gpu"] }),
        );
        caps.insert(
            "moz:firefoxOptions".to_string(),
            json!({ "args": ["-headless"] }),
        );
    }
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_capabilities() {
        let caps = capabilities(true);
        assert_eq!(caps["goog:chromeOptions"]["args"][0], "--headless=new");
        assert_eq!(caps["moz:firefoxOptions"]["args"][0], "-headless");
    }

    #[test]
    fn test_key_press_is_down_then_up() {
        let actions = format!("{:?}", key_press(Key::Right));
        let down = actions.find("Down").expect("key down action");
        let up = actions.find("Up").expect("key up action");
        assert!(down < up, "{actions}");
    }

    #[test]
    fn test_visible_browser_has_no_extra_capabilities() {
        assert!(capabilities(false).is_empty());
    }
}
