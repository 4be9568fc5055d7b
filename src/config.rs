use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Configuration for a flipbook extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipbookConfig {
    /// Page holding the login form
    pub login_url: String,

    /// Viewer page of the document to extract
    pub book_url: String,

    /// Directory that receives the page images
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Consecutive rounds without a new page before the run stops
    #[serde(default = "default_max_no_new_rounds")]
    pub max_no_new_rounds: u32,

    /// Seconds to wait after opening the book, before the first round
    #[serde(default = "default_initial_wait_secs")]
    pub initial_wait_secs: f64,

    /// Seconds to wait after advancing the viewer
    #[serde(default = "default_click_wait_secs")]
    pub click_wait_secs: f64,

    /// Run the browser without a visible window
    #[serde(default)]
    pub headless: bool,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Upper bound on the wait for the post-login navigation
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,

    /// Environment variable holding the login name
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    #[serde(default)]
    pub selectors: Selectors,
}

/// CSS selectors for the login form and the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub email: String,
    pub password: String,
    pub submit: String,
    /// Matches every rendered page image (left and right pages in a spread)
    pub page_image: String,
    /// The viewer's "next page" control
    pub next: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            email: "input[name=email]".to_string(),
            password: "input[name=password]".to_string(),
            submit: "button[type=submit]".to_string(),
            page_image: "#flipbook img".to_string(),
            next: "#nextBtn".to_string(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("pages")
}

fn default_max_no_new_rounds() -> u32 {
    6
}

fn default_initial_wait_secs() -> f64 {
    25.0
}

fn default_click_wait_secs() -> f64 {
    0.6
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_navigation_timeout_secs() -> u64 {
    30
}

fn default_username_env() -> String {
    "FLIPBOOK_USERNAME".to_string()
}

fn default_password_env() -> String {
    "FLIPBOOK_PASSWORD".to_string()
}

impl FlipbookConfig {
    /// Create a new configuration with default values
    pub fn new(login_url: &str, book_url: &str) -> Self {
        Self {
            login_url: login_url.to_string(),
            book_url: book_url.to_string(),
            output_dir: default_output_dir(),
            max_no_new_rounds: default_max_no_new_rounds(),
            initial_wait_secs: default_initial_wait_secs(),
            click_wait_secs: default_click_wait_secs(),
            headless: false,
            webdriver_url: default_webdriver_url(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
            username_env: default_username_env(),
            password_env: default_password_env(),
            selectors: Selectors::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let read_err = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(read_err)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(read_err)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply the WEBDRIVER_URL environment override, if set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides resolved through an arbitrary variable lookup.
    /// Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(webdriver_url) = lookup("WEBDRIVER_URL").filter(|url| !url.is_empty()) {
            self.webdriver_url = webdriver_url;
        }
        self
    }

    /// Reject values the run cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("login_url", &self.login_url),
            ("book_url", &self.book_url),
            ("webdriver_url", &self.webdriver_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{name} '{value}': {e}")))?;
        }

        if self.max_no_new_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_no_new_rounds must be at least 1".to_string(),
            ));
        }

        self.initial_wait()?;
        self.click_wait()?;

        let s = &self.selectors;
        for (name, selector) in [
            ("email", &s.email),
            ("password", &s.password),
            ("submit", &s.submit),
            ("page_image", &s.page_image),
            ("next", &s.next),
        ] {
            if selector.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("selector '{name}' is empty")));
            }
        }

        Ok(())
    }

    pub fn initial_wait(&self) -> Result<Duration, ConfigError> {
        wait_duration("initial_wait_secs", self.initial_wait_secs)
    }

    pub fn click_wait(&self) -> Result<Duration, ConfigError> {
        wait_duration("click_wait_secs", self.click_wait_secs)
    }

    /// Create the output directory if it does not exist yet
    pub fn ensure_output_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ConfigError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }
}

/// Negative, NaN and out-of-range waits are rejected
fn wait_duration(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be a non-negative number of seconds, got {secs}"
        ))
    })
}

/// Login credentials, read from the environment and never from the config file
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Read the variables named by `username_env` and `password_env`
    pub fn from_env(config: &FlipbookConfig) -> Result<Self, ConfigError> {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(config: &FlipbookConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |var: &str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingCredential {
                    var: var.to_string(),
                })
        };

        Ok(Self {
            username: fetch(&config.username_env)?,
            password: fetch(&config.password_env)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
