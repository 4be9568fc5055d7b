use clap::Parser;
use flipbook_pages::FlipbookConfig;
use flipbook_pages::error::ConfigError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flipbook-pages")]
#[command(about = "Saves the page images of a web flipbook viewer")]
#[command(version)]
pub struct Args {
    /// JSON config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Login page URL (required without --config)
    #[arg(long)]
    pub login_url: Option<String>,

    /// Book viewer URL (required without --config)
    #[arg(long)]
    pub book_url: Option<String>,

    /// Directory to write page images to
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Consecutive rounds without a new page before stopping
    #[arg(long)]
    pub max_no_new_rounds: Option<u32>,

    /// Run the browser without a window
    #[arg(long)]
    pub headless: bool,

    /// WebDriver server URL
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub summary_json: bool,
}

impl Args {
    /// Build the run configuration from the config file and flag overrides
    pub fn load_config(&self) -> Result<FlipbookConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => FlipbookConfig::from_file(path)?,
            None => match (&self.login_url, &self.book_url) {
                (Some(login_url), Some(book_url)) => FlipbookConfig::new(login_url, book_url),
                _ => {
                    return Err(ConfigError::Invalid(
                        "--login-url and --book-url are required without --config".to_string(),
                    ));
                }
            },
        }
        .with_env_overrides();

        if let Some(login_url) = &self.login_url {
            config.login_url = login_url.clone();
        }
        if let Some(book_url) = &self.book_url {
            config.book_url = book_url.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(rounds) = self.max_no_new_rounds {
            config.max_no_new_rounds = rounds;
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(webdriver_url) = &self.webdriver_url {
            config.webdriver_url = webdriver_url.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
