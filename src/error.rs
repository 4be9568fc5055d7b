use std::path::PathBuf;
use thiserror::Error;

/// Problems with the run configuration. Fatal: the run never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    /// A credential environment variable is unset or empty.
    #[error("Environment variable {var} is not set.\nExport it before running, e.g. `export {var}=...`")]
    MissingCredential { var: String },

    #[error("Failed to create output directory '{path}': {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures talking to the WebDriver server.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to start WebDriver session: {0}")]
    Connect(#[from] fantoccini::error::NewSessionError),

    #[error("WebDriver command failed: {0}")]
    Command(#[from] fantoccini::error::CmdError),

    #[error("Page did not navigate away from {url} within {secs}s")]
    NavigationTimeout { url: String, secs: u64 },
}

/// Reasons a single inline image could not be saved. Never leaves the persister.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("source is not an inline image: {preview}...")]
    NotInlineImage { preview: String },

    #[error("unexpected inline image layout: {preview}...")]
    Malformed { preview: String },

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Image(#[from] image::ImageError),
}

/// Top-level failure of an extraction run.
#[derive(Debug, Error)]
pub enum FlipbookError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Login failed: {0}")]
    Login(#[source] BrowserError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}
