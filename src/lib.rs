pub mod collector;
pub mod config;
pub mod error;
pub mod persister;
pub mod results;
pub mod session;
pub mod utils;
pub mod viewer;

// Re-export commonly used types for convenience
pub use collector::{CollectorConfig, PageCollector};
pub use config::{Credentials, FlipbookConfig};
pub use error::FlipbookError;
pub use persister::ImagePersister;
pub use results::{CollectionSummary, StopReason};
pub use session::WebDriverSession;

/// Log in, open the book and collect its pages into `config.output_dir`.
///
/// The config is validated before the browser is touched. Login failures
/// are reported as [`FlipbookError::Login`]; the caller owns the session and
/// is responsible for closing it either way.
pub async fn extract(
    session: &mut WebDriverSession,
    config: &FlipbookConfig,
    credentials: &Credentials,
) -> Result<CollectionSummary, FlipbookError> {
    config.validate()?;
    let initial_wait = config.initial_wait()?;
    let collector_config = CollectorConfig::try_from(config)?;

    session
        .login(credentials)
        .await
        .map_err(FlipbookError::Login)?;

    session.open_book().await?;

    ::log::info!(
        "Waiting {:.1}s for the viewer to load",
        config.initial_wait_secs
    );
    tokio::time::sleep(initial_wait).await;

    let collector = PageCollector::new(
        session,
        ImagePersister::new(&config.output_dir),
        collector_config,
    );
    Ok(collector.run().await?)
}
