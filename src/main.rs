use clap::Parser;
use flipbook_pages::error::ConfigError;
use flipbook_pages::{CollectionSummary, Credentials, FlipbookConfig, FlipbookError, WebDriverSession};
use std::process::ExitCode;
use tokio::sync::watch;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut interrupted = listen_for_interrupt();

    let (config, credentials) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Note: a WebDriver server (e.g. chromedriver or geckodriver) must be running.");
    println!(
        "Set WEBDRIVER_URL or --webdriver-url if not using {}",
        config.webdriver_url
    );

    let mut session =
        match interruptible(WebDriverSession::connect(&config), &mut interrupted).await {
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                ::log::error!("{}", e);
                return ExitCode::FAILURE;
            }
            None => {
                ::log::info!("Interrupted before the browser session started, stopping");
                return ExitCode::SUCCESS;
            }
        };

    let outcome = interruptible(
        flipbook_pages::extract(&mut session, &config, &credentials),
        &mut interrupted,
    )
    .await;

    let code = match outcome {
        Some(Ok(summary)) => {
            report(&summary, args.summary_json);
            if !config.headless {
                inspect(&mut interrupted).await;
            }
            ExitCode::SUCCESS
        }
        Some(Err(e @ FlipbookError::Login(_))) => {
            ::log::error!("{}", e);
            println!("Total unique pages saved: 0");
            ExitCode::FAILURE
        }
        Some(Err(e)) => {
            ::log::error!("Unexpected error: {}", e);
            ExitCode::FAILURE
        }
        None => {
            println!();
            ::log::info!("Interrupted, stopping");
            ExitCode::SUCCESS
        }
    };

    session.close().await;
    code
}

/// Load the config, read credentials and create the output directory
fn prepare(args: &Args) -> Result<(FlipbookConfig, Credentials), ConfigError> {
    let config = args.load_config()?;
    let credentials = Credentials::from_env(&config)?;
    config.ensure_output_dir()?;
    Ok((config, credentials))
}

fn report(summary: &CollectionSummary, as_json: bool) {
    let output_dir = std::fs::canonicalize(&summary.output_dir)
        .unwrap_or_else(|_| summary.output_dir.clone());

    ::log::info!(
        "Collection finished after {} rounds ({:?})",
        summary.rounds,
        summary.stop_reason
    );
    println!(
        "Collection finished. Total unique pages saved: {}",
        summary.total_saved
    );
    println!("Pages are in: {}", output_dir.display());

    if as_json {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => ::log::error!("Failed to serialize summary: {}", e),
        }
    }
}

/// Flips to `true` once the operator presses Ctrl-C. The sender is dropped
/// if the signal handler cannot be installed.
fn listen_for_interrupt() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send(true);
            }
            Err(e) => ::log::warn!("Failed to listen for Ctrl-C: {}", e),
        }
    });
    rx
}

/// Run `work` to completion, or return `None` as soon as Ctrl-C is pressed
async fn interruptible<F: Future>(
    work: F,
    interrupted: &mut watch::Receiver<bool>,
) -> Option<F::Output> {
    tokio::select! {
        output = work => Some(output),
        Ok(_) = interrupted.wait_for(|stop| *stop) => None,
    }
}

/// Keep the browser open until the operator presses Ctrl-C
async fn inspect(interrupted: &mut watch::Receiver<bool>) {
    println!("Browser left open for inspection. Press Ctrl-C to close it and exit.");
    if interrupted.wait_for(|stop| *stop).await.is_err() {
        ::log::warn!("Ctrl-C is unavailable, closing the browser now");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_interrupt_cancels_pending_work() {
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let outcome = interruptible(std::future::pending::<()>(), &mut rx).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_interrupt_during_work() {
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = tx.send(true);
        });

        let outcome = interruptible(std::future::pending::<()>(), &mut rx).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_work_completes_without_interrupt() {
        let (_tx, mut rx) = watch::channel(false);
        assert_eq!(interruptible(async { 7 }, &mut rx).await, Some(7));
    }

    #[tokio::test]
    async fn test_missing_signal_handler_does_not_cancel_work() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let work = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "done"
        };
        assert_eq!(interruptible(work, &mut rx).await, Some("done"));
    }
}
