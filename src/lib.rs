pub mod api_contracts;
pub mod auth;
pub mod classifier;
pub mod config;
pub mod config_utils;
pub mod dispatcher;
pub mod object_store;
pub mod publishers;
pub mod run_log;
pub mod types;

#[cfg(test)]
mod test_harness;

use auth::{StaticToken, TokenFileAuthenticator};
use config::RelayConfig;
use dispatcher::{DispatchSettings, Dispatcher};
use object_store::{ObjectStore, R2Store};
use publishers::{SoundCloudPublisher, YouTubePublisher};
use run_log::{RunLogger, RunReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Wire the production collaborators for `config`
pub async fn build_dispatcher(config: &RelayConfig, logger: Arc<RunLogger>) -> Dispatcher {
    let timeout = Duration::from_secs(config.http_timeout_secs);

    let store: Arc<dyn ObjectStore> = Arc::new(R2Store::connect(&config.r2).await);

    let youtube_auth = Arc::new(TokenFileAuthenticator::new(
        config.youtube.token_file.clone(),
        config.youtube.scopes.clone(),
    ));
    let video = Arc::new(YouTubePublisher::from_config(&config.youtube, youtube_auth, timeout));

    let soundcloud_auth = Arc::new(StaticToken::new(config.soundcloud.access_token.clone()));
    let audio = Arc::new(SoundCloudPublisher::from_config(&config.soundcloud, soundcloud_auth, timeout));

    Dispatcher::new(store, video, audio, DispatchSettings::from_config(config), logger)
}

fn save_report(report: &RunReport, reports_dir: Option<&PathBuf>) {
    let Some(dir) = reports_dir else { return };
    match report.save_to_dir(dir) {
        Ok(path) => tracing::debug!("Run report saved to {}", path.display()),
        Err(e) => tracing::warn!("Could not save run report: {}", e),
    }
}

/// Load configuration, then run once or keep polling when an interval is set
pub async fn run() -> Result<(), String> {
    let config = RelayConfig::load()?;

    // Fall back to stdout-only logging when there is no home directory
    let logs_dir = config_utils::get_logs_dir()
        .and_then(|dir| config_utils::ensure_dir(&dir).map(|_| dir))
        .ok();
    let _log_guard = run_log::init_tracing(logs_dir.as_deref())?;

    config.validate()?;
    config_utils::ensure_dir(&config.download_dir)?;

    tracing::info!(
        "review-relay v{} starting (bucket: {})",
        env!("CARGO_PKG_VERSION"),
        config.r2.bucket_name
    );

    let logger = Arc::new(RunLogger::new());
    let dispatcher = build_dispatcher(&config, logger).await;
    let reports_dir = if config.save_run_reports { logs_dir } else { None };

    match config.poll_interval_secs {
        None => {
            let report = dispatcher.run_once().await?;
            save_report(&report, reports_dir.as_ref());
            Ok(())
        }
        Some(secs) => {
            tracing::info!("Watching bucket every {}s (Ctrl+C to stop)", secs);
            tokio::select! {
                _ = dispatcher.watch(Duration::from_secs(secs), None, |report| {
                    save_report(report, reports_dir.as_ref());
                }) => Ok(()),
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutting down");
                    Ok(())
                }
            }
        }
    }
}
