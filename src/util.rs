use anyhow::Result;
use std::{future::Future, time::Duration};
use tracing::{error, warn};

/// Run the task produced by `task` forever, starting a fresh one `delay` after
/// each run ends.
pub async fn restart_on_failure<F, Fut>(name: &str, delay: Duration, mut task: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        match task().await {
            Ok(()) => warn!("{} stopped, restarting", name),
            Err(err) => error!("{} failed with {:?}, restarting", name, err),
        }
        tokio::time::sleep(delay).await;
    }
}
