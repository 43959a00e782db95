//! Background persistence of click events.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;

const RETRY_ATTEMPTS: usize = 3;

fn backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(10)
        .factor(5)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(RETRY_ATTEMPTS)
}

/// Neither write is idempotent. Only failures raised before the statement
/// was sent are repeated; anything later may already be committed.
fn should_retry(e: &AppError) -> bool {
    e.is_pool_timeout()
}

/// Drains the click channel until every sender is dropped.
///
/// Each event is handled on its own task; at most `concurrency` run at once.
/// Returns after in-flight events have finished.
pub async fn run_click_worker<S, L>(
    mut rx: mpsc::Receiver<ClickEvent>,
    stats_repository: Arc<S>,
    link_repository: Arc<L>,
    concurrency: usize,
) where
    S: StatsRepository + 'static,
    L: LinkRepository + 'static,
{
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    while let Some(event) = rx.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };

        let stats_repository = stats_repository.clone();
        let link_repository = link_repository.clone();

        tokio::spawn(async move {
            persist_click(stats_repository.as_ref(), link_repository.as_ref(), event).await;
            drop(permit);
        });
    }

    // Wait for in-flight tasks.
    let _ = semaphore.acquire_many(concurrency as u32).await;
    info!("Click worker stopped");
}

/// Stores one click event and bumps the link's counter.
///
/// Both writes are retried independently while the pool is exhausted. A
/// failure after dispatch is logged and dropped, so a click may go uncounted
/// but is never counted twice. Returns `true` only if both succeeded.
pub async fn persist_click<S, L>(stats_repository: &S, link_repository: &L, event: ClickEvent) -> bool
where
    S: StatsRepository + ?Sized,
    L: LinkRepository + ?Sized,
{
    let link_id = event.link_id;
    let clicked_at = event.timestamp;

    let recorded = RetryIf::spawn(
        backoff(),
        || stats_repository.record_click(event.clone().into()),
        should_retry,
    )
    .await;

    let recorded = match recorded {
        Ok(click) => {
            debug!(link_id, click_id = click.id, "Click recorded");
            true
        }
        Err(e) => {
            error!(link_id, error = %e, "Failed to record click");
            metrics::counter!("smartlink_click_persist_failures_total", "stage" => "record")
                .increment(1);
            false
        }
    };

    let incremented = RetryIf::spawn(
        backoff(),
        || link_repository.increment_clicks(link_id, clicked_at),
        should_retry,
    )
    .await;

    let incremented = match incremented {
        Ok(true) => true,
        Ok(false) => {
            warn!(link_id, "Click counter not updated, link is gone");
            false
        }
        Err(e) => {
            error!(link_id, error = %e, "Failed to increment click counter");
            metrics::counter!("smartlink_click_persist_failures_total", "stage" => "increment")
                .increment(1);
            false
        }
    };

    if recorded && incremented {
        metrics::counter!("smartlink_clicks_persisted_total").increment(1);
    }

    recorded && incremented
}
