use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use orgsync_core::{AppError, AppResult};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::warn;

/// Runs `fetch` for every item on at most `worker_count` concurrent workers.
///
/// Workers drain one shared queue that is filled and closed up front. A
/// failing item never stops its siblings, but once every worker has exited
/// any failure turns the whole call into an error: partial results are
/// never returned. Result order is unspecified.
pub async fn parallel_map<T, R, F, Fut>(
    items: Vec<T>,
    worker_count: usize,
    fetch: F,
) -> AppResult<Vec<(T, R)>>
where
    T: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = AppResult<R>> + Send + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let (sender, receiver) = mpsc::unbounded_channel();
    for item in items {
        sender
            .send(item)
            .map_err(|_| AppError::Internal("fetch queue closed unexpectedly".to_owned()))?;
    }
    drop(sender);

    let receiver = Arc::new(Mutex::new(receiver));
    let fetch = Arc::new(fetch);
    let failures = Arc::new(AtomicUsize::new(0));

    let mut workers = JoinSet::new();
    for _ in 0..worker_count.clamp(1, total) {
        let receiver = Arc::clone(&receiver);
        let fetch = Arc::clone(&fetch);
        let failures = Arc::clone(&failures);

        workers.spawn(async move {
            let mut fetched = Vec::new();
            loop {
                let next = receiver.lock().await.recv().await;
                let Some(item) = next else {
                    break;
                };

                match fetch(item.clone()).await {
                    Ok(result) => fetched.push((item, result)),
                    Err(error) => {
                        failures.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %error, "fetch failed");
                    }
                }
            }
            fetched
        });
    }

    let mut results = Vec::with_capacity(total);
    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(fetched) => results.extend(fetched),
            Err(error) => warn!(error = %error, "fetch worker did not finish"),
        }
    }

    let failed = failures
        .load(Ordering::Relaxed)
        .max(total.saturating_sub(results.len()));
    if failed > 0 {
        return Err(AppError::Internal(format!(
            "could not fetch {failed} of {total} items"
        )));
    }

    Ok(results)
}
