use orgsync_core::{AppError, AppResult};
use tokio_util::sync::CancellationToken;

/// Stops the current pass once cancellation was requested.
pub(crate) fn checkpoint(cancel: &CancellationToken) -> AppResult<()> {
    if cancel.is_cancelled() {
        return Err(AppError::Interrupted);
    }

    Ok(())
}
