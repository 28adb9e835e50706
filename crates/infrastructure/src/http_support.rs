use orgsync_core::{AppError, AppResult};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

/// Sends a request, mapping transport failures to `Internal`.
pub(crate) async fn send(request: reqwest::RequestBuilder, context: &str) -> AppResult<Response> {
    request
        .send()
        .await
        .map_err(|error| AppError::Internal(format!("failed to call {context}: {error}")))
}

/// Rejects non-success responses with an error category matching the status.
pub(crate) async fn ensure_success(response: Response, context: &str) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_owned());
    let message = format!("{context} returned status {}: {body}", status.as_u16());

    Err(match status {
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => AppError::Conflict(message),
        _ => AppError::Internal(message),
    })
}

/// Sends a request and decodes a successful JSON response body.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    context: &str,
) -> AppResult<T> {
    let response = ensure_success(send(request, context).await?, context).await?;

    response.json::<T>().await.map_err(|error| {
        AppError::Internal(format!("failed to parse {context} response body: {error}"))
    })
}

/// Sends a request whose response body is irrelevant.
pub(crate) async fn send_empty(request: reqwest::RequestBuilder, context: &str) -> AppResult<()> {
    ensure_success(send(request, context).await?, context).await?;
    Ok(())
}
