//! Upstream error types.

/// A non-success response from an upstream service.
#[derive(Debug, thiserror::Error)]
#[error("{service} returned {status}: {body}")]
pub struct UpstreamError {
    /// Which service answered.
    pub service: &'static str,
    /// HTTP status code.
    pub status: u16,
    /// Response body text, as far as it could be read.
    pub body: String,
}

impl UpstreamError {
    /// Whether the upstream reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Turn a non-success response into an [`UpstreamError`].
pub(crate) async fn check(
    service: &'static str,
    response: reqwest::Response,
) -> color_eyre::eyre::Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(service, status = status.as_u16(), body = %body, "upstream call failed");

    Err(UpstreamError {
        service,
        status: status.as_u16(),
        body,
    }
    .into())
}
