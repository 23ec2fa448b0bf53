use bytes::Bytes;

use super::ConversionError;

/// Downloads the source document from its host.
pub async fn fetch_source(http: &reqwest::Client, url: &str) -> Result<Bytes, ConversionError> {
    let res = http.get(url).send().await.map_err(|e| {
        tracing::error!(error = %e, %url, "fetch source failed");
        ConversionError::Fetch(format!("request to document host failed: {e}"))
    })?;

    let status = res.status();
    if !status.is_success() {
        tracing::error!(%status, %url, "document host returned error");
        return Err(ConversionError::Fetch(format!("document host returned {status}")));
    }

    let bytes = res
        .bytes()
        .await
        .map_err(|e| ConversionError::Fetch(format!("read document body: {e}")))?;
    tracing::debug!(bytes = bytes.len(), "source fetched");
    Ok(bytes)
}
