use bytes::Bytes;

use super::ConversionError;

/// Pulls plain text out of PDF bytes on the blocking pool.
///
/// Returns trimmed text. Empty input and documents with no text layer
/// (blank or image-only) give [`ConversionError::NoExtractableText`].
pub async fn extract_text(pdf: Bytes) -> Result<String, ConversionError> {
    if pdf.is_empty() {
        return Err(ConversionError::NoExtractableText);
    }

    let len = pdf.len();
    let parsed = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| {
            // pdf-extract panics on some malformed inputs
            tracing::error!(error = %e, "pdf parser aborted");
            ConversionError::Extraction(format!("pdf parser aborted: {e}"))
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "pdf parse failed");
            ConversionError::Extraction(format!("failed to extract text: {e}"))
        })?;

    let text = parsed.trim();
    if text.is_empty() {
        return Err(ConversionError::NoExtractableText);
    }
    tracing::debug!(pdf_bytes = len, text_len = text.len(), "text extracted");
    Ok(text.to_string())
}
