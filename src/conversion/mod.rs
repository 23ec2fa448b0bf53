//! PDF to narrated audio: fetch, extract, synthesize, upload, persist.
//!
//! Steps run strictly in order and stop at the first failure. Nothing is
//! retried. The document record is written only after the audio upload
//! succeeded; an upload followed by a failed database write leaves the
//! audio object orphaned on the media host.

pub mod extract;
pub mod fetch;
pub mod tts;

#[cfg(test)]
pub(crate) mod fixtures;

use uuid::Uuid;

use crate::pdfs::repo::{self, Pdf};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("no extractable text found in PDF")]
    NoExtractableText,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("audio upload failed: {0}")]
    Upload(String),

    /// The document to update does not exist.
    #[error("PDF not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(String),
}

/// What the pipeline writes once the audio is stored.
#[derive(Debug, Clone)]
pub enum Target {
    Create { pdf_name: String },
    Update { pdf_id: Uuid, pdf_name: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub pdf_link: String,
    pub owner_id: Uuid,
    pub target: Target,
}

/// Runs the whole pipeline for one request.
#[tracing::instrument(skip(state, req), fields(owner_id = %req.owner_id, pdf_link = %req.pdf_link))]
pub async fn convert(state: &AppState, req: ConversionRequest) -> Result<Pdf, ConversionError> {
    let audio_link = prepare_audio(state, &req.pdf_link).await?;

    match req.target {
        Target::Create { pdf_name } => {
            let pdf = repo::create_for_owner(
                &state.db,
                req.owner_id,
                &req.pdf_link,
                &audio_link,
                &pdf_name,
            )
            .await
            .map_err(|e| db_error(e, &audio_link))?;
            tracing::info!(pdf_id = %pdf.id, "pdf created");
            Ok(pdf)
        }
        Target::Update { pdf_id, pdf_name } => {
            let updated = repo::update_links(
                &state.db,
                pdf_id,
                &req.pdf_link,
                &audio_link,
                pdf_name.as_deref(),
            )
            .await
            .map_err(|e| db_error(e, &audio_link))?;
            match updated {
                Some(pdf) => {
                    tracing::info!(pdf_id = %pdf.id, "pdf updated");
                    Ok(pdf)
                }
                None => {
                    tracing::warn!(%pdf_id, %audio_link, "update target missing; uploaded audio orphaned");
                    Err(ConversionError::NotFound)
                }
            }
        }
    }
}

/// Steps 1-4: fetch the source, extract its text, synthesize speech and
/// upload it. Returns the persistent audio URL.
pub async fn prepare_audio(state: &AppState, pdf_link: &str) -> Result<String, ConversionError> {
    let pdf_bytes = fetch::fetch_source(&state.http, pdf_link).await?;
    let text = extract::extract_text(pdf_bytes).await?;
    let audio = state.tts.synthesize(&text).await?;

    let format = state.tts.response_format();
    let key = format!(
        "{}/{}.{}",
        state.config.media.audio_folder.trim_matches('/'),
        Uuid::new_v4(),
        format
    );
    let len = audio.len();
    state
        .storage
        .put_object(&key, audio, tts::audio_content_type(format))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, %key, "audio upload failed");
            ConversionError::Upload(format!("{e:#}"))
        })?;

    let url = state.storage.object_url(&key);
    tracing::debug!(%key, bytes = len, "audio uploaded");
    Ok(url)
}

fn db_error(e: anyhow::Error, audio_link: &str) -> ConversionError {
    tracing::error!(error = %e, %audio_link, "pdf write failed; uploaded audio orphaned");
    ConversionError::Database(format!("{e:#}"))
}
