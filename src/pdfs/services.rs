use tracing::{debug, info};
use uuid::Uuid;

use super::repo::{self, Pdf};
use crate::{
    auth::repo::User,
    error::{AppError, AppResult},
    state::AppState,
};

fn external(message: &'static str) -> impl Fn(anyhow::Error) -> AppError {
    move |e| {
        tracing::error!(error = %e, "{message}");
        AppError::External {
            message: message.to_string(),
            detail: format!("{e:#}"),
        }
    }
}

/// Path ids that are not UUIDs cannot name a document.
pub fn parse_pdf_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("PDF not found".into()))
}

/// The owner's documents, newest first.
pub async fn list(state: &AppState, owner_id: Uuid) -> AppResult<Vec<Pdf>> {
    let on_err = external("Error fetching PDFs");
    if User::find_by_id(&state.db, owner_id)
        .await
        .map_err(&on_err)?
        .is_none()
    {
        return Err(AppError::NotFound("User not found".into()));
    }
    let pdfs = repo::list_for_user(&state.db, owner_id)
        .await
        .map_err(&on_err)?;
    debug!(%owner_id, count = pdfs.len(), "pdfs listed");
    Ok(pdfs)
}

/// Lookup by id only; the caller's identity is not checked against ownership.
pub async fn get_by_id(state: &AppState, pdf_id: Uuid) -> AppResult<Pdf> {
    repo::find_by_id(&state.db, pdf_id)
        .await
        .map_err(external("Error fetching PDF"))?
        .ok_or_else(|| AppError::NotFound("PDF not found".into()))
}

/// Deletes the document, then drops it from `owner_id`'s set when given.
/// A missing or wrong owner does not stop the delete.
pub async fn delete(state: &AppState, pdf_id: Uuid, owner_id: Option<Uuid>) -> AppResult<()> {
    let on_err = external("Error deleting PDF");
    let Some(pdf) = repo::delete_by_id(&state.db, pdf_id)
        .await
        .map_err(&on_err)?
    else {
        return Err(AppError::NotFound("PDF not found".into()));
    };

    if let Some(owner_id) = owner_id {
        let removed = repo::remove_from_user(&state.db, owner_id, pdf_id)
            .await
            .map_err(&on_err)?;
        debug!(%owner_id, %pdf_id, removed, "pdf reference removed");
    }

    info!(pdf_id = %pdf.id, "pdf deleted");
    Ok(())
}
