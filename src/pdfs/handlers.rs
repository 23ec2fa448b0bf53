use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{CreatePdfRequest, MessageResponse, PdfEnvelope, UpdatePdfRequest},
    repo::Pdf,
    services,
};
use crate::{
    auth::AuthUser,
    conversion::{self, ConversionRequest, Target},
    error::{AppError, AppResult},
    extract::ApiJson,
    state::AppState,
};

pub fn pdf_routes() -> Router<AppState> {
    Router::new()
        .route("/pdfs", get(list_pdfs).post(create_pdf))
        .route(
            "/pdfs/:id",
            get(get_pdf).patch(update_pdf).delete(delete_pdf),
        )
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn create_pdf(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ApiJson(payload): ApiJson<CreatePdfRequest>,
) -> AppResult<(StatusCode, Json<PdfEnvelope>)> {
    let (Some(pdf_link), Some(pdf_name)) = (non_blank(payload.pdf_link), non_blank(payload.pdf_name))
    else {
        warn!("create pdf without link or name");
        return Err(AppError::Validation(
            "pdf_link and pdf_name are required".into(),
        ));
    };

    let req = ConversionRequest {
        pdf_link,
        owner_id: user_id,
        target: Target::Create { pdf_name },
    };
    let pdf = conversion::convert(&state, req)
        .await
        .map_err(|e| AppError::from_conversion(e, "Error processing PDF"))?;

    Ok((
        StatusCode::CREATED,
        Json(PdfEnvelope {
            message: "PDF processed",
            pdf,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_pdfs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Pdf>>> {
    Ok(Json(services::list(&state, user_id).await?))
}

#[instrument(skip(state))]
pub async fn get_pdf(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Pdf>> {
    let pdf_id = services::parse_pdf_id(&id)?;
    Ok(Json(services::get_by_id(&state, pdf_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_pdf(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdatePdfRequest>,
) -> AppResult<Json<PdfEnvelope>> {
    let Some(pdf_link) = non_blank(payload.pdf_link) else {
        warn!("update pdf without link");
        return Err(AppError::Validation(
            "pdf_link is required to update the PDF".into(),
        ));
    };
    let pdf_id = services::parse_pdf_id(&id)?;

    let req = ConversionRequest {
        pdf_link,
        owner_id: user_id,
        target: Target::Update {
            pdf_id,
            pdf_name: non_blank(payload.pdf_name),
        },
    };
    let pdf = conversion::convert(&state, req)
        .await
        .map_err(|e| AppError::from_conversion(e, "Error updating PDF"))?;

    Ok(Json(PdfEnvelope {
        message: "PDF updated successfully",
        pdf,
    }))
}

#[instrument(skip(state))]
pub async fn delete_pdf(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let pdf_id = services::parse_pdf_id(&id)?;
    services::delete(&state, pdf_id, Some(user_id)).await?;
    Ok(Json(MessageResponse {
        message: "PDF deleted successfully",
    }))
}
