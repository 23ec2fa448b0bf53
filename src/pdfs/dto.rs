use serde::{Deserialize, Serialize};

use super::repo::Pdf;

#[derive(Debug, Default, Deserialize)]
pub struct CreatePdfRequest {
    #[serde(default)]
    pub pdf_link: Option<String>,
    #[serde(default)]
    pub pdf_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePdfRequest {
    #[serde(default)]
    pub pdf_link: Option<String>,
    #[serde(default)]
    pub pdf_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PdfEnvelope {
    pub message: &'static str,
    pub pdf: Pdf,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
