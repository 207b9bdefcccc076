//! Onshape REST client and the seam services use to reach it.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::errors::ServiceError;

pub mod client;
pub mod document;
pub mod types;

pub use client::OnshapeClient;
pub use document::{DocumentRef, WvmKind};
pub use types::{
    BomHeader, BomRow, BomTable, ElementKind, ItemSource, PartSummary, TranslationRequest,
    TranslationStatus,
};

/// Longest slice of a vendor response body carried into error messages.
pub const ERROR_BODY_LIMIT: usize = 500;

/// API key pair a system stores for its Onshape account.
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// An exported file on its way back to the caller.
pub struct ExportedFile {
    /// URL the download resolved to after redirects
    pub url: String,
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, std::io::Error>>,
}

#[derive(Debug, Error)]
pub enum VendorError {
    #[error("Onshape returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Onshape request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected Onshape response: {0}")]
    InvalidResponse(String),

    #[error("Invalid Onshape URL: {0}")]
    InvalidUrl(String),
}

impl From<VendorError> for ServiceError {
    fn from(err: VendorError) -> Self {
        match err {
            VendorError::InvalidUrl(msg) => ServiceError::BadRequest(msg),
            other => ServiceError::ExternalServiceError(other.to_string()),
        }
    }
}

/// Truncates a response body on a char boundary for inclusion in errors.
pub fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Operations the BOM and export services need from a CAD platform.
#[async_trait]
pub trait CadVendor: Send + Sync {
    /// Flattened BOM of an assembly element.
    async fn get_bom(
        &self,
        credentials: &Credentials,
        assembly: &DocumentRef,
    ) -> Result<BomTable, VendorError>;

    /// Parts defined in a part studio element.
    async fn list_parts(
        &self,
        credentials: &Credentials,
        element: &DocumentRef,
    ) -> Result<Vec<PartSummary>, VendorError>;

    /// Submits a translation job and returns its id.
    async fn start_translation(
        &self,
        credentials: &Credentials,
        element: &DocumentRef,
        kind: ElementKind,
        request: &TranslationRequest,
    ) -> Result<String, VendorError>;

    async fn translation_status(
        &self,
        credentials: &Credentials,
        translation_id: &str,
    ) -> Result<TranslationStatus, VendorError>;

    /// Downloads a translation result, following redirects.
    async fn download_external_data(
        &self,
        credentials: &Credentials,
        document_id: &str,
        external_id: &str,
    ) -> Result<ExportedFile, VendorError>;
}
