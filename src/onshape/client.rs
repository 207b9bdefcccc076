use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use super::{
    truncate_body, BomTable, CadVendor, Credentials, DocumentRef, ElementKind, ExportedFile,
    PartSummary, TranslationRequest, TranslationStatus, VendorError,
};
use crate::config::OnshapeConfig;

const ONSHAPE_V1_JSON: &str = "application/vnd.onshape.v1+json";

/// HTTP client for the Onshape REST API, authenticating with per-system API keys.
#[derive(Debug, Clone)]
pub struct OnshapeClient {
    http: Client,
    base_url: String,
}

impl OnshapeClient {
    pub fn new(config: &OnshapeConfig) -> Result<Self, VendorError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("frcbom-api/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, credentials: &Credentials, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .basic_auth(&credentials.access_key, Some(&credentials.secret_key))
    }

    /// Passes successful responses through; everything else becomes a status error.
    async fn ensure_success(response: Response) -> Result<Response, VendorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Onshape request rejected");
        Err(VendorError::Status {
            status: status.as_u16(),
            body: truncate_body(&body),
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, VendorError> {
        let response = Self::ensure_success(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| VendorError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CadVendor for OnshapeClient {
    #[instrument(skip(self, credentials), fields(element = %assembly))]
    async fn get_bom(
        &self,
        credentials: &Credentials,
        assembly: &DocumentRef,
    ) -> Result<BomTable, VendorError> {
        let path = format!("/api/assemblies/{}/bom", assembly.api_path());
        debug!(%path, "fetching BOM");

        Self::json(
            self.get(credentials, &path)
                .query(&[("indented", "false")])
                .header(header::ACCEPT, ONSHAPE_V1_JSON),
        )
        .await
    }

    #[instrument(skip(self, credentials), fields(element = %element))]
    async fn list_parts(
        &self,
        credentials: &Credentials,
        element: &DocumentRef,
    ) -> Result<Vec<PartSummary>, VendorError> {
        let path = format!("/api/parts/{}", element.api_path());
        debug!(%path, "listing parts");

        Self::json(
            self.get(credentials, &path)
                .header(header::ACCEPT, ONSHAPE_V1_JSON),
        )
        .await
    }

    #[instrument(skip(self, credentials, request), fields(element = %element, format = %request.format_name))]
    async fn start_translation(
        &self,
        credentials: &Credentials,
        element: &DocumentRef,
        kind: ElementKind,
        request: &TranslationRequest,
    ) -> Result<String, VendorError> {
        let path = format!(
            "/api/{}/{}/translations",
            kind.as_segment(),
            element.api_path()
        );
        debug!(%path, "requesting translation");

        let status: TranslationStatus = Self::json(
            self.http
                .post(self.url(&path))
                .basic_auth(&credentials.access_key, Some(&credentials.secret_key))
                .header(header::ACCEPT, "application/json")
                .json(request),
        )
        .await?;

        status
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                VendorError::InvalidResponse("translation response carried no id".to_string())
            })
    }

    async fn translation_status(
        &self,
        credentials: &Credentials,
        translation_id: &str,
    ) -> Result<TranslationStatus, VendorError> {
        let path = format!("/api/translations/{translation_id}");

        Self::json(
            self.get(credentials, &path)
                .header(header::ACCEPT, "application/json"),
        )
        .await
    }

    #[instrument(skip(self, credentials))]
    async fn download_external_data(
        &self,
        credentials: &Credentials,
        document_id: &str,
        external_id: &str,
    ) -> Result<ExportedFile, VendorError> {
        let path = format!("/api/documents/d/{document_id}/externaldata/{external_id}");
        let response = Self::ensure_success(self.get(credentials, &path).send().await?).await?;

        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(%url, "export download resolved");

        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other);

        Ok(ExportedFile {
            url,
            content_type,
            body: Box::pin(body),
        })
    }
}
