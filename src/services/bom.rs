//! BOM synchronization: reshape Onshape's BOM table into [`Part`] records and
//! keep manufacturing counters across re-imports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::systems::SystemService;
use super::validate_document_url;
use crate::auth::AuthUser;
use crate::entities::system;
use crate::errors::ServiceError;
use crate::models::part::{render_cell, QUANTITY_NOT_AVAILABLE, UNKNOWN};
use crate::models::{BomFilter, Part, PartProgress, Stage};
use crate::onshape::{BomHeader, BomRow, BomTable, CadVendor, Credentials, DocumentRef};

/// Header ids of the semantic columns in one BOM table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ColumnIds {
    name: Option<String>,
    description: Option<String>,
    quantity: Option<String>,
    material: Option<String>,
    material_bom: Option<String>,
    pre_process: Option<String>,
    process1: Option<String>,
    process2: Option<String>,
}

/// Id of the first header titled exactly `name`.
fn find_header_id(headers: &[BomHeader], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|h| h.name.as_deref() == Some(name))
        .and_then(|h| h.id.clone())
}

impl ColumnIds {
    fn resolve(headers: &[BomHeader]) -> Self {
        let find = |name| find_header_id(headers, name);
        let material = find("Material");

        Self {
            name: find("Name"),
            description: find("Description"),
            quantity: find("Quantity").or_else(|| find("QTY")),
            material_bom: find("Bom Material").or_else(|| material.clone()),
            material,
            pre_process: find("Pre Process"),
            process1: find("Process 1"),
            process2: find("Process 2"),
        }
    }
}

/// Text of one cell. Objects such as material records collapse to their
/// `displayName`; anything else that is not a scalar takes `default`.
fn cell_text(values: &Map<String, Value>, id: Option<&str>, default: &str) -> String {
    let Some(value) = id.and_then(|id| values.get(id)) else {
        return default.to_string();
    };

    match value {
        Value::Object(obj) => obj
            .get("displayName")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string()),
        other => render_cell(Some(other)).unwrap_or_else(|| default.to_string()),
    }
}

fn normalize_row(columns: &ColumnIds, row: &BomRow) -> Part {
    let values = &row.header_id_to_value;
    let text = |id: &Option<String>| cell_text(values, id.as_deref(), UNKNOWN);

    Part {
        name: text(&columns.name),
        description: text(&columns.description),
        quantity: cell_text(values, columns.quantity.as_deref(), QUANTITY_NOT_AVAILABLE),
        material: text(&columns.material),
        material_bom: text(&columns.material_bom),
        pre_process: text(&columns.pre_process),
        process1: text(&columns.process1),
        process2: text(&columns.process2),
        part_id: row
            .item_source
            .as_ref()
            .and_then(|s| s.part_id.clone())
            .unwrap_or_default(),
        pre_process_quantity: 0,
        process1_quantity: 0,
        process2_quantity: 0,
    }
}

/// Reshapes a vendor BOM table into part records with zeroed counters.
pub fn normalize_bom(table: &BomTable) -> Vec<Part> {
    let columns = ColumnIds::resolve(&table.headers);
    debug!(?columns, rows = table.rows.len(), "resolved BOM columns");
    table
        .rows
        .iter()
        .map(|row| normalize_row(&columns, row))
        .collect()
}

/// Copies counters from `previous` onto every part of `next` with the same
/// non-empty `partId`. Other parts keep whatever counters they carry.
pub fn carry_forward(previous: &[Part], mut next: Vec<Part>) -> Vec<Part> {
    let mut by_id: HashMap<&str, &Part> = HashMap::new();
    for part in previous.iter().filter(|p| !p.part_id.is_empty()) {
        by_id.entry(part.part_id.as_str()).or_insert(part);
    }

    for part in next.iter_mut().filter(|p| !p.part_id.is_empty()) {
        if let Some(old) = by_id.get(part.part_id.as_str()) {
            part.copy_counters_from(old);
        }
    }
    next
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FetchBomRequest {
    #[validate(length(min = 1), custom = "validate_document_url")]
    pub document_url: String,
    #[validate(length(min = 1))]
    pub access_key: String,
    #[validate(length(min = 1))]
    pub secret_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FetchBomResponse {
    pub bom_data: Vec<Part>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveBomRequest {
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BomQuery {
    /// all, cots, inhouse, pre-process, process1, process2, completed,
    /// in-progress, not-started, or a process name
    pub filter: Option<String>,
}

/// New values for a part's counters. Omitted counters are left alone.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartProgressUpdate {
    #[validate(range(min = 0))]
    pub pre_process_quantity: Option<i64>,
    #[validate(range(min = 0))]
    pub process1_quantity: Option<i64>,
    #[validate(range(min = 0))]
    pub process2_quantity: Option<i64>,
}

impl PartProgressUpdate {
    fn changes(&self) -> Vec<(Stage, u32)> {
        let clamp = |v: i64| u32::try_from(v).unwrap_or(u32::MAX);
        [
            (Stage::PreProcess, self.pre_process_quantity),
            (Stage::Process1, self.process1_quantity),
            (Stage::Process2, self.process2_quantity),
        ]
        .into_iter()
        .filter_map(|(stage, value)| value.map(|v| (stage, clamp(v))))
        .collect()
    }
}

/// A part plus its derived progress.
#[derive(Debug, Serialize, ToSchema)]
pub struct PartView {
    #[serde(flatten)]
    pub part: Part,
    pub progress: PartProgress,
}

impl From<Part> for PartView {
    fn from(part: Part) -> Self {
        let progress = part.progress();
        Self { part, progress }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BomSnapshot {
    pub system_id: Uuid,
    pub bom_updated_at: Option<DateTime<Utc>>,
    /// Parts in the snapshot before filtering
    pub total: usize,
    pub parts: Vec<PartView>,
}

impl BomSnapshot {
    fn build(system: &system::Model, parts: Vec<Part>, filter: &BomFilter) -> Self {
        let total = parts.len();
        Self {
            system_id: system.id,
            bom_updated_at: system.bom_updated_at,
            total,
            parts: filter.apply(parts).into_iter().map(PartView::from).collect(),
        }
    }
}

/// Credentials and assembly reference stored on a system.
pub(crate) fn onshape_access(
    system: &system::Model,
) -> Result<(Credentials, DocumentRef), ServiceError> {
    let not_configured = || {
        ServiceError::BadRequest(
            "Onshape API credentials or assembly URL not configured for this system".to_string(),
        )
    };

    if !system.has_credentials() {
        return Err(not_configured());
    }
    let (Some(access_key), Some(secret_key), Some(assembly_url)) = (
        system.access_key.as_deref(),
        system.secret_key.as_deref(),
        system.assembly_url.as_deref(),
    ) else {
        return Err(not_configured());
    };

    Ok((
        Credentials::new(access_key.trim(), secret_key.trim()),
        DocumentRef::parse(assembly_url)?,
    ))
}

#[derive(Clone)]
pub struct BomService {
    systems: SystemService,
    vendor: Arc<dyn CadVendor>,
}

impl BomService {
    pub fn new(systems: SystemService, vendor: Arc<dyn CadVendor>) -> Self {
        Self { systems, vendor }
    }

    /// Fetches and normalizes a BOM without touching stored data.
    #[instrument(skip(self, request))]
    pub async fn fetch_bom(&self, request: FetchBomRequest) -> Result<Vec<Part>, ServiceError> {
        request.validate()?;
        let document = DocumentRef::parse(&request.document_url)?;
        let credentials = Credentials::new(request.access_key, request.secret_key);

        let table = self.vendor.get_bom(&credentials, &document).await?;
        Ok(normalize_bom(&table))
    }

    /// Re-reads the system's assembly BOM and stores it, keeping counters of
    /// parts that are still present.
    #[instrument(skip(self, user))]
    pub async fn import_bom(
        &self,
        user: &AuthUser,
        system_id: Uuid,
    ) -> Result<BomSnapshot, ServiceError> {
        let (system, _) = self.systems.load(user, system_id).await?;
        let (credentials, assembly) = onshape_access(&system)?;

        let table = self.vendor.get_bom(&credentials, &assembly).await?;
        let merged = carry_forward(&system.parts(), normalize_bom(&table));
        let carried = merged.iter().filter(|p| !p.has_no_progress()).count();

        let updated = self.systems.repository().replace_bom(system, &merged).await?;
        info!(%system_id, parts = merged.len(), carried, "BOM imported");
        Ok(BomSnapshot::build(&updated, merged, &BomFilter::All))
    }

    pub async fn get_bom(
        &self,
        user: &AuthUser,
        system_id: Uuid,
        filter: &BomFilter,
    ) -> Result<BomSnapshot, ServiceError> {
        let (system, _) = self.systems.load(user, system_id).await?;
        let parts = system.parts();
        Ok(BomSnapshot::build(&system, parts, filter))
    }

    /// Replaces the snapshot with a client-edited list.
    #[instrument(skip(self, user, parts), fields(parts = parts.len()))]
    pub async fn save_bom(
        &self,
        user: &AuthUser,
        system_id: Uuid,
        parts: Vec<Part>,
    ) -> Result<BomSnapshot, ServiceError> {
        let (system, _) = self.systems.load(user, system_id).await?;

        let parts: Vec<Part> = parts
            .into_iter()
            .map(|mut part| {
                let counters: Vec<(Stage, u32)> =
                    Stage::ALL.iter().map(|s| (*s, part.counter(*s))).collect();
                part.set_counters(&counters);
                part
            })
            .collect();

        let updated = self.systems.repository().replace_bom(system, &parts).await?;
        Ok(BomSnapshot::build(&updated, parts, &BomFilter::All))
    }

    #[instrument(skip(self, user))]
    pub async fn clear_bom(
        &self,
        user: &AuthUser,
        system_id: Uuid,
    ) -> Result<BomSnapshot, ServiceError> {
        let (system, _) = self.systems.load(user, system_id).await?;
        let updated = self.systems.repository().replace_bom(system, &[]).await?;
        Ok(BomSnapshot::build(&updated, Vec::new(), &BomFilter::All))
    }

    /// Sets counters on every part with this `partId`, clamped to its quantity.
    #[instrument(skip(self, user, update))]
    pub async fn update_part_progress(
        &self,
        user: &AuthUser,
        system_id: Uuid,
        part_id: &str,
        update: PartProgressUpdate,
    ) -> Result<PartView, ServiceError> {
        update.validate()?;
        let changes = update.changes();
        if changes.is_empty() {
            return Err(ServiceError::ValidationError(
                "at least one counter must be provided".to_string(),
            ));
        }

        let (system, _) = self.systems.load(user, system_id).await?;
        let mut parts = system.parts();

        let mut updated_part = None;
        for part in parts.iter_mut().filter(|p| !p.part_id.is_empty() && p.part_id == part_id) {
            part.set_counters(&changes);
            updated_part.get_or_insert_with(|| part.clone());
        }
        let part = updated_part.ok_or_else(|| {
            ServiceError::NotFound(format!("Part {} not found in system {}", part_id, system_id))
        })?;

        self.systems.repository().replace_bom(system, &parts).await?;
        Ok(part.into())
    }
}
