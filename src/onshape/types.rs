use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat BOM table returned by the assembly BOM endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BomTable {
    #[serde(default)]
    pub headers: Vec<BomHeader>,
    #[serde(default)]
    pub rows: Vec<BomRow>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BomHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BomRow {
    #[serde(rename = "headerIdToValue", default)]
    pub header_id_to_value: Map<String, Value>,
    #[serde(rename = "itemSource", default)]
    pub item_source: Option<ItemSource>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemSource {
    #[serde(rename = "partId", default)]
    pub part_id: Option<String>,
}

/// Entry of the part-studio part listing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PartSummary {
    #[serde(rename = "partId")]
    pub part_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Element types that accept translation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    PartStudio,
    Assembly,
}

impl ElementKind {
    pub fn as_segment(self) -> &'static str {
        match self {
            ElementKind::PartStudio => "partstudios",
            ElementKind::Assembly => "assemblies",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub format_name: String,
    pub part_ids: String,
    pub store_in_document: bool,
    pub link_document_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationStatus {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub request_state: Option<String>,
    #[serde(default)]
    pub result_external_data_ids: Option<Vec<String>>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl TranslationStatus {
    pub fn is_done(&self) -> bool {
        self.request_state.as_deref() == Some("DONE")
    }

    pub fn is_failed(&self) -> bool {
        self.request_state.as_deref() == Some("FAILED")
    }

    pub fn first_result(&self) -> Option<&str> {
        self.result_external_data_ids
            .as_ref()
            .and_then(|ids| ids.first())
            .map(String::as_str)
    }
}
