//! Part records cached on a system's BOM snapshot.
//!
//! The JSON keys are shared with the web client and the admin dump format,
//! so they keep the column titles users see in Onshape.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::fmt;
use utoipa::ToSchema;

/// Placeholder for any BOM column the assembly does not define.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for a missing quantity column.
pub const QUANTITY_NOT_AVAILABLE: &str = "N/A";

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn quantity_not_available() -> String {
    QUANTITY_NOT_AVAILABLE.to_string()
}

/// One row of a system's BOM plus its manufacturing counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "Part Name": "Bracket",
    "Description": "Unknown",
    "Quantity": "4",
    "Material": "Aluminum 6061",
    "materialBOM": "Aluminum 6061",
    "Pre Process": "Saw",
    "Process 1": "Mill",
    "Process 2": "Unknown",
    "partId": "JHD",
    "preProcessQuantity": 4,
    "process1Quantity": 1,
    "process2Quantity": 0
}))]
pub struct Part {
    #[serde(rename = "Part Name", default = "unknown", deserialize_with = "cell")]
    pub name: String,
    #[serde(rename = "Description", default = "unknown", deserialize_with = "cell")]
    pub description: String,
    #[serde(
        rename = "Quantity",
        default = "quantity_not_available",
        deserialize_with = "quantity_cell"
    )]
    pub quantity: String,
    #[serde(rename = "Material", default = "unknown", deserialize_with = "cell")]
    pub material: String,
    #[serde(rename = "materialBOM", default = "unknown", deserialize_with = "cell")]
    pub material_bom: String,
    #[serde(rename = "Pre Process", default = "unknown", deserialize_with = "cell")]
    pub pre_process: String,
    #[serde(rename = "Process 1", default = "unknown", deserialize_with = "cell")]
    pub process1: String,
    #[serde(rename = "Process 2", default = "unknown", deserialize_with = "cell")]
    pub process2: String,
    #[serde(rename = "partId", default)]
    pub part_id: String,
    #[serde(rename = "preProcessQuantity", default, deserialize_with = "counter")]
    pub pre_process_quantity: u32,
    #[serde(rename = "process1Quantity", default, deserialize_with = "counter")]
    pub process1_quantity: u32,
    #[serde(rename = "process2Quantity", default, deserialize_with = "counter")]
    pub process2_quantity: u32,
}

impl Default for Part {
    fn default() -> Self {
        Self {
            name: unknown(),
            description: unknown(),
            quantity: quantity_not_available(),
            material: unknown(),
            material_bom: unknown(),
            pre_process: unknown(),
            process1: unknown(),
            process2: unknown(),
            part_id: String::new(),
            pre_process_quantity: 0,
            process1_quantity: 0,
            process2_quantity: 0,
        }
    }
}

/// Manufacturing stage, in the order parts move through the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Stage {
    #[serde(rename = "pre-process")]
    PreProcess,
    #[serde(rename = "process1")]
    Process1,
    #[serde(rename = "process2")]
    Process2,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::PreProcess, Stage::Process1, Stage::Process2];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PartStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// Derived view of how far a part has progressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartProgress {
    pub status: PartStatus,
    /// `None` when the quantity column is not numeric
    pub quantity: Option<u32>,
    pub current_process: Option<Stage>,
    pub remaining: Option<u32>,
}

/// Returns true for a stage tag that names no actual process.
pub fn is_unset(tag: &str) -> bool {
    let tag = tag.trim();
    tag.is_empty() || tag.eq_ignore_ascii_case(UNKNOWN)
}

impl Part {
    pub fn tag(&self, stage: Stage) -> &str {
        match stage {
            Stage::PreProcess => &self.pre_process,
            Stage::Process1 => &self.process1,
            Stage::Process2 => &self.process2,
        }
    }

    pub fn counter(&self, stage: Stage) -> u32 {
        match stage {
            Stage::PreProcess => self.pre_process_quantity,
            Stage::Process1 => self.process1_quantity,
            Stage::Process2 => self.process2_quantity,
        }
    }

    fn counter_mut(&mut self, stage: Stage) -> &mut u32 {
        match stage {
            Stage::PreProcess => &mut self.pre_process_quantity,
            Stage::Process1 => &mut self.process1_quantity,
            Stage::Process2 => &mut self.process2_quantity,
        }
    }

    /// Quantity as a whole number, if the column holds one.
    pub fn numeric_quantity(&self) -> Option<u32> {
        let raw = self.quantity.trim();
        raw.parse::<u32>().ok().or_else(|| {
            raw.parse::<f64>()
                .ok()
                .filter(|q| q.is_finite() && *q >= 0.0 && q.fract() == 0.0 && *q <= u32::MAX as f64)
                .map(|q| q as u32)
        })
    }

    /// Stages this part actually goes through.
    pub fn applicable_stages(&self) -> impl Iterator<Item = Stage> + '_ {
        Stage::ALL.into_iter().filter(|s| !is_unset(self.tag(*s)))
    }

    /// Commercial off-the-shelf: no shop process assigned at all.
    pub fn is_cots(&self) -> bool {
        self.applicable_stages().next().is_none()
    }

    pub fn has_no_progress(&self) -> bool {
        Stage::ALL.iter().all(|s| self.counter(*s) == 0)
    }

    pub fn progress(&self) -> PartProgress {
        let quantity = self.numeric_quantity();

        let Some(qty) = quantity else {
            let status = if self.has_no_progress() {
                PartStatus::NotStarted
            } else {
                PartStatus::InProgress
            };
            return PartProgress {
                status,
                quantity: None,
                current_process: None,
                remaining: None,
            };
        };

        let current = self.applicable_stages().find(|s| self.counter(*s) < qty);
        let status = if self.has_no_progress() {
            PartStatus::NotStarted
        } else if current.is_none() {
            PartStatus::Completed
        } else {
            PartStatus::InProgress
        };

        PartProgress {
            status,
            quantity: Some(qty),
            current_process: current,
            remaining: current.map(|s| qty - self.counter(s)),
        }
    }

    /// Overwrites the given counters, clamping each to the numeric quantity.
    pub fn set_counters(&mut self, updates: &[(Stage, u32)]) {
        let cap = self.numeric_quantity();
        for (stage, value) in updates {
            let value = cap.map_or(*value, |q| (*value).min(q));
            *self.counter_mut(*stage) = value;
        }
    }

    pub fn copy_counters_from(&mut self, previous: &Part) {
        self.pre_process_quantity = previous.pre_process_quantity;
        self.process1_quantity = previous.process1_quantity;
        self.process2_quantity = previous.process2_quantity;
    }
}

/// Named views over a BOM snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BomFilter {
    All,
    Cots,
    InHouse,
    Stage(Stage),
    Status(PartStatus),
    /// Any stage tagged with this process, compared case-insensitively
    Process(String),
}

impl From<&str> for BomFilter {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "all" => BomFilter::All,
            "cots" => BomFilter::Cots,
            "inhouse" | "in-house" => BomFilter::InHouse,
            "pre-process" | "preprocess" => BomFilter::Stage(Stage::PreProcess),
            "process1" => BomFilter::Stage(Stage::Process1),
            "process2" => BomFilter::Stage(Stage::Process2),
            "completed" => BomFilter::Status(PartStatus::Completed),
            "in-progress" => BomFilter::Status(PartStatus::InProgress),
            "not-started" => BomFilter::Status(PartStatus::NotStarted),
            _ => BomFilter::Process(raw.trim().to_string()),
        }
    }
}

impl BomFilter {
    pub fn matches(&self, part: &Part) -> bool {
        match self {
            BomFilter::All => true,
            BomFilter::Cots => part.is_cots(),
            BomFilter::InHouse => !part.is_cots(),
            BomFilter::Stage(stage) => part.progress().current_process == Some(*stage),
            BomFilter::Status(status) => part.progress().status == *status,
            BomFilter::Process(name) => Stage::ALL
                .iter()
                .any(|s| part.tag(*s).trim().eq_ignore_ascii_case(name)),
        }
    }

    pub fn apply(&self, parts: Vec<Part>) -> Vec<Part> {
        parts.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Accepts strings, numbers and booleans; `null` falls back to the placeholder.
fn cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(render_cell(value.as_ref()).unwrap_or_else(unknown))
}

fn quantity_cell<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(render_cell(value.as_ref()).unwrap_or_else(quantity_not_available))
}

/// Textual form of a scalar BOM cell. `None` for null and composite values.
pub fn render_cell(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Counters written by older clients may be floats or numeric strings.
fn counter<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    struct CounterVisitor;

    impl<'de> de::Visitor<'de> for CounterVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative count")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom("count out of range"))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u32, E> {
            u32::try_from(v).map_err(|_| E::custom("count must be non-negative"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u32, E> {
            if !v.is_finite() || v < 0.0 || v > u32::MAX as f64 {
                Err(E::custom("count must be non-negative"))
            } else if v.fract() != 0.0 {
                Err(E::custom(format!("count {v} is not a whole number")))
            } else {
                Ok(v as u32)
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u32, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(0);
            }
            v.parse::<u32>()
                .map_err(|_| E::custom(format!("invalid count {v:?}")))
        }

        fn visit_unit<E: de::Error>(self) -> Result<u32, E> {
            Ok(0)
        }

        fn visit_none<E: de::Error>(self) -> Result<u32, E> {
            Ok(0)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<u32, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(CounterVisitor)
}
