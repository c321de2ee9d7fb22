//! Document library items and per-truck classification.

use serde_json::Value;

/// Fallback display name for documents without a file name.
pub const DEFAULT_DOCUMENT_NAME: &str = "Document";

/// Metadata columns of a library item.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ListItemFields {
    #[serde(rename = "FileLeafRef", default)]
    pub file_leaf_ref: Option<String>,
    #[serde(rename = "Asset_x0020_ID", default)]
    pub asset: Option<AssetReference>,
    #[serde(rename = "For_x0020_All_x0020_Assets", default)]
    pub for_all_assets: Option<Value>,
}

/// A document library list item.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ListItem {
    pub id: String,
    #[serde(default)]
    pub fields: ListItemFields,
}

/// A lookup column value. Both fields arrive as text or numbers.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Lookup {
    #[serde(rename = "LookupId", default)]
    pub lookup_id: Option<Value>,
    #[serde(rename = "LookupValue", default)]
    pub lookup_value: Option<Value>,
}

impl Lookup {
    fn matches(&self, truck: &str) -> bool {
        matches!(&self.lookup_value, Some(Value::String(v)) if v == truck)
            || self
                .lookup_id
                .as_ref()
                .is_some_and(|id| loose_eq(id, truck))
    }

    fn from_object(value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }
}

/// The asset-reference column in any of its observed shapes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged, from = "Value")]
pub enum AssetReference {
    /// Plain text truck id.
    Text(String),
    /// Multi-value lookup; entries that are not objects are dropped.
    Many(Vec<Lookup>),
    /// Single-value lookup.
    Lookup(Lookup),
    /// Anything else; never matches.
    Other(Value),
}

impl From<Value> for AssetReference {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Array(entries) => {
                Self::Many(entries.into_iter().filter_map(Lookup::from_object).collect())
            }
            Value::Object(_) => match Lookup::from_object(value.clone()) {
                Some(lookup) => Self::Lookup(lookup),
                None => Self::Other(value),
            },
            other => Self::Other(other),
        }
    }
}

impl AssetReference {
    /// Check whether this reference names the truck.
    pub fn matches(&self, truck: &str) -> bool {
        match self {
            Self::Text(text) => text == truck,
            Self::Lookup(lookup) => lookup.matches(truck),
            Self::Many(lookups) => lookups.iter().any(|l| l.matches(truck)),
            Self::Other(_) => false,
        }
    }
}

/// Lookup ids are numbers on the wire and truck ids are text; compare them
/// as numbers when both sides parse, as text otherwise.
fn loose_eq(id: &Value, truck: &str) -> bool {
    let truck = truck.trim();
    match id {
        Value::Number(n) => match (n.as_f64(), truck.parse::<f64>()) {
            (Some(a), Ok(b)) => a == b,
            _ => n.to_string() == truck,
        },
        Value::String(s) => {
            s == truck
                || matches!((s.trim().parse::<f64>(), truck.parse::<f64>()), (Ok(a), Ok(b)) if a == b)
        }
        _ => false,
    }
}

impl ListItem {
    /// Whether this item applies to every truck.
    pub fn applies_to_all_trucks(&self) -> bool {
        matches!(self.fields.for_all_assets, Some(Value::Bool(true)))
    }

    /// Whether this item is relevant for the given truck.
    pub fn is_relevant_for(&self, truck: &str) -> bool {
        self.applies_to_all_trucks()
            || self
                .fields
                .asset
                .as_ref()
                .is_some_and(|asset| asset.matches(truck))
    }
}

/// File facet of a drive item.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFacet {
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// A drive item (file or folder).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    #[serde(default)]
    pub file: Option<FileFacet>,
}

/// A document resolved for a truck, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckDocument {
    pub name: String,
    pub drive_item_id: String,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub last_modified_date_time: Option<String>,
    #[serde(default)]
    pub applies_to_all_trucks: bool,
}

impl TruckDocument {
    /// Combine a list item and its resolved drive item.
    pub fn from_parts(item: &ListItem, drive_item: DriveItem) -> Self {
        let name = item
            .fields
            .file_leaf_ref
            .clone()
            .filter(|n| !n.is_empty())
            .or(drive_item.name)
            .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());

        Self {
            name,
            drive_item_id: drive_item.id,
            web_url: drive_item.web_url,
            size: drive_item.size,
            last_modified_date_time: drive_item.last_modified_date_time,
            applies_to_all_trucks: item.applies_to_all_trucks(),
        }
    }

    /// Whether the file looks like a PDF.
    pub fn is_pdf(&self) -> bool {
        self.name.to_lowercase().ends_with(".pdf")
    }
}

/// Documents from `remote` that are not present by name in `existing`.
///
/// Duplicate names in `remote` are reported once.
pub fn missing_documents<'a>(
    remote: &'a [TruckDocument],
    existing: &[DriveItem],
) -> Vec<&'a TruckDocument> {
    let mut seen: std::collections::HashSet<&str> = existing
        .iter()
        .filter_map(|item| item.name.as_deref())
        .collect();

    remote
        .iter()
        .filter(|doc| seen.insert(doc.name.as_str()))
        .collect()
}
