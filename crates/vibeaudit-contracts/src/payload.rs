//! The worker's final structured payload.
//!
//! Every field is defaulted and `null`-tolerant: a partial payload must
//! always decode, and the report aggregator decides what a missing piece
//! means. The shapes mirror what the worker emits in its `complete` event.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A list whose `null` entries are dropped. A `null` list is empty.
fn present_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

/// Like [`present_items`], but keeps a `null` list distinguishable from an
/// empty one.
fn present_items_opt<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?;
    Ok(items.map(|items| items.into_iter().flatten().collect()))
}

/// A screenshot map whose `null` entries are dropped.
fn present_screenshots<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Screenshot>, D::Error>
where
    D: Deserializer<'de>,
{
    let shots = Option::<BTreeMap<u32, Option<Screenshot>>>::deserialize(deserializer)?;
    Ok(shots
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(viewport, shot)| Some((viewport, shot?)))
        .collect())
}

/// Everything the worker hands back when an audit completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub audit_config: AuditConfig,
    #[serde(default, deserialize_with = "null_as_default")]
    pub base_domain: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages_analyzed: u32,
    #[serde(default, deserialize_with = "present_items")]
    pub results: Vec<PageRecord>,
}

/// The audit configuration the worker inferred from the user's intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub website_type: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub primary_goal: Option<String>,
    #[serde(default)]
    pub inferred_tone: Option<String>,
}

/// One crawled page as the worker reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default)]
    pub page_number: Option<u32>,
    #[serde(default)]
    pub validation: Option<Validation>,
    /// Viewport index → screenshot. JSON object keys arrive as strings.
    #[serde(default, deserialize_with = "present_screenshots")]
    pub screenshots: BTreeMap<u32, Screenshot>,
    /// Set when the worker failed to analyze this page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PageRecord {
    /// The validation records of this page, if the worker produced any.
    pub fn values(&self) -> Option<&[ValidationRecord]> {
        self.validation.as_ref()?.values.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default, deserialize_with = "present_items_opt")]
    pub values: Option<Vec<ValidationRecord>>,
}

/// Scores and findings for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ctas_found: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cta_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme_score: f64,
    #[serde(default, deserialize_with = "present_items")]
    pub cta_thoughts: Vec<Thought>,
    #[serde(default, deserialize_with = "present_items")]
    pub theme_thoughts: Vec<Thought>,
}

/// A single finding: an issue and its recommendation for one page element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thought {
    #[serde(default, deserialize_with = "null_as_default")]
    pub element_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: String,
    /// 1-based viewport where the issue was observed.
    #[serde(default)]
    pub viewport_number: Option<u32>,
}

/// A base64-encoded screenshot captured for one viewport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Screenshot(pub String);

impl Screenshot {
    pub fn as_base64(&self) -> &str {
        &self.0
    }
}
