//! Input and output types for a resolution pass.
//!
//! Inputs (`Node`, `Profile`, `OverrideMaps`, state snapshots) are owned by the
//! caller and only borrowed by the resolver. Output is a fresh `ResolvedNode`
//! tree; no input is mutated.

use crate::error::{json_type_name, NodeError, ProfileError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Parameter dictionary attached to nodes, presets and overlays.
pub type Params = Map<String, Value>;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Keep a string value; any other JSON shape reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Node ids may be authored as strings or numbers.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_type<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

/// `class` doubles as a free-form UI class name; only a known class tag counts.
fn lenient_class<'de, D>(deserializer: D) -> Result<Option<NodeClass>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.and_then(|s| NodeClass::from_class_tag(&s)))
}

// ============================================================================
// Nodes
// ============================================================================

/// Resolution role of a node.
///
/// Assigned once per node: an explicit `class` field wins, otherwise the
/// `type` tag is classified by [`NodeClass::from_type_tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeClass {
    Section,
    Card,
    Organ,
    Leaf,
}

impl NodeClass {
    pub fn from_type_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "section" => NodeClass::Section,
            "card" => NodeClass::Card,
            "organ" => NodeClass::Organ,
            _ => NodeClass::Leaf,
        }
    }

    /// Parse an explicit class tag. Unknown values are not a tag.
    pub fn from_class_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "section" => Some(NodeClass::Section),
            "card" => Some(NodeClass::Card),
            "organ" => Some(NodeClass::Organ),
            "leaf" => Some(NodeClass::Leaf),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeClass::Section => "section",
            NodeClass::Card => "card",
            NodeClass::Organ => "organ",
            NodeClass::Leaf => "leaf",
        }
    }
}

/// Conditional rendering clause: render iff `state[state_key] == equals`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhenClause {
    pub state_key: String,
    #[serde(default)]
    pub equals: Value,
}

/// One node of the input document.
///
/// `children` and `items` stay as raw JSON so that a malformed descendant
/// fails on its own without taking its parent down with it. Scalar fields
/// of the wrong JSON type read as absent rather than failing the node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_type")]
    pub node_type: String,
    /// Explicit class tag; when absent or unrecognised the class comes from
    /// `type`.
    #[serde(
        rename = "class",
        default,
        deserialize_with = "lenient_class",
        skip_serializing_if = "Option::is_none"
    )]
    pub class_tag: Option<NodeClass>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub variant: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub params: Params,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Value>>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub layout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<WhenClause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl Node {
    /// Interpret a JSON value as a node.
    pub fn from_value(value: &Value) -> Result<Self, NodeError> {
        if !value.is_object() {
            return Err(NodeError::NotAnObject {
                found: json_type_name(value),
            });
        }
        serde_json::from_value(value.clone()).map_err(|e| NodeError::Malformed {
            reason: e.to_string(),
        })
    }

    pub fn class(&self) -> NodeClass {
        self.class_tag
            .unwrap_or_else(|| NodeClass::from_type_tag(&self.node_type))
    }

    /// Authored layout id, if non-empty after trimming.
    pub fn authored_layout(&self) -> Option<&str> {
        non_empty(self.layout.as_deref())
    }

    /// Trimmed, non-empty role.
    pub fn role_key(&self) -> Option<&str> {
        non_empty(self.role.as_deref())
    }

    /// Human-readable label for logs and audit records.
    pub fn label(&self) -> String {
        non_empty(self.id.as_deref())
            .or_else(|| self.role_key())
            .map(str::to_string)
            .unwrap_or_else(|| format!("<{}>", self.node_type))
    }
}

/// One record of a node's `items` collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRecord {
    pub id: Option<String>,
    pub params: Params,
    /// Remaining item fields (or the whole value for non-object items).
    pub content: Value,
}

impl ItemRecord {
    /// Interpret an item value. Never fails: non-object items become pure
    /// content so that expansion keeps one card per item.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                id: None,
                params: Params::new(),
                content: value.clone(),
            };
        };

        let id = match obj.get("id") {
            Some(Value::String(s)) => non_empty(Some(s.as_str())).map(str::to_string),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let params = obj
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let content: Params = obj
            .iter()
            .filter(|(k, _)| k.as_str() != "id" && k.as_str() != "params")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            id,
            params,
            content: Value::Object(content),
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileMode {
    #[default]
    Template,
    Custom,
}

/// Coarse spacing overlay; the engine derives section gaps from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingScale {
    Compact,
    #[default]
    Comfortable,
    Spacious,
}

impl SpacingScale {
    /// Base gap between section children, in pixels.
    pub fn base_gap(self) -> u64 {
        match self {
            SpacingScale::Compact => 16,
            SpacingScale::Comfortable => 24,
            SpacingScale::Spacious => 40,
        }
    }
}

/// Per-role section variant: extra params and an optional container width.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleVariant {
    #[serde(default)]
    pub params: Params,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
}

/// Template profile: default layout policy for a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub mode: ProfileMode,
    /// Per-role default section layout.
    #[serde(default)]
    pub layout_by_role: BTreeMap<String, String>,
    /// Per-role static container width.
    #[serde(default)]
    pub width_by_role: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_section_layout_id: Option<String>,
    #[serde(default)]
    pub spacing_scale: SpacingScale,
    /// Overlay applied to every node.
    #[serde(default)]
    pub visual_preset: Params,
    /// Overlay applied to card nodes.
    #[serde(default)]
    pub card_preset: Params,
    #[serde(default)]
    pub role_variants: BTreeMap<String, RoleVariant>,
    /// Keyed by `node.variant`.
    #[serde(default)]
    pub variant_presets: BTreeMap<String, Params>,
    /// Keyed by the `size` param.
    #[serde(default)]
    pub size_presets: BTreeMap<String, Params>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self, ProfileError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ProfileError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn with_default_section_layout(mut self, layout_id: impl Into<String>) -> Self {
        self.default_section_layout_id = Some(layout_id.into());
        self
    }

    pub fn with_role_layout(mut self, role: impl Into<String>, layout_id: impl Into<String>) -> Self {
        self.layout_by_role.insert(role.into(), layout_id.into());
        self
    }

    pub fn with_role_width(mut self, role: impl Into<String>, width: impl Into<String>) -> Self {
        self.width_by_role.insert(role.into(), width.into());
        self
    }

    pub fn with_spacing_scale(mut self, scale: SpacingScale) -> Self {
        self.spacing_scale = scale;
        self
    }

    pub fn role_layout(&self, role: &str) -> Option<&str> {
        non_empty(self.layout_by_role.get(role).map(String::as_str))
    }

    pub fn default_section_layout(&self) -> Option<&str> {
        non_empty(self.default_section_layout_id.as_deref())
    }
}

// ============================================================================
// Override maps
// ============================================================================

/// Runtime layout intent, keyed by section key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideMaps {
    #[serde(default)]
    pub section_layout_preset_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub card_layout_preset_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub organ_internal_layout_overrides: BTreeMap<String, String>,
}

impl OverrideMaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section_layout(&self, key: &str) -> Option<&str> {
        non_empty(self.section_layout_preset_overrides.get(key).map(String::as_str))
    }

    pub fn card_layout(&self, key: &str) -> Option<&str> {
        non_empty(self.card_layout_preset_overrides.get(key).map(String::as_str))
    }

    pub fn organ_layout(&self, key: &str) -> Option<&str> {
        non_empty(self.organ_internal_layout_overrides.get(key).map(String::as_str))
    }

    pub fn with_section_layout(mut self, key: impl Into<String>, layout_id: impl Into<String>) -> Self {
        self.section_layout_preset_overrides
            .insert(key.into(), layout_id.into());
        self
    }

    pub fn with_card_layout(mut self, key: impl Into<String>, layout_id: impl Into<String>) -> Self {
        self.card_layout_preset_overrides
            .insert(key.into(), layout_id.into());
        self
    }

    pub fn with_organ_layout(mut self, key: impl Into<String>, layout_id: impl Into<String>) -> Self {
        self.organ_internal_layout_overrides
            .insert(key.into(), layout_id.into());
        self
    }
}

/// Everything a pass reads. Borrowed for the duration of one pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionInput<'a> {
    pub profile: &'a Profile,
    pub overrides: &'a OverrideMaps,
    pub state: &'a Value,
    /// Consulted only when a key is absent from `state`.
    pub default_state: &'a Value,
}

// ============================================================================
// Output
// ============================================================================

/// Which precedence step produced a layout id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutRule {
    #[serde(rename = "override")]
    Override,
    #[serde(rename = "explicit node.layout")]
    ExplicitNodeLayout,
    #[serde(rename = "template role")]
    TemplateRole,
    #[serde(rename = "template default")]
    TemplateDefault,
    #[serde(rename = "fallback")]
    Fallback,
    #[serde(rename = "card override")]
    CardOverride,
    #[serde(rename = "section card default")]
    SectionCardDefault,
}

impl LayoutRule {
    pub fn as_str(self) -> &'static str {
        match self {
            LayoutRule::Override => "override",
            LayoutRule::ExplicitNodeLayout => "explicit node.layout",
            LayoutRule::TemplateRole => "template role",
            LayoutRule::TemplateDefault => "template default",
            LayoutRule::Fallback => "fallback",
            LayoutRule::CardOverride => "card override",
            LayoutRule::SectionCardDefault => "section card default",
        }
    }
}

impl fmt::Display for LayoutRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source consulted while resolving a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainSource {
    SectionOverride,
    NodeLayout,
    TemplateRole,
    TemplateDefault,
    LibraryFallback,
    CardOverride,
    SectionCardDefault,
    OrganOverride,
}

/// One entry of a resolution chain.
///
/// `found && !used` means the source had a value but a higher-precedence
/// source won (or the mode disabled it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStep {
    pub source: ChainSource,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub used: bool,
}

impl ChainStep {
    pub fn checked(source: ChainSource, value: Option<&str>) -> Self {
        Self {
            source,
            found: value.is_some(),
            value: value.map(str::to_string),
            used: false,
        }
    }
}

/// Marks the first found step as used and returns its value.
pub(crate) fn pick_first(chain: &mut [ChainStep], eligible: impl Fn(&ChainStep) -> bool) -> Option<usize> {
    let idx = chain.iter().position(|s| s.found && eligible(s))?;
    chain[idx].used = true;
    Some(idx)
}

/// A node after resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNode {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
    pub class: NodeClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Own key for sections and organs, enclosing section key otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_rule: Option<LayoutRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_width: Option<String>,
    pub effective_params: Params,
    pub resolution_chain: Vec<ChainStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    pub children: Vec<ResolvedNode>,
}

impl ResolvedNode {
    /// Depth-first search by node id.
    pub fn find(&self, id: &str) -> Option<&ResolvedNode> {
        if self.id.as_deref() == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Number of nodes in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ResolvedNode::count).sum::<usize>()
    }

    /// Sources this node's layout decision actually used.
    pub fn used_sources(&self) -> Vec<ChainSource> {
        self.resolution_chain
            .iter()
            .filter(|s| s.used)
            .map(|s| s.source)
            .collect()
    }
}

pub(crate) fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
