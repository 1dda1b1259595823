//! Param merging.
//!
//! Layers are merged left to right, later layers win. Two objects merge
//! recursively; anything else (arrays, scalars, explicit `null`) replaces the
//! existing value. Inputs are never mutated.
//!
//! Section spacing is engine-owned: for section-class nodes every config
//! layer has `gap` and `layout.gap` stripped before merging, and only the
//! engine layer may set them.

use crate::model::{NodeClass, Params};
use serde::Serialize;
use serde_json::Value;

/// Protected spacing key at the top level and under `layout`.
pub const GAP_KEY: &str = "gap";
const LAYOUT_KEY: &str = "layout";

/// Origin of a param layer, in stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSource {
    VisualPreset,
    CardPreset,
    RoleVariant,
    VariantPreset,
    SizePreset,
    CardLayout,
    Inline,
    /// The resolver's own layout computation.
    Engine,
}

impl LayerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerSource::VisualPreset => "visual_preset",
            LayerSource::CardPreset => "card_preset",
            LayerSource::RoleVariant => "role_variant",
            LayerSource::VariantPreset => "variant_preset",
            LayerSource::SizePreset => "size_preset",
            LayerSource::CardLayout => "card_layout",
            LayerSource::Inline => "inline",
            LayerSource::Engine => "engine",
        }
    }
}

/// One layer of the merge stack.
#[derive(Debug, Clone, Copy)]
pub struct ParamLayer<'a> {
    pub source: LayerSource,
    pub params: &'a Params,
}

impl<'a> ParamLayer<'a> {
    pub fn new(source: LayerSource, params: &'a Params) -> Self {
        Self { source, params }
    }
}

/// Result of merging a layer stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub params: Params,
    /// Protected keys removed per layer (sections only).
    pub stripped: Vec<(LayerSource, Vec<String>)>,
}

/// Merge `incoming` over `base`, returning a new map.
pub fn merge(base: &Params, incoming: &Params) -> Params {
    let mut out = base.clone();
    for (key, value) in incoming {
        let merged = match (out.get(key), value) {
            (Some(Value::Object(existing)), Value::Object(next)) => Value::Object(merge(existing, next)),
            _ => value.clone(),
        };
        out.insert(key.clone(), merged);
    }
    out
}

/// Merge any number of layers left to right.
pub fn merge_all<'a, I>(layers: I) -> Params
where
    I: IntoIterator<Item = &'a Params>,
{
    layers
        .into_iter()
        .fold(Params::new(), |acc, layer| merge(&acc, layer))
}

/// Copy of `layer` without `gap` and `layout.gap`, plus the removed key paths.
///
/// An emptied `layout` object is kept so the layer's shape does not change.
pub fn strip_engine_spacing(layer: &Params) -> (Params, Vec<String>) {
    let mut removed = Vec::new();
    let mut out = layer.clone();

    if out.remove(GAP_KEY).is_some() {
        removed.push(GAP_KEY.to_string());
    }
    if let Some(Value::Object(layout)) = out.get_mut(LAYOUT_KEY) {
        if layout.remove(GAP_KEY).is_some() {
            removed.push(format!("{LAYOUT_KEY}.{GAP_KEY}"));
        }
    }

    (out, removed)
}

/// Merge a layer stack for a node of `class`.
///
/// For sections, non-engine layers lose their protected spacing keys first.
/// Other classes merge untouched.
pub fn merge_layers(class: NodeClass, layers: &[ParamLayer<'_>]) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    for layer in layers {
        if class == NodeClass::Section && layer.source != LayerSource::Engine {
            let (clean, removed) = strip_engine_spacing(layer.params);
            if !removed.is_empty() {
                outcome.stripped.push((layer.source, removed));
            }
            outcome.params = merge(&outcome.params, &clean);
        } else {
            outcome.params = merge(&outcome.params, layer.params);
        }
    }

    outcome
}
