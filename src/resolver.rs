//! Resolution tree walker.
//!
//! One pass is a depth-first walk over the raw document:
//!
//! 1. Parse the node; a malformed node is recorded and its subtree skipped.
//! 2. Evaluate `when`; a hidden node stops recursion.
//! 3. Resolve layout by class (section / card / organ; leaves have none).
//! 4. Merge the param layer stack, stripping section spacing from config
//!    layers and adding the engine-computed gap.
//! 5. Recurse into `items` (expanded to cards) or `children`, threading the
//!    nearest section as context for descendant cards.
//!
//! The output depends only on the `ResolutionInput` and `ResolverConfig`.
//! The audit sink is write-only.

use crate::audit::{AuditEvent, AuditSink};
use crate::config::ResolverConfig;
use crate::expand::expand_items;
use crate::layout::{
    resolve_card_layout, resolve_organ_layout, resolve_section_layout, CardLayoutDecision,
};
use crate::merge::{merge_layers, LayerSource, ParamLayer, GAP_KEY};
use crate::model::{
    ChainSource, ChainStep, LayoutRule, Node, NodeClass, Params, ResolutionInput, ResolvedNode,
    SpacingScale,
};
use crate::section_key::SectionKey;
use crate::visibility;
use serde_json::Value;
use std::collections::HashMap;

/// Path of the document root in audit records.
const ROOT_PATH: &str = "$";

/// Position of a section among its sibling sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionPosition {
    pub index: usize,
    pub total: usize,
}

impl SectionPosition {
    pub const ONLY: SectionPosition = SectionPosition { index: 0, total: 1 };
}

/// Engine-owned gap for a section.
///
/// The lead section of a multi-section run gets one and a half times the
/// base gap of the spacing scale; every other section gets the base gap.
pub fn section_gap(scale: SpacingScale, position: SectionPosition) -> u64 {
    let base = scale.base_gap();
    if position.index == 0 && position.total > 1 {
        base * 3 / 2
    } else {
        base
    }
}

/// Card layout for one section, or the chain checked on a miss.
type CardLayoutOutcome = Result<CardLayoutDecision, Vec<ChainStep>>;

/// Nearest enclosing section, as seen by descendant cards.
#[derive(Debug, Clone)]
struct SectionContext {
    key: String,
    layout_id: String,
}

/// Walker state for a single pass.
pub struct Resolver<'a> {
    input: ResolutionInput<'a>,
    config: &'a ResolverConfig,
    /// Card layout per section key, resolved once per pass.
    card_layouts: HashMap<String, CardLayoutOutcome>,
}

impl<'a> Resolver<'a> {
    pub fn new(input: ResolutionInput<'a>, config: &'a ResolverConfig) -> Self {
        Self {
            input,
            config,
            card_layouts: HashMap::new(),
        }
    }

    /// Resolve one root node. `None` if it is hidden or malformed.
    pub fn resolve_root(&mut self, raw: &Value, sink: &mut dyn AuditSink) -> Option<ResolvedNode> {
        self.resolve_value(raw, ROOT_PATH, None, SectionPosition::ONLY, sink)
    }

    /// Resolve a sibling list, giving sections their position context.
    fn resolve_siblings(
        &mut self,
        raws: &[Value],
        base_path: &str,
        parent: Option<&SectionContext>,
        sink: &mut dyn AuditSink,
    ) -> Vec<ResolvedNode> {
        // Malformed siblings are reported when visited below.
        let parsed: Vec<Result<Node, _>> = raws.iter().map(Node::from_value).collect();
        let total = parsed
            .iter()
            .filter(|n| matches!(n, Ok(node) if node.class() == NodeClass::Section))
            .count();

        let mut section_index = 0;
        let mut out = Vec::with_capacity(raws.len());
        for (i, result) in parsed.into_iter().enumerate() {
            let path = format!("{base_path}[{i}]");
            let node = match result {
                Ok(node) => node,
                Err(err) => {
                    report_malformed(&path, &err, sink);
                    continue;
                }
            };
            let position = if node.class() == NodeClass::Section {
                section_index += 1;
                SectionPosition {
                    index: section_index - 1,
                    total,
                }
            } else {
                SectionPosition::ONLY
            };
            if let Some(resolved) = self.resolve_node(&node, &path, parent, position, sink) {
                out.push(resolved);
            }
        }
        out
    }

    fn resolve_value(
        &mut self,
        raw: &Value,
        path: &str,
        parent: Option<&SectionContext>,
        position: SectionPosition,
        sink: &mut dyn AuditSink,
    ) -> Option<ResolvedNode> {
        match Node::from_value(raw) {
            Ok(node) => self.resolve_node(&node, path, parent, position, sink),
            Err(err) => {
                report_malformed(path, &err, sink);
                None
            }
        }
    }

    fn resolve_node(
        &mut self,
        node: &Node,
        path: &str,
        parent: Option<&SectionContext>,
        position: SectionPosition,
        sink: &mut dyn AuditSink,
    ) -> Option<ResolvedNode> {
        let input = self.input;
        if !visibility::evaluate(node, input.state, input.default_state, sink) {
            return None;
        }

        let class = node.class();
        let mode = self.config.mode;
        let mut resolved = ResolvedNode {
            id: node.id.clone(),
            role: node.role.clone(),
            node_type: node.node_type.clone(),
            class,
            variant: node.variant.clone(),
            section_key: parent.map(|p| p.key.clone()),
            effective_layout: None,
            layout_rule: None,
            effective_width: None,
            effective_params: Params::new(),
            resolution_chain: Vec::new(),
            behavior: node.behavior.clone(),
            content: node.content.clone(),
            children: Vec::new(),
        };

        let mut role_variant = Params::new();
        let mut card_visuals = Params::new();
        let mut engine = Params::new();
        let mut own_section: Option<SectionContext> = None;

        match class {
            NodeClass::Section => {
                let key = self.derive_key(node, sink);
                let decision = resolve_section_layout(
                    key.as_str(),
                    node,
                    input.profile,
                    input.overrides,
                    mode,
                    sink,
                );
                engine.insert(
                    GAP_KEY.to_string(),
                    Value::from(section_gap(input.profile.spacing_scale, position)),
                );
                role_variant = decision.variant_params;
                resolved.section_key = Some(key.as_str().to_string());
                resolved.effective_layout = Some(decision.layout_id.clone());
                resolved.layout_rule = Some(decision.rule);
                resolved.effective_width = decision.width;
                resolved.resolution_chain = decision.chain;
                own_section = Some(SectionContext {
                    key: key.as_str().to_string(),
                    layout_id: decision.layout_id,
                });
            }
            NodeClass::Card => {
                let outcome = match parent {
                    Some(ctx) => self.card_layout(ctx, sink),
                    None => Err(Vec::new()),
                };
                match outcome {
                    Ok(decision) => {
                        card_visuals = decision.visuals.to_params();
                        resolved.effective_layout = Some(decision.card_layout_id);
                        resolved.layout_rule = Some(decision.rule);
                        resolved.resolution_chain = decision.chain;
                    }
                    Err(mut chain) => {
                        // No card layout: an authored layout is the only source left.
                        let mut authored =
                            ChainStep::checked(ChainSource::NodeLayout, node.authored_layout());
                        authored.used = authored.found;
                        if let Some(layout) = &authored.value {
                            resolved.effective_layout = Some(layout.clone());
                            resolved.layout_rule = Some(LayoutRule::ExplicitNodeLayout);
                        }
                        chain.push(authored);
                        resolved.resolution_chain = chain;
                    }
                }
            }
            NodeClass::Organ => {
                let key = self.derive_key(node, sink);
                let decision =
                    resolve_organ_layout(key.as_str(), node, input.overrides, mode, sink);
                resolved.section_key = Some(key.as_str().to_string());
                resolved.effective_layout = decision.layout_id;
                resolved.layout_rule = decision.rule;
                resolved.resolution_chain = decision.chain;
            }
            NodeClass::Leaf => {}
        }

        resolved.effective_params =
            self.merge_params(node, class, &role_variant, &card_visuals, &engine, sink);

        let context = own_section.as_ref().or(parent);
        resolved.children = match &node.items {
            Some(items) => self.resolve_items(items, path, context, sink),
            None => {
                let children_path = format!("{path}.children");
                self.resolve_siblings(&node.children, &children_path, context, sink)
            }
        };

        Some(resolved)
    }

    fn resolve_items(
        &mut self,
        items: &[Value],
        path: &str,
        context: Option<&SectionContext>,
        sink: &mut dyn AuditSink,
    ) -> Vec<ResolvedNode> {
        let card_layout = context.and_then(|ctx| self.card_layout(ctx, sink).ok());
        let cards = expand_items(items, card_layout.as_ref());
        sink.record(AuditEvent::CollectionExpanded {
            section_key: context.map(|c| c.key.clone()),
            card_layout_id: card_layout.map(|d| d.card_layout_id),
            count: cards.len(),
        });

        cards
            .iter()
            .enumerate()
            .filter_map(|(i, card)| {
                let item_path = format!("{path}.items[{i}]");
                self.resolve_node(card, &item_path, context, SectionPosition::ONLY, sink)
            })
            .collect()
    }

    fn merge_params(
        &self,
        node: &Node,
        class: NodeClass,
        role_variant: &Params,
        card_visuals: &Params,
        engine: &Params,
        sink: &mut dyn AuditSink,
    ) -> Params {
        let profile = self.input.profile;
        let empty = Params::new();

        let card_preset = if class == NodeClass::Card {
            &profile.card_preset
        } else {
            &empty
        };
        let variant_preset = node
            .variant
            .as_deref()
            .and_then(|v| profile.variant_presets.get(v))
            .unwrap_or(&empty);
        let size_preset = node
            .params
            .get("size")
            .and_then(Value::as_str)
            .and_then(|s| profile.size_presets.get(s))
            .unwrap_or(&empty);

        let layers = [
            ParamLayer::new(LayerSource::VisualPreset, &profile.visual_preset),
            ParamLayer::new(LayerSource::CardPreset, card_preset),
            ParamLayer::new(LayerSource::RoleVariant, role_variant),
            ParamLayer::new(LayerSource::VariantPreset, variant_preset),
            ParamLayer::new(LayerSource::SizePreset, size_preset),
            ParamLayer::new(LayerSource::CardLayout, card_visuals),
            ParamLayer::new(LayerSource::Inline, &node.params),
            ParamLayer::new(LayerSource::Engine, engine),
        ];
        let outcome = merge_layers(class, &layers);

        if !outcome.stripped.is_empty() {
            let section_key = SectionKey::derive(node);
            for (layer, keys) in outcome.stripped {
                tracing::debug!(
                    section_key = %section_key,
                    layer = layer.as_str(),
                    keys = ?keys,
                    "stripped engine-owned spacing from config layer"
                );
                sink.record(AuditEvent::SpacingStripped {
                    section_key: section_key.as_str().to_string(),
                    layer: layer.as_str().to_string(),
                    keys,
                });
            }
        }

        outcome.params
    }

    /// Card layout for cards under `ctx`, resolved at most once per section.
    fn card_layout(&mut self, ctx: &SectionContext, sink: &mut dyn AuditSink) -> CardLayoutOutcome {
        if let Some(cached) = self.card_layouts.get(&ctx.key) {
            return cached.clone();
        }
        let decision = resolve_card_layout(
            &ctx.key,
            &ctx.layout_id,
            self.input.overrides,
            self.config.mode,
            sink,
        );
        self.card_layouts.insert(ctx.key.clone(), decision.clone());
        decision
    }

    fn derive_key(&self, node: &Node, sink: &mut dyn AuditSink) -> SectionKey {
        let key = SectionKey::derive(node);
        if key.is_synthesized() {
            tracing::warn!(
                key = %key,
                node_type = %node.node_type,
                "node has no id or role; synthesized section key"
            );
            sink.record(AuditEvent::SyntheticSectionKey {
                key: key.as_str().to_string(),
                node_type: node.node_type.clone(),
                class: node.class(),
            });
        }
        key
    }
}

fn report_malformed(path: &str, err: &crate::error::NodeError, sink: &mut dyn AuditSink) {
    tracing::warn!(path = %path, code = err.code(), error = %err, "skipping malformed node");
    sink.record(AuditEvent::MalformedNode {
        path: path.to_string(),
        code: err.code().to_string(),
        reason: err.to_string(),
    });
}

/// Resolve a single node tree.
///
/// Returns `None` when the root is hidden by its `when` clause or is not a
/// valid node. Failures below the root only drop the failing subtree.
pub fn resolve(
    node: &Value,
    input: ResolutionInput<'_>,
    config: &ResolverConfig,
    sink: &mut dyn AuditSink,
) -> Option<ResolvedNode> {
    Resolver::new(input, config).resolve_root(node, sink)
}

/// Resolve a document: either a single root node or an array of top-level
/// nodes (sections receive their position among top-level sections).
pub fn resolve_document(
    doc: &Value,
    input: ResolutionInput<'_>,
    config: &ResolverConfig,
    sink: &mut dyn AuditSink,
) -> Vec<ResolvedNode> {
    let mut resolver = Resolver::new(input, config);
    match doc {
        Value::Array(nodes) => resolver.resolve_siblings(nodes, ROOT_PATH, None, sink),
        _ => resolver.resolve_root(doc, sink).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditTrail, NullSink};
    use crate::model::{OverrideMaps, Profile};
    use serde_json::json;

    fn run(doc: &Value, profile: &Profile, overrides: &OverrideMaps, state: &Value) -> Option<ResolvedNode> {
        let input = ResolutionInput {
            profile,
            overrides,
            state,
            default_state: &Value::Null,
        };
        resolve(doc, input, &ResolverConfig::default(), &mut NullSink)
    }

    #[test]
    fn test_section_gap() {
        let scale = SpacingScale::Comfortable;
        assert_eq!(section_gap(scale, SectionPosition::ONLY), 24);
        assert_eq!(section_gap(scale, SectionPosition { index: 0, total: 3 }), 36);
        assert_eq!(section_gap(scale, SectionPosition { index: 2, total: 3 }), 24);
    }

    #[test]
    fn test_hidden_root_returns_none() {
        let doc = json!({"id": "x", "when": {"stateKey": "tab", "equals": "a"}});
        assert!(run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).is_none());
    }

    #[test]
    fn test_hidden_child_skipped_siblings_kept() {
        let doc = json!({
            "id": "page",
            "children": [
                {"id": "a", "when": {"stateKey": "tab", "equals": "a"}},
                {"id": "b"}
            ]
        });
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({"tab": "b"})).unwrap();
        assert_eq!(resolved.children.len(), 1);
        assert_eq!(resolved.children[0].id.as_deref(), Some("b"));
    }

    #[test]
    fn test_malformed_child_is_local_failure() {
        let doc = json!({
            "id": "page",
            "children": ["not a node", {"id": "ok", "children": 5}, {"id": "fine"}]
        });
        let mut trail = AuditTrail::with_capacity(16);
        let input = ResolutionInput {
            profile: &Profile::default(),
            overrides: &OverrideMaps::new(),
            state: &Value::Null,
            default_state: &Value::Null,
        };
        let resolved = resolve(&doc, input, &ResolverConfig::default(), &mut trail).unwrap();
        assert_eq!(resolved.children.len(), 1);
        assert_eq!(resolved.children[0].id.as_deref(), Some("fine"));

        let paths: Vec<String> = trail
            .warnings()
            .iter()
            .filter_map(|e| match &e.event {
                AuditEvent::MalformedNode { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(paths, vec!["$.children[0]", "$.children[1]"]);
    }

    #[test]
    fn test_card_inherits_section_card_layout() {
        let doc = json!({
            "id": "products", "type": "section", "layout": "split-media",
            "children": [{"id": "c1", "type": "card", "params": {"title": "A"}}]
        });
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).unwrap();
        let card = &resolved.children[0];
        assert_eq!(card.effective_layout.as_deref(), Some("media-left"));
        assert_eq!(card.section_key.as_deref(), Some("products"));
        assert_eq!(card.effective_params.get("mediaPosition"), Some(&json!("left")));
        assert_eq!(card.effective_params.get("title"), Some(&json!("A")));
    }

    #[test]
    fn test_card_without_section_uses_authored_layout() {
        let doc = json!({"id": "lonely", "type": "card", "layout": "centered"});
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).unwrap();
        assert_eq!(resolved.effective_layout.as_deref(), Some("centered"));
        assert_eq!(resolved.layout_rule, Some(LayoutRule::ExplicitNodeLayout));
    }

    #[test]
    fn test_card_layout_resolved_once_per_section() {
        let doc = json!({
            "id": "hero", "type": "section", "layout": "hero-centered",
            "children": [{"type": "card"}, {"type": "card"}]
        });
        let mut events: Vec<AuditEvent> = Vec::new();
        let input = ResolutionInput {
            profile: &Profile::default(),
            overrides: &OverrideMaps::new(),
            state: &Value::Null,
            default_state: &Value::Null,
        };
        resolve(&doc, input, &ResolverConfig::default(), &mut events).unwrap();
        let missing = events
            .iter()
            .filter(|e| e.kind() == "card_layout_missing")
            .count();
        assert_eq!(missing, 1);
    }

    #[test]
    fn test_unknown_types_pass_through() {
        let doc = json!({"id": "x", "type": "Marquee", "params": {"speed": 3}, "content": {"text": "hi"}});
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).unwrap();
        assert_eq!(resolved.class, NodeClass::Leaf);
        assert_eq!(resolved.node_type, "Marquee");
        assert_eq!(resolved.effective_layout, None);
        assert_eq!(resolved.content, Some(json!({"text": "hi"})));
        assert_eq!(resolved.effective_params.get("speed"), Some(&json!(3)));
    }

    #[test]
    fn test_organ_gets_internal_layout_override() {
        let doc = json!({
            "id": "pricing", "type": "section",
            "children": [{"id": "plans", "type": "organ", "layout": "columns-2"}]
        });
        let overrides = OverrideMaps::new().with_organ_layout("plans", "columns-3");
        let resolved = run(&doc, &Profile::default(), &overrides, &json!({})).unwrap();
        let organ = &resolved.children[0];
        assert_eq!(organ.effective_layout.as_deref(), Some("columns-3"));
        assert_eq!(organ.section_key.as_deref(), Some("plans"));
    }

    #[test]
    fn test_items_take_precedence_over_children() {
        let doc = json!({
            "id": "grid", "type": "section", "layout": "grid-cards",
            "items": [{"id": "a"}, {"id": "b"}],
            "children": [{"id": "ignored"}]
        });
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).unwrap();
        let ids: Vec<_> = resolved.children.iter().map(|c| c.id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(resolved
            .children
            .iter()
            .all(|c| c.effective_layout.as_deref() == Some("media-top")));
    }

    #[test]
    fn test_document_array_positions_sections() {
        let doc = json!([
            {"id": "hero", "type": "section"},
            {"id": "note", "type": "Text"},
            {"id": "faq", "type": "section"}
        ]);
        let input = ResolutionInput {
            profile: &Profile::default(),
            overrides: &OverrideMaps::new(),
            state: &Value::Null,
            default_state: &Value::Null,
        };
        let resolved = resolve_document(&doc, input, &ResolverConfig::default(), &mut NullSink);
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0].effective_params.get("gap"), Some(&json!(36)));
        assert_eq!(resolved[2].effective_params.get("gap"), Some(&json!(24)));
        assert_eq!(resolved[1].effective_params.get("gap"), None);
    }

    #[test]
    fn test_synthesized_key_recorded() {
        let doc = json!({"type": "section"});
        let mut events: Vec<AuditEvent> = Vec::new();
        let input = ResolutionInput {
            profile: &Profile::default(),
            overrides: &OverrideMaps::new(),
            state: &Value::Null,
            default_state: &Value::Null,
        };
        let resolved = resolve(&doc, input, &ResolverConfig::default(), &mut events).unwrap();
        let key = resolved.section_key.unwrap();
        assert!(key.starts_with("section-"));
        assert!(events.iter().any(|e| e.kind() == "synthetic_section_key"));
    }

    #[test]
    fn test_used_sources() {
        let doc = json!({"id": "hero", "type": "section", "layout": "split-media"});
        let resolved = run(&doc, &Profile::default(), &OverrideMaps::new(), &json!({})).unwrap();
        assert_eq!(resolved.used_sources(), vec![ChainSource::NodeLayout]);
    }
}
