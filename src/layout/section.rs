//! Section layout resolution.

use super::catalog::FALLBACK_SECTION_LAYOUT;
use crate::audit::{AuditEvent, AuditSink};
use crate::config::ResolutionMode;
use crate::model::{
    pick_first, ChainSource, ChainStep, LayoutRule, Node, OverrideMaps, Params, Profile,
};

/// Layout decision for one section.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionLayoutDecision {
    pub layout_id: String,
    pub rule: LayoutRule,
    /// Params of the profile's role variant for this section's role.
    pub variant_params: Params,
    pub variant_width: Option<String>,
    /// Role variant width, else the role's static width. Never falls back to
    /// a library default.
    pub width: Option<String>,
    pub chain: Vec<ChainStep>,
}

/// Resolve the layout of a section-class node and record the decision.
pub fn resolve_section_layout(
    section_key: &str,
    node: &Node,
    profile: &Profile,
    overrides: &OverrideMaps,
    mode: ResolutionMode,
    sink: &mut dyn AuditSink,
) -> SectionLayoutDecision {
    let role = node.role_key();

    let mut chain = vec![
        ChainStep::checked(ChainSource::SectionOverride, overrides.section_layout(section_key)),
        ChainStep::checked(ChainSource::NodeLayout, node.authored_layout()),
        ChainStep::checked(ChainSource::TemplateRole, role.and_then(|r| profile.role_layout(r))),
        ChainStep::checked(ChainSource::TemplateDefault, profile.default_section_layout()),
        ChainStep::checked(ChainSource::LibraryFallback, Some(FALLBACK_SECTION_LAYOUT)),
    ];

    let applies_overrides = mode.applies_overrides();
    let picked = pick_first(&mut chain, |step| {
        step.source != ChainSource::SectionOverride || applies_overrides
    });

    let (layout_id, rule) = match picked {
        Some(idx) => (
            chain[idx].value.clone().unwrap_or_default(),
            rule_for(chain[idx].source),
        ),
        None => (FALLBACK_SECTION_LAYOUT.to_string(), LayoutRule::Fallback),
    };

    let variant = role.and_then(|r| profile.role_variants.get(r));
    let variant_params = variant.map(|v| v.params.clone()).unwrap_or_default();
    let variant_width = variant.and_then(|v| v.width.clone());
    let width = variant_width
        .clone()
        .or_else(|| role.and_then(|r| profile.width_by_role.get(r).cloned()));

    tracing::debug!(
        section_key = %section_key,
        layout = %layout_id,
        rule = %rule,
        mode = mode.name(),
        "section layout resolved"
    );
    sink.record(AuditEvent::SectionLayout {
        section_key: section_key.to_string(),
        layout_id: layout_id.clone(),
        rule,
        width: width.clone(),
        chain: chain.clone(),
    });

    SectionLayoutDecision {
        layout_id,
        rule,
        variant_params,
        variant_width,
        width,
        chain,
    }
}

fn rule_for(source: ChainSource) -> LayoutRule {
    match source {
        ChainSource::SectionOverride => LayoutRule::Override,
        ChainSource::NodeLayout => LayoutRule::ExplicitNodeLayout,
        ChainSource::TemplateRole => LayoutRule::TemplateRole,
        ChainSource::TemplateDefault => LayoutRule::TemplateDefault,
        _ => LayoutRule::Fallback,
    }
}
