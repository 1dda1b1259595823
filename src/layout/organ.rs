//! Organ internal layout resolution.
//!
//! Organs are composite blocks inside a section. Their internal layout comes
//! from `organInternalLayoutOverrides` keyed by the organ's own key, else the
//! authored `node.layout`. No profile step and no fallback: an organ without
//! either keeps its component's built-in layout.

use crate::audit::{AuditEvent, AuditSink};
use crate::config::ResolutionMode;
use crate::model::{pick_first, ChainSource, ChainStep, LayoutRule, Node, OverrideMaps};

#[derive(Debug, Clone, PartialEq)]
pub struct OrganLayoutDecision {
    pub layout_id: Option<String>,
    pub rule: Option<LayoutRule>,
    pub chain: Vec<ChainStep>,
}

pub fn resolve_organ_layout(
    organ_key: &str,
    node: &Node,
    overrides: &OverrideMaps,
    mode: ResolutionMode,
    sink: &mut dyn AuditSink,
) -> OrganLayoutDecision {
    let mut chain = vec![
        ChainStep::checked(ChainSource::OrganOverride, overrides.organ_layout(organ_key)),
        ChainStep::checked(ChainSource::NodeLayout, node.authored_layout()),
    ];

    let applies_overrides = mode.applies_overrides();
    let picked = pick_first(&mut chain, |step| {
        step.source != ChainSource::OrganOverride || applies_overrides
    });

    let (layout_id, rule) = match picked {
        Some(idx) => {
            let rule = match chain[idx].source {
                ChainSource::OrganOverride => LayoutRule::Override,
                _ => LayoutRule::ExplicitNodeLayout,
            };
            (chain[idx].value.clone(), Some(rule))
        }
        None => (None, None),
    };

    tracing::debug!(organ_key = %organ_key, layout = ?layout_id, "organ layout resolved");
    sink.record(AuditEvent::OrganLayout {
        organ_key: organ_key.to_string(),
        layout_id: layout_id.clone(),
        chain: chain.clone(),
    });

    OrganLayoutDecision {
        layout_id,
        rule,
        chain,
    }
}
