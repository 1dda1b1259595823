//! Card layout resolution.
//!
//! Cards take their layout from the card override for the enclosing section,
//! else from the section layout's documented card default. There is no third
//! step: a missing pair yields `Err` carrying the checked chain, plus a
//! warning naming the safe default that was withheld, so configuration gaps
//! stay visible.

use super::catalog::{default_card_layout_for, CardVisuals, SAFE_DEFAULT_CARD_LAYOUT};
use crate::audit::{AuditEvent, AuditSink};
use crate::config::ResolutionMode;
use crate::model::{pick_first, ChainSource, ChainStep, LayoutRule, OverrideMaps};

#[derive(Debug, Clone, PartialEq)]
pub struct CardLayoutDecision {
    pub card_layout_id: String,
    pub rule: LayoutRule,
    pub visuals: CardVisuals,
    pub chain: Vec<ChainStep>,
}

/// Resolve the card layout for cards inside `section_key`.
///
/// On a miss the error holds the checked chain, with no step used.
pub fn resolve_card_layout(
    section_key: &str,
    section_layout_id: &str,
    overrides: &OverrideMaps,
    mode: ResolutionMode,
    sink: &mut dyn AuditSink,
) -> Result<CardLayoutDecision, Vec<ChainStep>> {
    let mut chain = vec![
        ChainStep::checked(ChainSource::CardOverride, overrides.card_layout(section_key)),
        ChainStep::checked(
            ChainSource::SectionCardDefault,
            default_card_layout_for(section_layout_id),
        ),
    ];

    let applies_overrides = mode.applies_overrides();
    let Some(idx) = pick_first(&mut chain, |step| {
        step.source != ChainSource::CardOverride || applies_overrides
    }) else {
        tracing::warn!(
            section_key = %section_key,
            section_layout = %section_layout_id,
            withheld_default = SAFE_DEFAULT_CARD_LAYOUT,
            "no card layout for section; not applying a default"
        );
        sink.record(AuditEvent::CardLayoutMissing {
            section_key: section_key.to_string(),
            section_layout_id: section_layout_id.to_string(),
            withheld_default: SAFE_DEFAULT_CARD_LAYOUT.to_string(),
        });
        return Err(chain);
    };

    let card_layout_id = chain[idx].value.clone().unwrap_or_default();
    let rule = match chain[idx].source {
        ChainSource::CardOverride => LayoutRule::CardOverride,
        _ => LayoutRule::SectionCardDefault,
    };

    tracing::debug!(
        section_key = %section_key,
        card_layout = %card_layout_id,
        rule = %rule,
        "card layout resolved"
    );
    sink.record(AuditEvent::CardLayout {
        section_key: section_key.to_string(),
        section_layout_id: section_layout_id.to_string(),
        card_layout_id: card_layout_id.clone(),
        rule,
    });

    Ok(CardLayoutDecision {
        visuals: CardVisuals::for_layout(&card_layout_id),
        card_layout_id,
        rule,
        chain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::NullSink;

    #[test]
    fn test_override_wins() {
        let overrides = OverrideMaps::new().with_card_layout("products", "media-right");
        let d = resolve_card_layout(
            "products",
            "split-media",
            &overrides,
            ResolutionMode::Normal,
            &mut NullSink,
        )
        .unwrap();
        assert_eq!(d.card_layout_id, "media-right");
        assert_eq!(d.rule, LayoutRule::CardOverride);
        assert_eq!(d.visuals.media_position, Some("right"));
    }

    #[test]
    fn test_section_default() {
        let d = resolve_card_layout(
            "products",
            "split-media",
            &OverrideMaps::new(),
            ResolutionMode::Normal,
            &mut NullSink,
        )
        .unwrap();
        assert_eq!(d.card_layout_id, "media-left");
        assert_eq!(d.rule, LayoutRule::SectionCardDefault);
    }

    #[test]
    fn test_no_silent_fallback() {
        let mut events: Vec<AuditEvent> = Vec::new();
        let d = resolve_card_layout(
            "hero",
            "hero-centered",
            &OverrideMaps::new(),
            ResolutionMode::Normal,
            &mut events,
        );
        let chain = d.unwrap_err();
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|s| !s.found && !s.used));
        assert_eq!(
            events,
            vec![AuditEvent::CardLayoutMissing {
                section_key: "hero".into(),
                section_layout_id: "hero-centered".into(),
                withheld_default: SAFE_DEFAULT_CARD_LAYOUT.into(),
            }]
        );
    }

    #[test]
    fn test_overrides_disabled_skips_card_override() {
        let overrides = OverrideMaps::new().with_card_layout("hero", "media-right");
        let d = resolve_card_layout(
            "hero",
            "hero-centered",
            &overrides,
            ResolutionMode::OverridesDisabled,
            &mut NullSink,
        );
        let chain = d.unwrap_err();
        assert!(chain[0].found && !chain[0].used);
    }
}
