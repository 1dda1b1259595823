//! Static layout library tables.

use crate::model::Params;
use serde_json::Value;

/// Section layout used when neither overrides, the node nor the profile
/// name one.
pub const FALLBACK_SECTION_LAYOUT: &str = "content-stack";

/// Generic card layout that is deliberately *not* applied when a section has
/// no card default. Reported in the warning record only.
pub const SAFE_DEFAULT_CARD_LAYOUT: &str = "media-top";

/// Section layout -> default card layout compatibility table.
const SECTION_CARD_DEFAULTS: &[(&str, &str)] = &[
    ("carousel", "media-top"),
    ("content-stack", "text-only"),
    ("feature-list", "icon-inline"),
    ("grid-cards", "media-top"),
    ("split-media", "media-left"),
];

/// Visual fields each known card layout contributes to card params.
const CARD_VISUALS: &[(&str, Option<&str>, Option<&str>)] = &[
    ("centered", Some("top"), Some("center")),
    ("icon-inline", Some("inline"), Some("start")),
    ("media-left", Some("left"), Some("start")),
    ("media-right", Some("right"), Some("start")),
    ("media-top", Some("top"), Some("start")),
    ("text-only", None, Some("start")),
];

/// Default card layout for a section layout, if the pair is documented.
pub fn default_card_layout_for(section_layout_id: &str) -> Option<&'static str> {
    SECTION_CARD_DEFAULTS
        .iter()
        .find(|(section, _)| *section == section_layout_id)
        .map(|(_, card)| *card)
}

/// Visual fields of a card layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardVisuals {
    pub media_position: Option<&'static str>,
    pub content_align: Option<&'static str>,
}

impl CardVisuals {
    /// Visual fields for `card_layout_id`; unknown ids contribute nothing.
    pub fn for_layout(card_layout_id: &str) -> Self {
        CARD_VISUALS
            .iter()
            .find(|(id, _, _)| *id == card_layout_id)
            .map(|(_, media_position, content_align)| Self {
                media_position: *media_position,
                content_align: *content_align,
            })
            .unwrap_or_default()
    }

    /// Non-null fields as a param layer.
    pub fn to_params(self) -> Params {
        let mut params = Params::new();
        if let Some(position) = self.media_position {
            params.insert("mediaPosition".into(), Value::String(position.into()));
        }
        if let Some(align) = self.content_align {
            params.insert("contentAlign".into(), Value::String(align.into()));
        }
        params
    }
}
