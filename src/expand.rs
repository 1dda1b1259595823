//! Collection expansion: `items` become synthetic card nodes.

use crate::layout::CardLayoutDecision;
use crate::merge::merge;
use crate::model::{ItemRecord, Node, NodeClass, Params};
use serde_json::Value;
use std::collections::HashSet;

/// Type tag given to synthetic cards.
pub const ITEM_CARD_TYPE: &str = "card";

/// One card node per item, in order.
///
/// Each card carries the card layout id (if any) and its visual fields
/// underneath the item's own params. Ids come from `item.id`; items without
/// one, or whose id was already taken, get `item-{index}`.
pub fn expand_items(items: &[Value], card_layout: Option<&CardLayoutDecision>) -> Vec<Node> {
    let visuals: Params = card_layout
        .map(|d| d.visuals.to_params())
        .unwrap_or_default();
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());

    items
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let item = ItemRecord::from_value(raw);
            let id = match item.id {
                Some(id) if !seen.contains(&id) => id,
                _ => fallback_id(index, &seen),
            };
            seen.insert(id.clone());

            Node {
                id: Some(id),
                node_type: ITEM_CARD_TYPE.to_string(),
                class_tag: Some(NodeClass::Card),
                params: merge(&visuals, &item.params),
                layout: card_layout.map(|d| d.card_layout_id.clone()),
                content: Some(item.content),
                ..Default::default()
            }
        })
        .collect()
}

/// `item-{index}`, suffixed if an authored id already took it.
fn fallback_id(index: usize, seen: &HashSet<String>) -> String {
    let base = format!("item-{index}");
    let mut id = base.clone();
    let mut n = 1;
    while seen.contains(&id) {
        id = format!("{base}-{n}");
        n += 1;
    }
    id
}
