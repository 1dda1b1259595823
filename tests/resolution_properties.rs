//! Property tests: determinism, spacing isolation, expansion count.

use layout_resolver::{
    resolve, NullSink, OverrideMaps, Profile, ResolutionInput, ResolvedNode, ResolverConfig,
    SpacingScale,
};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// -- Strategy helpers --

fn arb_layout_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("content-stack".to_string()),
        Just("split-media".to_string()),
        Just("grid-cards".to_string()),
        Just("carousel".to_string()),
        Just("hero-centered".to_string()),
    ]
}

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i32>().prop_map(Value::from),
        "[a-z]{1,6}".prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
    ]
}

/// Params that may try to smuggle a gap in at the top level or under `layout`.
fn arb_params() -> impl Strategy<Value = Map<String, Value>> {
    (
        proptest::option::of(arb_scalar()),
        proptest::option::of(arb_scalar()),
        proptest::collection::btree_map("[a-f]{1,3}", arb_scalar(), 0..4),
    )
        .prop_map(|(gap, layout_gap, rest)| {
            let mut params: Map<String, Value> = rest.into_iter().collect();
            if let Some(gap) = gap {
                params.insert("gap".into(), gap);
            }
            if let Some(layout_gap) = layout_gap {
                params.insert("layout".into(), json!({"gap": layout_gap, "columns": 2}));
            }
            params
        })
}

fn arb_section() -> impl Strategy<Value = Value> {
    (
        proptest::option::of("[a-z]{3,8}"),
        proptest::option::of(arb_layout_id()),
        arb_params(),
        proptest::collection::vec(arb_params(), 0..4),
    )
        .prop_map(|(id, layout, params, cards)| {
            let children: Vec<Value> = cards
                .into_iter()
                .map(|p| json!({"type": "card", "params": p}))
                .collect();
            let mut node = json!({
                "type": "section",
                "role": "body",
                "params": params,
                "children": children,
            });
            if let Some(id) = id {
                node["id"] = Value::from(id);
            }
            if let Some(layout) = layout {
                node["layout"] = Value::from(layout);
            }
            node
        })
}

fn arb_document() -> impl Strategy<Value = Value> {
    proptest::collection::vec(arb_section(), 1..5)
        .prop_map(|sections| json!({"id": "page", "type": "Page", "children": sections}))
}

fn profile_with_leaky_presets(visual: Map<String, Value>) -> Profile {
    let mut profile = Profile::new("prop")
        .with_role_layout("body", "grid-cards")
        .with_spacing_scale(SpacingScale::Spacious);
    profile.visual_preset = visual;
    profile
}

fn run(doc: &Value, profile: &Profile) -> Option<ResolvedNode> {
    let overrides = OverrideMaps::new();
    let input = ResolutionInput {
        profile,
        overrides: &overrides,
        state: &Value::Null,
        default_state: &Value::Null,
    };
    resolve(doc, input, &ResolverConfig::default(), &mut NullSink)
}

fn collect_sections<'a>(node: &'a ResolvedNode, out: &mut Vec<&'a ResolvedNode>) {
    if node.class == layout_resolver::NodeClass::Section {
        out.push(node);
    }
    for child in &node.children {
        collect_sections(child, out);
    }
}

proptest! {
    #[test]
    fn resolution_is_deterministic(doc in arb_document(), visual in arb_params()) {
        let profile = profile_with_leaky_presets(visual);
        let first = run(&doc, &profile);
        let second = run(&doc, &profile);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    /// Section gap can only ever be one of the engine-computed values.
    #[test]
    fn section_spacing_is_engine_owned(doc in arb_document(), visual in arb_params()) {
        let profile = profile_with_leaky_presets(visual);
        let resolved = run(&doc, &profile).expect("page resolves");
        let base = SpacingScale::Spacious.base_gap();

        let mut sections = Vec::new();
        collect_sections(&resolved, &mut sections);
        for section in sections {
            let gap = section.effective_params.get("gap").and_then(Value::as_u64);
            prop_assert!(gap == Some(base) || gap == Some(base * 3 / 2));
            let nested = section
                .effective_params
                .get("layout")
                .and_then(|l| l.get("gap"));
            prop_assert!(nested.is_none());
        }
    }

    #[test]
    fn items_expand_one_to_one(count in 0usize..20) {
        let items: Vec<Value> = (0..count).map(|i| json!({"title": i})).collect();
        let doc = json!({"id": "list", "type": "section", "layout": "grid-cards", "items": items});
        let resolved = run(&doc, &Profile::default()).expect("section resolves");
        prop_assert_eq!(resolved.children.len(), count);

        let mut ids: Vec<&str> = resolved
            .children
            .iter()
            .filter_map(|c| c.id.as_deref())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        prop_assert_eq!(ids.len(), count);
    }
}
