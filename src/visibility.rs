//! Visibility evaluation for `when` clauses.
//!
//! A node without `when` is always rendered. Otherwise the clause's state key
//! is looked up in the live snapshot, then in the default snapshot, and the
//! node renders iff the value strictly equals `when.equals`. A key missing
//! from both snapshots hides the node, with one named exception
//! ([`DAY_VIEW_STATE_KEY`]).

use crate::audit::{AuditEvent, AuditSink, StateSource};
use crate::model::Node;
use serde_json::Value;

/// State key whose missing value defaults to [`DAY_VIEW_DEFAULT`].
///
/// Without it the calendar renders nothing before the first view toggle. Do
/// not extend this to other keys.
pub const DAY_VIEW_STATE_KEY: &str = "calendar.view";

/// Value assumed for [`DAY_VIEW_STATE_KEY`] when both snapshots lack it.
pub const DAY_VIEW_DEFAULT: &str = "day";

/// Outcome of evaluating one `when` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityDecision {
    pub visible: bool,
    pub resolved: Option<Value>,
    pub source: StateSource,
}

/// Walk a dotted path through nested objects (and array indices).
///
/// Returns `None` on any missing segment.
pub fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    let mut current = root;
    for part in path.split('.') {
        current = match current {
            Value::Object(obj) => obj.get(part)?,
            Value::Array(arr) => arr.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Strict equality: numbers compare by value (`1 == 1.0`), everything else
/// structurally, with no type coercion.
pub fn strictly_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Decide visibility without recording anything.
pub fn decide(node: &Node, state: &Value, default_state: &Value) -> VisibilityDecision {
    let Some(when) = &node.when else {
        return VisibilityDecision {
            visible: true,
            resolved: None,
            source: StateSource::Live,
        };
    };

    let key = when.state_key.trim();
    let (resolved, source) = if let Some(v) = lookup_path(state, key) {
        (Some(v.clone()), StateSource::Live)
    } else if let Some(v) = lookup_path(default_state, key) {
        (Some(v.clone()), StateSource::Default)
    } else if key == DAY_VIEW_STATE_KEY {
        (
            Some(Value::String(DAY_VIEW_DEFAULT.to_string())),
            StateSource::DayViewFallback,
        )
    } else {
        (None, StateSource::Missing)
    };

    let visible = resolved
        .as_ref()
        .is_some_and(|v| strictly_equal(v, &when.equals));

    VisibilityDecision {
        visible,
        resolved,
        source,
    }
}

/// Evaluate `node.when` and record the decision.
///
/// Nodes without a clause are visible and produce no record.
pub fn evaluate(node: &Node, state: &Value, default_state: &Value, sink: &mut dyn AuditSink) -> bool {
    let decision = decide(node, state, default_state);
    if let Some(when) = &node.when {
        tracing::debug!(
            node = %node.label(),
            state_key = %when.state_key,
            visible = decision.visible,
            "visibility evaluated"
        );
        sink.record(AuditEvent::Visibility {
            node: node.label(),
            state_key: when.state_key.clone(),
            expected: when.equals.clone(),
            resolved: decision.resolved.clone(),
            source: decision.source,
            visible: decision.visible,
        });
    }
    decision.visible
}
