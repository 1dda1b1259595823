//! Audit trail for resolution decisions.
//!
//! The resolver writes one [`AuditEvent`] per decision into an injected
//! [`AuditSink`]. It never reads the sink back, so the trail cannot influence
//! resolved output.
//!
//! [`AuditTrail`] is the standard sink: a bounded ring buffer (oldest entries
//! evicted first) whose entries are tagged with the external interaction that
//! was current when they were recorded.
//!
//! ```text
//! begin_interaction("toggle view") ──► interaction A
//!   resolve_document(...)          ──► entries #41..#97 tagged A
//! last_interaction_entries()       ──► #41..#97
//! ```

use crate::model::{ChainStep, LayoutRule, NodeClass};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use uuid::Uuid;

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warn,
}

/// Where a visibility value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSource {
    Live,
    Default,
    /// The single hard-coded day-view carve-out.
    DayViewFallback,
    Missing,
}

/// One resolution decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditEvent {
    Visibility {
        node: String,
        state_key: String,
        expected: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolved: Option<Value>,
        source: StateSource,
        visible: bool,
    },
    SectionLayout {
        section_key: String,
        layout_id: String,
        rule: LayoutRule,
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<String>,
        chain: Vec<ChainStep>,
    },
    CardLayout {
        section_key: String,
        section_layout_id: String,
        card_layout_id: String,
        rule: LayoutRule,
    },
    /// No card override and no section default: nothing was applied.
    CardLayoutMissing {
        section_key: String,
        section_layout_id: String,
        /// Safe default that was deliberately not applied.
        withheld_default: String,
    },
    OrganLayout {
        organ_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        layout_id: Option<String>,
        chain: Vec<ChainStep>,
    },
    SyntheticSectionKey {
        key: String,
        node_type: String,
        class: NodeClass,
    },
    SpacingStripped {
        section_key: String,
        layer: String,
        keys: Vec<String>,
    },
    CollectionExpanded {
        #[serde(skip_serializing_if = "Option::is_none")]
        section_key: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        card_layout_id: Option<String>,
        count: usize,
    },
    MalformedNode {
        path: String,
        code: String,
        reason: String,
    },
}

impl AuditEvent {
    pub fn level(&self) -> AuditLevel {
        match self {
            AuditEvent::CardLayoutMissing { .. }
            | AuditEvent::SyntheticSectionKey { .. }
            | AuditEvent::MalformedNode { .. } => AuditLevel::Warn,
            _ => AuditLevel::Info,
        }
    }

    /// Short kind name, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditEvent::Visibility { .. } => "visibility",
            AuditEvent::SectionLayout { .. } => "section_layout",
            AuditEvent::CardLayout { .. } => "card_layout",
            AuditEvent::CardLayoutMissing { .. } => "card_layout_missing",
            AuditEvent::OrganLayout { .. } => "organ_layout",
            AuditEvent::SyntheticSectionKey { .. } => "synthetic_section_key",
            AuditEvent::SpacingStripped { .. } => "spacing_stripped",
            AuditEvent::CollectionExpanded { .. } => "collection_expanded",
            AuditEvent::MalformedNode { .. } => "malformed_node",
        }
    }
}

/// Write-only destination for audit events.
pub trait AuditSink {
    fn record(&mut self, event: AuditEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&mut self, _event: AuditEvent) {}
}

impl AuditSink for Vec<AuditEvent> {
    fn record(&mut self, event: AuditEvent) {
        self.push(event);
    }
}

/// External interaction that triggered one or more passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub label: String,
    pub started_at: DateTime<Utc>,
}

/// A recorded event plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Monotonic sequence number; survives eviction of older entries.
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
    pub level: AuditLevel,
    pub event: AuditEvent,
}

/// Bounded, append-only ring buffer of audit entries.
#[derive(Debug, Clone)]
pub struct AuditTrail {
    capacity: usize,
    entries: VecDeque<AuditEntry>,
    next_seq: u64,
    current: Option<Interaction>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::with_capacity(crate::config::DEFAULT_TRACE_CAPACITY)
    }
}

impl AuditTrail {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
            next_seq: 0,
            current: None,
        }
    }

    /// Trail sized from `config.trace_capacity`.
    pub fn from_config(config: &crate::config::ResolverConfig) -> Self {
        Self::with_capacity(config.trace_capacity)
    }

    /// Mark the start of a new external interaction. Later entries are tagged
    /// with its id.
    pub fn begin_interaction(&mut self, label: impl Into<String>) -> Uuid {
        let interaction = Interaction {
            id: Uuid::new_v4(),
            label: label.into(),
            started_at: Utc::now(),
        };
        let id = interaction.id;
        tracing::debug!(interaction = %id, label = %interaction.label, "audit interaction started");
        self.current = Some(interaction);
        id
    }

    pub fn current_interaction(&self) -> Option<&Interaction> {
        self.current.as_ref()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    /// Entries with `seq >= from`, for incremental pulls.
    pub fn entries_since(&self, from: u64) -> Vec<&AuditEntry> {
        self.entries.iter().filter(|e| e.seq >= from).collect()
    }

    /// Entries tagged with the most recent interaction.
    pub fn last_interaction_entries(&self) -> Vec<&AuditEntry> {
        let Some(current) = &self.current else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|e| e.interaction == Some(current.id))
            .collect()
    }

    pub fn warnings(&self) -> Vec<&AuditEntry> {
        self.entries
            .iter()
            .filter(|e| e.level == AuditLevel::Warn)
            .collect()
    }

    /// Sequence number the next entry will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.entries.iter().collect::<Vec<_>>()).unwrap_or(Value::Null)
    }
}

impl AuditSink for AuditTrail {
    fn record(&mut self, event: AuditEvent) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        let entry = AuditEntry {
            seq: self.next_seq,
            interaction: self.current.as_ref().map(|i| i.id),
            recorded_at: Utc::now(),
            level: event.level(),
            event,
        };
        self.next_seq += 1;
        self.entries.push_back(entry);
    }
}
