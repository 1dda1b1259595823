//! Layout Resolver - deterministic layout/override resolution for JSON UI documents.
//!
//! Given a node tree, a template profile, three section-keyed override maps
//! and a state snapshot, a pass computes for every node:
//! - an effective layout id (sections, cards, organs)
//! - a fully merged parameter set
//! - a visibility decision
//!
//! and records why in an injected audit sink.
//!
//! # Architecture
//!
//! ```text
//! resolve / resolve_document
//! ├── visibility      (when-clause vs state / default state)
//! ├── section_key     (id ?? role ?? structural hash)
//! ├── layout
//! │   ├── section     (override > node.layout > role > default > fallback)
//! │   ├── card        (card override > section default > none + warning)
//! │   └── organ       (organ override > node.layout)
//! ├── merge           (layered deep merge, engine-owned section gap)
//! ├── expand          (items -> synthetic cards)
//! └── audit           (AuditSink, bounded AuditTrail)
//! ```
//!
//! A pass is a pure function of its inputs: the same inputs always produce an
//! identical `ResolvedNode` tree. Malformed or hidden nodes drop out of the
//! tree without failing the pass.
//!
//! # Example
//!
//! ```
//! use layout_resolver::{
//!     resolve, AuditTrail, LayoutRule, OverrideMaps, Profile, ResolutionInput, ResolverConfig,
//! };
//! use serde_json::json;
//!
//! let profile = Profile::new("default")
//!     .with_default_section_layout("content-stack")
//!     .with_role_width("hero", "wide");
//! let overrides = OverrideMaps::new();
//! let input = ResolutionInput {
//!     profile: &profile,
//!     overrides: &overrides,
//!     state: &json!({}),
//!     default_state: &json!({}),
//! };
//!
//! let doc = json!({"id": "hero", "role": "hero", "type": "section", "layout": "split-media"});
//! let mut trail = AuditTrail::default();
//! let hero = resolve(&doc, input, &ResolverConfig::default(), &mut trail).unwrap();
//!
//! assert_eq!(hero.effective_layout.as_deref(), Some("split-media"));
//! assert_eq!(hero.layout_rule, Some(LayoutRule::ExplicitNodeLayout));
//! assert_eq!(hero.effective_width.as_deref(), Some("wide"));
//! ```

pub mod audit;
pub mod config;
mod error;
pub mod expand;
pub mod layout;
pub mod merge;
mod model;
pub mod resolver;
pub mod section_key;
pub mod visibility;

// Re-exports
pub use audit::{AuditEntry, AuditEvent, AuditLevel, AuditSink, AuditTrail, NullSink};
pub use config::{ResolutionMode, ResolverConfig};
pub use error::{ConfigError, NodeError, ProfileError};
pub use layout::{CardLayoutDecision, OrganLayoutDecision, SectionLayoutDecision};
pub use model::{
    ChainSource, ChainStep, ItemRecord, LayoutRule, Node, NodeClass, OverrideMaps, Params,
    Profile, ProfileMode, ResolutionInput, ResolvedNode, RoleVariant, SpacingScale, WhenClause,
};
pub use resolver::{resolve, resolve_document, Resolver};
pub use section_key::SectionKey;
