//! Layout resolvers.
//!
//! Each resolver walks a fixed precedence chain and returns the chosen id
//! together with the chain it walked:
//!
//! ```text
//! section: override > node.layout > template role > template default > fallback
//! card:    card override > section->card default > (none, warning)
//! organ:   organ override > node.layout > (none)
//! ```
//!
//! Under `ResolutionMode::OverridesDisabled` the override steps are still
//! checked and recorded, but never used.

pub mod card;
pub mod catalog;
pub mod organ;
pub mod section;

pub use card::{resolve_card_layout, CardLayoutDecision};
pub use catalog::{CardVisuals, FALLBACK_SECTION_LAYOUT, SAFE_DEFAULT_CARD_LAYOUT};
pub use organ::{resolve_organ_layout, OrganLayoutDecision};
pub use section::{resolve_section_layout, SectionLayoutDecision};
