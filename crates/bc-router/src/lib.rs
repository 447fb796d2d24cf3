//! Beacon event router
//!
//! This crate provides the event composition and multi-sink dispatch engine:
//! - Router: central orchestrator that validates, enriches, and fans out
//!   events, profile updates, and persistent properties
//! - Sink: per-platform pipeline layering default/persistent properties and
//!   transforming keys before handoff to a platform adapter
//! - KeyValidator: naming-pattern gate with three strictness levels
//! - KeyTransformer: pure key-rewriting chain (case, pattern, prefix,
//!   reserved-key, composition)
//! - RouterCell: one-time shared-construction primitive

pub mod analytics;
pub mod cell;
pub mod error;
pub mod platform;
pub mod router;
pub mod sink;
pub mod transform;
pub mod validate;

pub use analytics::Analytics;
pub use cell::RouterCell;
pub use error::RouterError;
pub use platform::Platform;
pub use router::{Router, RouterBuilder};
pub use sink::{Sink, SinkConfig};
pub use transform::{
    snake_case_to_title_case, title_case_to_snake_case, transform_properties, ChainTransformer,
    IdentityTransformer, KeyTransformer, LowerCaseTransformer, PatternRule, PatternTransformer,
    PrefixTransformer, ReservedKeyTransformer, TitleCaseTransformer,
};
pub use validate::{KeyValidator, ValidationLevel, ValidationOutcome};

pub type Result<T> = std::result::Result<T, RouterError>;
